// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    application::{
        dto::target_request::{
            BulkDeleteDto, BulkDeleteResponseDto, CreateTargetDto, TargetListParams,
        },
        use_cases::target_use_case::TargetUseCase,
    },
    domain::repositories::target_repository::TargetRepository,
    presentation::errors::AppError,
};

/// 登记新目标
pub async fn create_target<R>(
    Extension(use_case): Extension<Arc<TargetUseCase<R>>>,
    Json(payload): Json<CreateTargetDto>,
) -> Result<impl IntoResponse, AppError>
where
    R: TargetRepository + 'static,
{
    let target = use_case.create_target(payload).await?;
    Ok((StatusCode::CREATED, Json(target)))
}

/// 分页查询目标
pub async fn list_targets<R>(
    Extension(use_case): Extension<Arc<TargetUseCase<R>>>,
    Query(params): Query<TargetListParams>,
) -> Result<impl IntoResponse, AppError>
where
    R: TargetRepository + 'static,
{
    let response = use_case.list_targets(params).await?;
    Ok(Json(response))
}

/// 获取目标详情
pub async fn get_target<R>(
    Extension(use_case): Extension<Arc<TargetUseCase<R>>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    R: TargetRepository + 'static,
{
    let target = use_case.get_target(id).await?;
    Ok(Json(target))
}

/// 删除目标，进行中的扫描会先被取消
pub async fn delete_target<R>(
    Extension(use_case): Extension<Arc<TargetUseCase<R>>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    R: TargetRepository + 'static,
{
    use_case.delete_target(id).await?;
    Ok(Json(json!({ "message": "Target deleted successfully" })))
}

/// 批量删除目标
pub async fn bulk_delete_targets<R>(
    Extension(use_case): Extension<Arc<TargetUseCase<R>>>,
    Json(payload): Json<BulkDeleteDto>,
) -> Result<impl IntoResponse, AppError>
where
    R: TargetRepository + 'static,
{
    let rows_affected = use_case.bulk_delete(payload).await?;
    Ok(Json(BulkDeleteResponseDto {
        message: "Targets deleted successfully".to_string(),
        rows_affected,
    }))
}
