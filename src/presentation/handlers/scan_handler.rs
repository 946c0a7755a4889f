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
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    application::{dto::target_request::ScanAcceptedDto, use_cases::scan_use_case::ScanOrchestrator},
    domain::repositories::target_repository::TargetRepository,
    presentation::errors::AppError,
};

/// 发起扫描
///
/// 受理后立即返回 202，扫描在后台执行，结果通过实时通道推送。
pub async fn start_scan<R>(
    Extension(scans): Extension<Arc<ScanOrchestrator<R>>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    R: TargetRepository + 'static,
{
    let job_id = scans.start_scan(id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ScanAcceptedDto {
            message: "Scan started".to_string(),
            target_id: id,
            job_id: Some(job_id),
        }),
    ))
}

/// 取消进行中的扫描
pub async fn cancel_scan<R>(
    Extension(scans): Extension<Arc<ScanOrchestrator<R>>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    R: TargetRepository + 'static,
{
    scans.cancel_scan(id)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ScanAcceptedDto {
            message: "Scan cancellation requested".to_string(),
            target_id: id,
            job_id: None,
        }),
    ))
}

/// 列出进行中的扫描
pub async fn list_active_scans<R>(
    Extension(scans): Extension<Arc<ScanOrchestrator<R>>>,
) -> impl IntoResponse
where
    R: TargetRepository + 'static,
{
    let active: Vec<_> = scans
        .active_scans()
        .into_iter()
        .map(|scan| {
            json!({
                "targetId": scan.target_id,
                "jobId": scan.job_id,
                "startedAt": scan.started_at,
            })
        })
        .collect();

    Json(json!({ "data": active, "total": active.len() }))
}
