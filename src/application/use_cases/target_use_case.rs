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

use crate::{
    application::{
        dto::target_request::{
            BulkDeleteDto, CreateTargetDto, PaginationDto, TargetListParams,
            TargetListResponseDto,
        },
        use_cases::scan_use_case::ScanOrchestrator,
    },
    domain::{
        models::target::Target,
        repositories::target_repository::{RepositoryError, TargetRepository},
    },
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use url::Url;
use uuid::Uuid;
use validator::Validate;

#[derive(Error, Debug)]
pub enum TargetUseCaseError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Target not found")]
    NotFound,
    #[error("URL already exists")]
    AlreadyExists,
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for TargetUseCaseError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => TargetUseCaseError::NotFound,
            RepositoryError::AlreadyExists => TargetUseCaseError::AlreadyExists,
            other => TargetUseCaseError::Repository(other),
        }
    }
}

/// 目标管理用例
///
/// 目标的登记、查询和删除。删除有进行中扫描的目标时先取消扫描。
pub struct TargetUseCase<R>
where
    R: TargetRepository,
{
    repository: Arc<R>,
    scans: Arc<ScanOrchestrator<R>>,
}

impl<R> TargetUseCase<R>
where
    R: TargetRepository + 'static,
{
    pub fn new(repository: Arc<R>, scans: Arc<ScanOrchestrator<R>>) -> Self {
        Self { repository, scans }
    }

    /// 登记一个新目标
    pub async fn create_target(&self, dto: CreateTargetDto) -> Result<Target, TargetUseCaseError> {
        dto.validate()
            .map_err(|e| TargetUseCaseError::ValidationError(e.to_string()))?;

        let url = dto.url.trim();
        let parsed =
            Url::parse(url).map_err(|e| TargetUseCaseError::ValidationError(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TargetUseCaseError::ValidationError(format!(
                "Unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        if self.repository.find_by_url(url).await?.is_some() {
            return Err(TargetUseCaseError::AlreadyExists);
        }

        let target = self.repository.create(&Target::new(url)).await?;
        info!(target_id = %target.id, "Target registered: {}", target.url);
        Ok(target)
    }

    pub async fn get_target(&self, id: Uuid) -> Result<Target, TargetUseCaseError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(TargetUseCaseError::NotFound)
    }

    /// 分页查询目标
    pub async fn list_targets(
        &self,
        params: TargetListParams,
    ) -> Result<TargetListResponseDto, TargetUseCaseError> {
        let query = params
            .into_query()
            .map_err(TargetUseCaseError::ValidationError)?;
        let (data, total) = self.repository.list(&query).await?;

        Ok(TargetListResponseDto {
            data,
            pagination: PaginationDto::new(total, query.page, query.limit),
        })
    }

    /// 删除单个目标
    pub async fn delete_target(&self, id: Uuid) -> Result<(), TargetUseCaseError> {
        if self.scans.cancel_scan(id).is_ok() {
            info!(target_id = %id, "Cancelled active scan before deletion");
        }
        self.repository.delete(id).await?;
        self.scans.forget(id);
        Ok(())
    }

    /// 批量删除目标，返回实际删除条数
    pub async fn bulk_delete(&self, dto: BulkDeleteDto) -> Result<u64, TargetUseCaseError> {
        dto.validate()
            .map_err(|e| TargetUseCaseError::ValidationError(e.to_string()))?;

        for id in &dto.ids {
            // Targets without an active scan are the common case.
            let _ = self.scans.cancel_scan(*id);
        }
        let deleted = self.repository.delete_many(&dto.ids).await?;
        for id in &dto.ids {
            self.scans.forget(*id);
        }
        info!("Deleted {} of {} requested targets", deleted, dto.ids.len());
        Ok(deleted)
    }
}
