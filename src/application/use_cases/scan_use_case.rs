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
    domain::{
        models::{
            scan::StatusChange,
            target::TargetStatus,
        },
        repositories::target_repository::{RepositoryError, TargetRepository},
    },
    engines::crawl_engine::CrawlEngine,
    infrastructure::realtime::event_hub::EventHub,
    workers::{
        scan_registry::{ActiveScan, JobGuard, ScanRegistry},
        scan_worker::{publish_status, ScanWorker},
    },
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use url::Url;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Target not found")]
    NotFound,
    #[error("A scan is already in progress for this target")]
    AlreadyInProgress,
    #[error("No active scan for this target")]
    NoActiveScan,
    #[error("Invalid target url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// 扫描编排器
///
/// 管理每个目标的扫描生命周期：保证同一目标至多一个进行中的扫描，
/// 发放和撤销取消信号，在后台驱动扫描工作器。
///
/// 登记表是编排器自己持有的对象，不是全局单例。
pub struct ScanOrchestrator<R>
where
    R: TargetRepository,
{
    repository: Arc<R>,
    registry: Arc<ScanRegistry>,
    worker: Arc<ScanWorker<R>>,
    hub: EventHub,
}

impl<R> ScanOrchestrator<R>
where
    R: TargetRepository + 'static,
{
    pub fn new(repository: Arc<R>, engine: Arc<CrawlEngine>, hub: EventHub) -> Self {
        let registry = Arc::new(ScanRegistry::new());
        let worker = Arc::new(ScanWorker::new(
            repository.clone(),
            engine,
            hub.clone(),
            registry.clone(),
        ));
        Self {
            repository,
            registry,
            worker,
            hub,
        }
    }

    /// 发起一次扫描
    ///
    /// 登记成功后立即返回，扫描在后台任务中执行。
    ///
    /// # 参数
    ///
    /// * `target_id` - 目标ID
    ///
    /// # 返回值
    ///
    /// * `Ok(Uuid)` - 本次扫描的任务ID
    /// * `Err(ScanError::NotFound)` - 目标不存在
    /// * `Err(ScanError::InvalidUrl)` - 目标地址非法
    /// * `Err(ScanError::AlreadyInProgress)` - 目标已有进行中的扫描
    /// * `Err(ScanError::Repository)` - 写入扫描开始状态失败，登记已释放
    pub async fn start_scan(&self, target_id: Uuid) -> Result<Uuid, ScanError> {
        // 1. Load and validate the target
        let mut target = self
            .repository
            .find_by_id(target_id)
            .await?
            .ok_or(ScanError::NotFound)?;
        Url::parse(&target.url)?;

        // 2. Claim the per-target slot
        let ticket = self
            .registry
            .try_register(target_id)
            .ok_or(ScanError::AlreadyInProgress)?;
        // Any early return below drops the guard and frees the slot.
        let guard = JobGuard::new(self.registry.clone(), &ticket);

        // 3. Record the transition to crawling
        // A cancelled predecessor may be writing its result; wait for it.
        let transition = self.registry.lock_transitions().await;
        let started_at = Utc::now();
        self.repository
            .mark_crawl_started(target_id, started_at)
            .await?;
        self.repository
            .update_status(target_id, TargetStatus::Crawling)
            .await?;
        target.status = TargetStatus::Crawling;
        target.crawl_started_at = Some(started_at);
        target.updated_at = started_at;

        metrics::counter!("scans_started_total").increment(1);
        info!(target_id = %target_id, job_id = %ticket.job_id, "Scan started for {}", target.url);
        publish_status(
            &self.hub,
            StatusChange {
                id: target_id,
                status: TargetStatus::Crawling,
            },
        )
        .await;
        drop(transition);

        // 4. Hand over to the background worker
        let job_id = ticket.job_id;
        let worker = self.worker.clone();
        tokio::spawn(async move {
            worker.run(target, ticket, guard).await;
        });

        Ok(job_id)
    }

    /// 取消目标的进行中扫描
    ///
    /// 只发出取消信号并移除登记，持久化状态由后台任务在结束时写入。
    pub fn cancel_scan(&self, target_id: Uuid) -> Result<(), ScanError> {
        if self.registry.cancel(target_id) {
            info!(target_id = %target_id, "Cancellation requested");
            Ok(())
        } else {
            Err(ScanError::NoActiveScan)
        }
    }

    /// 当前进行中的扫描
    pub fn active_scans(&self) -> Vec<ActiveScan> {
        self.registry.active()
    }

    /// 目标被删除后清除其扫描记录
    pub fn forget(&self, target_id: Uuid) {
        self.registry.forget(target_id);
    }

    /// 目标是否有进行中的扫描
    pub fn is_scanning(&self, target_id: Uuid) -> bool {
        self.registry.contains(target_id)
    }
}
