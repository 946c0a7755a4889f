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

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::models::scan::{CrawlAggregate, StatusChange};
use crate::domain::models::target::{Target, TargetStatus};
use crate::domain::repositories::target_repository::{RepositoryError, TargetRepository};
use crate::engines::crawl_engine::CrawlEngine;
use crate::engines::traits::CrawlError;
use crate::infrastructure::realtime::event_hub::EventHub;
use crate::workers::scan_registry::{JobGuard, ScanRegistry, ScanTicket};

/// 向实时订阅者发布一次状态变更
///
/// 序列化或事件中心失败只记录日志，不影响调用方。
pub async fn publish_status(hub: &EventHub, change: StatusChange) {
    let message = match serde_json::to_string(&change) {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to serialize status change for {}: {}", change.id, e);
            return;
        }
    };

    if let Err(e) = hub.broadcast(message).await {
        warn!("Failed to publish status change for {}: {}", change.id, e);
    }
}

/// 扫描工作器
///
/// 在后台任务中执行单次扫描：驱动爬取引擎，推导最终状态，
/// 持久化聚合结果并发布最终状态。
pub struct ScanWorker<R>
where
    R: TargetRepository,
{
    repository: Arc<R>,
    engine: Arc<CrawlEngine>,
    hub: EventHub,
    registry: Arc<ScanRegistry>,
}

impl<R> ScanWorker<R>
where
    R: TargetRepository + 'static,
{
    /// 创建新的扫描工作器实例
    pub fn new(
        repository: Arc<R>,
        engine: Arc<CrawlEngine>,
        hub: EventHub,
        registry: Arc<ScanRegistry>,
    ) -> Self {
        Self {
            repository,
            engine,
            hub,
            registry,
        }
    }

    /// 执行扫描直到终态
    ///
    /// # 参数
    ///
    /// * `target` - 已标记为扫描中的目标
    /// * `ticket` - 登记表发放的凭据，携带取消信号
    /// * `guard` - 登记释放守卫，在发布最终状态后释放
    ///
    /// # 返回值
    ///
    /// 返回发布出去的最终状态。任务已被同一目标的新扫描取代，或目标已被删除时，
    /// 不写入也不发布，返回 `None`。
    #[instrument(skip_all, fields(target_id = %target.id, job_id = %ticket.job_id, url = %target.url))]
    pub async fn run(
        &self,
        mut target: Target,
        ticket: ScanTicket,
        guard: JobGuard,
    ) -> Option<TargetStatus> {
        let _guard = guard;
        metrics::gauge!("scans_active").increment(1.0);

        let aggregate = match self.engine.execute(&target.url, &ticket.cancel).await {
            Ok(aggregate) => aggregate,
            Err(CrawlError::InvalidUrl(e)) => {
                warn!("Target url rejected by crawl engine: {}", e);
                CrawlAggregate::failed()
            }
            Err(e) => {
                debug!("Crawl ended early: {}", e);
                e.into_aggregate().unwrap_or_else(CrawlAggregate::failed)
            }
        };

        let finished_at = Utc::now();
        let mut status = aggregate.final_status();
        target.apply_aggregate(&aggregate, status, finished_at);
        metrics::gauge!("scans_active").decrement(1.0);

        let _transition = self.registry.lock_transitions().await;
        if self.registry.is_superseded(target.id, ticket.job_id) {
            info!("Scan superseded by a newer job, discarding {} result", status);
            return None;
        }

        match self.repository.save(&target).await {
            Ok(_) => {}
            Err(RepositoryError::NotFound) => {
                warn!("Target removed during scan, discarding {} result", status);
                return None;
            }
            Err(e) => {
                error!("Failed to persist scan result: {}", e);
                status = TargetStatus::Failed;
                if let Err(e) = self.repository.update_status(target.id, status).await {
                    error!("Failed to mark target as failed: {}", e);
                }
            }
        }

        metrics::counter!("scans_finished_total", "status" => status.as_str()).increment(1);
        info!("Scan finished with status {}", status);

        publish_status(
            &self.hub,
            StatusChange {
                id: target.id,
                status,
            },
        )
        .await;

        Some(status)
    }
}
