// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sitescan::application::use_cases::scan_use_case::ScanOrchestrator;
use sitescan::application::use_cases::target_use_case::TargetUseCase;
use sitescan::config::settings::{CrawlerSettings, RealtimeSettings};
use sitescan::domain::models::target::{Target, TargetStatus};
use sitescan::domain::repositories::target_repository::{
    RepositoryError, SortField, SortOrder, TargetQuery, TargetRepository,
};
use sitescan::engines::crawl_engine::CrawlEngine;
use sitescan::infrastructure::realtime::event_hub::{EventHub, Subscription};
use sitescan::presentation::middleware::auth_middleware::AuthState;
use sitescan::presentation::routes::{self, AppState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const TEST_API_KEY: &str = "test-key";

/// 内存目标仓库
///
/// 可以通过 `set_fail_saves` 模拟扫描结束时的持久化失败。
#[derive(Default)]
pub struct InMemoryTargetRepository {
    targets: Mutex<HashMap<Uuid, Target>>,
    fail_saves: AtomicBool,
}

impl InMemoryTargetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, target: Target) -> Target {
        self.targets.lock().insert(target.id, target.clone());
        target
    }

    pub fn get(&self, id: Uuid) -> Option<Target> {
        self.targets.lock().get(&id).cloned()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TargetRepository for InMemoryTargetRepository {
    async fn create(&self, target: &Target) -> Result<Target, RepositoryError> {
        let mut targets = self.targets.lock();
        if targets.values().any(|existing| existing.url == target.url) {
            return Err(RepositoryError::AlreadyExists);
        }
        targets.insert(target.id, target.clone());
        Ok(target.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Target>, RepositoryError> {
        Ok(self.get(id))
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Target>, RepositoryError> {
        Ok(self
            .targets
            .lock()
            .values()
            .find(|target| target.url == url)
            .cloned())
    }

    async fn save(&self, target: &Target) -> Result<Target, RepositoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sea_orm::DbErr::Custom(
                "simulated write failure".to_string(),
            )));
        }
        let mut targets = self.targets.lock();
        let slot = targets.get_mut(&target.id).ok_or(RepositoryError::NotFound)?;
        *slot = target.clone();
        Ok(target.clone())
    }

    async fn mark_crawl_started(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut targets = self.targets.lock();
        let target = targets.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        target.crawl_started_at = Some(started_at);
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: TargetStatus) -> Result<(), RepositoryError> {
        let mut targets = self.targets.lock();
        let target = targets.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        target.status = status;
        target.updated_at = Utc::now();
        Ok(())
    }

    async fn list(&self, query: &TargetQuery) -> Result<(Vec<Target>, u64), RepositoryError> {
        let mut matches: Vec<Target> = self
            .targets
            .lock()
            .values()
            .filter(|t| {
                query
                    .search
                    .as_ref()
                    .is_none_or(|s| t.url.contains(s.as_str()) || t.title.contains(s.as_str()))
            })
            .filter(|t| query.status.is_none_or(|status| t.status == status))
            .filter(|t| {
                query
                    .html_version
                    .as_ref()
                    .is_none_or(|version| &t.html_version == version)
            })
            .filter(|t| query.has_login_form.is_none_or(|flag| t.has_login_form == flag))
            .filter(|t| query.internal_links_min.is_none_or(|min| t.internal_links >= min))
            .filter(|t| query.internal_links_max.is_none_or(|max| t.internal_links <= max))
            .filter(|t| query.external_links_min.is_none_or(|min| t.external_links >= min))
            .filter(|t| query.external_links_max.is_none_or(|max| t.external_links <= max))
            .filter(|t| query.broken_links_min.is_none_or(|min| t.broken_links >= min))
            .filter(|t| query.broken_links_max.is_none_or(|max| t.broken_links <= max))
            .filter(|t| query.created_from.is_none_or(|from| t.created_at >= from))
            .filter(|t| query.created_to.is_none_or(|to| t.created_at <= to))
            .filter(|t| {
                query
                    .crawled_from
                    .is_none_or(|from| t.crawl_finished_at.is_some_and(|at| at >= from))
            })
            .filter(|t| {
                query
                    .crawled_to
                    .is_none_or(|to| t.crawl_finished_at.is_some_and(|at| at <= to))
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            let ordering = match query.sort_by {
                SortField::Status => a.status.as_str().cmp(b.status.as_str()),
                SortField::Title => a.title.cmp(&b.title),
                SortField::Url => a.url.cmp(&b.url),
                SortField::HtmlVersion => a.html_version.cmp(&b.html_version),
                SortField::InternalLinks => a.internal_links.cmp(&b.internal_links),
                SortField::ExternalLinks => a.external_links.cmp(&b.external_links),
                SortField::BrokenLinks => a.broken_links.cmp(&b.broken_links),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matches.len() as u64;
        let page = matches
            .into_iter()
            .skip(((query.page.max(1) - 1) * query.limit) as usize)
            .take(query.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.targets
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, RepositoryError> {
        let mut targets = self.targets.lock();
        Ok(ids.iter().filter(|id| targets.remove(id).is_some()).count() as u64)
    }

    async fn reset_interrupted(&self) -> Result<u64, RepositoryError> {
        let mut targets = self.targets.lock();
        let mut reset = 0;
        for target in targets.values_mut() {
            if target.status == TargetStatus::Crawling {
                target.status = TargetStatus::Failed;
                reset += 1;
            }
        }
        Ok(reset)
    }
}

/// 在本地随机端口启动一个 axum 站点，返回其根地址
pub async fn spawn_site(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/", addr)
}

/// 测试用爬取配置，超时较短
pub fn crawler_settings() -> CrawlerSettings {
    CrawlerSettings {
        request_timeout_secs: 5,
        probe_timeout_secs: 1,
        crawl_timeout_secs: 20,
        ..CrawlerSettings::default()
    }
}

pub fn engine() -> Arc<CrawlEngine> {
    Arc::new(CrawlEngine::new(crawler_settings()).unwrap())
}

pub fn hub() -> EventHub {
    let (hub, _task) = EventHub::spawn(&RealtimeSettings::default());
    hub
}

/// 组装好的扫描环境
pub struct ScanHarness {
    pub repo: Arc<InMemoryTargetRepository>,
    pub hub: EventHub,
    pub scans: Arc<ScanOrchestrator<InMemoryTargetRepository>>,
}

impl ScanHarness {
    pub fn new() -> Self {
        let repo = Arc::new(InMemoryTargetRepository::new());
        let hub = hub();
        let scans = Arc::new(ScanOrchestrator::new(repo.clone(), engine(), hub.clone()));
        Self { repo, hub, scans }
    }

    pub fn add_target(&self, url: &str) -> Target {
        self.repo.insert(Target::new(url))
    }

    pub fn router(&self) -> axum::Router {
        let targets = Arc::new(TargetUseCase::new(self.repo.clone(), self.scans.clone()));
        routes::routes(AppState {
            targets,
            scans: self.scans.clone(),
            hub: self.hub.clone(),
            auth: AuthState::new(TEST_API_KEY),
        })
    }
}

/// 接收下一条状态变更，返回 `(id, status)`
pub async fn next_status(subscription: &mut Subscription) -> (Uuid, String) {
    let message = tokio::time::timeout(Duration::from_secs(15), subscription.recv())
        .await
        .expect("timed out waiting for status change")
        .expect("subscription closed");
    let value: serde_json::Value = serde_json::from_str(&message).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 2, "unexpected payload: {}", message);
    (
        value["id"].as_str().unwrap().parse().unwrap(),
        value["status"].as_str().unwrap().to_string(),
    )
}

/// 轮询直到条件成立
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
