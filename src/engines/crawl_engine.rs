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

use crate::config::settings::CrawlerSettings;
use crate::domain::models::scan::{CrawlAggregate, CrawlEvent};
use crate::domain::services::page_analyzer::{DiscoveredLink, PageAnalyzer};
use crate::engines::aggregator::{CrawlAggregator, EventSink};
use crate::engines::link_prober::ReqwestLinkProber;
use crate::engines::traits::{CrawlError, FetchError, LinkHealth, LinkProber};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// 聚合事件通道容量
const EVENT_BUFFER: usize = 256;

/// 爬取引擎
///
/// 对单个页面执行一次审计：抓取页面、提取元数据、归类链接并探测每个链接是否可访问。
/// 只访问目标页面本身，不会递归进入发现的链接。
///
/// 取消是协作式的：在发起主请求前、派发每个探测前以及执行结束时检查取消信号，
/// 已经发出的请求不会被中断。
pub struct CrawlEngine {
    client: reqwest::Client,
    prober: Arc<dyn LinkProber>,
    /// 全进程共享的探测并发上限
    probe_permits: Semaphore,
    settings: CrawlerSettings,
}

impl CrawlEngine {
    /// 使用默认的 HEAD 探测器创建爬取引擎
    ///
    /// # 参数
    ///
    /// * `settings` - 爬取引擎配置
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlEngine)` - 创建成功
    /// * `Err(reqwest::Error)` - HTTP 客户端构建失败
    pub fn new(settings: CrawlerSettings) -> Result<Self, reqwest::Error> {
        let prober = ReqwestLinkProber::new(&settings.user_agent, settings.probe_timeout())?;
        Self::with_prober(settings, Arc::new(prober))
    }

    /// 使用自定义探测器创建爬取引擎
    pub fn with_prober(
        settings: CrawlerSettings,
        prober: Arc<dyn LinkProber>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            prober,
            probe_permits: Semaphore::new(settings.max_global_probes.max(1)),
            settings,
        })
    }

    /// 执行一次扫描
    ///
    /// # 参数
    ///
    /// * `target_url` - 目标页面地址，必须是合法的绝对URL
    /// * `cancel` - 取消信号
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlAggregate)` - 扫描正常结束
    /// * `Err(CrawlError::InvalidUrl)` - 地址非法，未发生网络访问
    /// * `Err(CrawlError::Cancelled)` - 执行结束时已观察到取消信号
    /// * `Err(CrawlError::Failed)` - 主请求失败或整体超时
    #[instrument(skip(self, cancel), fields(url = %target_url))]
    pub async fn execute(
        &self,
        target_url: &str,
        cancel: &CancellationToken,
    ) -> Result<CrawlAggregate, CrawlError> {
        let page_url = Url::parse(target_url)?;
        let (sink, aggregator) = CrawlAggregator::channel(EVENT_BUFFER);
        let crawl_timeout = self.settings.crawl_timeout();

        let driver = async {
            let timeout_sink = sink.clone();
            if time::timeout(crawl_timeout, self.drive(&page_url, cancel, sink))
                .await
                .is_err()
            {
                warn!("Crawl of {} exceeded {:?}", page_url, crawl_timeout);
                timeout_sink.emit(CrawlEvent::Failed).await;
            }
        };

        let ((), mut aggregate) = tokio::join!(driver, aggregator.collect());

        if cancel.is_cancelled() {
            aggregate.cancelled = true;
        }

        if aggregate.cancelled {
            info!("Crawl cancelled for {}", page_url);
            Err(CrawlError::Cancelled(Box::new(aggregate)))
        } else if aggregate.failed {
            Err(CrawlError::Failed(Box::new(aggregate)))
        } else {
            info!(
                internal = aggregate.internal_links,
                external = aggregate.external_links,
                broken = aggregate.broken_links,
                "Crawl completed for {}",
                page_url
            );
            Ok(aggregate)
        }
    }

    async fn drive(&self, page_url: &Url, cancel: &CancellationToken, sink: EventSink) {
        let fetch_permits = Semaphore::new(self.settings.max_parallel_requests.max(1));

        let body = match self.fetch_page(page_url, cancel, &fetch_permits).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                sink.emit(CrawlEvent::Cancelled).await;
                return;
            }
            Err(e) => {
                warn!("Crawl failed for {}: {}", page_url, e);
                sink.emit(CrawlEvent::Failed).await;
                return;
            }
        };

        let report = PageAnalyzer::analyze(&body, page_url);
        sink.emit(CrawlEvent::HtmlVersion(report.html_version)).await;
        sink.emit(CrawlEvent::Title(report.title)).await;
        for tag in report.headings {
            sink.emit(CrawlEvent::Heading(tag)).await;
        }
        if report.has_login_form {
            sink.emit(CrawlEvent::LoginForm).await;
        }
        for link in &report.links {
            sink.emit(CrawlEvent::Link(link.kind)).await;
        }

        self.probe_links(report.links, cancel, &sink).await;
    }

    /// 抓取目标页面
    ///
    /// 返回 `Ok(None)` 表示请求发起前已被取消。
    async fn fetch_page(
        &self,
        page_url: &Url,
        cancel: &CancellationToken,
        permits: &Semaphore,
    ) -> Result<Option<String>, FetchError> {
        let permit = tokio::select! {
            permit = permits.acquire() => permit.ok(),
            _ = cancel.cancelled() => None,
        };
        let Some(_permit) = permit else {
            return Ok(None);
        };

        if cancel.is_cancelled() {
            info!("Cancellation requested for {}. Aborting request.", page_url);
            return Ok(None);
        }

        let response = self.client.get(page_url.clone()).send().await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(FetchError::Status(status));
        }

        Ok(Some(response.text().await?))
    }

    /// 探测页面中的全部链接
    ///
    /// 同一地址只探测一次，失效时按出现次数计入失效链接。
    async fn probe_links(
        &self,
        links: Vec<DiscoveredLink>,
        cancel: &CancellationToken,
        sink: &EventSink,
    ) {
        let mut occurrences: HashMap<Url, u32> = HashMap::new();
        for link in links {
            *occurrences.entry(link.url).or_insert(0) += 1;
        }
        if occurrences.is_empty() {
            return;
        }
        debug!("Probing {} unique links", occurrences.len());

        stream::iter(occurrences)
            .map(|(url, count)| async move { (count, self.probe_one(&url, cancel).await) })
            .buffer_unordered(self.settings.probe_concurrency.max(1))
            .for_each(|(count, health)| async move {
                match health {
                    None => sink.emit(CrawlEvent::Cancelled).await,
                    Some(health) if health.is_broken() => {
                        for _ in 0..count {
                            sink.emit(CrawlEvent::BrokenLink).await;
                        }
                    }
                    Some(_) => {}
                }
            })
            .await;
    }

    /// 探测单个链接，已取消时返回 `None`
    async fn probe_one(&self, url: &Url, cancel: &CancellationToken) -> Option<LinkHealth> {
        if cancel.is_cancelled() {
            return None;
        }
        let _permit = self.probe_permits.acquire().await.ok()?;
        if cancel.is_cancelled() {
            return None;
        }

        metrics::counter!("links_probed_total").increment(1);
        let health = match time::timeout(self.settings.probe_timeout(), self.prober.probe(url)).await
        {
            Ok(health) => health,
            Err(_) => LinkHealth::Broken("probe timed out".to_string()),
        };
        debug!(prober = self.prober.name(), "Probe of {} -> {:?}", url, health);
        Some(health)
    }
}
