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

use crate::domain::models::scan::CrawlAggregate;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// 爬取错误类型
///
/// `Failed` 和 `Cancelled` 携带已经收集到的聚合结果，
/// 调用方据此推导最终状态并持久化。
#[derive(Error, Debug)]
pub enum CrawlError {
    /// 目标地址不是合法的绝对URL，未发生任何网络访问
    #[error("Invalid target url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// 主请求失败（传输错误或状态码 >= 400）
    #[error("Crawl failed")]
    Failed(Box<CrawlAggregate>),
    /// 执行结束时已观察到取消信号
    #[error("Crawl cancelled by user")]
    Cancelled(Box<CrawlAggregate>),
}

impl CrawlError {
    /// 取出错误携带的聚合结果
    pub fn into_aggregate(self) -> Option<CrawlAggregate> {
        match self {
            CrawlError::InvalidUrl(_) => None,
            CrawlError::Failed(aggregate) | CrawlError::Cancelled(aggregate) => Some(*aggregate),
        }
    }
}

/// 主请求失败原因
#[derive(Error, Debug)]
pub enum FetchError {
    /// 传输层错误
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// HTTP 错误状态码
    #[error("HTTP status {0}")]
    Status(u16),
}

/// 链接探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkHealth {
    /// 可访问，附带状态码
    Alive(u16),
    /// 不可访问：网络失败或状态码在 [400, 599]
    Broken(String),
}

impl LinkHealth {
    pub fn is_broken(&self) -> bool {
        matches!(self, LinkHealth::Broken(_))
    }
}

/// 链接探测器特质
#[async_trait]
pub trait LinkProber: Send + Sync {
    /// 探测单个链接是否可访问
    async fn probe(&self, url: &Url) -> LinkHealth;

    /// 探测器名称
    fn name(&self) -> &'static str;
}
