// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{LinkHealth, LinkProber};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// 基于 reqwest 的链接探测器
///
/// 对每个链接发送一次 HEAD 请求，每个请求带固定超时。
pub struct ReqwestLinkProber {
    client: reqwest::Client,
}

impl ReqwestLinkProber {
    /// 创建探测器
    ///
    /// # 参数
    ///
    /// * `user_agent` - 请求使用的 User-Agent
    /// * `timeout` - 单个探测的超时时间
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkProber for ReqwestLinkProber {
    async fn probe(&self, url: &Url) -> LinkHealth {
        match self.client.head(url.as_str()).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if (400..600).contains(&status) {
                    debug!("Link {} responded with {}", url, status);
                    LinkHealth::Broken(format!("HTTP status {}", status))
                } else {
                    LinkHealth::Alive(status)
                }
            }
            Err(e) => {
                debug!("Link {} unreachable: {}", url, e);
                LinkHealth::Broken(e.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "reqwest-head"
    }
}
