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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含服务器、数据库、认证、爬取引擎、实时推送和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 认证配置
    pub auth: AuthSettings,
    /// 爬取引擎配置
    pub crawler: CrawlerSettings,
    /// 实时推送配置
    pub realtime: RealtimeSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 认证配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// 通过 `X-API-Key` 请求头校验的密钥
    pub api_key: String,
}

/// 爬取引擎配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// 请求使用的 User-Agent
    pub user_agent: String,
    /// 单次扫描内主请求的最大并行数
    pub max_parallel_requests: usize,
    /// 主请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 单个链接探测超时时间（秒）
    pub probe_timeout_secs: u64,
    /// 单次扫描内并发探测数
    pub probe_concurrency: usize,
    /// 全进程并发探测上限
    pub max_global_probes: usize,
    /// 单次扫描总时长上限（秒）
    pub crawl_timeout_secs: u64,
}

impl CrawlerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn crawl_timeout(&self) -> Duration {
        Duration::from_secs(self.crawl_timeout_secs)
    }
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("sitescan/{}", env!("CARGO_PKG_VERSION")),
            max_parallel_requests: 8,
            request_timeout_secs: 30,
            probe_timeout_secs: 10,
            probe_concurrency: 16,
            max_global_probes: 64,
            crawl_timeout_secs: 300,
        }
    }
}

/// 实时推送配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeSettings {
    /// 每个订阅者的出站队列容量
    pub subscriber_queue_capacity: usize,
    /// 事件中心命令通道容量
    pub command_buffer: usize,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: 64,
            command_buffer: 256,
        }
    }
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加内置默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 以及 `SITESCAN__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("SITESCAN").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 仅包含内置默认值的构建器
    pub fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let crawler = CrawlerSettings::default();
        let realtime = RealtimeSettings::default();

        Config::builder()
            // Server
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            // Database
            .set_default("database.url", "sqlite://sitescan.db?mode=rwc")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Auth
            .set_default("auth.api_key", "")?
            // Crawler
            .set_default("crawler.user_agent", crawler.user_agent)?
            .set_default(
                "crawler.max_parallel_requests",
                crawler.max_parallel_requests as u64,
            )?
            .set_default("crawler.request_timeout_secs", crawler.request_timeout_secs)?
            .set_default("crawler.probe_timeout_secs", crawler.probe_timeout_secs)?
            .set_default("crawler.probe_concurrency", crawler.probe_concurrency as u64)?
            .set_default("crawler.max_global_probes", crawler.max_global_probes as u64)?
            .set_default("crawler.crawl_timeout_secs", crawler.crawl_timeout_secs)?
            // Realtime
            .set_default(
                "realtime.subscriber_queue_capacity",
                realtime.subscriber_queue_capacity as u64,
            )?
            .set_default("realtime.command_buffer", realtime.command_buffer as u64)?
            // Metrics
            .set_default("metrics.enabled", true)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")
    }
}
