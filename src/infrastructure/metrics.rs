// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标导出
///
/// 在 `metrics.listen_addr` 上启动 Prometheus 抓取端点并登记扫描相关指标。
/// 端口被占用时只记录警告，服务照常启动。
///
/// # 返回值
///
/// * `Ok(())` - 初始化完成或指标被禁用
/// * `Err(AddrParseError)` - 监听地址非法
pub fn init_metrics(settings: &MetricsSettings) -> Result<(), std::net::AddrParseError> {
    if !settings.enabled {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr: SocketAddr = settings.listen_addr.parse()?;

    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return Ok(());
    }

    describe_counter!("scans_started_total", "Total number of scans started");
    describe_counter!(
        "scans_finished_total",
        "Total number of scans finished, labelled by final status"
    );
    describe_counter!("links_probed_total", "Total number of link liveness probes sent");
    describe_counter!(
        "hub_subscribers_dropped_total",
        "Realtime subscribers disconnected because their queue was full"
    );
    describe_gauge!("scans_active", "Number of scans currently running");
    describe_gauge!("hub_subscribers", "Number of connected realtime subscribers");

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}
