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

use sitescan::application::use_cases::scan_use_case::ScanOrchestrator;
use sitescan::application::use_cases::target_use_case::TargetUseCase;
use sitescan::config::settings::Settings;
use sitescan::domain::repositories::target_repository::TargetRepository;
use sitescan::engines::crawl_engine::CrawlEngine;
use sitescan::infrastructure::database::connection;
use sitescan::infrastructure::realtime::event_hub::EventHub;
use sitescan::infrastructure::repositories::target_repo_impl::TargetRepositoryImpl;
use sitescan::presentation::middleware::auth_middleware::AuthState;
use sitescan::presentation::routes::{self, AppState};
use sitescan::utils::telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting sitescan...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // Initialize Prometheus Metrics
    sitescan::infrastructure::metrics::init_metrics(&settings.metrics)?;

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    info!("Running database migrations...");
    connection::run_migrations(db.as_ref()).await?;

    // 4. Recover scans interrupted by a previous shutdown
    let target_repo = Arc::new(TargetRepositoryImpl::new(db.clone()));
    let interrupted = target_repo.reset_interrupted().await?;
    if interrupted > 0 {
        warn!("Marked {} interrupted scans as failed", interrupted);
    }

    // 5. Start realtime hub
    let (hub, _hub_task) = EventHub::spawn(&settings.realtime);
    info!("Event hub started");

    // 6. Initialize scan pipeline
    let engine = Arc::new(CrawlEngine::new(settings.crawler.clone())?);
    let scans = Arc::new(ScanOrchestrator::new(
        target_repo.clone(),
        engine,
        hub.clone(),
    ));
    let targets = Arc::new(TargetUseCase::new(target_repo, scans.clone()));

    if settings.auth.api_key.is_empty() {
        warn!("auth.api_key is empty, all protected endpoints will reject requests");
    }

    // 7. Start HTTP server
    let app = routes::routes(AppState {
        targets,
        scans,
        hub,
        auth: AuthState::new(settings.auth.api_key.as_str()),
    });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
