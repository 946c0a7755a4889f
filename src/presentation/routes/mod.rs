// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::scan_use_case::ScanOrchestrator;
use crate::application::use_cases::target_use_case::TargetUseCase;
use crate::domain::repositories::target_repository::TargetRepository;
use crate::infrastructure::realtime::event_hub::EventHub;
use crate::presentation::handlers::{scan_handler, target_handler, ws_handler};
use crate::presentation::middleware::auth_middleware::{auth_middleware, AuthState};
use axum::{
    extract::Extension,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 路由依赖
pub struct AppState<R>
where
    R: TargetRepository,
{
    pub targets: Arc<TargetUseCase<R>>,
    pub scans: Arc<ScanOrchestrator<R>>,
    pub hub: EventHub,
    pub auth: AuthState,
}

impl<R> Clone for AppState<R>
where
    R: TargetRepository,
{
    fn clone(&self) -> Self {
        Self {
            targets: self.targets.clone(),
            scans: self.scans.clone(),
            hub: self.hub.clone(),
            auth: self.auth.clone(),
        }
    }
}

/// 创建应用路由
///
/// `/health`、`/v1/version` 和 `/ws` 公开，其余 `/v1` 路由要求 `X-API-Key`。
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes<R>(state: AppState<R>) -> Router
where
    R: TargetRepository + 'static,
{
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version))
        .route("/ws", get(ws_handler::ws_handler));

    let protected_routes = Router::new()
        .route(
            "/v1/targets",
            post(target_handler::create_target::<R>).get(target_handler::list_targets::<R>),
        )
        .route(
            "/v1/targets/bulk-delete",
            post(target_handler::bulk_delete_targets::<R>),
        )
        .route(
            "/v1/targets/{id}",
            get(target_handler::get_target::<R>).delete(target_handler::delete_target::<R>),
        )
        .route("/v1/targets/{id}/scan", post(scan_handler::start_scan::<R>))
        .route(
            "/v1/targets/{id}/cancel-scan",
            post(scan_handler::cancel_scan::<R>),
        )
        .route("/v1/scans", get(scan_handler::list_active_scans::<R>))
        .layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(Extension(state.targets))
        .layer(Extension(state.scans))
        .layer(Extension(state.hub))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// 返回服务状态以及在线订阅者数量
pub async fn health_check(Extension(hub): Extension<EventHub>) -> Json<Value> {
    match hub.subscriber_count().await {
        Ok(subscribers) => Json(json!({ "status": "ok", "subscribers": subscribers })),
        Err(_) => Json(json!({ "status": "degraded", "subscribers": 0 })),
    }
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
