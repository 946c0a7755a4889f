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

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// API 密钥请求头
pub const API_KEY_HEADER: &str = "x-api-key";

/// 认证状态
#[derive(Clone)]
pub struct AuthState {
    /// 配置中的 API 密钥，为空时拒绝所有受保护请求
    pub api_key: Arc<str>,
}

impl AuthState {
    pub fn new(api_key: impl Into<Arc<str>>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    fn accepts(&self, presented: &str) -> bool {
        !self.api_key.is_empty() && constant_time_eq(self.api_key.as_bytes(), presented.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// 认证中间件
///
/// 校验请求中的 `X-API-Key` 请求头
///
/// # 参数
///
/// * `state` - 认证状态
/// * `req` - HTTP请求
/// * `next` - 下一个中间件
///
/// # 返回值
///
/// * `Ok(Response)` - 认证成功的响应
/// * `Err(StatusCode)` - 认证失败的状态码
pub async fn auth_middleware(
    State(state): State<AuthState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = req.uri().path();
    debug!("AuthMiddleware processing path: {}", path);

    if state.api_key.is_empty() {
        warn!("API key is not configured, rejecting request to {}", path);
        return Err(StatusCode::UNAUTHORIZED);
    }

    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|header| header.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !state.accepts(presented) {
        warn!("Invalid API key presented for {}", path);
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}
