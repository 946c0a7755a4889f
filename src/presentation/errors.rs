// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::application::use_cases::scan_use_case::ScanError;
use crate::application::use_cases::target_use_case::TargetUseCaseError;
use crate::domain::repositories::target_repository::RepositoryError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口。
/// 可识别的业务错误映射为对应状态码和错误码，其余一律返回不含细节的 500。
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    /// 状态码、错误码和对外消息
    fn classify(&self) -> (StatusCode, &'static str, String) {
        if let Some(e) = self.0.downcast_ref::<ScanError>() {
            return match e {
                ScanError::NotFound => (StatusCode::NOT_FOUND, "not_found", e.to_string()),
                ScanError::AlreadyInProgress => {
                    (StatusCode::CONFLICT, "scan_in_progress", e.to_string())
                }
                ScanError::NoActiveScan => {
                    (StatusCode::NOT_FOUND, "no_active_scan", e.to_string())
                }
                ScanError::InvalidUrl(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_url", e.to_string())
                }
                ScanError::Repository(_) => internal(),
            };
        }

        if let Some(e) = self.0.downcast_ref::<TargetUseCaseError>() {
            return match e {
                TargetUseCaseError::ValidationError(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
                }
                TargetUseCaseError::NotFound => {
                    (StatusCode::NOT_FOUND, "not_found", e.to_string())
                }
                TargetUseCaseError::AlreadyExists => {
                    (StatusCode::CONFLICT, "already_exists", e.to_string())
                }
                TargetUseCaseError::Repository(_) => internal(),
            };
        }

        match self.0.downcast_ref::<RepositoryError>() {
            Some(RepositoryError::NotFound) => {
                (StatusCode::NOT_FOUND, "not_found", "Record not found".to_string())
            }
            Some(RepositoryError::AlreadyExists) => (
                StatusCode::CONFLICT,
                "already_exists",
                "Record already exists".to_string(),
            ),
            _ => internal(),
        }
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Internal server error".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.classify();
        if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
        }

        let body = Json(json!({ "error": code, "message": message }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
