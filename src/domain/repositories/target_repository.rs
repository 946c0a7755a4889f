// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::target::{Target, TargetStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 唯一约束冲突
    #[error("Record already exists")]
    AlreadyExists,
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// 可排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Status,
    Title,
    Url,
    HtmlVersion,
    InternalLinks,
    ExternalLinks,
    BrokenLinks,
    #[default]
    CreatedAt,
}

/// 目标查询参数
#[derive(Debug, Clone)]
pub struct TargetQuery {
    /// 页码（从1开始）
    pub page: u64,
    /// 每页条数
    pub limit: u64,
    /// 对URL和标题做模糊匹配
    pub search: Option<String>,
    pub status: Option<TargetStatus>,
    pub html_version: Option<String>,
    pub has_login_form: Option<bool>,
    pub internal_links_min: Option<i32>,
    pub internal_links_max: Option<i32>,
    pub external_links_min: Option<i32>,
    pub external_links_max: Option<i32>,
    pub broken_links_min: Option<i32>,
    pub broken_links_max: Option<i32>,
    /// 创建时间区间（闭区间）
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    /// 扫描结束时间区间（闭区间），未扫描过的目标不会命中
    pub crawled_from: Option<DateTime<Utc>>,
    pub crawled_to: Option<DateTime<Utc>>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for TargetQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
            status: None,
            html_version: None,
            has_login_form: None,
            internal_links_min: None,
            internal_links_max: None,
            external_links_min: None,
            external_links_max: None,
            broken_links_min: None,
            broken_links_max: None,
            created_from: None,
            created_to: None,
            crawled_from: None,
            crawled_to: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

/// 目标仓库特质
///
/// 定义审计目标的数据访问接口。扫描编排器只依赖其中的
/// `find_by_id`、`save`、`mark_crawl_started` 和 `update_status`，
/// 其余操作服务于 CRUD 层。
#[async_trait]
pub trait TargetRepository: Send + Sync {
    /// 创建目标
    ///
    /// # 返回值
    ///
    /// * `Ok(Target)` - 创建成功
    /// * `Err(RepositoryError::AlreadyExists)` - URL 已被登记
    async fn create(&self, target: &Target) -> Result<Target, RepositoryError>;

    /// 根据ID查找目标
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Target>, RepositoryError>;

    /// 根据URL查找目标
    async fn find_by_url(&self, url: &str) -> Result<Option<Target>, RepositoryError>;

    /// 整体保存目标（覆盖全部可变字段）
    ///
    /// 目标不存在时返回 `RepositoryError::NotFound`
    async fn save(&self, target: &Target) -> Result<Target, RepositoryError>;

    /// 仅写入扫描开始时间
    async fn mark_crawl_started(
        &self,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// 仅写入状态
    async fn update_status(&self, id: Uuid, status: TargetStatus) -> Result<(), RepositoryError>;

    /// 分页查询，返回当前页和总条数
    async fn list(&self, query: &TargetQuery) -> Result<(Vec<Target>, u64), RepositoryError>;

    /// 删除单个目标
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// 批量删除，返回实际删除条数
    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, RepositoryError>;

    /// 将上一个进程遗留的扫描中目标标记为失败，返回受影响条数
    async fn reset_interrupted(&self) -> Result<u64, RepositoryError>;
}
