// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::target::{Target, TargetStatus};
use crate::domain::repositories::target_repository::{SortField, SortOrder, TargetQuery};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// 每页条数上限
pub const MAX_PAGE_SIZE: u64 = 100;

/// 创建目标请求DTO
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateTargetDto {
    /// 待审计页面地址
    #[validate(url)]
    pub url: String,
}

/// 批量删除请求DTO
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct BulkDeleteDto {
    #[validate(length(min = 1))]
    pub ids: Vec<Uuid>,
}

/// 目标列表查询参数
///
/// 取值沿用前端约定：`status`、`htmlVersion`、`hasLogin` 为 `all` 或空时不过滤，
/// `hasLogin` 取 `yes`/`no`。无法识别的分页参数回落到默认值。
///
/// 日期参数接受 RFC 3339 时间或 `YYYY-MM-DD`，后者作为起点取当天零点，
/// 作为终点取当天最后一刻。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub html_version: Option<String>,
    pub has_login: Option<String>,
    pub internal_links_min: Option<i32>,
    pub internal_links_max: Option<i32>,
    pub external_links_min: Option<i32>,
    pub external_links_max: Option<i32>,
    pub broken_links_min: Option<i32>,
    pub broken_links_max: Option<i32>,
    pub date_created_from: Option<String>,
    pub date_created_to: Option<String>,
    pub date_crawled_from: Option<String>,
    pub date_crawled_to: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl TargetListParams {
    /// 转换为仓库查询
    ///
    /// # 返回值
    ///
    /// * `Ok(TargetQuery)` - 转换成功
    /// * `Err(String)` - 状态或日期取值非法
    pub fn into_query(self) -> Result<TargetQuery, String> {
        let defaults = TargetQuery::default();

        let status = match filter_value(self.status) {
            Some(value) => Some(
                value
                    .parse::<TargetStatus>()
                    .map_err(|_| format!("Unknown status filter: {}", value))?,
            ),
            None => None,
        };

        let has_login_form = filter_value(self.has_login).map(|value| value == "yes");

        let created_from = parse_date_bound(self.date_created_from, DateBound::From)?;
        let created_to = parse_date_bound(self.date_created_to, DateBound::To)?;
        let crawled_from = parse_date_bound(self.date_crawled_from, DateBound::From)?;
        let crawled_to = parse_date_bound(self.date_crawled_to, DateBound::To)?;

        // Unknown sort keys fall back to newest first.
        let sort_by = self.sort_by.as_deref().and_then(parse_sort_field);
        let sort_order = match (sort_by, self.sort_order.as_deref()) {
            (None, _) => SortOrder::Desc,
            (Some(_), Some("desc")) => SortOrder::Desc,
            (Some(_), _) => SortOrder::Asc,
        };

        Ok(TargetQuery {
            page: self.page.filter(|page| *page >= 1).unwrap_or(defaults.page),
            limit: self
                .limit
                .filter(|limit| *limit >= 1)
                .map(|limit| limit.min(MAX_PAGE_SIZE))
                .unwrap_or(defaults.limit),
            search: self
                .search
                .map(|search| search.trim().to_string())
                .filter(|search| !search.is_empty()),
            status,
            html_version: filter_value(self.html_version),
            has_login_form,
            internal_links_min: self.internal_links_min,
            internal_links_max: self.internal_links_max,
            external_links_min: self.external_links_min,
            external_links_max: self.external_links_max,
            broken_links_min: self.broken_links_min,
            broken_links_max: self.broken_links_max,
            created_from,
            created_to,
            crawled_from,
            crawled_to,
            sort_by: sort_by.unwrap_or_default(),
            sort_order,
        })
    }
}

fn filter_value(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty() && value != "all")
}

#[derive(Clone, Copy)]
enum DateBound {
    From,
    To,
}

fn parse_date_bound(
    value: Option<String>,
    bound: DateBound,
) -> Result<Option<DateTime<Utc>>, String> {
    let Some(value) = value.map(|value| value.trim().to_string()) else {
        return Ok(None);
    };
    if value.is_empty() {
        return Ok(None);
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(&value) {
        return Ok(Some(instant.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date filter: {}", value))?;
    let time = match bound {
        DateBound::From => NaiveTime::MIN,
        DateBound::To => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
            .ok_or_else(|| format!("Invalid date filter: {}", value))?,
    };
    Ok(Some(date.and_time(time).and_utc()))
}

fn parse_sort_field(value: &str) -> Option<SortField> {
    match value {
        "status" => Some(SortField::Status),
        "title" => Some(SortField::Title),
        "url" => Some(SortField::Url),
        "htmlVersion" => Some(SortField::HtmlVersion),
        "internalLinks" => Some(SortField::InternalLinks),
        "externalLinks" => Some(SortField::ExternalLinks),
        "brokenLinks" => Some(SortField::BrokenLinks),
        "createdAt" | "CreatedAt" => Some(SortField::CreatedAt),
        _ => None,
    }
}

/// 分页信息
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
}

impl PaginationDto {
    pub fn new(total_items: u64, page: u64, limit: u64) -> Self {
        Self {
            total_items,
            total_pages: total_items.div_ceil(limit.max(1)),
            current_page: page,
            page_size: limit,
        }
    }
}

/// 目标列表响应DTO
#[derive(Debug, Serialize, Deserialize)]
pub struct TargetListResponseDto {
    pub data: Vec<Target>,
    pub pagination: PaginationDto,
}

/// 批量删除响应DTO
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponseDto {
    pub message: String,
    pub rows_affected: u64,
}

/// 扫描受理响应DTO
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanAcceptedDto {
    pub message: String,
    pub target_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}
