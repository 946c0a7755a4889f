// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::scan::CrawlAggregate;

/// 审计目标实体
///
/// 表示一个已登记的待审计网址，以及最近一次扫描写回的页面元数据
/// 和链接统计。目标的创建和删除属于 CRUD 层，扫描编排器只读取并改写它。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// 目标唯一标识符
    pub id: Uuid,
    /// 被审计的页面地址（全局唯一）
    pub url: String,
    /// 扫描状态
    pub status: TargetStatus,
    /// 页面标题
    pub title: String,
    /// 检测到的HTML版本标签
    pub html_version: String,
    /// 标题标签计数（h1..h6 → 次数）
    pub headings_count: BTreeMap<String, i32>,
    /// 站内链接数
    pub internal_links: i32,
    /// 站外链接数
    pub external_links: i32,
    /// 失效链接数
    pub broken_links: i32,
    /// 页面是否包含登录表单
    pub has_login_form: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
    /// 最近一次扫描开始时间
    pub crawl_started_at: Option<DateTime<Utc>>,
    /// 最近一次扫描结束时间
    pub crawl_finished_at: Option<DateTime<Utc>>,
}

impl Target {
    /// 以排队状态创建一个新的目标
    pub fn new(url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            status: TargetStatus::Queued,
            title: String::new(),
            html_version: String::new(),
            headings_count: BTreeMap::new(),
            internal_links: 0,
            external_links: 0,
            broken_links: 0,
            has_login_form: false,
            created_at: now,
            updated_at: now,
            crawl_started_at: None,
            crawl_finished_at: None,
        }
    }

    /// 将一次扫描的聚合结果写回到目标上
    ///
    /// 覆盖全部页面元数据和链接计数，并记录最终状态与结束时间。
    pub fn apply_aggregate(
        &mut self,
        aggregate: &CrawlAggregate,
        status: TargetStatus,
        finished_at: DateTime<Utc>,
    ) {
        self.title = aggregate.title.clone();
        self.html_version = aggregate.html_version.clone();
        self.headings_count = aggregate
            .headings
            .iter()
            .map(|(tag, count)| (tag.clone(), saturating_i32(*count)))
            .collect();
        self.internal_links = saturating_i32(aggregate.internal_links);
        self.external_links = saturating_i32(aggregate.external_links);
        self.broken_links = saturating_i32(aggregate.broken_links);
        self.has_login_form = aggregate.has_login_form;
        self.status = status;
        self.crawl_finished_at = Some(finished_at);
        self.updated_at = finished_at;
    }
}

fn saturating_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// 目标扫描状态
///
/// 状态转换严格单向：
/// Queued → Crawling → Completed/Failed/Cancelled
///
/// 终态目标可以重新发起扫描，此时回到 Crawling。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// 已登记，尚未扫描
    #[default]
    Queued,
    /// 扫描中
    Crawling,
    /// 已完成
    Completed,
    /// 已失败
    Failed,
    /// 已取消
    Cancelled,
}

impl TargetStatus {
    /// 是否为终态
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TargetStatus::Completed | TargetStatus::Failed | TargetStatus::Cancelled
        )
    }

    /// 判断从当前状态转换到 `next` 是否合法
    pub fn can_transition_to(self, next: TargetStatus) -> bool {
        match (self, next) {
            // A fresh scan may start from queued or from any terminal state.
            (from, TargetStatus::Crawling) => from == TargetStatus::Queued || from.is_terminal(),
            (TargetStatus::Crawling, to) => to.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetStatus::Queued => "queued",
            TargetStatus::Crawling => "crawling",
            TargetStatus::Completed => "completed",
            TargetStatus::Failed => "failed",
            TargetStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 从字符串解析扫描状态
///
/// 用于从数据库和查询参数中恢复状态值
impl FromStr for TargetStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TargetStatus::Queued),
            "crawling" => Ok(TargetStatus::Crawling),
            "completed" => Ok(TargetStatus::Completed),
            "failed" => Ok(TargetStatus::Failed),
            "cancelled" => Ok(TargetStatus::Cancelled),
            _ => Err(()),
        }
    }
}
