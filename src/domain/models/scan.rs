// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::target::TargetStatus;

/// 链接归类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// 与被扫描页面同一主机
    Internal,
    /// 指向其他主机
    External,
}

/// 扫描事件
///
/// 页面解析和链接探测产生的增量结果，由单一的聚合器按到达顺序归并，
/// 生产者之间无需共享可变状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    /// 页面标题
    Title(String),
    /// HTML版本标签
    HtmlVersion(String),
    /// 发现一个标题标签（h1..h6）
    Heading(String),
    /// 发现一个已归类的链接
    Link(LinkKind),
    /// 一个链接探测失败
    BrokenLink,
    /// 发现登录表单
    LoginForm,
    /// 主请求失败
    Failed,
    /// 观察到取消信号
    Cancelled,
}

/// 一次扫描的聚合结果
///
/// 只存在于一次扫描执行期间，由聚合器独占写入。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlAggregate {
    pub title: String,
    pub html_version: String,
    pub headings: BTreeMap<String, u32>,
    pub internal_links: u32,
    pub external_links: u32,
    pub broken_links: u32,
    pub has_login_form: bool,
    pub failed: bool,
    pub cancelled: bool,
}

impl CrawlAggregate {
    /// 归并一个扫描事件
    pub fn apply(&mut self, event: CrawlEvent) {
        match event {
            CrawlEvent::Title(title) => self.title = title,
            CrawlEvent::HtmlVersion(version) => self.html_version = version,
            CrawlEvent::Heading(tag) => *self.headings.entry(tag).or_insert(0) += 1,
            CrawlEvent::Link(LinkKind::Internal) => self.internal_links += 1,
            CrawlEvent::Link(LinkKind::External) => self.external_links += 1,
            CrawlEvent::BrokenLink => self.broken_links += 1,
            CrawlEvent::LoginForm => self.has_login_form = true,
            CrawlEvent::Failed => self.failed = true,
            CrawlEvent::Cancelled => self.cancelled = true,
        }
    }

    /// 一个仅标记失败的空聚合
    pub fn failed() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }

    /// 推导最终状态
    ///
    /// 优先级：failed > cancelled > completed。
    pub fn final_status(&self) -> TargetStatus {
        if self.failed {
            TargetStatus::Failed
        } else if self.cancelled {
            TargetStatus::Cancelled
        } else {
            TargetStatus::Completed
        }
    }
}

/// 状态变更通知
///
/// 序列化为 `{"id": ..., "status": ...}` 推送给实时订阅者，不含其他字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: Uuid,
    pub status: TargetStatus,
}
