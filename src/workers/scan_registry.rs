// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 进行中的扫描任务
#[derive(Debug, Clone)]
struct ScanJob {
    job_id: Uuid,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

/// 成功登记后交给后台任务的凭据
#[derive(Debug, Clone)]
pub struct ScanTicket {
    pub target_id: Uuid,
    pub job_id: Uuid,
    pub cancel: CancellationToken,
}

/// 进行中扫描的概要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveScan {
    pub target_id: Uuid,
    pub job_id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// 扫描任务登记表
///
/// 保证每个目标同一时刻至多一个进行中的扫描。所有操作只在一把锁内完成
/// 插入、查找或删除，锁从不跨越网络调用。
///
/// 另记录每个目标最近一次登记的任务ID，取消后被新扫描取代的旧任务据此
/// 放弃写回结果。状态写入与发布通过 `lock_transitions` 串行化。
#[derive(Debug, Default)]
pub struct ScanRegistry {
    state: Mutex<RegistryState>,
    transitions: tokio::sync::Mutex<()>,
}

#[derive(Debug, Default)]
struct RegistryState {
    jobs: HashMap<Uuid, ScanJob>,
    latest: HashMap<Uuid, Uuid>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为目标登记一个新扫描
    ///
    /// 检查与插入在同一临界区内完成。目标已有进行中的扫描时返回 `None`。
    pub fn try_register(&self, target_id: Uuid) -> Option<ScanTicket> {
        let mut state = self.state.lock();
        if state.jobs.contains_key(&target_id) {
            return None;
        }

        let job = ScanJob {
            job_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            started_at: Utc::now(),
        };
        let ticket = ScanTicket {
            target_id,
            job_id: job.job_id,
            cancel: job.cancel.clone(),
        };
        state.latest.insert(target_id, job.job_id);
        state.jobs.insert(target_id, job);
        Some(ticket)
    }

    /// 发出取消信号并移除登记，目标没有进行中的扫描时返回 `false`
    pub fn cancel(&self, target_id: Uuid) -> bool {
        let job = self.state.lock().jobs.remove(&target_id);
        match job {
            Some(job) => {
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// 移除登记，仅当登记仍属于 `job_id` 时生效
    pub fn release(&self, target_id: Uuid, job_id: Uuid) -> bool {
        let mut state = self.state.lock();
        match state.jobs.get(&target_id) {
            Some(job) if job.job_id == job_id => {
                state.jobs.remove(&target_id);
                true
            }
            _ => false,
        }
    }

    /// 目标之后是否又登记过别的扫描
    ///
    /// 新扫描即使已经结束并释放登记，旧任务仍视为被取代。
    pub fn is_superseded(&self, target_id: Uuid, job_id: Uuid) -> bool {
        self.state
            .lock()
            .latest
            .get(&target_id)
            .is_some_and(|latest| *latest != job_id)
    }

    /// 清除目标的全部记录，目标被删除后调用
    pub fn forget(&self, target_id: Uuid) {
        let mut state = self.state.lock();
        if !state.jobs.contains_key(&target_id) {
            state.latest.remove(&target_id);
        }
    }

    /// 获取状态变更锁
    ///
    /// 持锁期间写入目标状态并发布，保证同一目标的变更按登记顺序送达。
    pub async fn lock_transitions(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.transitions.lock().await
    }

    pub fn contains(&self, target_id: Uuid) -> bool {
        self.state.lock().jobs.contains_key(&target_id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 当前进行中的扫描，按开始时间排序
    pub fn active(&self) -> Vec<ActiveScan> {
        let mut scans: Vec<ActiveScan> = self
            .state
            .lock()
            .jobs
            .iter()
            .map(|(target_id, job)| ActiveScan {
                target_id: *target_id,
                job_id: job.job_id,
                started_at: job.started_at,
            })
            .collect();
        scans.sort_by_key(|scan| scan.started_at);
        scans
    }
}

/// 登记释放守卫
///
/// 在后台任务的任何退出路径（包括 panic）上释放对应的登记。
pub struct JobGuard {
    registry: Arc<ScanRegistry>,
    target_id: Uuid,
    job_id: Uuid,
}

impl JobGuard {
    pub fn new(registry: Arc<ScanRegistry>, ticket: &ScanTicket) -> Self {
        Self {
            registry,
            target_id: ticket.target_id,
            job_id: ticket.job_id,
        }
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.registry.release(self.target_id, self.job_id);
    }
}
