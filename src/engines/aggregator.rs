// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scan::{CrawlAggregate, CrawlEvent};
use tokio::sync::mpsc;

/// 扫描事件发送端
///
/// 可以自由克隆给并发的解析和探测任务；全部发送端释放后聚合结束。
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<CrawlEvent>,
}

impl EventSink {
    /// 发送一个事件
    ///
    /// 聚合器已结束时事件被丢弃。
    pub async fn emit(&self, event: CrawlEvent) {
        let _ = self.tx.send(event).await;
    }
}

/// 扫描聚合器
///
/// 单写者归并：独占 `CrawlAggregate`，按到达顺序应用事件，
/// 计数器因此不存在并发丢失更新。
pub struct CrawlAggregator {
    rx: mpsc::Receiver<CrawlEvent>,
    aggregate: CrawlAggregate,
}

impl CrawlAggregator {
    /// 创建聚合器及其发送端
    ///
    /// # 参数
    ///
    /// * `buffer` - 事件通道容量
    pub fn channel(buffer: usize) -> (EventSink, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            EventSink { tx },
            Self {
                rx,
                aggregate: CrawlAggregate::default(),
            },
        )
    }

    /// 持续归并直到所有发送端释放，返回最终聚合结果
    pub async fn collect(mut self) -> CrawlAggregate {
        while let Some(event) = self.rx.recv().await {
            self.aggregate.apply(event);
        }
        self.aggregate
    }
}
