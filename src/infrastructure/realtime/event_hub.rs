// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::RealtimeSettings;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 推送给订阅者的消息，广播时只复制引用
pub type HubMessage = Arc<str>;

/// 事件中心错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HubError {
    /// 事件循环已经退出
    #[error("Event hub is not running")]
    Closed,
}

enum HubCommand {
    Register {
        id: Uuid,
        queue: mpsc::Sender<HubMessage>,
    },
    Unregister(Uuid),
    Broadcast(HubMessage),
    Count(oneshot::Sender<usize>),
}

/// 订阅者接收端
///
/// 出站队列被事件中心关闭后 `recv` 返回 `None`。
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<HubMessage>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 接收下一条消息
    pub async fn recv(&mut self) -> Option<HubMessage> {
        self.rx.recv().await
    }
}

/// 事件中心
///
/// 进程级发布/订阅代理。订阅者集合由唯一的事件循环任务独占，
/// 注册、注销和广播都经由同一个命令通道串行处理，无需额外加锁。
///
/// 每个订阅者拥有一个有界出站队列；广播时队列已满的订阅者会被强制注销并关闭队列，
/// 广播本身从不等待慢消费者。
#[derive(Clone)]
pub struct EventHub {
    commands: mpsc::Sender<HubCommand>,
    queue_capacity: usize,
}

impl EventHub {
    /// 启动事件循环
    ///
    /// # 参数
    ///
    /// * `settings` - 实时推送配置
    ///
    /// # 返回值
    ///
    /// 返回事件中心句柄以及事件循环任务句柄。所有句柄释放后事件循环退出。
    pub fn spawn(settings: &RealtimeSettings) -> (Self, JoinHandle<()>) {
        let (commands, rx) = mpsc::channel(settings.command_buffer.max(1));
        let handle = tokio::spawn(run_loop(rx));
        (
            Self {
                commands,
                queue_capacity: settings.subscriber_queue_capacity.max(1),
            },
            handle,
        )
    }

    /// 注册一个新的订阅者
    pub async fn register(&self) -> Result<Subscription, HubError> {
        let (queue, rx) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();
        self.send(HubCommand::Register { id, queue }).await?;
        Ok(Subscription { id, rx })
    }

    /// 注销订阅者并关闭其出站队列，重复调用无副作用
    pub async fn unregister(&self, id: Uuid) -> Result<(), HubError> {
        self.send(HubCommand::Unregister(id)).await
    }

    /// 向所有在线订阅者广播一条消息
    pub async fn broadcast(&self, message: impl Into<HubMessage>) -> Result<(), HubError> {
        self.send(HubCommand::Broadcast(message.into())).await
    }

    /// 当前在线订阅者数量
    pub async fn subscriber_count(&self) -> Result<usize, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::Count(tx)).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HubError::Closed)
    }
}

async fn run_loop(mut rx: mpsc::Receiver<HubCommand>) {
    let mut subscribers: HashMap<Uuid, mpsc::Sender<HubMessage>> = HashMap::new();

    while let Some(command) = rx.recv().await {
        match command {
            HubCommand::Register { id, queue } => {
                subscribers.insert(id, queue);
                metrics::gauge!("hub_subscribers").set(subscribers.len() as f64);
                info!("Subscriber {} registered", id);
            }
            HubCommand::Unregister(id) => {
                // Dropping the sender closes the subscriber's queue.
                if subscribers.remove(&id).is_some() {
                    metrics::gauge!("hub_subscribers").set(subscribers.len() as f64);
                    info!("Subscriber {} unregistered", id);
                }
            }
            HubCommand::Broadcast(message) => {
                subscribers.retain(|id, queue| match queue.try_send(message.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!("Subscriber {} queue is full, disconnecting", id);
                        metrics::counter!("hub_subscribers_dropped_total").increment(1);
                        false
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Subscriber {} already gone", id);
                        false
                    }
                });
                metrics::gauge!("hub_subscribers").set(subscribers.len() as f64);
            }
            HubCommand::Count(reply) => {
                let _ = reply.send(subscribers.len());
            }
        }
    }

    debug!("Event hub stopped with {} subscribers", subscribers.len());
}
