// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::infrastructure::realtime::event_hub::EventHub;

/// 实时状态推送端点
///
/// 升级为 WebSocket 后注册为事件中心的订阅者，每条状态变更以一个
/// UTF-8 JSON 文本帧推送。客户端发来的数据帧被忽略。
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(hub): Extension<EventHub>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: EventHub) {
    let mut subscription = match hub.register().await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!("Rejecting realtime client: {}", e);
            return;
        }
    };
    let id = subscription.id();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            message = subscription.recv() => match message {
                Some(text) => {
                    if let Err(e) = sender.send(Message::Text(text.to_string().into())).await {
                        debug!("Realtime client {} send failed: {}", id, e);
                        break;
                    }
                }
                // Queue closed by the hub, e.g. after overflow.
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    if let Err(e) = hub.unregister(id).await {
        debug!("Unregister of {} skipped: {}", id, e);
    }
    let _ = sender.close().await;
    debug!("Realtime client {} disconnected", id);
}
