// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 实时推送模块
///
/// 提供进程级的状态变更发布/订阅能力
pub mod event_hub;

pub use event_hub::{EventHub, HubError, HubMessage, Subscription};
