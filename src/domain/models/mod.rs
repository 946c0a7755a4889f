// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 审计目标（target）：已登记的网址及最近一次扫描的结果
/// - 扫描（scan）：扫描事件、聚合结果与状态变更通知
pub mod scan;
pub mod target;
