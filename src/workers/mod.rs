// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供后台扫描任务的执行和登记管理
/// 包括扫描登记表、释放守卫和扫描工作器
pub mod scan_registry;
pub mod scan_worker;

pub use scan_registry::ScanRegistry;
pub use scan_worker::ScanWorker;
