// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含目标管理与扫描编排用例
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、页面分析服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 实现单页扫描引擎、链接探测与结果聚合
pub mod engines;

/// 基础设施模块
///
/// 提供数据库、指标导出和实时推送
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由、处理器和中间件
pub mod presentation;

/// 工具模块
///
/// 提供日志初始化等辅助功能
pub mod utils;

/// 工作器模块
///
/// 实现后台扫描任务与扫描登记表
pub mod workers;
