// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 页面分析（page_analyzer）：HTML版本识别、元数据提取与链接归类
pub mod page_analyzer;
