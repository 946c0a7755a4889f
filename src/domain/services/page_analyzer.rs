// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::scan::LinkKind;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static HEADINGS: LazyLock<Selector> = LazyLock::new(|| selector("h1, h2, h3, h4, h5, h6"));
static FORMS: LazyLock<Selector> = LazyLock::new(|| selector("form"));
static INPUTS: LazyLock<Selector> = LazyLock::new(|| selector("input"));
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static BASE: LazyLock<Selector> = LazyLock::new(|| selector("base[href]"));

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

pub const HTML5: &str = "HTML5";
pub const HTML4: &str = "HTML4";
pub const XHTML: &str = "XHTML";
pub const UNKNOWN_VERSION: &str = "Unknown or older";

/// 页面中发现的一个已归类链接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// 解析后的绝对地址
    pub url: Url,
    /// 站内/站外
    pub kind: LinkKind,
}

/// 单个页面的结构化分析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReport {
    pub title: String,
    pub html_version: String,
    /// 按文档顺序出现的标题标签名
    pub headings: Vec<String>,
    pub has_login_form: bool,
    /// 按文档顺序出现的链接，同一地址出现多次则保留多次
    pub links: Vec<DiscoveredLink>,
}

/// 页面分析器
///
/// 负责从HTML中提取标题、HTML版本、标题标签、登录表单以及链接归类。
/// 纯函数，不做任何网络访问。
pub struct PageAnalyzer;

impl PageAnalyzer {
    /// 分析页面内容
    ///
    /// # 参数
    ///
    /// * `body` - 响应正文
    /// * `page_url` - 被扫描页面的地址，用于解析相对链接和判定站内链接
    ///
    /// # 返回值
    ///
    /// 返回页面分析结果
    pub fn analyze(body: &str, page_url: &Url) -> PageReport {
        let document = Html::parse_document(body);

        let title = document
            .select(&TITLE)
            .next()
            .map(|element| element.text().collect::<String>())
            .unwrap_or_default();

        let headings = document
            .select(&HEADINGS)
            .map(|element| element.value().name().to_ascii_lowercase())
            .collect();

        let has_login_form = document.select(&FORMS).any(Self::is_login_form);

        let base = document
            .select(&BASE)
            .next()
            .and_then(|element| element.value().attr("href"))
            .and_then(|href| page_url.join(href.trim()).ok())
            .unwrap_or_else(|| page_url.clone());

        let links = document
            .select(&ANCHORS)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| Self::classify_link(href, &base, page_url))
            .collect();

        PageReport {
            title,
            html_version: Self::detect_html_version(body).to_string(),
            headings,
            has_login_form,
            links,
        }
    }

    /// 检测HTML版本
    ///
    /// 对正文做大小写不敏感的子串匹配，按 `<!doctype html>`、`html 4.01`、
    /// `xhtml` 的优先级取第一个命中的规则。
    pub fn detect_html_version(body: &str) -> &'static str {
        let lowered = body.to_lowercase();
        if lowered.contains("<!doctype html>") {
            HTML5
        } else if lowered.contains("html 4.01") {
            HTML4
        } else if lowered.contains("xhtml") {
            XHTML
        } else {
            UNKNOWN_VERSION
        }
    }

    /// 解析并归类单个链接
    ///
    /// 纯片段链接和无法解析为绝对地址的链接返回 `None`。空 `href` 指向页面自身。
    /// 非网络协议（`mailto:`、`javascript:` 等）没有主机，按站外链接处理。
    pub fn classify_link(href: &str, base: &Url, page_url: &Url) -> Option<DiscoveredLink> {
        let href = href.trim();
        if href.starts_with('#') {
            return None;
        }

        let mut url = base.join(href).ok()?;
        let kind = match url.host_str() {
            Some(host) if Some(host) == page_url.host_str() => LinkKind::Internal,
            _ => LinkKind::External,
        };

        url.set_fragment(None);
        Some(DiscoveredLink { url, kind })
    }

    fn is_login_form(form: ElementRef<'_>) -> bool {
        form.select(&INPUTS).any(|input| {
            let element = input.value();
            let is_password = element
                .attr("type")
                .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("password"));
            let has_name = element.attr("name").is_some_and(|name| !name.is_empty());
            is_password && has_name
        })
    }
}

#[cfg(test)]
#[path = "page_analyzer_test.rs"]
mod tests;
