//! 文本辅助函数

use regex::Regex;
use std::sync::OnceLock;

fn url_regex() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>"'，。；、）】]+"#).expect("url regex is valid")
    })
}

/// 字符数（按 Unicode 标量计）
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 提取文本中的链接，保持出现顺序并去重
///
/// 末尾的英文标点（`.,;:!?)]`）不算链接的一部分。
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for m in url_regex().find_iter(text) {
        let url = m
            .as_str()
            .trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']'));
        if !url.is_empty() && !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// 从文本中删除给定的链接，并压缩多余空白
pub fn strip_urls(text: &str, urls: &[String]) -> String {
    // 先删长链接，避免短链接是长链接前缀时删出残片
    let mut ordered: Vec<&String> = urls.iter().collect();
    ordered.sort_by_key(|u| std::cmp::Reverse(u.len()));

    let mut stripped = text.to_string();
    for url in ordered {
        stripped = stripped.replace(url.as_str(), "");
    }
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
