//! 文本处理辅助函数

use regex::Regex;

/// 去除文本中的 HTML 标签
///
/// 用简单的标签匹配做移除，不处理嵌套转义等复杂情况
pub fn strip_html_tags(text: &str) -> String {
    if let Ok(re) = Regex::new(r"<[^>]*>") {
        re.replace_all(text, "").into_owned()
    } else {
        text.to_string()
    }
}

/// 按字符数截断文本（不追加省略号）
pub fn clip_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect()
    } else {
        text.to_string()
    }
}
