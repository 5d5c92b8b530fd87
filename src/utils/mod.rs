use chrono::{DateTime, Utc};
use std::path::Path;

pub mod markdown;

/// 从标题生成 URL 友好的别名
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// 检查文件是否为 Markdown 文件
pub fn is_markdown_file<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if let Some(ext) = path.extension() {
        ext == "md" || ext == "markdown"
    } else {
        false
    }
}

/// 相对于 `now` 的时间描述
pub fn relative_time(date: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(*date);

    if duration.num_minutes() < 1 {
        "just now".to_string()
    } else if duration.num_minutes() < 60 {
        format!("{} minutes ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{} hours ago", duration.num_hours())
    } else if duration.num_days() < 30 {
        format!("{} days ago", duration.num_days())
    } else if duration.num_days() < 365 {
        format!("{} months ago", duration.num_days() / 30)
    } else {
        format!("{} years ago", duration.num_days() / 365)
    }
}

/// 计算两个日期之间的相对时间描述
pub fn relative_time_from_now(date: &DateTime<Utc>) -> String {
    relative_time(date, &Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn detects_markdown_files() {
        assert!(is_markdown_file("posts/hello.md"));
        assert!(is_markdown_file("hello.markdown"));
        assert!(!is_markdown_file("hello.html"));
        assert!(!is_markdown_file("README"));
    }

    #[test]
    fn describes_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(relative_time(&now, &now), "just now");
        assert_eq!(relative_time(&(now - Duration::minutes(5)), &now), "5 minutes ago");
        assert_eq!(relative_time(&(now - Duration::hours(3)), &now), "3 hours ago");
        assert_eq!(relative_time(&(now - Duration::days(2)), &now), "2 days ago");
        assert_eq!(relative_time(&(now - Duration::days(400)), &now), "1 years ago");
    }
}
