use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 文章分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

/// 文章标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

/// 博客文章
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// 主键
    pub id: u64,
    /// 文章标题
    pub title: String,
    /// 正文（原始 Markdown）
    pub body: String,
    /// 创建时间
    pub created_time: DateTime<Utc>,
    /// 最后修改时间
    pub modified_time: DateTime<Utc>,
    /// 文章摘要
    pub excerpt: String,
    /// 所属分类（一篇文章只有一个分类）
    pub category: Category,
    /// 标签（可以没有）
    pub tags: Vec<Tag>,
    /// 作者
    pub author: String,
    /// 阅读量
    pub views: u64,
    /// 源文件路径
    #[serde(skip)]
    pub source: PathBuf,
}

impl Post {
    /// 阅读量 +1
    pub fn increase_views(&mut self) {
        self.views += 1;
    }

    pub fn has_tag(&self, tag_id: u64) -> bool {
        self.tags.iter().any(|tag| tag.id == tag_id)
    }
}

/// 文章评论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    /// 评论所属文章
    pub post_id: u64,
    pub name: String,
    pub email: String,
    /// 个人网站，可以为空
    pub url: Option<String>,
    pub text: String,
    pub created_time: DateTime<Utc>,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: String = self.text.chars().take(20).collect();
        f.write_str(&preview)
    }
}

/// 附带文章数的分类或标签，用于侧边栏
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counted<T> {
    #[serde(flatten)]
    pub item: T,
    pub num_posts: usize,
}

/// 归档月份
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ArchiveMonth {
    pub year: i32,
    pub month: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(text: &str) -> Comment {
        Comment {
            id: 1,
            post_id: 1,
            name: "reader".to_string(),
            email: "reader@example.com".to_string(),
            url: None,
            text: text.to_string(),
            created_time: Utc::now(),
        }
    }

    #[test]
    fn comment_displays_first_twenty_chars() {
        assert_eq!(comment("short").to_string(), "short");
        assert_eq!(
            comment("这是一条非常非常长的评论，用来测试截断是否按照字符而不是字节进行").to_string(),
            "这是一条非常非常长的评论，用来测试截断是"
        );
    }

    #[test]
    fn counted_flattens_item() {
        let counted = Counted {
            item: Tag { id: 3, name: "rust".to_string() },
            num_posts: 2,
        };
        let value = serde_json::to_value(&counted).unwrap();
        assert_eq!(value, serde_json::json!({ "id": 3, "name": "rust", "num_posts": 2 }));
    }
}
