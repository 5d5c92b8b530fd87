//! 文章仓库：从 Markdown 文件加载文章、分类和标签，并保存阅读量与评论。

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use gray_matter::engine::YAML;
use gray_matter::Matter;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::comments::CleanedComment;
use crate::core::error::{BlogError, Result};
use crate::models::{ArchiveMonth, Category, Comment, Config, Counted, Post, Tag};
use crate::utils::{is_markdown_file, markdown};

/// 自动生成摘要时截取的字符数
const EXCERPT_CHARS: usize = 54;

/// 文章的前置元数据
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    id: Option<u64>,
    title: Option<Scalar>,
    date: Option<String>,
    updated: Option<String>,
    category: Option<Scalar>,
    tags: Option<OneOrMany>,
    author: Option<Scalar>,
    excerpt: Option<Scalar>,
}

/// YAML 标量：`title: 2024`、`tags: [2023, rust]` 这类值按文本处理
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Text(value) => value,
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Scalar),
    Many(Vec<Scalar>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value.into_string()],
            Self::Many(values) => values.into_iter().map(Scalar::into_string).collect(),
        }
    }
}

/// 解析完成但还没有分配主键的文章
#[derive(Debug)]
struct PostDraft {
    explicit_id: Option<u64>,
    title: String,
    body: String,
    created_time: DateTime<Utc>,
    modified_time: DateTime<Utc>,
    excerpt: String,
    category: String,
    tags: Vec<String>,
    author: String,
    source: PathBuf,
    /// 相对 `_posts` 的源文件路径，持久化状态用它关联文章
    key: String,
}

/// 持久化到 `data_file` 的可变状态
///
/// 自动分配的主键会随文章增删而变化，所以按源文件路径保存。
#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedState {
    #[serde(default)]
    views: BTreeMap<String, u64>,
    #[serde(default)]
    comments: Vec<SavedComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SavedComment {
    /// 文章源文件（相对 `_posts`）
    post: String,
    #[serde(flatten)]
    comment: Comment,
}

#[derive(Debug, Default)]
struct StoreInner {
    /// 按创建时间倒序
    posts: Vec<Post>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    /// 按提交顺序
    comments: Vec<Comment>,
    next_comment_id: u64,
    /// 文章主键 → 源文件路径（相对 `_posts`）
    keys: HashMap<u64, String>,
    /// 每次修改加一，用来跳过过期的保存
    revision: u64,
}

impl StoreInner {
    fn snapshot(&self) -> SavedState {
        SavedState {
            views: self
                .posts
                .iter()
                .filter(|post| post.views > 0)
                .filter_map(|post| self.keys.get(&post.id).map(|key| (key.clone(), post.views)))
                .collect(),
            comments: self
                .comments
                .iter()
                .filter_map(|comment| {
                    self.keys.get(&comment.post_id).map(|key| SavedComment {
                        post: key.clone(),
                        comment: comment.clone(),
                    })
                })
                .collect(),
        }
    }
}

/// 博客内容仓库
#[derive(Debug)]
pub struct BlogStore {
    inner: RwLock<StoreInner>,
    data_file: Option<PathBuf>,
    /// 已写入 `data_file` 的版本号，同时保证一次只有一个写入者
    saved_revision: Mutex<u64>,
}

impl BlogStore {
    /// 从站点目录加载全部文章
    pub fn load(site_dir: &Path, config: &Config) -> Result<Self> {
        let posts_dir = site_dir.join(&config.source_dir).join("_posts");
        let data_file = config.data_file.as_ref().map(|file| site_dir.join(file));

        let mut drafts = Vec::new();
        if posts_dir.exists() {
            info!("加载文章目录: {}", posts_dir.display());
            for entry in WalkDir::new(&posts_dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_markdown_file(e.path()))
            {
                let path = entry.path();
                let key = path
                    .strip_prefix(&posts_dir)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .replace('\\', "/");
                let content = fs::read_to_string(path)?;
                let modified: DateTime<Utc> = entry.metadata().map_err(std::io::Error::from)?.modified()?.into();
                drafts.push(parse_post(path, key, &content, modified, config)?);
            }
        } else {
            warn!("文章目录不存在: {}", posts_dir.display());
        }

        let saved = match &data_file {
            Some(file) if file.exists() => {
                let content = fs::read_to_string(file)?;
                serde_json::from_str(&content)?
            }
            _ => SavedState::default(),
        };

        let store = Self::build(drafts, saved, data_file)?;
        {
            let inner = store.inner.read();
            info!(
                "加载了 {} 篇文章, {} 个分类, {} 个标签",
                inner.posts.len(),
                inner.categories.len(),
                inner.tags.len()
            );
        }
        Ok(store)
    }

    fn build(mut drafts: Vec<PostDraft>, saved: SavedState, data_file: Option<PathBuf>) -> Result<Self> {
        // 按创建时间正序分配主键，和依次写入数据库的顺序一致
        drafts.sort_by(|a, b| {
            a.created_time
                .cmp(&b.created_time)
                .then_with(|| a.source.cmp(&b.source))
        });

        let mut used_ids = HashSet::new();
        for draft in &drafts {
            if let Some(id) = draft.explicit_id {
                if !used_ids.insert(id) {
                    return Err(BlogError::DuplicatePostId {
                        id,
                        path: draft.source.clone(),
                    });
                }
            }
        }
        let mut next_id = used_ids.iter().max().copied().unwrap_or(0) + 1;

        let mut categories: Vec<Category> = Vec::new();
        let mut category_ids: HashMap<String, u64> = HashMap::new();
        let mut tags: Vec<Tag> = Vec::new();
        let mut tag_ids: HashMap<String, u64> = HashMap::new();
        let mut posts = Vec::with_capacity(drafts.len());
        let mut keys: HashMap<u64, String> = HashMap::new();

        for draft in drafts {
            let id = match draft.explicit_id {
                Some(id) => id,
                None => {
                    let id = next_id;
                    next_id += 1;
                    id
                }
            };

            let category = intern(&mut categories, &mut category_ids, &draft.category, |id, name| {
                Category { id, name }
            });

            let mut post_tags: Vec<Tag> = Vec::new();
            for name in &draft.tags {
                let tag = intern(&mut tags, &mut tag_ids, name, |id, name| Tag { id, name });
                if !post_tags.contains(&tag) {
                    post_tags.push(tag);
                }
            }

            debug!("文章 {}: {} ({})", id, draft.title, draft.key);
            let views = saved.views.get(&draft.key).copied().unwrap_or(0);
            keys.insert(id, draft.key);
            posts.push(Post {
                id,
                title: draft.title,
                body: draft.body,
                created_time: draft.created_time,
                modified_time: draft.modified_time,
                excerpt: draft.excerpt,
                category,
                tags: post_tags,
                author: draft.author,
                views,
                source: draft.source,
            });
        }

        posts.sort_by(|a, b| b.created_time.cmp(&a.created_time).then_with(|| b.id.cmp(&a.id)));

        let ids_by_key: HashMap<&str, u64> = keys.iter().map(|(id, key)| (key.as_str(), *id)).collect();
        let comments: Vec<Comment> = saved
            .comments
            .into_iter()
            .filter_map(|saved| match ids_by_key.get(saved.post.as_str()) {
                Some(&post_id) => Some(Comment {
                    post_id,
                    ..saved.comment
                }),
                None => {
                    warn!("丢弃评论 {}: 文章 {} 不存在", saved.comment.id, saved.post);
                    None
                }
            })
            .collect();
        let next_comment_id = comments.iter().map(|c| c.id).max().unwrap_or(0) + 1;

        Ok(Self {
            inner: RwLock::new(StoreInner {
                posts,
                categories,
                tags,
                comments,
                next_comment_id,
                keys,
                revision: 0,
            }),
            data_file,
            saved_revision: Mutex::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.read().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 全部文章，按创建时间倒序
    pub fn posts(&self) -> Vec<Post> {
        self.inner.read().posts.clone()
    }

    pub fn post(&self, id: u64) -> Option<Post> {
        self.inner.read().posts.iter().find(|post| post.id == id).cloned()
    }

    pub fn category(&self, id: u64) -> Option<Category> {
        self.inner.read().categories.iter().find(|c| c.id == id).cloned()
    }

    pub fn tag(&self, id: u64) -> Option<Tag> {
        self.inner.read().tags.iter().find(|t| t.id == id).cloned()
    }

    /// 某分类下的文章；分类不存在时返回 `None`
    pub fn posts_in_category(&self, id: u64) -> Option<Vec<Post>> {
        let inner = self.inner.read();
        if !inner.categories.iter().any(|c| c.id == id) {
            return None;
        }
        Some(
            inner
                .posts
                .iter()
                .filter(|post| post.category.id == id)
                .cloned()
                .collect(),
        )
    }

    /// 带有某标签的文章；标签不存在时返回 `None`
    pub fn posts_with_tag(&self, id: u64) -> Option<Vec<Post>> {
        let inner = self.inner.read();
        if !inner.tags.iter().any(|t| t.id == id) {
            return None;
        }
        Some(inner.posts.iter().filter(|post| post.has_tag(id)).cloned().collect())
    }

    /// 某年某月发表的文章
    pub fn posts_in_month(&self, year: i32, month: u32) -> Vec<Post> {
        self.inner
            .read()
            .posts
            .iter()
            .filter(|post| post.created_time.year() == year && post.created_time.month() == month)
            .cloned()
            .collect()
    }

    /// 最新的 `num` 篇文章
    pub fn recent_posts(&self, num: usize) -> Vec<Post> {
        self.inner.read().posts.iter().take(num).cloned().collect()
    }

    /// 有文章的月份，倒序
    pub fn archive_months(&self) -> Vec<ArchiveMonth> {
        let mut months: Vec<ArchiveMonth> = self
            .inner
            .read()
            .posts
            .iter()
            .map(|post| ArchiveMonth {
                year: post.created_time.year(),
                month: post.created_time.month(),
            })
            .collect();
        months.sort_by(|a, b| b.cmp(a));
        months.dedup();
        months
    }

    /// 分类及其文章数，不含空分类
    pub fn categories_with_counts(&self) -> Vec<Counted<Category>> {
        let inner = self.inner.read();
        inner
            .categories
            .iter()
            .map(|category| Counted {
                item: category.clone(),
                num_posts: inner.posts.iter().filter(|p| p.category.id == category.id).count(),
            })
            .filter(|counted| counted.num_posts > 0)
            .collect()
    }

    /// 标签及其文章数，不含空标签
    pub fn tags_with_counts(&self) -> Vec<Counted<Tag>> {
        let inner = self.inner.read();
        inner
            .tags
            .iter()
            .map(|tag| Counted {
                item: tag.clone(),
                num_posts: inner.posts.iter().filter(|p| p.has_tag(tag.id)).count(),
            })
            .filter(|counted| counted.num_posts > 0)
            .collect()
    }

    /// 阅读量 +1，返回新的阅读量；文章不存在时返回 `None`
    ///
    /// 阅读量保存失败只记录警告，不影响页面访问。
    pub fn increase_views(&self, id: u64) -> Option<u64> {
        let views = {
            let mut inner = self.inner.write();
            let post = inner.posts.iter_mut().find(|post| post.id == id)?;
            post.increase_views();
            let views = post.views;
            inner.revision += 1;
            views
        };

        if let Err(e) = self.persist() {
            warn!("保存阅读量失败: {}", e);
        }
        Some(views)
    }

    /// 为文章添加一条评论
    ///
    /// 配置了 `data_file` 时随即写入文件，写入失败则撤销这条评论。
    pub fn add_comment(&self, post_id: u64, cleaned: CleanedComment) -> Result<Comment> {
        let comment = {
            let mut inner = self.inner.write();
            if !inner.posts.iter().any(|post| post.id == post_id) {
                return Err(BlogError::not_found(format!("文章 {}", post_id)));
            }

            let comment = Comment {
                id: inner.next_comment_id,
                post_id,
                name: cleaned.name,
                email: cleaned.email,
                url: cleaned.url,
                text: cleaned.text,
                created_time: Utc::now(),
            };
            inner.next_comment_id += 1;
            inner.comments.push(comment.clone());
            inner.revision += 1;
            comment
        };

        if let Err(e) = self.persist() {
            {
                let mut inner = self.inner.write();
                inner.comments.retain(|c| c.id != comment.id);
                inner.revision += 1;
            }
            if let Err(retry) = self.persist() {
                debug!("撤销评论 {} 后保存失败: {}", comment.id, retry);
            }
            return Err(e);
        }

        info!("文章 {} 收到新评论 {}", post_id, comment.id);
        Ok(comment)
    }

    /// 文章下的全部评论，按提交顺序
    pub fn comments_for(&self, post_id: u64) -> Vec<Comment> {
        self.inner
            .read()
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect()
    }

    /// 把当前状态写入 `data_file`
    ///
    /// 文件写入不持有读写锁；快照在写入锁内获取，较旧的快照不会覆盖较新的。
    fn persist(&self) -> Result<()> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };

        let mut saved_revision = self.saved_revision.lock();
        let (revision, state) = {
            let inner = self.inner.read();
            (inner.revision, inner.snapshot())
        };
        if revision <= *saved_revision {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // 先写临时文件再改名，避免写到一半留下损坏的文件
        let json = serde_json::to_string_pretty(&state)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;

        *saved_revision = revision;
        Ok(())
    }
}

/// 按名称查找或新建分类/标签
fn intern<T: Clone>(
    items: &mut Vec<T>,
    ids: &mut HashMap<String, u64>,
    name: &str,
    make: impl Fn(u64, String) -> T,
) -> T {
    if let Some(&id) = ids.get(name) {
        // 主键从 1 开始连续分配
        return items[(id - 1) as usize].clone();
    }
    let id = items.len() as u64 + 1;
    let item = make(id, name.to_string());
    ids.insert(name.to_string(), id);
    items.push(item.clone());
    item
}

/// 解析单个文章文件
fn parse_post(path: &Path, key: String, content: &str, file_modified: DateTime<Utc>, config: &Config) -> Result<PostDraft> {
    let front_matter_error = |message: String| BlogError::FrontMatter {
        path: path.to_path_buf(),
        message,
    };

    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(content);

    let front: FrontMatter = match parsed.data {
        Some(pod) => pod
            .deserialize()
            .map_err(|e| front_matter_error(e.to_string()))?,
        None => FrontMatter::default(),
    };

    let title = front
        .title
        .map(Scalar::into_string)
        .filter(|title| !title.trim().is_empty())
        .ok_or_else(|| front_matter_error("缺少 title".to_string()))?;

    // 没有日期时使用文件的修改时间
    let created_time = match front.date.as_deref() {
        Some(raw) => parse_datetime(raw)
            .ok_or_else(|| front_matter_error(format!("无法解析日期: {}", raw)))?,
        None => file_modified,
    };
    let modified_time = match front.updated.as_deref() {
        Some(raw) => parse_datetime(raw)
            .ok_or_else(|| front_matter_error(format!("无法解析日期: {}", raw)))?,
        None => created_time,
    };

    let body = parsed.content.trim_start().to_string();

    let excerpt = match front.excerpt.map(Scalar::into_string) {
        Some(excerpt) if !excerpt.trim().is_empty() => excerpt,
        _ => {
            let plain = markdown::strip_tags(&markdown::render(&body).html);
            markdown::truncate_chars(&plain, EXCERPT_CHARS)
        }
    };

    let tags = front
        .tags
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();

    let category = front
        .category
        .map(|c| c.into_string().trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| config.default_category.clone());

    let author = front
        .author
        .map(Scalar::into_string)
        .or_else(|| config.author.clone())
        .unwrap_or_else(|| "admin".to_string());

    Ok(PostDraft {
        explicit_id: front.id,
        title,
        body,
        created_time,
        modified_time,
        excerpt,
        category,
        tags,
        author,
        source: path.to_path_buf(),
        key,
    })
}

/// 解析前置元数据中的日期
///
/// 支持 RFC 3339、带时区偏移的 `YYYY-MM-DD HH:MM:SS +08:00`，
/// 以及不带偏移的常见格式（按 UTC 处理）。
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %:z") {
        return Some(date.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&date));
        }
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
        }
    }

    None
}
