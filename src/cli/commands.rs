use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::server::{AppState, Server};
use crate::core::store::BlogStore;
use crate::models::Config;
use crate::utils::slugify;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 指定站点目录
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 初始化新的博客站点
    Init(InitArgs),

    /// 创建新的文章
    New(NewArgs),

    /// 启动博客服务器
    Server(ServerArgs),

    /// 列出全部文章
    List,
}

#[derive(Args)]
pub struct InitArgs {
    /// 站点目录名称
    #[arg(value_name = "NAME")]
    pub name: String,

    /// 站点标题
    #[arg(short, long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct NewArgs {
    /// 文章标题
    pub title: String,

    /// 文章分类
    #[arg(short, long)]
    pub category: Option<String>,

    /// 文章标签，逗号分隔
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,
}

#[derive(Args)]
pub struct ServerArgs {
    /// 监听地址，默认使用配置中的 host
    #[arg(long)]
    pub host: Option<String>,

    /// 服务器端口，默认使用配置中的 port
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// 新文章的前置元数据
#[derive(Serialize)]
struct NewPostFrontMatter<'a> {
    title: &'a str,
    date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<&'a str>,
}

const HELLO_POST: &str = r#"---
title: Hello World
date: 2023-01-01 12:00:00
category: 入门指南
tags:
  - rust-blog
  - 指南
---

欢迎使用 rust-blog，这是你的第一篇文章。编辑或删除它，然后开始写作吧！

## 创建新文章

```bash
rust-blog new "我的新文章" --category 随笔 --tags rust,web
```

## 启动服务器

```bash
rust-blog server
```
"#;

/// 初始化站点目录结构、配置文件和示例文章
fn initialize_site_structure(site_path: &Path, site_title: &str) -> Result<()> {
    let config = Config {
        title: site_title.to_string(),
        data_file: Some("data.json".to_string()),
        ..Config::default()
    };

    let posts_dir = site_path.join(&config.source_dir).join("_posts");
    fs::create_dir_all(&posts_dir)
        .with_context(|| format!("无法创建目录: {}", posts_dir.display()))?;

    config
        .save(&site_path.join("_config.yml"))
        .context("写入 _config.yml 失败")?;
    fs::write(posts_dir.join("hello-world.md"), HELLO_POST)?;

    Ok(())
}

/// 在站点中创建一篇新文章，返回文件路径
pub fn create_post(site_path: &Path, args: &NewArgs) -> Result<PathBuf> {
    let config = Config::load(site_path).context("加载站点配置失败")?;
    let posts_dir = site_path.join(&config.source_dir).join("_posts");
    fs::create_dir_all(&posts_dir)?;

    let mut slug = slugify(&args.title);
    if slug.is_empty() {
        slug = Local::now().format("%Y%m%d%H%M%S").to_string();
    }
    let file_path = posts_dir.join(format!("{}.md", slug));
    if file_path.exists() {
        bail!("文章已存在: {}", file_path.display());
    }

    let front_matter = NewPostFrontMatter {
        title: &args.title,
        // 带上时区偏移，读取时才能换算成正确的 UTC 时间
        date: Local::now().format("%Y-%m-%d %H:%M:%S %:z").to_string(),
        category: args.category.as_deref(),
        tags: args
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .collect(),
    };
    let yaml = serde_yaml::to_string(&front_matter)?;
    fs::write(&file_path, format!("---\n{}---\n\n", yaml))
        .with_context(|| format!("无法写入文章: {}", file_path.display()))?;

    Ok(file_path)
}

fn list_posts(site_path: &Path) -> Result<()> {
    let config = Config::load(site_path).context("加载站点配置失败")?;
    let store = BlogStore::load(site_path, &config).context("加载文章失败")?;

    if store.is_empty() {
        println!("{}", "还没有文章".yellow());
        return Ok(());
    }

    for post in store.posts() {
        let tags = post
            .tags
            .iter()
            .map(|tag| tag.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:>4}  {}  {}  [{}] {}",
            post.id.to_string().bright_green(),
            post.created_time.format("%Y-%m-%d").to_string().bright_black(),
            post.title.bold(),
            post.category.name.cyan(),
            tags.bright_black()
        );
    }
    println!("共 {} 篇文章", store.len());

    Ok(())
}

/// 执行命令
pub async fn execute(cli: Cli) -> Result<()> {
    let site_path = cli.path;

    match cli.command {
        Commands::Init(args) => {
            let site_path = site_path.join(&args.name);

            if site_path.exists() && site_path.read_dir()?.next().is_some() {
                bail!("目录不为空: {}", site_path.display());
            }

            let site_title = args.title.unwrap_or_else(|| args.name.clone());
            initialize_site_structure(&site_path, &site_title)?;

            info!("Initialized new site at: {}", site_path.display());
        }
        Commands::New(args) => {
            let file_path = create_post(&site_path, &args)?;
            info!("Created: {}", file_path.display());
        }
        Commands::Server(args) => {
            let state = AppState::load(&site_path)?;
            let host = args.host.unwrap_or_else(|| state.config.host.clone());
            let port = args.port.unwrap_or(state.config.port);

            Server::new(state, &host, port)?.start().await?;
        }
        Commands::List => list_posts(&site_path)?,
    }

    Ok(())
}
