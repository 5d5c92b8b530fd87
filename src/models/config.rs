use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{BlogError, Result};

/// 站点配置，对应站点目录下的 `_config.yml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub language: String,
    pub url: Option<String>,
    /// 源文件目录，文章位于其下的 `_posts`
    pub source_dir: String,
    pub theme: String,
    /// 列表页每页文章数
    pub per_page: usize,
    /// 侧边栏"最新文章"数量
    pub recent_posts: usize,
    /// 文章未指定分类时使用的分类
    pub default_category: String,
    pub host: String,
    pub port: u16,
    /// 保存阅读量和评论的 JSON 文件（相对站点目录），不设置则只保存在内存
    pub data_file: Option<String>,
    pub markdown: MarkdownConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// 是否生成文章目录
    pub toc: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { toc: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            subtitle: None,
            description: None,
            author: None,
            language: "en".to_string(),
            url: None,
            source_dir: "source".to_string(),
            theme: "default".to_string(),
            per_page: 5,
            recent_posts: 5,
            default_category: "Uncategorized".to_string(),
            host: "127.0.0.1".to_string(),
            port: 4000,
            data_file: None,
            markdown: MarkdownConfig::default(),
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 从 YAML 字符串解析配置
    pub fn from_yaml(content: &str) -> Result<Self> {
        // 空文件等同于全部使用默认值
        let config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// 加载站点目录下的 `_config.yml`，文件不存在时使用默认配置
    pub fn load(site_dir: &Path) -> Result<Self> {
        let path = site_dir.join("_config.yml");
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.per_page == 0 {
            return Err(BlogError::Config("per_page 必须大于 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("title: 测试博客\nper_page: 3\n").unwrap();
        assert_eq!(config.title, "测试博客");
        assert_eq!(config.per_page, 3);
        assert_eq!(config.port, 4000);
        assert!(config.markdown.toc);
    }

    #[test]
    fn empty_yaml_is_default() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config.per_page, 5);
        assert_eq!(config.default_category, "Uncategorized");
    }

    #[test]
    fn zero_per_page_is_rejected() {
        assert!(matches!(
            Config::from_yaml("per_page: 0"),
            Err(BlogError::Config(_))
        ));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.title, "My Blog");
    }
}
