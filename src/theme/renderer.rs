use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tera::{Context as TeraContext, Function, Tera, Value};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::core::error::{BlogError, Result};
use crate::core::store::BlogStore;
use crate::core::urls;
use crate::models::Config;
use crate::utils::relative_time_from_now;

/// 嵌入二进制的默认主题
pub mod default_theme {
    pub const BASE_HTML: &str = include_str!("../../theme/default/layout/base.html");
    pub const INDEX_HTML: &str = include_str!("../../theme/default/layout/index.html");
    pub const DETAIL_HTML: &str = include_str!("../../theme/default/layout/detail.html");
    pub const PAGINATION_HTML: &str = include_str!("../../theme/default/layout/pagination.html");
    pub const STYLE_CSS: &str = include_str!("../../theme/default/source/css/style.css");

    pub const TEMPLATES: &[(&str, &str)] = &[
        ("base.html", BASE_HTML),
        ("index.html", INDEX_HTML),
        ("detail.html", DETAIL_HTML),
        ("pagination.html", PAGINATION_HTML),
    ];
}

/// 主题渲染器
pub struct ThemeRenderer {
    /// 站点主题目录，可能不存在
    pub theme_dir: PathBuf,
    /// 模板引擎
    tera: Tera,
}

impl ThemeRenderer {
    /// 创建主题渲染器
    ///
    /// 站点 `themes/<theme>/layout` 下的模板优先，缺少的模板使用内置默认主题。
    pub fn new(base_dir: &Path, config: &Config, store: Arc<BlogStore>) -> Result<Self> {
        let theme_dir = base_dir.join("themes").join(&config.theme);
        let mut tera = Self::load_templates(&theme_dir)?;

        Self::register_filters(&mut tera);
        Self::register_functions(&mut tera, store, config);

        Ok(ThemeRenderer { theme_dir, tera })
    }

    fn load_templates(theme_dir: &Path) -> Result<Tera> {
        let mut tera = Tera::default();
        tera.add_raw_templates(default_theme::TEMPLATES.to_vec())?;

        // 站点主题中的同名模板覆盖内置模板
        let layout_dir = theme_dir.join("layout");
        if layout_dir.exists() {
            info!("使用主题模板: {}", layout_dir.display());
            let mut files = Vec::new();
            for entry in WalkDir::new(&layout_dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().map_or(false, |ext| ext == "html"))
            {
                let name = entry
                    .path()
                    .strip_prefix(&layout_dir)
                    .map_err(|e| BlogError::Config(e.to_string()))?
                    .to_string_lossy()
                    .replace('\\', "/");
                debug!("加载主题模板: {}", name);
                files.push((entry.path().to_path_buf(), Some(name)));
            }
            tera.add_template_files(files)?;
        } else {
            debug!("主题目录不存在，使用内置模板: {}", layout_dir.display());
        }

        Ok(tera)
    }

    /// 注册模板过滤器
    fn register_filters(tera: &mut Tera) {
        tera.register_filter("date_format", Self::date_format_filter);
        tera.register_filter("timesince", Self::timesince_filter);
    }

    /// 注册模板函数，侧边栏数据直接读取文章仓库
    fn register_functions(tera: &mut Tera, store: Arc<BlogStore>, config: &Config) {
        tera.register_function("url_for", UrlFor);

        let recent_default = config.recent_posts as u64;
        let recent_store = Arc::clone(&store);
        tera.register_function("get_recent_posts", move |args: &HashMap<String, Value>| {
            let num = args.get("num").and_then(Value::as_u64).unwrap_or(recent_default);
            tera::to_value(recent_store.recent_posts(num as usize)).map_err(tera::Error::from)
        });

        let archive_store = Arc::clone(&store);
        tera.register_function("archives", move |_: &HashMap<String, Value>| {
            tera::to_value(archive_store.archive_months()).map_err(tera::Error::from)
        });

        let category_store = Arc::clone(&store);
        tera.register_function("get_categories", move |_: &HashMap<String, Value>| {
            tera::to_value(category_store.categories_with_counts()).map_err(tera::Error::from)
        });

        tera.register_function("get_tags", move |_: &HashMap<String, Value>| {
            tera::to_value(store.tags_with_counts()).map_err(tera::Error::from)
        });
    }

    /// 渲染模板
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        match self.tera.render(template, context) {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("模板渲染失败: {} ({:?})", template, e);
                Err(e.into())
            }
        }
    }

    /// 检查布局是否存在
    pub fn has_layout(&self, layout: &str) -> bool {
        self.tera.get_template_names().any(|name| name == layout)
    }

    /// 获取主题资源目录
    pub fn source_dir(&self) -> PathBuf {
        self.theme_dir.join("source")
    }

    fn date_format_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let format = match args.get("format") {
            Some(f) => f
                .as_str()
                .ok_or_else(|| tera::Error::msg("format 必须是字符串"))?,
            None => "%Y-%m-%d",
        };

        match value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
            Some(date) => Ok(Value::String(date.format(format).to_string())),
            None => Ok(value.clone()),
        }
    }

    fn timesince_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        match value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
            Some(date) => Ok(Value::String(relative_time_from_now(&date.with_timezone(&Utc)))),
            None => Ok(value.clone()),
        }
    }
}

/// `url_for(name="blog:detail", pk=post.id)`
///
/// 输出的是站内路径，不需要转义。
struct UrlFor;

impl Function for UrlFor {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("url_for 缺少必要的参数: name"))?;

        let mut params = HashMap::new();
        for (key, value) in args {
            if key == "name" {
                continue;
            }
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => return Err(tera::Error::msg(format!("url_for 参数 {} 类型不支持: {}", key, other))),
            };
            params.insert(key.clone(), value);
        }

        urls::reverse(name, &params)
            .map(Value::String)
            .map_err(|e| tera::Error::msg(e.to_string()))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn empty_renderer(site: &Path) -> ThemeRenderer {
        let config = Config::default();
        let store = Arc::new(BlogStore::load(site, &config).unwrap());
        ThemeRenderer::new(site, &config, store).unwrap()
    }

    #[test]
    fn builtin_templates_are_available() {
        let site = tempfile::tempdir().unwrap();
        let renderer = empty_renderer(site.path());
        for (name, _) in default_theme::TEMPLATES {
            assert!(renderer.has_layout(name), "missing {}", name);
        }
    }

    #[test]
    fn site_theme_overrides_builtin_template() {
        let site = tempfile::tempdir().unwrap();
        let layout = site.path().join("themes").join("default").join("layout");
        fs::create_dir_all(&layout).unwrap();
        fs::write(layout.join("index.html"), "custom index {{ url_for(name=\"blog:tag\", pk=4) }}").unwrap();

        let renderer = empty_renderer(site.path());
        let html = renderer.render("index.html", &TeraContext::new()).unwrap();
        assert_eq!(html, "custom index /tag/4/");
        assert!(renderer.has_layout("detail.html"));
    }

    #[test]
    fn date_format_filter_formats_rfc3339() {
        let mut args = HashMap::new();
        args.insert("format".to_string(), Value::String("%Y年%m月%d日".to_string()));
        let value = ThemeRenderer::date_format_filter(&Value::String("2023-02-10T00:00:00Z".to_string()), &args).unwrap();
        assert_eq!(value, Value::String("2023年02月10日".to_string()));

        let untouched = ThemeRenderer::date_format_filter(&Value::String("soon".to_string()), &HashMap::new()).unwrap();
        assert_eq!(untouched, Value::String("soon".to_string()));
    }

    #[test]
    fn url_for_rejects_unknown_route() {
        let mut args = HashMap::new();
        args.insert("name".to_string(), Value::String("blog:missing".to_string()));
        assert!(UrlFor.call(&args).is_err());
    }
}
