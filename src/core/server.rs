use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::core::store::BlogStore;
use crate::core::urls;
use crate::core::views;
use crate::models::Config;
use crate::theme::renderer::ThemeRenderer;

/// 请求处理共享的状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<BlogStore>,
    pub renderer: Arc<ThemeRenderer>,
}

impl AppState {
    /// 加载站点：配置、文章仓库和主题
    pub fn load(site_dir: &Path) -> Result<Self> {
        let config = Config::load(site_dir).context("加载站点配置失败")?;
        let store = Arc::new(BlogStore::load(site_dir, &config).context("加载文章失败")?);
        let renderer = ThemeRenderer::new(site_dir, &config, Arc::clone(&store)).context("加载主题失败")?;

        Ok(Self {
            config: Arc::new(config),
            store,
            renderer: Arc::new(renderer),
        })
    }
}

/// HTTP 服务器
pub struct Server {
    state: AppState,
    /// 监听地址
    addr: SocketAddr,
}

impl Server {
    /// 创建新的服务器
    pub fn new(state: AppState, host: &str, port: u16) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("无效的监听地址: {}:{}", host, port))?;
        Ok(Self { state, addr })
    }

    /// 构建路由
    pub fn router(state: AppState) -> Router {
        let static_dir = state.renderer.source_dir();

        let router = Router::new()
            .route(urls::INDEX_PATH, get(views::index))
            .route(urls::DETAIL_PATH, get(views::detail))
            .route(urls::ARCHIVES_PATH, get(views::archives))
            .route(urls::CATEGORY_PATH, get(views::category))
            .route(urls::TAG_PATH, get(views::tag))
            .route(
                urls::POST_COMMENT_PATH,
                get(views::comment_redirect).post(views::post_comment),
            );

        // 主题自带静态资源时直接托管，否则只提供内置样式表
        let router = if static_dir.is_dir() {
            info!("静态资源目录: {}", static_dir.display());
            router.nest_service("/static", ServeDir::new(static_dir))
        } else {
            router.route("/static/css/style.css", get(views::default_stylesheet))
        };

        router
            .fallback(views::not_found)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// 启动服务器，Ctrl-C 时优雅退出
    pub async fn start(self) -> Result<()> {
        let app = Self::router(self.state);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("无法监听 {}", self.addr))?;
        info!("Server started at http://{}", self.addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("服务器已停止");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("无法监听 Ctrl-C 信号: {}", e);
        return;
    }
    info!("收到退出信号，正在关闭服务器");
}
