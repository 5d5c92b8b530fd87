use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::path::PathBuf;
use thiserror::Error;
use tracing::error;

use crate::core::pagination::PageError;

pub type Result<T, E = BlogError> = std::result::Result<T, E>;

/// 博客错误类型
#[derive(Error, Debug)]
pub enum BlogError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML 解析错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("模板错误: {0}")]
    Template(#[from] tera::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("前置元数据错误: {} - {message}", path.display())]
    FrontMatter { path: PathBuf, message: String },

    #[error("文章 id {id} 重复: {}", path.display())]
    DuplicatePostId { id: u64, path: PathBuf },

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("无效的页码: {0}")]
    InvalidPage(#[from] PageError),

    #[error("后台任务失败: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BlogError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::InvalidPage(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("请求处理失败: {}", self);
        }

        let reason = status.canonical_reason().unwrap_or("Error");
        let body = format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{code} {reason}</title></head>\n<body><h1>{code} {reason}</h1></body></html>\n",
            code = status.as_u16(),
            reason = reason,
        );

        (status, Html(body)).into_response()
    }
}
