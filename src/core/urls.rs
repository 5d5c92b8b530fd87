//! 命名路由表：路由注册和模板中的 `url_for` 共用同一份定义。

use std::collections::HashMap;
use thiserror::Error;

pub const INDEX: &str = "blog:index";
pub const DETAIL: &str = "blog:detail";
pub const ARCHIVES: &str = "blog:archives";
pub const CATEGORY: &str = "blog:category";
pub const TAG: &str = "blog:tag";
pub const POST_COMMENT: &str = "comments:post_comment";

pub const INDEX_PATH: &str = "/";
pub const DETAIL_PATH: &str = "/post/:pk/";
pub const ARCHIVES_PATH: &str = "/archives/:year/:month/";
pub const CATEGORY_PATH: &str = "/category/:pk/";
pub const TAG_PATH: &str = "/tag/:pk/";
pub const POST_COMMENT_PATH: &str = "/comment/post/:post_pk/";

/// (名称, axum 路由模式)
pub const ROUTES: &[(&str, &str)] = &[
    (INDEX, INDEX_PATH),
    (DETAIL, DETAIL_PATH),
    (ARCHIVES, ARCHIVES_PATH),
    (CATEGORY, CATEGORY_PATH),
    (TAG, TAG_PATH),
    (POST_COMMENT, POST_COMMENT_PATH),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReverseError {
    #[error("未知的路由名称: {0}")]
    UnknownRoute(String),

    #[error("路由 {route} 缺少参数: {param}")]
    MissingParam { route: String, param: String },
}

/// 路由名称对应的路由模式
pub fn pattern(name: &str) -> Option<&'static str> {
    ROUTES
        .iter()
        .find(|(route, _)| *route == name)
        .map(|(_, pattern)| *pattern)
}

/// 根据路由名称和参数生成路径
pub fn reverse(name: &str, params: &HashMap<String, String>) -> Result<String, ReverseError> {
    let pattern = pattern(name).ok_or_else(|| ReverseError::UnknownRoute(name.to_string()))?;

    let mut path = String::with_capacity(pattern.len() + 8);
    for (i, segment) in pattern.split('/').enumerate() {
        if i > 0 {
            path.push('/');
        }
        match segment.strip_prefix(':') {
            Some(param) => {
                let value = params.get(param).ok_or_else(|| ReverseError::MissingParam {
                    route: name.to_string(),
                    param: param.to_string(),
                })?;
                path.push_str(value);
            }
            None => path.push_str(segment),
        }
    }

    Ok(path)
}

pub fn post_url(id: u64) -> String {
    format!("/post/{}/", id)
}
