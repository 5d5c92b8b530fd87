use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use std::sync::Arc;
use tera::Context as TeraContext;
use tracing::{debug, info};

use crate::comments::{CommentForm, FormErrors};
use crate::core::error::{BlogError, Result};
use crate::core::pagination::{PaginationContext, Paginator};
use crate::core::server::AppState;
use crate::core::urls::post_url;
use crate::models::Post;
use crate::theme::renderer::default_theme;
use crate::utils::markdown;

/// 列表页的查询参数
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

fn base_context(state: &AppState) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("site", state.config.as_ref());
    context
}

/// 渲染分页的文章列表
fn render_post_list(state: &AppState, posts: &[Post], query: &PageQuery, heading: &str) -> Result<Html<String>> {
    let paginator = Paginator::new(posts.len(), state.config.per_page);
    let number = paginator.validate_number(query.page.as_deref())?;
    let page = paginator.page(posts, number);

    let mut context = base_context(state);
    context.insert("post_list", page.items);
    context.insert("heading", heading);
    context.extend(TeraContext::from_serialize(PaginationContext::build(&paginator, &page))?);

    Ok(Html(state.renderer.render("index.html", &context)?))
}

/// 渲染文章详情页，评论表单提交失败时也用它回显表单
fn render_detail(state: &AppState, post: &Post, form: &CommentForm, errors: &FormErrors) -> Result<Html<String>> {
    let rendered = markdown::render(&post.body);

    let mut context = base_context(state);
    context.insert("post", post);
    context.insert("body_html", &rendered.html);
    let toc = if state.config.markdown.toc { rendered.toc } else { String::new() };
    context.insert("toc", &toc);
    context.insert("form", form);
    context.insert("form_errors", errors);
    context.insert("comment_list", &state.store.comments_for(post.id));

    Ok(Html(state.renderer.render("detail.html", &context)?))
}

/// 首页：全部文章
pub async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Result<Html<String>> {
    let posts = state.store.posts();
    render_post_list(&state, &posts, &query, "")
}

/// 文章详情，每次访问阅读量 +1
pub async fn detail(State(state): State<AppState>, Path(pk): Path<u64>) -> Result<Html<String>> {
    // 阅读量可能要写文件，放到阻塞线程池
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || store.increase_views(pk))
        .await?
        .ok_or_else(|| BlogError::not_found(format!("文章 {}", pk)))?;
    let post = state
        .store
        .post(pk)
        .ok_or_else(|| BlogError::not_found(format!("文章 {}", pk)))?;

    render_detail(&state, &post, &CommentForm::default(), &FormErrors::default())
}

/// 按年月归档
pub async fn archives(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>> {
    if !(1..=12).contains(&month) {
        return Err(BlogError::not_found(format!("归档 {}-{}", year, month)));
    }
    let posts = state.store.posts_in_month(year, month);
    render_post_list(&state, &posts, &query, &format!("归档：{} 年 {} 月", year, month))
}

/// 某分类下的文章
pub async fn category(
    State(state): State<AppState>,
    Path(pk): Path<u64>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>> {
    let category = state
        .store
        .category(pk)
        .ok_or_else(|| BlogError::not_found(format!("分类 {}", pk)))?;
    let posts = state.store.posts_in_category(pk).unwrap_or_default();
    render_post_list(&state, &posts, &query, &format!("分类：{}", category.name))
}

/// 带有某标签的文章
pub async fn tag(
    State(state): State<AppState>,
    Path(pk): Path<u64>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>> {
    let tag = state
        .store
        .tag(pk)
        .ok_or_else(|| BlogError::not_found(format!("标签 {}", pk)))?;
    let posts = state.store.posts_with_tag(pk).unwrap_or_default();
    render_post_list(&state, &posts, &query, &format!("标签：{}", tag.name))
}

/// 提交评论
///
/// 校验通过则保存并重定向回文章页；否则重新渲染文章页，回显错误和已填写的内容。
pub async fn post_comment(
    State(state): State<AppState>,
    Path(post_pk): Path<u64>,
    Form(form): Form<CommentForm>,
) -> Result<Response> {
    let post = state
        .store
        .post(post_pk)
        .ok_or_else(|| BlogError::not_found(format!("文章 {}", post_pk)))?;

    match form.validate() {
        Ok(cleaned) => {
            let store = Arc::clone(&state.store);
            let post_id = post.id;
            tokio::task::spawn_blocking(move || store.add_comment(post_id, cleaned)).await??;
            Ok(Redirect::to(&post_url(post.id)).into_response())
        }
        Err(errors) => {
            info!("文章 {} 的评论未通过校验: {}", post.id, errors);
            Ok(render_detail(&state, &post, &form, &errors)?.into_response())
        }
    }
}

/// 不是 POST 请求时直接回到文章页
pub async fn comment_redirect(State(state): State<AppState>, Path(post_pk): Path<u64>) -> Result<Redirect> {
    let post = state
        .store
        .post(post_pk)
        .ok_or_else(|| BlogError::not_found(format!("文章 {}", post_pk)))?;
    debug!("GET 评论地址，重定向到文章 {}", post.id);
    Ok(Redirect::to(&post_url(post.id)))
}

/// 内置主题的样式表
pub async fn default_stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        default_theme::STYLE_CSS,
    )
}

/// 未匹配任何路由
pub async fn not_found() -> BlogError {
    BlogError::not_found("页面")
}
