//! 评论：表单校验。评论的存储由 [`crate::core::store::BlogStore`] 负责。

pub mod form;

pub use form::{CleanedComment, CommentForm, FormErrors};
