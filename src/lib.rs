pub mod cli;
pub mod comments;
pub mod core;
pub mod models;
pub mod theme;
pub mod utils;

// Re-export commonly used types
pub use crate::core::error::{BlogError, Result};
pub use crate::core::pagination::{pagination_data, Paginator, WindowResult};
pub use crate::core::server::{AppState, Server};
pub use crate::core::store::BlogStore;
pub use crate::models::{Category, Comment, Config, Post, Tag};
pub use crate::theme::renderer::ThemeRenderer;
