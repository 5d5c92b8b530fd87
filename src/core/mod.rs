pub mod error;
pub mod pagination;
pub mod server;
pub mod store;
pub mod urls;
pub mod views;

pub use error::BlogError;
pub use server::{AppState, Server};
pub use store::BlogStore;
