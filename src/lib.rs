pub mod app;
pub mod auth;
pub mod boards;
pub mod categories;
pub mod config;
pub mod error;
pub mod extract;
pub mod goals;
pub mod listing;
pub mod state;
pub mod validate;

pub use app::build_app;
pub use state::AppState;
