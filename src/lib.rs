pub mod app;
pub mod config;
pub mod error;
pub mod github;
pub mod models;
pub mod spotify;
pub mod wakatime;

pub use app::AppState;
