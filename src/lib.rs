pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod supabase;
pub mod utils;

pub use config::AppConfig;
pub use error::{FetchError, LeagueError};
pub use services::league::League;
pub use store::LeagueStore;
