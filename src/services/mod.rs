pub mod cache;
pub mod league;
pub mod match_entry;
pub mod match_history;
pub mod player_lines;
pub mod player_profile;
pub mod player_stats;
pub mod standings;

pub use cache::{ConsumeOptions, ResourceCache, ResourceStatus, ResourceView, StaleTime};
pub use league::League;
