use std::env;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::db::{SqliteStore, DEFAULT_DATABASE_URL, DEMO_PLAYER_ID};
use crate::error::LeagueError;
use crate::store::LeagueStore;
use crate::supabase::{SupabaseClient, SupabaseStore};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STATIC_DIR: &str = "public";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Supabase,
    Sqlite,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Supabase => write!(f, "supabase"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: Backend,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub database_url: String,
    pub default_player_id: String,
    pub port: u16,
    /// Served for paths no API route matches (default avatar and cover images).
    pub static_dir: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, LeagueError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same rules as [`AppConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LeagueError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(*name))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let supabase_url = var(&["SUPABASE_URL", "VITE_SUPABASE_URL"]);
        let supabase_anon_key = var(&["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"]);
        let has_supabase = supabase_url.is_some() && supabase_anon_key.is_some();

        let backend = match var(&["LEAGUE_BACKEND"]).map(|b| b.to_lowercase()).as_deref() {
            None if has_supabase => Backend::Supabase,
            None => Backend::Sqlite,
            Some("supabase") if has_supabase => Backend::Supabase,
            Some("supabase") => {
                return Err(LeagueError::Config(
                    "LEAGUE_BACKEND=supabase requires SUPABASE_URL and SUPABASE_ANON_KEY".into(),
                ))
            }
            Some("sqlite") => Backend::Sqlite,
            Some(other) => {
                return Err(LeagueError::Config(format!(
                    "unknown LEAGUE_BACKEND '{}' (expected supabase or sqlite)",
                    other
                )))
            }
        };

        let port = match var(&["PORT"]) {
            Some(raw) => raw
                .parse()
                .map_err(|_| LeagueError::Config(format!("PORT must be a port number (got '{}')", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            backend,
            supabase_url,
            supabase_anon_key,
            database_url: var(&["DATABASE_URL"]).unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            default_player_id: var(&["DEFAULT_PLAYER_ID"]).unwrap_or_else(|| DEMO_PLAYER_ID.to_string()),
            port,
            static_dir: var(&["STATIC_DIR"]).unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
        })
    }

    /// Open the configured backend. The SQLite schema is created if missing.
    pub async fn connect_store(&self) -> Result<Arc<dyn LeagueStore>> {
        match self.backend {
            Backend::Supabase => {
                let (Some(url), Some(key)) = (&self.supabase_url, &self.supabase_anon_key) else {
                    return Err(LeagueError::Config("Supabase credentials are missing".into()).into());
                };
                tracing::info!("Using hosted league database at {}", url);
                Ok(Arc::new(SupabaseStore::new(SupabaseClient::new(url, key)?)))
            }
            Backend::Sqlite => {
                tracing::info!("Using local league database {}", self.database_url);
                Ok(Arc::new(SqliteStore::connect(&self.database_url).await?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, LeagueError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_to_sqlite() {
        let config = config(&[]).unwrap();
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.default_player_id, DEMO_PLAYER_ID);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.static_dir, DEFAULT_STATIC_DIR);
    }

    #[test]
    fn test_supabase_chosen_when_configured() {
        let config = config(&[
            ("VITE_SUPABASE_URL", "https://league.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.backend, Backend::Supabase);
        assert_eq!(config.supabase_url.as_deref(), Some("https://league.supabase.co"));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_explicit_backend() {
        let sqlite = config(&[
            ("LEAGUE_BACKEND", "SQLite"),
            ("SUPABASE_URL", "https://league.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ])
        .unwrap();
        assert_eq!(sqlite.backend, Backend::Sqlite);

        let missing = config(&[("LEAGUE_BACKEND", "supabase"), ("SUPABASE_URL", "https://x")]);
        assert!(matches!(missing, Err(LeagueError::Config(_))));

        assert!(matches!(config(&[("LEAGUE_BACKEND", "mysql")]), Err(LeagueError::Config(_))));
        assert!(matches!(config(&[("PORT", "http")]), Err(LeagueError::Config(_))));
    }
}
