//! Pacto HTTP server: configuration and top-level router.
//!
//! The JSON API from [`pacto_api`] is mounted under `/api`.

use std::path::{Path, PathBuf};

use axum::{Router, routing::get};
use pacto_api::{AppState, Backend};
use pacto_core::coordinator::DEFAULT_HORIZON_MONTHS;
use serde::Deserialize;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PACTO_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                    String,
  #[serde(default = "default_port")]
  pub port:                    u16,
  #[serde(default = "default_store_path")]
  pub store_path:              PathBuf,
  /// Months past the current one shown for open-ended schedules.
  #[serde(default = "default_horizon")]
  pub schedule_horizon_months: u32,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/pacto/pacto.db") }

fn default_horizon() -> u32 { DEFAULT_HORIZON_MONTHS }

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `PACTO_*` variables.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("PACTO").try_parsing(true))
      .build()?
      .try_deserialize()
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router<S: Backend>(state: AppState<S>) -> Router {
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", pacto_api::api_router(state))
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use pacto_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn missing_config_file_falls_back_to_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/pacto.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.schedule_horizon_months, 12);
  }

  #[test]
  fn file_values_override_defaults() {
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(
        "port = 9000\nschedule_horizon_months = 24",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!((cfg.host.as_str(), cfg.port), ("127.0.0.1", 9000));
    assert_eq!(cfg.schedule_horizon_months, 24);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new("~/pacto.db")),
      PathBuf::from(home).join("pacto.db")
    );
    assert_eq!(expand_tilde(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = router(AppState::new(Arc::new(store), 12));

    let req = Request::get("/api/commitments").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, serde_json::json!([]));

    let req = Request::get("/health").body(Body::empty()).unwrap();
    assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::OK);
  }
}
