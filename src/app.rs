use color_eyre::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::cache::SqliteStorage;
use crate::config::Config;
use crate::db::{self, SqliteLocalStorage};
use crate::http::HttpClient;
use crate::links::{LinkRecord, LinkStats, LinkStore, Shortener};
use crate::theme::Theme;
use crate::worker::OfflineWorker;

pub type Worker = OfflineWorker<SqliteStorage, HttpClient>;

/// Application state, built once at start-up and passed to every command.
///
/// The page side (links, theme) and the worker side each get their own
/// connection; they meet only in the shared database file.
pub struct App {
  storage: Arc<SqliteLocalStorage>,
  links: LinkStore<SqliteLocalStorage>,
  shortener: Shortener,
  worker: Worker,
}

impl App {
  pub fn new(config: &Config, db_path: &Path) -> Result<Self> {
    let storage = Arc::new(SqliteLocalStorage::new(db::open(db_path)?));
    let links = LinkStore::load(Arc::clone(&storage))?;
    let shortener = Shortener::new(
      config.short_domain.clone(),
      Duration::from_millis(config.shorten_delay_ms),
    );

    let cache = Arc::new(SqliteStorage::new(db::open(db_path)?));
    let origin = Url::parse(&config.worker.origin)?;
    let worker = OfflineWorker::new(&config.worker, cache, HttpClient::new(&origin)?)?;

    info!(db = %db_path.display(), links = links.links().len(), "Application ready");
    Ok(Self {
      storage,
      links,
      shortener,
      worker,
    })
  }

  pub async fn shorten(&mut self, input: &str) -> Result<LinkRecord> {
    self.shortener.shorten(&mut self.links, input).await
  }

  pub fn save(&mut self, long_url: &str, short_url: &str) -> Result<LinkRecord> {
    self.links.save(long_url, short_url)
  }

  pub fn links(&self) -> &[LinkRecord] {
    self.links.links()
  }

  pub fn stats(&self) -> LinkStats {
    self.links.stats()
  }

  pub fn theme(&self) -> Result<Theme> {
    Theme::load(self.storage.as_ref())
  }

  pub fn toggle_theme(&self) -> Result<Theme> {
    Theme::toggle(self.storage.as_ref())
  }

  /// Local storage shared with the worker's background sync
  pub fn local_storage(&self) -> &SqliteLocalStorage {
    &self.storage
  }

  pub fn worker(&self) -> &Worker {
    &self.worker
  }

  pub fn worker_mut(&mut self) -> &mut Worker {
    &mut self.worker
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::Request;

  fn config() -> Config {
    Config {
      shorten_delay_ms: 0,
      ..Config::default()
    }
  }

  #[tokio::test]
  async fn test_links_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("linkmaster.db");

    let mut app = App::new(&config(), &path).unwrap();
    let first = app.shorten("example.com").await.unwrap();
    let second = app.shorten("https://www.rust-lang.org/learn").await.unwrap();
    assert_eq!(second.title, "rust-lang");
    drop(app);

    let app = App::new(&config(), &path).unwrap();
    let shorts: Vec<&str> = app.links().iter().map(|l| l.short_url.as_str()).collect();
    assert_eq!(shorts, vec![second.short_url.as_str(), first.short_url.as_str()]);
    assert_eq!(app.stats().total_links, 2);
    assert_eq!(app.stats().total_clicks, 0);
  }

  #[tokio::test]
  async fn test_theme_is_persisted() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("linkmaster.db");

    let app = App::new(&config(), &path).unwrap();
    assert_eq!(app.theme().unwrap(), Theme::Light);
    assert_eq!(app.toggle_theme().unwrap(), Theme::Dark);
    drop(app);

    let app = App::new(&config(), &path).unwrap();
    assert_eq!(app.theme().unwrap(), Theme::Dark);
  }

  #[tokio::test]
  async fn test_worker_bypasses_non_get() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = App::new(&config(), &dir.path().join("linkmaster.db")).unwrap();

    let request = Request::get(app.worker().resolve("/api").unwrap()).with_method("POST");
    assert!(app.worker().handle_fetch(&request).await.unwrap().is_none());
  }
}
