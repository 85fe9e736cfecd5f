//! Offline cache worker: lifecycle, fetch interception, messages and sync.
//!
//! The worker never touches the link store directly. It shares only the
//! persistent cache buckets and the local storage queue used by background
//! sync.

pub mod message;
pub mod sync;

use color_eyre::{eyre::eyre, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

use crate::cache::{policy, CacheLayer, CacheStorage, FetchResult};
use crate::config::WorkerConfig;
use crate::db::KeyValueStore;
use crate::http::{Fetch, Request};

pub use message::{VersionReply, WorkerMessage};

/// Lifecycle of the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  Parsed,
  Installing,
  Installed,
  Activating,
  Activated,
  /// Installation failed; this worker will never activate
  Redundant,
}

impl fmt::Display for WorkerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      WorkerState::Parsed => "parsed",
      WorkerState::Installing => "installing",
      WorkerState::Installed => "installed",
      WorkerState::Activating => "activating",
      WorkerState::Activated => "activated",
      WorkerState::Redundant => "redundant",
    };
    f.write_str(name)
  }
}

/// The offline caching worker for one origin.
pub struct OfflineWorker<S: CacheStorage, N: Fetch> {
  cache: CacheLayer<S>,
  network: N,
  origin: Url,
  manifest: Vec<Url>,
  root_document: Url,
  sync_item_delay: Duration,
  state: WorkerState,
  skip_waiting: bool,
  controls_clients: bool,
}

impl<S: CacheStorage, N: Fetch> OfflineWorker<S, N> {
  pub fn new(config: &WorkerConfig, storage: Arc<S>, network: N) -> Result<Self> {
    let origin = Url::parse(&config.origin)
      .map_err(|e| eyre!("Invalid worker origin '{}': {}", config.origin, e))?;
    let manifest = config
      .assets
      .iter()
      .map(|path| resolve(&origin, path))
      .collect::<Result<Vec<_>>>()?;
    let root_document = resolve(&origin, &config.offline_document)?;

    Ok(Self {
      cache: CacheLayer::new(storage, config.cache_name.clone()),
      network,
      origin,
      manifest,
      root_document,
      sync_item_delay: Duration::from_millis(config.sync_item_delay_ms),
      state: WorkerState::Parsed,
      skip_waiting: false,
      controls_clients: false,
    })
  }

  pub fn state(&self) -> WorkerState {
    self.state
  }

  pub fn cache_name(&self) -> &str {
    self.cache.cache_name()
  }

  /// Whether the worker has claimed open pages
  pub fn controls_clients(&self) -> bool {
    self.controls_clients
  }

  /// Resolve a root-relative path (or absolute URL) against the worker origin.
  pub fn resolve(&self, path: &str) -> Result<Url> {
    resolve(&self.origin, path)
  }

  /// Names of every cache bucket, oldest first
  pub fn bucket_names(&self) -> Result<Vec<String>> {
    self.cache.bucket_names()
  }

  /// Open the current bucket and pre-warm the static manifest.
  ///
  /// Any failed asset fails the whole install and leaves the worker redundant.
  /// On success the worker asks to skip waiting.
  pub async fn install(&mut self) -> Result<usize> {
    info!(cache = self.cache.cache_name(), "Installing");
    self.state = WorkerState::Installing;

    let result = match self.cache.open() {
      Ok(()) => self.cache.add_all(&self.network, &self.manifest).await,
      Err(e) => Err(e),
    };

    match result {
      Ok(count) => {
        info!(assets = count, "Installation complete");
        self.state = WorkerState::Installed;
        self.skip_waiting = true;
        Ok(count)
      }
      Err(e) => {
        error!(error = %e, "Installation failed");
        self.state = WorkerState::Redundant;
        Err(e.wrap_err("Worker installation failed"))
      }
    }
  }

  /// Purge every bucket from older generations and claim open pages.
  ///
  /// Returns the names of the deleted buckets.
  pub async fn activate(&mut self) -> Result<Vec<String>> {
    if self.state != WorkerState::Installed {
      return Err(eyre!("Cannot activate a worker that is {}", self.state));
    }

    info!("Activating");
    self.state = WorkerState::Activating;
    let deleted = match self.cache.evict_stale() {
      Ok(deleted) => deleted,
      Err(e) => {
        // Still installed; activation can be retried
        self.state = WorkerState::Installed;
        return Err(e);
      }
    };
    for name in &deleted {
      info!(bucket = %name, "Deleted old cache");
    }

    self.controls_clients = true;
    self.state = WorkerState::Activated;
    info!("Activation complete");
    Ok(deleted)
  }

  /// Install, then activate straight away if the worker asked to skip waiting.
  pub async fn start(&mut self) -> Result<Vec<String>> {
    self.install().await?;
    if self.skip_waiting {
      self.activate().await
    } else {
      Ok(Vec::new())
    }
  }

  /// Intercept a request. `None` means the request is left to default handling.
  pub async fn handle_fetch(&self, request: &Request) -> Result<Option<FetchResult>> {
    match policy::route(request) {
      policy::Route::Bypass => Ok(None),
      policy::Route::CacheFirst => {
        let result = self
          .cache
          .fetch(&self.network, request, &self.root_document)
          .await?;
        Ok(Some(result))
      }
    }
  }

  /// Handle a message from the page. Only `GET_VERSION` produces a reply.
  pub async fn handle_message(&mut self, message: WorkerMessage) -> Result<Option<VersionReply>> {
    match message {
      WorkerMessage::SkipWaiting => {
        self.skip_waiting = true;
        if self.state == WorkerState::Installed {
          self.activate().await?;
        }
        Ok(None)
      }
      WorkerMessage::GetVersion => Ok(Some(VersionReply::default())),
      WorkerMessage::CacheUrls { urls } => {
        match self.cache_urls(&urls).await {
          Ok(count) => info!(count, "URLs cached successfully"),
          Err(e) => error!(error = %e, "URL caching failed"),
        }
        Ok(None)
      }
    }
  }

  async fn cache_urls(&self, urls: &[String]) -> Result<usize> {
    let urls = urls
      .iter()
      .map(|u| self.resolve(u))
      .collect::<Result<Vec<_>>>()?;
    self.cache.add_all(&self.network, &urls).await
  }

  /// Handle a one-off background sync event. Unknown tags are ignored.
  pub async fn handle_sync<K: KeyValueStore + ?Sized>(&self, tag: &str, storage: &K) -> usize {
    if tag != sync::SYNC_TAG {
      warn!(tag, "Ignoring unknown sync tag");
      return 0;
    }

    match sync::sync_offline_data(storage, self.sync_item_delay).await {
      Ok(count) => count,
      Err(e) => {
        error!(error = %e, "Sync failed");
        0
      }
    }
  }

  /// Handle a periodic sync event. Unknown tags are ignored.
  pub async fn handle_periodic_sync(&self, tag: &str) -> usize {
    if tag != sync::CONTENT_UPDATE_TAG {
      warn!(tag, "Ignoring unknown periodic sync tag");
      return 0;
    }

    match self.cache.refresh(&self.network, &self.manifest).await {
      Ok(count) => count,
      Err(e) => {
        error!(error = %e, "Content update failed");
        0
      }
    }
  }
}

fn resolve(origin: &Url, path: &str) -> Result<Url> {
  origin
    .join(path)
    .map_err(|e| eyre!("Invalid URL '{}': {}", path, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{basic, FakeNetwork, MemoryStorage, ResponseSource};
  use crate::db::MemoryLocalStorage;

  const ORIGIN: &str = "http://localhost:8080";

  fn config() -> WorkerConfig {
    WorkerConfig {
      origin: ORIGIN.to_string(),
      assets: vec!["/".to_string(), "/index.html".to_string(), "/style.css".to_string()],
      sync_item_delay_ms: 0,
      ..WorkerConfig::default()
    }
  }

  fn serving_manifest() -> FakeNetwork {
    let network = FakeNetwork::new();
    network.serve("http://localhost:8080/", basic("root"));
    network.serve("http://localhost:8080/index.html", basic("<h1>home</h1>"));
    network.serve("http://localhost:8080/style.css", basic("body {}"));
    network
  }

  fn worker(
    network: FakeNetwork,
  ) -> (OfflineWorker<MemoryStorage, FakeNetwork>, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let worker = OfflineWorker::new(&config(), Arc::clone(&storage), network).unwrap();
    (worker, storage)
  }

  #[tokio::test]
  async fn test_install_then_activate() {
    let (mut worker, storage) = worker(serving_manifest());
    storage.open_bucket("linkmaster-cache-v0").unwrap();
    storage.open_bucket("scratch").unwrap();

    assert_eq!(worker.install().await.unwrap(), 3);
    assert_eq!(worker.state(), WorkerState::Installed);
    assert!(!worker.controls_clients());

    let deleted = worker.activate().await.unwrap();
    assert_eq!(deleted, vec!["linkmaster-cache-v0", "scratch"]);
    assert_eq!(worker.bucket_names().unwrap(), vec!["linkmaster-cache-v1"]);
    assert_eq!(worker.state(), WorkerState::Activated);
    assert!(worker.controls_clients());
  }

  #[tokio::test]
  async fn test_install_failure_is_surfaced() {
    let network = FakeNetwork::new();
    network.serve("http://localhost:8080/", basic("root"));
    let (mut worker, _) = worker(network);

    assert!(worker.install().await.is_err());
    assert_eq!(worker.state(), WorkerState::Redundant);
    assert!(worker.activate().await.is_err());
  }

  #[tokio::test]
  async fn test_start_installs_and_activates() {
    let (mut worker, _) = worker(serving_manifest());
    worker.start().await.unwrap();
    assert_eq!(worker.state(), WorkerState::Activated);
  }

  #[tokio::test]
  async fn test_activate_requires_install() {
    let (mut worker, _) = worker(serving_manifest());
    assert!(worker.activate().await.is_err());
    assert_eq!(worker.state(), WorkerState::Parsed);
  }

  #[tokio::test]
  async fn test_precached_asset_served_without_network() {
    let (mut worker, _) = worker(serving_manifest());
    worker.install().await.unwrap();
    let calls_after_install = worker.network.calls();

    let request = Request::get(worker.resolve("/style.css").unwrap());
    let result = worker.handle_fetch(&request).await.unwrap().unwrap();
    assert_eq!(result.source, ResponseSource::Cache);
    assert_eq!(worker.network.calls(), calls_after_install);
  }

  #[tokio::test]
  async fn test_non_get_bypasses() {
    let (worker, _) = worker(serving_manifest());
    let request = Request::get(worker.resolve("/style.css").unwrap()).with_method("POST");
    assert!(worker.handle_fetch(&request).await.unwrap().is_none());
    assert_eq!(worker.network.calls(), 0);
  }

  #[tokio::test]
  async fn test_offline_navigation_gets_root_document() {
    let (mut worker, _) = worker(serving_manifest());
    worker.start().await.unwrap();

    let request =
      Request::get(worker.resolve("/tools/qr-generator.html").unwrap()).with_accept("text/html");
    let result = worker.handle_fetch(&request).await.unwrap().unwrap();
    assert_eq!(result.source, ResponseSource::OfflineDocument);
    assert_eq!(result.response.body, b"<h1>home</h1>");
  }

  #[tokio::test]
  async fn test_get_version_message() {
    let (mut worker, _) = worker(serving_manifest());
    let reply = worker.handle_message(WorkerMessage::GetVersion).await.unwrap();
    assert_eq!(
      reply,
      Some(VersionReply {
        version: "1.0.0".to_string()
      })
    );
  }

  #[tokio::test]
  async fn test_skip_waiting_message_activates_installed_worker() {
    let (mut worker, _) = worker(serving_manifest());
    worker.install().await.unwrap();

    let reply = worker.handle_message(WorkerMessage::SkipWaiting).await.unwrap();
    assert!(reply.is_none());
    assert_eq!(worker.state(), WorkerState::Activated);
  }

  #[tokio::test]
  async fn test_skip_waiting_before_install_only_records_request() {
    let (mut worker, _) = worker(serving_manifest());
    worker.handle_message(WorkerMessage::SkipWaiting).await.unwrap();
    assert_eq!(worker.state(), WorkerState::Parsed);
  }

  #[tokio::test]
  async fn test_cache_urls_message() {
    let network = serving_manifest();
    network.serve("http://localhost:8080/extra.js", basic("extra"));
    let (mut worker, storage) = worker(network);

    worker
      .handle_message(WorkerMessage::CacheUrls {
        urls: vec!["/extra.js".to_string()],
      })
      .await
      .unwrap();
    let extra = worker.resolve("/extra.js").unwrap();
    assert_eq!(storage.match_url(&extra).unwrap(), Some(basic("extra")));

    // Failures are logged, not escalated
    worker
      .handle_message(WorkerMessage::CacheUrls {
        urls: vec!["/missing.js".to_string()],
      })
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn test_sync_only_handles_known_tag() {
    let (worker, _) = worker(serving_manifest());
    let storage = MemoryLocalStorage::new();
    storage
      .set_item(sync::OFFLINE_DATA_KEY, r#"[{"id":1}]"#)
      .unwrap();

    assert_eq!(worker.handle_sync("other", &storage).await, 0);
    assert!(storage.get_item(sync::OFFLINE_DATA_KEY).unwrap().is_some());

    assert_eq!(worker.handle_sync(sync::SYNC_TAG, &storage).await, 1);
    assert!(storage.get_item(sync::OFFLINE_DATA_KEY).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_periodic_content_update() {
    let (mut worker, storage) = worker(serving_manifest());
    worker.install().await.unwrap();

    worker
      .network
      .serve("http://localhost:8080/style.css", basic("body { color: red }"));
    assert_eq!(worker.handle_periodic_sync("unknown").await, 0);
    assert_eq!(worker.handle_periodic_sync(sync::CONTENT_UPDATE_TAG).await, 3);

    let style = worker.resolve("/style.css").unwrap();
    assert_eq!(
      storage.match_url(&style).unwrap(),
      Some(basic("body { color: red }"))
    );
  }

  #[test]
  fn test_invalid_origin_is_error() {
    let config = WorkerConfig {
      origin: "not a url".to_string(),
      ..WorkerConfig::default()
    };
    let result = OfflineWorker::new(&config, Arc::new(MemoryStorage::new()), FakeNetwork::new());
    assert!(result.is_err());
  }
}
