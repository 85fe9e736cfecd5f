//! Cache layer that orchestrates bucket storage with network fetching.

use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::http::{Fetch, Request};

use super::policy;
use super::storage::CacheStorage;
use super::traits::FetchResult;

/// Cache layer bound to the current cache generation.
///
/// Lookups search every bucket; writes always go to the current one.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  cache_name: String,
}

impl<S: CacheStorage> CacheLayer<S> {
  pub fn new(storage: Arc<S>, cache_name: impl Into<String>) -> Self {
    Self {
      storage,
      cache_name: cache_name.into(),
    }
  }

  /// Name of the current generation
  pub fn cache_name(&self) -> &str {
    &self.cache_name
  }

  /// Create the current bucket if absent.
  pub fn open(&self) -> Result<()> {
    self.storage.open_bucket(&self.cache_name)
  }

  pub fn bucket_names(&self) -> Result<Vec<String>> {
    self.storage.bucket_names()
  }

  /// Delete every bucket other than the current generation.
  pub fn evict_stale(&self) -> Result<Vec<String>> {
    let names = self.storage.bucket_names()?;
    let mut deleted = Vec::new();
    for name in policy::stale_buckets(&names, &self.cache_name) {
      debug!(bucket = name, "Deleting old cache");
      self.storage.delete_bucket(name)?;
      deleted.push(name.to_string());
    }
    Ok(deleted)
  }

  /// Fetch every URL and store all of them, or none.
  ///
  /// Fails if any fetch fails or answers with a non-2xx status.
  pub async fn add_all<N: Fetch>(&self, network: &N, urls: &[Url]) -> Result<usize> {
    let requests: Vec<Request> = urls.iter().cloned().map(Request::get).collect();
    let responses = join_all(requests.iter().map(|r| network.fetch(r))).await;

    let mut entries = Vec::with_capacity(urls.len());
    for (url, response) in urls.iter().zip(responses) {
      let response = response.map_err(|e| eyre!("Failed to cache {}: {}", url, e))?;
      if !response.is_ok() {
        return Err(eyre!(
          "Failed to cache {}: server answered {}",
          url,
          response.status
        ));
      }
      entries.push((url.clone(), response));
    }

    self.storage.put_all(&self.cache_name, &entries)?;
    Ok(entries.len())
  }

  /// Re-fetch each URL and overwrite its entry when the network answers ok.
  ///
  /// Individual failures are logged and skipped. Returns how many entries were
  /// refreshed.
  pub async fn refresh<N: Fetch>(&self, network: &N, urls: &[Url]) -> Result<usize> {
    let mut updated = 0;
    for url in urls {
      match network.fetch(&Request::get(url.clone())).await {
        Ok(response) if response.is_ok() => {
          self.storage.put(&self.cache_name, url, &response)?;
          debug!(%url, "Updated cached asset");
          updated += 1;
        }
        Ok(response) => {
          warn!(%url, status = response.status, "Skipping asset update");
        }
        Err(e) => {
          warn!(%url, error = %e, "Failed to update asset");
        }
      }
    }
    Ok(updated)
  }

  /// Cache-first fetch with network fallback.
  ///
  /// 1. Stored response for the exact URL → returned verbatim
  /// 2. Miss → network; same-origin 200s are copied into the current bucket
  /// 3. Network failure → cached `root_document` for HTML requests, else the
  ///    built-in offline page
  pub async fn fetch<N: Fetch>(
    &self,
    network: &N,
    request: &Request,
    root_document: &Url,
  ) -> Result<FetchResult> {
    if let Some(cached) = self.storage.match_url(&request.url)? {
      debug!(url = %request.url, "Serving from cache");
      return Ok(FetchResult::from_cache(cached));
    }

    match network.fetch(request).await {
      Ok(response) => {
        if !policy::is_cacheable(&response) {
          return Ok(FetchResult::from_network(response, false));
        }

        // A failed write must not cost the page its response
        let stored = match self.storage.put(&self.cache_name, &request.url, &response) {
          Ok(()) => {
            debug!(url = %request.url, "Cached new resource");
            true
          }
          Err(e) => {
            warn!(url = %request.url, error = %e, "Failed to cache response");
            false
          }
        };
        Ok(FetchResult::from_network(response, stored))
      }
      Err(e) => {
        warn!(url = %request.url, error = %e, "Network request failed");
        let root = if request.accepts_html() {
          self.storage.match_url(root_document)?
        } else {
          None
        };
        Ok(policy::fallback(request, root))
      }
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::cache::storage::MemoryStorage;
  use crate::cache::ResponseSource;
  use crate::http::client::NetworkError;
  use crate::http::{Response, ResponseType};
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  /// Scripted network that counts every call
  #[derive(Default)]
  pub(crate) struct FakeNetwork {
    responses: Mutex<HashMap<String, Response>>,
    pub(crate) calls: AtomicUsize,
  }

  impl FakeNetwork {
    pub(crate) fn new() -> Self {
      Self::default()
    }

    pub(crate) fn serve(&self, url: &str, response: Response) {
      self
        .responses
        .lock()
        .unwrap()
        .insert(url.to_string(), response);
    }

    pub(crate) fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  impl Fetch for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self
        .responses
        .lock()
        .unwrap()
        .get(request.url.as_str())
        .cloned()
        .ok_or_else(|| NetworkError::Failed {
          url: request.url.to_string(),
          message: "offline".to_string(),
        })
    }
  }

  pub(crate) fn basic(body: &str) -> Response {
    Response {
      status: 200,
      response_type: ResponseType::Basic,
      headers: Vec::new(),
      body: body.as_bytes().to_vec(),
    }
  }

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  fn layer() -> (CacheLayer<MemoryStorage>, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    (
      CacheLayer::new(Arc::clone(&storage), "linkmaster-cache-v1"),
      storage,
    )
  }

  const ROOT: &str = "http://localhost:8080/index.html";

  #[tokio::test]
  async fn test_cache_hit_never_reaches_network() {
    let (layer, storage) = layer();
    let style = url("http://localhost:8080/style.css");
    storage
      .put("linkmaster-cache-v1", &style, &basic("cached"))
      .unwrap();

    let network = FakeNetwork::new();
    network.serve(style.as_str(), basic("fresh"));

    let result = layer
      .fetch(&network, &Request::get(style), &url(ROOT))
      .await
      .unwrap();
    assert_eq!(result.source, ResponseSource::Cache);
    assert_eq!(result.response.body, b"cached");
    assert_eq!(network.calls(), 0);
  }

  #[tokio::test]
  async fn test_miss_stores_same_origin_success() {
    let (layer, storage) = layer();
    let network = FakeNetwork::new();
    let script = url("http://localhost:8080/script.js");
    network.serve(script.as_str(), basic("js"));

    let result = layer
      .fetch(&network, &Request::get(script.clone()), &url(ROOT))
      .await
      .unwrap();
    assert_eq!(result.source, ResponseSource::NetworkStored);
    assert_eq!(storage.match_url(&script).unwrap(), Some(basic("js")));

    // Second request is answered from the cache
    let result = layer
      .fetch(&network, &Request::get(script), &url(ROOT))
      .await
      .unwrap();
    assert_eq!(result.source, ResponseSource::Cache);
    assert_eq!(network.calls(), 1);
  }

  #[tokio::test]
  async fn test_miss_does_not_store_other_responses() {
    let (layer, storage) = layer();
    let network = FakeNetwork::new();

    let cdn = url("https://cdn.example.com/lib.js");
    network.serve(
      cdn.as_str(),
      Response {
        response_type: ResponseType::Cors,
        ..basic("lib")
      },
    );
    let missing = url("http://localhost:8080/missing");
    network.serve(
      missing.as_str(),
      Response {
        status: 404,
        ..basic("not found")
      },
    );

    for target in [cdn, missing] {
      let result = layer
        .fetch(&network, &Request::get(target.clone()), &url(ROOT))
        .await
        .unwrap();
      assert_eq!(result.source, ResponseSource::Network);
      assert_eq!(storage.match_url(&target).unwrap(), None);
    }
  }

  #[tokio::test]
  async fn test_network_failure_html_uses_root_document() {
    let (layer, storage) = layer();
    storage
      .put("linkmaster-cache-v1", &url(ROOT), &basic("<h1>home</h1>"))
      .unwrap();

    let request =
      Request::get(url("http://localhost:8080/tools/bio-links.html")).with_accept("text/html");
    let result = layer
      .fetch(&FakeNetwork::new(), &request, &url(ROOT))
      .await
      .unwrap();
    assert_eq!(result.source, ResponseSource::OfflineDocument);
    assert_eq!(result.response.body, b"<h1>home</h1>");
  }

  #[tokio::test]
  async fn test_network_failure_html_without_root_document() {
    let (layer, _) = layer();
    let request = Request::get(url("http://localhost:8080/")).with_accept("text/html");
    let result = layer
      .fetch(&FakeNetwork::new(), &request, &url(ROOT))
      .await
      .unwrap();
    assert_eq!(result.source, ResponseSource::OfflinePage);
    assert_eq!(result.response, policy::offline_page());
  }

  #[tokio::test]
  async fn test_network_failure_non_html_gets_offline_page() {
    let (layer, storage) = layer();
    storage
      .put("linkmaster-cache-v1", &url(ROOT), &basic("<h1>home</h1>"))
      .unwrap();

    let request = Request::get(url("http://localhost:8080/logo.png")).with_accept("image/png");
    let result = layer
      .fetch(&FakeNetwork::new(), &request, &url(ROOT))
      .await
      .unwrap();
    assert_eq!(result.source, ResponseSource::OfflinePage);
  }

  #[tokio::test]
  async fn test_add_all_is_all_or_nothing() {
    let (layer, storage) = layer();
    let network = FakeNetwork::new();
    let a = url("http://localhost:8080/a.css");
    let b = url("http://localhost:8080/b.css");
    network.serve(a.as_str(), basic("a"));

    assert!(layer.add_all(&network, &[a.clone(), b.clone()]).await.is_err());
    assert_eq!(storage.match_url(&a).unwrap(), None);

    network.serve(
      b.as_str(),
      Response {
        status: 500,
        ..basic("boom")
      },
    );
    assert!(layer.add_all(&network, &[a.clone(), b.clone()]).await.is_err());
    assert_eq!(storage.match_url(&a).unwrap(), None);

    network.serve(b.as_str(), basic("b"));
    assert_eq!(layer.add_all(&network, &[a.clone(), b.clone()]).await.unwrap(), 2);
    assert_eq!(storage.match_url(&a).unwrap(), Some(basic("a")));
    assert_eq!(storage.match_url(&b).unwrap(), Some(basic("b")));
  }

  #[tokio::test]
  async fn test_refresh_skips_failures() {
    let (layer, storage) = layer();
    let network = FakeNetwork::new();
    let a = url("http://localhost:8080/a.css");
    let b = url("http://localhost:8080/b.css");
    storage.put("linkmaster-cache-v1", &b, &basic("old b")).unwrap();
    network.serve(a.as_str(), basic("new a"));

    assert_eq!(layer.refresh(&network, &[a.clone(), b.clone()]).await.unwrap(), 1);
    assert_eq!(storage.match_url(&a).unwrap(), Some(basic("new a")));
    assert_eq!(storage.match_url(&b).unwrap(), Some(basic("old b")));
  }

  #[test]
  fn test_evict_stale_keeps_current_generation() {
    let (layer, storage) = layer();
    for name in ["linkmaster-cache-v0", "linkmaster-cache-v1", "legacy"] {
      storage.open_bucket(name).unwrap();
    }

    let deleted = layer.evict_stale().unwrap();
    assert_eq!(deleted, vec!["linkmaster-cache-v0", "legacy"]);
    assert_eq!(layer.bucket_names().unwrap(), vec!["linkmaster-cache-v1"]);
  }
}
