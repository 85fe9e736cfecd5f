//! Result types for the fetch path.

use crate::http::Response;

/// Response produced by the fetch handler, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct FetchResult {
  /// The response handed back to the page
  pub response: Response,
  /// Where the response came from
  pub source: ResponseSource,
}

impl FetchResult {
  pub fn from_cache(response: Response) -> Self {
    Self {
      response,
      source: ResponseSource::Cache,
    }
  }

  /// Fresh network data; `stored` records whether a copy went into the cache.
  pub fn from_network(response: Response, stored: bool) -> Self {
    Self {
      response,
      source: if stored {
        ResponseSource::NetworkStored
      } else {
        ResponseSource::Network
      },
    }
  }

  pub fn offline(response: Response, source: ResponseSource) -> Self {
    Self { response, source }
  }
}

/// Terminal state of the fetch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  /// Served verbatim from a cache bucket
  Cache,
  /// From network, written into the current bucket
  NetworkStored,
  /// From network, not cacheable
  Network,
  /// Network failed, served the cached root document
  OfflineDocument,
  /// Network failed, served the built-in offline page
  OfflinePage,
}

impl ResponseSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseSource::Cache => "cache",
      ResponseSource::NetworkStored => "network (cached)",
      ResponseSource::Network => "network",
      ResponseSource::OfflineDocument => "offline document",
      ResponseSource::OfflinePage => "offline page",
    }
  }
}
