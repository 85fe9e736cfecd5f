use serde::{Deserialize, Serialize};

/// Version reported in reply to `GET_VERSION`
pub const WORKER_VERSION: &str = "1.0.0";

/// Messages the page can post to the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
  /// Activate as soon as installation has finished
  SkipWaiting,
  /// Reply with the worker version
  GetVersion,
  /// Add the given URLs to the current cache bucket
  CacheUrls { urls: Vec<String> },
}

/// Reply sent back over the message's reply channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReply {
  pub version: String,
}

impl Default for VersionReply {
  fn default() -> Self {
    Self {
      version: WORKER_VERSION.to_string(),
    }
  }
}
