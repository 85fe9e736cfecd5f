use serde::{Deserialize, Serialize};

/// A bookmarked short link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
  /// Creation timestamp in milliseconds
  pub id: i64,
  pub long_url: String,
  /// Uniqueness key
  pub short_url: String,
  pub clicks: u64,
  /// Localized creation time, display only
  pub created_at: String,
  pub title: String,
}

/// Aggregates derived from the current link list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStats {
  pub total_links: usize,
  pub total_clicks: u64,
}
