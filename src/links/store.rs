//! Ordered link list mirrored to local storage.

use chrono::Local;
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::db::KeyValueStore;

use super::types::{LinkRecord, LinkStats};
use super::ValidationError;

/// Storage key holding the serialized link list
pub const LINKS_KEY: &str = "linkmaster_links";

/// Short URL shown before anything has been shortened
pub const PLACEHOLDER_SHORT_URL: &str = "https://lnkmstr.com/abc123";

/// Title used when the long URL cannot be parsed
pub const UNKNOWN_TITLE: &str = "Unknown site";

/// In-memory link list, newest first, persisted after every mutation.
pub struct LinkStore<K: KeyValueStore> {
  storage: Arc<K>,
  links: Vec<LinkRecord>,
}

impl<K: KeyValueStore> LinkStore<K> {
  /// Rehydrate the store from storage.
  ///
  /// A missing or unparsable value yields an empty store.
  pub fn load(storage: Arc<K>) -> Result<Self> {
    let links = match storage.get_item(LINKS_KEY)? {
      Some(raw) => match serde_json::from_str::<Vec<LinkRecord>>(&raw) {
        Ok(links) => links,
        Err(e) => {
          warn!(error = %e, "Stored links are unreadable, starting empty");
          Vec::new()
        }
      },
      None => Vec::new(),
    };

    debug!(count = links.len(), "Link store hydrated");
    Ok(Self { storage, links })
  }

  /// Links in display order
  pub fn links(&self) -> &[LinkRecord] {
    &self.links
  }

  /// Save a link, replacing any record with the same short URL.
  ///
  /// A replaced record keeps its position; a new record goes to the front.
  pub fn save(&mut self, long_url: &str, short_url: &str) -> Result<LinkRecord> {
    if short_url.is_empty() || short_url == PLACEHOLDER_SHORT_URL {
      return Err(ValidationError::MissingShortUrl.into());
    }

    let now = Local::now();
    let link = LinkRecord {
      id: now.timestamp_millis(),
      long_url: long_url.to_string(),
      short_url: short_url.to_string(),
      clicks: 0,
      created_at: now.format("%d/%m/%Y, %H:%M:%S").to_string(),
      title: extract_title(long_url),
    };

    let mut links = self.links.clone();
    match links.iter().position(|l| l.short_url == short_url) {
      Some(index) => {
        debug!(short_url, index, "Replacing existing link");
        links[index] = link.clone();
      }
      None => links.insert(0, link.clone()),
    }

    // Memory only changes once storage has accepted the new list
    self.persist(&links)?;
    self.links = links;
    Ok(link)
  }

  /// Totals over the current list
  pub fn stats(&self) -> LinkStats {
    LinkStats {
      total_links: self.links.len(),
      total_clicks: self
        .links
        .iter()
        .fold(0u64, |acc, l| acc.saturating_add(l.clicks)),
    }
  }

  fn persist(&self, links: &[LinkRecord]) -> Result<()> {
    let raw = serde_json::to_string(links)
      .map_err(|e| eyre!("Failed to serialize links: {}", e))?;
    self.storage.set_item(LINKS_KEY, &raw)
  }
}

/// Derive a display title from the long URL's host.
///
/// Drops the first `www.`, `.com` and `.org` found in the host.
pub fn extract_title(long_url: &str) -> String {
  match Url::parse(long_url) {
    Ok(url) => url
      .host_str()
      .unwrap_or_default()
      .replacen("www.", "", 1)
      .replacen(".com", "", 1)
      .replacen(".org", "", 1),
    Err(_) => UNKNOWN_TITLE.to_string(),
  }
}
