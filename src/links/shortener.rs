//! Fake shortening: a random slug appended to a fixed domain.

use color_eyre::Result;
use rand::Rng;
use std::time::Duration;
use tracing::info;

use crate::db::KeyValueStore;

use super::store::LinkStore;
use super::types::LinkRecord;
use super::validate::validate_url;

const SLUG_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const SLUG_LEN: usize = 6;

/// Generate a random slug
pub fn generate_slug() -> String {
  let mut rng = rand::thread_rng();
  (0..SLUG_LEN)
    .map(|_| SLUG_CHARSET[rng.gen_range(0..SLUG_CHARSET.len())] as char)
    .collect()
}

/// Build a short URL under `domain`
pub fn short_url(domain: &str, slug: &str) -> String {
  format!("{}/{}", domain.trim_end_matches('/'), slug)
}

/// Produces short links and auto-saves them to the link store.
pub struct Shortener {
  domain: String,
  delay: Duration,
}

impl Shortener {
  pub fn new(domain: impl Into<String>, delay: Duration) -> Self {
    Self {
      domain: domain.into(),
      delay,
    }
  }

  /// Validate `input`, wait out the artificial delay, then save a fresh short link.
  pub async fn shorten<K: KeyValueStore>(
    &self,
    store: &mut LinkStore<K>,
    input: &str,
  ) -> Result<LinkRecord> {
    let long_url = validate_url(input)?;

    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }

    let short = short_url(&self.domain, &generate_slug());
    let record = store.save(&long_url, &short)?;
    info!(long_url = %record.long_url, short_url = %record.short_url, "Link shortened");
    Ok(record)
  }
}
