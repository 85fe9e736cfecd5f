//! Background sync of data queued while offline.

use color_eyre::Result;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::KeyValueStore;

/// Storage key holding items queued while offline
pub const OFFLINE_DATA_KEY: &str = "linkmaster_offline_data";

/// Sync tag that flushes queued offline data
pub const SYNC_TAG: &str = "linkmaster-sync";

/// Periodic sync tag that refreshes the static manifest
pub const CONTENT_UPDATE_TAG: &str = "content-update";

/// Items currently queued. Absent or unreadable data counts as empty.
pub fn queued_items<K: KeyValueStore + ?Sized>(storage: &K) -> Result<Vec<Value>> {
  let Some(raw) = storage.get_item(OFFLINE_DATA_KEY)? else {
    return Ok(Vec::new());
  };

  match serde_json::from_str(&raw) {
    Ok(items) => Ok(items),
    Err(e) => {
      warn!(error = %e, "Queued offline data is unreadable, ignoring it");
      Ok(Vec::new())
    }
  }
}

/// Push each queued item, then clear the queue.
///
/// There is no server to push to: each item is logged after `item_delay`.
/// Returns the number of items synced.
pub async fn sync_offline_data<K: KeyValueStore + ?Sized>(
  storage: &K,
  item_delay: Duration,
) -> Result<usize> {
  let items = queued_items(storage)?;
  if items.is_empty() {
    return Ok(0);
  }

  info!(count = items.len(), "Syncing offline data");
  for item in &items {
    tokio::time::sleep(item_delay).await;
    info!(%item, "Synced item");
  }

  storage.remove_item(OFFLINE_DATA_KEY)?;
  Ok(items.len())
}
