//! Bookmarked links: validation, fake shortening, and the persisted store.

pub mod shortener;
pub mod store;
pub mod types;
pub mod validate;

pub use shortener::Shortener;
pub use store::LinkStore;
pub use types::{LinkRecord, LinkStats};
pub use validate::ValidationError;
