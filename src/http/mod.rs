pub mod client;
pub mod types;

pub use client::{Fetch, HttpClient};
pub use types::{Request, Response, ResponseType};
