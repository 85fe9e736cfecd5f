//! Network access for the worker.

use color_eyre::{eyre::eyre, Result};
use reqwest::header::ACCEPT;
use std::future::Future;
use thiserror::Error;
use url::{Origin, Url};

use super::types::{Request, Response, ResponseType};

/// A fetch that produced no response at all
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
  #[error("unsupported method {0}")]
  InvalidMethod(String),
  #[error("request to {url} failed: {message}")]
  Failed { url: String, message: String },
}

/// Something that can perform a network fetch.
///
/// HTTP error statuses are responses, not failures; only transport-level
/// problems surface as `NetworkError`.
pub trait Fetch: Send + Sync {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response, NetworkError>> + Send;
}

/// reqwest-backed fetcher that classifies responses against the worker's origin
#[derive(Clone)]
pub struct HttpClient {
  client: reqwest::Client,
  origin: Origin,
}

impl HttpClient {
  pub fn new(origin: &Url) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("linkmaster/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      client,
      origin: origin.origin(),
    })
  }
}

impl Fetch for HttpClient {
  async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
    let method = reqwest::Method::from_bytes(request.method.as_bytes())
      .map_err(|_| NetworkError::InvalidMethod(request.method.clone()))?;

    let mut builder = self.client.request(method, request.url.clone());
    if let Some(accept) = &request.accept {
      builder = builder.header(ACCEPT, accept);
    }

    let failed = |e: reqwest::Error| NetworkError::Failed {
      url: request.url.to_string(),
      message: e.to_string(),
    };

    let response = builder.send().await.map_err(failed)?;
    let response_type = classify(&self.origin, response.url());
    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();
    let body = response.bytes().await.map_err(failed)?.to_vec();

    Ok(Response {
      status,
      response_type,
      headers,
      body,
    })
  }
}

/// Same-origin responses are `basic`, everything else `cors`
fn classify(origin: &Origin, url: &Url) -> ResponseType {
  if url.origin() == *origin {
    ResponseType::Basic
  } else {
    ResponseType::Cors
  }
}
