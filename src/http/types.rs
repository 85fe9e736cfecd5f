use std::fmt;
use std::str::FromStr;
use url::Url;

/// An outbound request as seen by the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  /// Upper-case HTTP method
  pub method: String,
  pub url: Url,
  /// Value of the `Accept` header, if any
  pub accept: Option<String>,
}

impl Request {
  pub fn get(url: Url) -> Self {
    Self {
      method: "GET".to_string(),
      url,
      accept: None,
    }
  }

  pub fn with_method(mut self, method: &str) -> Self {
    self.method = method.to_ascii_uppercase();
    self
  }

  pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
    self.accept = Some(accept.into());
    self
  }

  pub fn is_get(&self) -> bool {
    self.method == "GET"
  }

  /// Whether the client asked for an HTML document
  pub fn accepts_html(&self) -> bool {
    self
      .accept
      .as_deref()
      .is_some_and(|accept| accept.contains("text/html"))
  }
}

/// How a response relates to the worker's origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
  /// Same-origin response
  Basic,
  /// Cross-origin response
  Cors,
  /// Built by the worker itself
  Default,
}

impl ResponseType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseType::Basic => "basic",
      ResponseType::Cors => "cors",
      ResponseType::Default => "default",
    }
  }
}

impl FromStr for ResponseType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "basic" => Ok(ResponseType::Basic),
      "cors" => Ok(ResponseType::Cors),
      "default" => Ok(ResponseType::Default),
      other => Err(format!("unknown response type '{}'", other)),
    }
  }
}

impl fmt::Display for ResponseType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A complete response snapshot, storable in a cache bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: u16,
  pub response_type: ResponseType,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl Response {
  /// A worker-built HTML response
  pub fn html(body: impl Into<String>) -> Self {
    Self {
      status: 200,
      response_type: ResponseType::Default,
      headers: vec![("Content-Type".to_string(), "text/html".to_string())],
      body: body.into().into_bytes(),
    }
  }

  /// Status in the 200-299 range
  pub fn is_ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Case-insensitive header lookup
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}
