//! Pure decisions of the fetch and activation paths.

use crate::http::{Request, Response, ResponseType};

use super::{FetchResult, ResponseSource};

/// What the worker does with an intercepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  /// Leave the request to default handling
  Bypass,
  /// Run the cache-first state machine
  CacheFirst,
}

/// Only GET requests are intercepted.
pub fn route(request: &Request) -> Route {
  if request.is_get() {
    Route::CacheFirst
  } else {
    Route::Bypass
  }
}

/// A network response is written to the cache only when it is a same-origin 200.
pub fn is_cacheable(response: &Response) -> bool {
  response.status == 200 && response.response_type == ResponseType::Basic
}

/// Buckets to purge on activation: every name except the current generation.
pub fn stale_buckets<'a>(names: &'a [String], current: &str) -> Vec<&'a str> {
  names
    .iter()
    .map(String::as_str)
    .filter(|name| *name != current)
    .collect()
}

/// Response for a request whose network fetch failed.
///
/// HTML requests get the cached root document when there is one; everything
/// else gets the built-in offline page.
pub fn fallback(request: &Request, root_document: Option<Response>) -> FetchResult {
  match root_document {
    Some(doc) if request.accepts_html() => {
      FetchResult::offline(doc, ResponseSource::OfflineDocument)
    }
    _ => FetchResult::offline(offline_page(), ResponseSource::OfflinePage),
  }
}

/// The built-in offline page
pub fn offline_page() -> Response {
  Response::html(OFFLINE_HTML)
}

const OFFLINE_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>LinkMaster - Offline</title>
    <style>
      body {
        font-family: Arial, sans-serif;
        text-align: center;
        padding: 50px;
        background: #f0f2f5;
      }
      .offline-container {
        background: white;
        padding: 40px;
        border-radius: 10px;
        box-shadow: 0 2px 10px rgba(0,0,0,0.1);
      }
      h1 { color: #666; }
      p { color: #888; }
    </style>
  </head>
  <body>
    <div class="offline-container">
      <h1>You are offline</h1>
      <p>Try again once your internet connection is back.</p>
      <button onclick="location.reload()">Reload</button>
    </div>
  </body>
</html>
"#;
