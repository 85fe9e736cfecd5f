use thiserror::Error;
use url::Url;

/// Rejected user input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("please enter a valid URL")]
  InvalidUrl,
  #[error("create a short link first")]
  MissingShortUrl,
}

/// Validate a user-supplied long URL.
///
/// Inputs without a scheme get `https://` prepended before parsing. Returns the
/// normalized string, which is what gets stored as the link's long URL.
pub fn validate_url(input: &str) -> Result<String, ValidationError> {
  let input = input.trim();
  if input.is_empty() {
    return Err(ValidationError::InvalidUrl);
  }
  if !input.contains('.') || input.chars().count() < 5 {
    return Err(ValidationError::InvalidUrl);
  }

  let normalized = if input.starts_with("http://") || input.starts_with("https://") {
    input.to_string()
  } else {
    format!("https://{}", input)
  };

  Url::parse(&normalized).map_err(|_| ValidationError::InvalidUrl)?;
  Ok(normalized)
}
