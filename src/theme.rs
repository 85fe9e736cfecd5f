use color_eyre::Result;
use std::fmt;

use crate::db::KeyValueStore;

/// Storage key holding the theme preference
pub const THEME_KEY: &str = "linkmaster_theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
  #[default]
  Light,
  Dark,
}

impl Theme {
  pub fn as_str(&self) -> &'static str {
    match self {
      Theme::Light => "light",
      Theme::Dark => "dark",
    }
  }

  pub fn toggled(self) -> Self {
    match self {
      Theme::Light => Theme::Dark,
      Theme::Dark => Theme::Light,
    }
  }

  /// Read the stored preference. Unknown values fall back to light.
  pub fn load(storage: &impl KeyValueStore) -> Result<Self> {
    Ok(match storage.get_item(THEME_KEY)?.as_deref() {
      Some("dark") => Theme::Dark,
      _ => Theme::Light,
    })
  }

  /// Flip the stored preference and return the new value.
  pub fn toggle(storage: &impl KeyValueStore) -> Result<Self> {
    let theme = Self::load(storage)?.toggled();
    storage.set_item(THEME_KEY, theme.as_str())?;
    Ok(theme)
  }
}

impl fmt::Display for Theme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
