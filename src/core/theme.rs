use tracing::debug;

use crate::core::storage::Storage;
use crate::core::surface::Surface;

pub const THEME_KEY: &str = "grs_image_web_theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn html_class(&self) -> &'static str {
        match self {
            Theme::Dark => "theme-dark",
            Theme::Light => "theme-light",
        }
    }

    /// The toggle button shows the theme you would switch to.
    pub fn button_icon(&self) -> &'static str {
        match self {
            Theme::Dark => "☀️",
            Theme::Light => "🌙",
        }
    }
}

/// Reads the saved theme. Anything unreadable means dark.
pub fn load(storage: &Storage) -> Theme {
    match storage.get(THEME_KEY) {
        Ok(Some(v)) if v == "light" => Theme::Light,
        Ok(_) => Theme::Dark,
        Err(e) => {
            debug!("Theme unreadable, using dark: {}", e);
            Theme::Dark
        }
    }
}

/// Saves (best effort) and applies the theme to the page chrome.
pub fn apply(storage: &Storage, surface: &mut Surface, theme: Theme) {
    if let Err(e) = storage.set(THEME_KEY, theme.as_str()) {
        debug!("Theme not persisted: {}", e);
    }
    surface.set_attr("html-theme", "class", theme.html_class());
    surface.set_text("btn-theme", theme.button_icon());
}

pub fn toggle(storage: &Storage, surface: &mut Surface) -> Theme {
    let next = load(storage).toggled();
    apply(storage, surface, next);
    next
}
