//! Login state shared by the generation page and the links page.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::api::{ApiClient, ApiError};
use crate::core::surface::Surface;

pub const TELEGRAM_WIDGET_SRC: &str = "https://telegram.org/js/telegram-widget.js?22";
pub const LOCAL_MODE_LABEL: &str = "Локальный режим";
pub const LOGIN_FAILED: &str = "Ошибка входа";

pub const SCREEN_LOGIN: &str = "screen-login";
pub const SCREEN_MAIN: &str = "screen-main";
pub const USER_NAME: &str = "user-name";
pub const LOGOUT_BUTTON: &str = "btn-logout";
pub const LOGIN_CONTAINER: &str = "telegram-login-container";
pub const LOGIN_NO_BOT: &str = "login-no-bot";

fn require_auth_default() -> bool {
    true
}

/// `/config`. Only an explicit `require_auth: false` turns on local mode.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "require_auth_default")]
    pub require_auth: bool,
    #[serde(default)]
    pub bot_username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeUser {
    pub id: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<MeUser>,
}

/// What the Telegram Login Widget hands to its callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelegramAuth {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

impl TelegramAuth {
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("User")
    }
}

/// Embed description of the Telegram Login Widget for one bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramWidget {
    pub bot_username: String,
}

impl TelegramWidget {
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("data-telegram-login", self.bot_username.clone()),
            ("data-size", "large".to_string()),
            ("data-onauth", "onTelegramAuth(user)".to_string()),
            ("data-request-access", "write".to_string()),
        ]
    }

    pub fn script_tag(&self) -> String {
        let attrs: String = self
            .attributes()
            .iter()
            .map(|(k, v)| format!(" {}=\"{}\"", k, html_escape::encode_double_quoted_attribute(v)))
            .collect();
        format!("<script async src=\"{}\"{}></script>", TELEGRAM_WIDGET_SRC, attrs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// The backend does not require login.
    Local,
    Authenticated { user_id: String },
    /// Login needed. `None` means no bot is configured.
    LoginRequired { widget: Option<TelegramWidget> },
}

fn widget_for(bot: Option<String>) -> Option<TelegramWidget> {
    bot.filter(|b| !b.is_empty())
        .map(|bot_username| TelegramWidget { bot_username })
}

fn id_text(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Works out the session from `/config` and `/me`. `me_failure_keeps_bot` controls whether a
/// failing `/me` still offers the configured bot's widget.
pub async fn check(api: &ApiClient, me_failure_keeps_bot: bool) -> SessionState {
    let config = match api.get_json::<AuthConfig>("/config").await {
        Ok(config) => config,
        Err(e) => {
            info!("Config unavailable ({}), running in local mode", e);
            return SessionState::Local;
        }
    };
    if !config.require_auth {
        return SessionState::Local;
    }
    match api.get_json::<MeResponse>("/me").await {
        Ok(MeResponse {
            authenticated: true,
            user: Some(user),
        }) => SessionState::Authenticated {
            user_id: id_text(&user.id),
        },
        Ok(_) => SessionState::LoginRequired {
            widget: widget_for(config.bot_username),
        },
        Err(e) => {
            debug!("/me failed: {}", e);
            let bot = if me_failure_keeps_bot {
                config.bot_username
            } else {
                None
            };
            SessionState::LoginRequired {
                widget: widget_for(bot),
            }
        }
    }
}

pub async fn login(api: &ApiClient, payload: &TelegramAuth) -> Result<(), ApiError> {
    api.post_json::<_, serde_json::Value>("/auth/telegram", payload)
        .await
        .map(|_| ())
}

pub async fn logout(api: &ApiClient) -> Result<(), ApiError> {
    api.post_empty("/logout").await
}

/// Alert text for a failed login.
pub fn login_error(e: &ApiError) -> String {
    let reason = match e {
        ApiError::Status { .. } => e.detail_or(LOGIN_FAILED).to_string(),
        other => other.to_string(),
    };
    warn!("Telegram login rejected: {}", reason);
    format!("{}: {}", LOGIN_FAILED, reason)
}

pub fn show_user(surface: &mut Surface, label: &str) {
    surface.set_text(USER_NAME, label);
    surface.show(USER_NAME);
}

/// Shows one of the two screens. Returns true when the main screen became visible.
pub fn show_screen(surface: &mut Surface, main: bool) -> bool {
    surface.set_hidden(SCREEN_LOGIN, main);
    surface.set_hidden(SCREEN_MAIN, !main);
    main
}

/// Applies a checked session to the header and login screen. Returns true when the main
/// screen should be entered.
pub fn apply(surface: &mut Surface, state: &SessionState) -> bool {
    match state {
        SessionState::Local => {
            show_user(surface, LOCAL_MODE_LABEL);
            surface.hide(LOGOUT_BUTTON);
            true
        }
        SessionState::Authenticated { user_id } => {
            show_user(surface, &format!("ID {}", user_id));
            surface.show(LOGOUT_BUTTON);
            true
        }
        SessionState::LoginRequired { widget: Some(widget) } => {
            show_screen(surface, false);
            surface.set_html(LOGIN_CONTAINER, widget.script_tag());
            false
        }
        SessionState::LoginRequired { widget: None } => {
            show_screen(surface, false);
            surface.show(LOGIN_NO_BOT);
            false
        }
    }
}
