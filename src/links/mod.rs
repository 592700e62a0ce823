//! The links page: upload images to get a public link, list, copy and delete them.

pub mod render;

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

use crate::core::api::{ApiClient, ApiError};
use crate::core::clipboard::{Clipboard, copy_with_feedback};
use crate::core::config::DashboardConfig;
use crate::core::models::{LinkItem, LinksResponse};
use crate::core::popup;
use crate::core::storage::Storage;
use crate::core::surface::Surface;
use crate::core::theme::{self, Theme};
use crate::imageweb::files::{SelectedFile, is_uploadable_image};
use crate::imageweb::session::{self, SessionState, TelegramAuth};

pub const PAGE_SIZE: usize = 10;
/// Where the browser goes after logging out.
pub const LOGOUT_TARGET: &str = "/links";

pub const LINKS_LIST: &str = "links-list";
pub const LINKS_EMPTY: &str = "links-empty";
pub const SHOW_MORE: &str = "btn-show-more";
pub const UPLOAD_BUTTON: &str = "btn-upload";
pub const FILE_INPUT: &str = "link-file-input";
pub const DELETE_POPUP: &str = "delete-confirm-popup";

pub const PICK_IMAGE: &str = "Выберите изображение (PNG, JPG, GIF или WebP).";
pub const FILE_TOO_LARGE: &str = "Файл слишком большой. До 15 МБ.";
pub const UPLOAD_FAILED: &str = "Ошибка загрузки";
pub const UPLOAD_SERVER_ERROR: &str = "Ошибка сервера.";
pub const DELETE_FAILED: &str = "Ошибка удаления";
pub const LIST_FAILED: &str = "Ошибка загрузки списка";

const INITIALLY_HIDDEN: &[&str] = &[
    session::SCREEN_MAIN,
    session::USER_NAME,
    session::LOGOUT_BUTTON,
    session::LOGIN_NO_BOT,
    LINKS_EMPTY,
    SHOW_MORE,
    DELETE_POPUP,
];

fn upload_failure_message(e: &ApiError) -> String {
    match e {
        ApiError::Status { status: 413, .. } => FILE_TOO_LARGE.to_string(),
        ApiError::Status {
            json_body: false, ..
        } => UPLOAD_SERVER_ERROR.to_string(),
        ApiError::Status { .. } => e.detail_or(UPLOAD_FAILED).to_string(),
        ApiError::Decode(_) => UPLOAD_SERVER_ERROR.to_string(),
        ApiError::Network(reason) if !reason.is_empty() => reason.clone(),
        ApiError::Network(_) => UPLOAD_FAILED.to_string(),
    }
}

/// Message for list and delete failures: the backend's detail, the transport error, or
/// `fallback`.
fn request_failure_message(e: &ApiError, fallback: &str) -> String {
    match e {
        ApiError::Status { .. } => e.detail_or("Ошибка").to_string(),
        other => {
            let text = other.to_string();
            if text.is_empty() {
                fallback.to_string()
            } else {
                text
            }
        }
    }
}

/// Controller for the links page.
pub struct LinksPage {
    api: ApiClient,
    storage: Storage,
    clipboard: Arc<dyn Clipboard>,
    surface: Surface,
    origin: String,
    items: Vec<LinkItem>,
    offset: usize,
    total: usize,
    delete_target: Option<String>,
}

impl LinksPage {
    /// `origin` is the public origin used for links the backend returns without a full URL.
    pub fn new(
        api: ApiClient,
        storage: Storage,
        clipboard: Arc<dyn Clipboard>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            api,
            storage,
            clipboard,
            surface: Surface::with_hidden(INITIALLY_HIDDEN),
            origin: origin.into(),
            items: Vec::new(),
            offset: 0,
            total: 0,
            delete_target: None,
        }
    }

    /// Relative links are completed with the configured public origin.
    pub fn from_config(
        config: &DashboardConfig,
        clipboard: Arc<dyn Clipboard>,
    ) -> anyhow::Result<Self> {
        Ok(Self::new(
            ApiClient::from_config(config)?,
            config.open_storage()?,
            clipboard,
            config.public_origin.clone(),
        ))
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn items(&self) -> &[LinkItem] {
        &self.items
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn delete_target(&self) -> Option<&str> {
        self.delete_target.as_deref()
    }

    pub async fn start(&mut self) {
        let saved = theme::load(&self.storage);
        theme::apply(&self.storage, &mut self.surface, saved);
        self.check_auth().await;
    }

    pub fn toggle_theme(&mut self) -> Theme {
        theme::toggle(&self.storage, &mut self.surface)
    }

    pub async fn check_auth(&mut self) {
        let state = session::check(&self.api, false).await;
        info!("Session: {:?}", state);
        if session::apply(&mut self.surface, &state) {
            self.enter_main(state != SessionState::Local).await;
        }
    }

    async fn enter_main(&mut self, logout: bool) {
        session::show_screen(&mut self.surface, true);
        self.surface.set_hidden(session::LOGOUT_BUTTON, !logout);
        self.load_links(0, false).await;
    }

    pub async fn on_telegram_auth(&mut self, payload: TelegramAuth) {
        match session::login(&self.api, &payload).await {
            Ok(()) => {
                session::show_user(&mut self.surface, payload.display_name());
                self.enter_main(true).await;
            }
            Err(e) => self.surface.alert(session::login_error(&e)),
        }
    }

    /// Logs out and returns the page to navigate to.
    pub async fn logout(&mut self) -> Option<&'static str> {
        match session::logout(&self.api).await {
            Ok(()) => Some(LOGOUT_TARGET),
            Err(e) => {
                debug!("Logout failed: {}", e);
                None
            }
        }
    }

    /// Loads one page. `append` keeps what is already listed.
    pub async fn load_links(&mut self, offset: usize, append: bool) {
        let path = format!("/links?limit={}&offset={}", PAGE_SIZE, offset);
        match self.api.get_json::<LinksResponse>(&path).await {
            Ok(page) => {
                debug!(
                    "Loaded {} links at offset {} of {}",
                    page.items.len(),
                    offset,
                    page.total
                );
                self.offset = offset;
                self.total = page.total;
                let received = page.items.len();
                if append {
                    self.items.extend(page.items);
                } else {
                    self.items = page.items;
                }
                self.render_list();
                self.surface
                    .set_hidden(SHOW_MORE, self.offset + received >= self.total);
            }
            Err(e) => {
                warn!("Links load failed: {}", e);
                self.surface.alert(request_failure_message(&e, LIST_FAILED));
            }
        }
    }

    pub async fn show_more(&mut self) {
        self.load_links(self.offset + PAGE_SIZE, true).await;
    }

    fn render_list(&mut self) {
        self.surface
            .set_html(LINKS_LIST, render::list(&self.items, &self.origin));
        self.surface.set_hidden(LINKS_EMPTY, !self.items.is_empty());
    }

    /// Uploads the chosen file and puts the new link first.
    pub async fn upload(&mut self, file: Option<SelectedFile>) {
        let Some(file) = file.filter(|f| is_uploadable_image(&f.mime)) else {
            self.surface.alert(PICK_IMAGE);
            return;
        };
        self.surface.set_disabled(UPLOAD_BUTTON, true);
        info!("Uploading {} ({} bytes)", file.name, file.len());
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime);
        let result = match part {
            Ok(part) => {
                self.api
                    .post_multipart::<LinkItem>("/links/upload", Form::new().part("file", part))
                    .await
            }
            Err(e) => Err(ApiError::from(e)),
        };
        match result {
            Ok(item) => {
                self.surface.set_attr(FILE_INPUT, "value", "");
                self.items.insert(0, item);
                self.total += 1;
                self.render_list();
            }
            Err(e) => {
                warn!("Upload failed: {}", e);
                self.surface.alert(upload_failure_message(&e));
            }
        }
        self.surface.set_disabled(UPLOAD_BUTTON, false);
    }

    /// The delete button of an item: remember it and ask for confirmation.
    pub fn request_delete(&mut self, id: &str) {
        self.delete_target = Some(id.to_string());
        popup::open(&mut self.surface, DELETE_POPUP);
    }

    pub fn cancel_delete(&mut self) {
        self.delete_target = None;
        popup::close(&mut self.surface, DELETE_POPUP);
    }

    pub async fn confirm_delete(&mut self) {
        let Some(id) = self.delete_target.take() else {
            return;
        };
        popup::close(&mut self.surface, DELETE_POPUP);
        let path = format!("/links/{}", urlencoding::encode(&id));
        match self.api.delete(&path).await {
            Ok(()) => {
                info!("Deleted link {}", id);
                self.items.retain(|item| item.id != id);
                self.total = self.total.saturating_sub(1);
                self.render_list();
                self.surface
                    .set_hidden(SHOW_MORE, self.items.len() >= self.total);
            }
            Err(e) => {
                warn!("Delete of {} failed: {}", id, e);
                self.surface.alert(request_failure_message(&e, DELETE_FAILED));
            }
        }
    }

    pub async fn copy_link(&self, index: usize) -> Option<&'static str> {
        let item = self.items.get(index)?;
        let url = render::full_url(item, &self.origin);
        Some(copy_with_feedback(self.clipboard.as_ref(), &url).await)
    }
}
