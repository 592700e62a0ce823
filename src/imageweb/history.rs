use tracing::warn;

use crate::core::api::ApiClient;
use crate::core::clipboard::{Clipboard, copy_with_feedback};
use crate::core::html::shorten;
use crate::core::models::{HistoryItem, ItemsResponse};
use crate::core::popup;
use crate::core::surface::Surface;

pub const HISTORY_POPUP: &str = "history-popup";
pub const HISTORY_LIST: &str = "history-list";
pub const HISTORY_EMPTY: &str = "history-empty";
pub const HISTORY_FAILED: &str = "Не удалось загрузить историю";
const PROMPT_MAX: usize = 60;
const PROMPT_KEEP: usize = 57;

pub fn render_items(items: &[HistoryItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let prompt = item.prompt.as_deref().unwrap_or("").trim();
            let short = html_escape::encode_double_quoted_attribute(&shorten(prompt, PROMPT_MAX, PROMPT_KEEP))
                .into_owned();
            let prompt_html = if short.is_empty() {
                String::new()
            } else {
                format!(
                    "<p class=\"history-item-prompt text-sm mt-0.5 truncate\" title=\"{0}\">{0}</p>",
                    short
                )
            };
            let copy_html = if prompt.is_empty() {
                String::new()
            } else {
                format!(
                    "<button type=\"button\" class=\"history-copy-prompt-btn\" data-index=\"{}\" \
                     title=\"Скопировать промпт\">Скопировать промпт</button>",
                    idx
                )
            };
            let name = item.name.as_deref().filter(|n| !n.is_empty());
            format!(
                "<div class=\"history-item\"><img src=\"{url}\" alt=\"\" />\
                 <div class=\"history-item-info flex-1 min-w-0\">\
                 <span class=\"text-gray-400 text-sm truncate block\">{label}</span>{prompt}</div>\
                 <div class=\"history-item-actions flex items-center gap-2\">{copy}\
                 <a href=\"{url}\" download=\"{file}\" class=\"download-btn\">Скачать</a></div></div>",
                url = html_escape::encode_double_quoted_attribute(&item.url),
                label = html_escape::encode_text(name.unwrap_or(&item.id)),
                prompt = prompt_html,
                copy = copy_html,
                file = html_escape::encode_double_quoted_attribute(name.unwrap_or("image.png")),
            )
        })
        .collect()
}

/// The history popup and the items it currently lists.
#[derive(Debug, Default)]
pub struct HistoryPopup {
    items: Vec<HistoryItem>,
}

impl HistoryPopup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub async fn open(&mut self, api: &ApiClient, surface: &mut Surface) {
        popup::open(surface, HISTORY_POPUP);
        match api.get_json::<ItemsResponse<HistoryItem>>("/history").await {
            Ok(data) => {
                surface.hide(HISTORY_EMPTY);
                surface.set_html(HISTORY_LIST, render_items(&data.items));
                surface.set_hidden(HISTORY_EMPTY, !data.items.is_empty());
                self.items = data.items;
            }
            Err(e) => {
                warn!("History load failed: {}", e);
                surface.set_text(HISTORY_EMPTY, HISTORY_FAILED);
                surface.show(HISTORY_EMPTY);
            }
        }
    }

    pub fn close(&self, surface: &mut Surface) {
        popup::close(surface, HISTORY_POPUP);
    }

    /// A click whose target is the backdrop itself closes the popup.
    pub fn backdrop_click(&self, surface: &mut Surface, target_id: &str) -> bool {
        if target_id == HISTORY_POPUP {
            self.close(surface);
            true
        } else {
            false
        }
    }

    /// Copies the full, untruncated prompt of an item.
    pub async fn copy_prompt(&self, index: usize, clipboard: &dyn Clipboard) -> Option<&'static str> {
        let prompt = self.items.get(index)?.prompt.as_deref()?.trim();
        if prompt.is_empty() {
            return None;
        }
        Some(copy_with_feedback(clipboard, prompt).await)
    }
}
