use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use super::draft::DraftStore;
use super::facts::FactsCarousel;
use super::files::SelectedFile;
use super::form::{self, GenerationForm};
use super::generate::{
    self, EMPTY_PROMPT, GenerationOutcome, IMPROVE_NEEDS_PROMPT, PendingGeneration, Ticket,
};
use super::history::HistoryPopup;
use super::refs::RowId;
use super::session::{self, SessionState, TelegramAuth};
use crate::core::api::ApiClient;
use crate::core::clipboard::Clipboard;
use crate::core::config::DashboardConfig;
use crate::core::storage::Storage;
use crate::core::surface::Surface;
use crate::core::theme::{self, Theme};

pub const IMPROVE_BUTTON: &str = "btn-improve-prompt";
pub const HISTORY_BUTTON: &str = "btn-history";
pub const NEW_GENERATION_BUTTON: &str = "btn-new-generation";
pub const LOADING_SECTION: &str = "loading-section";
pub const RESULT_SECTION: &str = "result-section";
pub const RESULT_PREVIEW: &str = "result-preview";
pub const DOWNLOAD_BUTTON: &str = "btn-download";

const INITIALLY_HIDDEN: &[&str] = &[
    session::SCREEN_MAIN,
    session::USER_NAME,
    session::LOGOUT_BUTTON,
    session::LOGIN_NO_BOT,
    HISTORY_BUTTON,
    NEW_GENERATION_BUTTON,
    form::IMPROVED_PANEL,
    form::ADD_REF_BUTTON,
    LOADING_SECTION,
    RESULT_SECTION,
    super::history::HISTORY_POPUP,
    super::history::HISTORY_EMPTY,
];

/// Controller for the image generation page.
pub struct ImageWebApp {
    api: ApiClient,
    storage: Storage,
    drafts: DraftStore,
    clipboard: Arc<dyn Clipboard>,
    surface: Surface,
    form: GenerationForm,
    facts: FactsCarousel,
    history: HistoryPopup,
    last_ticket: Ticket,
    current_result: Option<String>,
}

impl ImageWebApp {
    pub fn new(api: ApiClient, storage: Storage, clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            api,
            drafts: DraftStore::new(storage.clone()),
            storage,
            clipboard,
            surface: Surface::with_hidden(INITIALLY_HIDDEN),
            form: GenerationForm::new(),
            facts: FactsCarousel::new(),
            history: HistoryPopup::new(),
            last_ticket: Ticket(0),
            current_result: None,
        }
    }

    pub fn from_config(
        config: &DashboardConfig,
        clipboard: Arc<dyn Clipboard>,
    ) -> anyhow::Result<Self> {
        Ok(Self::new(
            ApiClient::from_config(config)?,
            config.open_storage()?,
            clipboard,
        ))
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn form(&self) -> &GenerationForm {
        &self.form
    }

    pub fn facts(&self) -> &FactsCarousel {
        &self.facts
    }

    pub fn history(&self) -> &HistoryPopup {
        &self.history
    }

    /// URL of the last successful generation.
    pub fn current_result(&self) -> Option<&str> {
        self.current_result.as_deref()
    }

    /// Applies the saved theme and checks the session.
    pub async fn start(&mut self) {
        let saved = theme::load(&self.storage);
        theme::apply(&self.storage, &mut self.surface, saved);
        self.check_auth().await;
    }

    pub fn toggle_theme(&mut self) -> Theme {
        theme::toggle(&self.storage, &mut self.surface)
    }

    pub async fn check_auth(&mut self) {
        let state = session::check(&self.api, true).await;
        info!("Session: {:?}", state);
        if session::apply(&mut self.surface, &state) {
            self.enter_main(state != SessionState::Local);
        }
    }

    pub async fn on_telegram_auth(&mut self, payload: TelegramAuth) {
        match session::login(&self.api, &payload).await {
            Ok(()) => {
                session::show_user(&mut self.surface, payload.display_name());
                self.enter_main(true);
            }
            Err(e) => self.surface.alert(session::login_error(&e)),
        }
    }

    pub async fn logout(&mut self) {
        if let Err(e) = session::logout(&self.api).await {
            debug!("Logout failed: {}", e);
            return;
        }
        self.surface.hide(session::USER_NAME);
        session::show_screen(&mut self.surface, false);
        self.surface.hide(HISTORY_BUTTON);
        self.surface.hide(session::LOGOUT_BUTTON);
        self.check_auth().await;
    }

    /// Main screen: header buttons and the restored draft. Local mode has nothing to log
    /// out of.
    fn enter_main(&mut self, logout: bool) {
        session::show_screen(&mut self.surface, true);
        self.surface.show(HISTORY_BUTTON);
        self.surface.show(NEW_GENERATION_BUTTON);
        self.surface.set_hidden(session::LOGOUT_BUTTON, !logout);
        self.restore_draft();
    }

    fn restore_draft(&mut self) {
        if let Some(draft) = self.drafts.load() {
            debug!("Restoring draft with {} references", draft.refs.len());
            self.form.apply_draft(&draft);
            self.form.improved_panel_visible = !draft.improved_prompt.is_empty();
        }
        self.form.render(&mut self.surface);
    }

    fn persist(&self) {
        self.drafts.persist(&self.form.to_draft());
    }

    pub fn set_prompt(&mut self, text: &str) {
        self.form.prompt = text.to_string();
        self.surface
            .set_attr(form::PROMPT_INPUT, "value", self.form.prompt.as_str());
        self.persist();
    }

    pub fn set_improved_prompt(&mut self, text: &str) {
        self.form.improved_prompt = text.to_string();
        self.surface
            .set_attr(form::IMPROVED_INPUT, "value", self.form.improved_prompt.as_str());
        self.persist();
    }

    pub fn set_use_improved(&mut self, use_improved: bool) {
        self.form.use_improved = use_improved;
        self.surface
            .set_attr(form::SOURCE_MINE, "checked", (!use_improved).to_string());
        self.surface
            .set_attr(form::SOURCE_IMPROVED, "checked", use_improved.to_string());
        self.persist();
    }

    pub fn set_format(&mut self, format: &str) {
        self.form.format = format.to_string();
        self.surface
            .set_attr(form::FORMAT_SELECT, "value", self.form.format.as_str());
        self.persist();
    }

    pub fn add_reference_row(&mut self) -> Option<RowId> {
        let row = self.form.refs.add_row();
        self.form.render_refs(&mut self.surface);
        row
    }

    /// Handles a file input change. Accepted images are read into data URLs before the
    /// draft is persisted again.
    pub async fn select_reference(&mut self, row: RowId, file: Option<SelectedFile>) {
        let pending = self.form.refs.select_file(row, file);
        self.form.render_refs(&mut self.surface);
        let Some(read) = pending else {
            self.persist();
            return;
        };
        match super::files::read_as_data_url(read.file).await {
            Ok(data_url) => {
                if self.form.refs.complete_read(read.row, read.seq, data_url) {
                    self.form.render_refs(&mut self.surface);
                    self.persist();
                }
            }
            Err(e) => {
                warn!("Reference read failed: {}", e);
                if self.form.refs.fail_read(read.row, read.seq) {
                    self.form.render_refs(&mut self.surface);
                    self.persist();
                    self.surface.alert(e.to_string());
                }
            }
        }
    }

    pub fn remove_reference(&mut self, row: RowId) {
        self.form.refs.remove(row);
        self.form.render_refs(&mut self.surface);
        self.persist();
    }

    pub async fn improve_prompt(&mut self) {
        let prompt = self.form.prompt.trim().to_string();
        if prompt.is_empty() {
            self.surface.alert(IMPROVE_NEEDS_PROMPT);
            return;
        }
        self.surface.set_disabled(IMPROVE_BUTTON, true);
        self.surface
            .set_attr(form::IMPROVED_INPUT, "value", super::LOADING_TEXT);
        self.form.improved_panel_visible = true;
        self.surface.show(form::IMPROVED_PANEL);

        match generate::improve_prompt(&self.api, &prompt).await {
            Ok(improved) => self.form.improved_prompt = improved,
            Err(e) => {
                self.form.improved_prompt.clear();
                self.surface.alert(generate::improve_failure_message(&e));
            }
        }
        self.surface.set_attr(
            form::IMPROVED_INPUT,
            "value",
            self.form.improved_prompt.as_str(),
        );
        self.surface.set_disabled(IMPROVE_BUTTON, false);
        self.persist();
    }

    /// Validates the form and snapshots the request. Shows the loading section and starts
    /// the facts carousel. Returns `None` after alerting when there is no prompt.
    pub fn begin_generation(&mut self, now: Instant) -> Option<PendingGeneration> {
        let prompt = self.form.effective_prompt();
        if prompt.is_empty() {
            self.surface.alert(EMPTY_PROMPT);
            return None;
        }
        self.last_ticket = Ticket(self.last_ticket.0 + 1);
        self.surface.show(LOADING_SECTION);
        self.surface.hide(RESULT_SECTION);
        self.facts.start(now, &mut self.surface);
        Some(PendingGeneration::new(
            self.last_ticket,
            self.api.clone(),
            prompt,
            self.form.to_draft().format,
            self.form.refs.sources(),
        ))
    }

    /// Renders a finished generation. Outcomes of superseded attempts are dropped and
    /// false is returned.
    pub fn finish_generation(&mut self, outcome: GenerationOutcome) -> bool {
        if outcome.ticket != self.last_ticket {
            debug!(
                "Dropping generation {:?}, latest is {:?}",
                outcome.ticket, self.last_ticket
            );
            return false;
        }
        self.surface.hide(LOADING_SECTION);
        self.facts.stop();
        match outcome.result {
            Ok(res) => {
                let millis = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or_default();
                self.surface.set_attr(
                    RESULT_PREVIEW,
                    "src",
                    format!("{}?t={}", res.image_url, millis),
                );
                self.surface
                    .set_attr(DOWNLOAD_BUTTON, "href", res.image_url.as_str());
                self.surface
                    .set_attr(DOWNLOAD_BUTTON, "download", res.download_name());
                self.surface.show(RESULT_SECTION);
                self.current_result = Some(res.image_url);
            }
            Err(message) => self.surface.alert(message),
        }
        true
    }

    pub async fn generate(&mut self) {
        if let Some(pending) = self.begin_generation(Instant::now()) {
            let outcome = pending.send().await;
            self.finish_generation(outcome);
        }
    }

    /// "Сделать заново" sends the current form again.
    pub async fn retry(&mut self) {
        self.generate().await;
    }

    /// Clears the form, the stored draft and the result area.
    pub fn new_generation(&mut self) {
        self.form.reset();
        self.form.render(&mut self.surface);
        self.drafts.reset();
        self.surface.hide(LOADING_SECTION);
        self.surface.hide(RESULT_SECTION);
    }

    pub fn fact_next(&mut self, now: Instant) {
        self.facts.next(now, &mut self.surface);
    }

    pub fn fact_prev(&mut self, now: Instant) {
        self.facts.prev(now, &mut self.surface);
    }

    pub fn tick_facts(&mut self, now: Instant) -> bool {
        self.facts.tick(now, &mut self.surface)
    }

    pub async fn open_history(&mut self) {
        self.history.open(&self.api, &mut self.surface).await;
    }

    pub fn close_history(&mut self) {
        self.history.close(&mut self.surface);
    }

    pub fn history_backdrop_click(&mut self, target_id: &str) -> bool {
        self.history.backdrop_click(&mut self.surface, target_id)
    }

    pub async fn copy_history_prompt(&self, index: usize) -> Option<&'static str> {
        self.history
            .copy_prompt(index, self.clipboard.as_ref())
            .await
    }
}
