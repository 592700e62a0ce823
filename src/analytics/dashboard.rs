use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::charts::{ChartBackend, ChartSlot, timeline_options};
use super::expandable::ExpandableList;
use super::project::{Project, with_project_param};
use super::render::{self, ErrorTarget, FunnelView, NO_DESCRIPTION, NO_VALUE};
use super::router::{Channel, PAGE_IDS, Route, ViewRouter};
use crate::core::api::{ApiClient, ApiError};
use crate::core::clipboard::{Clipboard, copy_with_feedback};
use crate::core::config::DashboardConfig;
use crate::core::models::{
    Funnel, GenerationItem, GenerationSummary, GenerationUser, ItemsResponse, Run, Service,
    ServicesResponse, Stats, TimelinePoint,
};
use crate::core::popup::{self, Dropdown};
use crate::core::storage::Storage;
use crate::core::surface::Surface;

pub const INITIAL_RUNS_VISIBLE: usize = 3;
pub const INITIAL_SERVICES_VISIBLE: usize = 10;
pub const DEFAULT_TIMELINE_DAYS: u32 = 30;
const RUNS_LIMIT: u32 = 50;

pub const LOADING_TEXT: &str = "Загрузка…";
pub const COPY_LABEL: &str = "Скопировать";
const SERVICES_EMPTY: &str = "Нет данных о сервисах (только на Linux-сервере)";
const SERVICES_FAILED: &str = "Не удалось загрузить сервисы";

pub const ERROR_PANEL: &str = "error-panel";
pub const PROJECT_DROPDOWN: Dropdown = Dropdown {
    menu: "project-dropdown",
    trigger: "project-trigger",
};

/// Elements that start out hidden on the analytics page.
const INITIALLY_HIDDEN: &[&str] = &[
    "page-channel",
    "page-generation",
    "runs-more-wrap",
    "services-more-wrap",
    "services-note",
    ERROR_PANEL,
    "gen-user-popup",
    "gen-links-user-popup",
    "gen-content-links",
    "gen-chart-empty",
    "gen-links-chart-empty",
    "project-dropdown",
];

/// Which half of the generation page is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenPill {
    #[default]
    Images,
    Links,
}

impl GenPill {
    fn summary_path(self) -> &'static str {
        match self {
            GenPill::Images => "/generation/images/summary",
            GenPill::Links => "/generation/links/summary",
        }
    }

    fn user_path(self, telegram_id: &str) -> String {
        let kind = match self {
            GenPill::Images => "images",
            GenPill::Links => "links",
        };
        format!(
            "/generation/{}/user/{}",
            kind,
            urlencoding::encode(telegram_id)
        )
    }

    fn total_id(self) -> &'static str {
        match self {
            GenPill::Images => "gen-stat-total",
            GenPill::Links => "gen-links-stat-total",
        }
    }

    fn users_id(self) -> &'static str {
        match self {
            GenPill::Images => "gen-users-list",
            GenPill::Links => "gen-links-users-list",
        }
    }

    fn chart_empty_id(self) -> &'static str {
        match self {
            GenPill::Images => "gen-chart-empty",
            GenPill::Links => "gen-links-chart-empty",
        }
    }

    fn series_name(self) -> &'static str {
        match self {
            GenPill::Images => "Генераций",
            GenPill::Links => "Ссылок",
        }
    }

    pub fn popup_id(self) -> &'static str {
        match self {
            GenPill::Images => "gen-user-popup",
            GenPill::Links => "gen-links-user-popup",
        }
    }

    fn popup_title_id(self) -> &'static str {
        match self {
            GenPill::Images => "gen-user-popup-title",
            GenPill::Links => "gen-links-user-popup-title",
        }
    }

    fn popup_list_id(self) -> &'static str {
        match self {
            GenPill::Images => "gen-user-popup-list",
            GenPill::Links => "gen-links-user-popup-list",
        }
    }
}

/// Controller for the analytics page.
///
/// Owns the view state that used to live in page globals: current project and channel, the
/// loaded runs and services, live chart instances and the targets behind every generated
/// control. Each loader re-renders its part of the [`Surface`] and replaces the matching targets.
pub struct AnalyticsDashboard {
    api: ApiClient,
    storage: Storage,
    charts: Box<dyn ChartBackend>,
    clipboard: Arc<dyn Clipboard>,
    surface: Surface,
    router: ViewRouter,
    runs: ExpandableList<Run>,
    services: ExpandableList<Service>,
    step_errors: BTreeMap<(i64, usize), ErrorTarget>,
    run_errors: BTreeMap<i64, ErrorTarget>,
    timeline: ChartSlot,
    channel_timeline: ChartSlot,
    gen_chart: ChartSlot,
    gen_links_chart: ChartSlot,
    gen_pill: GenPill,
    gen_users: Vec<GenerationUser>,
    popup_items: Vec<GenerationItem>,
}

impl AnalyticsDashboard {
    /// Builds the controller and restores the saved project, falling back to `default_project`.
    pub fn new(
        api: ApiClient,
        storage: Storage,
        charts: Box<dyn ChartBackend>,
        clipboard: Arc<dyn Clipboard>,
        default_project: Project,
    ) -> Self {
        let project = Project::restore(&storage, default_project);
        let mut surface = Surface::with_hidden(INITIALLY_HIDDEN);
        surface.set_text("project-trigger-label", project.label());
        surface.set_text("error-panel-copy", COPY_LABEL);
        Self {
            api,
            storage,
            charts,
            clipboard,
            surface,
            router: ViewRouter::new(project),
            runs: ExpandableList::new(INITIAL_RUNS_VISIBLE),
            services: ExpandableList::new(INITIAL_SERVICES_VISIBLE),
            step_errors: BTreeMap::new(),
            run_errors: BTreeMap::new(),
            timeline: ChartSlot::new("timeline-chart"),
            channel_timeline: ChartSlot::new("channel-timeline-chart"),
            gen_chart: ChartSlot::new("gen-chart"),
            gen_links_chart: ChartSlot::new("gen-links-chart"),
            gen_pill: GenPill::Images,
            gen_users: Vec::new(),
            popup_items: Vec::new(),
        }
    }

    /// Client, storage and default project from the loaded configuration.
    pub fn from_config(
        config: &DashboardConfig,
        charts: Box<dyn ChartBackend>,
        clipboard: Arc<dyn Clipboard>,
    ) -> anyhow::Result<Self> {
        let api = ApiClient::from_config(config)?;
        let storage = config.open_storage()?;
        let project = Project::parse(&config.default_project).unwrap_or_default();
        Ok(Self::new(api, storage, charts, clipboard, project))
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    pub fn project(&self) -> Project {
        self.router.project()
    }

    pub fn gen_pill(&self) -> GenPill {
        self.gen_pill
    }

    pub fn runs(&self) -> &ExpandableList<Run> {
        &self.runs
    }

    pub fn services(&self) -> &ExpandableList<Service> {
        &self.services
    }

    /// Failed steps that currently render as clickable, keyed by run id and step index.
    pub fn step_errors(&self) -> &BTreeMap<(i64, usize), ErrorTarget> {
        &self.step_errors
    }

    pub fn run_errors(&self) -> &BTreeMap<i64, ErrorTarget> {
        &self.run_errors
    }

    /// Initial render: overview of the restored project.
    pub async fn start(&mut self) {
        info!("Analytics dashboard starting for {}", self.project().key());
        self.set_channel(Channel::Main).await;
    }

    pub async fn set_channel(&mut self, channel: Channel) {
        let route = self.router.select(channel);
        self.show_route(route).await;
    }

    pub async fn switch_project(&mut self, project: Project) {
        info!("Switching project to {}", project.key());
        project.save(&self.storage);
        self.surface.set_text("project-trigger-label", project.label());
        PROJECT_DROPDOWN.close(&mut self.surface);
        let route = self.router.switch_project(project);
        self.show_route(route).await;
    }

    pub fn toggle_project_dropdown(&mut self) {
        PROJECT_DROPDOWN.toggle(&mut self.surface);
    }

    /// Any click outside the switcher closes the menu.
    pub fn close_project_dropdown(&mut self) {
        PROJECT_DROPDOWN.close(&mut self.surface);
    }

    fn apply_nav(&mut self) {
        for item in self.router.nav_items() {
            let id = match item.channel.key() {
                "" => "nav-main".to_string(),
                key => format!("nav-{}", key),
            };
            self.surface.set_hidden(&id, item.hidden);
            self.surface
                .set_attr(&id, "aria-current", if item.active { "page" } else { "false" });
        }
    }

    async fn show_route(&mut self, route: Route) {
        self.apply_nav();
        for id in PAGE_IDS {
            self.surface.set_hidden(id, id != route.page_id());
        }
        match route {
            Route::Main => self.load_main().await,
            Route::Channel(channel) => {
                self.surface.set_text("channel-title", channel.title());
                self.load_channel(&channel).await;
            }
            Route::Generation => self.load_generation().await,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let project = self.router.project();
        self.api
            .get_scoped_json(&with_project_param(path, project), project.key())
            .await
    }

    /// Overview: counters, 30-day timeline and recent runs in parallel, then services.
    pub async fn load_main(&mut self) {
        for (id, _) in render::summary_counters(&Stats::default()) {
            self.surface.set_text(id, NO_VALUE);
        }
        self.surface.set_text("runs-loading", LOADING_TEXT);
        self.surface.show("runs-loading");
        self.surface.set_html("runs-items", "");

        let timeline_path = format!("/stats/timeline?days={}", DEFAULT_TIMELINE_DAYS);
        let runs_path = format!("/runs?limit={}", RUNS_LIMIT);
        let loaded = tokio::try_join!(
            self.fetch::<Stats>("/stats"),
            self.fetch::<Vec<Run>>(&runs_path),
            self.fetch::<Vec<TimelinePoint>>(&timeline_path),
        );
        match loaded {
            Ok((stats, runs, timeline)) => {
                debug!("Loaded {} runs", runs.len());
                for (id, value) in render::summary_counters(&stats) {
                    self.surface.set_text(id, value);
                }
                self.timeline.replace(
                    self.charts.as_mut(),
                    timeline_options(&timeline, "Запусков"),
                );
                self.runs.reset(runs);
                self.render_runs();
            }
            Err(e) => {
                warn!("Overview load failed: {}", e);
                self.surface
                    .set_text("runs-loading", format!("Ошибка загрузки: {}", e));
                self.surface.show("runs-loading");
            }
        }
        self.load_services().await;
    }

    fn render_runs(&mut self) {
        self.surface.hide("runs-loading");
        if self.runs.items().is_empty() {
            self.surface.set_html("runs-items", render::runs(&[]).html);
            self.surface.hide("runs-more-wrap");
            self.step_errors.clear();
            self.run_errors.clear();
            return;
        }
        self.surface
            .set_hidden("runs-more-wrap", !self.runs.has_more());
        self.surface
            .set_text("btn-runs-more", self.runs.toggle_label());
        let rendered = render::runs(self.runs.visible_items());
        self.surface.set_html("runs-items", rendered.html);
        self.step_errors = rendered.step_errors;
        self.run_errors = rendered.run_errors;
    }

    pub fn toggle_runs(&mut self) {
        self.runs.toggle();
        self.render_runs();
    }

    pub async fn load_services(&mut self) {
        match self.fetch::<ServicesResponse>("/server-services").await {
            Ok(data) => {
                self.services.reset(render::order_services(&data.services));
                self.render_services();
                let note = data.note.unwrap_or_default();
                self.surface.set_hidden("services-note", note.is_empty());
                self.surface.set_text("services-note", note);
            }
            Err(e) => {
                warn!("Services load failed: {}", e);
                self.surface.hide("services-loading");
                self.surface.set_html(
                    "services-items",
                    format!("<p class=\"text-gray-500 col-span-full\">{}</p>", SERVICES_FAILED),
                );
            }
        }
    }

    fn render_services(&mut self) {
        self.surface.hide("services-loading");
        if self.services.items().is_empty() {
            self.surface.set_html(
                "services-items",
                format!("<p class=\"text-gray-500 col-span-full\">{}</p>", SERVICES_EMPTY),
            );
            self.surface.hide("services-more-wrap");
            return;
        }
        self.surface
            .set_hidden("services-more-wrap", !self.services.has_more());
        self.surface
            .set_text("btn-services-more", self.services.toggle_label());
        self.surface
            .set_html("services-items", render::services(self.services.visible_items()));
    }

    pub fn toggle_services(&mut self) {
        self.services.toggle();
        self.render_services();
    }

    /// Channel page. The three calls run one after another.
    pub async fn load_channel(&mut self, channel: &Channel) {
        let key = urlencoding::encode(channel.key()).into_owned();
        let stats_path = if key.is_empty() {
            "/stats".to_string()
        } else {
            format!("/stats?channel={}", key)
        };
        let timeline_path = format!(
            "/stats/timeline?days={}&channel={}",
            DEFAULT_TIMELINE_DAYS, key
        );
        let funnel_path = format!("/stats/funnel?channel={}", key);

        let loaded = async {
            let stats = self.fetch::<Stats>(&stats_path).await?;
            let timeline = self.fetch::<Vec<TimelinePoint>>(&timeline_path).await?;
            let funnel = self.fetch::<Funnel>(&funnel_path).await?;
            Ok::<_, ApiError>((stats, timeline, funnel))
        }
        .await;

        match loaded {
            Ok((stats, timeline, funnel)) => {
                self.surface
                    .set_html("channel-summary", render::summary_cards(&stats));
                self.channel_timeline.replace(
                    self.charts.as_mut(),
                    timeline_options(&timeline, "Запусков"),
                );
                match render::funnel(&funnel) {
                    FunnelView::Html(html) => self.surface.set_html("channel-funnel-content", html),
                    FunnelView::Text(text) => self.surface.set_text("channel-funnel-content", text),
                }
            }
            Err(e) => {
                warn!("Channel {} load failed: {}", channel.key(), e);
                self.surface
                    .set_text("channel-funnel-content", format!("Ошибка загрузки: {}", e));
            }
        }
    }

    /// Range buttons above the overview chart.
    pub async fn load_timeline(&mut self, days: u32) {
        let path = format!("/stats/timeline?days={}", days);
        match self.fetch::<Vec<TimelinePoint>>(&path).await {
            Ok(points) => {
                self.timeline
                    .replace(self.charts.as_mut(), timeline_options(&points, "Запусков"));
            }
            Err(e) => warn!("Timeline reload failed: {}", e),
        }
    }

    /// Range buttons on a channel page. Ignored while no channel is shown.
    pub async fn load_channel_timeline(&mut self, days: u32) {
        let channel = match self.router.route() {
            Route::Channel(channel) => channel,
            _ => return,
        };
        let path = format!(
            "/stats/timeline?days={}&channel={}",
            days,
            urlencoding::encode(channel.key())
        );
        match self.fetch::<Vec<TimelinePoint>>(&path).await {
            Ok(points) => {
                self.channel_timeline
                    .replace(self.charts.as_mut(), timeline_options(&points, "Запусков"));
            }
            Err(e) => warn!("Channel timeline reload failed: {}", e),
        }
    }

    pub fn open_error_panel(&mut self, label: &str, message: &str) {
        let message = if message.is_empty() {
            NO_DESCRIPTION
        } else {
            message
        };
        self.surface.set_text("error-panel-label", label);
        self.surface.set_text("error-panel-message", message);
        popup::open(&mut self.surface, ERROR_PANEL);
    }

    pub fn close_error_panel(&mut self) {
        popup::close(&mut self.surface, ERROR_PANEL);
    }

    /// Click or Enter on a failed step. Returns false when that step is not clickable.
    pub fn activate_step_error(&mut self, run_id: i64, step_index: usize) -> bool {
        match self.step_errors.get(&(run_id, step_index)).cloned() {
            Some(target) => {
                self.open_error_panel(&target.label, &target.message);
                true
            }
            None => false,
        }
    }

    /// The "Показать ошибку" button of a run card.
    pub fn activate_run_error(&mut self, run_id: i64) -> bool {
        match self.run_errors.get(&run_id).cloned() {
            Some(target) => {
                self.open_error_panel(&target.label, &target.message);
                true
            }
            None => false,
        }
    }

    /// Copies the panel's message. The button shows the returned label until
    /// [`Self::reset_error_copy_label`] runs after the feedback delay.
    pub async fn copy_error(&mut self) -> &'static str {
        let text = self.surface.text("error-panel-message").to_string();
        let label = copy_with_feedback(self.clipboard.as_ref(), &text).await;
        self.surface.set_text("error-panel-copy", label);
        label
    }

    pub fn reset_error_copy_label(&mut self) {
        self.surface.set_text("error-panel-copy", COPY_LABEL);
    }

    pub async fn select_gen_pill(&mut self, pill: GenPill) {
        self.gen_pill = pill;
        let (active, inactive) = match pill {
            GenPill::Images => (("gen-pill-images", "gen-content-images"), ("gen-pill-links", "gen-content-links")),
            GenPill::Links => (("gen-pill-links", "gen-content-links"), ("gen-pill-images", "gen-content-images")),
        };
        self.surface.set_attr(active.0, "aria-pressed", "true");
        self.surface.set_attr(inactive.0, "aria-pressed", "false");
        self.surface.show(active.1);
        self.surface.hide(inactive.1);
        self.load_generation().await;
    }

    /// Generation statistics for the current pill. These endpoints are not project scoped.
    pub async fn load_generation(&mut self) {
        let pill = self.gen_pill;
        self.surface.set_text(pill.total_id(), NO_VALUE);
        self.surface.set_html(
            pill.users_id(),
            format!("<p class=\"text-gray-500\">{}</p>", LOADING_TEXT),
        );
        match self.api.get_json::<GenerationSummary>(pill.summary_path()).await {
            Ok(summary) => {
                self.surface.set_text(pill.total_id(), summary.total.to_string());
                self.render_gen_chart(pill, &summary);
                self.surface
                    .set_html(pill.users_id(), render::generation_users(&summary.users));
                self.gen_users = summary.users;
            }
            Err(e) => {
                warn!("Generation summary failed: {}", e);
                self.gen_users.clear();
                self.surface.set_html(
                    pill.users_id(),
                    format!(
                        "<p class=\"text-gray-500\">Ошибка: {}</p>",
                        html_escape::encode_text(&e.to_string())
                    ),
                );
            }
        }
    }

    fn render_gen_chart(&mut self, pill: GenPill, summary: &GenerationSummary) {
        let slot = match pill {
            GenPill::Images => &mut self.gen_chart,
            GenPill::Links => &mut self.gen_links_chart,
        };
        slot.dispose(self.charts.as_mut());
        // The backend sends newest days first.
        let by_day: Vec<TimelinePoint> = summary.by_day.iter().rev().cloned().collect();
        if by_day.is_empty() {
            self.surface.show(pill.chart_empty_id());
            self.surface.set_html(slot.target(), "");
            return;
        }
        self.surface.hide(pill.chart_empty_id());
        slot.replace(
            self.charts.as_mut(),
            timeline_options(&by_day, pill.series_name()),
        );
    }

    /// Opens the per-user popup of the current pill and loads that user's items.
    pub async fn open_user_popup(&mut self, telegram_id: &str) {
        let pill = self.gen_pill;
        let name = self
            .gen_users
            .iter()
            .find(|u| u.telegram_id == telegram_id)
            .and_then(|u| u.name.clone())
            .unwrap_or_default();
        self.surface.set_text(
            pill.popup_title_id(),
            render::user_popup_title(telegram_id, &name),
        );
        popup::open(&mut self.surface, pill.popup_id());
        self.surface
            .set_html(pill.popup_list_id(), render::popup_message(LOADING_TEXT));
        self.popup_items.clear();

        let loaded = self
            .api
            .get_json::<ItemsResponse<GenerationItem>>(&pill.user_path(telegram_id))
            .await;
        match loaded {
            Ok(data) => {
                let html = match pill {
                    GenPill::Images => render::generation_image_items(&data.items),
                    GenPill::Links => render::generation_link_items(&data.items),
                };
                self.surface.set_html(pill.popup_list_id(), html);
                self.popup_items = data.items;
            }
            Err(e) => {
                warn!("User {} items failed: {}", telegram_id, e);
                self.surface.set_html(
                    pill.popup_list_id(),
                    render::popup_message(&format!("Ошибка: {}", e)),
                );
            }
        }
    }

    pub fn close_user_popup(&mut self, pill: GenPill) {
        popup::close(&mut self.surface, pill.popup_id());
    }

    pub fn popup_items(&self) -> &[GenerationItem] {
        &self.popup_items
    }

    /// Copies the prompt (images) or link (links) of a popup item.
    pub async fn copy_popup_item(&self, index: usize) -> Option<&'static str> {
        let item = self.popup_items.get(index)?;
        let text = match self.gen_pill {
            GenPill::Images => item.prompt.as_deref().unwrap_or(""),
            GenPill::Links => item.full_url.as_deref().unwrap_or(""),
        };
        Some(copy_with_feedback(self.clipboard.as_ref(), text).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::charts::RecordingCharts;
    use crate::core::clipboard::{COPIED_LABEL, COPY_FAILED_LABEL, MemoryClipboard};
    use crate::core::storage::MemoryStore;

    fn dashboard(clipboard: MemoryClipboard) -> AnalyticsDashboard {
        AnalyticsDashboard::new(
            ApiClient::new("http://127.0.0.1:9/api"),
            Arc::new(MemoryStore::new()),
            Box::new(RecordingCharts::new()),
            Arc::new(clipboard),
            Project::Flow,
        )
    }

    #[test]
    fn starts_with_overlays_hidden() {
        let d = dashboard(MemoryClipboard::new());
        assert!(!popup::is_open(d.surface(), ERROR_PANEL));
        assert!(d.surface().is_hidden("project-dropdown"));
        assert_eq!(d.surface().text("project-trigger-label"), "FLOW");
    }

    #[test]
    fn error_panel_defaults_message() {
        let mut d = dashboard(MemoryClipboard::new());
        d.open_error_panel("publish", "");
        assert!(popup::is_open(d.surface(), ERROR_PANEL));
        assert_eq!(d.surface().text("error-panel-message"), NO_DESCRIPTION);
        assert_eq!(d.surface().attr(ERROR_PANEL, "aria-hidden"), Some("false"));
        d.close_error_panel();
        assert!(!popup::is_open(d.surface(), ERROR_PANEL));
    }

    #[tokio::test]
    async fn copy_error_feedback() {
        let clipboard = MemoryClipboard::new();
        let mut d = dashboard(clipboard.clone());
        d.open_error_panel("publish", "timeout");
        assert_eq!(d.copy_error().await, COPIED_LABEL);
        assert_eq!(clipboard.last().as_deref(), Some("timeout"));
        assert_eq!(d.surface().text("error-panel-copy"), COPIED_LABEL);
        d.reset_error_copy_label();
        assert_eq!(d.surface().text("error-panel-copy"), COPY_LABEL);

        let mut d = dashboard(MemoryClipboard::refusing());
        d.open_error_panel("publish", "timeout");
        assert_eq!(d.copy_error().await, COPY_FAILED_LABEL);
    }

    #[test]
    fn dropdown_toggles() {
        let mut d = dashboard(MemoryClipboard::new());
        d.toggle_project_dropdown();
        assert!(!d.surface().is_hidden("project-dropdown"));
        assert_eq!(d.surface().attr("project-trigger", "aria-expanded"), Some("true"));
        d.close_project_dropdown();
        assert!(d.surface().is_hidden("project-dropdown"));
    }

    #[test]
    fn inactive_step_is_not_activatable() {
        let mut d = dashboard(MemoryClipboard::new());
        assert!(!d.activate_step_error(1, 0));
        assert!(!d.activate_run_error(1));
        assert!(!popup::is_open(d.surface(), ERROR_PANEL));
    }
}
