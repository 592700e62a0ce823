//! HTML fragments for the analytics pages.

use std::collections::BTreeMap;

use crate::core::html::truncate_chars;
use crate::core::models::{
    Funnel, GenerationItem, GenerationUser, Run, RunStatus, Service, Stats, StepStatus,
};

pub const NO_VALUE: &str = "—";
pub const NO_DESCRIPTION: &str = "Нет описания";
pub const NO_RUNS: &str = "Нет запусков";
pub const FUNNEL_DEFAULT: &str = "Данные воронки пока не собираются для этого канала.";
const TOPIC_MAX: usize = 60;
const POPUP_PROMPT_MAX: usize = 80;

/// Label and text shown in the error panel when a failure marker is activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTarget {
    pub label: String,
    pub message: String,
}

fn count_or_dash(v: Option<u64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| NO_VALUE.to_string())
}

/// Text for the four overview counters: total, completed, failed, today.
pub fn summary_counters(stats: &Stats) -> [(&'static str, String); 4] {
    [
        ("stat-total", count_or_dash(stats.total)),
        ("stat-completed", count_or_dash(stats.completed)),
        ("stat-failed", count_or_dash(stats.failed)),
        ("stat-today", count_or_dash(stats.today)),
    ]
}

/// The same counters as standalone cards, used on channel pages.
pub fn summary_cards(stats: &Stats) -> String {
    let cards = [
        ("Всего запусков", "text-white", stats.total),
        ("Успешных", "text-green-400", stats.completed),
        ("С ошибками", "text-red-400", stats.failed),
        ("Сегодня", "text-blue-400", stats.today),
    ];
    cards
        .iter()
        .map(|(title, color, value)| {
            format!(
                "<div class=\"card bg-gray-800 rounded-lg p-4 border border-gray-700\">\
                 <div class=\"text-gray-400 text-xs sm:text-sm uppercase tracking-wide\">{}</div>\
                 <div class=\"text-2xl font-bold {}\">{}</div></div>",
                title,
                color,
                count_or_dash(*value)
            )
        })
        .collect()
}

/// What the "show error" button of a run points at, if it gets one.
pub fn run_error(run: &Run) -> Option<ErrorTarget> {
    let failed_step = run.steps.iter().find(|s| {
        s.status == StepStatus::Failed
            && s.error_message
                .as_deref()
                .is_some_and(|m| !m.trim().is_empty())
    });
    if let Some(step) = failed_step {
        let label = match step.display_label() {
            "" => "Шаг",
            l => l,
        };
        return Some(ErrorTarget {
            label: label.to_string(),
            message: step.error_message.clone().unwrap_or_default(),
        });
    }
    if run.status == RunStatus::Failed {
        return Some(ErrorTarget {
            label: "Запуск".to_string(),
            message: "Запуск завершился с ошибкой (детали в шагах выше)".to_string(),
        });
    }
    None
}

#[derive(Debug, Default)]
pub struct RenderedRuns {
    pub html: String,
    /// Clickable failed steps, keyed by run id and step position.
    pub step_errors: BTreeMap<(i64, usize), ErrorTarget>,
    pub run_errors: BTreeMap<i64, ErrorTarget>,
}

fn status_badge(status: RunStatus) -> (&'static str, &'static str) {
    match status {
        RunStatus::Completed => ("bg-green-900/50 text-green-300", "успех"),
        RunStatus::Failed => ("bg-red-900/50 text-red-300", "ошибка"),
        RunStatus::Running => ("bg-gray-600 text-gray-300", "выполняется"),
        RunStatus::Unknown => ("bg-gray-600 text-gray-300", "ошибка"),
    }
}

pub fn runs(runs: &[Run]) -> RenderedRuns {
    let mut out = RenderedRuns::default();
    if runs.is_empty() {
        out.html = format!("<p class=\"text-gray-500 py-6 text-center\">{}</p>", NO_RUNS);
        return out;
    }
    for run in runs {
        let topic = truncate_chars(run.topic.as_deref().unwrap_or(""), TOPIC_MAX);
        let mut steps_html = String::new();
        for (idx, step) in run.steps.iter().enumerate() {
            let label = step.display_label();
            let message = step.error_message.as_deref().unwrap_or("");
            let clickable = step.status == StepStatus::Failed && !message.is_empty();
            let data_attrs = if clickable {
                let target = ErrorTarget {
                    label: if label.is_empty() { "Ошибка" } else { label }.to_string(),
                    message: message.to_string(),
                };
                out.step_errors.insert((run.id, idx), target);
                format!(
                    " data-error-label=\"{}\" data-error-message=\"{}\" data-step-index=\"{}\" \
                     role=\"button\" tabindex=\"0\" class=\"step-failed-clickable cursor-pointer\"",
                    html_escape::encode_double_quoted_attribute(label),
                    html_escape::encode_double_quoted_attribute(message),
                    idx
                )
            } else {
                String::new()
            };
            steps_html.push_str(&format!(
                "<span class=\"flex items-center gap-1\" title=\"{label_attr}\"{data_attrs}>\
                 <span class=\"step-dot {status}\" aria-label=\"{label_attr}: {status}\"></span>\
                 <span class=\"text-xs text-gray-500 truncate max-w-[80px] sm:max-w-[120px]\">{label_html}</span></span>",
                label_attr = html_escape::encode_double_quoted_attribute(label),
                data_attrs = data_attrs,
                status = step.status.as_str(),
                label_html = html_escape::encode_text(label),
            ));
        }
        let error_button = match run_error(run) {
            Some(target) => {
                let html = format!(
                    "<button type=\"button\" class=\"run-show-error mt-2 px-3 py-1.5 rounded bg-red-900/50 \
                     text-red-300 text-sm hover:bg-red-800/50\" data-error-label=\"{}\" \
                     data-error-message=\"{}\">Показать ошибку</button>",
                    html_escape::encode_double_quoted_attribute(&target.label),
                    html_escape::encode_double_quoted_attribute(&target.message)
                );
                out.run_errors.insert(run.id, target);
                html
            }
            None => String::new(),
        };
        let (badge_class, badge_text) = status_badge(run.status);
        out.html.push_str(&format!(
            "<div class=\"run-card bg-gray-800 rounded-lg p-4 border border-gray-700\" data-run-id=\"{id}\">\
             <div class=\"flex flex-wrap items-center gap-2 mb-2\">\
             <span class=\"font-semibold text-white\">Запуск #{id}</span>\
             <span class=\"text-xs px-2 py-0.5 rounded {badge_class}\">{badge_text}</span></div>\
             <p class=\"text-gray-400 text-sm mb-3\">{topic}</p>\
             <div class=\"flex flex-wrap gap-2 sm:gap-3 items-center\">{steps_html}</div>{error_button}</div>",
            id = run.id,
            badge_class = badge_class,
            badge_text = badge_text,
            topic = html_escape::encode_text(&topic),
            steps_html = steps_html,
            error_button = error_button,
        ));
    }
    out
}

/// Running services first, then local placeholders, then everything else.
pub fn order_services(services: &[Service]) -> Vec<Service> {
    let state = |s: &Service| s.active_state.clone().unwrap_or_default();
    let mut ordered: Vec<Service> = services
        .iter()
        .filter(|s| state(s) == "active")
        .cloned()
        .collect();
    ordered.extend(services.iter().filter(|s| state(s) == "n/a").cloned());
    ordered.extend(
        services
            .iter()
            .filter(|s| {
                let st = state(s);
                st != "active" && st != "n/a"
            })
            .cloned(),
    );
    ordered
}

pub fn service_state_text(service: &Service) -> String {
    let active = service.active_state.as_deref().unwrap_or("");
    let sub = service.sub_state.as_deref().filter(|s| !s.is_empty());
    let raw = if active.eq_ignore_ascii_case("active") {
        sub.unwrap_or("работает").to_string()
    } else if active == "n/a" {
        sub.unwrap_or("локальный режим").to_string()
    } else if active.is_empty() {
        "остановлен".to_string()
    } else {
        active.to_string()
    };
    if raw == "running" {
        "работает".to_string()
    } else {
        raw
    }
}

pub fn services(services: &[Service]) -> String {
    services
        .iter()
        .map(|s| {
            let active = s.active_state.as_deref().unwrap_or("");
            let is_active = active.eq_ignore_ascii_case("active");
            let is_local = active == "n/a";
            let (bg, dot) = if is_active {
                (
                    "bg-gray-800 border-2 border-green-500",
                    "bg-green-500 shadow-sm shadow-green-500/50",
                )
            } else if is_local {
                ("bg-gray-800 border border-gray-600", "bg-gray-500")
            } else {
                ("bg-gray-800 border-2 border-red-500", "bg-red-500")
            };
            let pid = match s.pid.as_deref() {
                Some(p) if !p.is_empty() && p != "0" => format!(" · PID {}", html_escape::encode_text(p)),
                _ => String::new(),
            };
            let desc = s.description.as_deref().unwrap_or("").trim();
            let desc_html = if desc.is_empty() {
                String::new()
            } else {
                format!(
                    "<p class=\"text-sm text-gray-400 mt-1 mb-2\">{}</p>",
                    html_escape::encode_text(desc)
                )
            };
            let label = s.label.as_deref().filter(|l| !l.is_empty()).unwrap_or(&s.unit);
            format!(
                "<div class=\"rounded-lg p-4 border {bg}\"><div class=\"flex items-center gap-2 mb-1\">\
                 <span class=\"w-2 h-2 rounded-full {dot}\"></span>\
                 <span class=\"font-medium text-white\">{label}</span></div>{desc}\
                 <div class=\"text-sm text-gray-400\">{state}{pid}</div>\
                 <div class=\"text-xs text-gray-500 mt-1\">{unit}</div></div>",
                bg = bg,
                dot = dot,
                label = html_escape::encode_text(label),
                desc = desc_html,
                state = html_escape::encode_text(&service_state_text(s)),
                pid = pid,
                unit = html_escape::encode_text(&s.unit),
            )
        })
        .collect()
}

pub enum FunnelView {
    Html(String),
    Text(String),
}

pub fn funnel(funnel: &Funnel) -> FunnelView {
    if funnel.stages.is_empty() {
        let note = funnel
            .note
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| FUNNEL_DEFAULT.to_string());
        return FunnelView::Text(note);
    }
    FunnelView::Html(
        funnel
            .stages
            .iter()
            .map(|stage| {
                let name = stage
                    .name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .or(stage.label.as_deref())
                    .unwrap_or("");
                let value = match &stage.value {
                    None | Some(serde_json::Value::Null) => NO_VALUE.to_string(),
                    Some(serde_json::Value::String(s)) => html_escape::encode_text(s).into_owned(),
                    Some(other) => other.to_string(),
                };
                format!("<div>{}: {}</div>", html_escape::encode_text(name), value)
            })
            .collect(),
    )
}

pub fn generation_users(users: &[GenerationUser]) -> String {
    if users.is_empty() {
        return "<p class=\"text-gray-500\">Нет данных</p>".to_string();
    }
    users
        .iter()
        .map(|u| {
            format!(
                "<div class=\"gen-user-row flex items-center justify-between py-2 px-3 rounded-lg bg-gray-800 \
                 border border-gray-700 cursor-pointer hover:bg-gray-700\" data-tid=\"{}\" data-name=\"{}\">\
                 <span class=\"text-white font-medium\">{}</span><span class=\"text-gray-400\">{}</span></div>",
                html_escape::encode_double_quoted_attribute(&u.telegram_id),
                html_escape::encode_double_quoted_attribute(u.name.as_deref().unwrap_or("")),
                html_escape::encode_text(&u.display_name()),
                u.count
            )
        })
        .collect()
}

/// `Name (ID 42)`, or just `ID 42` without a name.
pub fn user_popup_title(telegram_id: &str, name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        format!("ID {}", telegram_id)
    } else {
        format!("{} (ID {})", name, telegram_id)
    }
}

pub fn popup_message(text: &str) -> String {
    format!(
        "<p class=\"text-gray-500 col-span-full\">{}</p>",
        html_escape::encode_text(text)
    )
}

pub fn generation_image_items(items: &[GenerationItem]) -> String {
    if items.is_empty() {
        return popup_message("Нет генераций");
    }
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let prompt = item.prompt.as_deref().unwrap_or("");
            format!(
                "<div class=\"bg-gray-900 rounded-lg p-3 border border-gray-700\">\
                 <img src=\"{img}\" alt=\"\" class=\"w-full h-32 object-cover rounded mb-2\" loading=\"lazy\" />\
                 <p class=\"text-gray-400 text-xs mb-1\">{date}</p>\
                 <p class=\"text-gray-300 text-sm truncate mb-2\" title=\"{prompt_attr}\">{prompt_short}</p>\
                 <div class=\"flex gap-2\"><button type=\"button\" class=\"gen-copy-prompt px-2 py-1 rounded \
                 bg-gray-700 text-gray-300 text-xs hover:bg-gray-600\" data-index=\"{idx}\" data-prompt=\"{prompt_attr}\">\
                 Скопировать промпт</button><a href=\"{download}\" target=\"_blank\" rel=\"noopener\" \
                 class=\"px-2 py-1 rounded bg-gray-700 text-gray-300 text-xs hover:bg-gray-600\">Скачать</a></div></div>",
                img = html_escape::encode_double_quoted_attribute(item.image_proxy_url.as_deref().unwrap_or("")),
                date = html_escape::encode_text(item.date.as_deref().unwrap_or("")),
                prompt_attr = html_escape::encode_double_quoted_attribute(prompt),
                prompt_short = html_escape::encode_text(&truncate_chars(prompt, POPUP_PROMPT_MAX)),
                idx = idx,
                download = html_escape::encode_double_quoted_attribute(item.download_url.as_deref().unwrap_or("")),
            )
        })
        .collect()
}

pub fn generation_link_items(items: &[GenerationItem]) -> String {
    if items.is_empty() {
        return popup_message("Нет ссылок");
    }
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let url = item.full_url.as_deref().unwrap_or("");
            format!(
                "<div class=\"bg-gray-900 rounded-lg p-3 border border-gray-700\">\
                 <img src=\"{url}\" alt=\"\" class=\"w-full h-32 object-cover rounded mb-2\" loading=\"lazy\" />\
                 <p class=\"text-gray-400 text-xs mb-2\">{date}</p>\
                 <button type=\"button\" class=\"gen-copy-link w-full px-2 py-1 rounded bg-gray-700 text-gray-300 \
                 text-xs hover:bg-gray-600\" data-index=\"{idx}\" data-url=\"{url}\">Скопировать ссылку</button></div>",
                url = html_escape::encode_double_quoted_attribute(url),
                date = html_escape::encode_text(item.date.as_deref().unwrap_or("")),
                idx = idx,
            )
        })
        .collect()
}
