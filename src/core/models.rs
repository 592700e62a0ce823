//! Wire shapes returned by the backend. All of them are read-only projections.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending | StepStatus::Unknown => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }
}

fn default_step_status() -> StepStatus {
    StepStatus::Pending
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_step_status")]
    pub status: StepStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Step {
    pub fn display_label(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: i64,
    pub status: RunStatus,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total: Option<u64>,
    pub completed: Option<u64>,
    pub failed: Option<u64>,
    pub today: Option<u64>,
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub day: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Funnel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub stages: Vec<FunnelStage>,
    #[serde(default)]
    pub note: Option<String>,
}

/// `pid` arrives as a string, a number or null depending on the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub unit: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub active_state: Option<String>,
    #[serde(default)]
    pub sub_state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pid: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicesResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub services: Vec<Service>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationUser {
    #[serde(deserialize_with = "id_string")]
    pub telegram_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub count: u64,
}

impl GenerationUser {
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("ID {}", self.telegram_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    #[serde(default)]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<GenerationUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub by_day: Vec<TimelinePoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub image_proxy_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub full_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ItemsResponse<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkItem {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub full_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinksResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<LinkItem>,
    #[serde(default)]
    pub total: usize,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_with_null_steps() {
        let run: Run = serde_json::from_value(json!({
            "id": 7, "status": "failed", "topic": null, "steps": null
        }))
        .unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.steps.is_empty());
    }

    #[test]
    fn unknown_statuses_do_not_fail_decoding() {
        let step: Step = serde_json::from_value(json!({"name": "publish", "status": "skipped"})).unwrap();
        assert_eq!(step.status, StepStatus::Unknown);
        assert_eq!(step.status.as_str(), "pending");
        assert_eq!(step.display_label(), "publish");
    }

    #[test]
    fn service_pid_accepts_numbers() {
        let svc: Service = serde_json::from_value(json!({"unit": "bot", "pid": 4242})).unwrap();
        assert_eq!(svc.pid.as_deref(), Some("4242"));
        let svc: Service = serde_json::from_value(json!({"unit": "bot", "pid": null})).unwrap();
        assert_eq!(svc.pid, None);
    }

    #[test]
    fn generation_summary_camel_case() {
        let s: GenerationSummary = serde_json::from_value(json!({
            "total": 3,
            "users": [{"telegramId": 123, "name": "", "count": 3}],
            "byDay": [{"day": "2026-10-01", "count": 3}]
        }))
        .unwrap();
        assert_eq!(s.users[0].telegram_id, "123");
        assert_eq!(s.users[0].display_name(), "ID 123");
        assert_eq!(s.by_day.len(), 1);
    }
}
