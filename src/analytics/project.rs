use tracing::debug;

use crate::core::storage::Storage;

pub const PROJECT_KEY: &str = "analytics_project";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Project {
    #[default]
    Flow,
    Fulfilment,
}

impl Project {
    /// Accepts both spellings of fulfilment; the backend only knows the British one.
    pub fn parse(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "flow" => Some(Project::Flow),
            "fulfilment" | "fulfillment" => Some(Project::Fulfilment),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Project::Flow => "flow",
            Project::Fulfilment => "fulfilment",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Project::Flow => "FLOW",
            Project::Fulfilment => "Фулфилмент",
        }
    }

    /// Only FLOW has the image-generation section.
    pub fn has_generation(&self) -> bool {
        matches!(self, Project::Flow)
    }

    /// Restores the saved selection. Only exact keys count, so a stale alias is ignored.
    pub fn restore(storage: &Storage, fallback: Project) -> Project {
        match storage.get(PROJECT_KEY) {
            Ok(Some(saved)) if saved == "flow" => Project::Flow,
            Ok(Some(saved)) if saved == "fulfilment" => Project::Fulfilment,
            Ok(_) => fallback,
            Err(e) => {
                debug!("Saved project unreadable: {}", e);
                fallback
            }
        }
    }

    pub fn save(&self, storage: &Storage) {
        if let Err(e) = storage.set(PROJECT_KEY, self.key()) {
            debug!("Project selection not persisted: {}", e);
        }
    }
}

/// Appends `project=` to an endpoint path, keeping any query it already has.
pub fn with_project_param(path: &str, project: Project) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("project", project.key());
    let query = query.finish();
    if path.contains('?') {
        format!("{}&{}", path, query)
    } else {
        format!("{}?{}", path, query)
    }
}
