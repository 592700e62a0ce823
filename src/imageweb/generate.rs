//! Generation and prompt improvement requests.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::files::read_as_data_url;
use super::refs::RefSource;
use crate::core::api::{ApiClient, ApiError};

pub const EMPTY_PROMPT: &str = "Введите промпт.";
pub const IMPROVE_NEEDS_PROMPT: &str = "Сначала введите промпт.";
pub const AUTH_REQUIRED: &str = "Требуется авторизация через Telegram";
pub const REFS_TOO_LARGE: &str =
    "Файлы референсов слишком большие. Выберите изображения меньшего размера или меньше файлов.";
pub const GENERATION_FAILED: &str = "Ошибка генерации";
pub const SERVER_ERROR: &str = "Ошибка сервера. Попробуйте позже.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub refs: Vec<String>,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub image_url: String,
    #[serde(default)]
    pub id: Option<String>,
}

impl GenerateResponse {
    /// Name offered for the download link.
    pub fn download_name(&self) -> &str {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or("image.png")
    }
}

#[derive(Debug, Serialize)]
struct ImproveRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImproveResponse {
    #[serde(default)]
    improved: Option<String>,
}

/// Identifies one generation attempt. Later tickets supersede earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(pub u64);

/// Alert text for a failed generation.
pub fn failure_message(e: &ApiError) -> String {
    match e {
        ApiError::Status { status: 401, .. } => AUTH_REQUIRED.to_string(),
        ApiError::Status { status: 413, .. } => REFS_TOO_LARGE.to_string(),
        ApiError::Status {
            json_body: false, ..
        } => SERVER_ERROR.to_string(),
        ApiError::Status { .. } => e.detail_or(GENERATION_FAILED).to_string(),
        ApiError::Decode(_) => SERVER_ERROR.to_string(),
        ApiError::Network(reason) => reason.clone(),
    }
}

/// A generation that has been validated and snapshotted but not sent yet. Sending does not
/// borrow the controller, so the form stays usable meanwhile.
#[derive(Debug)]
pub struct PendingGeneration {
    pub ticket: Ticket,
    api: ApiClient,
    prompt: String,
    format: String,
    sources: Vec<RefSource>,
}

#[derive(Debug)]
pub struct GenerationOutcome {
    pub ticket: Ticket,
    pub result: Result<GenerateResponse, String>,
}

impl PendingGeneration {
    pub(crate) fn new(
        ticket: Ticket,
        api: ApiClient,
        prompt: String,
        format: String,
        sources: Vec<RefSource>,
    ) -> Self {
        Self {
            ticket,
            api,
            prompt,
            format,
            sources,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Reads outstanding files in parallel, keeping row order, then posts `/generate`.
    pub async fn send(self) -> GenerationOutcome {
        let ticket = self.ticket;
        let result = self.run().await;
        GenerationOutcome { ticket, result }
    }

    async fn run(self) -> Result<GenerateResponse, String> {
        let reads: Vec<_> = self
            .sources
            .into_iter()
            .map(|source| {
                tokio::spawn(async move {
                    match source {
                        RefSource::Ready(url) => Ok(url),
                        RefSource::Read(file) => read_as_data_url(file).await,
                    }
                })
            })
            .collect();
        let mut refs = Vec::with_capacity(reads.len());
        for read in reads {
            match read.await {
                Ok(Ok(url)) => refs.push(url),
                Ok(Err(e)) => return Err(e.to_string()),
                Err(e) => return Err(e.to_string()),
            }
        }
        let request = GenerateRequest {
            prompt: self.prompt,
            refs,
            format: self.format,
        };
        info!(
            "Generating {} with {} references",
            request.format,
            request.refs.len()
        );
        self.api
            .post_json::<_, GenerateResponse>("/generate", &request)
            .await
            .map_err(|e| {
                warn!("Generation failed: {}", e);
                failure_message(&e)
            })
    }
}

/// Asks the backend to rewrite a prompt. An empty answer keeps the original.
pub async fn improve_prompt(api: &ApiClient, prompt: &str) -> Result<String, ApiError> {
    let res: ImproveResponse = api
        .post_json("/improve-prompt", &ImproveRequest { prompt })
        .await?;
    let improved = res.improved.unwrap_or_default();
    let improved = improved.trim();
    if improved.is_empty() {
        debug!("Improve returned nothing, keeping prompt");
        Ok(prompt.to_string())
    } else {
        Ok(improved.to_string())
    }
}

/// Alert text for a failed improve request.
pub fn improve_failure_message(e: &ApiError) -> String {
    format!("Ошибка: {}", e.detail_or(&e.to_string()))
}
