use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::storage::Storage;

pub const DRAFT_KEY: &str = "grs_image_web_draft";
/// Limit for all reference data URLs of a persisted draft.
pub const REFS_MAX_BYTES: usize = 4 * 1024 * 1024;
pub const DEFAULT_FORMAT: &str = "1024x1024";

/// Everything typed into the generation form, as persisted between visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub prompt: String,
    pub improved_prompt: String,
    pub use_improved: bool,
    pub refs: Vec<String>,
    pub format: String,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            improved_prompt: String::new(),
            use_improved: false,
            refs: Vec::new(),
            format: DEFAULT_FORMAT.to_string(),
        }
    }
}

/// Two bytes per character, like browser storage accounting.
pub fn refs_bytes(refs: &[String]) -> usize {
    refs.iter().map(|r| r.encode_utf16().count() * 2).sum()
}

impl Draft {
    /// Parses a stored record. Fields of the wrong type fall back to their defaults; anything
    /// that is not a JSON object is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let obj = value.as_object()?;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let defaults = Draft::default();
        Some(Self {
            prompt: text("prompt").unwrap_or(defaults.prompt),
            improved_prompt: text("improvedPrompt").unwrap_or(defaults.improved_prompt),
            use_improved: obj
                .get("useImproved")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            refs: obj
                .get("refs")
                .and_then(Value::as_array)
                .map(|refs| {
                    refs.iter()
                        .filter_map(|r| r.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
            format: text("format")
                .filter(|f| !f.is_empty())
                .unwrap_or(defaults.format),
        })
    }

    /// The record as it should be written: references dropped when over the limit.
    pub fn for_storage(&self) -> Draft {
        let mut stored = self.clone();
        if refs_bytes(&stored.refs) > REFS_MAX_BYTES {
            debug!(
                "Draft references over the limit ({} bytes), persisting without them",
                refs_bytes(&stored.refs)
            );
            stored.refs.clear();
        }
        stored
    }
}

/// Reads and writes the draft record. Failures are logged and swallowed.
#[derive(Clone)]
pub struct DraftStore {
    storage: Storage,
}

impl DraftStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Persists the draft. On a quota error the write is retried once without references.
    /// Returns whether something was stored.
    pub fn persist(&self, draft: &Draft) -> bool {
        let stored = draft.for_storage();
        match self.write(&stored) {
            Ok(()) => true,
            Err(e) if e.is_quota() => {
                debug!("Draft hit the storage quota, retrying without references");
                let stripped = Draft {
                    refs: Vec::new(),
                    ..stored
                };
                match self.write(&stripped) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Draft not persisted: {}", e);
                        false
                    }
                }
            }
            Err(e) => {
                debug!("Draft not persisted: {}", e);
                false
            }
        }
    }

    fn write(&self, draft: &Draft) -> Result<(), crate::core::storage::StorageError> {
        let raw = serde_json::to_string(draft)?;
        self.storage.set(DRAFT_KEY, &raw)
    }

    /// The stored draft, if there is a readable one.
    pub fn load(&self) -> Option<Draft> {
        match self.storage.get(DRAFT_KEY) {
            Ok(Some(raw)) => {
                let draft = Draft::parse(&raw);
                if draft.is_none() {
                    debug!("Ignoring unreadable draft record");
                }
                draft
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Draft unreadable: {}", e);
                None
            }
        }
    }

    /// Overwrites the record with an empty draft.
    pub fn reset(&self) {
        self.persist(&Draft::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::{KeyValueStore, MemoryStore, entry_cost};
    use std::sync::Arc;

    fn big_refs() -> Vec<String> {
        // 3 x 800k chars = 4.8 MB encoded
        (0..3).map(|_| "a".repeat(800 * 1024)).collect()
    }

    #[test]
    fn oversized_refs_are_not_persisted() {
        let store = Arc::new(MemoryStore::with_quota(64 * 1024 * 1024));
        let drafts = DraftStore::new(store.clone());
        let draft = Draft {
            prompt: "кот в шляпе".into(),
            format: "1024x1536".into(),
            refs: big_refs(),
            ..Draft::default()
        };
        assert!(drafts.persist(&draft));
        let stored = drafts.load().unwrap();
        assert!(stored.refs.is_empty());
        assert_eq!(stored.prompt, "кот в шляпе");
        assert_eq!(stored.format, "1024x1536");
    }

    #[test]
    fn quota_error_retries_without_refs() {
        let refs = vec!["b".repeat(1024 * 1024)];
        let quota = entry_cost(DRAFT_KEY, &"x".repeat(600));
        let store = Arc::new(MemoryStore::with_quota(quota));
        let drafts = DraftStore::new(store.clone());
        let draft = Draft {
            prompt: "new prompt".into(),
            refs,
            ..Draft::default()
        };
        assert!(drafts.persist(&draft));
        let stored = drafts.load().unwrap();
        assert_eq!(stored.prompt, "new prompt");
        assert!(stored.refs.is_empty());
    }

    #[test]
    fn unavailable_storage_is_silent() {
        let drafts = DraftStore::new(Arc::new(MemoryStore::unavailable()));
        assert!(!drafts.persist(&Draft::default()));
        assert!(drafts.load().is_none());
    }

    #[test]
    fn lenient_parse() {
        assert!(Draft::parse("not json").is_none());
        assert!(Draft::parse("[1,2]").is_none());
        let d = Draft::parse(r#"{"prompt":"p","refs":"nope","format":null,"useImproved":true}"#).unwrap();
        assert_eq!(d.prompt, "p");
        assert!(d.refs.is_empty());
        assert_eq!(d.format, DEFAULT_FORMAT);
        assert!(d.use_improved);
    }

    #[test]
    fn serialized_as_camel_case() {
        let store: Storage = Arc::new(MemoryStore::new());
        DraftStore::new(store.clone()).reset();
        let raw = store.get(DRAFT_KEY).unwrap().unwrap();
        assert_eq!(
            raw,
            r#"{"prompt":"","improvedPrompt":"","useImproved":false,"refs":[],"format":"1024x1024"}"#
        );
    }
}
