use super::draft::{DEFAULT_FORMAT, Draft};
use super::refs::ReferenceList;
use crate::core::surface::Surface;

pub const PROMPT_INPUT: &str = "prompt-input";
pub const IMPROVED_INPUT: &str = "improved-prompt-input";
pub const IMPROVED_PANEL: &str = "improved-prompt-panel";
pub const SOURCE_MINE: &str = "prompt-source-mine";
pub const SOURCE_IMPROVED: &str = "prompt-source-improved";
pub const FORMAT_SELECT: &str = "format-select";
pub const REFS_CONTAINER: &str = "refs-container";
pub const ADD_REF_BUTTON: &str = "btn-add-ref";

/// Live state of the generation form. The draft is derived from it, never the other way round
/// except on restore.
#[derive(Debug)]
pub struct GenerationForm {
    pub prompt: String,
    pub improved_prompt: String,
    pub use_improved: bool,
    pub format: String,
    pub improved_panel_visible: bool,
    pub refs: ReferenceList,
}

impl Default for GenerationForm {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            improved_prompt: String::new(),
            use_improved: false,
            format: DEFAULT_FORMAT.to_string(),
            improved_panel_visible: false,
            refs: ReferenceList::new(),
        }
    }
}

impl GenerationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_draft(&self) -> Draft {
        Draft {
            prompt: self.prompt.clone(),
            improved_prompt: self.improved_prompt.clone(),
            use_improved: self.use_improved,
            refs: self.refs.data_urls(),
            format: if self.format.is_empty() {
                DEFAULT_FORMAT.to_string()
            } else {
                self.format.clone()
            },
        }
    }

    pub fn apply_draft(&mut self, draft: &Draft) {
        self.prompt = draft.prompt.clone();
        self.improved_prompt = draft.improved_prompt.clone();
        self.use_improved = draft.use_improved;
        if !draft.format.is_empty() {
            self.format = draft.format.clone();
        }
        self.refs.restore(&draft.refs);
    }

    /// Clears every field, revokes previews and hides the improved panel.
    pub fn reset(&mut self) {
        self.prompt.clear();
        self.improved_prompt.clear();
        self.use_improved = false;
        self.format = DEFAULT_FORMAT.to_string();
        self.improved_panel_visible = false;
        self.refs.clear();
    }

    /// The improved prompt when selected and not blank, otherwise the user's own. Trimmed.
    pub fn effective_prompt(&self) -> String {
        if self.use_improved {
            let improved = self.improved_prompt.trim();
            if !improved.is_empty() {
                return improved.to_string();
            }
        }
        self.prompt.trim().to_string()
    }

    pub fn render(&self, surface: &mut Surface) {
        surface.set_attr(PROMPT_INPUT, "value", self.prompt.as_str());
        surface.set_attr(IMPROVED_INPUT, "value", self.improved_prompt.as_str());
        surface.set_hidden(IMPROVED_PANEL, !self.improved_panel_visible);
        surface.set_attr(SOURCE_MINE, "checked", (!self.use_improved).to_string());
        surface.set_attr(SOURCE_IMPROVED, "checked", self.use_improved.to_string());
        surface.set_attr(FORMAT_SELECT, "value", self.format.as_str());
        self.render_refs(surface);
    }

    pub fn render_refs(&self, surface: &mut Surface) {
        surface.set_html(REFS_CONTAINER, self.refs.render_html());
        surface.set_hidden(ADD_REF_BUTTON, !self.refs.has_any());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_prompt_prefers_nonblank_improved() {
        let mut form = GenerationForm::new();
        form.prompt = "  cat ".into();
        form.improved_prompt = "   ".into();
        form.use_improved = true;
        assert_eq!(form.effective_prompt(), "cat");
        form.improved_prompt = " a fluffy cat ".into();
        assert_eq!(form.effective_prompt(), "a fluffy cat");
        form.use_improved = false;
        assert_eq!(form.effective_prompt(), "cat");
    }

    #[test]
    fn restore_then_reset() {
        let mut form = GenerationForm::new();
        form.apply_draft(&Draft {
            prompt: "p".into(),
            improved_prompt: "ip".into(),
            use_improved: true,
            refs: vec!["data:a".into(), "data:b".into(), "data:c".into()],
            format: "1536x1024".into(),
        });
        assert_eq!(form.refs.len(), 4);
        assert_eq!(form.to_draft().refs.len(), 3);

        let mut surface = Surface::new();
        form.render(&mut surface);
        assert!(!surface.is_hidden(ADD_REF_BUTTON));
        assert_eq!(surface.attr(SOURCE_IMPROVED, "checked"), Some("true"));

        form.reset();
        assert_eq!(form.to_draft(), Draft::default());
        form.render(&mut surface);
        assert!(surface.is_hidden(ADD_REF_BUTTON));
        assert!(surface.is_hidden(IMPROVED_PANEL));
    }
}
