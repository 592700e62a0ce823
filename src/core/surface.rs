use std::collections::BTreeMap;

/// One addressable element of a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub html: String,
    pub text: String,
    pub hidden: bool,
    pub disabled: bool,
    pub attrs: BTreeMap<String, String>,
}

/// Render target for a page.
///
/// Controllers write HTML fragments, text and visibility here and never read it back as a
/// source of truth. Elements are created on first write. Blocking alerts are queued until the
/// host drains them.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    nodes: BTreeMap<String, Node>,
    alerts: Vec<String>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose listed elements start hidden, as declared in the page markup.
    pub fn with_hidden(ids: &[&str]) -> Self {
        let mut surface = Self::new();
        for id in ids {
            surface.hide(id);
        }
        surface
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    fn node_mut(&mut self, id: &str) -> &mut Node {
        self.nodes.entry(id.to_string()).or_default()
    }

    pub fn set_html(&mut self, id: &str, html: impl Into<String>) {
        let node = self.node_mut(id);
        node.html = html.into();
        node.text.clear();
    }

    pub fn set_text(&mut self, id: &str, text: impl Into<String>) {
        let node = self.node_mut(id);
        node.text = text.into();
        node.html.clear();
    }

    pub fn html(&self, id: &str) -> &str {
        self.nodes.get(id).map(|n| n.html.as_str()).unwrap_or("")
    }

    pub fn text(&self, id: &str) -> &str {
        self.nodes.get(id).map(|n| n.text.as_str()).unwrap_or("")
    }

    pub fn show(&mut self, id: &str) {
        self.set_hidden(id, false);
    }

    pub fn hide(&mut self, id: &str) {
        self.set_hidden(id, true);
    }

    pub fn set_hidden(&mut self, id: &str, hidden: bool) {
        self.node_mut(id).hidden = hidden;
    }

    pub fn is_hidden(&self, id: &str) -> bool {
        self.nodes.get(id).map(|n| n.hidden).unwrap_or(false)
    }

    pub fn set_disabled(&mut self, id: &str, disabled: bool) {
        self.node_mut(id).disabled = disabled;
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.nodes.get(id).map(|n| n.disabled).unwrap_or(false)
    }

    pub fn set_attr(&mut self, id: &str, name: &str, value: impl Into<String>) {
        self.node_mut(id).attrs.insert(name.to_string(), value.into());
    }

    pub fn attr(&self, id: &str, name: &str) -> Option<&str> {
        self.nodes
            .get(id)
            .and_then(|n| n.attrs.get(name))
            .map(String::as_str)
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        self.alerts.push(message.into());
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_and_text_replace_each_other() {
        let mut s = Surface::new();
        s.set_html("list", "<p>a</p>");
        s.set_text("list", "plain");
        assert_eq!(s.html("list"), "");
        assert_eq!(s.text("list"), "plain");
    }

    #[test]
    fn initial_hidden_elements() {
        let mut s = Surface::with_hidden(&["popup"]);
        assert!(s.is_hidden("popup"));
        assert!(!s.is_hidden("missing"));
        s.show("popup");
        assert!(!s.is_hidden("popup"));
    }

    #[test]
    fn alerts_are_drained() {
        let mut s = Surface::new();
        s.alert("one");
        s.alert("two");
        assert_eq!(s.take_alerts(), vec!["one", "two"]);
        assert!(s.alerts().is_empty());
    }
}
