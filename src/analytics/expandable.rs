pub const SHOW_MORE_LABEL: &str = "Показать больше";
pub const COLLAPSE_LABEL: &str = "Скрыть";

/// A list that shows its first `initial` items until expanded.
#[derive(Debug, Clone)]
pub struct ExpandableList<T> {
    items: Vec<T>,
    initial: usize,
    visible: usize,
}

impl<T> ExpandableList<T> {
    pub fn new(initial: usize) -> Self {
        Self {
            items: Vec::new(),
            initial,
            visible: initial,
        }
    }

    /// Replaces the contents and collapses back to the initial count.
    pub fn reset(&mut self, items: Vec<T>) {
        self.items = items;
        self.visible = self.initial;
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn visible_items(&self) -> &[T] {
        let end = self.visible.min(self.items.len());
        &self.items[..end]
    }

    pub fn has_more(&self) -> bool {
        self.items.len() > self.initial
    }

    pub fn is_expanded(&self) -> bool {
        self.visible >= self.items.len()
    }

    pub fn toggle(&mut self) {
        self.visible = if self.is_expanded() {
            self.initial
        } else {
            self.items.len()
        };
    }

    pub fn toggle_label(&self) -> &'static str {
        if self.is_expanded() {
            COLLAPSE_LABEL
        } else {
            SHOW_MORE_LABEL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_items_three_visible() {
        let mut list = ExpandableList::new(3);
        list.reset((0..10).collect());
        assert_eq!(list.visible_items().len(), 3);
        assert_eq!(list.toggle_label(), SHOW_MORE_LABEL);
        list.toggle();
        assert_eq!(list.visible_items().len(), 10);
        assert_eq!(list.toggle_label(), COLLAPSE_LABEL);
        list.toggle();
        assert_eq!(list.visible_items().len(), 3);
        assert_eq!(list.toggle_label(), SHOW_MORE_LABEL);
    }

    #[test]
    fn short_list_has_no_toggle() {
        let mut list = ExpandableList::new(3);
        list.reset(vec![1, 2]);
        assert!(!list.has_more());
        assert!(list.is_expanded());
        assert_eq!(list.visible_items(), &[1, 2]);
    }
}
