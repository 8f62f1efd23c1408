//! Row selection keyed by record identifier
//!
//! Selection is identity based, so it survives sorting, paging, filtering
//! and column changes. Identifiers are only pruned when a fresh record set
//! is adopted.

use std::collections::{BTreeSet, HashSet};

/// Header checkbox rendering derived from the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderCheckbox {
    Unchecked,
    Indeterminate,
    Checked,
}

/// Selected record identifiers, iterated in identifier order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one identifier; returns true if it is now selected
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    /// Add every identifier of the current filtered set (all pages)
    pub fn select_all<I, S>(&mut self, visible: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in visible {
            self.ids.insert(id.as_ref().to_string());
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// True only for a non-empty visible set that is entirely selected
    pub fn is_all_visible_selected<I, S>(&self, visible: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut any = false;
        for id in visible {
            if !self.ids.contains(id.as_ref()) {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn header_state<I, S>(&self, visible: I) -> HeaderCheckbox
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (mut seen, mut selected) = (0usize, 0usize);
        for id in visible {
            seen += 1;
            if self.ids.contains(id.as_ref()) {
                selected += 1;
            }
        }
        match selected {
            0 => HeaderCheckbox::Unchecked,
            n if n == seen => HeaderCheckbox::Checked,
            _ => HeaderCheckbox::Indeterminate,
        }
    }

    /// Drop identifiers absent from the live set; returns how many were dropped
    pub fn prune(&mut self, live: &HashSet<&str>) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| live.contains(id.as_str()));
        before - self.ids.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut sel = SelectionSet::new();
        assert!(sel.toggle("A"));
        assert!(sel.contains("A"));
        assert!(!sel.toggle("A"));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_select_all_keeps_outside_ids() {
        let mut sel = SelectionSet::new();
        sel.toggle("Z");
        sel.select_all(["A", "B"]);
        assert_eq!(sel.to_vec(), vec!["A", "B", "Z"]);
    }

    #[test]
    fn test_all_visible_selected_requires_non_empty() {
        let sel = SelectionSet::new();
        let none: [&str; 0] = [];
        assert!(!sel.is_all_visible_selected(none));
    }

    #[test]
    fn test_all_visible_selected() {
        let mut sel = SelectionSet::new();
        sel.select_all(["A", "B"]);
        assert!(sel.is_all_visible_selected(["A", "B"]));
        assert!(sel.is_all_visible_selected(["B"]));
        assert!(!sel.is_all_visible_selected(["A", "C"]));
    }

    #[test]
    fn test_header_state() {
        let mut sel = SelectionSet::new();
        assert_eq!(sel.header_state(["A", "B"]), HeaderCheckbox::Unchecked);
        sel.toggle("A");
        assert_eq!(sel.header_state(["A", "B"]), HeaderCheckbox::Indeterminate);
        sel.toggle("B");
        assert_eq!(sel.header_state(["A", "B"]), HeaderCheckbox::Checked);
    }

    #[test]
    fn test_prune_against_live_set() {
        let mut sel = SelectionSet::new();
        sel.select_all(["A", "B", "gone"]);
        let live: HashSet<&str> = ["A", "B", "C"].into_iter().collect();
        assert_eq!(sel.prune(&live), 1);
        assert_eq!(sel.to_vec(), vec!["A", "B"]);
    }
}
