use serde::Serialize;

use crate::registry::{TargetId, TargetRegistry};

/// Wrap-around browser over a fixed list, as used by the popup viewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carousel<T> {
    items: Vec<T>,
    index: usize,
}

impl<T> Carousel<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, index: 0 }
    }

    pub fn current(&self) -> Option<&T> {
        self.items.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn next(&mut self) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<&T> {
        if self.items.is_empty() {
            return None;
        }
        self.index = (self.index + self.items.len() - 1) % self.items.len();
        self.current()
    }

    pub fn rewind(&mut self) {
        self.index = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganEntry {
    pub id: TargetId,
    pub label: String,
    pub description: Option<String>,
}

impl OrganEntry {
    pub fn describe(&self) -> String {
        match &self.description {
            Some(description) => format!("{}: {description}", self.label),
            None => format!("{}: No description available.", self.label),
        }
    }
}

pub fn organ_entries(registry: &TargetRegistry) -> Vec<OrganEntry> {
    registry
        .organs()
        .into_iter()
        .map(|organ| OrganEntry {
            id: organ.id.clone(),
            label: organ.label.clone(),
            description: organ.description.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProcedureDef;

    #[test]
    fn carousel_wraps_both_directions() {
        let mut carousel = Carousel::new(vec!["a", "b", "c"]);
        assert_eq!(carousel.current(), Some(&"a"));
        assert_eq!(carousel.prev(), Some(&"c"));
        assert_eq!(carousel.next(), Some(&"a"));
        assert_eq!(carousel.next(), Some(&"b"));
        carousel.rewind();
        assert_eq!(carousel.index(), 0);
    }

    #[test]
    fn empty_carousel_yields_nothing() {
        let mut carousel: Carousel<u8> = Carousel::new(Vec::new());
        assert_eq!(carousel.next(), None);
        assert_eq!(carousel.prev(), None);
        assert_eq!(carousel.current(), None);
    }

    #[test]
    fn organ_entries_follow_registry_order() {
        let registry = ProcedureDef::builtin().registry;
        let entries = organ_entries(&registry);
        assert_eq!(entries.len(), 11);
        assert_eq!(entries[0].id.as_str(), "heart");
        let gall = entries
            .iter()
            .find(|entry| entry.id.as_str() == "gallBladder")
            .expect("gall bladder entry");
        assert!(gall.describe().ends_with("No description available."));
    }
}
