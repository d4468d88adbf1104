use std::fmt;
use std::sync::Arc;

type FilterPredicate<T> = Arc<dyn Fn(&T, usize, usize) -> bool + Send + Sync>;

/// A labelled, toggleable predicate over `(item, index, size)`, where `index`
/// is the item's position in the sorted sequence and `size` its length. Every
/// predicate must accept an item for it to pass; a disabled filter passes
/// everything.
pub struct Filter<T> {
    label: String,
    description: Option<String>,
    predicates: Vec<FilterPredicate<T>>,
    enabled: bool,
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            description: self.description.clone(),
            predicates: self.predicates.clone(),
            enabled: self.enabled,
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("label", &self.label)
            .field("predicates", &self.predicates.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl<T> Filter<T> {
    pub fn builder(label: impl Into<String>) -> FilterBuilder<T> {
        FilterBuilder {
            label: label.into(),
            description: None,
            predicates: Vec::new(),
            enabled: true,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn test(&self, item: &T, index: usize, size: usize) -> bool {
        !self.enabled
            || self
                .predicates
                .iter()
                .all(|predicate| predicate(item, index, size))
    }
}

pub struct FilterBuilder<T> {
    label: String,
    description: Option<String>,
    predicates: Vec<FilterPredicate<T>>,
    enabled: bool,
}

impl<T> FilterBuilder<T> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn predicate<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.positional(move |item, _, _| predicate(item))
    }

    /// Adds a predicate that also sees the item's sorted position, for
    /// filters such as "top 100".
    pub fn positional<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T, usize, usize) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    pub fn build(self) -> Filter<T> {
        Filter {
            label: self.label,
            description: self.description,
            predicates: self.predicates,
            enabled: self.enabled,
        }
    }
}

/// Single pass over `sorted` keeping the positions every filter accepts.
pub(crate) fn apply_filters<T>(items: &[T], sorted: &[usize], filters: &[Filter<T>]) -> Vec<usize> {
    let size = sorted.len();
    sorted
        .iter()
        .enumerate()
        .filter(|&(position, &item_index)| {
            filters
                .iter()
                .all(|filter| filter.test(&items[item_index], position, size))
        })
        .map(|(_, &item_index)| item_index)
        .collect()
}
