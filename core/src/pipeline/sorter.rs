use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A labelled comparator chain. Links are consulted in insertion order until
/// one of them distinguishes the two items; each link carries its own order
/// and the sorter's overall order is applied to the combined result.
pub struct Sorter<T> {
    label: String,
    description: Option<String>,
    comparators: Vec<(Comparator<T>, SortOrder)>,
    order: SortOrder,
}

impl<T> Clone for Sorter<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            description: self.description.clone(),
            comparators: self.comparators.clone(),
            order: self.order,
        }
    }
}

impl<T> fmt::Debug for Sorter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sorter")
            .field("label", &self.label)
            .field("comparators", &self.comparators.len())
            .field("order", &self.order)
            .finish()
    }
}

impl<T> Sorter<T> {
    pub fn builder(label: impl Into<String>) -> SorterBuilder<T> {
        SorterBuilder {
            label: label.into(),
            description: None,
            comparators: Vec::new(),
            order: SortOrder::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn compare(&self, left: &T, right: &T) -> Ordering {
        let chained = self
            .comparators
            .iter()
            .map(|(comparator, order)| order.apply(comparator(left, right)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal);
        self.order.apply(chained)
    }

    /// Returns positions into `items` in sorted order, reversed afterwards
    /// when `reversed` is set. The input is never reordered.
    pub fn sorted_indices(&self, items: &[T], reversed: bool) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..items.len()).collect();
        indices.sort_by(|&a, &b| self.compare(&items[a], &items[b]));
        if reversed {
            indices.reverse();
        }
        indices
    }

    pub fn to_builder(&self) -> SorterBuilder<T> {
        SorterBuilder {
            label: self.label.clone(),
            description: self.description.clone(),
            comparators: self.comparators.clone(),
            order: self.order,
        }
    }
}

pub struct SorterBuilder<T> {
    label: String,
    description: Option<String>,
    comparators: Vec<(Comparator<T>, SortOrder)>,
    order: SortOrder,
}

impl<T> SorterBuilder<T> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn comparator<F>(mut self, order: SortOrder, comparator: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.comparators.push((Arc::new(comparator), order));
        self
    }

    pub fn by_key<K, F>(self, order: SortOrder, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.comparator(order, move |left, right| key(left).cmp(&key(right)))
    }

    pub fn build(self) -> Sorter<T> {
        Sorter {
            label: self.label,
            description: self.description,
            comparators: self.comparators,
            order: self.order,
        }
    }
}

/// The configured sorters of a pipeline plus the selection state: which one
/// is current and whether the sorted output is reversed.
pub struct SorterSet<T> {
    sorters: Vec<Sorter<T>>,
    current: Option<usize>,
    reversed: bool,
}

impl<T> Clone for SorterSet<T> {
    fn clone(&self) -> Self {
        Self {
            sorters: self.sorters.clone(),
            current: self.current,
            reversed: self.reversed,
        }
    }
}

impl<T> SorterSet<T> {
    /// The first sorter, when there is one, starts out selected.
    pub fn new(sorters: Vec<Sorter<T>>) -> Self {
        let current = if sorters.is_empty() { None } else { Some(0) };
        Self {
            sorters,
            current,
            reversed: false,
        }
    }

    pub fn sorters(&self) -> &[Sorter<T>] {
        &self.sorters
    }

    pub fn current(&self) -> Option<&Sorter<T>> {
        self.current.and_then(|index| self.sorters.get(index))
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Advances to the next sorter, wrapping to the first. Returns false when
    /// there is nothing to select.
    pub fn next(&mut self) -> bool {
        if self.sorters.is_empty() {
            return false;
        }
        let next = match self.current {
            Some(index) if index + 1 < self.sorters.len() => index + 1,
            _ => 0,
        };
        self.current = Some(next);
        true
    }

    pub fn select(&mut self, label: &str) -> bool {
        let Some(index) = self.sorters.iter().position(|sorter| sorter.label == label) else {
            return false;
        };
        self.current = Some(index);
        true
    }

    pub fn toggle_reversed(&mut self) {
        self.reversed = !self.reversed;
    }

    pub fn sorted_indices(&self, items: &[T]) -> Vec<usize> {
        match self.current() {
            Some(sorter) => sorter.sorted_indices(items, self.reversed),
            None => {
                let mut indices: Vec<usize> = (0..items.len()).collect();
                if self.reversed {
                    indices.reverse();
                }
                indices
            }
        }
    }
}
