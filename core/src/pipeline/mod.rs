//! Turns an immutable item collection into a rendered page window through
//! sort, filter and search stages, recomputing lazily.
//!
//! Invalidation is tracked as a single [`Stage`]: the earliest stage whose
//! inputs changed. A recompute runs every stage from there down and commits
//! each stage's result before moving to the next, so a transformer failure
//! only leaves the window stage dirty.

use crate::config::DEFAULT_AMOUNT_PER_PAGE;
use crate::config::clamp_amount_per_page;
use crate::error::ViewError;
use std::collections::BTreeMap;
use std::sync::Arc;

mod filter;
mod search;
mod sorter;
mod window;

pub use filter::Filter;
pub use filter::FilterBuilder;
pub use search::Search;
pub use search::SearchBuilder;
pub use sorter::SortOrder;
pub use sorter::Sorter;
pub use sorter::SorterBuilder;
pub use sorter::SorterSet;
pub use window::FieldStyle;
pub use window::RenderedItem;
pub use window::VAR_CACHED_SIZE;
pub use window::VAR_CURRENT_PAGE;
pub use window::VAR_END_INDEX;
pub use window::VAR_FILTERED_SIZE;
pub use window::VAR_SIZE;
pub use window::VAR_START_INDEX;
pub use window::VAR_TOTAL_PAGES;
pub use window::Window;
pub use window::apply_variables;
pub use window::total_pages;

/// Projects `(item, filtered_index, filtered_size)` into a rendered item;
/// `Ok(None)` omits the item from the window.
pub type Transformer<T> =
    Arc<dyn Fn(&T, usize, usize) -> anyhow::Result<Option<RenderedItem>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Window,
    Filter,
    Sort,
}

pub struct ItemPipeline<T> {
    items: Arc<[T]>,
    transformer: Transformer<T>,
    sorters: SorterSet<T>,
    filters: Vec<Filter<T>>,
    searches: Vec<Search<T>>,
    pending_search: Option<usize>,
    field_style: FieldStyle,
    list_title: Option<String>,
    static_variables: BTreeMap<String, String>,
    amount_per_page: usize,
    current_page: usize,
    dirty: Option<Stage>,
    sorted: Vec<usize>,
    filtered: Vec<usize>,
    window: Window,
    recompute_count: u64,
}

/// Copies share the item collection but never the cached stages: a clone
/// starts dirty with an empty cache.
impl<T> Clone for ItemPipeline<T> {
    fn clone(&self) -> Self {
        self.to_builder().build_with_page(self.current_page)
    }
}

impl<T> ItemPipeline<T> {
    pub fn builder<F>(items: Vec<T>, transformer: F) -> ItemPipelineBuilder<T>
    where
        F: Fn(&T, usize, usize) -> anyhow::Result<Option<RenderedItem>> + Send + Sync + 'static,
    {
        ItemPipelineBuilder {
            items: items.into(),
            transformer: Arc::new(transformer),
            sorters: Vec::new(),
            filters: Vec::new(),
            searches: Vec::new(),
            field_style: FieldStyle::default(),
            list_title: None,
            static_variables: BTreeMap::new(),
            amount_per_page: DEFAULT_AMOUNT_PER_PAGE,
        }
    }

    /// A builder seeded with this pipeline's configuration. Selection state
    /// (current sorter, filter toggles, current page) is not carried over.
    pub fn to_builder(&self) -> ItemPipelineBuilder<T> {
        ItemPipelineBuilder {
            items: Arc::clone(&self.items),
            transformer: Arc::clone(&self.transformer),
            sorters: self.sorters.sorters().to_vec(),
            filters: self.filters.clone(),
            searches: self.searches.clone(),
            field_style: self.field_style,
            list_title: self.list_title.clone(),
            static_variables: self.static_variables.clone(),
            amount_per_page: self.amount_per_page,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn amount_per_page(&self) -> usize {
        self.amount_per_page
    }

    /// The current page as of the latest computation; always within
    /// `[1, total_pages]` for the filtered set it was computed against.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn sorters(&self) -> &SorterSet<T> {
        &self.sorters
    }

    pub fn filters(&self) -> &[Filter<T>] {
        &self.filters
    }

    pub fn searches(&self) -> &[Search<T>] {
        &self.searches
    }

    pub fn field_style(&self) -> FieldStyle {
        self.field_style
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Number of times the window has been recomputed.
    pub fn recompute_count(&self) -> u64 {
        self.recompute_count
    }

    /// The most recently computed window, without recomputing.
    pub fn cached_window(&self) -> &Window {
        &self.window
    }

    pub fn invalidate(&mut self) {
        self.invalidate_from(Stage::Sort);
    }

    fn invalidate_from(&mut self, stage: Stage) {
        self.dirty = Some(self.dirty.map_or(stage, |current| current.max(stage)));
    }

    pub fn next_sorter(&mut self) {
        if self.sorters.next() {
            self.invalidate_from(Stage::Sort);
        }
    }

    pub fn select_sorter(&mut self, label: &str) -> bool {
        let selected = self.sorters.select(label);
        if selected {
            self.invalidate_from(Stage::Sort);
        }
        selected
    }

    pub fn toggle_reversed(&mut self) {
        self.sorters.toggle_reversed();
        self.invalidate_from(Stage::Sort);
    }

    pub fn add_filter(&mut self, filter: Filter<T>) {
        self.filters.push(filter);
        self.invalidate_from(Stage::Filter);
    }

    pub fn remove_filter(&mut self, label: &str) -> Option<Filter<T>> {
        let index = self.filters.iter().position(|filter| filter.label() == label)?;
        self.invalidate_from(Stage::Filter);
        Some(self.filters.remove(index))
    }

    /// Flips a filter's enabled flag, returning the new state.
    pub fn toggle_filter(&mut self, label: &str) -> Option<bool> {
        let filter = self
            .filters
            .iter_mut()
            .find(|filter| filter.label() == label)?;
        let enabled = !filter.is_enabled();
        filter.set_enabled(enabled);
        self.invalidate_from(Stage::Filter);
        Some(enabled)
    }

    pub fn set_filter_enabled(&mut self, label: &str, enabled: bool) -> bool {
        let Some(filter) = self
            .filters
            .iter_mut()
            .find(|filter| filter.label() == label)
        else {
            return false;
        };
        if filter.is_enabled() != enabled {
            filter.set_enabled(enabled);
            self.invalidate_from(Stage::Filter);
        }
        true
    }

    /// Queues `query` on the search labelled `label`. The next window
    /// computation jumps to the page holding the first match, if any.
    pub fn submit_search(&mut self, label: &str, query: impl Into<String>) -> bool {
        let Some(index) = self
            .searches
            .iter()
            .position(|search| search.label() == label)
        else {
            return false;
        };
        self.searches[index].set_last_match(query.into());
        self.pending_search = Some(index);
        self.invalidate_from(Stage::Window);
        true
    }

    pub fn total_pages(&mut self) -> usize {
        self.refresh_filtered();
        total_pages(self.filtered.len(), self.amount_per_page)
    }

    /// Moves to `page`, clamped into `[1, total_pages]`.
    pub fn goto_page(&mut self, page: usize) {
        let total = self.total_pages();
        let page = page.clamp(1, total);
        if page != self.current_page {
            self.current_page = page;
            self.invalidate_from(Stage::Window);
        }
    }

    pub fn goto_first_page(&mut self) {
        self.goto_page(1);
    }

    pub fn goto_last_page(&mut self) {
        let total = self.total_pages();
        self.goto_page(total);
    }

    pub fn goto_next_page(&mut self) {
        self.goto_page(self.current_page.saturating_add(1));
    }

    pub fn goto_previous_page(&mut self) {
        self.goto_page(self.current_page.saturating_sub(1));
    }

    /// Takes `&mut self` because a filter change since the last window may
    /// have shrunk the page count; the filtered stage is refreshed first.
    /// [`Window::has_next_page`] answers from the cached window instead.
    pub fn has_next_page(&mut self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    /// Returns the current window, recomputing the stages invalidated since
    /// the last successful computation.
    pub fn window(&mut self) -> Result<&Window, ViewError> {
        if self.dirty.is_none() {
            return Ok(&self.window);
        }
        self.recompute_count += 1;
        self.refresh_filtered();

        let filtered_size = self.filtered.len();
        let total = total_pages(filtered_size, self.amount_per_page);
        let search_match = self
            .pending_search
            .and_then(|index| self.searches.get(index))
            .and_then(|search| search.first_match(&self.items, &self.filtered));
        let mut current_page = self.current_page;
        if let Some(position) = search_match {
            current_page = position / self.amount_per_page + 1;
        }
        let current_page = current_page.clamp(1, total);

        let start_index = ((current_page - 1) * self.amount_per_page).min(filtered_size);
        let end_index = (start_index + self.amount_per_page).min(filtered_size);
        let mut rendered = Vec::with_capacity(end_index - start_index);
        for (offset, &item_index) in self.filtered[start_index..end_index].iter().enumerate() {
            let position = start_index + offset;
            match (self.transformer)(&self.items[item_index], position, filtered_size) {
                Ok(Some(item)) => rendered.push(item),
                Ok(None) => {}
                Err(err) => return Err(ViewError::render(err)),
            }
        }

        self.current_page = current_page;
        self.pending_search = None;
        self.dirty = None;
        self.window = Window {
            items: rendered,
            current_page,
            total_pages: total,
            size: self.items.len(),
            filtered_size,
            start_index,
            end_index,
            search_match,
            field_style: self.field_style,
            list_title: self.list_title.clone(),
            variables: BTreeMap::new(),
        }
        .with_counters(&self.static_variables);
        Ok(&self.window)
    }

    fn refresh_filtered(&mut self) {
        let Some(stage) = self.dirty else {
            return;
        };
        if stage >= Stage::Sort {
            self.sorted = self.sorters.sorted_indices(&self.items);
            self.dirty = Some(Stage::Filter);
        }
        if stage >= Stage::Filter {
            self.filtered = filter::apply_filters(&self.items, &self.sorted, &self.filters);
            self.current_page = self
                .current_page
                .clamp(1, total_pages(self.filtered.len(), self.amount_per_page));
            self.dirty = Some(Stage::Window);
        }
    }
}

pub struct ItemPipelineBuilder<T> {
    items: Arc<[T]>,
    transformer: Transformer<T>,
    sorters: Vec<Sorter<T>>,
    filters: Vec<Filter<T>>,
    searches: Vec<Search<T>>,
    field_style: FieldStyle,
    list_title: Option<String>,
    static_variables: BTreeMap<String, String>,
    amount_per_page: usize,
}

impl<T> ItemPipelineBuilder<T> {
    pub fn sorter(mut self, sorter: Sorter<T>) -> Self {
        self.sorters.push(sorter);
        self
    }

    pub fn filter(mut self, filter: Filter<T>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn search(mut self, search: Search<T>) -> Self {
        self.searches.push(search);
        self
    }

    pub fn field_style(mut self, field_style: FieldStyle) -> Self {
        self.field_style = field_style;
        self
    }

    pub fn list_title(mut self, title: impl Into<String>) -> Self {
        self.list_title = Some(title.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.static_variables.insert(name.into(), value.to_string());
        self
    }

    /// Clamped into `[1, 24]`.
    pub fn amount_per_page(mut self, amount: usize) -> Self {
        self.amount_per_page = clamp_amount_per_page(amount);
        self
    }

    pub fn build(self) -> ItemPipeline<T> {
        self.build_with_page(1)
    }

    fn build_with_page(self, current_page: usize) -> ItemPipeline<T> {
        ItemPipeline {
            items: self.items,
            transformer: self.transformer,
            sorters: SorterSet::new(self.sorters),
            filters: self.filters,
            searches: self.searches,
            pending_search: None,
            field_style: self.field_style,
            list_title: self.list_title,
            static_variables: self.static_variables,
            amount_per_page: self.amount_per_page,
            current_page: current_page.max(1),
            dirty: Some(Stage::Sort),
            sorted: Vec::new(),
            filtered: Vec::new(),
            window: Window::default(),
            recompute_count: 0,
        }
    }
}
