use crate::error::ViewError;
use crate::page::Page;

/// Linear navigation over a flat list of pages, for views that page through
/// siblings (next/previous) instead of drilling into children.
pub struct IndexHistory<T> {
    pages: Vec<Page<T>>,
    current: usize,
    dirty: bool,
}

impl<T> IndexHistory<T> {
    pub fn new(first: Page<T>) -> Self {
        Self {
            pages: vec![first],
            current: 0,
            dirty: true,
        }
    }

    pub fn with_page(mut self, page: Page<T>) -> Self {
        self.pages.push(page);
        self
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_page(&self) -> &Page<T> {
        &self.pages[self.current]
    }

    pub fn current_page_mut(&mut self) -> &mut Page<T> {
        &mut self.pages[self.current]
    }

    pub fn page(&self, identifier: &str) -> Option<&Page<T>> {
        self.pages
            .iter()
            .find(|page| page.identifier() == identifier)
    }

    /// Pages up to and including the current one.
    pub fn history(&self) -> &[Page<T>] {
        &self.pages[..=self.current]
    }

    /// Identifiers of the pages before the current one.
    pub fn identifier_history(&self) -> Vec<String> {
        self.pages[..self.current]
            .iter()
            .map(|page| page.identifier().to_string())
            .collect()
    }

    pub fn previous_page(&self) -> Option<&Page<T>> {
        self.current
            .checked_sub(1)
            .and_then(|index| self.pages.get(index))
    }

    pub fn has_page_history(&self) -> bool {
        self.current > 0
    }

    pub fn has_next_page(&self) -> bool {
        self.current + 1 < self.pages.len()
    }

    /// Moves to `index`, clamped into `[0, total_pages - 1]`.
    pub fn goto_index(&mut self, index: usize) {
        self.current = index.min(self.pages.len() - 1);
        self.dirty = true;
    }

    pub fn goto_page(&mut self, identifier: &str) -> Result<(), ViewError> {
        let index = self
            .pages
            .iter()
            .position(|page| page.identifier() == identifier)
            .ok_or_else(|| ViewError::page_not_found(identifier))?;
        self.goto_index(index);
        Ok(())
    }

    pub fn goto_next_page(&mut self) {
        self.goto_index(self.current.saturating_add(1));
    }

    pub fn goto_previous_page(&mut self) {
        self.goto_index(self.current.saturating_sub(1));
    }

    pub fn edit_current_page<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut Page<T>),
    {
        edit(self.current_page_mut());
        self.dirty = true;
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
