use crate::error::ViewError;
use crate::page::Page;

/// The path from a top-level page to the current page, stored as positions:
/// `root` into the navigator's pages, then one child position per level.
/// There is always a root, so the stack can never be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HistoryStack {
    root: usize,
    path: Vec<usize>,
}

impl HistoryStack {
    fn new(root: usize) -> Self {
        Self {
            root,
            path: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.path.len() + 1
    }

    fn reset(&mut self, root: usize) {
        self.root = root;
        self.path.clear();
    }

    fn push(&mut self, child: usize) {
        self.path.push(child);
    }

    fn pop(&mut self) -> bool {
        self.path.pop().is_some()
    }
}

/// Drill-down navigation over a tree of pages.
///
/// Pages are owned by the navigator for its whole lifetime, so a page keeps
/// its pipeline state when the user navigates away from it and back.
pub struct TreeHistory<T> {
    pages: Vec<Page<T>>,
    stack: HistoryStack,
    minimum_size: usize,
    dirty: bool,
}

impl<T> Clone for TreeHistory<T> {
    fn clone(&self) -> Self {
        Self {
            pages: self.pages.clone(),
            stack: self.stack.clone(),
            minimum_size: self.minimum_size,
            dirty: true,
        }
    }
}

impl<T> TreeHistory<T> {
    /// Starts on `root`; further top-level pages are added with [`Self::with_page`].
    pub fn new(root: Page<T>) -> Self {
        Self {
            pages: vec![root],
            stack: HistoryStack::new(0),
            minimum_size: 1,
            dirty: true,
        }
    }

    pub fn with_page(mut self, page: Page<T>) -> Self {
        self.pages.push(page);
        self
    }

    /// Floor below which [`Self::goto_previous_page`] does nothing; at least 1.
    pub fn with_minimum_size(mut self, minimum_size: usize) -> Self {
        self.minimum_size = minimum_size.max(1);
        self
    }

    pub fn minimum_size(&self) -> usize {
        self.minimum_size
    }

    pub fn pages(&self) -> &[Page<T>] {
        &self.pages
    }

    pub fn page(&self, identifier: &str) -> Option<&Page<T>> {
        self.pages
            .iter()
            .find(|page| page.identifier() == identifier)
    }

    pub fn size(&self) -> usize {
        self.stack.len()
    }

    pub fn current_page(&self) -> &Page<T> {
        let mut page = &self.pages[self.stack.root];
        for &child in &self.stack.path {
            page = page.sub_page_at(child);
        }
        page
    }

    pub fn current_page_mut(&mut self) -> &mut Page<T> {
        let mut page = &mut self.pages[self.stack.root];
        for &child in &self.stack.path {
            page = page.sub_page_at_mut(child);
        }
        page
    }

    /// Pages from the root to the current page.
    pub fn history(&self) -> Vec<&Page<T>> {
        let mut page = &self.pages[self.stack.root];
        let mut history = Vec::with_capacity(self.stack.len());
        history.push(page);
        for &child in &self.stack.path {
            page = page.sub_page_at(child);
            history.push(page);
        }
        history
    }

    pub fn history_identifiers(&self) -> Vec<String> {
        self.history()
            .into_iter()
            .map(|page| page.identifier().to_string())
            .collect()
    }

    pub fn previous_page(&self) -> Option<&Page<T>> {
        let history = self.history();
        let len = history.len();
        if len < 2 {
            return None;
        }
        history.get(len - 2).copied()
    }

    pub fn has_page_history(&self) -> bool {
        self.stack.len() > 1
    }

    /// Clears the stack and starts over on the top-level page `identifier`.
    pub fn goto_page(&mut self, identifier: &str) -> Result<(), ViewError> {
        let root = self
            .pages
            .iter()
            .position(|page| page.identifier() == identifier)
            .ok_or_else(|| ViewError::page_not_found(identifier))?;
        self.stack.reset(root);
        self.dirty = true;
        Ok(())
    }

    /// Pushes the child `identifier` of the current page. Only the current
    /// page's children are considered; on failure the stack is unchanged.
    pub fn goto_sub_page(&mut self, identifier: &str) -> Result<(), ViewError> {
        let child = self
            .current_page()
            .sub_page_position(identifier)
            .ok_or_else(|| ViewError::sub_page_not_found(identifier))?;
        self.stack.push(child);
        self.dirty = true;
        Ok(())
    }

    /// Pops one level unless the stack is already at its minimum size.
    pub fn goto_previous_page(&mut self) {
        if self.stack.len() > self.minimum_size && self.stack.pop() {
            self.dirty = true;
        }
    }

    pub fn edit_current_page<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut Page<T>),
    {
        edit(self.current_page_mut());
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether navigation happened since the last call and clears
    /// the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
