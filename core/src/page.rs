use crate::error::ViewError;
use crate::pipeline::ItemPipeline;
use crate::pipeline::Window;

/// One navigable node of a view: an identifier, optional text, an optional
/// item pipeline and the sub-pages reachable from it.
pub struct Page<T> {
    identifier: String,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    pipeline: Option<ItemPipeline<T>>,
    sub_pages: Vec<Page<T>>,
}

impl<T> Clone for Page<T> {
    fn clone(&self) -> Self {
        Self {
            identifier: self.identifier.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            content: self.content.clone(),
            pipeline: self.pipeline.clone(),
            sub_pages: self.sub_pages.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Page<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("identifier", &self.identifier)
            .field("has_pipeline", &self.pipeline.is_some())
            .field("sub_pages", &self.sub_pages.len())
            .finish()
    }
}

impl<T> Page<T> {
    pub fn builder(identifier: impl Into<String>) -> PageBuilder<T> {
        PageBuilder {
            page: Page {
                identifier: identifier.into(),
                title: None,
                description: None,
                content: None,
                pipeline: None,
                sub_pages: Vec::new(),
            },
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn set_content(&mut self, content: Option<String>) {
        self.content = content;
    }

    pub fn pipeline(&self) -> Option<&ItemPipeline<T>> {
        self.pipeline.as_ref()
    }

    pub fn pipeline_mut(&mut self) -> Option<&mut ItemPipeline<T>> {
        self.pipeline.as_mut()
    }

    pub fn sub_pages(&self) -> &[Page<T>] {
        &self.sub_pages
    }

    pub fn sub_page(&self, identifier: &str) -> Option<&Page<T>> {
        self.sub_pages
            .iter()
            .find(|page| page.identifier == identifier)
    }

    pub(crate) fn sub_page_position(&self, identifier: &str) -> Option<usize> {
        self.sub_pages
            .iter()
            .position(|page| page.identifier == identifier)
    }

    pub(crate) fn sub_page_at(&self, index: usize) -> &Page<T> {
        &self.sub_pages[index]
    }

    pub(crate) fn sub_page_at_mut(&mut self, index: usize) -> &mut Page<T> {
        &mut self.sub_pages[index]
    }

    /// The window of this page's pipeline, or an empty single page when the
    /// page hosts no items.
    pub fn window(&mut self) -> Result<Window, ViewError> {
        match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.window().cloned(),
            None => Ok(Window::default()),
        }
    }

    pub fn to_builder(&self) -> PageBuilder<T> {
        PageBuilder { page: self.clone() }
    }
}

pub struct PageBuilder<T> {
    page: Page<T>,
}

impl<T> PageBuilder<T> {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.page.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.page.description = Some(description.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.page.content = Some(content.into());
        self
    }

    pub fn pipeline(mut self, pipeline: ItemPipeline<T>) -> Self {
        self.page.pipeline = Some(pipeline);
        self
    }

    pub fn sub_page(mut self, page: Page<T>) -> Self {
        self.page.sub_pages.push(page);
        self
    }

    pub fn build(self) -> Page<T> {
        self.page
    }
}
