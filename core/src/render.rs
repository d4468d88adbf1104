use crate::page::Page;
use crate::pipeline::FieldStyle;
use crate::pipeline::RenderedItem;
use crate::pipeline::Window;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_FOOTER: &str = "Page {CURRENT_PAGE}/{TOTAL_PAGES}";

/// The platform representation produced for one render of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    pub identifier: String,
    pub body: String,
    pub current_page: usize,
    pub total_pages: usize,
}

/// Turns the current page and its window into a [`RenderedView`].
#[async_trait]
pub trait Renderer<T>: Send + Sync {
    async fn render(&self, page: &Page<T>, window: &Window) -> anyhow::Result<RenderedView>;
}

/// Looks up decorative glyphs (emoji, bullets) by key.
pub trait GlyphResolver: Send + Sync {
    fn glyph(&self, key: &str) -> Option<String>;
}

impl GlyphResolver for HashMap<String, String> {
    fn glyph(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

pub struct PlainTextRenderer {
    glyphs: Arc<dyn GlyphResolver>,
    footer: String,
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new(Arc::new(HashMap::new()))
    }
}

impl PlainTextRenderer {
    pub fn new(glyphs: Arc<dyn GlyphResolver>) -> Self {
        Self {
            glyphs,
            footer: DEFAULT_FOOTER.to_string(),
        }
    }

    /// Footer template; `{NAME}` placeholders are filled from the window's variables.
    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }

    fn glyph_or(&self, key: &str, fallback: &str) -> String {
        self.glyphs
            .glyph(key)
            .unwrap_or_else(|| fallback.to_string())
    }

    fn render_items(&self, window: &Window) -> Vec<String> {
        match window.field_style {
            FieldStyle::Default => {
                let mut lines: Vec<String> = Vec::new();
                let mut inline_run: Vec<String> = Vec::new();
                for item in &window.items {
                    if item.inline {
                        inline_run.push(field_line(item));
                        continue;
                    }
                    if !inline_run.is_empty() {
                        lines.push(inline_run.join(" | "));
                        inline_run.clear();
                    }
                    lines.push(field_line(item));
                }
                if !inline_run.is_empty() {
                    lines.push(inline_run.join(" | "));
                }
                lines
            }
            FieldStyle::Field => window.items.iter().map(field_line).collect(),
            FieldStyle::FieldInline => {
                let joined = window
                    .items
                    .iter()
                    .map(field_line)
                    .collect::<Vec<_>>()
                    .join(" | ");
                if joined.is_empty() {
                    Vec::new()
                } else {
                    vec![joined]
                }
            }
            FieldStyle::List => {
                let bullet = self.glyph_or("bullet", "-");
                let mut lines = Vec::with_capacity(window.items.len() + 1);
                if let Some(title) = &window.list_title {
                    lines.push(window.apply_variables(title));
                }
                lines.extend(
                    window
                        .items
                        .iter()
                        .map(|item| format!("{bullet} {}", item.value)),
                );
                lines
            }
        }
    }
}

fn field_line(item: &RenderedItem) -> String {
    format!("{}: {}", item.name, item.value)
}

#[async_trait]
impl<T: Send + Sync> Renderer<T> for PlainTextRenderer {
    async fn render(&self, page: &Page<T>, window: &Window) -> anyhow::Result<RenderedView> {
        let mut lines = Vec::new();
        let heading = page.title().unwrap_or(page.identifier());
        lines.push(match self.glyphs.glyph(page.identifier()) {
            Some(glyph) => format!("{glyph} {heading}"),
            None => heading.to_string(),
        });
        if let Some(description) = page.description() {
            lines.push(description.to_string());
        }
        if let Some(content) = page.content() {
            lines.push(window.apply_variables(content));
        }
        lines.extend(self.render_items(window));
        if page.pipeline().is_some() {
            lines.push(format!(
                "{} {}",
                self.glyph_or("page", "#"),
                window.apply_variables(&self.footer)
            ));
        }
        Ok(RenderedView {
            identifier: page.identifier().to_string(),
            body: lines.join("\n"),
            current_page: window.current_page,
            total_pages: window.total_pages,
        })
    }
}
