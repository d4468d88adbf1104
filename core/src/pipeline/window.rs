use std::collections::BTreeMap;

pub const VAR_SIZE: &str = "SIZE";
pub const VAR_FILTERED_SIZE: &str = "FILTERED_SIZE";
pub const VAR_CACHED_SIZE: &str = "CACHED_SIZE";
pub const VAR_START_INDEX: &str = "START_INDEX";
pub const VAR_END_INDEX: &str = "END_INDEX";
pub const VAR_CURRENT_PAGE: &str = "CURRENT_PAGE";
pub const VAR_TOTAL_PAGES: &str = "TOTAL_PAGES";

/// The projection of a single item produced by a pipeline's transformer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedItem {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl RenderedItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }
}

/// How a renderer should lay out the items of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldStyle {
    /// Each item as its own field, honouring the item's `inline` flag.
    #[default]
    Default,
    Field,
    FieldInline,
    /// All items joined into one field under the list title.
    List,
}

impl FieldStyle {
    pub fn is_inline(self) -> bool {
        matches!(self, FieldStyle::FieldInline)
    }
}

/// The visible slice of a pipeline plus the counters derived while computing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub items: Vec<RenderedItem>,
    pub current_page: usize,
    pub total_pages: usize,
    pub size: usize,
    pub filtered_size: usize,
    pub start_index: usize,
    pub end_index: usize,
    /// Position in the filtered sequence of the match that moved the page,
    /// when this window was produced by a search.
    pub search_match: Option<usize>,
    pub field_style: FieldStyle,
    pub list_title: Option<String>,
    pub variables: BTreeMap<String, String>,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current_page: 1,
            total_pages: 1,
            size: 0,
            filtered_size: 0,
            start_index: 0,
            end_index: 0,
            search_match: None,
            field_style: FieldStyle::default(),
            list_title: None,
            variables: BTreeMap::new(),
        }
    }
}

impl Window {
    pub fn cached_size(&self) -> usize {
        self.items.len()
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    pub(crate) fn with_counters(mut self, statics: &BTreeMap<String, String>) -> Self {
        let mut variables = statics.clone();
        for (key, value) in [
            (VAR_SIZE, self.size),
            (VAR_FILTERED_SIZE, self.filtered_size),
            (VAR_CACHED_SIZE, self.items.len()),
            (VAR_START_INDEX, self.start_index),
            (VAR_END_INDEX, self.end_index),
            (VAR_CURRENT_PAGE, self.current_page),
            (VAR_TOTAL_PAGES, self.total_pages),
        ] {
            variables.insert(key.to_string(), value.to_string());
        }
        self.variables = variables;
        self
    }

    pub fn apply_variables(&self, template: &str) -> String {
        apply_variables(template, &self.variables)
    }
}

pub fn total_pages(filtered_size: usize, amount_per_page: usize) -> usize {
    filtered_size.div_ceil(amount_per_page.max(1)).max(1)
}

/// Replaces `{NAME}` placeholders with their values. Unknown names and
/// unterminated braces are left untouched.
pub fn apply_variables(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            output.push_str(&rest[open..]);
            return output;
        };
        let name = &after[..close];
        match variables.get(name) {
            Some(value) => output.push_str(value),
            None => {
                output.push('{');
                output.push_str(name);
                output.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    output.push_str(rest);
    output
}
