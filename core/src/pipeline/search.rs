use nucleo_matcher::Matcher;
use nucleo_matcher::Utf32Str;
use nucleo_matcher::pattern::AtomKind;
use nucleo_matcher::pattern::CaseMatching;
use nucleo_matcher::pattern::Normalization;
use nucleo_matcher::pattern::Pattern;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

type SearchPredicate<T> = Arc<dyn Fn(&T, &str) -> bool + Send + Sync>;

/// A labelled query box. Searches never remove items; the pipeline uses the
/// first match to decide which page to show.
pub struct Search<T> {
    label: String,
    placeholder: Option<String>,
    predicates: Vec<SearchPredicate<T>>,
    last_match: Option<String>,
}

impl<T> Clone for Search<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            placeholder: self.placeholder.clone(),
            predicates: self.predicates.clone(),
            last_match: self.last_match.clone(),
        }
    }
}

impl<T> fmt::Debug for Search<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Search")
            .field("label", &self.label)
            .field("predicates", &self.predicates.len())
            .field("last_match", &self.last_match)
            .finish()
    }
}

impl<T> Search<T> {
    pub fn builder(label: impl Into<String>) -> SearchBuilder<T> {
        SearchBuilder {
            label: label.into(),
            placeholder: None,
            predicates: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    /// The last query submitted to this search.
    pub fn last_match(&self) -> Option<&str> {
        self.last_match.as_deref()
    }

    pub(crate) fn set_last_match(&mut self, query: String) {
        self.last_match = Some(query);
    }

    pub fn matches(&self, item: &T, query: &str) -> bool {
        self.predicates.iter().any(|predicate| predicate(item, query))
    }

    pub(crate) fn first_match(&self, items: &[T], filtered: &[usize]) -> Option<usize> {
        let query = self.last_match.as_deref()?;
        filtered
            .iter()
            .position(|&item_index| self.matches(&items[item_index], query))
    }
}

pub struct SearchBuilder<T> {
    label: String,
    placeholder: Option<String>,
    predicates: Vec<SearchPredicate<T>>,
}

impl<T> SearchBuilder<T> {
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T, &str) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Parses the query as `V` before testing; a query that does not parse
    /// matches nothing.
    pub fn typed<V, F>(self, predicate: F) -> Self
    where
        V: FromStr,
        F: Fn(&T, &V) -> bool + Send + Sync + 'static,
    {
        self.predicate(move |item, query| {
            query
                .trim()
                .parse::<V>()
                .is_ok_and(|value| predicate(item, &value))
        })
    }

    /// Fuzzy-matches the query against the text `haystack` extracts.
    pub fn fuzzy<F>(self, haystack: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.predicate(move |item, query| fuzzy_matches(query, &haystack(item)))
    }

    pub fn build(self) -> Search<T> {
        Search {
            label: self.label,
            placeholder: self.placeholder,
            predicates: self.predicates,
            last_match: None,
        }
    }
}

fn fuzzy_matches(query: &str, haystack: &str) -> bool {
    if query.trim().is_empty() {
        return false;
    }
    let pattern = Pattern::new(
        query,
        CaseMatching::Smart,
        Normalization::Smart,
        AtomKind::Fuzzy,
    );
    let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);
    let mut buf = Vec::new();
    pattern
        .score(Utf32Str::new(haystack, &mut buf), &mut matcher)
        .is_some()
}
