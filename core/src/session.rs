use crate::config::DEFAULT_TTL_SECS;
use crate::config::clamp_ttl;
use crate::error::ViewError;
use crate::history::TreeHistory;
use crate::pipeline::Window;
use crate::render::PlainTextRenderer;
use crate::render::RenderedView;
use crate::render::Renderer;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Runs once when the session is evicted by the sweeper, never on explicit
/// removal. Failures are logged by the sweeper.
pub type FinalizeFn =
    Arc<dyn Fn(SessionSnapshot) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wraps an async closure as a [`FinalizeFn`].
pub fn finalize_fn<F, Fut>(finalize: F) -> FinalizeFn
where
    F: Fn(SessionSnapshot) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |snapshot| Box::pin(finalize(snapshot)))
}

/// Observable state of a session, used for diagnostics and handed to the
/// finalize callback on eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub created_at: OffsetDateTime,
    pub last_activity_at: OffsetDateTime,
    pub ttl: Duration,
    pub history_identifiers: Vec<String>,
    pub current_page: usize,
    pub total_pages: usize,
    pub filtered_size: usize,
    pub window_size: usize,
    pub last_view: Option<RenderedView>,
}

/// The cached state of one interactive view: its page tree, the current
/// navigation path and how it renders.
pub struct ViewSession<T> {
    id: SessionId,
    created_at: OffsetDateTime,
    ttl: Duration,
    history: TreeHistory<T>,
    renderer: Arc<dyn Renderer<T>>,
    finalize: Option<FinalizeFn>,
    last_view: Option<RenderedView>,
}

impl<T> fmt::Debug for ViewSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewSession")
            .field("id", &self.id)
            .field("ttl", &self.ttl)
            .field("history", &self.history.history_identifiers())
            .finish()
    }
}

impl<T: Send + Sync + 'static> ViewSession<T> {
    pub fn builder(history: TreeHistory<T>) -> ViewSessionBuilder<T> {
        ViewSessionBuilder {
            id: None,
            history,
            ttl: clamp_ttl(DEFAULT_TTL_SECS),
            renderer: None,
            finalize: None,
        }
    }

    /// A copy with a fresh id and the given TTL. Page pipelines in the copy
    /// start with empty caches.
    pub fn with_ttl(&self, secs: u64) -> Self {
        Self {
            id: SessionId::new(),
            created_at: OffsetDateTime::now_utc(),
            ttl: clamp_ttl(secs),
            history: self.history.clone(),
            renderer: Arc::clone(&self.renderer),
            finalize: self.finalize.clone(),
            last_view: None,
        }
    }
}

impl<T> ViewSession<T> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn history(&self) -> &TreeHistory<T> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut TreeHistory<T> {
        &mut self.history
    }

    pub fn last_view(&self) -> Option<&RenderedView> {
        self.last_view.as_ref()
    }

    pub(crate) fn finalize(&self) -> Option<FinalizeFn> {
        self.finalize.clone()
    }

    /// The current page's window, recomputing it if navigation or pipeline
    /// changes invalidated it.
    pub fn window(&mut self) -> Result<Window, ViewError> {
        self.history.current_page_mut().window()
    }

    /// Renders the current page. The page's pipeline stays dirty on failure
    /// so the next call retries cleanly.
    pub async fn render(&mut self) -> Result<RenderedView, ViewError> {
        let window = match self.window() {
            Ok(window) => window,
            Err(err) => {
                warn!(session_id = %self.id, error = ?err, "failed to compute view window");
                return Err(err);
            }
        };
        let renderer = Arc::clone(&self.renderer);
        let view = match renderer.render(self.history.current_page(), &window).await {
            Ok(view) => view,
            Err(err) => {
                warn!(session_id = %self.id, error = ?err, "renderer failed");
                return Err(ViewError::render(err));
            }
        };
        self.history.take_dirty();
        self.last_view = Some(view.clone());
        Ok(view)
    }

    pub(crate) fn snapshot(&self, last_activity_at: OffsetDateTime) -> SessionSnapshot {
        let page = self.history.current_page();
        let window = page
            .pipeline()
            .map(|pipeline| pipeline.cached_window().clone())
            .unwrap_or_default();
        SessionSnapshot {
            session_id: self.id,
            created_at: self.created_at,
            last_activity_at,
            ttl: self.ttl,
            history_identifiers: self.history.history_identifiers(),
            current_page: window.current_page,
            total_pages: window.total_pages,
            filtered_size: window.filtered_size,
            window_size: window.cached_size(),
            last_view: self.last_view.clone(),
        }
    }
}

pub struct ViewSessionBuilder<T> {
    id: Option<SessionId>,
    history: TreeHistory<T>,
    ttl: Duration,
    renderer: Option<Arc<dyn Renderer<T>>>,
    finalize: Option<FinalizeFn>,
}

impl<T: Send + Sync + 'static> ViewSessionBuilder<T> {
    /// Uses a caller-chosen id instead of a random one.
    pub fn id(mut self, id: SessionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Clamped into `[5, 300]` seconds.
    pub fn ttl_secs(mut self, secs: u64) -> Self {
        self.ttl = clamp_ttl(secs);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn Renderer<T>>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn finalize(mut self, finalize: FinalizeFn) -> Self {
        self.finalize = Some(finalize);
        self
    }

    pub fn build(self) -> ViewSession<T> {
        ViewSession {
            id: self.id.unwrap_or_default(),
            created_at: OffsetDateTime::now_utc(),
            ttl: self.ttl,
            history: self.history,
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(PlainTextRenderer::default())),
            finalize: self.finalize,
            last_view: None,
        }
    }
}
