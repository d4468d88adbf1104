//! Time-to-live cache of view sessions.
//!
//! Activity is tracked outside the per-session lock so `touch` never waits on
//! an in-flight interaction. Interactions hold the per-session lock for their
//! whole duration; the sweeper only evicts sessions whose lock it can take
//! without waiting, so a session is never evicted mid-interaction. Every
//! removal path marks the entry detached, so guards still waiting on the
//! lock fail instead of reaching a session the cache no longer owns.

use crate::config::ViewCacheConfig;
use crate::error::ViewError;
use crate::session::FinalizeFn;
use crate::session::SessionId;
use crate::session::SessionSnapshot;
use crate::session::ViewSession;
use std::collections::HashMap;
use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use tracing::debug;
use tracing::info;
use tracing::warn;

struct ActivityClock {
    started: Instant,
    created_at: OffsetDateTime,
    last_activity_ns: AtomicU64,
}

impl ActivityClock {
    fn new(created_at: OffsetDateTime) -> Self {
        Self {
            started: Instant::now(),
            created_at,
            last_activity_ns: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        let elapsed = Instant::now().saturating_duration_since(self.started);
        let elapsed_ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.last_activity_ns.fetch_max(elapsed_ns, Ordering::AcqRel);
    }

    fn since_start(&self) -> Duration {
        Duration::from_nanos(self.last_activity_ns.load(Ordering::Acquire))
    }

    fn last_activity(&self) -> Instant {
        self.started + self.since_start()
    }

    fn last_activity_at(&self) -> OffsetDateTime {
        self.created_at + self.since_start()
    }
}

type SessionCell<T> = Arc<Mutex<ViewSession<T>>>;

struct SessionEntry<T> {
    cell: SessionCell<T>,
    activity: Arc<ActivityClock>,
    detached: Arc<AtomicBool>,
    ttl: Duration,
}

impl<T> SessionEntry<T> {
    /// Marks the entry as no longer owned by the cache. Must be called
    /// before the entry leaves the map.
    fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.activity.last_activity()) >= self.ttl
    }

    fn info(&self, session_id: SessionId) -> SessionInfo {
        SessionInfo {
            session_id,
            created_at: self.activity.created_at,
            last_activity_at: self.activity.last_activity_at(),
            idle: Instant::now().saturating_duration_since(self.activity.last_activity()),
            ttl: self.ttl,
        }
    }
}

/// Lock-free metadata about a cached session, as seen by [`LifecycleCache::remove_if`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub created_at: OffsetDateTime,
    pub last_activity_at: OffsetDateTime,
    pub idle: Duration,
    pub ttl: Duration,
}

/// Exclusive access to a cached session for the duration of one interaction.
pub struct SessionGuard<T> {
    cell: OwnedMutexGuard<ViewSession<T>>,
    activity: Option<Arc<ActivityClock>>,
}

impl<T> Deref for SessionGuard<T> {
    type Target = ViewSession<T>;

    fn deref(&self) -> &Self::Target {
        &self.cell
    }
}

impl<T> DerefMut for SessionGuard<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cell
    }
}

impl<T> Drop for SessionGuard<T> {
    fn drop(&mut self) {
        if let Some(activity) = &self.activity {
            activity.touch();
        }
    }
}

/// A reference to a cached session obtained without refreshing its TTL.
pub struct SessionHandle<T> {
    session_id: SessionId,
    cell: SessionCell<T>,
    detached: Arc<AtomicBool>,
}

impl<T> SessionHandle<T> {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Waits for exclusive access. Fails when the session was evicted or
    /// removed in the meantime.
    pub async fn lock(&self) -> Result<SessionGuard<T>, ViewError> {
        let cell = Arc::clone(&self.cell).lock_owned().await;
        if self.detached.load(Ordering::Acquire) {
            return Err(ViewError::session_not_found(self.session_id));
        }
        Ok(SessionGuard {
            cell,
            activity: None,
        })
    }
}

pub struct LifecycleCache<T> {
    config: ViewCacheConfig,
    sessions: Mutex<HashMap<SessionId, SessionEntry<T>>>,
}

impl<T> Default for LifecycleCache<T> {
    fn default() -> Self {
        Self::new(ViewCacheConfig::default())
    }
}

impl<T> LifecycleCache<T> {
    pub fn new(config: ViewCacheConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ViewCacheConfig {
        &self.config
    }

    pub async fn put(&self, session: ViewSession<T>) -> Result<SessionId, ViewError> {
        let session_id = session.id();
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&session_id) {
            return Err(ViewError::duplicate_session(session_id));
        }
        let entry = SessionEntry {
            activity: Arc::new(ActivityClock::new(session.created_at())),
            ttl: session.ttl(),
            detached: Arc::new(AtomicBool::new(false)),
            cell: Arc::new(Mutex::new(session)),
        };
        sessions.insert(session_id, entry);
        debug!(session_id = %session_id, "cached view session");
        Ok(session_id)
    }

    /// Looks the session up without refreshing its TTL.
    pub async fn get(&self, session_id: SessionId) -> Option<SessionHandle<T>> {
        let sessions = self.sessions.lock().await;
        sessions.get(&session_id).map(|entry| SessionHandle {
            session_id,
            cell: Arc::clone(&entry.cell),
            detached: Arc::clone(&entry.detached),
        })
    }

    pub async fn contains(&self, session_id: SessionId) -> bool {
        self.sessions.lock().await.contains_key(&session_id)
    }

    /// Resets the session's idle timer. Returns false when the session is
    /// not cached.
    pub async fn touch(&self, session_id: SessionId) -> bool {
        let activity = {
            let sessions = self.sessions.lock().await;
            sessions
                .get(&session_id)
                .map(|entry| Arc::clone(&entry.activity))
        };
        let Some(activity) = activity else {
            return false;
        };
        activity.touch();
        true
    }

    /// Touches the session and waits for exclusive access to it. The idle
    /// timer is refreshed again when the returned guard is dropped.
    pub async fn acquire(&self, session_id: SessionId) -> Result<SessionGuard<T>, ViewError> {
        let (cell, activity, detached) = {
            let sessions = self.sessions.lock().await;
            let entry = sessions
                .get(&session_id)
                .ok_or_else(|| ViewError::session_not_found(session_id))?;
            (
                Arc::clone(&entry.cell),
                Arc::clone(&entry.activity),
                Arc::clone(&entry.detached),
            )
        };
        activity.touch();
        let cell = cell.lock_owned().await;
        if detached.load(Ordering::Acquire) {
            return Err(ViewError::session_not_found(session_id));
        }
        Ok(SessionGuard {
            cell,
            activity: Some(activity),
        })
    }

    /// Drops the session without running its finalize callback. Guards
    /// still waiting on the session fail with `SessionNotFound`; an
    /// interaction already holding the lock runs to completion.
    pub async fn remove(&self, session_id: SessionId) -> bool {
        let entry = self.sessions.lock().await.remove(&session_id);
        let Some(entry) = entry else {
            return false;
        };
        entry.detach();
        debug!(session_id = %session_id, "removed view session");
        true
    }

    /// Drops every session `predicate` selects, without finalizing them.
    pub async fn remove_if<F>(&self, predicate: F) -> usize
    where
        F: Fn(&SessionInfo) -> bool,
    {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|session_id, entry| {
            if !predicate(&entry.info(*session_id)) {
                return true;
            }
            entry.detach();
            false
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.lock().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn info(&self, session_id: SessionId) -> Option<SessionInfo> {
        let sessions = self.sessions.lock().await;
        sessions.get(&session_id).map(|entry| entry.info(session_id))
    }

    /// Waits for the session's lock and reports its observable state.
    pub async fn snapshot(&self, session_id: SessionId) -> Option<SessionSnapshot> {
        let (cell, activity, detached) = {
            let sessions = self.sessions.lock().await;
            let entry = sessions.get(&session_id)?;
            (
                Arc::clone(&entry.cell),
                Arc::clone(&entry.activity),
                Arc::clone(&entry.detached),
            )
        };
        let session = cell.lock().await;
        if detached.load(Ordering::Acquire) {
            return None;
        }
        Some(session.snapshot(activity.last_activity_at()))
    }

    pub async fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots = Vec::new();
        for session_id in self.ids().await {
            if let Some(snapshot) = self.snapshot(session_id).await {
                snapshots.push(snapshot);
            }
        }
        snapshots.sort_by_key(|snapshot| snapshot.created_at);
        snapshots
    }
}

impl<T: Send + Sync + 'static> LifecycleCache<T> {
    /// Evicts every session idle for at least its TTL as of a single `now`.
    ///
    /// Each expired session is removed from the map before its finalize
    /// callback is spawned, so no interaction can reach a session that is
    /// being finalized. Sessions with an interaction in flight are skipped
    /// until a later tick. Returns the evicted ids.
    pub async fn sweep(&self) -> Vec<SessionId> {
        let now = Instant::now();
        let mut evicted: Vec<(SessionId, SessionSnapshot, Option<FinalizeFn>)> = Vec::new();
        {
            let mut sessions = self.sessions.lock().await;
            let expired: Vec<SessionId> = sessions
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(session_id, _)| *session_id)
                .collect();
            for session_id in expired {
                let Some(entry) = sessions.get(&session_id) else {
                    continue;
                };
                let Ok(session) = Arc::clone(&entry.cell).try_lock_owned() else {
                    debug!(session_id = %session_id, "view session busy; deferring eviction");
                    continue;
                };
                if !entry.is_expired(now) {
                    continue;
                }
                let snapshot = session.snapshot(entry.activity.last_activity_at());
                let finalize = session.finalize();
                entry.detach();
                sessions.remove(&session_id);
                evicted.push((session_id, snapshot, finalize));
            }
        }

        let mut ids = Vec::with_capacity(evicted.len());
        for (session_id, snapshot, finalize) in evicted {
            debug!(session_id = %session_id, "evicted idle view session");
            ids.push(session_id);
            let Some(finalize) = finalize else {
                continue;
            };
            tokio::spawn(
                async move {
                    if let Err(err) = finalize(snapshot).await {
                        warn!(session_id = %session_id, error = ?err, "view session finalize failed");
                    }
                }
                .in_current_span(),
            );
        }
        ids
    }

    /// Spawns the periodic sweep at the configured interval.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperHandle {
        let interval = self.config.sweep_interval();
        let shutdown = CancellationToken::new();
        let cancel = shutdown.clone();
        let cache = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = cache.sweep().await;
                        if !evicted.is_empty() {
                            debug!(count = evicted.len(), "view cache sweep evicted sessions");
                        }
                    }
                }
            }
            info!("view cache sweeper stopped");
        });
        SweeperHandle {
            shutdown,
            task: Some(task),
        }
    }
}

/// Owns the background sweep task; dropping it stops the sweeper.
pub struct SweeperHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            warn!(error = ?err, "view cache sweeper task failed");
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::TreeHistory;
    use crate::page::Page;
    use crate::session::finalize_fn;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;
    use tracing_test::traced_test;

    fn session_with_ttl(ttl_secs: u64) -> ViewSession<u32> {
        ViewSession::builder(TreeHistory::new(Page::builder("home").build()))
            .ttl_secs(ttl_secs)
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_put_is_rejected() {
        let cache = LifecycleCache::default();
        let id = cache.put(session_with_ttl(5)).await.expect("first put");
        let duplicate = ViewSession::builder(TreeHistory::new(Page::<u32>::builder("home").build()))
            .id(id)
            .build();
        let err = cache.put(duplicate).await.expect_err("duplicate");
        assert!(matches!(err, ViewError::DuplicateSession { session_id } if session_id == id));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn get_does_not_refresh_ttl() {
        let cache = LifecycleCache::default();
        let id = cache.put(session_with_ttl(5)).await.expect("put");
        tokio::time::advance(Duration::from_secs(4)).await;
        let handle = cache.get(id).await.expect("cached");
        drop(handle.lock().await.expect("lock"));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.sweep().await, vec![id]);
    }

    #[tokio::test(start_paused = true)]
    async fn touch_on_missing_session_is_noop() {
        let cache = LifecycleCache::<u32>::default();
        assert!(!cache.touch(SessionId::new()).await);
        let err = cache.acquire(SessionId::new()).await.err().expect("missing");
        assert!(err.is_recoverable());
    }

    #[tokio::test(start_paused = true)]
    async fn remove_skips_finalize() {
        let cache = LifecycleCache::default();
        let finalized = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finalized);
        let session = ViewSession::builder(TreeHistory::new(Page::<u32>::builder("home").build()))
            .finalize(finalize_fn(move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    anyhow::Ok(())
                }
            }))
            .build();
        let id = cache.put(session).await.expect("put");
        assert!(cache.remove(id).await);
        assert!(!cache.remove(id).await);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(cache.sweep().await.is_empty());
        tokio::task::yield_now().await;
        assert_eq!(finalized.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_if_selects_by_metadata() {
        let cache = LifecycleCache::default();
        let short = cache.put(session_with_ttl(5)).await.expect("put");
        let long = cache.put(session_with_ttl(120)).await.expect("put");
        let removed = cache
            .remove_if(|info| info.ttl > Duration::from_secs(60))
            .await;
        assert_eq!(removed, 1);
        assert!(cache.contains(short).await);
        assert!(!cache.contains(long).await);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_session_survives_sweep() {
        let cache = LifecycleCache::default();
        let id = cache.put(session_with_ttl(5)).await.expect("put");
        let guard = cache.acquire(id).await.expect("acquire");
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(cache.sweep().await.is_empty());
        drop(guard);
        assert!(cache.sweep().await.is_empty());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.sweep().await, vec![id]);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_reports_eviction() {
        let cache = LifecycleCache::default();
        let id = cache.put(session_with_ttl(5)).await.expect("put");
        let handle = cache.get(id).await.expect("cached");
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.sweep().await, vec![id]);
        let err = handle.lock().await.err().expect("evicted");
        assert!(matches!(err, ViewError::SessionNotFound { .. }));
        assert!(cache.snapshot(id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn handle_reports_removal() {
        let cache = LifecycleCache::default();
        let id = cache.put(session_with_ttl(5)).await.expect("put");
        let handle = cache.get(id).await.expect("cached");
        assert!(cache.remove(id).await);
        let err = handle.lock().await.err().expect("removed");
        assert!(matches!(err, ViewError::SessionNotFound { session_id } if session_id == id));
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_acquire_fails_after_removal() {
        let cache = Arc::new(LifecycleCache::default());
        let id = cache.put(session_with_ttl(5)).await.expect("put");
        let guard = cache.acquire(id).await.expect("acquire");

        let waiting = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.acquire(id).await.map(|_| ()) })
        };
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(!waiting.is_finished());

        assert!(cache.remove(id).await);
        drop(guard);
        let err = waiting.await.expect("join").err().expect("removed");
        assert!(matches!(err, ViewError::SessionNotFound { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_handle_fails_after_remove_if() {
        let cache = Arc::new(LifecycleCache::default());
        let id = cache.put(session_with_ttl(5)).await.expect("put");
        let handle = cache.get(id).await.expect("cached");
        let guard = cache.acquire(id).await.expect("acquire");

        let waiting = tokio::spawn(async move { handle.lock().await.map(|_| ()) });
        tokio::task::yield_now().await;

        assert_eq!(cache.remove_if(|_| true).await, 1);
        drop(guard);
        let err = waiting.await.expect("join").err().expect("removed");
        assert!(matches!(err, ViewError::SessionNotFound { .. }));
        assert!(cache.snapshot(id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sub_millisecond_touch_is_not_truncated() {
        let cache = LifecycleCache::default();
        let id = cache.put(session_with_ttl(5)).await.expect("put");
        tokio::time::advance(Duration::from_micros(4_000_900)).await;
        assert!(cache.touch(id).await);

        tokio::time::advance(Duration::from_micros(4_999_500)).await;
        assert!(cache.sweep().await.is_empty(), "evicted before a full TTL");

        tokio::time::advance(Duration::from_micros(500)).await;
        assert_eq!(cache.sweep().await, vec![id]);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn finalize_failure_is_logged_and_isolated() {
        let cache = LifecycleCache::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        for fail in [true, false] {
            let tx = tx.clone();
            let session =
                ViewSession::builder(TreeHistory::new(Page::<u32>::builder("home").build()))
                    .ttl_secs(5)
                    .finalize(finalize_fn(move |snapshot: SessionSnapshot| {
                        let tx = tx.clone();
                        async move {
                            if fail {
                                anyhow::bail!("could not strip components");
                            }
                            let _ = tx.send(snapshot.session_id);
                            Ok(())
                        }
                    }))
                    .build();
            cache.put(session).await.expect("put");
        }
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.sweep().await.len(), 2);
        assert!(rx.recv().await.is_some());
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(logs_contain("view session finalize failed"));
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_stops_on_shutdown() {
        let cache = Arc::new(LifecycleCache::<u32>::default());
        let sweeper = cache.spawn_sweeper();
        assert!(sweeper.is_running());
        sweeper.shutdown().await;
        let id = cache.put(session_with_ttl(5)).await.expect("put");
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(cache.contains(id).await);
    }
}
