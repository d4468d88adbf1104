use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use viewkit_core::LifecycleCache;
use viewkit_core::Page;
use viewkit_core::SessionSnapshot;
use viewkit_core::ViewCacheConfig;
use viewkit_core::ViewError;
use viewkit_core::ViewSession;
use viewkit_core::finalize_fn;
use viewkit_core::history::TreeHistory;
use viewkit_core::pipeline::ItemPipeline;
use viewkit_core::pipeline::RenderedItem;

fn session_with_finalize(
    ttl_secs: u64,
    finalized: mpsc::UnboundedSender<SessionSnapshot>,
) -> ViewSession<u32> {
    ViewSession::builder(TreeHistory::new(Page::builder("home").build()))
        .ttl_secs(ttl_secs)
        .finalize(finalize_fn(move |snapshot| {
            let finalized = finalized.clone();
            async move {
                finalized.send(snapshot)?;
                anyhow::Ok(())
            }
        }))
        .build()
}

fn fast_sweep() -> ViewCacheConfig {
    ViewCacheConfig {
        sweep_interval_ms: 100,
        ..ViewCacheConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn touched_session_expires_one_ttl_after_last_activity() -> anyhow::Result<()> {
    let cache = Arc::new(LifecycleCache::new(fast_sweep()));
    let sweeper = cache.spawn_sweeper();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = cache.put(session_with_finalize(5, tx)).await?;

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(cache.touch(id).await);

    tokio::time::sleep(Duration::from_millis(4_800)).await;
    assert!(cache.contains(id).await, "evicted before the TTL elapsed");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!cache.contains(id).await, "still cached after the TTL elapsed");

    let snapshot = rx.recv().await.expect("finalized");
    assert_eq!(snapshot.session_id, id);
    assert_eq!(snapshot.history_identifiers, vec!["home"]);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(rx.try_recv().is_err(), "finalize ran more than once");
    let err = cache.acquire(id).await.err().expect("evicted");
    assert!(matches!(err, ViewError::SessionNotFound { .. }));

    sweeper.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn interaction_in_flight_delays_eviction() -> anyhow::Result<()> {
    let cache = Arc::new(LifecycleCache::new(fast_sweep()));
    let sweeper = cache.spawn_sweeper();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = cache.put(session_with_finalize(5, tx)).await?;

    let guard = cache.acquire(id).await?;
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(cache.contains(id).await);
    drop(guard);

    tokio::time::sleep(Duration::from_millis(4_800)).await;
    assert!(cache.contains(id).await);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!cache.contains(id).await);
    assert!(rx.recv().await.is_some());

    sweeper.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn explicit_removal_never_finalizes() -> anyhow::Result<()> {
    let cache = Arc::new(LifecycleCache::new(fast_sweep()));
    let sweeper = cache.spawn_sweeper();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = cache.put(session_with_finalize(5, tx)).await?;

    assert!(cache.remove(id).await);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(rx.try_recv().is_err());
    assert!(cache.is_empty().await);

    sweeper.shutdown().await;
    Ok(())
}

fn numbered_session(ttl_secs: u64) -> ViewSession<u32> {
    let pipeline = ItemPipeline::builder((0..42).collect(), |item: &u32, _, _| {
        Ok(Some(RenderedItem::new(format!("#{item}"), item.to_string())))
    })
    .amount_per_page(10)
    .build();
    ViewSession::builder(TreeHistory::new(
        Page::builder("numbers").pipeline(pipeline).build(),
    ))
    .ttl_secs(ttl_secs)
    .build()
}

fn recompute_count(session: &ViewSession<u32>) -> Option<u64> {
    session
        .history()
        .current_page()
        .pipeline()
        .map(ItemPipeline::recompute_count)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_touches_survive_concurrent_sweeps() -> anyhow::Result<()> {
    let cache = Arc::new(LifecycleCache::new(ViewCacheConfig {
        sweep_interval_ms: 1,
        ..ViewCacheConfig::default()
    }));
    let id = cache.put(numbered_session(2)).await?;
    let (before, recomputed_before) = {
        let mut session = cache.acquire(id).await?;
        if let Some(pipeline) = session.history_mut().current_page_mut().pipeline_mut() {
            pipeline.goto_page(3);
        }
        (session.window()?, recompute_count(&session))
    };
    assert_eq!(before.current_page, 3);

    let sweeper = cache.spawn_sweeper();
    let mut touches = Vec::with_capacity(1_000);
    let mut sweeps = Vec::with_capacity(50);
    for n in 0..1_000 {
        let touch_cache = Arc::clone(&cache);
        touches.push(tokio::spawn(async move { touch_cache.touch(id).await }));
        if n % 20 == 0 {
            let cache = Arc::clone(&cache);
            sweeps.push(tokio::spawn(async move { cache.sweep().await }));
        }
    }
    for task in touches {
        assert!(task.await?, "session evicted while touches were in flight");
    }
    for task in sweeps {
        assert_eq!(task.await?, Vec::new());
    }
    sweeper.shutdown().await;

    assert_eq!(cache.len().await, 1);
    let mut session = cache.acquire(id).await?;
    assert_eq!(session.window()?, before);
    assert_eq!(recompute_count(&session), recomputed_before);
    drop(session);

    let info = cache.info(id).await.expect("cached");
    assert!(info.last_activity_at >= info.created_at);
    assert_eq!(info.ttl, Duration::from_secs(2));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_interactions_are_serialized() -> anyhow::Result<()> {
    let cache = Arc::new(LifecycleCache::<u32>::default());
    let session = ViewSession::builder(TreeHistory::new(
        Page::builder("home")
            .sub_page(Page::builder("child").build())
            .build(),
    ))
    .ttl_secs(300)
    .build();
    let id = cache.put(session).await?;

    let mut tasks = Vec::new();
    for _ in 0..64 {
        let cache = Arc::clone(&cache);
        tasks.push(tokio::spawn(async move {
            let mut session = cache.acquire(id).await?;
            session.history_mut().goto_sub_page("child")?;
            tokio::task::yield_now().await;
            assert_eq!(session.history().size(), 2);
            session.history_mut().goto_previous_page();
            Ok::<(), ViewError>(())
        }));
    }
    for task in tasks {
        task.await??;
    }

    let session = cache.acquire(id).await?;
    assert_eq!(session.history().history_identifiers(), vec!["home"]);
    Ok(())
}
