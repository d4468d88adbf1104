use pretty_assertions::assert_eq;
use viewkit_core::LifecycleCache;
use viewkit_core::Page;
use viewkit_core::ViewError;
use viewkit_core::ViewSession;
use viewkit_core::history::TreeHistory;
use viewkit_core::pipeline::ItemPipeline;
use viewkit_core::pipeline::RenderedItem;

fn shop() -> TreeHistory<String> {
    let items: Vec<String> = (1..=30).map(|n| format!("item {n}")).collect();
    let catalog = ItemPipeline::builder(items, |item: &String, index, _| {
        Ok(Some(RenderedItem::new(format!("#{}", index + 1), item.clone())))
    })
    .amount_per_page(10)
    .build();
    let catalog = Page::builder("catalog")
        .title("Catalog")
        .pipeline(catalog)
        .build();
    let alpha = Page::builder("alpha").content("Alpha details").build();
    let home = Page::builder("home")
        .title("Shop")
        .sub_page(catalog)
        .sub_page(alpha)
        .build();
    TreeHistory::new(home)
}

#[tokio::test]
async fn sub_page_lookup_is_scoped_to_the_current_page() -> anyhow::Result<()> {
    let cache = LifecycleCache::default();
    let id = cache.put(ViewSession::builder(shop()).build()).await?;

    let mut session = cache.acquire(id).await?;
    session.history_mut().goto_sub_page("catalog")?;
    let err = session
        .history_mut()
        .goto_sub_page("alpha")
        .expect_err("alpha is a sibling");
    assert!(matches!(err, ViewError::SubPageNotFound { ref identifier } if identifier == "alpha"));
    assert_eq!(session.history().history_identifiers(), vec!["home", "catalog"]);

    let view = session.render().await?;
    assert_eq!(view.identifier, "catalog");
    Ok(())
}

#[tokio::test]
async fn popping_every_level_returns_to_the_root() -> anyhow::Result<()> {
    let cache = LifecycleCache::default();
    let id = cache.put(ViewSession::builder(shop()).build()).await?;

    let mut session = cache.acquire(id).await?;
    session.history_mut().goto_sub_page("alpha")?;
    let depth = session.history().size();
    for _ in 0..depth + 2 {
        session.history_mut().goto_previous_page();
    }
    assert_eq!(session.history().history_identifiers(), vec!["home"]);
    let view = session.render().await?;
    assert_eq!(view.body, "Shop");
    Ok(())
}

#[tokio::test]
async fn page_position_survives_across_interactions() -> anyhow::Result<()> {
    let cache = LifecycleCache::default();
    let id = cache.put(ViewSession::builder(shop()).build()).await?;

    {
        let mut session = cache.acquire(id).await?;
        session.history_mut().goto_sub_page("catalog")?;
        session.history_mut().edit_current_page(|page| {
            if let Some(pipeline) = page.pipeline_mut() {
                pipeline.goto_next_page();
            }
        });
        let view = session.render().await?;
        assert_eq!((view.current_page, view.total_pages), (2, 3));
        session.history_mut().goto_previous_page();
    }

    let mut session = cache.acquire(id).await?;
    session.history_mut().goto_sub_page("catalog")?;
    let view = session.render().await?;
    assert_eq!(view.current_page, 2);
    assert!(view.body.starts_with("Catalog\n#11: item 11\n"));
    assert!(view.body.ends_with("# Page 2/3"));
    Ok(())
}

#[tokio::test]
async fn snapshots_describe_cached_sessions() -> anyhow::Result<()> {
    let cache = LifecycleCache::default();
    let first = cache.put(ViewSession::builder(shop()).build()).await?;
    let second = cache
        .put(ViewSession::builder(shop()).ttl_secs(60).build())
        .await?;
    {
        let mut session = cache.acquire(second).await?;
        session.history_mut().goto_sub_page("catalog")?;
        session.render().await?;
    }

    let snapshots = cache.snapshots().await;
    assert_eq!(snapshots.len(), 2);
    let second_snapshot = cache.snapshot(second).await.expect("cached");
    assert_eq!(second_snapshot.history_identifiers, vec!["home", "catalog"]);
    assert_eq!(second_snapshot.window_size, 10);
    let first_snapshot = cache.snapshot(first).await.expect("cached");
    assert_eq!(first_snapshot.history_identifiers, vec!["home"]);
    assert!(first_snapshot.last_view.is_none());
    Ok(())
}
