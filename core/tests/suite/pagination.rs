use pretty_assertions::assert_eq;
use viewkit_core::pipeline::Filter;
use viewkit_core::pipeline::ItemPipeline;
use viewkit_core::pipeline::RenderedItem;
use viewkit_core::pipeline::Search;
use viewkit_core::pipeline::SortOrder;
use viewkit_core::pipeline::Sorter;

#[derive(Debug, Clone)]
struct Card {
    id: u32,
    name: String,
    rarity: u8,
}

fn deck(size: u32) -> Vec<Card> {
    (0..size)
        .map(|id| Card {
            id,
            name: format!("card-{id:02}"),
            rarity: (id % 3) as u8,
        })
        .collect()
}

fn pipeline(size: u32, per_page: usize) -> ItemPipeline<Card> {
    ItemPipeline::builder(deck(size), |card: &Card, _, _| {
        Ok(Some(RenderedItem::new(card.name.clone(), card.id.to_string())))
    })
    .amount_per_page(per_page)
    .sorter(
        Sorter::builder("id")
            .by_key(SortOrder::Ascending, |card: &Card| card.id)
            .build(),
    )
    .sorter(
        Sorter::builder("rarity")
            .by_key(SortOrder::Descending, |card: &Card| card.rarity)
            .build(),
    )
    .filter(
        Filter::builder("rare")
            .enabled(false)
            .predicate(|card: &Card| card.rarity == 2)
            .build(),
    )
    .search(
        Search::builder("id")
            .typed(|card: &Card, id: &u32| card.id == *id)
            .build(),
    )
    .search(
        Search::builder("name")
            .fuzzy(|card: &Card| card.name.clone())
            .build(),
    )
    .build()
}

fn ids(pipeline: &mut ItemPipeline<Card>) -> Vec<String> {
    let window = pipeline.window().expect("window");
    window.items.iter().map(|item| item.value.clone()).collect()
}

#[test]
fn search_jumps_to_the_page_holding_the_match() {
    let mut pipeline = pipeline(42, 10);
    assert!(pipeline.submit_search("id", "25"));
    let window = pipeline.window().expect("window").clone();
    assert_eq!(window.current_page, 3);
    assert_eq!(window.total_pages, 5);
    assert_eq!((window.start_index, window.end_index), (20, 30));
    assert_eq!(window.search_match, Some(25));
    assert_eq!(
        ids(&mut pipeline),
        (20..30).map(|id| id.to_string()).collect::<Vec<_>>()
    );
}

#[test]
fn unmatched_search_keeps_the_current_page() {
    let mut pipeline = pipeline(42, 10);
    pipeline.goto_page(2);
    assert!(pipeline.submit_search("id", "not a number"));
    let window = pipeline.window().expect("window");
    assert_eq!(window.current_page, 2);
    assert_eq!(window.search_match, None);
}

#[test]
fn last_page_is_partial() {
    let mut pipeline = pipeline(42, 10);
    pipeline.goto_last_page();
    assert_eq!(ids(&mut pipeline), vec!["40", "41"]);
    assert!(!pipeline.has_next_page());
    pipeline.goto_next_page();
    assert_eq!(pipeline.current_page(), 5);
}

#[test]
fn enabling_a_filter_reclamps_the_page() {
    let mut pipeline = pipeline(42, 10);
    pipeline.goto_last_page();
    assert_eq!(pipeline.current_page(), 5);
    assert!(pipeline.set_filter_enabled("rare", true));
    let window = pipeline.window().expect("window");
    assert_eq!(window.filtered_size, 14);
    assert_eq!(window.total_pages, 2);
    assert_eq!(window.current_page, 2);
    assert_eq!(window.size, 42);
}

#[test]
fn switching_sorter_reorders_items() {
    let mut pipeline = pipeline(9, 3);
    pipeline.next_sorter();
    assert_eq!(
        pipeline.sorters().current().map(Sorter::label),
        Some("rarity")
    );
    assert_eq!(ids(&mut pipeline), vec!["2", "5", "8"]);
    pipeline.toggle_reversed();
    assert_eq!(pipeline.current_page(), 1);
    assert_eq!(ids(&mut pipeline), vec!["6", "3", "0"]);
}

#[test]
fn fuzzy_search_matches_names() {
    let mut pipeline = pipeline(42, 10);
    assert!(pipeline.submit_search("name", "card-33"));
    let window = pipeline.window().expect("window");
    assert_eq!(window.current_page, 4);
    assert!(!pipeline.submit_search("missing", "x"));
}

#[test]
fn unchanged_pipeline_reuses_its_window() {
    let mut pipeline = pipeline(42, 10);
    pipeline.window().expect("window");
    pipeline.window().expect("window");
    assert_eq!(pipeline.recompute_count(), 1);
    pipeline.goto_page(1);
    pipeline.window().expect("window");
    assert_eq!(pipeline.recompute_count(), 1);
    pipeline.goto_page(2);
    pipeline.window().expect("window");
    assert_eq!(pipeline.recompute_count(), 2);
}
