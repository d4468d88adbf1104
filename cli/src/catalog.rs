use viewkit_core::Page;
use viewkit_core::history::TreeHistory;
use viewkit_core::pipeline::FieldStyle;
use viewkit_core::pipeline::Filter;
use viewkit_core::pipeline::ItemPipeline;
use viewkit_core::pipeline::RenderedItem;
use viewkit_core::pipeline::Search;
use viewkit_core::pipeline::SortOrder;
use viewkit_core::pipeline::Sorter;

pub const CATALOG_PAGE: &str = "catalog";
pub const ID_SEARCH: &str = "id";
pub const NAME_SEARCH: &str = "name";

const MATERIALS: [&str; 6] = ["amber", "birch", "cobalt", "granite", "linen", "walnut"];
const SHAPES: [&str; 4] = ["bowl", "lamp", "stool", "vase"];

#[derive(Debug, Clone)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub price_cents: u32,
    pub in_stock: bool,
}

pub fn products(count: u32) -> Vec<Product> {
    (0..count)
        .map(|id| {
            let material = MATERIALS[id as usize % MATERIALS.len()];
            let shape = SHAPES[id as usize % SHAPES.len()];
            Product {
                id,
                name: format!("{material} {shape}"),
                price_cents: 500 + (id * 37) % 4_500,
                in_stock: id % 5 != 4,
            }
        })
        .collect()
}

/// Picks the search a free-form query is meant for: ids for numbers, names
/// otherwise.
pub fn search_label(query: &str) -> &'static str {
    if query.trim().parse::<u32>().is_ok() {
        ID_SEARCH
    } else {
        NAME_SEARCH
    }
}

fn product_pipeline(products: Vec<Product>, per_page: usize) -> ItemPipeline<Product> {
    ItemPipeline::builder(products, |product: &Product, _, _| {
        let price = format!(
            "{}.{:02}",
            product.price_cents / 100,
            product.price_cents % 100
        );
        Ok(Some(RenderedItem::new(
            format!("#{:02} {}", product.id, product.name),
            price,
        )))
    })
    .amount_per_page(per_page)
    .field_style(FieldStyle::Field)
    .sorter(
        Sorter::builder("id")
            .description("Catalog order")
            .by_key(SortOrder::Ascending, |product: &Product| product.id)
            .build(),
    )
    .sorter(
        Sorter::builder("price")
            .description("Most expensive first")
            .by_key(SortOrder::Descending, |product: &Product| product.price_cents)
            .by_key(SortOrder::Ascending, |product: &Product| product.id)
            .build(),
    )
    .filter(
        Filter::builder("in-stock")
            .description("Hide sold-out products")
            .enabled(false)
            .predicate(|product: &Product| product.in_stock)
            .build(),
    )
    .search(
        Search::builder(ID_SEARCH)
            .placeholder("Product number")
            .typed(|product: &Product, id: &u32| product.id == *id)
            .build(),
    )
    .search(
        Search::builder(NAME_SEARCH)
            .placeholder("Product name")
            .fuzzy(|product: &Product| product.name.clone())
            .build(),
    )
    .build()
}

pub fn catalog_history(count: u32, per_page: usize) -> TreeHistory<Product> {
    let catalog = Page::builder(CATALOG_PAGE)
        .title("Catalog")
        .description("Everything currently listed")
        .content("{FILTERED_SIZE} products")
        .pipeline(product_pipeline(products(count), per_page))
        .build();
    let home = Page::builder("home")
        .title("Shop")
        .content("Browse the catalog to get started.")
        .sub_page(catalog)
        .build();
    TreeHistory::new(home)
}
