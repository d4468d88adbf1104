mod index;
mod tree;

pub use index::IndexHistory;
pub use tree::TreeHistory;
