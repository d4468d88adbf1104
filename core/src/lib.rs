//! Paginated, navigable views over item collections, cached per session with
//! an idle time-to-live.
//!
//! An [`ItemPipeline`](pipeline::ItemPipeline) sorts, filters, searches and
//! windows a collection. [`Page`]s hold optional pipelines and nest into a
//! tree that a [`TreeHistory`](history::TreeHistory) navigates. A
//! [`ViewSession`] owns one history, and a [`LifecycleCache`] keeps sessions
//! alive while they are being interacted with and finalizes them once idle.

mod cache;
pub mod config;
mod error;
pub mod history;
mod page;
pub mod pipeline;
pub mod render;
mod session;

pub use cache::LifecycleCache;
pub use cache::SessionGuard;
pub use cache::SessionHandle;
pub use cache::SessionInfo;
pub use cache::SweeperHandle;
pub use config::ViewCacheConfig;
pub use error::ConfigError;
pub use error::ViewError;
pub use page::Page;
pub use page::PageBuilder;
pub use session::FinalizeFn;
pub use session::SessionId;
pub use session::SessionSnapshot;
pub use session::ViewSession;
pub use session::ViewSessionBuilder;
pub use session::finalize_fn;
