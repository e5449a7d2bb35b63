//! Client code for fora.
//!
//! This crate provides the retrying fetch pipeline, the per-forum thread
//! adapters, adapter dispatch by URL and chapter resolution.

pub mod dates;
pub mod dispatch;
pub mod fetch;
pub mod html;
pub mod listing;
pub mod resolve;
pub mod sites;

pub use dispatch::Dispatcher;
pub use fetch::{FetchConfig, RetryPolicy, RetryingFetcher, Session, Transport};
pub use listing::{extract_references, make_listing};
pub use resolve::{ChapterResolver, DispatchingSource, ThreadSource};
pub use sites::{SiteKind, ThreadGetter};
