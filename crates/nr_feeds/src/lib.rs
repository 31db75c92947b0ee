//! Feed ingestion: fetching RSS/Atom sources, cleaning article text and
//! loading the results into the vector store.

pub mod manager;
pub mod process;
pub mod sources;

pub use manager::{IngestManager, IngestReport};
pub use sources::{FeedSource, RssFeed};

pub mod prelude {
    pub use super::sources::FeedSource;
    pub use super::{IngestManager, IngestReport};
    pub use nr_core::{Article, Error, Result};
}
