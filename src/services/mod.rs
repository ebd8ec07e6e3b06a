pub mod catalogue;
pub mod igdb;

pub use catalogue::{
    CatalogueError, ExternalCatalogue, FullResult, MetadataSource, SummaryResult,
    MAX_SEARCH_RESULTS, MIN_QUERY_LEN,
};
pub use igdb::IgdbSource;
