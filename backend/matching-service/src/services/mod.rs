pub mod aggregator;
pub mod embedding;
pub mod matcher;
pub mod places;
pub mod poi_finder;
pub mod scoring;
pub mod storage;

pub use aggregator::{EventAggregator, SummaryStats};
pub use embedding::{EmbeddingClient, SemanticIndex};
pub use matcher::{MatchOptions, ZoneMatchResult, ZoneMatcher};
pub use places::{PlaceSearchClient, PlaceSearchProvider};
pub use poi_finder::{PoiFinder, PoiFinderError, PoiFinderOptions};
pub use storage::{InMemoryProfileStore, InMemoryZoneStore, ProfileStore, ZoneStore};
