pub mod album_cache;
pub mod assignment;
pub mod catalog;
pub mod comparison;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod error;
pub mod features;
pub mod group_matcher;
pub mod metadata;
pub mod musicbrainz;
pub mod rate_limiter;
pub mod scorer;
pub mod similarity;

pub use assignment::{AssignmentStrategy, ExclusiveGreedy, GreedyPerTrack};
pub use catalog::{CatalogClient, CatalogGateway, SearchHints};
pub use comparison::{compare_group_with_album, Comparison, Thresholds};
pub use config::Config;
pub use coordinator::{group_name, MatchCoordinator};
pub use error::{CatalogError, ConfigError, MatchError};
pub use features::extract_features;
pub use group_matcher::{GroupMatcher, MatchEvent, MatchSettings, MatchedGroup, MatcherId, MatcherState};
pub use metadata::{Album, Artist, FileEntry, FileRecord, FileTags, Group, TagField, TaggedFile, Track};
pub use musicbrainz::MusicBrainzClient;
pub use rate_limiter::{RequestGate, RequestPermit};
pub use scorer::score;
pub use similarity::similarity;
