//! Feature extraction
//!
//! Stateful trackers that are read before a match and updated after it.

pub mod extractor;
pub mod head_to_head;
pub mod player_stats;
pub mod ranking;
pub mod recent_form;
pub mod score;
pub mod time_weight;
pub mod venue;

pub use extractor::{FeatureExtractor, MatchFeatures};
pub use head_to_head::{HeadToHeadStore, PairAggregate};
pub use player_stats::{PlayerAggregate, PlayerStatStore, WinLoss};
pub use ranking::{RankingLookup, RankingPoint};
pub use recent_form::RecentFormWindow;
pub use score::parse_score;
pub use time_weight::UpdateWeights;
pub use venue::{TourneyDirectory, TourneyInfo};
