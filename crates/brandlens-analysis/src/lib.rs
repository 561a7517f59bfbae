pub mod competitors;
pub mod engine;
pub mod queries;
pub mod recommendations;
pub mod response;
pub mod scoring;

pub use competitors::{discover_competitors, DiscoveredCompetitor};
pub use engine::{EngineOptions, VisibilityEngine};
pub use queries::generate_queries;
pub use recommendations::recommendations_for;
pub use response::{analyze_response, ResponseSignals};
pub use scoring::{mean_score, overall_score, platform_score, trend_for};
