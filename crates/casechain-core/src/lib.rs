pub mod aggregate;
pub mod appeal;
pub mod config;
pub mod error;
pub mod linker;
pub mod normalize;
pub mod record;
pub mod tally;
pub mod validator;

pub use aggregate::{DatasetProfile, OutcomeDistribution, aggregate, aggregate_cases, profile};
pub use appeal::{AppealReport, Appellant, Outcome, analyze_appeals};
pub use config::AnalysisConfig;
pub use error::CoreError;
pub use linker::{Case, CaseKey, CaseSummary, LinkSummary, Linkage, MatchConfidence, link, link_with_config};
pub use normalize::{CnjNumber, core_key, normalize};
pub use record::{DecisionRecord, Instance, records_from_json, records_from_value};
pub use tally::FrequencyTable;
pub use validator::{PatternReport, validate, validate_with_config};
