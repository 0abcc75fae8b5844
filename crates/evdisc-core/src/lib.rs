pub mod app_config;
pub mod config;
pub mod events;
pub mod query;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use events::{
    CallerLocation, Coordinates, DateBucket, Event, EventFormat, FilterCriteria, FilterPatch,
    FormatSelector, NearbyEvent, PublishState, RankedPage,
};
pub use query::{decode_criteria, encode_criteria, DiscoveryParams, QueryError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
