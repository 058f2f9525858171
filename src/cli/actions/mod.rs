pub mod run;

use crate::extract::{ClusterCoordinates, MetricsWindow};
use secrecy::SecretString;

/// Where the API lives and who to authenticate as.
#[derive(Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub username: String,
    pub apikey: SecretString,
}

/// Destination database.
#[derive(Debug)]
pub struct TargetConfig {
    pub uri: SecretString,
    pub database: String,
}

#[derive(Debug)]
pub enum Action {
    Run {
        api: ApiConfig,
        coords: ClusterCoordinates,
        target: TargetConfig,
        window: MetricsWindow,
    },
}
