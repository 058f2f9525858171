use crate::{
    cli::actions::{Action, ApiConfig, TargetConfig},
    extract::{ClusterCoordinates, MetricsWindow},
};
use anyhow::{Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use tracing::debug;

// Every argument is required by the command definition; this only guards
// against matches built from a different command.
fn get(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("{id} is required. Please provide it using the --{id} flag."))
}

pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let api = ApiConfig {
        base_url: get(matches, "opsmanager-baseurl")?
            .trim_end_matches('/')
            .to_string(),
        username: get(matches, "opsmanager-username")?,
        apikey: SecretString::from(get(matches, "opsmanager-apikey")?),
    };

    let coords = ClusterCoordinates {
        group_id: get(matches, "opsmanager-groupid")?,
        cluster_id: get(matches, "opsmanager-clusterid")?,
    };

    let target = TargetConfig {
        uri: SecretString::from(get(matches, "target-mongouri")?),
        database: get(matches, "target-mongodatabase")?,
    };

    let window = MetricsWindow {
        granularity: get(matches, "metrics-granularity")?,
        start: get(matches, "metrics-start")?,
        end: get(matches, "metrics-end")?,
    };

    debug!(?api, ?coords, ?window, database = %target.database, "parsed arguments");

    Ok(Action::Run {
        api,
        coords,
        target,
        window,
    })
}
