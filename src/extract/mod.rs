//! The extraction pipeline.
//!
//! Stages run in a fixed order and each one awaits every call before making
//! the next:
//!
//! 1. [`topology::discover`]: cluster descriptor, hosts, partitions, databases
//! 2. [`capabilities::discover`]: measurement catalogs of the first host
//! 3. [`persist_summary`]: the accumulated [`ClusterSummary`]
//! 4. [`metrics::extract`]: measurement series for the requested window
//!
//! Upstream failures stop the run. Write failures are absorbed by the
//! [`Gateway`].

use crate::{
    api::{MonitoringApi, UpstreamError},
    store::{DocumentStore, Gateway, collections},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, instrument};

pub mod capabilities;
pub mod metrics;
pub mod summary;
pub mod topology;

pub use metrics::{ExtractionReport, MetricsWindow};
pub use summary::{ClusterSummary, HostSummary, Measurement, MeasurementCatalogs};

/// Group and cluster the run is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterCoordinates {
    pub group_id: String,
    pub cluster_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreconditionNotMet {
    #[error("no hosts discovered, cannot probe measurement catalogs")]
    NoHosts,

    #[error("host {host_id} has no disk partitions, cannot probe disk measurements")]
    NoDiskPartitions { host_id: String },

    #[error("host {host_id} has no databases, cannot probe database measurements")]
    NoDatabases { host_id: String },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Precondition(#[from] PreconditionNotMet),

    #[error("unexpected response from {endpoint}: {source}")]
    Malformed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode cluster summary: {0}")]
    Summary(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub hosts: usize,
    pub extraction: ExtractionReport,
    pub failed_writes: usize,
}

/// Read the fields the pipeline needs out of a raw response.
pub(crate) fn decode<T: DeserializeOwned>(endpoint: &str, doc: &Value) -> Result<T, ExtractError> {
    T::deserialize(doc).map_err(|source| ExtractError::Malformed {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Upsert the summary into `cluster_summarized_info`, keyed by group and
/// cluster.
///
/// # Errors
///
/// Returns an error only if the summary cannot be encoded as JSON
#[instrument(skip_all, level = "info", err)]
pub async fn persist_summary<S: DocumentStore>(
    gateway: &Gateway<S>,
    summary: &ClusterSummary,
) -> Result<bool, ExtractError> {
    info!("storing cluster summary");

    let document = serde_json::to_value(summary).map_err(ExtractError::Summary)?;
    let filter = json!({ "groupId": summary.group_id, "clusterId": summary.cluster_id });

    Ok(gateway
        .upsert(collections::CLUSTER_SUMMARIZED_INFO, &filter, &document)
        .await)
}

/// Run every stage once.
///
/// # Errors
///
/// Returns the first upstream, precondition or response shape error; no
/// later stage runs after it
#[instrument(
    skip_all,
    level = "info",
    err,
    fields(group_id = %coords.group_id, cluster_id = %coords.cluster_id)
)]
pub async fn run<A, S>(
    api: &A,
    gateway: &Gateway<S>,
    coords: &ClusterCoordinates,
    window: &MetricsWindow,
) -> Result<RunReport, ExtractError>
where
    A: MonitoringApi,
    S: DocumentStore,
{
    let summary = topology::discover(api, gateway, coords).await?;
    let summary = capabilities::discover(api, gateway, summary).await?;

    persist_summary(gateway, &summary).await?;

    let extraction = metrics::extract(api, gateway, &summary, window).await?;

    Ok(RunReport {
        hosts: summary.hosts.len(),
        extraction,
        failed_writes: gateway.failed_writes(),
    })
}
