use crate::{
    api::{MonitoringApi, UpstreamError, paths},
    extract::{ClusterSummary, ExtractError},
    store::{DocumentStore, Gateway, collections},
};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

/// Time window and resolution of the extracted series.
///
/// Values go to the API as given; the API is the one validating them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsWindow {
    pub granularity: String,
    pub start: String,
    pub end: String,
}

impl MetricsWindow {
    fn query(&self) -> [(&str, &str); 3] {
        [
            ("granularity", self.granularity.as_str()),
            ("start", self.start.as_str()),
            ("end", self.end.as_str()),
        ]
    }
}

/// Successful metric upserts per resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub hosts: usize,
    pub disks: usize,
    pub databases: usize,
}

impl ExtractionReport {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.hosts + self.disks + self.databases
    }
}

/// # Errors
///
/// Returns an error if the API call fails
pub async fn fetch_host_metrics<A: MonitoringApi>(
    api: &A,
    group_id: &str,
    host_id: &str,
    window: &MetricsWindow,
) -> Result<Value, UpstreamError> {
    api.get(&paths::host_measurements(group_id, host_id), &window.query())
        .await
}

/// # Errors
///
/// Returns an error if the API call fails
pub async fn fetch_disk_metrics<A: MonitoringApi>(
    api: &A,
    group_id: &str,
    host_id: &str,
    partition_name: &str,
    window: &MetricsWindow,
) -> Result<Value, UpstreamError> {
    api.get(
        &paths::disk_measurements(group_id, host_id, partition_name),
        &window.query(),
    )
    .await
}

/// # Errors
///
/// Returns an error if the API call fails
pub async fn fetch_database_metrics<A: MonitoringApi>(
    api: &A,
    group_id: &str,
    host_id: &str,
    database_name: &str,
    window: &MetricsWindow,
) -> Result<Value, UpstreamError> {
    api.get(
        &paths::database_measurements(group_id, host_id, database_name),
        &window.query(),
    )
    .await
}

/// Fetch and store the series of every host, then every (host, partition)
/// pair, then every (host, database) pair. Each result is written right
/// after it arrives.
///
/// # Errors
///
/// Returns the first failing API call; series already written stay written
#[instrument(
    skip_all,
    level = "info",
    err,
    fields(granularity = %window.granularity, start = %window.start, end = %window.end)
)]
pub async fn extract<A, S>(
    api: &A,
    gateway: &Gateway<S>,
    summary: &ClusterSummary,
    window: &MetricsWindow,
) -> Result<ExtractionReport, ExtractError>
where
    A: MonitoringApi,
    S: DocumentStore,
{
    let group_id = summary.group_id.as_str();
    let cluster_id = summary.cluster_id.as_str();
    let mut report = ExtractionReport::default();

    info!("getting metrics for hosts");
    for host in &summary.hosts {
        let doc = fetch_host_metrics(api, group_id, &host.host_id, window).await?;
        let filter = json!({
            "groupId": group_id,
            "clusterId": cluster_id,
            "hostId": host.host_id,
        });
        if gateway.upsert(collections::METRICS_HOSTS, &filter, &doc).await {
            report.hosts += 1;
        }
    }

    info!("getting metrics for disk partitions");
    for host in &summary.hosts {
        for partition in &host.disk_partitions {
            let doc = fetch_disk_metrics(api, group_id, &host.host_id, partition, window).await?;
            let filter = json!({
                "groupId": group_id,
                "clusterId": cluster_id,
                "hostId": host.host_id,
                "diskPartition": partition,
            });
            if gateway
                .upsert(collections::METRICS_DISK_PARTITIONS, &filter, &doc)
                .await
            {
                report.disks += 1;
            }
        }
    }

    info!("getting metrics for databases");
    for host in &summary.hosts {
        for database in &host.databases {
            let doc =
                fetch_database_metrics(api, group_id, &host.host_id, database, window).await?;
            let filter = json!({
                "groupId": group_id,
                "clusterId": cluster_id,
                "hostId": host.host_id,
                "databaseName": database,
            });
            if gateway
                .upsert(collections::METRICS_DATABASES, &filter, &doc)
                .await
            {
                report.databases += 1;
            }
        }
    }

    debug!(?report, "metrics extraction finished");

    Ok(report)
}
