use crate::{
    api::{MonitoringApi, paths},
    extract::{ClusterCoordinates, ClusterSummary, ExtractError, HostSummary, decode},
    store::{DocumentStore, Gateway, collections},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

#[derive(Deserialize)]
struct Page<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostEntry {
    id: String,
    hostname: String,
    ip_address: Option<String>,
    replica_state_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiskEntry {
    partition_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseEntry {
    database_name: String,
}

impl From<HostEntry> for HostSummary {
    fn from(entry: HostEntry) -> Self {
        Self {
            host_id: entry.id,
            hostname: entry.hostname,
            ip_address: entry.ip_address,
            replica_state_name: entry.replica_state_name,
            disk_partitions: Vec::new(),
            databases: Vec::new(),
        }
    }
}

fn host_key(coords: &ClusterCoordinates, host_id: &str) -> Value {
    json!({
        "groupId": coords.group_id,
        "clusterId": coords.cluster_id,
        "hostId": host_id,
    })
}

/// Fetch the cluster descriptor and store it as is in `clusters`.
///
/// # Errors
///
/// Returns an error if the API call fails
pub async fn fetch_cluster_descriptor<A, S>(
    api: &A,
    gateway: &Gateway<S>,
    coords: &ClusterCoordinates,
) -> Result<Value, ExtractError>
where
    A: MonitoringApi,
    S: DocumentStore,
{
    info!("gathering cluster descriptor");

    let path = paths::cluster(&coords.group_id, &coords.cluster_id);
    let doc = api.get(&path, &[]).await?;

    let filter = json!({ "groupId": coords.group_id, "id": coords.cluster_id });
    gateway.upsert(collections::CLUSTERS, &filter, &doc).await;

    Ok(doc)
}

/// Fetch the hosts of the cluster, in response order.
///
/// # Errors
///
/// Returns an error if the API call fails or an entry lacks `id`/`hostname`
pub async fn fetch_hosts<A, S>(
    api: &A,
    gateway: &Gateway<S>,
    coords: &ClusterCoordinates,
) -> Result<Vec<HostSummary>, ExtractError>
where
    A: MonitoringApi,
    S: DocumentStore,
{
    info!("gathering hosts of the cluster");

    let path = paths::hosts(&coords.group_id);
    let doc = api
        .get(&path, &[("clusterId", coords.cluster_id.as_str())])
        .await?;

    let page: Page<HostEntry> = decode(&path, &doc)?;
    let hosts: Vec<HostSummary> = page.results.into_iter().map(HostSummary::from).collect();

    let filter = json!({ "groupId": coords.group_id, "clusterId": coords.cluster_id });
    gateway.upsert(collections::CLUSTER_HOSTS, &filter, &doc).await;

    info!(hosts = hosts.len(), "discovered hosts");

    Ok(hosts)
}

/// Partition names of one host, in response order, duplicates kept.
///
/// # Errors
///
/// Returns an error if the API call fails or an entry lacks `partitionName`
pub async fn fetch_disk_partitions<A, S>(
    api: &A,
    gateway: &Gateway<S>,
    coords: &ClusterCoordinates,
    host_id: &str,
) -> Result<Vec<String>, ExtractError>
where
    A: MonitoringApi,
    S: DocumentStore,
{
    let path = paths::host_disks(&coords.group_id, host_id);
    let doc = api.get(&path, &[]).await?;

    let page: Page<DiskEntry> = decode(&path, &doc)?;
    let partitions: Vec<String> = page.results.into_iter().map(|d| d.partition_name).collect();

    gateway
        .upsert(
            collections::CLUSTER_HOST_DISK_PARTITIONS,
            &host_key(coords, host_id),
            &doc,
        )
        .await;

    debug!(host_id, partitions = ?partitions, "discovered disk partitions");

    Ok(partitions)
}

/// Database names of one host, in response order, duplicates kept.
///
/// # Errors
///
/// Returns an error if the API call fails or an entry lacks `databaseName`
pub async fn fetch_databases<A, S>(
    api: &A,
    gateway: &Gateway<S>,
    coords: &ClusterCoordinates,
    host_id: &str,
) -> Result<Vec<String>, ExtractError>
where
    A: MonitoringApi,
    S: DocumentStore,
{
    let path = paths::host_databases(&coords.group_id, host_id);
    let doc = api.get(&path, &[]).await?;

    let page: Page<DatabaseEntry> = decode(&path, &doc)?;
    let databases: Vec<String> = page.results.into_iter().map(|d| d.database_name).collect();

    gateway
        .upsert(
            collections::CLUSTER_HOST_DATABASES,
            &host_key(coords, host_id),
            &doc,
        )
        .await;

    debug!(host_id, databases = ?databases, "discovered databases");

    Ok(databases)
}

/// Descriptor, hosts, then the partitions of every host, then the
/// databases of every host.
///
/// # Errors
///
/// Returns the first failing call; nothing after it is fetched
#[instrument(skip_all, level = "info", err)]
pub async fn discover<A, S>(
    api: &A,
    gateway: &Gateway<S>,
    coords: &ClusterCoordinates,
) -> Result<ClusterSummary, ExtractError>
where
    A: MonitoringApi,
    S: DocumentStore,
{
    fetch_cluster_descriptor(api, gateway, coords).await?;

    let hosts = fetch_hosts(api, gateway, coords).await?;

    info!("gathering disk partitions of each host");
    let mut with_partitions = Vec::with_capacity(hosts.len());
    for host in hosts {
        let partitions = fetch_disk_partitions(api, gateway, coords, &host.host_id).await?;
        with_partitions.push(host.with_disk_partitions(partitions));
    }

    info!("gathering databases of each host");
    let mut with_databases = Vec::with_capacity(with_partitions.len());
    for host in with_partitions {
        let databases = fetch_databases(api, gateway, coords, &host.host_id).await?;
        with_databases.push(host.with_databases(databases));
    }

    Ok(ClusterSummary::new(coords).with_hosts(with_databases))
}
