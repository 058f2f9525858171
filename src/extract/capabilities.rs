use crate::{
    api::{MonitoringApi, paths},
    extract::{
        ClusterCoordinates, ClusterSummary, ExtractError, Measurement, MeasurementCatalogs, decode,
    },
    store::{DocumentStore, Gateway, collections},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

/// Granularity and period used for catalog probes. With both set to five
/// minutes the API returns no data points but the full measurement list.
pub const PROBE_GRANULARITY: &str = "PT5M";
pub const PROBE_PERIOD: &str = "PT5M";

#[derive(Deserialize)]
struct MeasurementsPage {
    measurements: Vec<Measurement>,
}

/// The resource a catalog is probed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe<'a> {
    Host {
        host_id: &'a str,
    },
    Disk {
        host_id: &'a str,
        partition_name: &'a str,
    },
    Database {
        host_id: &'a str,
        database_name: &'a str,
    },
}

impl Probe<'_> {
    fn path(&self, group_id: &str) -> String {
        match *self {
            Self::Host { host_id } => paths::host_measurements(group_id, host_id),
            Self::Disk {
                host_id,
                partition_name,
            } => paths::disk_measurements(group_id, host_id, partition_name),
            Self::Database {
                host_id,
                database_name,
            } => paths::database_measurements(group_id, host_id, database_name),
        }
    }

    const fn collection(&self) -> &'static str {
        match self {
            Self::Host { .. } => collections::AVAILABLE_MEASUREMENTS_HOST,
            Self::Disk { .. } => collections::AVAILABLE_MEASUREMENTS_DISK,
            Self::Database { .. } => collections::AVAILABLE_MEASUREMENTS_DATABASE,
        }
    }

    fn key(&self, group_id: &str) -> Value {
        match *self {
            Self::Host { host_id } => json!({ "groupId": group_id, "hostId": host_id }),
            Self::Disk {
                host_id,
                partition_name,
            } => json!({ "groupId": group_id, "hostId": host_id, "partitionName": partition_name }),
            Self::Database {
                host_id,
                database_name,
            } => json!({ "groupId": group_id, "hostId": host_id, "databaseName": database_name }),
        }
    }
}

/// Probe one resource for the measurements it exposes and store the raw
/// answer in the matching `available_measurements_*` collection.
///
/// # Errors
///
/// Returns an error if the API call fails or the response has no
/// `measurements` list
pub async fn fetch_measurement_catalog<A, S>(
    api: &A,
    gateway: &Gateway<S>,
    coords: &ClusterCoordinates,
    probe: Probe<'_>,
) -> Result<Vec<Measurement>, ExtractError>
where
    A: MonitoringApi,
    S: DocumentStore,
{
    let path = probe.path(&coords.group_id);
    let doc = api
        .get(
            &path,
            &[("granularity", PROBE_GRANULARITY), ("period", PROBE_PERIOD)],
        )
        .await?;

    let page: MeasurementsPage = decode(&path, &doc)?;

    gateway
        .upsert(probe.collection(), &probe.key(&coords.group_id), &doc)
        .await;

    Ok(page.measurements)
}

/// Fill the three catalogs from the first host, its first partition and
/// its first database.
///
/// All three representatives are resolved before the first request, so a
/// missing one fails the stage without touching the API.
///
/// # Errors
///
/// Returns a precondition error if there is no host, or the first host has
/// no partition or no database, and any error from the probes
#[instrument(skip_all, level = "info", err)]
pub async fn discover<A, S>(
    api: &A,
    gateway: &Gateway<S>,
    summary: ClusterSummary,
) -> Result<ClusterSummary, ExtractError>
where
    A: MonitoringApi,
    S: DocumentStore,
{
    let coords = ClusterCoordinates {
        group_id: summary.group_id.clone(),
        cluster_id: summary.cluster_id.clone(),
    };

    let host = summary.representative()?;
    let host_id = host.host_id.as_str();
    let partition_name = host.first_disk_partition()?;
    let database_name = host.first_database()?;

    info!(host_id, "gathering available measurements for hosts");
    let host_catalog =
        fetch_measurement_catalog(api, gateway, &coords, Probe::Host { host_id }).await?;

    info!(host_id, partition_name, "gathering available measurements for disk partitions");
    let disk_catalog = fetch_measurement_catalog(
        api,
        gateway,
        &coords,
        Probe::Disk {
            host_id,
            partition_name,
        },
    )
    .await?;

    info!(host_id, database_name, "gathering available measurements for databases");
    let database_catalog = fetch_measurement_catalog(
        api,
        gateway,
        &coords,
        Probe::Database {
            host_id,
            database_name,
        },
    )
    .await?;

    Ok(summary.with_catalogs(MeasurementCatalogs {
        host: host_catalog,
        disk: disk_catalog,
        database: database_catalog,
    }))
}
