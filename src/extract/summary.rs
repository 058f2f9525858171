use crate::extract::{ClusterCoordinates, PreconditionNotMet};
use serde::{Deserialize, Serialize};

/// Everything learned about the cluster during a run.
///
/// Rebuilt from scratch on every run. Stages take it by value and hand back
/// an enriched copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub group_id: String,
    pub cluster_id: String,
    pub hosts: Vec<HostSummary>,
    pub host_measurement_catalog: Vec<Measurement>,
    pub disk_measurement_catalog: Vec<Measurement>,
    pub database_measurement_catalog: Vec<Measurement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSummary {
    pub host_id: String,
    pub hostname: String,
    pub ip_address: Option<String>,
    pub replica_state_name: Option<String>,
    pub disk_partitions: Vec<String>,
    pub databases: Vec<String>,
}

/// A measurement definition as listed by the measurements endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub units: String,
}

/// The three catalogs probed from the representative host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementCatalogs {
    pub host: Vec<Measurement>,
    pub disk: Vec<Measurement>,
    pub database: Vec<Measurement>,
}

impl ClusterSummary {
    #[must_use]
    pub fn new(coords: &ClusterCoordinates) -> Self {
        Self {
            group_id: coords.group_id.clone(),
            cluster_id: coords.cluster_id.clone(),
            hosts: Vec::new(),
            host_measurement_catalog: Vec::new(),
            disk_measurement_catalog: Vec::new(),
            database_measurement_catalog: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_hosts(self, hosts: Vec<HostSummary>) -> Self {
        Self { hosts, ..self }
    }

    #[must_use]
    pub fn with_catalogs(self, catalogs: MeasurementCatalogs) -> Self {
        Self {
            host_measurement_catalog: catalogs.host,
            disk_measurement_catalog: catalogs.disk,
            database_measurement_catalog: catalogs.database,
            ..self
        }
    }

    /// The host whose catalogs stand in for the whole cluster: the first one.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionNotMet::NoHosts`] if no host was discovered
    pub fn representative(&self) -> Result<&HostSummary, PreconditionNotMet> {
        self.hosts.first().ok_or(PreconditionNotMet::NoHosts)
    }
}

impl HostSummary {
    #[must_use]
    pub fn with_disk_partitions(self, disk_partitions: Vec<String>) -> Self {
        Self {
            disk_partitions,
            ..self
        }
    }

    #[must_use]
    pub fn with_databases(self, databases: Vec<String>) -> Self {
        Self { databases, ..self }
    }

    /// # Errors
    ///
    /// Returns [`PreconditionNotMet::NoDiskPartitions`] if the list is empty
    pub fn first_disk_partition(&self) -> Result<&str, PreconditionNotMet> {
        self.disk_partitions
            .first()
            .map(String::as_str)
            .ok_or_else(|| PreconditionNotMet::NoDiskPartitions {
                host_id: self.host_id.clone(),
            })
    }

    /// # Errors
    ///
    /// Returns [`PreconditionNotMet::NoDatabases`] if the list is empty
    pub fn first_database(&self) -> Result<&str, PreconditionNotMet> {
        self.databases
            .first()
            .map(String::as_str)
            .ok_or_else(|| PreconditionNotMet::NoDatabases {
                host_id: self.host_id.clone(),
            })
    }
}
