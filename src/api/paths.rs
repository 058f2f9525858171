//! Endpoint paths, relative to the API base URL.

#[must_use]
pub fn cluster(group_id: &str, cluster_id: &str) -> String {
    format!("/groups/{group_id}/clusters/{cluster_id}")
}

/// Host list; filter by cluster with the `clusterId` query parameter.
#[must_use]
pub fn hosts(group_id: &str) -> String {
    format!("/groups/{group_id}/hosts")
}

#[must_use]
pub fn host_disks(group_id: &str, host_id: &str) -> String {
    format!("/groups/{group_id}/hosts/{host_id}/disks")
}

#[must_use]
pub fn host_databases(group_id: &str, host_id: &str) -> String {
    format!("/groups/{group_id}/hosts/{host_id}/databases")
}

#[must_use]
pub fn host_measurements(group_id: &str, host_id: &str) -> String {
    format!("/groups/{group_id}/hosts/{host_id}/measurements")
}

#[must_use]
pub fn disk_measurements(group_id: &str, host_id: &str, partition_name: &str) -> String {
    format!("/groups/{group_id}/hosts/{host_id}/disks/{partition_name}/measurements")
}

#[must_use]
pub fn database_measurements(group_id: &str, host_id: &str, database_name: &str) -> String {
    format!("/groups/{group_id}/hosts/{host_id}/databases/{database_name}/measurements")
}
