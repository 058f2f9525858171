//! Target collection names.

pub const CLUSTERS: &str = "clusters";
pub const CLUSTER_HOSTS: &str = "cluster_hosts";
pub const CLUSTER_HOST_DISK_PARTITIONS: &str = "cluster_host_disk_partitions";
pub const CLUSTER_HOST_DATABASES: &str = "cluster_host_databases";

pub const AVAILABLE_MEASUREMENTS_HOST: &str = "available_measurements_host";
pub const AVAILABLE_MEASUREMENTS_DISK: &str = "available_measurements_disk";
pub const AVAILABLE_MEASUREMENTS_DATABASE: &str = "available_measurements_database";

pub const CLUSTER_SUMMARIZED_INFO: &str = "cluster_summarized_info";

pub const METRICS_HOSTS: &str = "metrics_hosts";
pub const METRICS_DISK_PARTITIONS: &str = "metrics_disk_partitions";
pub const METRICS_DATABASES: &str = "metrics_databases";
