#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use anyhow::Result;
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use opsmanager_import::{
    api::{MonitoringApi, UpstreamError},
    extract::{ClusterCoordinates, MetricsWindow},
    store::{DocumentStore, PersistenceError},
};
use serde_json::{Map, Value, json};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

pub const GROUP_ID: &str = "5d4d7ed3f2a30b18f4f88946";
pub const CLUSTER_ID: &str = "5d4d7f4bf2a30b18f4f8898c";
pub const HOST_A: &str = "a6f4e7d0c1b2a3948576";
pub const HOST_B: &str = "b7e5f8e1d2c3b4a59687";

pub fn coords() -> ClusterCoordinates {
    ClusterCoordinates {
        group_id: GROUP_ID.to_string(),
        cluster_id: CLUSTER_ID.to_string(),
    }
}

pub fn window(start: &str, end: &str) -> MetricsWindow {
    MetricsWindow {
        granularity: "PT10S".to_string(),
        start: start.to_string(),
        end: end.to_string(),
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn measurements(names: &[(&str, &str)]) -> Value {
    Value::Array(
        names
            .iter()
            .map(|(name, units)| json!({"name": name, "units": units, "dataPoints": []}))
            .collect(),
    )
}

/// Responses of a cluster with two hosts: host A has one partition and one
/// database, host B has neither. Keyed by path relative to the API root.
pub fn two_host_cluster() -> HashMap<String, Value> {
    let g = GROUP_ID;
    let mut f = HashMap::new();

    f.insert(
        format!("/groups/{g}/clusters/{CLUSTER_ID}"),
        json!({
            "id": CLUSTER_ID,
            "groupId": g,
            "clusterName": "rs0",
            "typeName": "REPLICA_SET",
            "replicaSetName": "rs0",
        }),
    );

    f.insert(
        format!("/groups/{g}/hosts"),
        json!({
            "totalCount": 2,
            "results": [
                {"id": HOST_A, "hostname": "a.example.net", "ipAddress": "10.0.0.1", "replicaStateName": "PRIMARY", "port": 27017},
                {"id": HOST_B, "hostname": "b.example.net", "ipAddress": "10.0.0.2", "replicaStateName": "SECONDARY", "port": 27017},
            ],
        }),
    );

    f.insert(
        format!("/groups/{g}/hosts/{HOST_A}/disks"),
        json!({"totalCount": 1, "results": [{"partitionName": "xvda"}]}),
    );
    f.insert(
        format!("/groups/{g}/hosts/{HOST_B}/disks"),
        json!({"totalCount": 0, "results": []}),
    );
    f.insert(
        format!("/groups/{g}/hosts/{HOST_A}/databases"),
        json!({"totalCount": 1, "results": [{"databaseName": "admin"}]}),
    );
    f.insert(
        format!("/groups/{g}/hosts/{HOST_B}/databases"),
        json!({"totalCount": 0, "results": []}),
    );

    for host in [HOST_A, HOST_B] {
        f.insert(
            format!("/groups/{g}/hosts/{host}/measurements"),
            json!({
                "groupId": g,
                "hostId": host,
                "measurements": measurements(&[("CONNECTIONS", "SCALAR"), ("OPCOUNTER_QUERY", "SCALAR_PER_SECOND")]),
            }),
        );
    }

    f.insert(
        format!("/groups/{g}/hosts/{HOST_A}/disks/xvda/measurements"),
        json!({
            "groupId": g,
            "hostId": HOST_A,
            "partitionName": "xvda",
            "measurements": measurements(&[("DISK_PARTITION_IOPS_READ", "SCALAR_PER_SECOND")]),
        }),
    );
    f.insert(
        format!("/groups/{g}/hosts/{HOST_A}/databases/admin/measurements"),
        json!({
            "groupId": g,
            "hostId": HOST_A,
            "databaseName": "admin",
            "measurements": measurements(&[("DATABASE_DATA_SIZE", "BYTES")]),
        }),
    );

    f
}

/// Copy the window parameters into measurement responses the way the API
/// echoes them back.
fn echo_query(mut doc: Value, query: &[(String, String)]) -> Value {
    if let Value::Object(map) = &mut doc {
        for (name, value) in query {
            if matches!(name.as_str(), "granularity" | "start" | "end" | "period") {
                map.insert(name.clone(), Value::String(value.clone()));
            }
        }
    }
    doc
}

// ============================================================================
// Scripted API
// ============================================================================

/// In-process [`MonitoringApi`] serving fixtures by path. Unknown paths
/// answer 404; paths listed in `failures` answer the given status.
#[derive(Default)]
pub struct ScriptedApi {
    fixtures: HashMap<String, Value>,
    failures: HashMap<String, u16>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new(fixtures: HashMap<String, Value>) -> Self {
        Self {
            fixtures,
            ..Self::default()
        }
    }

    pub fn failing(mut self, path: &str, status: u16) -> Self {
        self.failures.insert(path.to_string(), status);
        self
    }

    pub fn with_fixture(mut self, path: &str, doc: Value) -> Self {
        self.fixtures.insert(path.to_string(), doc);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_ending_with(&self, suffix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split('?').next().is_some_and(|p| p.ends_with(suffix)))
            .count()
    }
}

impl MonitoringApi for ScriptedApi {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, UpstreamError> {
        let rendered = if query.is_empty() {
            path.to_string()
        } else {
            let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{path}?{}", pairs.join("&"))
        };

        self.calls.lock().unwrap().push(rendered.clone());

        if let Some(&status) = self.failures.get(path) {
            return Err(UpstreamError::Status {
                status,
                url: format!("http://opsmanager.test/api/public/v1.0{rendered}"),
            });
        }

        let owned: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();

        self.fixtures
            .get(path)
            .cloned()
            .map(|doc| echo_query(doc, &owned))
            .ok_or_else(|| UpstreamError::Status {
                status: 404,
                url: format!("http://opsmanager.test/api/public/v1.0{rendered}"),
            })
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// [`DocumentStore`] with MongoDB `$set` upsert semantics.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Map<String, Value>>>>,
    writes: Mutex<Vec<String>>,
    rejected: HashSet<String>,
}

impl MemoryStore {
    pub fn rejecting(collections: &[&str]) -> Self {
        Self {
            rejected: collections.iter().map(|c| (*c).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|docs| docs.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Number of successful upserts issued against `collection`.
    pub fn writes(&self, collection: &str) -> usize {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|c| *c == collection)
            .count()
    }

    pub fn total_writes(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

fn matches_filter(doc: &Map<String, Value>, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(k, v)| doc.get(k) == Some(v))
}

impl DocumentStore for MemoryStore {
    async fn upsert(
        &self,
        collection: &str,
        filter: &Value,
        document: &Value,
    ) -> Result<(), PersistenceError> {
        if self.rejected.contains(collection) {
            return Err(PersistenceError::new(collection, "not primary"));
        }

        let (Some(filter), Some(fields)) = (filter.as_object(), document.as_object()) else {
            return Err(PersistenceError::new(collection, "document is not an object"));
        };

        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();

        if let Some(existing) = docs.iter_mut().find(|d| matches_filter(d, filter)) {
            for (k, v) in fields {
                existing.insert(k.clone(), v.clone());
            }
        } else {
            let mut created = filter.clone();
            for (k, v) in fields {
                created.insert(k.clone(), v.clone());
            }
            docs.push(created);
        }

        self.writes.lock().unwrap().push(collection.to_string());

        Ok(())
    }
}

// ============================================================================
// Fake OpsManager over HTTP
// ============================================================================

pub const API_ROOT: &str = "/api/public/v1.0";
pub const USERNAME: &str = "admin";
pub const APIKEY: &str = "5a4b3c2d-1e0f-4a5b-8c7d-6e5f4a3b2c1d";

const CHALLENGE: &str = r#"Digest realm="MMS Public API", qop="auth", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", algorithm=MD5"#;

#[derive(Default)]
pub struct FakeOpsManager {
    fixtures: HashMap<String, Value>,
    failures: HashMap<String, u16>,
    // answer 401 without a challenge header
    no_challenge: bool,
    accepted_username: String,
    requests: Mutex<Vec<(String, bool)>>,
}

impl FakeOpsManager {
    pub fn new(fixtures: HashMap<String, Value>) -> Self {
        Self {
            fixtures,
            accepted_username: USERNAME.to_string(),
            ..Self::default()
        }
    }

    pub fn failing(mut self, path: &str, status: u16) -> Self {
        self.failures.insert(path.to_string(), status);
        self
    }

    pub fn without_challenge(mut self) -> Self {
        self.no_challenge = true;
        self
    }

    pub fn accepting(mut self, username: &str) -> Self {
        self.accepted_username = username.to_string();
        self
    }

    /// (path and query, carried an Authorization header)
    pub fn requests(&self) -> Vec<(String, bool)> {
        self.requests.lock().unwrap().clone()
    }

    /// Bind to an ephemeral port and serve until the test ends. Returns the
    /// API base URL.
    pub async fn spawn(self: Arc<Self>) -> Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = Router::new().fallback(serve).with_state(self);

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(format!("http://{addr}{API_ROOT}"))
    }

    fn authorized(&self, headers: &HeaderMap, request_target: &str) -> bool {
        let Some(value) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            return false;
        };

        value.starts_with("Digest ")
            && value.contains(&format!("username=\"{}\"", self.accepted_username))
            && value.contains(&format!("uri=\"{request_target}\""))
            && value.contains("response=")
    }
}

fn unauthorized(fake: &FakeOpsManager) -> Response {
    if fake.no_challenge {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, CHALLENGE)],
    )
        .into_response()
}

async fn serve(State(fake): State<Arc<FakeOpsManager>>, uri: Uri, headers: HeaderMap) -> Response {
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);

    let has_auth = headers.contains_key(header::AUTHORIZATION);
    fake.requests
        .lock()
        .unwrap()
        .push((target.clone(), has_auth));

    if !fake.authorized(&headers, &target) {
        return unauthorized(&fake);
    }

    let Some(path) = uri.path().strip_prefix(API_ROOT) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(&status) = fake.failures.get(path) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, axum::Json(json!({"error": status.as_u16()}))).into_response();
    }

    let query: Vec<(String, String)> = uri
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    match fake.fixtures.get(path) {
        Some(doc) => axum::Json(echo_query(doc.clone(), &query)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({"error": 404, "reason": "Not Found"})),
        )
            .into_response(),
    }
}
