use crate::{
    api::OpsManagerClient,
    cli::{
        actions::{Action, ApiConfig, TargetConfig},
        telemetry::shutdown_tracer,
    },
    extract::{self, ClusterCoordinates, MetricsWindow, RunReport},
    store::{Gateway, MongoStore},
};
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use std::time::Instant;
use tracing::{Instrument, error, info, info_span};
use ulid::Ulid;

/// Handle the run action
///
/// # Errors
///
/// Returns an error if the client or store cannot be set up, or if any
/// stage of the import fails
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Run {
            api,
            coords,
            target,
            window,
        } => {
            println!("{}", banner(&api, &coords, &target, &window));

            let result = import(api, &coords, target, &window).await;

            shutdown_tracer();

            let report = result?;

            println!("{}", summary(&report));
        }
    }

    Ok(())
}

async fn import(
    api: ApiConfig,
    coords: &ClusterCoordinates,
    target: TargetConfig,
    window: &MetricsWindow,
) -> Result<RunReport> {
    let client = OpsManagerClient::new(&api.base_url, api.username, api.apikey)
        .context("Failed to build HTTP client")?;

    let store = MongoStore::connect(&target.uri, &target.database).await?;
    let gateway = Gateway::new(store);

    let run_id = Ulid::new();
    let span = info_span!("import", %run_id, database = %gateway.store().name());

    let started = Instant::now();

    let report = extract::run(&client, &gateway, coords, window)
        .instrument(span)
        .await
        .inspect_err(|e| error!(%run_id, error = %e, "import aborted"))?;

    info!(
        %run_id,
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "import finished"
    );

    Ok(report)
}

/// Replace the user info of a connection string, keeping scheme and hosts.
fn mask_credentials(uri: &str) -> String {
    uri.split_once("//")
        .and_then(|(scheme, rest)| {
            rest.rsplit_once('@')
                .map(|(_, hosts)| format!("{scheme}//XXXXXXXX:XXXXXXXX@{hosts}"))
        })
        .unwrap_or_else(|| uri.to_string())
}

fn banner(
    api: &ApiConfig,
    coords: &ClusterCoordinates,
    target: &TargetConfig,
    window: &MetricsWindow,
) -> String {
    format!(
        "{} {}\n\n\
         Importing metrics for the following cluster:\n\
         ============================================\n\
         OpsManager:  {}\n\
         UserName:    {}\n\
         GroupId:     {}\n\
         ClusterId:   {}\n\n\
         Granularity: {}\n\
         Start:       {}\n\
         End:         {}\n\n\
         Target DB:   {}\n\
         Target URI:  {}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        api.base_url,
        api.username,
        coords.group_id,
        coords.cluster_id,
        window.granularity,
        window.start,
        window.end,
        target.database,
        mask_credentials(target.uri.expose_secret()),
    )
}

fn summary(report: &RunReport) -> String {
    let mut out = format!(
        "Finished. Stored the results in the target database.\n\n\
         Hosts:            {}\n\
         Host metrics:     {}\n\
         Disk metrics:     {}\n\
         Database metrics: {}",
        report.hosts,
        report.extraction.hosts,
        report.extraction.disks,
        report.extraction.databases,
    );

    if report.failed_writes > 0 {
        out.push_str(&format!(
            "\n\nWARNING: {} write(s) failed, see the log for details",
            report.failed_writes
        ));
    }

    out
}
