// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Eno scheduler daemon (`eno-schedulerd`)
//!
//! Runs the dispatch loop continuously and exposes a Prometheus `/metrics`
//! endpoint plus a `/healthz` liveness probe, wiring `axum` around a
//! long-running background task.
//!
//! Phase 1 ships only [`eno_cluster_port::InMemoryClusterStore`] — there is
//! no real apiserver backend to connect to yet, so this daemon runs the
//! dispatch loop against an empty in-memory cluster. Wiring a `kube`-backed
//! [`eno_cluster_port::ClusterStore`] is future work at the same seam this
//! binary already depends on.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::Parser;
use eno_cluster_port::InMemoryClusterStore;
use eno_config::scheduler_config::SchedulerConfig;
use eno_config_fs::FsConfigStore;
use eno_kernel::Kernel;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Port the metrics/health HTTP server listens on.
    #[clap(short = 'p', long, default_value_t = 9090)]
    metrics_port: u16,

    /// Read `SchedulerConfig` from the platform config directory instead of
    /// using compiled-in defaults.
    #[clap(long)]
    load_config: bool,
}

#[derive(Clone)]
struct AppState {
    prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("install prometheus recorder")?;

    let config = if args.load_config {
        let store = FsConfigStore::new().context("open filesystem config store")?;
        SchedulerConfig::load_or_default(&store).context("load scheduler config")?
    } else {
        SchedulerConfig::default()
    };
    info!(?config, "starting eno-schedulerd");

    let kernel = Arc::new(Kernel::new(InMemoryClusterStore::new(), config));

    let state = AppState { prometheus_handle };
    let app = Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.metrics_port));
    let listener = TcpListener::bind(addr).await.context("bind metrics listener")?;
    info!(%addr, "metrics/health server listening");
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(%err, "metrics server exited");
        }
    });

    if let Err(err) = kernel.run().await {
        error!(%err, "dispatch loop exited with an error");
        return Err(err);
    }

    Ok(())
}

async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, state.prometheus_handle.render())
}
