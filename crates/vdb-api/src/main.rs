//! `vdb-server` binary: wires settings, the core services, and the REST
//! layer into one running process (§6). Grounded on the teacher's
//! `lumadb` binary (`main.rs` + `server.rs`): load config, construct
//! long-lived state once, run the HTTP server until a shutdown signal,
//! then persist on the way out.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use tracing::{info, warn};

use vdb_api::persistence::PersistenceService;
use vdb_api::replication::ReplicationService;
use vdb_api::routes;
use vdb_api::state::AppState;
use vdb_common::config::NodeRole;
use vdb_common::{metrics, Settings};

/// Host/port overrides layered on top of `VECTORDB_*` env settings, the
/// same override-over-env-over-default precedence as the teacher's `Cli`.
#[derive(Parser)]
#[command(name = "vdb-server", author, version, about = "Multi-tenant in-memory vector database server")]
struct Cli {
    /// Bind address, overrides VECTORDB_HOST
    #[arg(long, env = "VECTORDB_HOST")]
    host: Option<String>,

    /// Bind port, overrides VECTORDB_PORT
    #[arg(long, env = "VECTORDB_PORT")]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    metrics::init_tracing(&settings);

    let runtime = tokio::runtime::Handle::current();
    let state = Arc::new(AppState::new(settings.clone(), runtime));

    if settings.persistence_enabled {
        load_snapshot(&settings, &state);
    }

    if settings.node_role == NodeRole::Follower {
        spawn_replication(&settings, &state);
    }

    let bind_addr = format!("{}:{}", settings.host, settings.port);
    info!(%bind_addr, node_role = ?settings.node_role, "starting vector-db server");

    let data = web::Data::from(state.clone());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind(&bind_addr)?
    .run();

    tokio::select! {
        result = server => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    if settings.persistence_enabled {
        save_snapshot(&settings, &state);
    }

    Ok(())
}

fn load_snapshot(settings: &Settings, state: &AppState) {
    let persistence = PersistenceService::new(&settings.persistence_dir);
    match persistence.load() {
        Ok(snapshot) => {
            state.library_repo.replace_all(snapshot.libraries);
            state.document_repo.replace_all(snapshot.documents);
            state.chunk_repo.replace_all(snapshot.chunks);
            info!(dir = %settings.persistence_dir, "loaded persisted snapshot");
        }
        Err(err) => warn!(error = %err, "failed to load persistence snapshot, starting empty"),
    }
}

fn save_snapshot(settings: &Settings, state: &AppState) {
    let persistence = PersistenceService::new(&settings.persistence_dir);
    if let Err(err) = persistence.save(&state.library_repo, &state.document_repo, &state.chunk_repo) {
        tracing::error!(error = %err, "failed to persist snapshot on shutdown");
    }
}

fn spawn_replication(settings: &Settings, state: &Arc<AppState>) {
    let Some(leader_url) = settings.leader_url.clone() else {
        warn!("node_role is follower but no leader_url is configured; replication disabled");
        return;
    };
    let replication = ReplicationService::new(
        leader_url,
        state.library_repo.clone(),
        state.document_repo.clone(),
        state.chunk_repo.clone(),
        state.index_service.clone(),
    );
    let interval = Duration::from_secs(settings.replication_interval_seconds);
    std::thread::spawn(move || replication.run_forever(interval));
}
