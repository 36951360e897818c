//! # Lodestone Server
//!
//! The authoritative game server binary (spec.md §5): a dedicated
//! simulation thread driving the fixed-rate tick, and a tokio accept
//! loop handling the network protocol. Startup wires the content
//! catalog, the persisted world, and the two workers together; shutdown
//! stops accepting connections, flushes everything to disk, and joins
//! the simulation thread before exiting.

mod auth;
mod broadcast;
mod config;
mod dispatch;
mod error;
mod persist;
mod players;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lodestone_catalog::Catalog;
use lodestone_networking::{NetworkServer, ServerConfig, TickLoop};
use lodestone_persistence::{PersistenceStore, WorldMeta};
use lodestone_shared::{constants, PlayerAction, PlayerId};
use lodestone_simulation::Simulation;
use lodestone_world::{ChunkStore, WorldSeed};

use config::ServerArgs;
use error::StartupError;
use players::PlayerTable;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(config) = config::parse_args(&args[1..]) else {
        return ExitCode::SUCCESS;
    };

    println!("+----------------------------------------------------------+");
    println!("|                    LODESTONE SERVER                      |");
    println!("+----------------------------------------------------------+");
    println!();
    println!("| bind address:  {}:{}", config.host, config.port);
    println!("| save path:     {}", config.save_path().display());
    if let Ok(mongo) = std::env::var("MONGO_URI") {
        println!("| MONGO_URI is set ({mongo}) but this server always loads the embedded default catalog");
    }
    println!();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server failed to start");
            #[allow(clippy::cast_sign_loss)]
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(config: ServerArgs) -> Result<(), StartupError> {
    let save_path = config.save_path();
    let save_dir = save_path.parent().map(std::path::Path::to_path_buf).unwrap_or_default();
    if !save_dir.as_os_str().is_empty() {
        std::fs::create_dir_all(&save_dir)
            .map_err(|source| StartupError::SaveDir { path: save_dir.display().to_string(), source })?;
    }

    let persistence = Arc::new(
        PersistenceStore::open(&save_path)
            .map_err(|source| StartupError::Persistence { path: save_path.display().to_string(), source })?,
    );

    let catalog = Arc::new(Catalog::load_defaults().map_err(StartupError::Catalog)?);

    let meta = persistence
        .load_world_meta()
        .ok()
        .flatten()
        .unwrap_or(WorldMeta { seed: constants::DEFAULT_WORLD_SEED, tick: 0, next_entity_id: 1 });

    let world = ChunkStore::new(WorldSeed::new(meta.seed), catalog.clone(), Box::new(persistence.clone()));
    let mut simulation = Simulation::new(world, catalog.clone(), meta.next_entity_id, meta.tick);

    match persistence.load_all_entities(&catalog) {
        Ok(entities) => {
            for entity in entities {
                if let Err(err) = simulation.registry_mut().restore(entity) {
                    tracing::warn!(error = %err, "dropped a persisted entity whose tile is already occupied");
                }
            }
        }
        Err(err) => tracing::error!(error = %err, "failed to load persisted entities, starting with none"),
    }

    let next_player_id = persistence.max_player_id().ok().flatten().map_or(1, |max| max + 1);
    let players = PlayerTable::new(next_player_id);

    let server_config = ServerConfig {
        bind_address: config.host.clone(),
        port: config.port,
        idle_timeout: Duration::from_secs(constants::IDLE_TIMEOUT_SECS),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start the tokio runtime");

    let (server, inbound_rx) = runtime
        .block_on(NetworkServer::bind(&server_config))
        .map_err(|source| StartupError::Bind { addr: format!("{}:{}", config.host, config.port), source })?;

    let sessions = server.sessions();
    let shutdown = server.shutdown_handle();

    println!("listening on {}:{}", config.host, config.port);
    println!();

    let stop_simulation = Arc::new(AtomicBool::new(false));

    let sim_thread = {
        let sessions = sessions.clone();
        let catalog = catalog.clone();
        let persistence = persistence.clone();
        let stop_simulation = stop_simulation.clone();

        std::thread::spawn(move || run_simulation_worker(simulation, players, sessions, catalog, persistence, inbound_rx, stop_simulation))
    };

    runtime.block_on(async {
        let serve_handle = tokio::spawn(server.serve());
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
        tracing::info!("shutdown requested");
        shutdown.notify_one();
        let _ = serve_handle.await;
    });

    stop_simulation.store(true, Ordering::Relaxed);
    sim_thread.join().expect("simulation worker panicked");

    println!();
    println!("+----------------------------------------------------------+");
    println!("|                  SERVER SHUTDOWN COMPLETE                |");
    println!("+----------------------------------------------------------+");

    Ok(())
}

/// The simulation worker (spec.md §5): drains inbound network events,
/// ticks at a fixed rate, broadcasts the results, and flushes to
/// persistence periodically and once more before returning.
#[allow(clippy::too_many_arguments)]
fn run_simulation_worker(
    mut simulation: Simulation,
    mut players: PlayerTable,
    sessions: Arc<lodestone_networking::SessionTable>,
    catalog: Arc<Catalog>,
    persistence: Arc<PersistenceStore>,
    mut inbound_rx: tokio::sync::mpsc::UnboundedReceiver<lodestone_networking::Inbound>,
    stop_simulation: Arc<AtomicBool>,
) {
    let mut tick_loop = TickLoop::at_default_rate();
    let mut pending_actions: Vec<(PlayerId, PlayerAction)> = Vec::new();
    let mut last_flush = Instant::now();
    let flush_interval = Duration::from_secs(constants::FLUSH_INTERVAL_SECS);

    while !stop_simulation.load(Ordering::Relaxed) {
        while let Ok(event) = inbound_rx.try_recv() {
            dispatch::dispatch(
                event,
                &sessions,
                &mut players,
                &mut simulation,
                &catalog,
                &persistence,
                &mut pending_actions,
                constants::DEFAULT_VIEW_DIST,
            );
        }

        tick_loop.wait_for_next_tick();
        while tick_loop.should_tick() {
            let tick_start = tick_loop.begin_tick();
            let actions = std::mem::take(&mut pending_actions);
            let report = simulation.tick(&actions);
            broadcast::broadcast_tick_report(&report, &sessions, simulation.registry(), &catalog);
            tick_loop.end_tick(tick_start);
        }

        if last_flush.elapsed() >= flush_interval {
            persist::flush_all(&mut simulation, &players, &catalog, &persistence);
            last_flush = Instant::now();
        }
    }

    persist::flush_all(&mut simulation, &players, &catalog, &persistence);
}
