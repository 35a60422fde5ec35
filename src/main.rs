//! LabExtended host: wires the hook core into a tick loop.
//!
//! Loads configuration, starts logging, loads the internal module, then ticks
//! the coroutine scheduler at the configured rate while replaying a scripted
//! round of server events.

mod internal;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use labext_core::config::HostConfig;
use labext_core::error::AppError;
use labext_core::events::{
    PlayerJoinedArgs, PlayerLeftArgs, PlayerSpawningArgs, PlayerUsingItemArgs, RoundEndedArgs,
    RoundRestartingArgs, RoundStartedArgs, WaitingForPlayersArgs,
};
use labext_core::Event;
use labext_hooks::{EventCatalog, HookDispatcher, ModuleManager};

use internal::InternalModule;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "labext-host", version, about = "LabExtended hook host")]
struct Args {
    /// Configuration directory.
    #[arg(long, default_value = "config")]
    config: String,

    /// Environment overlay to load from the configuration directory.
    #[arg(long, default_value = "development")]
    env: String,

    /// Stop after this many ticks (0 = until interrupted).
    #[arg(long)]
    ticks: Option<u64>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match HostConfig::load(&args.config, &args.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(ticks) = args.ticks {
        config.host.run_ticks = ticks;
    }

    init_logging(&config);
    tracing::info!(config_dir = %args.config, env = %args.env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Host error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &HostConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main host run function
async fn run(config: HostConfig) -> Result<(), AppError> {
    tracing::info!("Starting LabExtended host v{}", env!("CARGO_PKG_VERSION"));

    if config.host.tick_rate_hz == 0 {
        return Err(AppError::configuration("host.tick_rate_hz must be positive"));
    }

    let catalog = Arc::new(EventCatalog::builtin());
    tracing::debug!(events = ?catalog.names(), "Event catalog ready");

    let manager = ModuleManager::new(catalog, config.hooks.clone(), config.modules.clone());

    let internal = Arc::new(InternalModule::new());
    manager.load_module(internal.clone()).await?;

    for event in manager.hook_registry().registered_events() {
        let handlers = manager.hook_registry().handlers(event);
        match serde_json::to_string(&handlers) {
            Ok(json) => tracing::debug!(event = %event, handlers = %json, "Registered handlers"),
            Err(e) => tracing::warn!(event = %event, error = %e, "Could not serialize handlers"),
        }
    }

    let period = Duration::from_secs_f64(1.0 / f64::from(config.host.tick_rate_hz));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut tick: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }

        tick += 1;
        fire_scripted(manager.dispatcher(), tick);

        let report = manager.tick();
        if report.resumed > 0 {
            tracing::trace!(
                tick,
                resumed = report.resumed,
                finished = report.finished,
                pending = report.pending,
                "Scheduler tick"
            );
        }

        if config.host.run_ticks > 0 && tick >= config.host.run_ticks {
            tracing::info!(tick, "Tick limit reached");
            break;
        }
    }

    tracing::info!(
        ticks = tick,
        phase = %internal.tracker().phase(),
        players = internal.tracker().player_count(),
        "Stopping host"
    );

    manager.scheduler().cancel_all();
    manager.unload_all().await?;

    Ok(())
}

/// Replays one round of server events, spread over the first ticks.
fn fire_scripted(dispatcher: &HookDispatcher, tick: u64) {
    match tick {
        1 => fire(dispatcher, &WaitingForPlayersArgs {}),
        2 => {
            fire(
                dispatcher,
                &PlayerJoinedArgs {
                    player_id: 2,
                    nickname: "Agent Cobalt".to_string(),
                    user_id: "76561198000000002@steam".to_string(),
                },
            );
            fire(
                dispatcher,
                &PlayerJoinedArgs {
                    player_id: 3,
                    nickname: "D-9341".to_string(),
                    user_id: "76561198000000003@steam".to_string(),
                },
            );
        }
        3 => use_item(dispatcher, 3, "keycard_o5", 41),
        10 => fire(dispatcher, &RoundStartedArgs {}),
        11 => fire(
            dispatcher,
            &PlayerSpawningArgs {
                player_id: 3,
                role: "class_d".to_string(),
                position: [29.0, 991.5, -26.0],
            },
        ),
        12 => use_item(dispatcher, 3, "medkit", 42),
        200 => fire(
            dispatcher,
            &RoundEndedArgs {
                leading_team: "chaos_insurgency".to_string(),
            },
        ),
        201 => fire(dispatcher, &PlayerLeftArgs { player_id: 2 }),
        240 => fire(dispatcher, &RoundRestartingArgs {}),
        _ => {}
    }
}

fn fire<E: Event>(dispatcher: &HookDispatcher, args: &E) {
    let permitted = dispatcher.fire(args);
    tracing::info!(event = E::NAME, permitted, "Event dispatched");
}

/// Fires `player_using_item` mutably and applies what handlers wrote back.
fn use_item(dispatcher: &HookDispatcher, player_id: u32, item: &str, item_serial: u16) {
    let mut args = PlayerUsingItemArgs {
        player_id,
        item: item.to_string(),
        item_serial,
        remaining_cooldown: 0.0,
        speed_multiplier: 1.0,
    };
    let permitted = dispatcher.fire_mut(&mut args);
    let started = permitted && args.remaining_cooldown <= 0.0 && args.speed_multiplier > 0.0;
    tracing::info!(
        event = PlayerUsingItemArgs::NAME,
        permitted,
        started,
        remaining_cooldown = args.remaining_cooldown,
        speed_multiplier = args.speed_multiplier,
        "Event dispatched"
    );
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
