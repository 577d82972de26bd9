//! ncpanel Daemon - Main entry point
//!
//! Finds the controller, keeps a session to it, and drives the status panel.
//! Optionally serves a read-only dashboard.

mod api;
mod config;
mod host;
mod logging;
mod panel;
mod server;
mod state;

use anyhow::Result;
use clap::Parser;
use ncpanel_core::{stop_channel, Clock, StopSender, SystemClock};
use ncpanel_discovery::{Discovery, MdnsBrowser};
use ncpanel_display::{draw_test_pattern, FrameBuffer, Layout, MonoGlyphs, Renderer};
use ncpanel_session::{AddressSource, ConnectionManager, WsTransport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Session events buffered between the manager and the panel loop
const EVENT_BUFFER: usize = 64;

/// Upper bound on a single WebSocket handshake
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "ncpanel")]
#[command(about = "FluidNC status panel daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ncpanel.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Controller address; skips discovery
    #[arg(long)]
    host: Option<String>,

    /// Run discovery once, print the result and exit
    #[arg(long)]
    discover_once: bool,

    /// Show the test pattern on the panel and exit
    #[arg(long)]
    test_pattern: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration; logging needs it, so failures go to stderr
    let mut config = config::load_config(&args.config)?;

    // Initialize logging
    let _log_guard = logging::init(logging::parse_level(&args.log_level), &config.logging)?;
    info!("ncpanel v{}", env!("CARGO_PKG_VERSION"));

    if let Some(host) = args.host {
        config.controller.static_ip = Some(host);
    }

    info!(
        hostname = %config.controller.hostname,
        static_ip = ?config.controller.static_ip,
        port = config.controller.port,
        dashboard = config.dashboard.enabled,
        log_file = ?config.logging.file,
        "Configuration loaded"
    );

    if args.test_pattern {
        let mut sink = config.open_sink()?;
        let mut frame = FrameBuffer::new(config.display.width, config.display.height);
        draw_test_pattern(&mut frame);
        sink.push(&frame)?;
        info!("Test pattern shown");
        return Ok(());
    }

    let (stop_tx, stop_rx) = stop_channel();
    spawn_signal_handler(stop_tx.clone());

    if args.discover_once {
        // Single discovery mode
        let discovery = Discovery::new(Arc::new(MdnsBrowser::new()), config.to_discovery_options());
        let mut stop = stop_rx.clone();
        match discovery.discover(&config.controller.hostname, &mut stop).await {
            Ok(address) => {
                println!("Found {} at {}", config.controller.hostname, address);
                println!("  {}", address.ws_url(&config.controller.path));
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Open the panel before anything connects so a bad device fails fast
    let sink = config.open_sink()?;
    let layout = Layout::new(config.display.width, config.display.height);
    let renderer = Renderer::new(sink, Box::new(MonoGlyphs::new()), clock.clone(), layout);

    let source = match config.static_address() {
        Some(address) => {
            info!(address = %address, "Using static controller address");
            AddressSource::Static(address)
        }
        None => AddressSource::Discover {
            discovery: Discovery::new(Arc::new(MdnsBrowser::new()), config.to_discovery_options()),
            name: config.controller.hostname.clone(),
        },
    };

    let transport = Arc::new(WsTransport::new(config.controller.path.clone(), CONNECT_TIMEOUT));
    let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
    let manager = ConnectionManager::new(
        transport,
        source,
        config.to_session_config(),
        clock,
        events_tx,
    );
    let manager_task = tokio::spawn(manager.run(stop_rx.clone()));

    let (view_tx, view_rx) = state::view_channel();
    let dashboard_task = if config.dashboard.enabled {
        let bind = config.dashboard.bind.clone();
        let stop = stop_rx.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = server::run(view_rx, &bind, stop).await {
                error!(error = %e, "Dashboard failed");
            }
        }))
    } else {
        None
    };

    let result = panel::PanelLoop::new(renderer, view_tx)
        .run(events_rx, stop_rx)
        .await;

    // Whatever ended the panel loop ends everything else too
    let _ = stop_tx.send(true);
    if let Err(e) = manager_task.await {
        warn!(error = %e, "Connection manager task failed");
    }
    if let Some(task) = dashboard_task {
        if let Err(e) = task.await {
            warn!(error = %e, "Dashboard task failed");
        }
    }

    if let Err(e) = result {
        error!(error = %e, "Display failure");
        return Err(e.into());
    }

    info!("Shutdown complete");
    Ok(())
}

/// Flip the stop flag on SIGINT or SIGTERM
fn spawn_signal_handler(stop: StopSender) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown requested");
        let _ = stop.send(true);
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Failed to install signal handlers, falling back to Ctrl+C");
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Ctrl+C handler failed");
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Ctrl+C handler failed");
        std::future::pending::<()>().await;
    }
}
