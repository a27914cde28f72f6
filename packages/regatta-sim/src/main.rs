//! main.rs — Regatta race simulator entry point
//!
//! Runs two concurrent pieces:
//!   1. Frame loop: advances the race session at tick_rate_hz, appends
//!      finishes to the results ledger, broadcasts a snapshot per frame
//!   2. WebSocket server: control panel on ctrl_port (helm/tack/trim input,
//!      countdown/start/pause/reset, live snapshot feed)
//!
//! `--headless` skips the server, hands every boat to the autopilot and exits
//! once the race is over.

mod results_log;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::{ws::{Message, WebSocket}, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use clap::Parser;
use serde::Deserialize;
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use regatta_sim::session::MAX_FRAME_DT;
use regatta_sim::{ControlInput, Helm, Intent, RaceConfig, Simulation, TrimMode};
use regatta_types::{BoatId, RacePhase};
use results_log::{EntryKind, ResultLedger};

/// Catch-up steps allowed per frame when running faster than real time
const MAX_SUBSTEPS: u32 = 20;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "regatta-sim", about = "Multi-boat sailing race simulator")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Venue id (overrides config)
    #[arg(long)]
    venue: Option<String>,
    /// RNG seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,
    /// Fleet size 1–4; boat 1 is local, the rest are autopilot
    #[arg(long)]
    boats: Option<usize>,
    /// Simulation speed multiplier (1.0 = real-time)
    #[arg(long, default_value = "1.0")]
    speed: f64,
    /// Control panel WebSocket port (overrides config)
    #[arg(long)]
    ctrl_port: Option<u16>,
    /// No server; autopilot sails every boat; exit when the race is over
    #[arg(long)]
    headless: bool,
    /// Start the countdown immediately
    #[arg(long)]
    autostart: bool,
    /// With --autostart or --headless, fire the gun straight away
    #[arg(long)]
    skip_countdown: bool,
    /// Headless only: give up after this many simulated seconds
    #[arg(long, default_value = "1800")]
    max_race_secs: f64,
}

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FullConfig {
    race: RaceConfig,
    simulation: SimulationConfig,
}

#[derive(Debug, Deserialize)]
struct SimulationConfig {
    tick_rate_hz: f64,
    ctrl_port: u16,
    /// JSON-lines results ledger; unset logs blocks only
    results_path: Option<String>,
}

fn load_config(args: &Args) -> Result<FullConfig> {
    let config_str = std::fs::read_to_string(&args.config)
        .unwrap_or_else(|_| include_str!("../config.toml").to_string());
    let mut cfg: FullConfig = toml::from_str(&config_str)
        .with_context(|| format!("invalid config file {}", args.config))?;

    if let Some(venue) = &args.venue {
        cfg.race.venue = venue.clone();
    }
    if args.seed.is_some() {
        cfg.race.seed = args.seed;
    }
    if let Some(n) = args.boats {
        cfg.race = cfg.race.with_fleet(n);
    }
    if let Some(port) = args.ctrl_port {
        cfg.simulation.ctrl_port = port;
    }
    if args.headless {
        for entry in &mut cfg.race.boats {
            entry.is_local = false;
        }
    }
    if !(cfg.simulation.tick_rate_hz > 0.0) {
        anyhow::bail!("tick_rate_hz must be greater than zero");
    }
    cfg.race.validate().context("invalid race config")?;
    Ok(cfg)
}

// ── Shared state ──────────────────────────────────────────────────────────────

struct SimState {
    sim: Simulation,
    speed: f64,
    /// Latest snapshot JSON, sent to clients on connect
    last_snapshot: Option<String>,
}

type SharedState = Arc<RwLock<SimState>>;

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regatta_sim=info".into()),
        )
        .init();

    let args = Args::parse();
    let cfg = load_config(&args)?;

    info!(
        "⛵ Regatta simulator starting — {} at {}, {} boats, countdown {}s",
        if args.headless { "headless" } else { "interactive" },
        cfg.race.venue,
        cfg.race.boats.len(),
        cfg.race.countdown_secs
    );

    let mut sim = Simulation::new(&cfg.race).context("failed to build race session")?;
    // Nobody can press start in headless mode
    if args.autostart || args.headless {
        if args.skip_countdown { sim.start_race() } else { sim.start_countdown() }
    }

    let results_path = cfg.simulation.results_path.as_ref().map(PathBuf::from);
    if let Some(path) = &results_path {
        match results_log::audit_file(path).await {
            Ok(audit) if audit.broken > 0 || audit.unreadable > 0 => warn!(
                "Ledger {}: {} of {} sessions fail verification, {} unreadable lines",
                path.display(),
                audit.broken,
                audit.sessions,
                audit.unreadable
            ),
            Ok(audit) => info!("Ledger {}: {} earlier sessions verified", path.display(), audit.sessions),
            Err(e) => warn!("Ledger: could not read {}: {e}", path.display()),
        }
    }

    let mut ledger = ResultLedger::new(results_path);
    ledger
        .append(
            EntryKind::SessionStarted,
            serde_json::json!({
                "venue": cfg.race.venue,
                "boats": cfg.race.boats,
                "seed": cfg.race.seed,
            }),
        )
        .await;
    info!("📒 Results ledger session {}", ledger.session_id());

    let shared: SharedState = Arc::new(RwLock::new(SimState {
        sim,
        speed: args.speed.clamp(0.1, 20.0),
        last_snapshot: None,
    }));

    // Broadcast channel for snapshots (web UI)
    let (telem_tx, _) = broadcast::channel::<String>(64);
    let telem_tx = Arc::new(telem_tx);
    let tick_rate = cfg.simulation.tick_rate_hz;

    if args.headless {
        sim_loop(shared, telem_tx, tick_rate, ledger, Some(args.max_race_secs)).await;
        return Ok(());
    }

    let shared_loop = shared.clone();
    let telem_tx_loop = telem_tx.clone();
    tokio::spawn(async move {
        sim_loop(shared_loop, telem_tx_loop, tick_rate, ledger, None).await;
    });

    let ctrl_addr = format!("0.0.0.0:{}", cfg.simulation.ctrl_port);
    info!("🖥  Control panel WebSocket at ws://{ctrl_addr}/ws");

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "regatta-sim ok" }))
        .with_state((shared.clone(), telem_tx.clone()))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let listener = tokio::net::TcpListener::bind(&ctrl_addr)
        .await
        .with_context(|| format!("failed to bind {ctrl_addr}"))?;
    axum::serve(listener, app).await.context("control server failed")?;
    Ok(())
}

// ── Frame loop ────────────────────────────────────────────────────────────────

/// Drive the session from the wall clock. With `headless_limit` set, return
/// once the race is Finished or that many simulated seconds have passed.
async fn sim_loop(
    state: SharedState,
    telem: Arc<broadcast::Sender<String>>,
    tick_rate_hz: f64,
    mut ledger: ResultLedger,
    headless_limit: Option<f64>,
) {
    let frame = Duration::from_secs_f64(1.0 / tick_rate_hz);
    let mut ticker = interval(frame);
    let mut last = Instant::now();
    let mut frame_counter: u64 = 0;

    info!("⚓ Frame loop running at {tick_rate_hz} Hz");

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let wall = now.duration_since(last).as_secs_f64();
        last = now;

        let (events, snapshot_json, phase, clock) = {
            let mut s = state.write().await;
            // Headless steps a fixed frame so a slow host never skips sim time
            let mut remaining = if headless_limit.is_some() { frame.as_secs_f64() * s.speed } else { wall * s.speed };
            let mut steps = 0;
            while remaining > 0.0 && steps < MAX_SUBSTEPS {
                let step = remaining.min(MAX_FRAME_DT);
                s.sim.tick(step);
                remaining -= step;
                steps += 1;
            }
            let events = s.sim.drain_events();
            let snapshot = s.sim.snapshot();
            let json = serde_json::json!({ "type": "snapshot", "data": snapshot }).to_string();
            s.last_snapshot = Some(json.clone());
            (events, json, snapshot.phase, snapshot.clock)
        };

        for event in &events {
            ledger.record_event(event).await;
        }
        let _ = telem.send(snapshot_json);
        for event in events {
            if let Ok(json) = serde_json::to_string(&serde_json::json!({ "type": "event", "data": event })) {
                let _ = telem.send(json);
            }
        }

        frame_counter += 1;
        if frame_counter % (tick_rate_hz as u64 * 10).max(1) == 0 {
            info!("⏱ t={clock:.0}s | phase={phase:?}");
        }

        if let Some(limit) = headless_limit {
            if phase == RacePhase::Finished {
                let s = state.read().await;
                for r in s.sim.race().results() {
                    info!("🏁 #{} {} (boat {}) in {:.1}s", r.rank, r.user_id, r.boat_number, r.finish_time_ms as f64 / 1000.0);
                }
                return;
            }
            if clock >= limit {
                warn!("Race not finished after {limit:.0}s simulated, stopping");
                return;
            }
        }
    }
}

// ── WebSocket control handler ─────────────────────────────────────────────────

async fn ws_handler(
    ws: WebSocketUpgrade,
    State((state, telem_tx)): State<(SharedState, Arc<broadcast::Sender<String>>)>,
) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state, telem_tx))
}

async fn handle_ws(mut socket: WebSocket, state: SharedState, telem_tx: Arc<broadcast::Sender<String>>) {
    let mut telem_rx = telem_tx.subscribe();

    // Send current state immediately on connect
    let initial = state.read().await.last_snapshot.clone();
    if let Some(snapshot) = initial {
        let _ = socket.send(Message::Text(snapshot)).await;
    }

    loop {
        tokio::select! {
            Ok(msg) = telem_rx.recv() => {
                if socket.send(Message::Text(msg)).await.is_err() { break; }
            }
            Some(Ok(Message::Text(cmd))) = socket.recv() => {
                handle_command(&state, &cmd).await;
            }
            else => break,
        }
    }
}

fn parse_boat(v: &serde_json::Value) -> Option<BoatId> {
    v["args"]["boat"].as_u64().and_then(|n| u32::try_from(n).ok()).map(BoatId)
}

/// Handle commands from the control panel.
/// Commands are JSON: { "cmd": "...", "args": {...} }
async fn handle_command(state: &SharedState, raw: &str) {
    let v: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return,
    };
    let cmd = v["cmd"].as_str().unwrap_or("");
    let mut s = state.write().await;
    match cmd {
        "helm" | "tack" | "trim" => {
            let Some(boat) = parse_boat(&v) else {
                warn!("{cmd}: missing boat id");
                return;
            };
            let intent = match cmd {
                "tack" => Intent::Tack,
                "helm" => match v["args"]["dir"].as_str().unwrap_or("center") {
                    "left" => Intent::Helm(Helm::Left),
                    "right" => Intent::Helm(Helm::Right),
                    _ => Intent::Helm(Helm::Center),
                },
                _ => match v["args"]["mode"].as_str().unwrap_or("full") {
                    "luff" => Intent::Trim(TrimMode::Luff),
                    _ => Intent::Trim(TrimMode::Full),
                },
            };
            s.sim.queue_input(ControlInput { boat, intent });
        }
        "start_countdown" => s.sim.start_countdown(),
        "start_race" => s.sim.start_race(),
        "finish" => {
            if let Some(boat) = parse_boat(&v) {
                s.sim.finish_race(boat);
            }
        }
        "pause" => s.sim.pause(),
        "resume" => s.sim.resume(),
        "reset" => s.sim.reset_race(),
        "set_speed" => {
            if let Some(sp) = v["args"]["speed"].as_f64() {
                s.speed = sp.clamp(0.1, 20.0);
                info!("⚡ Sim speed set to {}×", s.speed);
            }
        }
        _ => warn!("Unknown control command: {cmd}"),
    }
}
