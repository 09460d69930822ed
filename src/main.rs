//! unlockboard - on-screen keyboard for unlocking encrypted storage
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              Host Loop                   │
//! ├──────────────────────────────────────────┤
//! │  udev hotplug  →  InputDevices          │
//! │                          ↓               │
//! │  libinput  →  UI endpoints (InputHub)   │
//! │                          ↓               │
//! │              widget tree (UiEvent)       │
//! └──────────────────────────────────────────┘
//! ```

mod config;
mod constants;
mod indev;
mod signals;
mod ui;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info, trace, warn};

use crate::constants::INPUT_READ_INTERVAL_MS;
use crate::indev::{BackendBinding, InputBackend, InputDevices};

/// Parsed command line
struct Args {
    config: Option<PathBuf>,
    overrides: Vec<PathBuf>,
    verbose: bool,
    list_devices: bool,
}

fn print_help() {
    println!(
        r#"unlockboard {} - on-screen keyboard for unlocking encrypted storage

USAGE:
    unlockboard [OPTIONS]

OPTIONS:
    -c, --config PATH           Use PATH instead of the default config lookup
    -C, --config-override PATH  Merge PATH on top of the config (repeatable)
    -v, --verbose               Enable more detailed logging output
        --list-devices          Connect available input devices, list them and exit
    -h, --help                  Print this help message
    -V, --version               Print version information

CONFIG FILE:
    $UNLOCKBOARD_CONFIG, ~/.config/unlockboard/config.toml or /etc/unlockboard.conf
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Returns None when the process should exit after printing help/version
fn parse_args() -> Result<Option<Args>> {
    let mut pargs = pico_args::Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print_help();
        return Ok(None);
    }

    if pargs.contains(["-V", "--version"]) {
        println!("unlockboard {}", env!("CARGO_PKG_VERSION"));
        return Ok(None);
    }

    let args = Args {
        config: pargs
            .opt_value_from_str::<_, PathBuf>(["-c", "--config"])
            .context("Invalid --config value")?,
        overrides: pargs
            .values_from_str::<_, PathBuf>(["-C", "--config-override"])
            .context("Invalid --config-override value")?,
        verbose: pargs.contains(["-v", "--verbose"]),
        list_devices: pargs.contains("--list-devices"),
    };

    let rest = pargs.finish();
    if !rest.is_empty() {
        eprintln!("Ignoring unknown arguments: {:?}", rest);
    }

    Ok(Some(args))
}

fn main() -> Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    info!("unlockboard starting...");

    let cfg = config::Config::load(args.config.as_deref(), &args.overrides);
    debug!("Effective config: {:?}", cfg);

    run(cfg, args.list_devices)
}

#[cfg(target_os = "linux")]
fn run(cfg: config::Config, list_devices: bool) -> Result<()> {
    let hub = ui::InputHub::new();
    let backend = indev::LibinputBackend::new(cfg.display.width, cfg.display.height, &cfg.keyboard)
        .context("Cannot initialize input backend")?;
    let mut devices = InputDevices::new(backend, indev::UdevBus::new(), hub.clone());

    // Route physical key presses into the password field
    devices.set_keyboard_group(hub.create_group("password"));

    devices.configure_allowed_capabilities(
        cfg.input.keyboard,
        cfg.input.pointer,
        cfg.input.touchscreen,
    );

    if list_devices {
        devices.enumerate_and_connect_all();
        print_devices(&devices);
        return Ok(());
    }

    if cfg.monitor.enabled {
        if let Err(e) = devices.start_monitor() {
            warn!("Input hotplug disabled for this session: {}", e);
        }
    }
    let connected = devices.enumerate_and_connect_all();
    info!("{} input devices connected", connected);

    let mut keyboard_connected = devices.is_keyboard_connected();
    report_keyboard(&cfg, keyboard_connected);

    signals::setup_signal_handlers().context("Cannot install signal handlers")?;

    let tick = Duration::from_millis(INPUT_READ_INTERVAL_MS);
    let poll_interval = Duration::from_millis(cfg.monitor.poll_interval_ms());
    let mut last_poll = Instant::now();

    while !signals::shutdown_requested() {
        devices.read_input();
        for event in hub.drain_events() {
            trace!("UI input: {:?}", event);
        }

        if devices.is_monitoring() && last_poll.elapsed() >= poll_interval {
            last_poll = Instant::now();
            if devices.poll_and_apply() > 0 {
                let now_connected = devices.is_keyboard_connected();
                if now_connected != keyboard_connected {
                    keyboard_connected = now_connected;
                    report_keyboard(&cfg, keyboard_connected);
                }
            }
        }

        std::thread::sleep(tick);
    }

    info!("Shutdown requested, releasing input devices");
    devices.shutdown();
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn run(_cfg: config::Config, _list_devices: bool) -> Result<()> {
    anyhow::bail!("unlockboard requires Linux (udev + libinput)")
}

/// On-screen keyboard visibility follows physical keyboard presence
fn report_keyboard(cfg: &config::Config, keyboard_connected: bool) {
    if !cfg.keyboard.autohide {
        return;
    }
    if keyboard_connected {
        info!("Physical keyboard connected, hiding on-screen keyboard");
    } else {
        info!("No physical keyboard, showing on-screen keyboard");
    }
}

fn print_devices<B: InputBackend, Bus: indev::DeviceBus>(devices: &InputDevices<B, Bus>) {
    let registry = devices.registry();
    if registry.is_empty() {
        println!("No input devices connected (allowed: {})", devices.allowed_capabilities());
        return;
    }
    for record in registry.iter() {
        println!(
            "{:<24} {:<18} {}",
            record.node(),
            record.capability().to_string(),
            record.binding().name().unwrap_or_default()
        );
    }
}
