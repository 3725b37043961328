//! Input Rate Agent CLI
//!
//! Live APM / PPM readout from the global input hook.

use anyhow::Context;
use clap::{Parser, Subcommand};
use chrono::{DateTime, Utc};
use input_rate_agent::{
    collector::{check_permission, MouseButton},
    config::{Config, ConfigOverrides},
    Aggregator, CollectorConfig, HookRegistry, Position, VERSION,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "input-rate")]
#[command(version = VERSION)]
#[command(about = "Sliding-window keyboard and pointer activity rates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hook keyboard and pointer input and report rates until Ctrl+C
    Run {
        /// Window size in ticks (overrides the config file)
        #[arg(long)]
        window_size: Option<usize>,

        /// Ticks per second (overrides the config file)
        #[arg(long)]
        tick_rate: Option<u32>,

        /// Seconds between reports (overrides the config file)
        #[arg(long)]
        report_interval: Option<u64>,

        /// Input sources to capture (keyboard, pointer, or all)
        #[arg(long)]
        sources: Option<String>,
    },

    /// Feed synthetic input through an aggregator and print the result
    Simulate {
        /// Number of ticks to run
        #[arg(long, default_value = "600")]
        ticks: u32,

        /// Key actions recorded before each tick
        #[arg(long, default_value = "1")]
        keys_per_tick: u32,

        /// Pointer distance recorded before each tick
        #[arg(long, default_value = "10")]
        pixels_per_tick: f64,

        /// Milliseconds between ticks
        #[arg(long, default_value = "16")]
        tick_millis: i64,

        /// Window size in ticks
        #[arg(long, default_value = "300")]
        window_size: usize,
    },

    /// Show or change the saved configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the configuration (default)
    Show,

    /// Change saved settings
    Set {
        /// Window size in ticks
        #[arg(long)]
        window_size: Option<usize>,

        /// Ticks per second
        #[arg(long)]
        tick_rate: Option<u32>,

        /// Seconds between reports
        #[arg(long)]
        report_interval: Option<u64>,

        /// Input sources to capture (keyboard, pointer, or all)
        #[arg(long)]
        sources: Option<String>,
    },

    /// Restore the default configuration
    Reset,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            window_size,
            tick_rate,
            report_interval,
            sources,
        } => cmd_run(ConfigOverrides {
            window_size,
            tick_rate_hz: tick_rate,
            report_interval_secs: report_interval,
            sources,
        }),
        Commands::Simulate {
            ticks,
            keys_per_tick,
            pixels_per_tick,
            tick_millis,
            window_size,
        } => cmd_simulate(ticks, keys_per_tick, pixels_per_tick, tick_millis, window_size),
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => cmd_config(),
            ConfigAction::Set {
                window_size,
                tick_rate,
                report_interval,
                sources,
            } => cmd_config_set(ConfigOverrides {
                window_size,
                tick_rate_hz: tick_rate,
                report_interval_secs: report_interval,
                sources,
            }),
            ConfigAction::Reset => cmd_config_reset(),
        },
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(overrides: ConfigOverrides) -> anyhow::Result<()> {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not load config, using defaults");
        Config::default()
    });
    config.apply(&overrides);
    if !config.sources.any_enabled() {
        anyhow::bail!("at least one source must be enabled (keyboard or pointer)");
    }

    println!("Input Rate Agent v{VERSION}");
    println!("  Window: {} ticks at {} Hz", config.window_size, config.tick_rate_hz);
    println!("  Keyboard: {}", enabled(config.sources.keyboard));
    println!("  Pointer: {}", enabled(config.sources.pointer));
    println!();

    if !check_permission() {
        warn!("Input Monitoring permission not granted; grant it in System Settings > Privacy & Security > Input Monitoring");
    }

    let registry = HookRegistry::platform(CollectorConfig {
        capture_keyboard: config.sources.keyboard,
        capture_pointer: config.sources.pointer,
    });

    let clock = Instant::now();
    let now_millis = || clock.elapsed().as_millis() as i64;

    let aggregator = match Aggregator::attach(config.window_size, now_millis(), &registry) {
        Ok(aggregator) => aggregator,
        Err(e) => {
            warn!(error = %e, "input hook unavailable, continuing without live statistics");
            Arc::new(Aggregator::new(config.window_size, now_millis()))
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")?;

    println!("Press Ctrl+C to stop");
    println!();

    let tick_interval = config.tick_interval();
    let mut last_report = Instant::now();

    while running.load(Ordering::SeqCst) {
        thread::sleep(tick_interval);
        aggregator.tick(now_millis());

        if last_report.elapsed() >= config.report_interval {
            let data = aggregator.sample();
            let activity = aggregator.activity(Utc::now());
            println!(
                "APM: {:>5} (instant {:>5}) | CPM: {:>5} | PPM: {:>7} | actions: {:>7} | clicks: {:>6} | distance: {:>9}",
                data.key_rate_per_minute,
                activity.instant_apm,
                activity.instant_clicks_per_minute,
                data.move_rate_per_minute,
                data.total_actions,
                activity.total_clicks,
                data.total_distance
            );
            last_report = Instant::now();
        }
    }

    println!();
    println!("Stopping...");
    aggregator.shutdown().context("releasing the input hook")?;

    let data = aggregator.sample();
    info!(
        total_actions = data.total_actions,
        total_distance = data.total_distance,
        "session finished"
    );
    println!("Total actions: {}", data.total_actions);
    println!("Total clicks: {}", aggregator.total_clicks());
    println!("Total distance: {} px", data.total_distance);
    Ok(())
}

fn cmd_simulate(
    ticks: u32,
    keys_per_tick: u32,
    pixels_per_tick: f64,
    tick_millis: i64,
    window_size: usize,
) -> anyhow::Result<()> {
    let aggregator = Aggregator::new(window_size, 0);
    let stamp = |millis: i64| DateTime::from_timestamp_millis(millis).unwrap_or_default();
    let mut x = 0.0;
    let mut now = 0i64;

    for _ in 0..ticks {
        let started = now;
        now = now.saturating_add(tick_millis);

        // Spread each tick's presses evenly across it
        let spacing = tick_millis / i64::from(keys_per_tick.max(1));
        for key in 0..keys_per_tick {
            let at = started.saturating_add(spacing.saturating_mul(i64::from(key)));
            aggregator.record_key_down(0, None, stamp(at));
            aggregator.record_key_up(0);
        }
        aggregator.record_click(MouseButton::Left, stamp(now));

        x += pixels_per_tick;
        aggregator.record_pointer_move(Position::new(x, 0.0));
        aggregator.tick(now);
    }

    let report = serde_json::json!({
        "window": aggregator.window_summary(),
        "current": aggregator.sample(),
        "activity": aggregator.activity(stamp(now)),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_set(overrides: ConfigOverrides) -> anyhow::Result<()> {
    if overrides.is_empty() {
        anyhow::bail!("nothing to set; pass at least one of --window-size, --tick-rate, --report-interval, --sources");
    }

    let mut config = Config::load()?;
    if !config.apply(&overrides) {
        println!("Configuration unchanged.");
        return Ok(());
    }
    if !config.sources.any_enabled() {
        anyhow::bail!("at least one source must be enabled (keyboard or pointer)");
    }

    config.save().context("saving configuration")?;
    info!(path = ?Config::config_path(), "configuration saved");
    println!("Configuration saved to {:?}", Config::config_path());
    Ok(())
}

fn cmd_config_reset() -> anyhow::Result<()> {
    Config::default()
        .save()
        .context("saving configuration")?;
    println!("Configuration reset to defaults.");
    Ok(())
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}
