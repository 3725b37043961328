//! Demonstration of live rate aggregation.
//!
//! This example shows how to:
//! 1. Check for Input Monitoring permission
//! 2. Attach two aggregators with different window sizes to one shared hook
//! 3. Drive them from a 60 Hz tick loop
//! 4. Resize a window while running
//!
//! Run with: cargo run --example rate_demo
//!
//! Note: Requires Input Monitoring permission on macOS.
//! Grant permission in System Settings > Privacy & Security > Input Monitoring

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use input_rate_agent::{
    collector::check_permission, Aggregator, CollectorConfig, HookRegistry,
};

fn main() {
    println!("Input Rate Agent - Rate Demo");
    println!("============================");
    println!();

    print!("Checking Input Monitoring permission... ");
    if check_permission() {
        println!("OK ✓");
    } else {
        println!("FAILED ✗");
        println!();
        println!("Please grant Input Monitoring permission:");
        println!("1. Open System Settings");
        println!("2. Go to Privacy & Security > Input Monitoring");
        println!("3. Add this application");
        println!("4. Restart this demo");
        return;
    }
    println!();

    let registry = HookRegistry::platform(CollectorConfig::default());
    let clock = Instant::now();
    let now_millis = || clock.elapsed().as_millis() as i64;

    // One second and five seconds at 60 Hz
    let short = match Aggregator::attach(60, now_millis(), &registry) {
        Ok(aggregator) => aggregator,
        Err(e) => {
            eprintln!("Error attaching to input hook: {e}");
            return;
        }
    };
    let long = match Aggregator::attach(300, now_millis(), &registry) {
        Ok(aggregator) => aggregator,
        Err(e) => {
            eprintln!("Error attaching to input hook: {e}");
            return;
        }
    };
    println!(
        "Hook registrations: {} (one platform hook)",
        registry.active_registrations()
    );
    println!("Running for 30 seconds. Try typing and moving your mouse!");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let start = Instant::now();
    let mut last_report = Instant::now();
    let mut resized = false;

    while running.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(30) {
        std::thread::sleep(Duration::from_millis(16));
        let now = now_millis();
        short.tick(now);
        long.tick(now);

        if !resized && start.elapsed() >= Duration::from_secs(15) {
            println!("  -- resizing the 5s window to 2s --");
            long.set_window_size(120);
            resized = true;
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            let fast = short.sample();
            let slow = long.sample();
            println!(
                "  [{:>2}s] 1s window: {:>4} APM {:>6} PPM | {}-tick window: {:>4} APM {:>6} PPM",
                start.elapsed().as_secs(),
                fast.key_rate_per_minute,
                fast.move_rate_per_minute,
                long.window_size(),
                slow.key_rate_per_minute,
                slow.move_rate_per_minute,
            );
            last_report = Instant::now();
        }
    }

    println!();
    println!("Stopping...");
    if let Err(e) = short.shutdown() {
        eprintln!("Error releasing hook: {e}");
    }
    println!(
        "Hook registrations after first shutdown: {}",
        registry.active_registrations()
    );
    if let Err(e) = long.shutdown() {
        eprintln!("Error releasing hook: {e}");
    }

    let totals = long.sample();
    let activity = long.activity(chrono::Utc::now());
    let busiest = activity.historical_apm.iter().max().copied().unwrap_or(0);
    println!();
    println!("Total actions: {}", totals.total_actions);
    println!("Total clicks: {}", activity.total_clicks);
    println!("Busiest 5s bucket: {busiest} APM");
    println!("Total distance: {} px", totals.total_distance);
    println!();
    println!("Demo complete!");
}
