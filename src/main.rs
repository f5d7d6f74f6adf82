//! sheetcache CLI - fetch and summarize the cached sheet resources.
//!
//! Exercises the library end to end: loads configuration from the
//! environment, builds the three resource caches, acquires each, and prints
//! record counts, cache ages, and the event or webinar running today.

use std::io;

use anyhow::Result;
use chrono::Local;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sheetcache::cache::{active_record, DiskStore, Snapshot};
use sheetcache::config::Config;
use sheetcache::models::{CalendarEvent, TeamMember, Webinar};
use sheetcache::{build_cache, build_durable_cache};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn usage() -> ! {
    eprintln!("usage: sheetcache [events|team|webinars] [--refresh]");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let force = args.iter().any(|a| a == "--refresh");
    let resource = args.iter().find(|a| !a.starts_with("--")).cloned();
    if let Some(ref r) = resource {
        if !matches!(r.as_str(), "events" | "team" | "webinars") {
            usage();
        }
    }

    let config = Config::from_env();
    info!(force, "sheetcache starting");

    let wants = |name: &str| resource.as_deref().map_or(true, |r| r == name);

    if wants("events") {
        report_events(&config, force).await?;
    }
    if wants("team") {
        report_team(&config, force).await?;
    }
    if wants("webinars") {
        report_webinars(&config, force).await?;
    }

    Ok(())
}

fn print_summary<T>(label: &str, snapshot: &Snapshot<T>) {
    println!(
        "{}: {} records (fetched {})",
        label,
        snapshot.records.len(),
        snapshot.age_display()
    );
    if let Some(ref error) = snapshot.error {
        println!("  error: {}", error);
    }
}

async fn report_events(config: &Config, force: bool) -> Result<()> {
    let cache = build_cache::<CalendarEvent>(config, &config.events_tab)?;
    let snapshot = cache.acquire(force).await;
    print_summary("Events", &snapshot);

    let today = Local::now().date_naive();
    if let Some(active) = active_record(&snapshot.records, today) {
        println!("  happening today: {} ({})", active.title, active.formatted_dates());
    }
    if let Some(next) = snapshot
        .records
        .iter()
        .filter(|e| e.is_upcoming(today))
        .min_by_key(|e| e.start_day())
    {
        println!("  next up: {} ({})", next.title, next.formatted_dates());
    }
    Ok(())
}

async fn report_team(config: &Config, force: bool) -> Result<()> {
    // Team members persist across runs; fall back to memory-only if the
    // platform cache directory is unavailable.
    let cache = match DiskStore::default_location() {
        Ok(store) => build_durable_cache::<TeamMember>(config, &config.team_tab, store)?,
        Err(e) => {
            warn!(error = %e, "Durable cache unavailable, using memory only");
            build_cache::<TeamMember>(config, &config.team_tab)?
        }
    };
    let snapshot = cache.acquire(force).await;
    print_summary("Team", &snapshot);

    for member in snapshot.records.iter() {
        println!("  {}", member.display_name());
    }
    Ok(())
}

async fn report_webinars(config: &Config, force: bool) -> Result<()> {
    let cache = build_cache::<Webinar>(config, &config.webinars_tab)?;
    let snapshot = cache.acquire(force).await;
    print_summary("Webinars", &snapshot);

    let today = Local::now().date_naive();
    if let Some(live) = active_record(&snapshot.records, today) {
        match &live.registration_url {
            Some(url) => println!("  live today: {} - {}", live.title, url),
            None => println!("  live today: {}", live.title),
        }
    }
    Ok(())
}
