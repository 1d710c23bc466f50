#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parking monitor CLI.
//!
//! ```text
//! parking_monitor run [--interval-secs 5]
//! parking_monitor refresh
//! parking_monitor lots [--search <query>]
//! parking_monitor login <name>
//! parking_monitor favorite <id>
//! parking_monitor window add | toggle <id> | set <id> <start> <end>
//! parking_monitor history [--lot <id>] [--date YYYY-MM-DD] [--time HH]
//! ```
//!
//! All commands share the cache under `--data-dir`, so a `login` or
//! `favorite` takes effect in a `run` started later.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use parking_monitor::config::Config;
use parking_monitor::dashboard::{Dashboard, HistoryFilter, LotEdit};
use parking_monitor::Monitor;
use parking_monitor_cache::LocalCache;
use parking_monitor_cache::store::FileStore;
use parking_monitor_fetcher::HttpLotSource;
use parking_monitor_lot_models::{FavoriteSet, LotId, LotRecord};
use parking_monitor_notify::{
    ChangeNotifier, ConsoleChannel, DisabledChannel, HistoryStore, LocalHistoryStore,
    NotificationChannel,
};

#[derive(Parser)]
#[command(
    name = "parking_monitor",
    about = "Monitor parking lot occupancy and alert on favorite lots"
)]
struct Cli {
    /// Backend API root (defaults to $PARKING_API_URL, then the production backend)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Local data directory (defaults to $PARKING_DATA_DIR, then `data/`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seconds between polls
    #[arg(long, global = true)]
    interval_secs: Option<u64>,

    /// Never deliver alerts
    #[arg(long, global = true)]
    no_notifications: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the backend until interrupted
    Run,
    /// Run a single poll cycle
    Refresh,
    /// List lots
    Lots {
        /// Only lots whose name contains this (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },
    /// Show the current session
    Status,
    /// Log in
    Login {
        /// Username
        name: String,
    },
    /// Log out and clear favorites
    Logout,
    /// Toggle a favorite lot
    Favorite {
        /// Lot ID
        id: LotId,
    },
    /// Manage notification time windows
    Window {
        #[command(subcommand)]
        action: WindowCommand,
    },
    /// Edit a lot's descriptive fields
    Edit {
        /// Lot ID
        id: LotId,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New street address
        #[arg(long)]
        address: Option<String>,
        /// New fee description
        #[arg(long)]
        fee: Option<String>,
        /// New opening hours
        #[arg(long)]
        open_time: Option<String>,
        /// New contact number
        #[arg(long)]
        contact: Option<String>,
    },
    /// Move a lot's marker
    Move {
        /// Lot ID
        id: LotId,
        /// Latitude
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        /// Longitude
        #[arg(allow_hyphen_values = true)]
        lng: f64,
    },
    /// Add a placeholder lot at the map centre
    AddLot,
    /// Delete a lot
    DeleteLot {
        /// Lot ID
        id: LotId,
    },
    /// Discard lot edits and restore the built-in dataset
    Reset,
    /// Show the logged-in user's history
    History {
        /// Only this lot
        #[arg(long)]
        lot: Option<LotId>,
        /// Only this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Only times starting with this (e.g. `09` or `09:3`)
        #[arg(long)]
        time: Option<String>,
        /// Only entries analysed at or after this RFC 3339 instant
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
    /// Delete the logged-in user's history
    ClearHistory,
}

#[derive(Subcommand)]
enum WindowCommand {
    /// List windows
    List,
    /// Add a disabled 09:00-18:00 window
    Add,
    /// Enable or disable a window
    Toggle {
        /// Window ID
        id: u32,
    },
    /// Change a window's bounds
    Set {
        /// Window ID
        id: u32,
        /// Start time (HH:MM)
        start: String,
        /// End time (HH:MM)
        end: String,
    },
    /// Delete a window
    Delete {
        /// Window ID
        id: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let config = Config::resolve(
        cli.api_url,
        cli.data_dir,
        cli.interval_secs,
        !cli.no_notifications,
    );
    log::debug!("Using {config:?}");

    let cache = LocalCache::new(Arc::new(FileStore::open(&config.cache_dir())?));
    let channel: Arc<dyn NotificationChannel> = if config.notifications {
        Arc::new(ConsoleChannel)
    } else {
        Arc::new(DisabledChannel)
    };
    // No remote history client exists yet; FallbackHistoryStore wraps one when it does.
    let history: Arc<dyn HistoryStore> = Arc::new(LocalHistoryStore::new(cache.clone()));
    let dashboard = Dashboard::new(cache.clone(), Arc::clone(&channel), Arc::clone(&history));

    match cli.command {
        Commands::Run => {
            let monitor = build_monitor(&config, &cache, channel, history)?;
            let mut updates = monitor.subscribe();
            let favorites = cache.clone();
            tokio::spawn(async move {
                while updates.changed().await.is_ok() {
                    let lots = updates.borrow_and_update().clone();
                    print_lots(&lots, &favorites.favorites());
                }
            });

            monitor
                .run(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::error!("Failed to listen for Ctrl-C: {e}");
                    }
                })
                .await;
        }
        Commands::Refresh => {
            let monitor = build_monitor(&config, &cache, channel, history)?;
            let report = monitor.poll_once().await?;
            print_lots(&cache.lots(), &cache.favorites());
            println!(
                "\n{} new history entr{}, {} alert(s)",
                report.history,
                if report.history == 1 { "y" } else { "ies" },
                report.alerts
            );
        }
        Commands::Lots { search } => {
            let lots = match search {
                Some(query) => dashboard.search(&query),
                None => dashboard.lots(),
            };
            if lots.is_empty() {
                println!("No lots found.");
                return Ok(());
            }
            print_lots(&lots, &cache.favorites());
        }
        Commands::Status => {
            let session = dashboard.session();
            match session.active_user() {
                Some(user) => println!("Logged in as {user}"),
                None => println!("Not logged in"),
            }
            println!("Notifications: {}", session.notification_permission);
            println!("Favorites: {:?}", dashboard.favorites());
        }
        Commands::Login { name } => {
            let session = dashboard.login(&name)?;
            println!(
                "Welcome, {}! Notifications: {}",
                session.username, session.notification_permission
            );
        }
        Commands::Logout => {
            dashboard.logout()?;
            println!("Logged out");
        }
        Commands::Favorite { id } => {
            if dashboard.toggle_favorite(id)? {
                println!("Lot {id} added to favorites");
            } else {
                println!("Lot {id} removed from favorites");
            }
        }
        Commands::Window { action } => run_window_command(&dashboard, action)?,
        Commands::Edit {
            id,
            name,
            address,
            fee,
            open_time,
            contact,
        } => {
            let edit = LotEdit {
                name,
                address,
                fee,
                open_time,
                contact,
            };
            let lot = dashboard.update_lot(id, &edit)?;
            println!("Updated lot {}: {}", lot.id, lot.name);
        }
        Commands::Move { id, lat, lng } => {
            let lot = dashboard.move_lot(id, lat, lng, Utc::now())?;
            println!("Moved {} to ({:.6}, {:.6})", lot.name, lot.lat, lot.lng);
        }
        Commands::AddLot => {
            let lot = dashboard.add_lot(Local::now())?;
            println!("Added lot {}: {}", lot.id, lot.name);
        }
        Commands::DeleteLot { id } => {
            dashboard.delete_lot(id)?;
            println!("Deleted lot {id}");
        }
        Commands::Reset => {
            dashboard.reset_to_default()?;
            println!("Restored the built-in lot dataset");
        }
        Commands::History {
            lot,
            date,
            time,
            since,
        } => {
            let filter = HistoryFilter {
                lot,
                date,
                time_prefix: time,
                since,
            };
            let entries = dashboard.history(&filter).await?;
            if entries.is_empty() {
                println!("No history found.");
                return Ok(());
            }

            println!(
                "{:<11} {:<9} {:<5} {:<24} {:<10} {:>9} IMAGE",
                "DATE", "TIME", "LOT", "NAME", "STATUS", "EMPTY"
            );
            println!("{}", "-".repeat(100));
            for entry in &entries {
                println!(
                    "{:<11} {:<9} {:<5} {:<24} {:<10} {:>9} {}",
                    entry.date,
                    entry.time,
                    entry.parking_id,
                    truncate(&entry.parking_name, 24),
                    entry.status,
                    format!("{}/{}", entry.data.empty_spaces, entry.data.total_spaces),
                    entry.image_url
                );
            }
            println!("\n{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
        }
        Commands::ClearHistory => {
            dashboard.clear_history()?;
            println!("History cleared");
        }
    }

    Ok(())
}

fn build_monitor(
    config: &Config,
    cache: &LocalCache,
    channel: Arc<dyn NotificationChannel>,
    history: Arc<dyn HistoryStore>,
) -> Result<Monitor, Box<dyn std::error::Error>> {
    let source = HttpLotSource::new(&config.api_url)?;
    let notifier = ChangeNotifier::new(cache.clone(), history, channel);
    Ok(Monitor::new(
        Arc::new(source),
        cache.clone(),
        Arc::new(notifier),
        config.interval,
    ))
}

fn run_window_command(
    dashboard: &Dashboard,
    action: WindowCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        WindowCommand::List => {
            let ranges = dashboard.time_ranges();
            if ranges.iter().all(|r| !r.enabled) {
                println!("No window enabled: alerts are allowed at any time.\n");
            }
            for range in &ranges {
                println!(
                    "{:<4} {} - {}  {}",
                    range.id,
                    range.start_time,
                    range.end_time,
                    if range.enabled { "on" } else { "off" }
                );
            }
        }
        WindowCommand::Add => {
            let range = dashboard.add_time_range()?;
            println!(
                "Added window {}: {} - {} (off)",
                range.id, range.start_time, range.end_time
            );
        }
        WindowCommand::Toggle { id } => {
            let enabled = dashboard.toggle_time_range(id)?;
            println!("Window {id} {}", if enabled { "enabled" } else { "disabled" });
        }
        WindowCommand::Set { id, start, end } => {
            dashboard.update_time_range(id, &start, &end)?;
            println!("Window {id} set to {start} - {end}");
        }
        WindowCommand::Delete { id } => {
            dashboard.delete_time_range(id)?;
            println!("Deleted window {id}");
        }
    }
    Ok(())
}

fn print_lots(lots: &[LotRecord], favorites: &FavoriteSet) {
    println!(
        "{:<5} {:<2} {:<24} {:<12} {:>9} {:>7} UPDATED",
        "ID", "", "NAME", "STATUS", "EMPTY", "RATIO"
    );
    println!("{}", "-".repeat(90));

    for lot in lots {
        println!(
            "{:<5} {:<2} {:<24} {:<12} {:>9} {:>6}% {}",
            lot.id,
            if favorites.contains(&lot.id) { "*" } else { "" },
            truncate(&lot.name, 24),
            format!("{} {}", lot.status.emoji(), lot.status),
            format!("{}/{}", lot.empty_spaces, lot.total_spaces),
            lot.empty_ratio,
            lot.last_updated
        );
    }

    println!("\n{} lot(s)", lots.len());
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
