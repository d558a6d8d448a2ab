//! Terminal front end for the dashboard
//!
//! ```text
//! coincap-dash list [query]
//! coincap-dash movers [query]
//! coincap-dash detail <id>
//! coincap-dash favorites
//! coincap-dash fav add|rm <id>
//! coincap-dash live [seconds] [query]
//! ```

use anyhow::{bail, Context, Result};
use coincap_dashboard::{
    constants::DEFAULT_RANKING_SIZE, dashboard::FAVORITES_EMPTY, format::Trend, AssetRow,
    Dashboard, DashboardConfig, FeedStatus, ListingView, ViewState,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let config = DashboardConfig::from_env().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_level))
                .context("invalid log level")?,
        )
        .with_writer(std::io::stderr)
        .init();

    let dashboard = Dashboard::from_config(&config).context("failed to build dashboard")?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        [] | ["list"] => list(&dashboard, "").await,
        ["list", query] => list(&dashboard, query).await,
        ["movers"] => movers(&dashboard, "").await,
        ["movers", query] => movers(&dashboard, query).await,
        ["detail", id] => detail(&dashboard, id).await,
        ["favorites"] => favorites(&dashboard).await,
        ["fav", "add", id] => {
            let outcome = dashboard.favorites().add(id);
            if outcome.is_added() {
                println!("Added to Favorites");
            } else {
                println!("Already in Favorites");
            }
            Ok(())
        }
        ["fav", "rm", id] => {
            dashboard.favorites().remove(id);
            println!("Removed from Favorites");
            Ok(())
        }
        ["live"] => live(&dashboard, 30, "").await,
        ["live", secs] => live(&dashboard, parse_secs(secs)?, "").await,
        ["live", secs, query] => live(&dashboard, parse_secs(secs)?, query).await,
        _ => bail!("unknown command: {}", args.join(" ")),
    }
}

fn parse_secs(raw: &str) -> Result<u64> {
    raw.parse()
        .with_context(|| format!("invalid duration '{}': expected whole seconds", raw))
}

fn print_rows(rows: &[AssetRow]) {
    println!(
        "{:>4}  {:<8} {:>16} {:>10} {:>20}",
        "Rank", "Coin", "Price", "24h", "Market Cap"
    );
    for row in rows {
        let arrow = match row.trend {
            Trend::Up => '▲',
            Trend::Down => '▼',
        };
        println!(
            "{:>4}  {:<8} {:>16} {:>9}{} {:>20}",
            row.rank, row.symbol, row.price, row.change, arrow, row.market_cap
        );
    }
}

fn print_as_of(listing: &ListingView) {
    println!(
        "Prices as of {}",
        listing.snapshot().updated_at().format("%H:%M:%S UTC")
    );
}

async fn list(dashboard: &Dashboard, query: &str) -> Result<()> {
    match dashboard.listing().await {
        ViewState::Ready(mut listing) => {
            listing.set_query(query);
            print_rows(&listing.rows());
            Ok(())
        }
        ViewState::Failed { message, error } => {
            println!("{}", message);
            Err(error.into())
        }
    }
}

async fn movers(dashboard: &Dashboard, query: &str) -> Result<()> {
    match dashboard.listing().await {
        ViewState::Ready(mut listing) => {
            listing.set_query(query);
            let (gainers, losers) = listing.movers();
            println!("Top {} gainers", DEFAULT_RANKING_SIZE);
            print_rows(&gainers);
            println!();
            println!("Top {} losers", DEFAULT_RANKING_SIZE);
            print_rows(&losers);
            Ok(())
        }
        ViewState::Failed { message, error } => {
            println!("{}", message);
            Err(error.into())
        }
    }
}

async fn detail(dashboard: &Dashboard, id: &str) -> Result<()> {
    let view = match dashboard.detail(id).await {
        ViewState::Ready(view) => view,
        ViewState::Failed { message, error } => {
            println!("{}", message);
            return Err(error.into());
        }
    };

    println!("{}", view.title());
    for (label, value) in view.summary() {
        println!("  {:<14} {}", label, value);
    }
    println!();
    println!("Price History (30 Days)");
    for point in view.chart() {
        println!("  {}  {:>14.2}", point.date, point.price);
    }
    Ok(())
}

async fn favorites(dashboard: &Dashboard) -> Result<()> {
    match dashboard.favorites_view().await {
        ViewState::Ready(view) if view.is_empty() => {
            println!("{}", FAVORITES_EMPTY);
            Ok(())
        }
        ViewState::Ready(view) => {
            print_rows(&view.rows());
            Ok(())
        }
        ViewState::Failed { message, error } => {
            println!("{}", message);
            Err(error.into())
        }
    }
}

async fn live(dashboard: &Dashboard, secs: u64, query: &str) -> Result<()> {
    let mut listing = match dashboard.listing().await {
        ViewState::Ready(listing) => listing,
        ViewState::Failed { message, error } => {
            println!("{}", message);
            return Err(error.into());
        }
    };
    listing.set_query(query);
    listing.go_live();

    let Some(live) = listing.live() else {
        bail!("live feed did not start");
    };
    let mut snapshots = live.watch_snapshot();
    let mut status = live.watch_status();

    let deadline = tokio::time::sleep(Duration::from_secs(secs));
    tokio::pin!(deadline);
    let mut refresh = tokio::time::interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            changed = status.changed() => {
                if changed.is_err() || *status.borrow() == FeedStatus::Disconnected {
                    tracing::warn!("Price feed disconnected; showing last known prices");
                    break;
                }
            }
            _ = refresh.tick() => {
                if snapshots.has_changed().unwrap_or(false) {
                    snapshots.borrow_and_update();
                    print_rows(&listing.rows());
                    print_as_of(&listing);
                    println!();
                }
            }
        }
    }

    listing.stop_live();
    print_rows(&listing.rows());
    print_as_of(&listing);
    Ok(())
}
