//! geolocip: IPv4 geolocation lookups and API server over the GeoLite CSV tables.

use clap::{Args, Parser, Subcommand};
use geolocip::fetch::{DEFAULT_ASN_URL, DEFAULT_CITY_URL};
use geolocip::serve::DEFAULT_LISTEN;
use geolocip::tables::DEFAULT_DATA_DIR;
use geolocip::{serve, GeoDb, TableFetcher, TableSources};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "geolocip")]
#[command(version)]
#[command(about = "IPv4 geolocation lookups over the GeoLite CSV tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FetchArgs {
    /// Directory holding the downloaded archives and extracted tables
    #[arg(long, default_value = DEFAULT_DATA_DIR, env = "GEOLOCIP_DATA_DIR")]
    data_dir: PathBuf,

    /// URL of the ASN archive
    #[arg(long, default_value = DEFAULT_ASN_URL, env = "GEOLOCIP_ASN_URL")]
    asn_url: String,

    /// URL of the city archive (blocks and locations tables)
    #[arg(long, default_value = DEFAULT_CITY_URL, env = "GEOLOCIP_CITY_URL")]
    city_url: String,

    /// Re-download archives older than this many days
    #[arg(long, default_value_t = 8, env = "GEOLOCIP_MAX_AGE_DAYS")]
    max_age_days: u64,
}

impl FetchArgs {
    fn fetcher(&self) -> TableFetcher {
        TableFetcher::new(&self.data_dir)
            .with_urls(&self.asn_url, &self.city_url)
            .with_max_age(Duration::from_secs(self.max_age_days * 24 * 60 * 60))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the tables, load them and run the HTTP API
    Serve {
        /// Listen address
        #[arg(long, default_value = DEFAULT_LISTEN, env = "GEOLOCIP_LISTEN")]
        listen: SocketAddr,

        /// Skip the download step and use whatever tables are on disk
        #[arg(long)]
        offline: bool,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Look up one address and print the JSON report
    Lookup {
        /// IPv4 address to look up
        ip: Ipv4Addr,

        /// Directory holding the extracted tables
        #[arg(long, default_value = DEFAULT_DATA_DIR, env = "GEOLOCIP_DATA_DIR")]
        data_dir: PathBuf,
    },

    /// Download the provider archives and extract the tables
    Update {
        /// Download even when the archives on disk are fresh
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Load the tables and print per-table entry counts
    Check {
        /// Directory holding the extracted tables
        #[arg(long, default_value = DEFAULT_DATA_DIR, env = "GEOLOCIP_DATA_DIR")]
        data_dir: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            offline,
            fetch,
        } => {
            if let Err(e) = run_serve(listen, offline, &fetch) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Lookup { ip, data_dir } => {
            if let Err(e) = run_lookup(ip, &data_dir) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Update { force, fetch } => {
            if let Err(e) = run_update(force, &fetch) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Check { data_dir } => {
            if let Err(e) = run_check(&data_dir) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_serve(
    listen: SocketAddr,
    offline: bool,
    fetch: &FetchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = fetch.fetcher();

    if offline {
        log::info!(
            "offline mode, using the tables already in {}",
            fetch.data_dir.display()
        );
    } else if let Err(e) = fetcher.refresh() {
        // A failed refresh is not fatal: tables from an earlier run may
        // still be on disk, and an empty database just answers not-found.
        log::warn!("table refresh failed, serving what is on disk: {}", e);
    }

    let db = GeoDb::load(&fetcher.sources());
    let stats = db.stats();
    log::info!(
        "tables loaded: {} blocks, {} organizations, {} locations",
        stats.blocks,
        stats.organizations,
        stats.locations
    );

    serve::serve_blocking(Arc::new(db), listen)?;
    Ok(())
}

fn run_lookup(ip: Ipv4Addr, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let db = GeoDb::load(&TableSources::in_dir(data_dir));
    match db.lookup(ip) {
        Some(geo) => {
            println!("{}", serde_json::to_string_pretty(&geo.response())?);
            Ok(())
        }
        None => Err(format!("no address block contains {}", ip).into()),
    }
}

fn run_update(force: bool, fetch: &FetchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = fetch.fetcher();
    if force {
        fetcher.force_refresh()?;
        println!("Tables downloaded and extracted");
    } else if fetcher.refresh()? {
        println!("Tables updated");
    } else {
        println!("Tables are fresh, nothing downloaded");
    }
    Ok(())
}

fn run_check(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let db = GeoDb::load(&TableSources::in_dir(data_dir));
    let stats = db.stats();

    println!("blocks:        {}", stats.blocks);
    println!("organizations: {}", stats.organizations);
    println!("locations:     {}", stats.locations);
    println!("countries:     {}", stats.countries);
    println!("regions:       {}", stats.regions);

    if !db.is_ready() {
        return Err("block table is empty, every lookup will miss".into());
    }
    Ok(())
}
