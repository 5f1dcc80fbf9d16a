//! GeolocIP - In-memory IPv4 geolocation over the legacy GeoLite CSV tables.
//!
//! This crate loads the free MaxMind city, location and ASN tables into
//! range-indexed in-memory maps and answers point lookups for IPv4
//! addresses, either through a library call or over a small HTTP API.
//!
//! # Features
//!
//! - **Range index**: ordered map keyed by closed `u32` intervals, point
//!   lookups via a degenerate one-element probe
//! - **Latin-1 tables**: the legacy CSV files are ISO-8859-1; a streaming
//!   transcoder converts them to UTF-8 while reading
//! - **Lenient loading**: malformed rows are skipped and counted, a missing
//!   table leaves an empty map so every lookup just misses
//! - **Table refresh**: downloads the provider archives, extracts the CSV
//!   members and replaces files atomically, keeping archives under 8 days old
//! - **HTTP API**: `GET /{ip}` and `GET /` (caller address) return the
//!   lookup report as JSON
//!
//! # Quick Start
//!
//! ```ignore
//! use geolocip::{GeoDb, TableSources};
//!
//! let db = GeoDb::load(&TableSources::in_dir("/tmp"));
//! if let Some(geo) = db.lookup("54.88.55.63".parse()?) {
//!     println!("{}", serde_json::to_string(&geo.response())?);
//! }
//! ```
//!
//! # HTTP API
//!
//! `geolocip serve` refreshes the tables and answers lookups:
//!
//! ```text
//! $ curl http://127.0.0.1:9001/54.88.55.63
//! {"ip":"54.88.55.63","country_code":"US","region_code":"VA","city":"Ashburn",...}
//! ```
//!
//! A hit returns `200` with the report, an address outside every block
//! returns `404`, and anything that does not parse as an IPv4 address
//! returns `400`. Empty fields are omitted from the JSON.
//!
//! # Data files
//!
//! Three tables are read from the data directory, plain or gzipped when
//! the configured source path ends in `.gz`:
//!
//! - `GeoLiteCity-Blocks.csv`: IPv4 ranges to location ids
//! - `GeoLiteCity-Location.csv`: location ids to city records
//! - `GeoIPASNum2.csv`: IPv4 ranges to AS organizations
//!
//! Country and region display names ship embedded in the binary.
//!
//! # Known limitations
//!
//! - IPv4 only; the legacy tables do not cover IPv6
//! - Tables are replaced on restart, not hot-reloaded
//! - Overlapping ranges in a source table keep only one entry

mod error;

pub mod db;
pub mod fetch;
pub mod index;
pub mod latin1;
pub mod serve;
pub mod tables;

// Re-export core types
pub use error::{Error, Result};

pub use db::{DbStats, GeoDb, GeoIp, GeoResponse};
pub use fetch::TableFetcher;
pub use index::{RangeEntry, RangeIndex, Span};
pub use latin1::Latin1Reader;
pub use tables::TableSources;
