//! Loaders for the GeoLite source tables.
//!
//! Each loader turns one delimited text table into an in-memory index. The
//! shared row policy follows the data provider's loose format: a row with
//! the wrong column count or an unparsable numeric field is skipped, which
//! also disposes of the copyright and header lines; only a table that
//! cannot be opened at all fails the load.

mod asn;
mod blocks;
mod locations;
mod names;

pub use asn::{load_asn, read_asn};
pub use blocks::{load_blocks, read_blocks};
pub use locations::{load_locations, read_locations, Location, LocationTable};
pub use names::{country_names, region_key, region_names};

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::index::RangeIndex;

/// Address block index: block range to location id.
pub type BlockIndex = RangeIndex<u32, u32>;
/// Organization index: block range to organization string.
pub type OrgIndex = RangeIndex<u32, String>;
/// Point-form index: code to display name.
pub type NameIndex = RangeIndex<String, String>;

/// Blocks table file name inside the city archive.
pub const BLOCKS_FILE_NAME: &str = "GeoLiteCity-Blocks.csv";
/// Locations table file name inside the city archive.
pub const LOCATIONS_FILE_NAME: &str = "GeoLiteCity-Location.csv";
/// Organization table file name inside the ASN archive.
pub const ASN_FILE_NAME: &str = "GeoIPASNum2.csv";
/// Directory the tables land in when none is configured.
pub const DEFAULT_DATA_DIR: &str = "/tmp";

const READ_BUFFER_LEN: usize = 128 * 1024;

/// Paths of the three on-disk source tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSources {
    pub blocks: PathBuf,
    pub locations: PathBuf,
    pub asn: PathBuf,
}

impl TableSources {
    /// Sources under `dir` with the provider's file names.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            blocks: dir.join(BLOCKS_FILE_NAME),
            locations: dir.join(LOCATIONS_FILE_NAME),
            asn: dir.join(ASN_FILE_NAME),
        }
    }
}

impl Default for TableSources {
    fn default() -> Self {
        Self::in_dir(DEFAULT_DATA_DIR)
    }
}

/// Open a table file for buffered reading, decompressing on the fly when
/// the path ends in `.gz`.
pub fn open_table(path: &Path) -> io::Result<Box<dyn Read + Send>> {
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(READ_BUFFER_LEN, file);
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Row reader configured for the provider's comma tables: no header
/// handling (junk lines fall to the skip policy) and no fixed column count.
fn table_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader)
}

fn field_u32(record: &csv::StringRecord, idx: usize) -> Option<u32> {
    record.get(idx).and_then(|v| v.parse::<u32>().ok())
}
