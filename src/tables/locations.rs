//! Location table: integer id to place record.

use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::latin1::Latin1Reader;
use crate::tables::{field_u32, open_table, table_reader};

/// One place from the locations table. Country and region are the two
/// character codes the name tables key on; the rest is display data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub country: String,
    pub region: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub metro_code: String,
    pub area_code: String,
}

/// Locations addressed by their table id.
///
/// Ids in the provider files are dense, so storage is a vector grown on
/// demand with one slot per id.
#[derive(Debug, Default)]
pub struct LocationTable {
    slots: Vec<Option<Location>>,
    filled: usize,
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, id: u32, location: Location) {
        let idx = id as usize;
        if idx >= self.slots.len() {
            self.slots.resize(idx + 1, None);
        }
        if self.slots[idx].is_none() {
            self.filled += 1;
        }
        self.slots[idx] = Some(location);
    }

    /// Location for `id`, if the table has one.
    pub fn get(&self, id: u32) -> Option<&Location> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    /// Number of loaded locations. Diagnostics only.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }
}

/// Load the locations table from `path`.
///
/// Rows look like
/// `"718","US","MA","Medway","02053","42.1556","-71.4268","506","508"`:
/// id, country, region, city, postal code, latitude, longitude, metro code,
/// area code. City names are Latin-1 in the provider files, so the table is
/// read through the transcoder.
pub fn load_locations(path: &Path) -> Result<LocationTable> {
    let table = read_locations(open_table(path)?);
    log::info!(
        "locations table loaded: {} entries from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

/// Read the locations table from any byte source of raw Latin-1 text.
pub fn read_locations<R: Read>(reader: R) -> LocationTable {
    let mut table = LocationTable::new();
    let mut skipped = 0u64;

    for record in table_reader(Latin1Reader::new(reader)).records() {
        let Ok(record) = record else {
            skipped += 1;
            continue;
        };
        if record.len() != 9 {
            skipped += 1;
            continue;
        }
        let Some(id) = field_u32(&record, 0) else {
            skipped += 1;
            continue;
        };
        table.insert(
            id,
            Location {
                country: record[1].to_string(),
                region: record[2].to_string(),
                city: record[3].to_string(),
                postal_code: record[4].to_string(),
                latitude: record[5].parse().ok(),
                longitude: record[6].parse().ok(),
                metro_code: record[7].to_string(),
                area_code: record[8].to_string(),
            },
        );
    }

    if skipped > 0 {
        log::debug!("locations table: {} rows skipped", skipped);
    }
    table
}
