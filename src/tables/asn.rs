//! Organization table: IP range to "ASnnnn owner" string.

use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::latin1::Latin1Reader;
use crate::tables::{field_u32, open_table, table_reader, OrgIndex};

/// Load the organization table from `path`.
///
/// Rows look like `16778240,16779263,"AS9737 TOT Public Company"`. Owner
/// names are Latin-1 in the provider files, so the table is read through
/// the transcoder.
pub fn load_asn(path: &Path) -> Result<OrgIndex> {
    let index = read_asn(open_table(path)?);
    log::info!(
        "ASN table loaded: {} ranges from {}",
        index.len(),
        path.display()
    );
    Ok(index)
}

/// Read the organization table from any byte source of raw Latin-1 text.
pub fn read_asn<R: Read>(reader: R) -> OrgIndex {
    let mut index = OrgIndex::new();
    let mut skipped = 0u64;
    let mut replaced = 0u64;

    for record in table_reader(Latin1Reader::new(reader)).records() {
        let Ok(record) = record else {
            skipped += 1;
            continue;
        };
        if record.len() != 3 {
            skipped += 1;
            continue;
        }
        let (Some(low), Some(high)) = (field_u32(&record, 0), field_u32(&record, 1)) else {
            skipped += 1;
            continue;
        };
        if index.insert(low, high, record[2].to_string()).is_some() {
            replaced += 1;
        }
    }

    if skipped > 0 {
        log::debug!("ASN table: {} rows skipped", skipped);
    }
    if replaced > 0 {
        log::warn!(
            "ASN table: {} ranges collided with earlier entries",
            replaced
        );
    }
    index
}
