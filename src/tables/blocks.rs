//! Address block table: IP range to location id.

use std::io::Read;
use std::path::Path;

use crate::error::Result;
use crate::tables::{field_u32, open_table, table_reader, BlockIndex};

/// Load the blocks table from `path`.
///
/// Rows look like `"16777216","16777471","17"`: low address, high address,
/// location id, all decimal u32.
pub fn load_blocks(path: &Path) -> Result<BlockIndex> {
    let index = read_blocks(open_table(path)?);
    log::info!(
        "blocks table loaded: {} ranges from {}",
        index.len(),
        path.display()
    );
    Ok(index)
}

/// Read the blocks table from any byte source.
pub fn read_blocks<R: Read>(reader: R) -> BlockIndex {
    let mut index = BlockIndex::new();
    let mut skipped = 0u64;
    let mut replaced = 0u64;

    for record in table_reader(reader).records() {
        let Ok(record) = record else {
            skipped += 1;
            continue;
        };
        if record.len() != 3 {
            skipped += 1;
            continue;
        }
        let (Some(low), Some(high), Some(loc_id)) = (
            field_u32(&record, 0),
            field_u32(&record, 1),
            field_u32(&record, 2),
        ) else {
            skipped += 1;
            continue;
        };
        if index.insert(low, high, loc_id).is_some() {
            replaced += 1;
        }
    }

    if skipped > 0 {
        log::debug!("blocks table: {} rows skipped", skipped);
    }
    if replaced > 0 {
        log::warn!(
            "blocks table: {} ranges collided with earlier entries",
            replaced
        );
    }
    index
}
