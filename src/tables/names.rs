//! Embedded country and region name tables.
//!
//! Small reference data shipped with the crate rather than downloaded:
//! ISO 3166-1 alpha-2 country codes with French display names, and US/CA
//! region codes with their names. Both load into point-form indexes.

use crate::tables::NameIndex;

const COUNTRIES: &str = include_str!("data/countries.csv");
const REGIONS: &str = include_str!("data/regions.csv");

/// Country name index keyed by two-letter country code.
pub fn country_names() -> NameIndex {
    read_names(COUNTRIES)
}

/// Region name index keyed by [`region_key`].
pub fn region_names() -> NameIndex {
    read_names(REGIONS)
}

/// Key the region index uses: country code and region code concatenated,
/// `"US" + "VA"` -> `"USVA"`.
pub fn region_key(country: &str, region: &str) -> String {
    format!("{country}{region}")
}

/// Parse `name;key` lines into a point-form index.
fn read_names(data: &str) -> NameIndex {
    let mut index = NameIndex::new();
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(b';')
        .from_reader(data.as_bytes());

    for record in rows.records() {
        let Ok(record) = record else { continue };
        if record.len() != 2 {
            continue;
        }
        index.insert_point(record[1].to_string(), record[0].to_string());
    }
    index
}
