//! Geolocation database façade.

use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::RangeEntry;
use crate::tables::{
    country_names, load_asn, load_blocks, load_locations, region_key, region_names, BlockIndex,
    Location, LocationTable, NameIndex, OrgIndex, TableSources,
};

/// All loaded tables behind one immutable lookup surface.
///
/// Built once at startup from [`TableSources`], then read-only; share it
/// across request handlers with an `Arc`. A table whose source failed to
/// load stays empty, and an empty table answers not-found, so partial loads
/// degrade lookups instead of breaking them.
#[derive(Debug, Default)]
pub struct GeoDb {
    blocks: BlockIndex,
    orgs: OrgIndex,
    locations: LocationTable,
    countries: NameIndex,
    regions: NameIndex,
}

/// Per-table entry counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub blocks: usize,
    pub organizations: usize,
    pub locations: usize,
    pub countries: usize,
    pub regions: usize,
}

impl GeoDb {
    /// Load every table under `sources`, plus the embedded name tables.
    ///
    /// A table that cannot be opened is logged and left empty while the
    /// others still load. Callers that need to distinguish a broken
    /// deployment from a thin one can inspect [`GeoDb::stats`].
    pub fn load(sources: &TableSources) -> Self {
        Self {
            blocks: table_or_empty("blocks", &sources.blocks, load_blocks(&sources.blocks)),
            orgs: table_or_empty("ASN", &sources.asn, load_asn(&sources.asn)),
            locations: table_or_empty(
                "locations",
                &sources.locations,
                load_locations(&sources.locations),
            ),
            countries: country_names(),
            regions: region_names(),
        }
    }

    /// Assemble the full geolocation answer for an IPv4 address.
    ///
    /// The address is viewed as a big-endian u32 and probed against the
    /// block index; no containing block means no answer. Location,
    /// organization and display names are filled in where their tables
    /// have data. The returned record owns everything it carries.
    pub fn lookup(&self, ip: Ipv4Addr) -> Option<GeoIp> {
        let addr = u32::from(ip);
        let block = self.blocks.lookup(&addr)?;
        let location = self.locations.get(block.value).cloned();
        let organization = self.orgs.get(&addr).cloned();

        let (country_name, region_name) = match &location {
            Some(loc) => (
                self.countries.get(&loc.country).cloned(),
                self.regions
                    .get(&region_key(&loc.country, &loc.region))
                    .cloned(),
            ),
            None => (None, None),
        };

        Some(GeoIp {
            ip,
            block,
            location,
            organization,
            country_name,
            region_name,
        })
    }

    /// Whether the block index has data; without it every lookup misses.
    pub fn is_ready(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn stats(&self) -> DbStats {
        DbStats {
            blocks: self.blocks.len(),
            organizations: self.orgs.len(),
            locations: self.locations.len(),
            countries: self.countries.len(),
            regions: self.regions.len(),
        }
    }
}

fn table_or_empty<T: Default>(name: &str, path: &Path, loaded: Result<T>) -> T {
    match loaded {
        Ok(table) => table,
        Err(e) => {
            log::error!("{} table unavailable ({}): {}", name, path.display(), e);
            T::default()
        }
    }
}

/// One assembled lookup answer.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoIp {
    pub ip: Ipv4Addr,
    pub block: RangeEntry<u32, u32>,
    pub location: Option<Location>,
    pub organization: Option<String>,
    pub country_name: Option<String>,
    pub region_name: Option<String>,
}

impl GeoIp {
    /// Flatten into the JSON report shape.
    pub fn response(&self) -> GeoResponse {
        self.into()
    }
}

/// Flat JSON summary of one lookup. Fields with no data are omitted from
/// the serialized form; latitude and longitude are numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoResponse {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metro_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

fn opt(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

impl From<&GeoIp> for GeoResponse {
    fn from(geo: &GeoIp) -> Self {
        let loc = geo.location.as_ref();
        Self {
            ip: geo.ip.to_string(),
            country_code: loc.and_then(|l| opt(&l.country)),
            region_code: loc.and_then(|l| opt(&l.region)),
            city: loc.and_then(|l| opt(&l.city)),
            postal_code: loc.and_then(|l| opt(&l.postal_code)),
            latitude: loc.and_then(|l| l.latitude),
            longitude: loc.and_then(|l| l.longitude),
            metro_code: loc.and_then(|l| opt(&l.metro_code)),
            area_code: loc.and_then(|l| opt(&l.area_code)),
            organization: geo.organization.as_deref().and_then(opt),
            country: geo.country_name.as_deref().and_then(opt),
            region: geo.region_name.as_deref().and_then(opt),
        }
    }
}
