//! Provider archive downloads with freshness checks.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use flate2::read::GzDecoder;

use crate::error::{Error, Result};
use crate::tables::{TableSources, ASN_FILE_NAME, BLOCKS_FILE_NAME, LOCATIONS_FILE_NAME};

/// Default URL for the ASN archive.
pub const DEFAULT_ASN_URL: &str =
    "http://download.maxmind.com/download/geoip/database/asnum/GeoIPASNum2.zip";

/// Default URL for the city archive (blocks and locations tables).
pub const DEFAULT_CITY_URL: &str =
    "http://geolite.maxmind.com/download/geoip/database/GeoLiteCity_CSV/GeoLiteCity-latest.zip";

/// Archives older than this are downloaded again (8 days, the provider's
/// publication cadence).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(8 * 24 * 60 * 60);

const TABLE_FILE_NAMES: [&str; 3] = [ASN_FILE_NAME, BLOCKS_FILE_NAME, LOCATIONS_FILE_NAME];

/// Downloads the provider archives and extracts the CSV tables from them.
///
/// Archives and tables both live in one data directory. An archive already
/// on disk and younger than the max age is kept; extraction runs either way
/// so the tables always match the archives. Downloads go to a temp file
/// first and land with an atomic rename, so a crashed fetch never leaves a
/// half-written archive behind.
///
/// # Example
///
/// ```ignore
/// use geolocip::TableFetcher;
///
/// let fetcher = TableFetcher::new("/tmp");
/// fetcher.refresh()?;
/// let db = geolocip::GeoDb::load(&fetcher.sources());
/// ```
pub struct TableFetcher {
    data_dir: PathBuf,
    asn_url: String,
    city_url: String,
    max_age: Duration,
}

impl TableFetcher {
    /// Create a fetcher for `data_dir` with the default URLs and max age.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            asn_url: DEFAULT_ASN_URL.to_string(),
            city_url: DEFAULT_CITY_URL.to_string(),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// Replace both archive URLs, for mirrors.
    pub fn with_urls(mut self, asn_url: &str, city_url: &str) -> Self {
        self.asn_url = asn_url.to_string();
        self.city_url = city_url.to_string();
        self
    }

    /// Set a custom freshness window.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Paths of the tables this fetcher extracts.
    pub fn sources(&self) -> TableSources {
        TableSources::in_dir(&self.data_dir)
    }

    /// Download any missing or stale archive, then extract the tables.
    ///
    /// Returns whether anything was downloaded. Fresh archives are
    /// re-extracted without a download, which repairs deleted table files
    /// for free.
    pub fn refresh(&self) -> Result<bool> {
        self.fetch(false)
    }

    /// Download both archives and extract the tables, regardless of age.
    pub fn force_refresh(&self) -> Result<()> {
        self.fetch(true).map(|_| ())
    }

    fn fetch(&self, force: bool) -> Result<bool> {
        fs::create_dir_all(&self.data_dir)?;

        let mut downloaded = false;
        for url in [&self.asn_url, &self.city_url] {
            let archive = self.archive_path(url)?;
            match Self::archive_age(&archive) {
                Some(age) if !force && age < self.max_age => {
                    log::info!(
                        "{} is {} days old, keeping it",
                        archive.display(),
                        age.as_secs() / 86400
                    );
                }
                _ => {
                    self.download(url, &archive)?;
                    downloaded = true;
                }
            }
            self.extract(&archive)?;
        }
        Ok(downloaded)
    }

    /// Local path an archive URL downloads to: the URL's file name under
    /// the data directory.
    fn archive_path(&self, url: &str) -> Result<PathBuf> {
        let name = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Download(format!("{url}: no file name in URL")))?;
        Ok(self.data_dir.join(name))
    }

    /// Time since the archive was last written, or `None` when missing.
    fn archive_age(path: &Path) -> Option<Duration> {
        let modified = fs::metadata(path).and_then(|meta| meta.modified()).ok()?;
        SystemTime::now().duration_since(modified).ok()
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        log::info!("downloading {}", url);
        let response = ureq::get(url)
            .call()
            .map_err(|e| Error::Download(format!("{url}: {e}")))?;

        let temp = temp_path(dest);
        let mut out = File::create(&temp)?;
        let bytes = io::copy(&mut response.into_reader(), &mut out)?;
        out.sync_all()?;
        drop(out);
        fs::rename(&temp, dest)?;

        log::info!("downloaded {} ({} bytes)", dest.display(), bytes);
        Ok(())
    }

    fn extract(&self, archive: &Path) -> Result<()> {
        match archive.extension().and_then(OsStr::to_str) {
            Some("zip") => self.extract_zip(archive),
            Some("gz") => self.extract_gz(archive),
            _ => Err(Error::ArchiveLayout(format!(
                "{}: expected a .zip or .gz archive",
                archive.display()
            ))),
        }
    }

    /// Extract every known table file from a zip archive. Members are
    /// matched by file name only; the city archive nests its tables inside
    /// a dated directory.
    fn extract_zip(&self, archive: &Path) -> Result<()> {
        let mut zip = zip::ZipArchive::new(File::open(archive)?)?;

        let mut extracted = 0usize;
        for index in 0..zip.len() {
            let mut member = zip.by_index(index)?;
            let Some(name) = table_file_name(member.name()) else {
                continue;
            };
            let dest = self.data_dir.join(name);
            let temp = temp_path(&dest);
            let mut out = File::create(&temp)?;
            io::copy(&mut member, &mut out)?;
            out.sync_all()?;
            drop(out);
            fs::rename(&temp, &dest)?;
            log::info!("extracted {}", dest.display());
            extracted += 1;
        }

        if extracted == 0 {
            return Err(Error::ArchiveLayout(format!(
                "{}: no table files in archive",
                archive.display()
            )));
        }
        Ok(())
    }

    /// Gunzip a single-file archive; the table name is the archive name
    /// minus the `.gz` suffix.
    fn extract_gz(&self, archive: &Path) -> Result<()> {
        let inner = archive.file_stem().and_then(OsStr::to_str).unwrap_or("");
        let Some(name) = table_file_name(inner) else {
            return Err(Error::ArchiveLayout(format!(
                "{}: does not unpack to a known table file",
                archive.display()
            )));
        };

        let dest = self.data_dir.join(name);
        let temp = temp_path(&dest);
        let mut decoder = GzDecoder::new(BufReader::new(File::open(archive)?));
        let mut out = File::create(&temp)?;
        io::copy(&mut decoder, &mut out)?;
        out.sync_all()?;
        drop(out);
        fs::rename(&temp, &dest)?;

        log::info!("extracted {}", dest.display());
        Ok(())
    }
}

/// Matches a path against the known table file names, by base name.
fn table_file_name(member: &str) -> Option<&'static str> {
    let base = Path::new(member).file_name()?;
    TABLE_FILE_NAMES.into_iter().find(|name| base == OsStr::new(name))
}

/// Sibling path used for not-yet-complete writes.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
