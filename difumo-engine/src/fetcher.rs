//! Dataset cache and downloader
//!
//! DiFuMo dictionaries are published as one zip archive per dimension. The
//! cache keeps the extracted files under `<data_dir>/difumo_atlases` and only
//! touches the network when a requested file is missing.

use crate::registry::{AtlasRegistry, RegistryError};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the cache sub-directory
pub const DATASET_NAME: &str = "difumo_atlases";

/// README file kept next to the atlases
pub const README_FILE: &str = "README.md";

/// Resampling script kept next to the atlases
pub const RESAMPLE_SCRIPT_FILE: &str = "resample_dictionaries.py";

/// Errors raised while populating the cache
#[derive(Error, Debug)]
pub enum FetchError {
    /// Unknown dimension or resolution
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Local filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The download failed
    #[error("failed to download {url}: {reason}")]
    Download {
        /// Requested URL
        url: String,
        /// Failure description
        reason: String,
    },

    /// The archive could not be read
    #[error("invalid archive {path}: {reason}")]
    Archive {
        /// Archive on disk
        path: PathBuf,
        /// Failure description
        reason: String,
    },

    /// A required file is absent from the archive
    #[error("archive {archive} has no entry {entry}")]
    MissingEntry {
        /// Archive on disk
        archive: PathBuf,
        /// Missing relative path
        entry: String,
    },
}

/// Result type for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> FetchError + '_ {
    move |source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Something that can copy a URL into a local file
pub trait Downloader {
    /// Download `url` into `destination`, replacing any existing file
    fn download(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Blocking HTTP downloader
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "fetch")]
impl HttpDownloader {
    /// Create a downloader with the given request timeout
    pub fn new(timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Download {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "fetch")]
impl Downloader for HttpDownloader {
    fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let failed = |e: reqwest::Error| FetchError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        };

        log::info!("downloading {url}");
        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(failed)?;

        // Write next to the destination, then move into place
        let partial = destination.with_extension("part");
        let mut file = File::create(&partial).map_err(io_error(&partial))?;
        response.copy_to(&mut file).map_err(failed)?;
        drop(file);
        fs::rename(&partial, destination).map_err(io_error(destination))?;
        Ok(())
    }
}

/// Paths of one fetched dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifumoFiles {
    /// Dimension fetched
    pub dimension: u32,
    /// 4-D maps image
    pub maps: PathBuf,
    /// Label CSV
    pub labels: PathBuf,
}

/// Local cache of DiFuMo dictionaries
#[derive(Debug, Clone)]
pub struct DatasetCache {
    root: PathBuf,
    registry: AtlasRegistry,
}

/// Default data directory: `$NILEARN_DATA`, else `~/nilearn_data`
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("NILEARN_DATA") {
        return PathBuf::from(dir);
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join("nilearn_data"))
        .unwrap_or_else(|| PathBuf::from("nilearn_data"))
}

impl DatasetCache {
    /// Cache under `data_dir/difumo_atlases`
    pub fn new(data_dir: impl AsRef<Path>, registry: AtlasRegistry) -> Self {
        Self {
            root: data_dir.as_ref().join(DATASET_NAME),
            registry,
        }
    }

    /// Directory holding the extracted files
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Registry used to resolve dimensions
    pub fn registry(&self) -> &AtlasRegistry {
        &self.registry
    }

    /// Where the files for `dimension` live once fetched
    pub fn locate(&self, dimension: u32, resolution_mm: u32) -> Result<DifumoFiles> {
        Ok(DifumoFiles {
            dimension,
            maps: self
                .root
                .join(self.registry.maps_path(dimension, resolution_mm)?),
            labels: self.root.join(self.registry.labels_path(dimension)?),
        })
    }

    /// Ensure maps and labels for `dimension` are available locally
    pub fn fetch_difumo(
        &self,
        dimension: u32,
        resolution_mm: u32,
        downloader: &dyn Downloader,
    ) -> Result<DifumoFiles> {
        let files = self.locate(dimension, resolution_mm)?;

        if files.maps.exists() && files.labels.exists() {
            log::debug!("DiFuMo {dimension} already present in {}", self.root.display());
        } else {
            fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;
            let archive = self.root.join(format!("{dimension}.zip"));
            downloader.download(&self.registry.archive_url(dimension)?, &archive)?;

            let wanted = [
                self.registry.maps_path(dimension, resolution_mm)?,
                self.registry.labels_path(dimension)?,
            ];
            let extracted = extract_entries(&archive, &wanted, &self.root);
            fs::remove_file(&archive).map_err(io_error(&archive))?;
            extracted?;
            log::info!("extracted DiFuMo {dimension} into {}", self.root.display());
        }

        self.fetch_auxiliary(downloader)?;
        Ok(files)
    }

    /// Fetch the README and resampling script when absent
    pub fn fetch_auxiliary(&self, downloader: &dyn Downloader) -> Result<()> {
        let auxiliary = [
            (README_FILE, self.registry.readme_url()),
            (RESAMPLE_SCRIPT_FILE, self.registry.resample_script_url()),
        ];
        for (name, url) in auxiliary {
            let path = self.root.join(name);
            if path.exists() {
                continue;
            }
            fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;
            downloader.download(&url, &path)?;
        }
        Ok(())
    }
}

/// Extract `wanted` archive-relative paths into `destination`
///
/// Entries may sit below a leading directory in the archive; an entry
/// matches when its path ends with the wanted relative path.
pub fn extract_entries(archive: &Path, wanted: &[PathBuf], destination: &Path) -> Result<()> {
    let archive_error = |reason: String| FetchError::Archive {
        path: archive.to_path_buf(),
        reason,
    };

    let file = File::open(archive).map_err(io_error(archive))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;

    for relative in wanted {
        let suffix = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let nested = format!("/{suffix}");
        let mut candidates: Vec<String> = zip
            .file_names()
            .filter(|name| *name == suffix || name.ends_with(&nested))
            .map(str::to_string)
            .collect();
        candidates.sort_by_key(|name| name.len());
        let name = candidates
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::MissingEntry {
                archive: archive.to_path_buf(),
                entry: suffix.clone(),
            })?;

        let target = destination.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        let mut entry = zip
            .by_name(&name)
            .map_err(|e| archive_error(e.to_string()))?;
        let mut out = File::create(&target).map_err(io_error(&target))?;
        io::copy(&mut entry, &mut out).map_err(io_error(&target))?;
        log::debug!("extracted {suffix}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    /// Serves a prepared zip for archive URLs and text for anything else
    struct FakeDownloader {
        archive: Vec<u8>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeDownloader {
        fn new(entries: &[(&str, &[u8])]) -> Self {
            let mut buffer = io::Cursor::new(Vec::new());
            {
                let mut writer = zip::ZipWriter::new(&mut buffer);
                for (name, content) in entries {
                    writer.start_file(*name, FileOptions::default()).unwrap();
                    writer.write_all(content).unwrap();
                }
                writer.finish().unwrap();
            }
            Self {
                archive: buffer.into_inner(),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl Downloader for FakeDownloader {
        fn download(&self, url: &str, destination: &Path) -> Result<()> {
            self.requests.borrow_mut().push(url.to_string());
            let body: &[u8] = if url.contains("pqu9r") {
                &self.archive
            } else {
                b"auxiliary"
            };
            fs::write(destination, body).map_err(io_error(destination))
        }
    }

    #[test]
    fn test_fetch_extracts_and_then_skips() {
        let dir = TempDir::new().unwrap();
        let cache = DatasetCache::new(dir.path(), AtlasRegistry::default());
        let downloader = FakeDownloader::new(&[
            ("64/labels_64_dictionary.csv", b"Difumo_names\nA\n"),
            ("64/maps.nii.gz", b"maps"),
            ("64/3mm/resampled_maps.nii.gz", b"maps3"),
        ]);

        let files = cache.fetch_difumo(64, 2, &downloader).unwrap();
        assert_eq!(fs::read(&files.maps).unwrap(), b"maps");
        assert!(files.labels.ends_with("difumo_atlases/64/labels_64_dictionary.csv"));
        assert!(cache.root().join(README_FILE).exists());
        assert!(cache.root().join(RESAMPLE_SCRIPT_FILE).exists());
        assert!(!cache.root().join("64.zip").exists());
        assert_eq!(downloader.requests.borrow().len(), 3);

        cache.fetch_difumo(64, 2, &downloader).unwrap();
        assert_eq!(downloader.requests.borrow().len(), 3);
    }

    #[test]
    fn test_prefixed_archive_entries() {
        let dir = TempDir::new().unwrap();
        let cache = DatasetCache::new(dir.path(), AtlasRegistry::default());
        let downloader = FakeDownloader::new(&[
            ("DiFuMo_atlases/64/labels_64_dictionary.csv", b"A\n"),
            ("DiFuMo_atlases/64/3mm/resampled_maps.nii.gz", b"maps3"),
        ]);

        let files = cache.fetch_difumo(64, 3, &downloader).unwrap();
        assert_eq!(fs::read(&files.maps).unwrap(), b"maps3");
    }

    #[test]
    fn test_missing_entry_is_reported() {
        let dir = TempDir::new().unwrap();
        let cache = DatasetCache::new(dir.path(), AtlasRegistry::default());
        let downloader = FakeDownloader::new(&[("64/maps.nii.gz", b"maps")]);

        let err = cache.fetch_difumo(64, 2, &downloader).unwrap_err();
        assert!(matches!(err, FetchError::MissingEntry { .. }));
        assert!(err.to_string().contains("labels_64_dictionary.csv"));
    }

    #[test]
    fn test_invalid_dimension() {
        let dir = TempDir::new().unwrap();
        let cache = DatasetCache::new(dir.path(), AtlasRegistry::default());
        let downloader = FakeDownloader::new(&[]);

        let err = cache.fetch_difumo(65, 2, &downloader).unwrap_err();
        assert!(matches!(err, FetchError::Registry(_)));
        assert!(downloader.requests.borrow().is_empty());
    }
}
