//! Fetch command implementation

use super::DatasetArgs;
use crate::context::AppContext;
use crate::progress::ProgressReporter;
use anyhow::{Context, Result};
use clap::Args;
use difumo_engine::{DifumoFiles, Downloader, HttpDownloader};
use std::time::Duration;

/// Arguments for the fetch command
#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,
}

impl FetchArgs {
    /// Execute the fetch command
    pub fn execute(&self, context: &AppContext, quiet: bool) -> Result<()> {
        let timeout = Duration::from_secs(context.config.performance.download_timeout_secs);
        let downloader = HttpDownloader::new(timeout)?;
        let fetched = self.fetch_with(context, &downloader, quiet)?;

        if !quiet {
            for files in &fetched {
                println!("✓ DiFuMo {}: {}", files.dimension, files.maps.display());
            }
        }
        Ok(())
    }

    /// Fetch the requested dimensions through `downloader`
    ///
    /// The dataset README and resampling script come along with the first
    /// dimension.
    pub fn fetch_with(
        &self,
        context: &AppContext,
        downloader: &dyn Downloader,
        quiet: bool,
    ) -> Result<Vec<DifumoFiles>> {
        let dimensions = context.dimensions(&self.dataset.dimensions)?;
        log::info!(
            "fetching {} dimension(s) into {}",
            dimensions.len(),
            context.cache().root().display()
        );

        let mut progress = ProgressReporter::new(quiet);
        progress.init(dimensions.len() as u64, "dimensions");

        let mut fetched = Vec::with_capacity(dimensions.len());
        for dimension in dimensions {
            progress.started(&format!("DiFuMo {dimension}"));
            let files = context
                .cache()
                .fetch_difumo(dimension, context.resolution(), downloader)
                .with_context(|| format!("Failed to fetch DiFuMo {dimension}"))?;
            progress.completed(&format!("DiFuMo {dimension}"));
            fetched.push(files);
        }

        progress.finish();
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Writes the URL into the destination instead of downloading
    #[derive(Default)]
    struct RecordingDownloader {
        urls: RefCell<Vec<String>>,
    }

    impl Downloader for RecordingDownloader {
        fn download(&self, url: &str, destination: &Path) -> difumo_engine::fetcher::Result<()> {
            self.urls.borrow_mut().push(url.to_string());
            fs::write(destination, url).unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_present_maps_only_fetch_auxiliary_files() {
        let dir = TempDir::new().unwrap();
        let context = AppContext::new(CliConfig::default(), Some(dir.path().to_path_buf()));
        let files = context.cache().locate(64, 2).unwrap();
        fs::create_dir_all(files.maps.parent().unwrap()).unwrap();
        fs::write(&files.maps, "maps").unwrap();
        fs::write(&files.labels, "labels").unwrap();

        let args = FetchArgs {
            dataset: DatasetArgs {
                dimensions: vec![64],
                data_dir: None,
            },
        };
        let downloader = RecordingDownloader::default();
        let fetched = args.fetch_with(&context, &downloader, true).unwrap();

        assert_eq!(fetched, vec![files]);
        let urls = downloader.urls.borrow();
        assert_eq!(urls.len(), 2);
        assert!(context.cache().root().join("README.md").is_file());
    }

    #[test]
    fn test_invalid_dimension_fails_before_download() {
        let dir = TempDir::new().unwrap();
        let context = AppContext::new(CliConfig::default(), Some(dir.path().to_path_buf()));
        let args = FetchArgs {
            dataset: DatasetArgs {
                dimensions: vec![100],
                data_dir: None,
            },
        };
        let downloader = RecordingDownloader::default();

        let err = args.fetch_with(&context, &downloader, true).unwrap_err();
        assert!(err.to_string().contains("dimension=100"));
        assert!(downloader.urls.borrow().is_empty());
    }
}
