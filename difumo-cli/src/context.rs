//! State shared by the commands: configuration, registry and dataset cache

use crate::config::CliConfig;
use crate::error::CliError;
use anyhow::{Context as _, Result};
use difumo_engine::{
    default_data_dir, nifti, AtlasRegistry, DatasetCache, DifumoAtlas, LoadedReference, RegistryTable,
    Volume,
};
use std::path::PathBuf;

/// Resolved settings for one invocation
#[derive(Debug)]
pub struct AppContext {
    /// Loaded configuration
    pub config: CliConfig,
    cache: DatasetCache,
}

impl AppContext {
    /// Build the context, `data_dir` overriding `[data] dir`
    pub fn new(config: CliConfig, data_dir: Option<PathBuf>) -> Self {
        let registry =
            AtlasRegistry::new(RegistryTable::default()).with_base_url(config.site.base_url.clone());
        let data_dir = data_dir
            .or_else(|| config.data.dir.clone())
            .unwrap_or_else(default_data_dir);
        log::debug!("data directory: {}", data_dir.display());

        Self {
            cache: DatasetCache::new(data_dir, registry),
            config,
        }
    }

    /// Atlas registry
    pub fn registry(&self) -> &AtlasRegistry {
        self.cache.registry()
    }

    /// Local dataset cache
    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Configured resolution in mm
    pub fn resolution(&self) -> u32 {
        self.config.data.resolution
    }

    /// Requested dimensions, every published one when none are given
    pub fn dimensions(&self, requested: &[u32]) -> Result<Vec<u32>> {
        if requested.is_empty() {
            return Ok(self.registry().dimensions());
        }
        let mut dimensions = requested.to_vec();
        dimensions.sort_unstable();
        dimensions.dedup();
        for &dimension in &dimensions {
            self.registry().check(dimension, self.resolution())?;
        }
        Ok(dimensions)
    }

    /// Load a fetched dictionary
    pub fn load_atlas(&self, dimension: u32) -> Result<DifumoAtlas> {
        let files = self.cache.locate(dimension, self.resolution())?;
        if !files.maps.is_file() || !files.labels.is_file() {
            return Err(CliError::MissingDataset(dimension).into());
        }
        DifumoAtlas::load(&files).with_context(|| format!("Failed to load DiFuMo {dimension}"))
    }

    /// Brain mask from `[mask] path`, if set
    pub fn load_mask(&self) -> Result<Option<Volume>> {
        self.config
            .mask
            .path
            .as_ref()
            .map(|path| {
                nifti::read_volume(path)
                    .with_context(|| format!("Failed to read mask {}", path.display()))
            })
            .transpose()
    }

    /// Load configured reference atlases, restricted to `only` when non-empty
    pub fn load_references(&self, only: &[String]) -> Result<Vec<LoadedReference>> {
        let wanted = difumo_engine::ReferenceAtlas::parse_list(only)?;
        let sources = self.config.reference_sources()?;

        for atlas in &wanted {
            if !sources.iter().any(|(configured, _)| configured == atlas) {
                return Err(CliError::ConfigError(format!(
                    "atlas '{atlas}' has no [atlases.{atlas}] section"
                ))
                .into());
            }
        }

        let mut references = Vec::new();
        for (atlas, source) in sources {
            if !wanted.is_empty() && !wanted.contains(&atlas) {
                continue;
            }
            if !source.maps.is_file() {
                return Err(CliError::FileNotFound(source.maps.display().to_string()).into());
            }
            let reference = LoadedReference::load(atlas, &source)
                .with_context(|| format!("Failed to load reference atlas {atlas}"))?;
            references.push(reference);
        }
        Ok(references)
    }

    /// Worker pool sized by `[performance] worker_threads`
    pub fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        let threads = match self.config.performance.worker_threads {
            0 => num_cpus::get(),
            n => n,
        };
        log::debug!("using {threads} worker threads");
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("Failed to build thread pool")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dimensions_default_to_all() {
        let context = AppContext::new(CliConfig::default(), Some(PathBuf::from("data")));
        assert_eq!(context.dimensions(&[]).unwrap(), vec![64, 128, 256, 512, 1024]);
        assert_eq!(context.dimensions(&[256, 64, 64]).unwrap(), vec![64, 256]);
    }

    #[test]
    fn test_invalid_dimension_names_valid_set() {
        let context = AppContext::new(CliConfig::default(), Some(PathBuf::from("data")));
        let err = context.dimensions(&[100]).unwrap_err();
        assert!(err.to_string().contains("64, 128, 256, 512, 1024"));
    }

    #[test]
    fn test_missing_dataset_suggests_fetch() {
        let dir = TempDir::new().unwrap();
        let context = AppContext::new(CliConfig::default(), Some(dir.path().to_path_buf()));
        let err = context.load_atlas(64).unwrap_err();
        assert!(err.to_string().contains("difumo-site fetch -d 64"));
    }

    #[test]
    fn test_unconfigured_reference_is_rejected() {
        let context = AppContext::new(CliConfig::default(), Some(PathBuf::from("data")));
        let err = context.load_references(&["jhu".to_string()]).unwrap_err();
        assert!(err.to_string().contains("[atlases.jhu]"));
        assert!(context.load_references(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_thread_pool_honours_config() {
        let mut config = CliConfig::default();
        config.performance.worker_threads = 2;
        let context = AppContext::new(config, Some(PathBuf::from("data")));
        assert_eq!(context.thread_pool().unwrap().current_num_threads(), 2);
    }
}
