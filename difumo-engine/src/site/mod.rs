//! Static site generation
//!
//! Layout under the site root:
//!
//! ```text
//! index.md
//! {dim}.md
//! {dim}/html/{i}.html
//! {dim}/related/component_{i}.md
//! assets/sitemap.txt
//! ```
//!
//! Component numbers in paths are 1-based; images under `{dim}/final/` are
//! 0-based, as rendered by the plotting scripts.

pub mod html;
pub mod markdown;
pub mod sitemap;

use crate::error::{EngineError, Result};
use crate::registry::AtlasRegistry;
use crate::tables::{LabelsTable, RelatedRow, RelatedTable, NO_LABEL};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything shown about one component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentPage {
    /// Dimension of the dictionary
    pub dimension: u32,
    /// 1-based component number
    pub index: usize,
    /// Component name
    pub name: String,
    /// Cut coordinates, when a labels table provides them
    pub cut_coords: Option<[f64; 3]>,
    /// (atlas alias, label) pairs with a match
    pub labels: Vec<(String, String)>,
    /// Related components in every dimension
    pub related: Vec<RelatedRow>,
}

impl ComponentPage {
    /// Title of the related-structures page
    pub fn related_title(&self) -> String {
        format!("Structures related to DiFuMo {} {}", self.dimension, self.name)
    }

    /// Address of the component's HTML page
    pub fn html_url(&self, base_url: &str) -> String {
        format!("{base_url}/{}/html/{}.html", self.dimension, self.index)
    }

    /// Address of the related-structures page
    pub fn related_url(&self, base_url: &str) -> String {
        format!("{base_url}/{}/related/component_{}", self.dimension, self.index)
    }
}

/// Inputs for the pages of one dimension
#[derive(Debug, Clone, Default)]
pub struct DimensionContent {
    /// Dimension of the dictionary
    pub dimension: u32,
    /// Component names, in component order
    pub names: Vec<String>,
    /// Region labeling table, if computed
    pub labels: Option<LabelsTable>,
    /// Cross-dimension relations, if computed
    pub related: Option<RelatedTable>,
}

impl DimensionContent {
    /// One page description per component
    pub fn pages(&self) -> Vec<ComponentPage> {
        self.names
            .iter()
            .enumerate()
            .map(|(offset, name)| {
                let row = self
                    .labels
                    .as_ref()
                    .and_then(|table| table.rows.iter().find(|r| r.component == offset).map(|r| (table, r)));

                let labels = row
                    .map(|(table, row)| {
                        table
                            .atlases
                            .iter()
                            .zip(&row.labels)
                            .filter(|(_, label)| label.as_str() != NO_LABEL)
                            .map(|(atlas, label)| (atlas.alias().to_string(), label.clone()))
                            .collect()
                    })
                    .unwrap_or_default();

                let related = self
                    .related
                    .as_ref()
                    .map(|table| table.for_component(offset + 1).cloned().collect())
                    .unwrap_or_default();

                ComponentPage {
                    dimension: self.dimension,
                    index: offset + 1,
                    name: name.clone(),
                    cut_coords: row.map(|(_, row)| row.cut_coords),
                    labels,
                    related,
                }
            })
            .collect()
    }
}

/// Writes pages under a site root
#[derive(Debug, Clone)]
pub struct SiteGenerator {
    root: PathBuf,
    registry: AtlasRegistry,
}

impl SiteGenerator {
    /// Generator writing under `root`
    pub fn new(root: impl Into<PathBuf>, registry: AtlasRegistry) -> Self {
        Self {
            root: root.into(),
            registry,
        }
    }

    /// Site root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write(&self, relative: impl AsRef<Path>, contents: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(EngineError::io(parent))?;
        }
        fs::write(&path, contents).map_err(EngineError::io(&path))?;
        log::debug!("wrote {}", path.display());
        Ok(path)
    }

    /// Write `index.md`
    pub fn write_index(&self) -> Result<PathBuf> {
        self.write("index.md", &markdown::index_page(&self.registry)?)
    }

    /// Write the dimension page, related pages and HTML pages of one dimension
    ///
    /// Returns the number of components written.
    pub fn write_dimension(&self, content: &DimensionContent) -> Result<usize> {
        let dimension = content.dimension;
        self.registry.entry(dimension)?;
        self.write(
            format!("{dimension}.md"),
            &markdown::dimension_page(&self.registry, dimension, &content.names)?,
        )?;

        let base_url = self.registry.base_url();
        let pages = content.pages();
        for page in &pages {
            let dir = PathBuf::from(dimension.to_string());
            self.write(
                dir.join("related").join(format!("component_{}.md", page.index)),
                &markdown::related_page(page, base_url),
            )?;
            self.write(
                dir.join("html").join(format!("{}.html", page.index)),
                &html::component_page(page, base_url),
            )?;
        }

        log::info!("DiFuMo {dimension}: wrote {} component pages", pages.len());
        Ok(pages.len())
    }

    /// Write `assets/sitemap.txt`, as absolute URLs when `absolute` is set
    pub fn write_sitemap(&self, absolute: bool) -> Result<Vec<String>> {
        let base_url = absolute.then(|| self.registry.base_url());
        sitemap::write_sitemap(&self.root, base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceAtlas;
    use crate::tables::LabelRow;
    use tempfile::TempDir;

    fn content() -> DimensionContent {
        DimensionContent {
            dimension: 64,
            names: vec!["Insula".to_string(), "Precuneus".to_string()],
            labels: Some(LabelsTable {
                atlases: vec![ReferenceAtlas::HarvardOxford, ReferenceAtlas::Mist],
                rows: vec![LabelRow {
                    component: 1,
                    labels: vec!["Precuneous Cortex".to_string(), NO_LABEL.to_string()],
                    cut_coords: [2.0, -60.0, 40.0],
                }],
            }),
            related: Some(RelatedTable {
                rows: vec![RelatedRow {
                    dimension: 64,
                    component: 2,
                    identified: 5,
                    overlap_against: 128,
                    label: "Posterior cingulate".to_string(),
                }],
            }),
        }
    }

    #[test]
    fn test_pages_join_tables() {
        let pages = content().pages();
        assert_eq!(pages.len(), 2);

        assert_eq!(pages[0].cut_coords, None);
        assert!(pages[0].labels.is_empty());
        assert!(pages[0].related.is_empty());

        assert_eq!(pages[1].index, 2);
        assert_eq!(pages[1].cut_coords, Some([2.0, -60.0, 40.0]));
        assert_eq!(
            pages[1].labels,
            vec![("Harvard Oxford".to_string(), "Precuneous Cortex".to_string())]
        );
        assert_eq!(pages[1].related[0].identified, 5);
        assert_eq!(pages[1].related_title(), "Structures related to DiFuMo 64 Precuneus");
    }

    #[test]
    fn test_write_dimension_layout() {
        let dir = TempDir::new().unwrap();
        let generator = SiteGenerator::new(dir.path(), AtlasRegistry::default());

        generator.write_index().unwrap();
        assert_eq!(generator.write_dimension(&content()).unwrap(), 2);

        for relative in [
            "index.md",
            "64.md",
            "64/html/1.html",
            "64/html/2.html",
            "64/related/component_1.md",
            "64/related/component_2.md",
        ] {
            assert!(dir.path().join(relative).exists(), "{relative} missing");
        }

        let entries = generator.write_sitemap(false).unwrap();
        assert_eq!(
            entries,
            vec!["64.html", "64/html/1.html", "64/html/2.html", "index.html"]
        );
    }

    #[test]
    fn test_unknown_dimension_rejected() {
        let dir = TempDir::new().unwrap();
        let generator = SiteGenerator::new(dir.path(), AtlasRegistry::default());
        let content = DimensionContent {
            dimension: 100,
            ..DimensionContent::default()
        };
        assert!(matches!(
            generator.write_dimension(&content),
            Err(EngineError::Registry(_))
        ));
    }
}
