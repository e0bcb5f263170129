//! Generate config command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the generate-config command
#[derive(Debug, Args)]
pub struct GenerateConfigArgs {
    /// Output file path
    #[arg(short, long, value_name = "FILE", default_value = "difumo-site.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

const TEMPLATE: &str = r#"# Configuration for difumo-site

[data]
# Where fetched dictionaries are cached (default: $NILEARN_DATA or ~/nilearn_data)
# dir = "/data/nilearn_data"
# Resolution of the maps in mm: 2 or 3
resolution = 2

[site]
# Directory the pages are written under
root = "."
# Address the site is served from, used for links and the sitemap
base_url = "https://parietal-inria.github.io/DiFuMo"
# Directory holding the overlap tables read by `site`
tables = "tables"

[mask]
# Brain mask restricting the overlaps (default: support of the DiFuMo maps)
# path = "MNI152_T1_2mm_brain_mask.nii.gz"

[tissue]
# Tissue probability maps used by `tissue`
# gm = "avg152T1_gray.nii.gz"
# wm = "avg152T1_white.nii.gz"
# csf = "avg152T1_csf.nii.gz"

# One section per reference atlas. Names:
#   harvard_oxford, destrieux, diedrichsen, juelich, jhu, mist,
#   yeo_networks7, yeo_networks17
# format is one of fsl_xml, mist_csv, text, yeo7, yeo17 and defaults per atlas.
#
# [atlases.juelich]
# maps = "atlases/Juelich/Juelich-maxprob-thr25-2mm.nii.gz"
# labels = "atlases/Juelich.xml"
#
# [atlases.mist]
# maps = "atlases/MIST/Parcellations/MIST_122.nii.gz"
# labels = "atlases/MIST/Parcel_Information/MIST_122.csv"
#
# [atlases.yeo_networks7]
# maps = "atlases/Yeo_JNeurophysiol11_MNI152/Yeo2011_7Networks_MNI152_FreeSurferConformed1mm_LiberalMask.nii.gz"

[performance]
# Number of worker threads (0 = auto)
worker_threads = 0
# Download timeout in seconds
download_timeout_secs = 300
"#;

impl GenerateConfigArgs {
    /// Execute the generate-config command
    pub fn execute(&self) -> Result<()> {
        if self.output.exists() && !self.force {
            anyhow::bail!(
                "{} already exists; pass --force to overwrite it",
                self.output.display()
            );
        }

        println!("Generating configuration template...");
        println!("  Output file: {}", self.output.display());

        std::fs::write(&self.output, TEMPLATE)
            .with_context(|| format!("Failed to write to {}", self.output.display()))?;

        println!("✓ Configuration template generated successfully!");
        println!();
        println!("Next steps:");
        println!("1. Add [atlases.<name>] sections for your reference atlases");
        println!("2. Validate your configuration:");
        println!("   difumo-site -c {} validate", self.output.display());
        println!("3. Fetch the dictionaries and build the tables:");
        println!("   difumo-site -c {} fetch -d 64", self.output.display());
        println!("   difumo-site -c {} label -d 64", self.output.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use tempfile::TempDir;

    #[test]
    fn test_template_parses_to_defaults() {
        let config: CliConfig = toml::from_str(TEMPLATE).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("difumo-site.toml");
        std::fs::write(&output, "# mine").unwrap();

        let args = GenerateConfigArgs {
            output: output.clone(),
            force: false,
        };
        assert!(args.execute().is_err());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "# mine");

        let args = GenerateConfigArgs { output: output.clone(), force: true };
        args.execute().unwrap();
        assert!(std::fs::read_to_string(&output).unwrap().contains("[performance]"));
    }
}
