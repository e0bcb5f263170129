//! Resample command implementation

use crate::input::resolve_patterns;
use crate::progress::ProgressReporter;
use anyhow::{Context, Result};
use clap::Args;
use difumo_core::{resample, Interpolation};
use difumo_engine::{nifti, VolumeStack, VoxelGrid};
use std::path::{Path, PathBuf};

/// Arguments for the resample command
#[derive(Debug, Args)]
pub struct ResampleArgs {
    /// Input images or patterns (supports glob)
    #[arg(short, long, value_name = "FILE/PATTERN", required = true)]
    pub input: Vec<String>,

    /// Image whose grid the inputs are resampled onto
    #[arg(short, long, value_name = "FILE")]
    pub reference: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Interpolation method (use nearest for label images)
    #[arg(long, value_enum, default_value = "linear")]
    pub interpolation: InterpolationArg,
}

/// Interpolation choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InterpolationArg {
    /// Nearest neighbour
    Nearest,
    /// Trilinear
    Linear,
}

impl From<InterpolationArg> for Interpolation {
    fn from(arg: InterpolationArg) -> Self {
        match arg {
            InterpolationArg::Nearest => Interpolation::Nearest,
            InterpolationArg::Linear => Interpolation::Linear,
        }
    }
}

/// Resample every volume of `stack` onto `target`
pub fn resample_stack(stack: &VolumeStack, target: &VoxelGrid, interpolation: Interpolation) -> Result<VolumeStack> {
    let mut data = Vec::with_capacity(target.n_voxels() * stack.n_volumes());
    for index in 0..stack.n_volumes() {
        let volume = resample(&stack.volume(index)?, target, interpolation)?;
        data.extend(volume.into_data());
    }
    Ok(VolumeStack::new(*target, stack.n_volumes(), data)?)
}

fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    match input.file_name() {
        Some(name) => output_dir.join(name),
        None => output_dir.join("resampled.nii.gz"),
    }
}

impl ResampleArgs {
    /// Execute the resample command
    pub fn execute(&self, quiet: bool) -> Result<()> {
        let inputs = resolve_patterns(&self.input)?;
        let target = *nifti::read_image(&self.reference)
            .with_context(|| format!("Failed to read reference {}", self.reference.display()))?
            .grid();
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;

        let mut progress = ProgressReporter::new(quiet);
        progress.init(inputs.len() as u64, "files");

        for input in &inputs {
            let name = input.display().to_string();
            progress.started(&name);
            let stack = nifti::read_stack(input).with_context(|| format!("Failed to read {name}"))?;
            let resampled = resample_stack(&stack, &target, self.interpolation.into())?;
            let output = output_path(&self.output_dir, input);
            nifti::write_image(&output, &resampled)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            log::info!("{name} -> {}", output.display());
            progress.completed(&name);
        }

        progress.finish();
        if !quiet {
            println!("✓ Resampled {} image(s) into {}", inputs.len(), self.output_dir.display());
        }
        Ok(())
    }
}
