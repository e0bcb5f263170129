//! Integration tests for the difumo-site CLI
//!
//! Each test builds a small data directory holding a fetched DiFuMo 64
//! dictionary and one reference atlas, so nothing is downloaded.

use assert_cmd::Command;
use difumo_core::{Affine, Volume, VolumeStack, VoxelGrid};
use difumo_engine::nifti;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn grid() -> VoxelGrid {
    VoxelGrid::new([3, 2, 1], Affine::diagonal([2.0, 2.0, 2.0], [-2.0, 0.0, 0.0]))
}

/// Data directory, site root and config file inside a temp dir
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data/difumo_atlases/64");
        fs::create_dir_all(&data).unwrap();

        let maps = vec![
            0.9, 0.0, 0.0, 0.8, 0.1, 0.0, //
            0.0, 0.0, 0.7, 0.0, 0.2, 0.9,
        ];
        nifti::write_image(&data.join("maps.nii.gz"), &VolumeStack::new(grid(), 2, maps).unwrap())
            .unwrap();
        fs::write(
            data.join("labels_64_dictionary.csv"),
            "Component,Difumo_names\n1,Left column\n2,Right column\n",
        )
        .unwrap();

        let atlases = dir.path().join("atlases");
        fs::create_dir_all(&atlases).unwrap();
        let labels_img = Volume::new(grid(), vec![1.0, 0.0, 2.0, 1.0, 0.0, 2.0]).unwrap();
        nifti::write_image(&atlases.join("juelich.nii"), &labels_img.into()).unwrap();
        fs::write(
            atlases.join("juelich.xml"),
            "<data><label index=\"0\">GM Left area</label>\n<label index=\"1\">GM Right area</label></data>",
        )
        .unwrap();

        let workspace = Self { dir };
        fs::write(workspace.config(), workspace.config_text()).unwrap();
        workspace
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn config(&self) -> PathBuf {
        self.path("difumo-site.toml")
    }

    fn config_text(&self) -> String {
        let p = |relative: &str| self.path(relative).display().to_string();
        format!(
            "[data]\ndir = {:?}\n\n[site]\nroot = {:?}\ntables = {:?}\n\n\
             [atlases.juelich]\nmaps = {:?}\nlabels = {:?}\n",
            p("data"),
            p("site"),
            p("tables"),
            p("atlases/juelich.nii"),
            p("atlases/juelich.xml"),
        )
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("difumo-site").unwrap();
        cmd.env_remove("DIFUMO_SITE_CONFIG")
            .arg("-q")
            .arg("-c")
            .arg(self.config());
        cmd
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_list_dimensions() {
    let mut cmd = Command::cargo_bin("difumo-site").unwrap();
    cmd.arg("list").arg("dimensions");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1024"))
        .stdout(predicate::str::contains("https://osf.io/"));
}

#[test]
fn test_list_atlases() {
    let mut cmd = Command::cargo_bin("difumo-site").unwrap();
    cmd.arg("list").arg("atlases");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("harvard_oxford"))
        .stdout(predicate::str::contains("yeo_networks17"))
        .stdout(predicate::str::contains("fsl_xml"));
}

#[test]
fn test_generate_then_validate_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("generated.toml");

    let mut cmd = Command::cargo_bin("difumo-site").unwrap();
    cmd.arg("generate-config").arg("-o").arg(&config);
    cmd.assert().success();

    let mut cmd = Command::cargo_bin("difumo-site").unwrap();
    cmd.arg("-c").arg(&config).arg("validate");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("✓ Configuration is valid!"));
}

#[test]
fn test_validate_reports_missing_files() {
    let workspace = Workspace::new();
    fs::remove_file(workspace.path("atlases/juelich.xml")).unwrap();

    workspace
        .cmd()
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("✗ Configuration is invalid!"))
        .stdout(predicate::str::contains("[atlases.juelich] labels"));
}

#[test]
fn test_label_relate_and_site() {
    let workspace = Workspace::new();

    workspace.cmd().args(["label", "-d", "64"]).assert().success();
    let labels = read(&workspace.path("tables/64_labels.csv"));
    assert!(labels.starts_with("component,juelich,cut_coords"));
    assert!(labels.contains("GM Left area"));
    assert!(labels.contains("GM Right area"));

    workspace
        .cmd()
        .args(["relate", "-d", "64", "--against", "64"])
        .assert()
        .success();
    let related = read(&workspace.path("tables/64_related.csv"));
    assert!(related.contains("Right column"));

    workspace
        .cmd()
        .args(["site", "-d", "64", "--absolute"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 component pages"));

    assert!(read(&workspace.path("site/index.md")).contains("64"));
    let page = read(&workspace.path("site/64/related/component_1.md"));
    assert!(page.contains("Structures related to DiFuMo 64 Left column"));
    assert!(page.contains("GM Left area"));
    assert!(read(&workspace.path("site/64/html/2.html")).contains("Right column"));

    let sitemap = read(&workspace.path("site/assets/sitemap.txt"));
    assert!(sitemap
        .lines()
        .all(|line| line.starts_with("https://parietal-inria.github.io/DiFuMo/")));
}

#[test]
fn test_label_json_output() {
    let workspace = Workspace::new();
    let out = workspace.path("json");

    workspace
        .cmd()
        .args(["label", "-d", "64", "-f", "json", "-o"])
        .arg(&out)
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_str(&read(&out.join("64_labels.json"))).unwrap();
    assert_eq!(value["atlases"][0], "juelich");
    assert_eq!(value["rows"][1]["labels"][0], "GM Right area");
}

#[test]
fn test_sitemap_relative_entries() {
    let workspace = Workspace::new();
    workspace.cmd().args(["site", "-d", "64"]).assert().success();

    workspace.cmd().arg("sitemap").assert().success();
    let sitemap = read(&workspace.path("site/assets/sitemap.txt"));
    assert!(sitemap.lines().any(|line| line == "64/html/1.html"));
}

#[test]
fn test_resample_onto_reference_grid() {
    let workspace = Workspace::new();
    let out = workspace.path("resampled");

    workspace
        .cmd()
        .arg("resample")
        .arg("-i")
        .arg(workspace.path("atlases/*.nii").display().to_string())
        .arg("-r")
        .arg(workspace.path("data/difumo_atlases/64/maps.nii.gz"))
        .arg("-o")
        .arg(&out)
        .args(["--interpolation", "nearest"])
        .assert()
        .success();

    let volume = nifti::read_volume(&out.join("juelich.nii")).unwrap();
    assert!(volume.grid().matches(&grid()));
    assert_eq!(volume.data(), &[1.0, 0.0, 2.0, 1.0, 0.0, 2.0]);
}

#[test]
fn test_missing_dataset_suggests_fetch() {
    let workspace = Workspace::new();

    workspace
        .cmd()
        .args(["label", "-d", "128"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("difumo-site fetch -d 128"));
}

#[test]
fn test_invalid_dimension() {
    let workspace = Workspace::new();

    workspace
        .cmd()
        .args(["relate", "-d", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("64, 128, 256, 512, 1024"));
}

#[test]
fn test_tissue_without_maps() {
    let workspace = Workspace::new();

    workspace
        .cmd()
        .args(["tissue", "-d", "64"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No GM map configured"));
}

#[test]
fn test_unknown_atlas_flag() {
    let workspace = Workspace::new();

    workspace
        .cmd()
        .args(["label", "-d", "64", "-a", "aal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("atlas name 'aal' is not valid"));
}
