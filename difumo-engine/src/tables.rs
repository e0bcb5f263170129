//! Overlap tables
//!
//! Comma-delimited outputs of the labeling pipelines, and the readers the
//! site generator uses to load them back.

use crate::delimited::{format_record, parse_records};
use crate::error::{EngineError, Result};
use crate::reference::ReferenceAtlas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

const DELIMITER: char = ',';

/// Label written when a component overlaps nothing in an atlas
pub const NO_LABEL: &str = "none";

fn table_error(origin: &str, reason: impl Into<String>) -> EngineError {
    EngineError::Table {
        origin: origin.to_string(),
        reason: reason.into(),
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(EngineError::io(parent))?;
    }
    fs::write(path, contents).map_err(EngineError::io(path))
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(EngineError::io(path))
}

/// Split records into header and rows, checking the header
fn split_header(
    text: &str,
    origin: &str,
    check: impl Fn(&[String]) -> bool,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut records = parse_records(text, DELIMITER).map_err(|r| table_error(origin, r))?;
    if records.is_empty() {
        return Err(table_error(origin, "missing header"));
    }
    let header = records.remove(0);
    if !check(&header) {
        return Err(table_error(origin, format!("unexpected header: {}", header.join(","))));
    }
    for (line, record) in records.iter().enumerate() {
        if record.len() != header.len() {
            return Err(table_error(
                origin,
                format!("row {} has {} fields, expected {}", line + 2, record.len(), header.len()),
            ));
        }
    }
    Ok((header, records))
}

fn parse_number<T: std::str::FromStr>(origin: &str, line: usize, field: &str) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| table_error(origin, format!("row {line}: '{field}' is not a number")))
}

/// Format cut coordinates as `x;y;z`
pub fn format_cut_coords(coords: [f64; 3]) -> String {
    coords
        .iter()
        .map(|c| format!("{c:.2}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Parse `x;y;z` cut coordinates
pub fn parse_cut_coords(text: &str) -> Option<[f64; 3]> {
    let values: Vec<f64> = text
        .split(';')
        .map(|v| v.trim().parse().ok())
        .collect::<Option<_>>()?;
    values.try_into().ok()
}

/// Best label of one component in every reference atlas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRow {
    /// 0-based component index
    pub component: usize,
    /// One label per atlas, in table column order
    pub labels: Vec<String>,
    /// World coordinates used to centre views
    pub cut_coords: [f64; 3],
}

/// Region labeling output for one dimension
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabelsTable {
    /// Atlas of each label column
    pub atlases: Vec<ReferenceAtlas>,
    /// One row per component
    pub rows: Vec<LabelRow>,
}

impl LabelsTable {
    /// Label of `component` in `atlas`
    pub fn label(&self, component: usize, atlas: ReferenceAtlas) -> Option<&str> {
        let column = self.atlases.iter().position(|a| *a == atlas)?;
        self.rows
            .iter()
            .find(|row| row.component == component)
            .and_then(|row| row.labels.get(column))
            .map(String::as_str)
    }

    /// Write as delimited text
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        let mut header = vec!["component".to_string()];
        header.extend(self.atlases.iter().map(|a| a.name().to_string()));
        header.push("cut_coords".to_string());
        writeln!(out, "{}", format_record(&header, DELIMITER))?;

        for row in &self.rows {
            let mut fields = vec![row.component.to_string()];
            fields.extend(row.labels.iter().cloned());
            fields.push(format_cut_coords(row.cut_coords));
            writeln!(out, "{}", format_record(&fields, DELIMITER))?;
        }
        Ok(())
    }

    /// Write to `path`, creating parent directories
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer).map_err(EngineError::io(path))?;
        write_file(path, &buffer)
    }

    /// Read a table written by [`LabelsTable::write`]
    pub fn read(path: &Path) -> Result<Self> {
        Self::parse(&read_file(path)?, &path.display().to_string())
    }

    /// Parse table text
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let (header, records) = split_header(text, origin, |h| {
            h.len() >= 2 && h[0] == "component" && h[h.len() - 1] == "cut_coords"
        })?;

        let atlases = ReferenceAtlas::parse_list(&header[1..header.len() - 1])?;
        let mut rows = Vec::with_capacity(records.len());
        for (line, record) in records.into_iter().enumerate() {
            let line = line + 2;
            let last = record.len() - 1;
            let cut_coords = parse_cut_coords(&record[last]).ok_or_else(|| {
                table_error(origin, format!("row {line}: bad cut coordinates '{}'", record[last]))
            })?;
            rows.push(LabelRow {
                component: parse_number(origin, line, &record[0])?,
                labels: record[1..last].to_vec(),
                cut_coords,
            });
        }
        Ok(Self { atlases, rows })
    }
}

/// One related component found in another (or the same) dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedRow {
    /// Dimension of the query component
    pub dimension: u32,
    /// 1-based query component
    pub component: usize,
    /// 1-based related component
    pub identified: usize,
    /// Dimension of the related component
    pub overlap_against: u32,
    /// Name of the related component
    pub label: String,
}

/// Cross-dimension relations for one dimension
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelatedTable {
    /// Rows in query order, then target dimension, then rank
    pub rows: Vec<RelatedRow>,
}

const RELATED_HEADER: [&str; 5] = ["dimension", "component", "identified", "overlap_against", "label"];

impl RelatedTable {
    /// Rows of 1-based `component`
    pub fn for_component(&self, component: usize) -> impl Iterator<Item = &RelatedRow> {
        self.rows.iter().filter(move |row| row.component == component)
    }

    /// Write as delimited text
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{}", format_record(&RELATED_HEADER, DELIMITER))?;
        for row in &self.rows {
            let fields = [
                row.dimension.to_string(),
                row.component.to_string(),
                row.identified.to_string(),
                row.overlap_against.to_string(),
                row.label.clone(),
            ];
            writeln!(out, "{}", format_record(&fields, DELIMITER))?;
        }
        Ok(())
    }

    /// Write to `path`, creating parent directories
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer).map_err(EngineError::io(path))?;
        write_file(path, &buffer)
    }

    /// Read a table written by [`RelatedTable::write`]
    pub fn read(path: &Path) -> Result<Self> {
        Self::parse(&read_file(path)?, &path.display().to_string())
    }

    /// Parse table text
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let (_, records) = split_header(text, origin, |h| {
            h.iter().map(String::as_str).eq(RELATED_HEADER)
        })?;
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(line, record)| -> Result<RelatedRow> {
                let line = line + 2;
                Ok(RelatedRow {
                    dimension: parse_number(origin, line, &record[0])?,
                    component: parse_number(origin, line, &record[1])?,
                    identified: parse_number(origin, line, &record[2])?,
                    overlap_against: parse_number(origin, line, &record[3])?,
                    label: record[4].clone(),
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { rows })
    }
}

/// Tissue composition of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TissueRow {
    /// 1-based component
    pub component: usize,
    /// Component name
    pub name: String,
    /// Grey matter overlap
    pub gm: f64,
    /// White matter overlap
    pub wm: f64,
    /// Cerebrospinal fluid overlap
    pub csf: f64,
}

/// Tissue composition for one dimension
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TissueTable {
    /// One row per component
    pub rows: Vec<TissueRow>,
}

impl TissueTable {
    /// Write as delimited text
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{}", format_record(&["component", "name", "GM", "WM", "CSF"], DELIMITER))?;
        for row in &self.rows {
            let fields = [
                row.component.to_string(),
                row.name.clone(),
                row.gm.to_string(),
                row.wm.to_string(),
                row.csf.to_string(),
            ];
            writeln!(out, "{}", format_record(&fields, DELIMITER))?;
        }
        Ok(())
    }

    /// Write to `path`, creating parent directories
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer).map_err(EngineError::io(path))?;
        write_file(path, &buffer)
    }
}
