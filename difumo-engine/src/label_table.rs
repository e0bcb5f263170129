//! Label tables
//!
//! Readers for the name lists that accompany atlases: DiFuMo dictionary CSVs,
//! FSL atlas XML files, MIST parcel CSVs, plain text lists, and the built-in
//! Yeo network tables. Reference tables are indexed by label value, so
//! entry 0 names the background.

use crate::delimited::parse_records;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Column holding component names in newer DiFuMo CSVs
pub const DIFUMO_NAME_COLUMN: &str = "Difumo_names";

/// Name given to label value 0
pub const BACKGROUND: &str = "Background";

const YEO7_NAMES: [&str; 8] = [
    "Background",
    "VisCent",
    "SomMotA",
    "DorsAttnB",
    "SalVentAttnA",
    "LimbicA",
    "ContA",
    "DefaultB",
];

const YEO17_NAMES: [&str; 18] = [
    "Background",
    "VisCent",
    "VisPeri",
    "SomMotA",
    "SomMotB",
    "DorsAttnA",
    "DorsAttnB",
    "SalVentAttnA",
    "SalVentAttnB",
    "LimbicA",
    "LimbicB",
    "ContC",
    "ContA",
    "ContB",
    "TempPar",
    "DefaultC",
    "DefaultA",
    "DefaultB",
];

/// Errors raised while reading label tables
#[derive(Error, Debug)]
pub enum LabelTableError {
    /// The file could not be read
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The content does not follow the expected layout
    #[error("malformed label table {origin}: {reason}")]
    Malformed {
        /// File or description of the input
        origin: String,
        /// What went wrong
        reason: String,
    },

    /// A required column is absent
    #[error("label table {origin} has no '{column}' column")]
    MissingColumn {
        /// File or description of the input
        origin: String,
        /// Column looked for
        column: String,
    },

    /// The format needs a file but none was configured
    #[error("label format '{0}' needs a labels file")]
    MissingPath(LabelFormat),

    /// Unknown format name
    #[error("unknown label format '{name}'; valid formats: {valid}")]
    UnknownFormat {
        /// Name given
        name: String,
        /// Accepted names
        valid: String,
    },
}

/// Result type for label table operations
pub type Result<T> = std::result::Result<T, LabelTableError>;

/// Layout of a reference atlas label source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelFormat {
    /// FSL atlas XML (`<label index="N">Name</label>`)
    FslXml,
    /// MIST `;`-separated parcel information with a `name` column
    MistCsv,
    /// One name per line, line 0 is the background
    Text,
    /// Built-in Yeo 7-network names
    Yeo7,
    /// Built-in Yeo 17-network names
    Yeo17,
}

impl LabelFormat {
    /// All formats
    pub const ALL: [LabelFormat; 5] = [
        LabelFormat::FslXml,
        LabelFormat::MistCsv,
        LabelFormat::Text,
        LabelFormat::Yeo7,
        LabelFormat::Yeo17,
    ];

    /// Configuration name
    pub fn name(&self) -> &'static str {
        match self {
            LabelFormat::FslXml => "fsl_xml",
            LabelFormat::MistCsv => "mist_csv",
            LabelFormat::Text => "text",
            LabelFormat::Yeo7 => "yeo7",
            LabelFormat::Yeo17 => "yeo17",
        }
    }

    /// Whether names come from a file
    pub fn needs_file(&self) -> bool {
        !matches!(self, LabelFormat::Yeo7 | LabelFormat::Yeo17)
    }
}

impl fmt::Display for LabelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LabelFormat {
    type Err = LabelTableError;

    fn from_str(s: &str) -> Result<Self> {
        LabelFormat::ALL
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or_else(|| LabelTableError::UnknownFormat {
                name: s.to_string(),
                valid: LabelFormat::ALL.map(|f| f.name()).join(", "),
            })
    }
}

/// Component names and optional annotations from a DiFuMo labels CSV
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DifumoLabels {
    names: Vec<String>,
    columns: Vec<(String, Vec<String>)>,
}

impl DifumoLabels {
    /// Labels with names only
    pub fn from_names(names: Vec<String>) -> Self {
        Self {
            names,
            columns: Vec::new(),
        }
    }

    /// Name of each component, in component order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of 0-based component `index`
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Extra column by header (e.g. `Yeo_networks7`, `GM`)
    pub fn column(&self, header: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|(name, _)| name == header)
            .map(|(_, values)| values.as_slice())
    }

    /// Headers of the extra columns
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| LabelTableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Largest `<label index>` accepted; label images store 16-bit values
const MAX_FSL_INDEX: usize = u16::MAX as usize - 1;

fn malformed(origin: &str, reason: impl Into<String>) -> LabelTableError {
    LabelTableError::Malformed {
        origin: origin.to_string(),
        reason: reason.into(),
    }
}

/// Read a DiFuMo labels CSV
pub fn read_difumo_labels(path: &Path) -> Result<DifumoLabels> {
    parse_difumo_labels(&read_text(path)?, &path.display().to_string())
}

/// Parse DiFuMo labels CSV content
///
/// Newer archives carry a header with a `Difumo_names` column; older ones
/// are a header-less single column of names.
pub fn parse_difumo_labels(text: &str, origin: &str) -> Result<DifumoLabels> {
    let records = parse_records(text, ',').map_err(|reason| malformed(origin, reason))?;
    let Some(first) = records.first() else {
        return Ok(DifumoLabels::default());
    };

    let Some(name_column) = first.iter().position(|h| h.trim() == DIFUMO_NAME_COLUMN) else {
        let names = records
            .iter()
            .map(|record| record[0].trim().to_string())
            .collect();
        return Ok(DifumoLabels::from_names(names));
    };

    let headers: Vec<String> = first.iter().map(|h| h.trim().to_string()).collect();
    let rows = &records[1..];
    for (line, record) in rows.iter().enumerate() {
        if record.len() != headers.len() {
            return Err(malformed(
                origin,
                format!(
                    "row {} has {} fields, header has {}",
                    line + 2,
                    record.len(),
                    headers.len()
                ),
            ));
        }
    }

    let column_values =
        |index: usize| -> Vec<String> { rows.iter().map(|r| r[index].trim().to_string()).collect() };

    let columns = headers
        .iter()
        .enumerate()
        .filter(|&(index, _)| index != name_column)
        .map(|(index, header)| (header.clone(), column_values(index)))
        .collect();

    Ok(DifumoLabels {
        names: column_values(name_column),
        columns,
    })
}

fn fsl_label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)<label\b([^>]*)>(.*?)</label>"#).expect("label pattern is valid")
    })
}

fn fsl_index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\bindex\s*=\s*["'](-?\d+)["']"#).expect("index pattern is valid")
    })
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Parse an FSL atlas XML label file
///
/// Label `index="N"` lands at position `N + 1`, after the background.
/// Indices missing from the file are named `label N`.
pub fn parse_fsl_xml(text: &str, origin: &str) -> Result<Vec<String>> {
    let mut entries: Vec<(usize, String)> = Vec::new();
    for capture in fsl_label_pattern().captures_iter(text) {
        let attributes = &capture[1];
        let index = fsl_index_pattern()
            .captures(attributes)
            .and_then(|c| c[1].parse::<usize>().ok())
            .ok_or_else(|| malformed(origin, format!("label without index: {}", &capture[0])))?;
        if index > MAX_FSL_INDEX {
            return Err(malformed(
                origin,
                format!("label index {index} exceeds {MAX_FSL_INDEX}"),
            ));
        }
        entries.push((index + 1, unescape_xml(capture[2].trim())));
    }

    if entries.is_empty() {
        return Err(malformed(origin, "no <label> elements"));
    }

    let size = entries.iter().map(|(value, _)| value + 1).max().unwrap_or(1);
    let mut names: Vec<String> = (0..size).map(|value| format!("label {value}")).collect();
    names[0] = BACKGROUND.to_string();
    for (value, name) in entries {
        names[value] = name;
    }
    Ok(names)
}

/// Parse a MIST parcel CSV (`;`-separated, `name` column)
pub fn parse_mist_csv(text: &str, origin: &str) -> Result<Vec<String>> {
    let records = parse_records(text, ';').map_err(|reason| malformed(origin, reason))?;
    let header = records
        .first()
        .ok_or_else(|| malformed(origin, "empty file"))?;
    let column = header
        .iter()
        .position(|h| h.trim() == "name")
        .ok_or_else(|| LabelTableError::MissingColumn {
            origin: origin.to_string(),
            column: "name".to_string(),
        })?;

    let mut names = vec![BACKGROUND.to_string()];
    for (line, record) in records[1..].iter().enumerate() {
        let name = record
            .get(column)
            .ok_or_else(|| malformed(origin, format!("row {} has no name field", line + 2)))?;
        names.push(name.trim().to_string());
    }
    Ok(names)
}

/// Parse one name per line, keeping order
pub fn parse_text(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Built-in Yeo 7-network names
pub fn yeo7_names() -> Vec<String> {
    YEO7_NAMES.iter().map(|s| s.to_string()).collect()
}

/// Built-in Yeo 17-network names
pub fn yeo17_names() -> Vec<String> {
    YEO17_NAMES.iter().map(|s| s.to_string()).collect()
}

/// Load a reference label table in `format`
pub fn load_label_names(format: LabelFormat, path: Option<&Path>) -> Result<Vec<String>> {
    match (format, path) {
        (LabelFormat::Yeo7, _) => Ok(yeo7_names()),
        (LabelFormat::Yeo17, _) => Ok(yeo17_names()),
        (_, None) => Err(LabelTableError::MissingPath(format)),
        (LabelFormat::FslXml, Some(path)) => {
            parse_fsl_xml(&read_text(path)?, &path.display().to_string())
        }
        (LabelFormat::MistCsv, Some(path)) => {
            parse_mist_csv(&read_text(path)?, &path.display().to_string())
        }
        (LabelFormat::Text, Some(path)) => Ok(parse_text(&read_text(path)?)),
    }
}
