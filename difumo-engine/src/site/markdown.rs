//! Markdown pages

use super::ComponentPage;
use crate::registry::{AtlasRegistry, RegistryError};
use std::fmt::Write;

/// Escape text placed inside a table cell
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Landing page listing every dimension
pub fn index_page(registry: &AtlasRegistry) -> Result<String, RegistryError> {
    let mut out = String::from("# Dictionaries of multiple dimensions\n");
    for dimension in registry.dimensions() {
        let _ = write!(
            out,
            "\n[![{dimension} dimensions](imgs/front/{dimension}.jpg \"{dimension} dimensions\")]({base}/{dimension})\n\
             \nSee regions for: [{dimension} dimensions]({dimension} \"Labels for {dimension} dimensions\") \
             &nbsp;&nbsp;&nbsp;&nbsp;&nbsp;[Download]({download})\n",
            base = registry.base_url(),
            download = registry.index_download_url(dimension)?,
        );
    }
    Ok(out)
}

/// Page showing all components of one dimension
pub fn dimension_page(
    registry: &AtlasRegistry,
    dimension: u32,
    names: &[String],
) -> Result<String, RegistryError> {
    let mut out = String::new();
    let _ = writeln!(out, "| All {dimension} components |");
    out.push_str("|:---:|\n");
    let _ = writeln!(
        out,
        "| [![All components](imgs/display_maps/{dimension}.jpg \"All {dimension} components\")]({}) |",
        registry.display_map_url(dimension)?
    );

    for (offset, name) in names.iter().enumerate() {
        let index = offset + 1;
        let title = cell(&format!("Component {index}: {name}"));
        let _ = write!(
            out,
            "\n| {title} |\n|:---:|\n| [![{title}]({dimension}/final/{offset}.jpg \"{title}\")]({dimension}/html/{index}.html) |\n"
        );
    }
    Ok(out)
}

/// Page listing the structures related to one component
pub fn related_page(page: &ComponentPage, base_url: &str) -> String {
    let title = page.related_title();
    let mut out = String::new();
    let _ = writeln!(out, "## {title}\n");
    let _ = writeln!(out, "![{}]({}.jpg \"{title}\")\n", page.index, page.index);
    let _ = writeln!(out, "[Back to component view]({})", page.html_url(base_url));

    if !page.labels.is_empty() {
        out.push_str("\n### Matching reference labels\n\n| Atlas | Label |\n|:---|:---|\n");
        for (alias, label) in &page.labels {
            let _ = writeln!(out, "| {} | {} |", cell(alias), cell(label));
        }
    }

    if !page.related.is_empty() {
        out.push_str("\n### Related DiFuMo components\n\n| Dimension | Component | Name |\n|:---:|:---:|:---|\n");
        for row in &page.related {
            let _ = writeln!(
                out,
                "| {against} | [{id}]({base_url}/{against}/html/{id}.html) | {name} |",
                against = row.overlap_against,
                id = row.identified,
                name = cell(&row.label),
            );
        }
    }
    out
}
