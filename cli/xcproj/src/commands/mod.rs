//! CLI command implementations.

pub mod apply;
pub mod check;
pub mod fmt;
pub mod inspect;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use xcproj_core::Graph;

/// Read and parse the project document at `path`.
pub(crate) fn load_graph(path: &Path) -> Result<(String, Graph)> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let graph = xcproj_text::parse(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok((text, graph))
}
