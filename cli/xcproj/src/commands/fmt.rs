//! `xcproj fmt`: rewrite a project document in canonical form.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::load_graph;

pub fn run(path: &Path, check: bool) -> Result<()> {
    let (text, graph) = load_graph(path)?;
    let canonical = xcproj_text::serialize(&graph)?;

    match first_difference(&text, &canonical) {
        None => {
            println!("{}: already canonical", path.display());
            Ok(())
        }
        Some(line) if check => {
            bail!("{} is not canonical (first difference at line {line})", path.display())
        }
        Some(_) => {
            fs::write(path, canonical).with_context(|| format!("writing {}", path.display()))?;
            println!("{}: formatted", path.display());
            Ok(())
        }
    }
}

/// 1-based line of the first difference between two texts.
fn first_difference(a: &str, b: &str) -> Option<usize> {
    if a == b {
        return None;
    }
    let mut left = a.split_inclusive('\n');
    let mut right = b.split_inclusive('\n');
    let mut line = 1;
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) if x == y => line += 1,
            _ => return Some(line),
        }
    }
}
