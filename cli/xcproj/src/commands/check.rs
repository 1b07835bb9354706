//! `xcproj check`: parse and validate a project document.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use xcproj_core::{fingerprint, hash_hex, Graph, GraphError, Kind};
use xcproj_text::TextError;

pub fn run(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let graph = match xcproj_text::parse(&text) {
        Ok(graph) => graph,
        Err(TextError::Graph(err)) => return report(path, err.into_problems()),
        Err(err) => return Err(err).with_context(|| format!("parsing {}", path.display())),
    };
    if let Err(problems) = graph.validate() {
        return report(path, problems);
    }
    print!("{}", summary(&graph));
    Ok(())
}

fn report(path: &Path, problems: Vec<GraphError>) -> Result<()> {
    for problem in &problems {
        eprintln!("  {problem}");
    }
    bail!("{}: {} problem(s)", path.display(), problems.len());
}

fn summary(graph: &Graph) -> String {
    let mut counts: BTreeMap<Kind, usize> = BTreeMap::new();
    for node in graph.nodes() {
        *counts.entry(node.kind).or_default() += 1;
    }

    let mut out = String::new();
    let _ = writeln!(out, "Project:     {}", graph.project_name().unwrap_or("<unnamed>"));
    if let Some(root) = graph.root() {
        let _ = writeln!(out, "Root:        {root}");
    }
    let _ = writeln!(out, "Objects:     {}", graph.node_count());
    for (kind, count) in &counts {
        let _ = writeln!(out, "  {:<32} {count}", kind.isa());
    }
    let _ = writeln!(out, "Fingerprint: {}", hash_hex(&fingerprint(graph)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BASE;

    #[test]
    fn summary_counts_kinds() {
        let graph = xcproj_text::parse(BASE).unwrap();
        let text = summary(&graph);
        assert!(text.starts_with("Project:     Unity-iPhone\n"));
        assert!(text.contains("Root:        29B97313FDCFA39411CA2CEA\n"));
        assert!(text.contains(&format!("Objects:     {}\n", graph.node_count())));
        assert!(text.contains("  PBXBuildFile                     2\n"));
        assert!(text.contains("  PBXNativeTarget                  1\n"));
        assert!(text.contains(&hash_hex(&fingerprint(&graph))));
    }

    #[test]
    fn run_accepts_a_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.pbxproj");
        std::fs::write(&path, BASE).unwrap();
        run(&path).unwrap();
    }

    #[test]
    fn every_problem_is_counted() {
        let broken = BASE
            .replace(
                "isa = PBXBuildFile; fileRef = 29B97316FDCFA39411CA2CEA /* main.mm */; ",
                "isa = PBXBuildFile; ",
            )
            .replace(
                "isa = PBXBuildFile; fileRef = 1D30AB110D05D00D00671497 /* Foundation.framework */; ",
                "isa = PBXBuildFile; ",
            );
        assert_ne!(broken, BASE);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.pbxproj");
        std::fs::write(&path, broken).unwrap();

        let err = run(&path).unwrap_err();
        assert!(err.to_string().ends_with(": 2 problem(s)"), "{err}");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.pbxproj");
        std::fs::write(&path, "// !$*UTF8*$!\n{ objects = {").unwrap();
        let err = run(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&dir.path().join("absent.pbxproj")).unwrap_err();
        assert!(format!("{err:#}").contains("reading"));
    }
}
