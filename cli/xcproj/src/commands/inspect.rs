//! `xcproj inspect`: list the objects of a project document.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Serialize;
use xcproj_core::{Fields, Graph, Identifier, Kind};

use super::load_graph;

#[derive(Serialize)]
struct Entry<'a> {
    id: &'a Identifier,
    kind: Kind,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    fields: &'a Fields,
}

pub fn run(path: &Path, kind: Option<&str>, json: bool) -> Result<()> {
    let kind = kind
        .map(|isa| isa.parse::<Kind>().map_err(|isa| anyhow!("unknown object kind: {isa}")))
        .transpose()?;
    let (_, graph) = load_graph(path)?;
    let entries = entries(&graph, kind);
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", listing(&entries));
    }
    Ok(())
}

fn entries(graph: &Graph, kind: Option<Kind>) -> Vec<Entry<'_>> {
    graph
        .nodes()
        .filter(|n| kind.map_or(true, |k| n.kind == k))
        .map(|n| Entry {
            id: &n.id,
            kind: n.kind,
            comment: graph.display_comment(&n.id),
            fields: &n.fields,
        })
        .collect()
}

fn listing(entries: &[Entry<'_>]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = write!(out, "{} {}", entry.id, entry.kind);
        if let Some(comment) = &entry.comment {
            let _ = write!(out, " /* {comment} */");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BASE;

    #[test]
    fn filter_by_kind() {
        let graph = xcproj_text::parse(BASE).unwrap();
        let targets = entries(&graph, Some(Kind::PBXNativeTarget));
        assert_eq!(targets.len(), 1);
        assert_eq!(
            listing(&targets),
            "1D6058900D05DD3D006BFB54 PBXNativeTarget /* Unity-iPhone */\n"
        );
        assert_eq!(entries(&graph, None).len(), graph.node_count());
    }

    #[test]
    fn json_carries_fields() {
        let graph = xcproj_text::parse(BASE).unwrap();
        let targets = entries(&graph, Some(Kind::PBXNativeTarget));
        let json: serde_json::Value = serde_json::to_value(&targets).unwrap();
        assert_eq!(json[0]["id"], "1D6058900D05DD3D006BFB54");
        assert_eq!(json[0]["kind"], "PBXNativeTarget");
        assert_eq!(json[0]["comment"], "Unity-iPhone");
        assert_eq!(json[0]["fields"]["buildPhases"]["type"], "array");
    }

    #[test]
    fn unknown_kind_is_rejected_before_reading() {
        let err = run(Path::new("/nonexistent/project.pbxproj"), Some("PBXNope"), false)
            .unwrap_err();
        assert!(err.to_string().contains("PBXNope"));
    }
}
