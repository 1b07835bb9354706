//! Canonical writer: [`Graph`] to text.
//!
//! Output is fully determined by graph content. Objects are grouped into
//! one section per kind (kinds in ASCII order), listed by identifier text
//! within a section, and every dictionary lists `isa` first followed by
//! the remaining keys in byte order. `PBXBuildFile` and
//! `PBXFileReference` objects are written on a single line.

use std::fmt::Write as _;

use tracing::debug;
use xcproj_core::{Graph, GraphError, Identifier, Kind, Node, Value};

use crate::error::Result;
use crate::quote::quote;

const OBJECT_INDENT: usize = 2;

struct Writer<'g> {
    graph: &'g Graph,
    out: String,
}

/// Serialize `graph` in canonical form.
pub fn serialize(graph: &Graph) -> Result<String> {
    let root = graph
        .root()
        .ok_or_else(|| GraphError::NotFound("rootObject".into()))?
        .clone();

    let mut w = Writer {
        graph,
        out: String::with_capacity(graph.node_count() * 160),
    };
    w.out.push_str(&graph.archive().header);
    w.out.push_str("\n{\n");

    let archive = &graph.archive().entries;
    let mut keys: Vec<&str> = archive.keys().map(String::as_str).collect();
    keys.extend(["objects", "rootObject"]);
    keys.sort_unstable();
    keys.dedup();

    for key in keys {
        match key {
            "objects" => w.objects(),
            "rootObject" => {
                w.out.push_str("\trootObject = ");
                w.reference(&Value::Ref(root.clone()));
                w.out.push_str(";\n");
            }
            _ => {
                if let Some(value) = archive.get(key) {
                    w.field(1, key, value);
                }
            }
        }
    }
    w.out.push_str("}\n");

    debug!(bytes = w.out.len(), "serialized project document");
    Ok(w.out)
}

fn tabs(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

impl Writer<'_> {
    fn objects(&mut self) {
        self.out.push_str("\tobjects = {\n");
        let mut current: Option<Kind> = None;
        for node in self.graph.nodes() {
            if current != Some(node.kind) {
                if let Some(kind) = current {
                    let _ = writeln!(self.out, "/* End {kind} section */");
                }
                let _ = writeln!(self.out, "\n/* Begin {} section */", node.kind);
                current = Some(node.kind);
            }
            self.object(node);
        }
        if let Some(kind) = current {
            let _ = writeln!(self.out, "/* End {kind} section */");
        }
        self.out.push_str("\t};\n");
    }

    fn object(&mut self, node: &Node) {
        tabs(&mut self.out, OBJECT_INDENT);
        self.identifier(node);
        if node.kind.is_inline() {
            let _ = write!(self.out, " = {{isa = {}; ", node.kind);
            for (key, value) in &node.fields {
                self.out.push_str(&quote(key));
                self.out.push_str(" = ");
                self.inline_value(value);
                self.out.push_str("; ");
            }
            self.out.push_str("};\n");
        } else {
            self.out.push_str(" = {\n");
            tabs(&mut self.out, OBJECT_INDENT + 1);
            let _ = writeln!(self.out, "isa = {};", node.kind);
            for (key, value) in &node.fields {
                self.field(OBJECT_INDENT + 1, key, value);
            }
            tabs(&mut self.out, OBJECT_INDENT);
            self.out.push_str("};\n");
        }
    }

    fn identifier(&mut self, node: &Node) {
        self.out.push_str(node.id.as_str());
        self.comment(&node.id);
    }

    /// `key = value;` on its own line at `depth`.
    fn field(&mut self, depth: usize, key: &str, value: &Value) {
        tabs(&mut self.out, depth);
        self.out.push_str(&quote(key));
        self.out.push_str(" = ");
        self.value(depth, value);
        self.out.push_str(";\n");
    }

    /// A value whose opening token sits on a line indented `depth` tabs.
    fn value(&mut self, depth: usize, value: &Value) {
        match value {
            Value::Dict(dict) => {
                self.out.push_str("{\n");
                for (key, item) in dict {
                    self.field(depth + 1, key, item);
                }
                tabs(&mut self.out, depth);
                self.out.push('}');
            }
            Value::Array(items) => {
                self.out.push_str("(\n");
                for item in items {
                    tabs(&mut self.out, depth + 1);
                    self.value(depth + 1, item);
                    self.out.push_str(",\n");
                }
                tabs(&mut self.out, depth);
                self.out.push(')');
            }
            scalar => self.scalar(scalar),
        }
    }

    fn inline_value(&mut self, value: &Value) {
        match value {
            Value::Dict(dict) => {
                self.out.push('{');
                for (key, item) in dict {
                    self.out.push_str(&quote(key));
                    self.out.push_str(" = ");
                    self.inline_value(item);
                    self.out.push_str("; ");
                }
                self.out.push('}');
            }
            Value::Array(items) => {
                self.out.push('(');
                for item in items {
                    self.inline_value(item);
                    self.out.push_str(", ");
                }
                self.out.push(')');
            }
            scalar => self.scalar(scalar),
        }
    }

    fn scalar(&mut self, value: &Value) {
        match value {
            Value::String(s) => self.out.push_str(&quote(s)),
            Value::Integer(i) => {
                let _ = write!(self.out, "{i}");
            }
            Value::Bool(b) => self.out.push_str(if *b { "YES" } else { "NO" }),
            Value::Ref(_) => self.reference(value),
            Value::Array(_) | Value::Dict(_) => {}
        }
    }

    fn comment(&mut self, id: &Identifier) {
        if let Some(text) = self.graph.display_comment(id) {
            // A name containing the terminator would end the comment early.
            let _ = write!(self.out, " /* {} */", text.replace("*/", "* /"));
        }
    }

    fn reference(&mut self, value: &Value) {
        if let Value::Ref(id) = value {
            self.out.push_str(id.as_str());
            self.comment(id);
        }
    }
}
