//! Text codec for Xcode project documents (`project.pbxproj`).
//!
//! [`parse`] turns text into a validated [`Graph`]; [`serialize`] writes a
//! graph back in canonical form. A document that is already canonical
//! comes back byte for byte.

mod error;
mod lexer;
mod parser;
pub mod quote;
mod writer;

use std::fs;
use std::path::Path;

use tracing::info;
use xcproj_core::{Graph, IdGenerator};

pub use error::{Result, TextError};
pub use parser::{parse, parse_with};
pub use writer::serialize;

/// Read and parse the project document at `path`.
pub fn read_project(path: impl AsRef<Path>) -> Result<Graph> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let graph = parse(&text)?;
    info!(path = %path.display(), nodes = graph.node_count(), "loaded project");
    Ok(graph)
}

/// Like [`read_project`], with an injected identifier source.
pub fn read_project_with(path: impl AsRef<Path>, generator: Box<dyn IdGenerator>) -> Result<Graph> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let graph = parse_with(&text, generator)?;
    info!(path = %path.display(), nodes = graph.node_count(), "loaded project");
    Ok(graph)
}

/// Serialize `graph` and write it to `path`.
pub fn write_project(graph: &Graph, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = serialize(graph)?;
    fs::write(path, text)?;
    info!(path = %path.display(), "wrote project");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use xcproj_core::{Fields, Kind, SequentialIds, Value};

    fn project_with_name(name: &str) -> Graph {
        let mut g = Graph::with_generator(Box::new(SequentialIds::new()));
        let group = g
            .add_node(
                Kind::PBXGroup,
                Fields::from([
                    ("children".into(), Value::Array(vec![])),
                    ("name".into(), Value::string(name)),
                    ("sourceTree".into(), "<group>".into()),
                ]),
                None,
            )
            .unwrap();
        let list = g
            .add_node(
                Kind::XCConfigurationList,
                Fields::from([("buildConfigurations".into(), Value::Array(vec![]))]),
                None,
            )
            .unwrap();
        let project = g
            .add_node(
                Kind::PBXProject,
                Fields::from([
                    ("buildConfigurationList".into(), Value::Ref(list)),
                    ("mainGroup".into(), Value::Ref(group)),
                    ("targets".into(), Value::Array(vec![])),
                ]),
                None,
            )
            .unwrap();
        g.set_root(project).unwrap();
        g
    }

    #[test]
    fn write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.pbxproj");
        let g = project_with_name("Sources");
        write_project(&g, &path).unwrap();
        let back = read_project(&path).unwrap();
        assert_eq!(back.node_count(), 3);
        assert_eq!(serialize(&back).unwrap(), serialize(&g).unwrap());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_project(dir.path().join("nope.pbxproj")).unwrap_err();
        assert!(matches!(err, TextError::Io(_)));
    }

    proptest! {
        #[test]
        fn any_string_survives_the_codec(name in "\\PC{0,24}") {
            let g = project_with_name(&name);
            let text = serialize(&g).unwrap();
            let back = parse(&text).unwrap();
            let group = back.node(&back.root_node().unwrap().ref_field("mainGroup").unwrap().clone()).unwrap();
            prop_assert_eq!(group.str_field("name"), Some(name.as_str()));
            prop_assert_eq!(serialize(&back).unwrap(), text);
        }
    }
}
