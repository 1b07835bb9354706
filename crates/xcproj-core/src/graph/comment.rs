//! Display comments derived from live graph state.
//!
//! The writer annotates object keys and references with `/* ... */`
//! comments. They are recomputed from the current fields every time, so a
//! renamed file shows its new name everywhere it is referenced. A node's
//! stored comment is only a fallback for objects whose name cannot be
//! derived.

use super::node::{Kind, Node};
use super::Graph;
use crate::id::Identifier;

impl Graph {
    /// The comment written after `id`, if any.
    pub fn display_comment(&self, id: &Identifier) -> Option<String> {
        let node = self.node(id)?;
        self.derived_comment(node).or_else(|| node.comment.clone())
    }

    fn derived_comment(&self, node: &Node) -> Option<String> {
        match node.kind {
            Kind::PBXBuildFile => {
                let file = node
                    .ref_field("fileRef")
                    .or_else(|| node.ref_field("productRef"))
                    .and_then(|f| self.display_comment(f))?;
                let phase = self
                    .referrers(&node.id)
                    .into_iter()
                    .filter_map(|r| self.node(&r))
                    .find(|r| r.kind.is_build_phase())
                    .and_then(|p| self.derived_comment(p))?;
                Some(format!("{file} in {phase}"))
            }
            Kind::PBXSourcesBuildPhase => Some("Sources".into()),
            Kind::PBXFrameworksBuildPhase => Some("Frameworks".into()),
            Kind::PBXResourcesBuildPhase => Some("Resources".into()),
            Kind::PBXHeadersBuildPhase => Some("Headers".into()),
            Kind::PBXRezBuildPhase => Some("Rez".into()),
            Kind::PBXCopyFilesBuildPhase => Some(name_or(node, "CopyFiles")),
            Kind::PBXShellScriptBuildPhase => Some(name_or(node, "ShellScript")),
            Kind::PBXFileReference
            | Kind::PBXGroup
            | Kind::PBXVariantGroup
            | Kind::XCVersionGroup
            | Kind::PBXReferenceProxy => node
                .str_field("name")
                .or_else(|| node.str_field("path"))
                .map(str::to_string),
            Kind::PBXNativeTarget
            | Kind::PBXAggregateTarget
            | Kind::PBXLegacyTarget
            | Kind::XCBuildConfiguration => node.str_field("name").map(str::to_string),
            Kind::PBXProject => Some("Project object".into()),
            Kind::PBXContainerItemProxy | Kind::PBXTargetDependency => {
                Some(node.kind.isa().to_string())
            }
            Kind::XCConfigurationList => self.configuration_list_comment(&node.id),
            Kind::XCRemoteSwiftPackageReference => {
                let url = node.str_field("repositoryURL")?;
                let repo = url.trim_end_matches('/').rsplit('/').next()?;
                let repo = repo.strip_suffix(".git").unwrap_or(repo);
                Some(format!("{} \"{repo}\"", node.kind.isa()))
            }
            Kind::XCSwiftPackageProductDependency => {
                node.str_field("productName").map(str::to_string)
            }
            Kind::PBXBuildRule => Some(node.kind.isa().to_string()),
        }
    }

    fn configuration_list_comment(&self, list: &Identifier) -> Option<String> {
        let owner = self
            .referrers(list)
            .into_iter()
            .filter_map(|r| self.node(&r))
            .find(|n| n.ref_field("buildConfigurationList") == Some(list))?;
        let name = match owner.kind {
            Kind::PBXProject => self.project_name()?.to_string(),
            _ => owner.str_field("name")?.to_string(),
        };
        Some(format!(
            "Build configuration list for {} \"{name}\"",
            owner.kind.isa()
        ))
    }
}

fn name_or(node: &Node, default: &str) -> String {
    node.str_field("name").unwrap_or(default).to_string()
}

/// Extract the project name from a project configuration list comment.
pub fn project_name_from_comment(comment: &str) -> Option<&str> {
    comment
        .strip_prefix("Build configuration list for PBXProject \"")?
        .strip_suffix('"')
}
