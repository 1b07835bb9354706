//! Object kinds and the Node record.
//!
//! A node is one object of the project document: its kind (the `isa`
//! tag), its fields, and an optional advisory comment.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::id::Identifier;

/// The kind of an object, named after its `isa` tag.
///
/// Variants are declared in the order the writer lists sections, so the
/// derived `Ord` is the canonical section order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    PBXAggregateTarget,
    PBXBuildFile,
    PBXBuildRule,
    PBXContainerItemProxy,
    PBXCopyFilesBuildPhase,
    PBXFileReference,
    PBXFrameworksBuildPhase,
    PBXGroup,
    PBXHeadersBuildPhase,
    PBXLegacyTarget,
    PBXNativeTarget,
    PBXProject,
    PBXReferenceProxy,
    PBXResourcesBuildPhase,
    PBXRezBuildPhase,
    PBXShellScriptBuildPhase,
    PBXSourcesBuildPhase,
    PBXTargetDependency,
    PBXVariantGroup,
    XCBuildConfiguration,
    XCConfigurationList,
    XCRemoteSwiftPackageReference,
    XCSwiftPackageProductDependency,
    XCVersionGroup,
}

impl Kind {
    /// Every kind, in canonical section order.
    pub const ALL: [Kind; 24] = [
        Kind::PBXAggregateTarget,
        Kind::PBXBuildFile,
        Kind::PBXBuildRule,
        Kind::PBXContainerItemProxy,
        Kind::PBXCopyFilesBuildPhase,
        Kind::PBXFileReference,
        Kind::PBXFrameworksBuildPhase,
        Kind::PBXGroup,
        Kind::PBXHeadersBuildPhase,
        Kind::PBXLegacyTarget,
        Kind::PBXNativeTarget,
        Kind::PBXProject,
        Kind::PBXReferenceProxy,
        Kind::PBXResourcesBuildPhase,
        Kind::PBXRezBuildPhase,
        Kind::PBXShellScriptBuildPhase,
        Kind::PBXSourcesBuildPhase,
        Kind::PBXTargetDependency,
        Kind::PBXVariantGroup,
        Kind::XCBuildConfiguration,
        Kind::XCConfigurationList,
        Kind::XCRemoteSwiftPackageReference,
        Kind::XCSwiftPackageProductDependency,
        Kind::XCVersionGroup,
    ];

    pub const BUILD_PHASES: &'static [Kind] = &[
        Kind::PBXCopyFilesBuildPhase,
        Kind::PBXFrameworksBuildPhase,
        Kind::PBXHeadersBuildPhase,
        Kind::PBXResourcesBuildPhase,
        Kind::PBXRezBuildPhase,
        Kind::PBXShellScriptBuildPhase,
        Kind::PBXSourcesBuildPhase,
    ];

    pub const TARGETS: &'static [Kind] = &[
        Kind::PBXAggregateTarget,
        Kind::PBXLegacyTarget,
        Kind::PBXNativeTarget,
    ];

    /// Kinds that may appear as a child of a group.
    pub const GROUP_MEMBERS: &'static [Kind] = &[
        Kind::PBXFileReference,
        Kind::PBXGroup,
        Kind::PBXReferenceProxy,
        Kind::PBXVariantGroup,
        Kind::XCVersionGroup,
    ];

    /// The `isa` tag.
    pub fn isa(self) -> &'static str {
        match self {
            Kind::PBXAggregateTarget => "PBXAggregateTarget",
            Kind::PBXBuildFile => "PBXBuildFile",
            Kind::PBXBuildRule => "PBXBuildRule",
            Kind::PBXContainerItemProxy => "PBXContainerItemProxy",
            Kind::PBXCopyFilesBuildPhase => "PBXCopyFilesBuildPhase",
            Kind::PBXFileReference => "PBXFileReference",
            Kind::PBXFrameworksBuildPhase => "PBXFrameworksBuildPhase",
            Kind::PBXGroup => "PBXGroup",
            Kind::PBXHeadersBuildPhase => "PBXHeadersBuildPhase",
            Kind::PBXLegacyTarget => "PBXLegacyTarget",
            Kind::PBXNativeTarget => "PBXNativeTarget",
            Kind::PBXProject => "PBXProject",
            Kind::PBXReferenceProxy => "PBXReferenceProxy",
            Kind::PBXResourcesBuildPhase => "PBXResourcesBuildPhase",
            Kind::PBXRezBuildPhase => "PBXRezBuildPhase",
            Kind::PBXShellScriptBuildPhase => "PBXShellScriptBuildPhase",
            Kind::PBXSourcesBuildPhase => "PBXSourcesBuildPhase",
            Kind::PBXTargetDependency => "PBXTargetDependency",
            Kind::PBXVariantGroup => "PBXVariantGroup",
            Kind::XCBuildConfiguration => "XCBuildConfiguration",
            Kind::XCConfigurationList => "XCConfigurationList",
            Kind::XCRemoteSwiftPackageReference => "XCRemoteSwiftPackageReference",
            Kind::XCSwiftPackageProductDependency => "XCSwiftPackageProductDependency",
            Kind::XCVersionGroup => "XCVersionGroup",
        }
    }

    pub fn from_isa(isa: &str) -> Option<Kind> {
        Kind::ALL.iter().copied().find(|k| k.isa() == isa)
    }

    pub fn is_build_phase(self) -> bool {
        Self::BUILD_PHASES.contains(&self)
    }

    pub fn is_target(self) -> bool {
        Self::TARGETS.contains(&self)
    }

    pub fn is_group_like(self) -> bool {
        matches!(
            self,
            Kind::PBXGroup | Kind::PBXVariantGroup | Kind::XCVersionGroup
        )
    }

    /// Kinds the writer emits on a single line.
    pub fn is_inline(self) -> bool {
        matches!(self, Kind::PBXBuildFile | Kind::PBXFileReference)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.isa())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::from_isa(s).ok_or_else(|| s.to_string())
    }
}

/// Field name to value. Keys iterate in byte order, which is the order
/// the writer emits them in.
pub type Fields = BTreeMap<String, Value>;

/// One object of the project graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Identifier,
    pub kind: Kind,
    pub fields: Fields,
    /// Advisory display comment. Only consulted by the writer when no
    /// comment can be derived from live state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Node {
    pub fn new(id: Identifier, kind: Kind, fields: Fields) -> Self {
        Self {
            id,
            kind,
            fields,
            comment: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A string field's text.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// A reference field's target.
    pub fn ref_field(&self, name: &str) -> Option<&Identifier> {
        self.fields.get(name).and_then(Value::as_ref_id)
    }

    /// The identifiers held in a reference-list field (empty if absent).
    pub fn ref_list(&self, name: &str) -> Vec<&Identifier> {
        match self.fields.get(name) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_ref_id).collect(),
            _ => Vec::new(),
        }
    }

    /// Fields equal, ignoring the comment.
    pub fn same_content(&self, other: &Node) -> bool {
        self.id == other.id && self.kind == other.kind && self.fields == other.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_order_matches_isa_order() {
        let mut names: Vec<&str> = Kind::ALL.iter().map(|k| k.isa()).collect();
        let declared = names.clone();
        names.sort();
        assert_eq!(names, declared);

        let mut kinds = Kind::ALL.to_vec();
        kinds.sort();
        assert_eq!(kinds, Kind::ALL.to_vec());
    }

    #[test]
    fn isa_round_trips() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_isa(kind.isa()), Some(kind));
            assert_eq!(kind.to_string(), kind.isa());
        }
        assert_eq!(Kind::from_isa("PBXUnheardOf"), None);
    }

    #[test]
    fn kind_predicates() {
        assert!(Kind::PBXSourcesBuildPhase.is_build_phase());
        assert!(!Kind::PBXBuildFile.is_build_phase());
        assert!(Kind::PBXNativeTarget.is_target());
        assert!(Kind::PBXVariantGroup.is_group_like());
        assert!(Kind::PBXFileReference.is_inline());
        assert!(!Kind::PBXGroup.is_inline());
    }

    #[test]
    fn same_content_ignores_comment() {
        let id = Identifier::from_u128(7);
        let mut a = Node::new(id.clone(), Kind::PBXGroup, Fields::new());
        let b = Node::new(id, Kind::PBXGroup, Fields::new());
        a.comment = Some("Classes".into());
        assert!(a.same_content(&b));
        assert_ne!(a, b);
    }
}
