//! Per-kind field schemas.
//!
//! Each kind lists the fields it understands, their value types and
//! whether they are required. Schemas are listed in the order the writer
//! emits fields (byte order, after `isa`). Fields a schema does not name
//! are accepted as [`FieldType::Any`] and preserved untouched.

use super::node::Kind;
use super::value::Value;

/// The allowed shape of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    /// A single reference to one of the listed kinds.
    Ref(&'static [Kind]),
    /// An ordered list of references to the listed kinds.
    RefList(&'static [Kind]),
    StringList,
    Dict,
    Any,
}

impl FieldType {
    /// Whether `value` has this shape. Reference resolution is checked by
    /// the graph, not here.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Any, _) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Integer, Value::Integer(_)) => true,
            (FieldType::Ref(_), Value::Ref(_)) => true,
            (FieldType::RefList(_), Value::Array(items)) => {
                items.iter().all(|v| matches!(v, Value::Ref(_)))
            }
            (FieldType::StringList, Value::Array(items)) => {
                items.iter().all(|v| matches!(v, Value::String(_)))
            }
            (FieldType::Dict, Value::Dict(_)) => true,
            _ => false,
        }
    }

    /// Kinds a reference held by this field may point at, if restricted.
    pub fn ref_kinds(self) -> Option<&'static [Kind]> {
        match self {
            FieldType::Ref(kinds) | FieldType::RefList(kinds) => Some(kinds),
            _ => None,
        }
    }

    pub fn is_list(self) -> bool {
        matches!(
            self,
            FieldType::RefList(_) | FieldType::StringList | FieldType::Any
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Ref(_) => "reference",
            FieldType::RefList(_) => "reference list",
            FieldType::StringList => "string list",
            FieldType::Dict => "dictionary",
            FieldType::Any => "any value",
        }
    }
}

/// One field of a kind's schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

const fn req(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: true,
    }
}

const fn opt(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: false,
    }
}

use FieldType::{Dict, Integer, Ref, RefList, StringList};
use FieldType::String as Str;

const FILE_LIKE: &[Kind] = Kind::GROUP_MEMBERS;
const TARGETS: &[Kind] = Kind::TARGETS;
const PHASES: &[Kind] = Kind::BUILD_PHASES;
const BUILD_FILE: &[Kind] = &[Kind::PBXBuildFile];
const CONFIG_LIST: &[Kind] = &[Kind::XCConfigurationList];
const CONFIG: &[Kind] = &[Kind::XCBuildConfiguration];
const FILE_REF: &[Kind] = &[Kind::PBXFileReference];
const GROUP: &[Kind] = &[Kind::PBXGroup];
const DEPENDENCY: &[Kind] = &[Kind::PBXTargetDependency];
const PROXY: &[Kind] = &[Kind::PBXContainerItemProxy];
const BUILD_RULE: &[Kind] = &[Kind::PBXBuildRule];
const PORTAL: &[Kind] = &[Kind::PBXProject, Kind::PBXFileReference];
const PACKAGE: &[Kind] = &[Kind::XCRemoteSwiftPackageReference];
const PRODUCT: &[Kind] = &[Kind::XCSwiftPackageProductDependency];

const AGGREGATE_TARGET: &[FieldSpec] = &[
    req("buildConfigurationList", Ref(CONFIG_LIST)),
    req("buildPhases", RefList(PHASES)),
    opt("dependencies", RefList(DEPENDENCY)),
    req("name", Str),
    opt("productName", Str),
];

const BUILD_FILE_FIELDS: &[FieldSpec] = &[
    opt("fileRef", Ref(FILE_LIKE)),
    opt("platformFilter", Str),
    opt("productRef", Ref(PRODUCT)),
    opt("settings", Dict),
];

const BUILD_RULE_FIELDS: &[FieldSpec] = &[
    opt("compilerSpec", Str),
    opt("filePatterns", Str),
    opt("fileType", Str),
    opt("inputFiles", StringList),
    opt("isEditable", Integer),
    opt("name", Str),
    opt("outputFiles", StringList),
    opt("script", Str),
];

const CONTAINER_ITEM_PROXY: &[FieldSpec] = &[
    req("containerPortal", Ref(PORTAL)),
    opt("proxyType", Integer),
    opt("remoteGlobalIDString", Str),
    opt("remoteInfo", Str),
];

const COPY_FILES_PHASE: &[FieldSpec] = &[
    opt("buildActionMask", Integer),
    opt("dstPath", Str),
    opt("dstSubfolderSpec", Integer),
    req("files", RefList(BUILD_FILE)),
    opt("name", Str),
    opt("runOnlyForDeploymentPostprocessing", Integer),
];

const FILE_REFERENCE: &[FieldSpec] = &[
    opt("explicitFileType", Str),
    opt("fileEncoding", Integer),
    opt("includeInIndex", Integer),
    opt("lastKnownFileType", Str),
    opt("lineEnding", Integer),
    opt("name", Str),
    opt("path", Str),
    req("sourceTree", Str),
];

const SIMPLE_PHASE: &[FieldSpec] = &[
    opt("buildActionMask", Integer),
    req("files", RefList(BUILD_FILE)),
    opt("runOnlyForDeploymentPostprocessing", Integer),
];

const GROUP_FIELDS: &[FieldSpec] = &[
    req("children", RefList(FILE_LIKE)),
    opt("name", Str),
    opt("path", Str),
    req("sourceTree", Str),
];

const LEGACY_TARGET: &[FieldSpec] = &[
    opt("buildArgumentsString", Str),
    req("buildConfigurationList", Ref(CONFIG_LIST)),
    req("buildPhases", RefList(PHASES)),
    opt("buildToolPath", Str),
    opt("buildWorkingDirectory", Str),
    opt("dependencies", RefList(DEPENDENCY)),
    req("name", Str),
    opt("passBuildSettingsInEnvironment", Integer),
    opt("productName", Str),
];

const NATIVE_TARGET: &[FieldSpec] = &[
    req("buildConfigurationList", Ref(CONFIG_LIST)),
    req("buildPhases", RefList(PHASES)),
    opt("buildRules", RefList(BUILD_RULE)),
    opt("dependencies", RefList(DEPENDENCY)),
    req("name", Str),
    opt("packageProductDependencies", RefList(PRODUCT)),
    opt("productName", Str),
    opt("productReference", Ref(FILE_REF)),
    opt("productType", Str),
];

const PROJECT: &[FieldSpec] = &[
    opt("attributes", Dict),
    req("buildConfigurationList", Ref(CONFIG_LIST)),
    opt("compatibilityVersion", Str),
    opt("developmentRegion", Str),
    opt("hasScannedForEncodings", Integer),
    opt("knownRegions", StringList),
    req("mainGroup", Ref(GROUP)),
    opt("packageReferences", RefList(PACKAGE)),
    opt("productRefGroup", Ref(GROUP)),
    opt("projectDirPath", Str),
    opt("projectReferences", FieldType::Any),
    opt("projectRoot", Str),
    req("targets", RefList(TARGETS)),
];

const REFERENCE_PROXY: &[FieldSpec] = &[
    opt("fileType", Str),
    opt("name", Str),
    opt("path", Str),
    opt("remoteRef", Ref(PROXY)),
    opt("sourceTree", Str),
];

const SHELL_SCRIPT_PHASE: &[FieldSpec] = &[
    opt("buildActionMask", Integer),
    req("files", RefList(BUILD_FILE)),
    opt("inputFileListPaths", StringList),
    opt("inputPaths", StringList),
    opt("name", Str),
    opt("outputFileListPaths", StringList),
    opt("outputPaths", StringList),
    opt("runOnlyForDeploymentPostprocessing", Integer),
    opt("shellPath", Str),
    opt("shellScript", Str),
    opt("showEnvVarsInLog", Integer),
];

const TARGET_DEPENDENCY: &[FieldSpec] = &[
    opt("name", Str),
    opt("productRef", Ref(PRODUCT)),
    opt("target", Ref(TARGETS)),
    opt("targetProxy", Ref(PROXY)),
];

const VARIANT_GROUP: &[FieldSpec] = &[
    req("children", RefList(FILE_LIKE)),
    opt("name", Str),
    opt("path", Str),
    req("sourceTree", Str),
];

const BUILD_CONFIGURATION: &[FieldSpec] = &[
    opt("baseConfigurationReference", Ref(FILE_REF)),
    req("buildSettings", Dict),
    req("name", Str),
];

const CONFIGURATION_LIST: &[FieldSpec] = &[
    req("buildConfigurations", RefList(CONFIG)),
    opt("defaultConfigurationIsVisible", Integer),
    opt("defaultConfigurationName", Str),
];

const REMOTE_PACKAGE: &[FieldSpec] = &[
    opt("repositoryURL", Str),
    opt("requirement", Dict),
];

const PRODUCT_DEPENDENCY: &[FieldSpec] = &[
    opt("package", Ref(PACKAGE)),
    req("productName", Str),
];

const VERSION_GROUP: &[FieldSpec] = &[
    req("children", RefList(FILE_REF)),
    opt("currentVersion", Ref(FILE_REF)),
    opt("name", Str),
    opt("path", Str),
    req("sourceTree", Str),
    opt("versionGroupType", Str),
];

/// The schema of `kind`.
pub fn schema(kind: Kind) -> &'static [FieldSpec] {
    match kind {
        Kind::PBXAggregateTarget => AGGREGATE_TARGET,
        Kind::PBXBuildFile => BUILD_FILE_FIELDS,
        Kind::PBXBuildRule => BUILD_RULE_FIELDS,
        Kind::PBXContainerItemProxy => CONTAINER_ITEM_PROXY,
        Kind::PBXCopyFilesBuildPhase => COPY_FILES_PHASE,
        Kind::PBXFileReference => FILE_REFERENCE,
        Kind::PBXFrameworksBuildPhase
        | Kind::PBXHeadersBuildPhase
        | Kind::PBXResourcesBuildPhase
        | Kind::PBXRezBuildPhase
        | Kind::PBXSourcesBuildPhase => SIMPLE_PHASE,
        Kind::PBXGroup => GROUP_FIELDS,
        Kind::PBXLegacyTarget => LEGACY_TARGET,
        Kind::PBXNativeTarget => NATIVE_TARGET,
        Kind::PBXProject => PROJECT,
        Kind::PBXReferenceProxy => REFERENCE_PROXY,
        Kind::PBXShellScriptBuildPhase => SHELL_SCRIPT_PHASE,
        Kind::PBXTargetDependency => TARGET_DEPENDENCY,
        Kind::PBXVariantGroup => VARIANT_GROUP,
        Kind::XCBuildConfiguration => BUILD_CONFIGURATION,
        Kind::XCConfigurationList => CONFIGURATION_LIST,
        Kind::XCRemoteSwiftPackageReference => REMOTE_PACKAGE,
        Kind::XCSwiftPackageProductDependency => PRODUCT_DEPENDENCY,
        Kind::XCVersionGroup => VERSION_GROUP,
    }
}

/// The schema entry of `field` on `kind`, if there is one.
pub fn field_spec(kind: Kind, field: &str) -> Option<&'static FieldSpec> {
    schema(kind).iter().find(|f| f.name == field)
}

/// The declared type of `field`, or [`FieldType::Any`] for unknown fields.
pub fn field_type(kind: Kind, field: &str) -> FieldType {
    field_spec(kind, field).map_or(FieldType::Any, |f| f.ty)
}

/// Required fields of `kind`.
pub fn required_fields(kind: Kind) -> impl Iterator<Item = &'static str> {
    schema(kind).iter().filter(|f| f.required).map(|f| f.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Identifier;

    #[test]
    fn schemas_are_listed_in_emission_order() {
        for kind in Kind::ALL {
            let names: Vec<&str> = schema(kind).iter().map(|f| f.name).collect();
            let mut sorted = names.clone();
            sorted.sort_unstable();
            assert_eq!(names, sorted, "schema of {kind} out of order");
        }
    }

    #[test]
    fn unknown_fields_are_any() {
        assert_eq!(field_type(Kind::PBXGroup, "usesTabs"), FieldType::Any);
        assert_eq!(
            field_type(Kind::PBXBuildFile, "fileRef"),
            FieldType::Ref(Kind::GROUP_MEMBERS)
        );
    }

    #[test]
    fn accepts_checks_shape() {
        let id = Identifier::from_u128(3);
        assert!(FieldType::RefList(&[]).accepts(&Value::ref_list([&id])));
        assert!(!FieldType::RefList(&[]).accepts(&Value::string_list(["a"])));
        assert!(FieldType::StringList.accepts(&Value::string_list(["a", "b"])));
        assert!(!FieldType::Integer.accepts(&Value::string("1")));
        assert!(FieldType::Any.accepts(&Value::Bool(true)));
    }

    #[test]
    fn required_fields_of_target() {
        let required: Vec<_> = required_fields(Kind::PBXNativeTarget).collect();
        assert_eq!(required, vec!["buildConfigurationList", "buildPhases", "name"]);
    }
}
