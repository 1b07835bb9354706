//! The [`Project`] handle: one open project graph plus composite
//! operations built from the graph's primitive mutations.
//!
//! Every composite looks for an existing matching object before creating
//! one, so running the same edit twice leaves the project as running it
//! once.

use std::path::Path;

use tracing::debug;
use xcproj_core::{Fields, Graph, GraphError, IdGenerator, Identifier, Kind, Node, RandomIds, Value};

use crate::error::{EditError, Result};

/// Build a field map from literal pairs.
pub(crate) fn fields<const N: usize>(entries: [(&str, Value); N]) -> Fields {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// The product a new target builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductType {
    Application,
    AppExtension,
    Framework,
    StaticLibrary,
    UnitTests,
}

impl ProductType {
    /// `productType` identifier.
    pub fn identifier(self) -> &'static str {
        match self {
            ProductType::Application => "com.apple.product-type.application",
            ProductType::AppExtension => "com.apple.product-type.app-extension",
            ProductType::Framework => "com.apple.product-type.framework",
            ProductType::StaticLibrary => "com.apple.product-type.library.static",
            ProductType::UnitTests => "com.apple.product-type.bundle.unit-test",
        }
    }

    /// `explicitFileType` of the product reference.
    pub fn file_type(self) -> &'static str {
        match self {
            ProductType::Application => "wrapper.application",
            ProductType::AppExtension => "wrapper.app-extension",
            ProductType::Framework => "wrapper.framework",
            ProductType::StaticLibrary => "archive.ar",
            ProductType::UnitTests => "wrapper.cfbundle",
        }
    }

    /// File name of the built product.
    pub fn product_file_name(self, name: &str) -> String {
        match self {
            ProductType::Application => format!("{name}.app"),
            ProductType::AppExtension => format!("{name}.appex"),
            ProductType::Framework => format!("{name}.framework"),
            ProductType::StaticLibrary => format!("lib{name}.a"),
            ProductType::UnitTests => format!("{name}.xctest"),
        }
    }
}

/// An open project document.
#[derive(Debug)]
pub struct Project {
    graph: Graph,
}

impl Project {
    /// Wrap a parsed graph. The graph must have a root project object.
    pub fn new(graph: Graph) -> Result<Self> {
        graph.root_node()?;
        Ok(Self { graph })
    }

    /// Read the project document at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(xcproj_text::read_project(path)?)
    }

    /// Read the project document at `path` with an injected identifier
    /// source for new objects.
    pub fn open_with(path: impl AsRef<Path>, generator: Box<dyn IdGenerator>) -> Result<Self> {
        Self::new(xcproj_text::read_project_with(path, generator)?)
    }

    /// Parse project text.
    pub fn parse(text: &str) -> Result<Self> {
        Self::new(xcproj_text::parse(text)?)
    }

    /// Parse project text with an injected identifier source.
    pub fn parse_with(text: &str, generator: Box<dyn IdGenerator>) -> Result<Self> {
        Self::new(xcproj_text::parse_with(text, generator)?)
    }

    /// A new project called `name` with no targets, Debug and Release
    /// configurations, and an empty Products group.
    pub fn empty(name: &str) -> Result<Self> {
        Self::empty_with(name, Box::new(RandomIds))
    }

    /// Like [`Project::empty`], with an injected identifier source.
    pub fn empty_with(name: &str, generator: Box<dyn IdGenerator>) -> Result<Self> {
        let mut graph = Graph::with_generator(generator);
        let products = graph.add_node(
            Kind::PBXGroup,
            fields([
                ("children", Value::Array(Vec::new())),
                ("name", Value::string("Products")),
                ("sourceTree", Value::string("<group>")),
            ]),
            None,
        )?;
        let main = graph.add_node(
            Kind::PBXGroup,
            fields([
                ("children", Value::ref_list([&products])),
                ("sourceTree", Value::string("<group>")),
            ]),
            None,
        )?;
        let mut configs = Vec::new();
        for config_name in ["Debug", "Release"] {
            configs.push(graph.add_node(
                Kind::XCBuildConfiguration,
                fields([
                    ("buildSettings", Value::Dict(xcproj_core::Dict::new())),
                    ("name", Value::string(config_name)),
                ]),
                None,
            )?);
        }
        let list = graph.add_node(
            Kind::XCConfigurationList,
            fields([
                ("buildConfigurations", Value::ref_list(&configs)),
                ("defaultConfigurationIsVisible", Value::Integer(0)),
                ("defaultConfigurationName", Value::string("Release")),
            ]),
            None,
        )?;
        let project = graph.add_node(
            Kind::PBXProject,
            fields([
                ("attributes", Value::Dict(xcproj_core::Dict::new())),
                ("buildConfigurationList", Value::Ref(list)),
                ("compatibilityVersion", Value::string("Xcode 3.2")),
                ("developmentRegion", Value::string("en")),
                ("hasScannedForEncodings", Value::Integer(0)),
                ("knownRegions", Value::string_list(["en", "Base"])),
                ("mainGroup", Value::Ref(main)),
                ("productRefGroup", Value::Ref(products)),
                ("projectDirPath", Value::string("")),
                ("projectRoot", Value::string("")),
                ("targets", Value::Array(Vec::new())),
            ]),
            None,
        )?;
        graph.set_root(project)?;
        graph.set_project_name(name);
        debug!(name, "created empty project");
        Self::new(graph)
    }

    /// Canonical text of the project.
    pub fn to_text(&self) -> Result<String> {
        Ok(xcproj_text::serialize(&self.graph)?)
    }

    /// Write the project to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        Ok(xcproj_text::write_project(&self.graph, path)?)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Run `edit` as one step: if it fails, the graph is put back the way
    /// it was before the call.
    pub fn atomically<T>(&mut self, edit: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.graph.checkpoint();
        let result = edit(self);
        if result.is_err() {
            self.graph.rollback(checkpoint);
        }
        result
    }

    pub(crate) fn node(&self, id: &Identifier) -> Result<&Node> {
        Ok(self.graph.expect_node(id)?)
    }

    // --- Lookup ---

    /// Identifier of the root `PBXProject`.
    pub fn project_id(&self) -> Result<Identifier> {
        Ok(self.graph.root_node()?.id.clone())
    }

    pub fn project_node(&self) -> Result<&Node> {
        Ok(self.graph.root_node()?)
    }

    pub fn main_group(&self) -> Result<Identifier> {
        let project = self.project_node()?;
        project.ref_field("mainGroup").cloned().ok_or_else(|| {
            GraphError::MissingField {
                kind: Kind::PBXProject,
                field: "mainGroup".into(),
            }
            .into()
        })
    }

    /// Targets in project order.
    pub fn targets(&self) -> Result<Vec<Identifier>> {
        Ok(self
            .project_node()?
            .ref_list("targets")
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn target_by_name(&self, name: &str) -> Option<Identifier> {
        let targets = self.targets().ok()?;
        targets
            .into_iter()
            .find(|t| self.graph.node(t).and_then(|n| n.str_field("name")) == Some(name))
    }

    /// Like [`Project::target_by_name`], failing when absent.
    pub fn target(&self, name: &str) -> Result<Identifier> {
        self.target_by_name(name)
            .ok_or_else(|| EditError::TargetNotFound(name.to_string()))
    }

    /// Build configurations of a target or of the project itself.
    pub fn build_configurations(&self, owner: &Identifier) -> Result<Vec<Identifier>> {
        let owner_node = self.node(owner)?;
        let list = owner_node
            .ref_field("buildConfigurationList")
            .ok_or_else(|| GraphError::MissingField {
                kind: owner_node.kind,
                field: "buildConfigurationList".into(),
            })?;
        Ok(self
            .node(list)?
            .ref_list("buildConfigurations")
            .into_iter()
            .cloned()
            .collect())
    }

    /// The configuration of `owner` called `name`.
    pub fn build_configuration_by_name(&self, owner: &Identifier, name: &str) -> Result<Identifier> {
        self.build_configurations(owner)?
            .into_iter()
            .find(|c| self.graph.node(c).and_then(|n| n.str_field("name")) == Some(name))
            .ok_or_else(|| EditError::ConfigurationNotFound(name.to_string()))
    }

    /// Names of the project-level build configurations.
    pub fn configuration_names(&self) -> Result<Vec<String>> {
        let project = self.project_id()?;
        Ok(self
            .build_configurations(&project)?
            .iter()
            .filter_map(|c| self.graph.node(c))
            .filter_map(|n| n.str_field("name"))
            .map(str::to_string)
            .collect())
    }

    /// Configurations an edit addressed to `owner` applies to: the node
    /// itself when it is a configuration, otherwise all of its
    /// configurations.
    pub(crate) fn configurations_of(&self, owner: &Identifier) -> Result<Vec<Identifier>> {
        if self.node(owner)?.kind == Kind::XCBuildConfiguration {
            Ok(vec![owner.clone()])
        } else {
            self.build_configurations(owner)
        }
    }

    // --- Targets ---

    /// Find the target called `name`, or create a native target with one
    /// build configuration per project configuration.
    pub fn find_or_create_target(&mut self, name: &str, product: ProductType) -> Result<Identifier> {
        if let Some(existing) = self.target_by_name(name) {
            return Ok(existing);
        }
        self.atomically(|p| p.create_target(name, product))
    }

    fn create_target(&mut self, name: &str, product: ProductType) -> Result<Identifier> {
        let project = self.project_id()?;
        let names = self.configuration_names()?;
        let default_name = if names.iter().any(|n| n == "Release") {
            "Release".to_string()
        } else {
            names.first().cloned().unwrap_or_else(|| "Release".to_string())
        };

        let mut configs = Vec::with_capacity(names.len());
        for config_name in &names {
            let settings: xcproj_core::Dict =
                [("PRODUCT_NAME".to_string(), Value::string("$(TARGET_NAME)"))]
                    .into_iter()
                    .collect();
            let config = self.graph.add_node(
                Kind::XCBuildConfiguration,
                fields([
                    ("buildSettings", Value::Dict(settings)),
                    ("name", Value::string(config_name.as_str())),
                ]),
                None,
            )?;
            configs.push(config);
        }
        let list = self.graph.add_node(
            Kind::XCConfigurationList,
            fields([
                ("buildConfigurations", Value::ref_list(&configs)),
                ("defaultConfigurationIsVisible", Value::Integer(0)),
                ("defaultConfigurationName", Value::string(default_name)),
            ]),
            None,
        )?;

        let products = self.products_group()?;
        let product_ref = self.graph.add_node(
            Kind::PBXFileReference,
            fields([
                ("explicitFileType", Value::string(product.file_type())),
                ("includeInIndex", Value::Integer(0)),
                ("path", Value::string(product.product_file_name(name))),
                ("sourceTree", Value::string("BUILT_PRODUCTS_DIR")),
            ]),
            None,
        )?;
        self.graph
            .append_to_list(&products, "children", Value::Ref(product_ref.clone()))?;

        let target = self.graph.add_node(
            Kind::PBXNativeTarget,
            fields([
                ("buildConfigurationList", Value::Ref(list)),
                ("buildPhases", Value::Array(Vec::new())),
                ("buildRules", Value::Array(Vec::new())),
                ("dependencies", Value::Array(Vec::new())),
                ("name", Value::string(name)),
                ("productName", Value::string(name)),
                ("productReference", Value::Ref(product_ref)),
                ("productType", Value::string(product.identifier())),
            ]),
            None,
        )?;
        self.graph
            .append_to_list(&project, "targets", Value::Ref(target.clone()))?;
        debug!(%target, name, "created target");
        Ok(target)
    }

    /// The group holding build products, created when missing.
    fn products_group(&mut self) -> Result<Identifier> {
        if let Some(group) = self.project_node()?.ref_field("productRefGroup") {
            return Ok(group.clone());
        }
        let main = self.main_group()?;
        let group = self.find_or_create_named_group(&main, "Products")?;
        let project = self.project_id()?;
        self.graph
            .set_field(&project, "productRefGroup", Value::Ref(group.clone()))?;
        Ok(group)
    }

    /// Make `target` depend on `dependency`, creating the container proxy
    /// and target dependency objects once.
    pub fn add_target_dependency(
        &mut self,
        target: &Identifier,
        dependency: &Identifier,
    ) -> Result<Identifier> {
        let target_node = self.node(target)?;
        if !target_node.kind.is_target() {
            return Err(EditError::invalid(format!("{target} is not a target")));
        }
        for existing in target_node.ref_list("dependencies") {
            if self.node(existing)?.ref_field("target") == Some(dependency) {
                return Ok(existing.clone());
            }
        }

        let dependency_node = self.node(dependency)?;
        if !dependency_node.kind.is_target() {
            return Err(EditError::invalid(format!("{dependency} is not a target")));
        }
        let remote_info = dependency_node.str_field("name").unwrap_or_default().to_string();
        let project = self.project_id()?;
        let proxy = self.graph.add_node(
            Kind::PBXContainerItemProxy,
            fields([
                ("containerPortal", Value::Ref(project)),
                ("proxyType", Value::Integer(1)),
                ("remoteGlobalIDString", Value::string(dependency.as_str())),
                ("remoteInfo", Value::string(remote_info)),
            ]),
            None,
        )?;
        let node = self.graph.add_node(
            Kind::PBXTargetDependency,
            fields([
                ("target", Value::Ref(dependency.clone())),
                ("targetProxy", Value::Ref(proxy)),
            ]),
            None,
        )?;
        self.graph
            .append_to_list(target, "dependencies", Value::Ref(node.clone()))?;
        Ok(node)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::files::SourceTree;
    use xcproj_core::SequentialIds;

    /// One application target with Debug and Release configurations and
    /// empty sources and frameworks phases.
    pub(crate) const BASE: &str = include_str!("../tests/fixtures/base.pbxproj");

    pub(crate) fn base() -> Project {
        Project::parse_with(BASE, Box::new(SequentialIds::new())).unwrap()
    }

    #[test]
    fn empty_project_round_trips_and_grows() {
        let mut p = Project::empty_with("Demo", Box::new(SequentialIds::new())).unwrap();
        assert!(p.targets().unwrap().is_empty());
        assert_eq!(p.configuration_names().unwrap(), ["Debug", "Release"]);

        let text = p.to_text().unwrap();
        assert!(text.contains("/* Build configuration list for PBXProject \"Demo\" */"));
        assert!(text.contains("projectDirPath = \"\";\n"));
        let reread = Project::parse(&text).unwrap();
        assert_eq!(reread.to_text().unwrap(), text);
        assert_eq!(reread.graph().project_name(), Some("Demo"));

        let target = p.find_or_create_target("Demo", ProductType::Application).unwrap();
        assert_eq!(p.target("Demo").unwrap(), target);
        assert_eq!(p.build_configurations(&target).unwrap().len(), 2);
        let products = p.project_node().unwrap().ref_field("productRefGroup").unwrap().clone();
        assert_eq!(p.graph().node(&products).unwrap().ref_list("children").len(), 1);
    }

    #[test]
    fn lookups() {
        let p = base();
        let target = p.target("Unity-iPhone").unwrap();
        assert_eq!(p.targets().unwrap(), vec![target.clone()]);
        assert_eq!(p.configuration_names().unwrap(), ["Debug", "Release"]);
        assert_eq!(p.build_configurations(&target).unwrap().len(), 2);
        assert!(p.build_configuration_by_name(&target, "Release").is_ok());
        assert!(matches!(
            p.build_configuration_by_name(&target, "Profile"),
            Err(EditError::ConfigurationNotFound(_))
        ));
        assert!(matches!(p.target("Nope"), Err(EditError::TargetNotFound(_))));
    }

    #[test]
    fn find_or_create_target_is_idempotent() {
        let mut p = base();
        let before = p.graph().node_count();
        let ext = p
            .find_or_create_target("Widget", ProductType::AppExtension)
            .unwrap();
        let after = p.graph().node_count();
        assert_eq!(after, before + 5);
        assert_eq!(
            p.find_or_create_target("Widget", ProductType::AppExtension)
                .unwrap(),
            ext
        );
        assert_eq!(p.graph().node_count(), after);

        let names: Vec<String> = p
            .build_configurations(&ext)
            .unwrap()
            .iter()
            .map(|c| p.graph().node(c).unwrap().str_field("name").unwrap().to_string())
            .collect();
        assert_eq!(names, ["Debug", "Release"]);
        let text = p.to_text().unwrap();
        assert!(text.contains("/* Widget.appex */"));
        assert!(text.contains("Build configuration list for PBXNativeTarget \"Widget\""));
    }

    #[test]
    fn target_dependency_is_created_once() {
        let mut p = base();
        let app = p.target("Unity-iPhone").unwrap();
        let ext = p
            .find_or_create_target("Widget", ProductType::AppExtension)
            .unwrap();
        let dep = p.add_target_dependency(&app, &ext).unwrap();
        assert_eq!(p.add_target_dependency(&app, &ext).unwrap(), dep);
        let deps = p.graph().node(&app).unwrap().ref_list("dependencies").len();
        assert_eq!(deps, 1);
        assert_eq!(p.graph().nodes_of_kind(Kind::PBXContainerItemProxy).count(), 1);
    }

    #[test]
    fn dependency_on_non_target_is_rejected() {
        let mut p = base();
        let app = p.target("Unity-iPhone").unwrap();
        let main = p.main_group().unwrap();
        assert!(matches!(
            p.add_target_dependency(&app, &main),
            Err(EditError::Invalid(_))
        ));
    }

    #[test]
    fn failed_edit_is_rolled_back() {
        let mut p = base();
        let before = p.to_text().unwrap();
        let count = p.graph().node_count();
        let result = p.atomically(|p| {
            let ext = p.find_or_create_target("Widget", ProductType::AppExtension)?;
            p.add_file("Widget/Info.plist", "Widget/Info.plist", SourceTree::Group)?;
            p.add_framework(&ext, "NotificationCenter.framework", false)?;
            let main = p.main_group()?;
            p.add_target_dependency(&main, &ext)
        });
        assert!(matches!(result, Err(EditError::Invalid(_))));
        assert_eq!(p.to_text().unwrap(), before);
        assert!(p.target_by_name("Widget").is_none());
        assert!(p.find_file_by_project_path("Widget/Info.plist").is_none());

        let ext = p
            .find_or_create_target("Widget", ProductType::AppExtension)
            .unwrap();
        assert_eq!(p.target("Widget").unwrap(), ext);
        assert_eq!(p.graph().node_count(), count + 5);
    }
}
