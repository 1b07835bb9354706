//! Groups and file references.

use tracing::debug;
use xcproj_core::{Identifier, Kind, Node, Value};

use crate::error::{EditError, Result};
use crate::project::{fields, Project};

/// What a file path is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTree {
    Absolute,
    Group,
    Source,
    Sdk,
    Developer,
    Build,
}

impl SourceTree {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTree::Absolute => "<absolute>",
            SourceTree::Group => "<group>",
            SourceTree::Source => "SOURCE_ROOT",
            SourceTree::Sdk => "SDKROOT",
            SourceTree::Developer => "DEVELOPER_DIR",
            SourceTree::Build => "BUILT_PRODUCTS_DIR",
        }
    }
}

/// How the build treats a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Source,
    Header,
    Framework,
    Resource,
    /// Referenced by the project but never built (plists, entitlements).
    Plain,
}

const FILE_TYPES: &[(&str, &str, FileKind)] = &[
    ("a", "archive.ar", FileKind::Framework),
    ("app", "wrapper.application", FileKind::Plain),
    ("appex", "wrapper.app-extension", FileKind::Plain),
    ("bundle", "wrapper.plug-in", FileKind::Resource),
    ("c", "sourcecode.c.c", FileKind::Source),
    ("cpp", "sourcecode.cpp.cpp", FileKind::Source),
    ("dylib", "compiled.mach-o.dylib", FileKind::Framework),
    ("entitlements", "text.plist.entitlements", FileKind::Plain),
    ("framework", "wrapper.framework", FileKind::Framework),
    ("h", "sourcecode.c.h", FileKind::Header),
    ("json", "text.json", FileKind::Resource),
    ("m", "sourcecode.c.objc", FileKind::Source),
    ("mm", "sourcecode.cpp.objcpp", FileKind::Source),
    ("plist", "text.plist.xml", FileKind::Plain),
    ("png", "image.png", FileKind::Resource),
    ("storyboard", "file.storyboard", FileKind::Resource),
    ("strings", "text.plist.strings", FileKind::Resource),
    ("swift", "sourcecode.swift", FileKind::Source),
    ("tbd", "sourcecode.text-based-dylib-definition", FileKind::Framework),
    ("xcassets", "folder.assetcatalog", FileKind::Resource),
    ("xib", "file.xib", FileKind::Resource),
];

fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    name.rsplit_once('.').map(|(_, ext)| ext)
}

/// `lastKnownFileType` for a path, when its extension is known.
pub fn file_type_for_path(path: &str) -> Option<&'static str> {
    let ext = extension(path)?.to_ascii_lowercase();
    FILE_TYPES
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, ty, _)| *ty)
}

/// Build treatment of a `lastKnownFileType` / `explicitFileType` value.
/// Unknown types are treated as resources.
pub fn file_kind(file_type: &str) -> FileKind {
    FILE_TYPES
        .iter()
        .find(|(_, ty, _)| *ty == file_type)
        .map_or(FileKind::Resource, |(_, _, kind)| *kind)
}

/// Display name of a group member: `name`, falling back to `path`.
fn member_name(node: &Node) -> Option<&str> {
    node.str_field("name").or_else(|| node.str_field("path"))
}

fn split_project_path(project_path: &str) -> (&str, &str) {
    match project_path.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", project_path),
    }
}

impl Project {
    /// Build treatment of a file reference.
    pub fn file_kind_of(&self, file: &Identifier) -> Result<FileKind> {
        let node = self.node(file)?;
        let ty = node
            .str_field("lastKnownFileType")
            .or_else(|| node.str_field("explicitFileType"))
            .or_else(|| node.str_field("path").and_then(file_type_for_path));
        Ok(ty.map_or(FileKind::Resource, file_kind))
    }

    /// The child group of `parent` named `name`.
    pub fn child_group(&self, parent: &Identifier, name: &str) -> Result<Option<Identifier>> {
        let parent = self.node(parent)?;
        Ok(parent
            .ref_list("children")
            .into_iter()
            .filter_map(|c| self.graph().node(c))
            .find(|n| n.kind == Kind::PBXGroup && member_name(n) == Some(name))
            .map(|n| n.id.clone()))
    }

    /// Find or create a `name`-only group (no directory) under `parent`.
    pub(crate) fn find_or_create_named_group(
        &mut self,
        parent: &Identifier,
        name: &str,
    ) -> Result<Identifier> {
        if let Some(group) = self.child_group(parent, name)? {
            return Ok(group);
        }
        let group = self.graph_mut().add_node(
            Kind::PBXGroup,
            fields([
                ("children", Value::Array(Vec::new())),
                ("name", Value::string(name)),
                ("sourceTree", Value::string(SourceTree::Group.as_str())),
            ]),
            None,
        )?;
        self.graph_mut()
            .append_to_list(parent, "children", Value::Ref(group.clone()))?;
        Ok(group)
    }

    /// Walk `path` (slash-separated) down from the main group, creating
    /// one directory group per missing component. An empty path is the
    /// main group.
    pub fn find_or_create_group_path(&mut self, path: &str) -> Result<Identifier> {
        let mut group = self.main_group()?;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            group = match self.child_group(&group, component)? {
                Some(existing) => existing,
                None => {
                    let created = self.graph_mut().add_node(
                        Kind::PBXGroup,
                        fields([
                            ("children", Value::Array(Vec::new())),
                            ("path", Value::string(component)),
                            ("sourceTree", Value::string(SourceTree::Group.as_str())),
                        ]),
                        None,
                    )?;
                    self.graph_mut()
                        .append_to_list(&group, "children", Value::Ref(created.clone()))?;
                    debug!(group = %created, component, "created group");
                    created
                }
            };
        }
        Ok(group)
    }

    /// The file reference shown at `project_path` in the group tree.
    pub fn find_file_by_project_path(&self, project_path: &str) -> Option<Identifier> {
        let (dir, file_name) = split_project_path(project_path);
        let mut group = self.main_group().ok()?;
        for component in dir.split('/').filter(|c| !c.is_empty()) {
            group = self.child_group(&group, component).ok()??;
        }
        self.graph()
            .node(&group)?
            .ref_list("children")
            .into_iter()
            .filter_map(|c| self.graph().node(c))
            .find(|n| n.kind != Kind::PBXGroup && member_name(n) == Some(file_name))
            .map(|n| n.id.clone())
    }

    /// Reference the file at `path` (relative to `tree`) and show it at
    /// `project_path` in the group tree. Returns the existing reference
    /// when one is already shown there.
    pub fn add_file(&mut self, path: &str, project_path: &str, tree: SourceTree) -> Result<Identifier> {
        if let Some(existing) = self.find_file_by_project_path(project_path) {
            return Ok(existing);
        }
        let (dir, file_name) = split_project_path(project_path);
        if file_name.is_empty() {
            return Err(EditError::invalid(format!("{project_path:?} names no file")));
        }
        self.atomically(|p| p.create_file(path, dir, file_name, tree))
    }

    fn create_file(
        &mut self,
        path: &str,
        dir: &str,
        file_name: &str,
        tree: SourceTree,
    ) -> Result<Identifier> {
        let group = self.find_or_create_group_path(dir)?;

        let mut f = fields([
            ("path", Value::string(path)),
            ("sourceTree", Value::string(tree.as_str())),
        ]);
        if let Some(ty) = file_type_for_path(path) {
            f.insert("lastKnownFileType".into(), Value::string(ty));
        }
        if file_name != path {
            f.insert("name".into(), Value::string(file_name));
        }
        let file = self.graph_mut().add_node(Kind::PBXFileReference, f, None)?;
        self.graph_mut()
            .append_to_list(&group, "children", Value::Ref(file.clone()))?;
        debug!(%file, path, dir, file_name, "added file");
        Ok(file)
    }

    /// Remove a file reference together with its build files and group
    /// membership.
    pub fn remove_file(&mut self, file: &Identifier) -> Result<()> {
        self.node(file)?;
        let build_files: Vec<Identifier> = self
            .graph()
            .nodes_of_kind(Kind::PBXBuildFile)
            .filter(|n| n.ref_field("fileRef") == Some(file))
            .map(|n| n.id.clone())
            .collect();
        for build_file in &build_files {
            self.detach_and_remove_build_file(build_file)?;
        }
        for holder in self.graph().referrers(file) {
            let is_container = self
                .graph()
                .node(&holder)
                .is_some_and(|n| n.kind.is_group_like());
            if is_container {
                self.graph_mut()
                    .remove_from_list(&holder, "children", &Value::Ref(file.clone()))?;
            }
        }
        self.graph_mut().remove_node(file)?;
        debug!(%file, "removed file");
        Ok(())
    }
}
