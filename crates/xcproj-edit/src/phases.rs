//! Build phases, build files and framework linkage.

use tracing::debug;
use xcproj_core::{Dict, GraphError, Identifier, Kind, Value};

use crate::error::{EditError, Result};
use crate::files::{file_type_for_path, FileKind, SourceTree};
use crate::project::{fields, Project};

const BUILD_ACTION_MASK: i64 = 2147483647;

/// The standard per-target build phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Sources,
    Frameworks,
    Resources,
    Headers,
}

impl PhaseKind {
    pub fn kind(self) -> Kind {
        match self {
            PhaseKind::Sources => Kind::PBXSourcesBuildPhase,
            PhaseKind::Frameworks => Kind::PBXFrameworksBuildPhase,
            PhaseKind::Resources => Kind::PBXResourcesBuildPhase,
            PhaseKind::Headers => Kind::PBXHeadersBuildPhase,
        }
    }

    /// The phase a file of this kind is built in.
    pub fn for_file(kind: FileKind) -> Option<PhaseKind> {
        match kind {
            FileKind::Source => Some(PhaseKind::Sources),
            FileKind::Header => Some(PhaseKind::Headers),
            FileKind::Framework => Some(PhaseKind::Frameworks),
            FileKind::Resource => Some(PhaseKind::Resources),
            FileKind::Plain => None,
        }
    }
}

impl Project {
    // --- Build phases ---

    /// Build phases of `target`, in build order.
    pub fn build_phases(&self, target: &Identifier) -> Result<Vec<Identifier>> {
        let node = self.node(target)?;
        if !node.kind.is_target() {
            return Err(EditError::invalid(format!("{target} is not a target")));
        }
        Ok(node.ref_list("buildPhases").into_iter().cloned().collect())
    }

    fn find_phase_of_kind(&self, target: &Identifier, kind: Kind) -> Result<Option<Identifier>> {
        Ok(self
            .build_phases(target)?
            .into_iter()
            .find(|p| self.graph().node(p).is_some_and(|n| n.kind == kind)))
    }

    pub fn find_build_phase(&self, target: &Identifier, phase: PhaseKind) -> Result<Option<Identifier>> {
        self.find_phase_of_kind(target, phase.kind())
    }

    /// The `phase` build phase of `target`, appended when missing.
    pub fn find_or_create_build_phase(
        &mut self,
        target: &Identifier,
        phase: PhaseKind,
    ) -> Result<Identifier> {
        if let Some(existing) = self.find_build_phase(target, phase)? {
            return Ok(existing);
        }
        let id = self.graph_mut().add_node(
            phase.kind(),
            fields([
                ("buildActionMask", Value::Integer(BUILD_ACTION_MASK)),
                ("files", Value::Array(Vec::new())),
                ("runOnlyForDeploymentPostprocessing", Value::Integer(0)),
            ]),
            None,
        )?;
        self.graph_mut()
            .append_to_list(target, "buildPhases", Value::Ref(id.clone()))?;
        debug!(phase = %id, kind = %phase.kind(), "created build phase");
        Ok(id)
    }

    fn find_named_phase(&self, target: &Identifier, kind: Kind, name: &str) -> Result<Option<Identifier>> {
        Ok(self.build_phases(target)?.into_iter().find(|p| {
            self.graph()
                .node(p)
                .is_some_and(|n| n.kind == kind && n.str_field("name") == Some(name))
        }))
    }

    /// A copy-files phase called `name`, created when missing.
    pub fn add_copy_files_build_phase(
        &mut self,
        target: &Identifier,
        name: &str,
        dst_path: &str,
        dst_subfolder_spec: i64,
    ) -> Result<Identifier> {
        if let Some(existing) = self.find_named_phase(target, Kind::PBXCopyFilesBuildPhase, name)? {
            return Ok(existing);
        }
        let id = self.graph_mut().add_node(
            Kind::PBXCopyFilesBuildPhase,
            fields([
                ("buildActionMask", Value::Integer(BUILD_ACTION_MASK)),
                ("dstPath", Value::string(dst_path)),
                ("dstSubfolderSpec", Value::Integer(dst_subfolder_spec)),
                ("files", Value::Array(Vec::new())),
                ("name", Value::string(name)),
                ("runOnlyForDeploymentPostprocessing", Value::Integer(0)),
            ]),
            None,
        )?;
        self.graph_mut()
            .append_to_list(target, "buildPhases", Value::Ref(id.clone()))?;
        Ok(id)
    }

    /// A run-script phase called `name`, created when missing.
    pub fn add_shell_script_build_phase(
        &mut self,
        target: &Identifier,
        name: &str,
        shell_path: &str,
        script: &str,
    ) -> Result<Identifier> {
        if let Some(existing) = self.find_named_phase(target, Kind::PBXShellScriptBuildPhase, name)? {
            return Ok(existing);
        }
        let id = self.graph_mut().add_node(
            Kind::PBXShellScriptBuildPhase,
            fields([
                ("buildActionMask", Value::Integer(BUILD_ACTION_MASK)),
                ("files", Value::Array(Vec::new())),
                ("inputPaths", Value::Array(Vec::new())),
                ("name", Value::string(name)),
                ("outputPaths", Value::Array(Vec::new())),
                ("runOnlyForDeploymentPostprocessing", Value::Integer(0)),
                ("shellPath", Value::string(shell_path)),
                ("shellScript", Value::string(script)),
            ]),
            None,
        )?;
        self.graph_mut()
            .append_to_list(target, "buildPhases", Value::Ref(id.clone()))?;
        Ok(id)
    }

    // --- Build files ---

    /// The build file in `phase` that builds `file`.
    pub fn find_build_file(&self, phase: &Identifier, file: &Identifier) -> Result<Option<Identifier>> {
        Ok(self
            .node(phase)?
            .ref_list("files")
            .into_iter()
            .find(|bf| {
                self.graph()
                    .node(bf)
                    .is_some_and(|n| n.ref_field("fileRef") == Some(file))
            })
            .cloned())
    }

    /// Build `file` in `phase`. The build file is created before the phase
    /// is touched, so an unknown `file` leaves the phase unchanged.
    pub fn add_file_to_build_phase(
        &mut self,
        phase: &Identifier,
        file: &Identifier,
        settings: Option<Dict>,
    ) -> Result<Identifier> {
        if !self.node(phase)?.kind.is_build_phase() {
            return Err(EditError::invalid(format!("{phase} is not a build phase")));
        }
        if let Some(existing) = self.find_build_file(phase, file)? {
            return Ok(existing);
        }
        let mut f = fields([("fileRef", Value::Ref(file.clone()))]);
        if let Some(settings) = settings {
            f.insert("settings".into(), Value::Dict(settings));
        }
        let build_file = self.graph_mut().add_node(Kind::PBXBuildFile, f, None)?;
        self.graph_mut()
            .append_to_list(phase, "files", Value::Ref(build_file.clone()))?;
        debug!(%build_file, %file, %phase, "added build file");
        Ok(build_file)
    }

    /// Build `file` in the phase matching its type.
    pub fn add_file_to_build(&mut self, target: &Identifier, file: &Identifier) -> Result<Identifier> {
        if !self.graph().contains(file) {
            return Err(GraphError::DanglingReference {
                kind: Kind::PBXBuildFile,
                field: "fileRef".into(),
                target: file.clone(),
            }
            .into());
        }
        let phase = PhaseKind::for_file(self.file_kind_of(file)?)
            .ok_or_else(|| EditError::invalid(format!("{file} is not built by any phase")))?;
        let phase = self.find_or_create_build_phase(target, phase)?;
        self.add_file_to_build_phase(&phase, file, None)
    }

    /// Stop building `file` in any phase of `target`.
    pub fn remove_file_from_build(&mut self, target: &Identifier, file: &Identifier) -> Result<bool> {
        let mut removed = false;
        for phase in self.build_phases(target)? {
            if let Some(build_file) = self.find_build_file(&phase, file)? {
                self.graph_mut()
                    .remove_from_list(&phase, "files", &Value::Ref(build_file.clone()))?;
                if self.graph().referrers(&build_file).is_empty() {
                    self.graph_mut().remove_node(&build_file)?;
                }
                removed = true;
            }
        }
        Ok(removed)
    }

    /// Remove a build file from every phase listing it, then the build
    /// file itself.
    pub(crate) fn detach_and_remove_build_file(&mut self, build_file: &Identifier) -> Result<()> {
        for holder in self.graph().referrers(build_file) {
            let is_phase = self
                .graph()
                .node(&holder)
                .is_some_and(|n| n.kind.is_build_phase());
            if is_phase {
                self.graph_mut()
                    .remove_from_list(&holder, "files", &Value::Ref(build_file.clone()))?;
            }
        }
        self.graph_mut().remove_node(build_file)?;
        Ok(())
    }

    // --- Frameworks ---

    fn framework_path(name: &str) -> String {
        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("tbd") | Some("dylib") => format!("usr/lib/{name}"),
            _ => format!("System/Library/Frameworks/{name}"),
        }
    }

    /// The SDK file reference for framework `name`.
    pub fn find_framework_file(&self, name: &str) -> Option<Identifier> {
        let path = Self::framework_path(name);
        self.graph()
            .nodes_of_kind(Kind::PBXFileReference)
            .find(|n| {
                n.str_field("path") == Some(path.as_str())
                    && n.str_field("sourceTree") == Some(SourceTree::Sdk.as_str())
            })
            .map(|n| n.id.clone())
    }

    /// Link system framework `name` (e.g. `GameKit.framework`) into
    /// `target`, optionally weakly. Returns the build file.
    pub fn add_framework(&mut self, target: &Identifier, name: &str, weak: bool) -> Result<Identifier> {
        self.build_phases(target)?;
        self.atomically(|p| p.link_framework(target, name, weak))
    }

    fn link_framework(&mut self, target: &Identifier, name: &str, weak: bool) -> Result<Identifier> {
        let file = match self.find_framework_file(name) {
            Some(file) => file,
            None => {
                let path = Self::framework_path(name);
                let ty = file_type_for_path(name).unwrap_or("wrapper.framework");
                let file = self.graph_mut().add_node(
                    Kind::PBXFileReference,
                    fields([
                        ("lastKnownFileType", Value::string(ty)),
                        ("name", Value::string(name)),
                        ("path", Value::string(path)),
                        ("sourceTree", Value::string(SourceTree::Sdk.as_str())),
                    ]),
                    None,
                )?;
                let main = self.main_group()?;
                let group = self.find_or_create_named_group(&main, "Frameworks")?;
                self.graph_mut()
                    .append_to_list(&group, "children", Value::Ref(file.clone()))?;
                file
            }
        };

        let phase = self.find_or_create_build_phase(target, PhaseKind::Frameworks)?;
        let settings = weak.then(|| {
            let mut settings = Dict::new();
            settings.insert("ATTRIBUTES".into(), Value::string_list(["Weak"]));
            settings
        });
        let build_file = self.add_file_to_build_phase(&phase, &file, settings)?;
        debug!(framework = name, %target, weak, "linked framework");
        Ok(build_file)
    }

    /// Unlink framework `name` from `target`. The file reference stays.
    pub fn remove_framework(&mut self, target: &Identifier, name: &str) -> Result<bool> {
        let Some(file) = self.find_framework_file(name) else {
            return Ok(false);
        };
        let Some(phase) = self.find_build_phase(target, PhaseKind::Frameworks)? else {
            return Ok(false);
        };
        let Some(build_file) = self.find_build_file(&phase, &file)? else {
            return Ok(false);
        };
        self.graph_mut()
            .remove_from_list(&phase, "files", &Value::Ref(build_file.clone()))?;
        if self.graph().referrers(&build_file).is_empty() {
            self.graph_mut().remove_node(&build_file)?;
        }
        Ok(true)
    }

    pub fn contains_framework(&self, target: &Identifier, name: &str) -> Result<bool> {
        let Some(file) = self.find_framework_file(name) else {
            return Ok(false);
        };
        match self.find_build_phase(target, PhaseKind::Frameworks)? {
            Some(phase) => Ok(self.find_build_file(&phase, &file)?.is_some()),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::tests::base;

    #[test]
    fn existing_phases_are_reused() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        let existing = p.find_build_phase(&target, PhaseKind::Sources).unwrap();
        assert!(existing.is_some());
        assert_eq!(
            Some(p.find_or_create_build_phase(&target, PhaseKind::Sources).unwrap()),
            existing
        );
    }

    #[test]
    fn missing_phase_is_appended() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        assert!(p.find_build_phase(&target, PhaseKind::Headers).unwrap().is_none());
        let headers = p
            .find_or_create_build_phase(&target, PhaseKind::Headers)
            .unwrap();
        assert_eq!(p.build_phases(&target).unwrap().last(), Some(&headers));
    }

    #[test]
    fn dangling_build_file_leaves_phase_untouched() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        let phase = p
            .find_build_phase(&target, PhaseKind::Sources)
            .unwrap()
            .unwrap();
        let before = p.graph().node(&phase).unwrap().clone();
        let nodes_before = p.graph().node_count();
        let ghost = Identifier::from_u128(0xDEAD);

        let err = p.add_file_to_build_phase(&phase, &ghost, None).unwrap_err();
        assert!(matches!(
            err,
            EditError::Graph(GraphError::DanglingReference { .. })
        ));
        let err = p.add_file_to_build(&target, &ghost).unwrap_err();
        assert!(matches!(
            err,
            EditError::Graph(GraphError::DanglingReference { .. })
        ));
        assert_eq!(p.graph().node(&phase).unwrap(), &before);
        assert_eq!(p.graph().node_count(), nodes_before);
    }

    #[test]
    fn add_file_to_build_picks_phase_and_is_idempotent() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        let header = p.add_file("x.h", "Classes/x.h", SourceTree::Source).unwrap();
        let bf = p.add_file_to_build(&target, &header).unwrap();
        assert_eq!(p.add_file_to_build(&target, &header).unwrap(), bf);
        let headers = p
            .find_build_phase(&target, PhaseKind::Headers)
            .unwrap()
            .unwrap();
        assert_eq!(p.graph().node(&headers).unwrap().ref_list("files"), vec![&bf]);

        assert!(p.remove_file_from_build(&target, &header).unwrap());
        assert!(!p.graph().contains(&bf));
        assert!(!p.remove_file_from_build(&target, &header).unwrap());
    }

    #[test]
    fn plain_files_are_not_built() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        let plist = p.add_file("Info.plist", "Info.plist", SourceTree::Source).unwrap();
        assert!(matches!(
            p.add_file_to_build(&target, &plist),
            Err(EditError::Invalid(_))
        ));
    }

    #[test]
    fn frameworks_link_once() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        assert!(!p.contains_framework(&target, "GameKit.framework").unwrap());
        let bf = p.add_framework(&target, "GameKit.framework", true).unwrap();
        assert_eq!(p.add_framework(&target, "GameKit.framework", true).unwrap(), bf);
        assert!(p.contains_framework(&target, "GameKit.framework").unwrap());

        let text = p.to_text().unwrap();
        assert!(text.contains(
            "/* GameKit.framework in Frameworks */ = {isa = PBXBuildFile; fileRef = "
        ));
        assert!(text.contains("settings = {ATTRIBUTES = (Weak, ); }; };"));
        assert!(text.contains("path = System/Library/Frameworks/GameKit.framework; sourceTree = SDKROOT; };"));

        assert!(p.remove_framework(&target, "GameKit.framework").unwrap());
        assert!(!p.contains_framework(&target, "GameKit.framework").unwrap());
        assert!(p.find_framework_file("GameKit.framework").is_some());
    }

    #[test]
    fn shell_script_phase_found_by_name() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        let a = p
            .add_shell_script_build_phase(&target, "Strip", "/bin/sh", "echo strip\n")
            .unwrap();
        let b = p
            .add_shell_script_build_phase(&target, "Strip", "/bin/sh", "echo strip\n")
            .unwrap();
        assert_eq!(a, b);
        let text = p.to_text().unwrap();
        assert!(text.contains("/* Strip */ = {"));
        assert!(text.contains("shellScript = \"echo strip\\n\";"));
    }

    #[test]
    fn copy_files_phase_found_by_name() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        let a = p
            .add_copy_files_build_phase(&target, "Embed Frameworks", "", 10)
            .unwrap();
        assert_eq!(
            p.add_copy_files_build_phase(&target, "Embed Frameworks", "", 10)
                .unwrap(),
            a
        );
        assert!(p.to_text().unwrap().contains("/* Embed Frameworks */"));
    }

    #[test]
    fn framework_for_non_target_changes_nothing() {
        let mut p = base();
        let before = p.to_text().unwrap();
        let project = p.project_id().unwrap();
        assert!(matches!(
            p.add_framework(&project, "Zzz.framework", false),
            Err(EditError::Invalid(_))
        ));
        assert_eq!(p.to_text().unwrap(), before);
        assert!(p.find_framework_file("Zzz.framework").is_none());
    }
}
