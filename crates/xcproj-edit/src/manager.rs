//! Document-level lifecycle: one project, its entitlements and its
//! application metadata, opened together and flushed together.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use xcproj_core::{IdGenerator, Identifier};
use xcproj_plist::PlistDocument;

use crate::error::{EditError, Result};
use crate::project::Project;

/// Where the documents of one capability session live.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// The project document (`<root>/<Name>.xcodeproj/project.pbxproj`).
    pub project: PathBuf,
    /// Entitlements file, relative to the project root. Also the value
    /// written to `CODE_SIGN_ENTITLEMENTS`.
    pub entitlements: String,
    /// Target to edit; the first target of the project when unset.
    pub target: Option<String>,
    /// Application metadata file; `<root>/Info.plist` when unset.
    pub info_plist: Option<PathBuf>,
}

impl ManagerConfig {
    pub fn new(project: impl Into<PathBuf>, entitlements: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            entitlements: entitlements.into(),
            target: None,
            info_plist: None,
        }
    }

    pub fn target(mut self, name: impl Into<String>) -> Self {
        self.target = Some(name.into());
        self
    }

    pub fn info_plist(mut self, path: impl Into<PathBuf>) -> Self {
        self.info_plist = Some(path.into());
        self
    }
}

/// Directory the project's `SOURCE_ROOT` paths are relative to: the
/// directory holding the `.xcodeproj` bundle.
pub fn project_root(project: &Path) -> PathBuf {
    let dir = project.parent().unwrap_or_else(|| Path::new(""));
    let in_bundle = dir
        .extension()
        .is_some_and(|ext| ext == "xcodeproj");
    if in_bundle {
        dir.parent().unwrap_or_else(|| Path::new("")).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

/// An open capability session.
///
/// The project is read on open; the flat documents are read the first
/// time a recipe touches them (a missing file starts empty). Nothing is
/// written until [`CapabilityManager::flush`] or
/// [`CapabilityManager::close`], and no file stays open in between.
#[derive(Debug)]
pub struct CapabilityManager {
    project: Project,
    project_path: PathBuf,
    root: PathBuf,
    target: Identifier,
    entitlements_path: String,
    entitlements: Option<PlistDocument>,
    info_plist_path: PathBuf,
    info_plist: Option<PlistDocument>,
    dirty: bool,
}

impl CapabilityManager {
    pub fn open(config: ManagerConfig) -> Result<Self> {
        let project = Project::open(&config.project)?;
        Self::with_project(config, project)
    }

    /// Like [`CapabilityManager::open`], with an injected identifier
    /// source for new objects.
    pub fn open_with(config: ManagerConfig, generator: Box<dyn IdGenerator>) -> Result<Self> {
        let project = Project::open_with(&config.project, generator)?;
        Self::with_project(config, project)
    }

    fn with_project(config: ManagerConfig, project: Project) -> Result<Self> {
        let target = match &config.target {
            Some(name) => project.target(name)?,
            None => project
                .targets()?
                .into_iter()
                .next()
                .ok_or_else(|| EditError::TargetNotFound("<first target>".into()))?,
        };
        let root = project_root(&config.project);
        let info_plist_path = config
            .info_plist
            .clone()
            .unwrap_or_else(|| root.join("Info.plist"));
        debug!(
            project = %config.project.display(),
            %target,
            entitlements = %config.entitlements,
            "opened capability session"
        );
        Ok(Self {
            project,
            project_path: config.project,
            root,
            target,
            entitlements_path: config.entitlements,
            entitlements: None,
            info_plist_path,
            info_plist: None,
            dirty: false,
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Mutable access to the project; the session becomes dirty.
    pub fn project_mut(&mut self) -> &mut Project {
        self.dirty = true;
        &mut self.project
    }

    /// The target recipes apply to.
    pub fn target(&self) -> &Identifier {
        &self.target
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// Entitlements path relative to the project root.
    pub fn entitlements_path(&self) -> &str {
        &self.entitlements_path
    }

    pub fn entitlements_file(&self) -> PathBuf {
        self.root.join(&self.entitlements_path)
    }

    pub fn info_plist_file(&self) -> &Path {
        &self.info_plist_path
    }

    /// The entitlements document, if a recipe has touched it.
    pub fn entitlements(&self) -> Option<&PlistDocument> {
        self.entitlements.as_ref()
    }

    pub fn info_plist(&self) -> Option<&PlistDocument> {
        self.info_plist.as_ref()
    }

    /// The entitlements document, read on first use.
    pub fn entitlements_mut(&mut self) -> Result<&mut PlistDocument> {
        if self.entitlements.is_none() {
            self.entitlements = Some(PlistDocument::open_or_empty(self.entitlements_file())?);
        }
        self.dirty = true;
        Ok(self.entitlements.get_or_insert_with(PlistDocument::new))
    }

    /// The application metadata document, read on first use.
    pub fn info_plist_mut(&mut self) -> Result<&mut PlistDocument> {
        if self.info_plist.is_none() {
            self.info_plist = Some(PlistDocument::open_or_empty(&self.info_plist_path)?);
        }
        self.dirty = true;
        Ok(self.info_plist.get_or_insert_with(PlistDocument::new))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the project and every flat document that was touched.
    /// Flushing again without edits writes the same bytes.
    pub fn flush(&mut self) -> Result<()> {
        self.project.save(&self.project_path)?;
        if let Some(doc) = &self.entitlements {
            doc.flush(self.root.join(&self.entitlements_path))?;
        }
        if let Some(doc) = &self.info_plist {
            doc.flush(&self.info_plist_path)?;
        }
        self.dirty = false;
        info!(project = %self.project_path.display(), "flushed capability session");
        Ok(())
    }

    /// Flush pending edits and end the session.
    pub fn close(mut self) -> Result<()> {
        if self.dirty {
            self.flush()?;
        }
        Ok(())
    }
}

impl Drop for CapabilityManager {
    fn drop(&mut self) {
        if self.dirty {
            warn!(
                project = %self.project_path.display(),
                "capability session dropped with unflushed edits"
            );
        }
    }
}
