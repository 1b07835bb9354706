//! `xcproj.toml` manifest parsing.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use xcproj_edit::{ManagerConfig, Recipe};

pub const MANIFEST_NAME: &str = "xcproj.toml";

/// The top-level manifest.
///
/// ```toml
/// [project]
/// path = "Unity-iPhone.xcodeproj/project.pbxproj"
/// target = "Unity-iPhone"
/// entitlements = "Unity-iPhone/app.entitlements"
///
/// [[capability]]
/// kind = "icloud"
/// cloud-kit = false
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct XcprojManifest {
    pub project: ProjectSection,
    /// Capabilities to apply, in order.
    #[serde(default, rename = "capability")]
    pub capabilities: Vec<Recipe>,
}

/// `[project]`: which documents to edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectSection {
    /// Project document, relative to the manifest directory.
    pub path: PathBuf,
    /// Target name; the first target when omitted.
    #[serde(default)]
    pub target: Option<String>,
    /// Entitlements file relative to the project root (the directory
    /// holding the `.xcodeproj` bundle).
    #[serde(default)]
    pub entitlements: Option<String>,
    /// Application metadata, relative to the manifest directory.
    #[serde(default)]
    pub info_plist: Option<PathBuf>,
}

impl XcprojManifest {
    /// Search upward from `start_dir` for `xcproj.toml`, parse it and return
    /// it with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_NAME);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing xcproj.toml")
    }

    /// Session settings with paths resolved against `dir`, the manifest's
    /// directory.
    pub fn manager_config(&self, dir: &Path) -> Result<ManagerConfig> {
        let entitlements = match &self.project.entitlements {
            Some(path) => path.clone(),
            None => {
                if let Some(recipe) = self
                    .capabilities
                    .iter()
                    .find(|r| r.capability().requires_entitlements)
                {
                    bail!(
                        "capability {} writes entitlements; set project.entitlements in {MANIFEST_NAME}",
                        recipe.capability()
                    );
                }
                String::new()
            }
        };
        let mut config = ManagerConfig::new(dir.join(&self.project.path), entitlements);
        if let Some(target) = &self.project.target {
            config = config.target(target.clone());
        }
        if let Some(info) = &self.project.info_plist {
            config = config.info_plist(dir.join(info));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xcproj_edit::{BackgroundMode, ICloudOptions};

    #[test]
    fn parse_full_manifest() {
        let manifest = XcprojManifest::from_str(
            r#"
[project]
path = "App.xcodeproj/project.pbxproj"
target = "App"
entitlements = "App/app.entitlements"
info-plist = "App/Info.plist"

[[capability]]
kind = "icloud"
cloud-kit = false

[[capability]]
kind = "background-modes"
modes = ["fetch", "remote-notification"]

[[capability]]
kind = "push-notifications"
development = false
"#,
        )
        .unwrap();
        assert_eq!(manifest.project.target.as_deref(), Some("App"));
        assert_eq!(
            manifest.project.info_plist.as_deref(),
            Some(Path::new("App/Info.plist"))
        );
        assert_eq!(manifest.capabilities.len(), 3);
        assert_eq!(
            manifest.capabilities[0],
            Recipe::ICloud(ICloudOptions {
                cloud_kit: false,
                ..ICloudOptions::default()
            })
        );
        assert_eq!(
            manifest.capabilities[1],
            Recipe::BackgroundModes {
                modes: vec![BackgroundMode::Fetch, BackgroundMode::RemoteNotification],
            }
        );
        assert_eq!(
            manifest.capabilities[2],
            Recipe::PushNotifications { development: false }
        );
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = XcprojManifest::from_str(
            r#"
[project]
path = "App.xcodeproj/project.pbxproj"
"#,
        )
        .unwrap();
        assert!(manifest.capabilities.is_empty());
        assert!(manifest.project.target.is_none());
    }

    #[test]
    fn reject_unknown_capability() {
        let bad = r#"
[project]
path = "App.xcodeproj/project.pbxproj"

[[capability]]
kind = "teleportation"
"#;
        assert!(XcprojManifest::from_str(bad).is_err());
    }

    #[test]
    fn reject_invalid_toml() {
        assert!(XcprojManifest::from_str("this is not valid toml [[[").is_err());
    }

    #[test]
    fn config_resolves_against_manifest_dir() {
        let manifest = XcprojManifest::from_str(
            r#"
[project]
path = "App.xcodeproj/project.pbxproj"
entitlements = "App/app.entitlements"
info-plist = "Info.plist"
"#,
        )
        .unwrap();
        let config = manifest.manager_config(Path::new("/work")).unwrap();
        assert_eq!(config.project, Path::new("/work/App.xcodeproj/project.pbxproj"));
        assert_eq!(config.entitlements, "App/app.entitlements");
        assert_eq!(config.info_plist.as_deref(), Some(Path::new("/work/Info.plist")));
        assert!(config.target.is_none());
    }

    #[test]
    fn entitlements_required_when_a_capability_writes_them() {
        let without = r#"
[project]
path = "App.xcodeproj/project.pbxproj"

[[capability]]
kind = "siri"
"#;
        let manifest = XcprojManifest::from_str(without).unwrap();
        let err = manifest.manager_config(Path::new("/work")).unwrap_err();
        assert!(err.to_string().contains("com.apple.Siri"));

        let game_center_only = r#"
[project]
path = "App.xcodeproj/project.pbxproj"

[[capability]]
kind = "game-center"
"#;
        let manifest = XcprojManifest::from_str(game_center_only).unwrap();
        assert!(manifest.manager_config(Path::new("/work")).is_ok());
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_NAME),
            "[project]\npath = \"A.xcodeproj/project.pbxproj\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found_dir) = XcprojManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.project.path, Path::new("A.xcodeproj/project.pbxproj"));
        assert_eq!(found_dir, dir.path());
    }
}
