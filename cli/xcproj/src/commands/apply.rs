//! `xcproj apply`: run the capabilities listed in `xcproj.toml`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;
use xcproj_core::SequentialIds;
use xcproj_edit::CapabilityManager;

use crate::manifest::{XcprojManifest, MANIFEST_NAME};

pub fn run(cwd: &Path, config: Option<&Path>, deterministic_ids: bool) -> Result<()> {
    let (manifest, dir) = match config {
        Some(path) => {
            let manifest = XcprojManifest::load(path)?;
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (manifest, dir)
        }
        None => match XcprojManifest::find_and_load(cwd)? {
            Some(found) => found,
            None => bail!("no {MANIFEST_NAME} found in {} or any parent", cwd.display()),
        },
    };

    let settings = manifest.manager_config(&dir)?;
    let project_path = settings.project.clone();
    let mut manager = if deterministic_ids {
        CapabilityManager::open_with(settings, Box::new(SequentialIds::new()))
    } else {
        CapabilityManager::open(settings)
    }
    .with_context(|| format!("opening {}", project_path.display()))?;

    for recipe in &manifest.capabilities {
        let capability = recipe.capability();
        info!(%capability, "applying capability");
        recipe
            .apply(&mut manager)
            .with_context(|| format!("applying {capability}"))?;
    }
    manager
        .close()
        .with_context(|| format!("writing {}", project_path.display()))?;

    println!(
        "applied {} capabilit{} to {}",
        manifest.capabilities.len(),
        if manifest.capabilities.len() == 1 { "y" } else { "ies" },
        project_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BASE;
    use std::fs;

    const MANIFEST: &str = r#"
[project]
path = "Unity-iPhone.xcodeproj/project.pbxproj"
target = "Unity-iPhone"
entitlements = "Unity-iPhone/app.entitlements"

[[capability]]
kind = "siri"

[[capability]]
kind = "game-center"
"#;

    fn layout(manifest: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Unity-iPhone.xcodeproj")).unwrap();
        fs::write(root.join("Unity-iPhone.xcodeproj/project.pbxproj"), BASE).unwrap();
        fs::write(root.join(MANIFEST_NAME), manifest).unwrap();
        dir
    }

    #[test]
    fn applies_manifest_found_upward() {
        let dir = layout(MANIFEST);
        let nested = dir.path().join("Unity-iPhone");
        fs::create_dir_all(&nested).unwrap();
        run(&nested, None, true).unwrap();

        let project =
            fs::read_to_string(dir.path().join("Unity-iPhone.xcodeproj/project.pbxproj")).unwrap();
        assert!(project.contains("CODE_SIGN_ENTITLEMENTS = \"Unity-iPhone/app.entitlements\";"));
        assert!(project.contains("com.apple.Siri = {"));
        assert!(project.contains("GameKit.framework in Frameworks"));
        assert!(project.contains("000000000000000000000001"));

        let entitlements =
            fs::read_to_string(dir.path().join("Unity-iPhone/app.entitlements")).unwrap();
        assert!(entitlements.contains("<key>com.apple.developer.siri</key>"));
        let info = fs::read_to_string(dir.path().join("Info.plist")).unwrap();
        assert!(info.contains("<string>gamekit</string>"));
    }

    #[test]
    fn applying_twice_is_stable() {
        let dir = layout(MANIFEST);
        let manifest = dir.path().join(MANIFEST_NAME);
        run(dir.path(), Some(&manifest), true).unwrap();
        let path = dir.path().join("Unity-iPhone.xcodeproj/project.pbxproj");
        let once = fs::read_to_string(&path).unwrap();
        run(dir.path(), Some(&manifest), true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), once);
    }

    #[test]
    fn unknown_target_is_reported() {
        let dir = layout(&MANIFEST.replace("target = \"Unity-iPhone\"", "target = \"Nope\""));
        let err = run(dir.path(), None, true).unwrap_err();
        assert!(format!("{err:#}").contains("Nope"));
    }
}
