//! System capabilities: the capability table and the project-side half
//! of enabling one.

use std::fmt;

use tracing::debug;
use xcproj_core::{Dict, Identifier, Value};

use crate::error::{EditError, Result};
use crate::files::SourceTree;
use crate::project::Project;

/// One entry of the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Key under `SystemCapabilities` in the target attributes.
    pub id: &'static str,
    /// Whether enabling it writes entitlements.
    pub requires_entitlements: bool,
    /// System framework linked when the capability is added.
    pub framework: Option<&'static str>,
    /// The framework is only linked when explicitly requested.
    pub optional_framework: bool,
}

const fn cap(id: &'static str, requires_entitlements: bool, framework: Option<&'static str>) -> Capability {
    Capability {
        id,
        requires_entitlements,
        framework,
        optional_framework: false,
    }
}

impl Capability {
    pub const APPLE_PAY: Capability = cap("com.apple.ApplePay", true, Some("PassKit.framework"));
    pub const APP_GROUPS: Capability = cap("com.apple.ApplicationGroups.iOS", true, None);
    pub const ASSOCIATED_DOMAINS: Capability = cap("com.apple.SafariKeychain", true, None);
    pub const BACKGROUND_MODES: Capability = cap("com.apple.BackgroundModes", false, None);
    pub const DATA_PROTECTION: Capability = cap("com.apple.DataProtection", true, None);
    pub const GAME_CENTER: Capability = cap("com.apple.GameCenter", false, Some("GameKit.framework"));
    pub const HEALTH_KIT: Capability = cap("com.apple.HealthKit", true, Some("HealthKit.framework"));
    pub const HOME_KIT: Capability = cap("com.apple.HomeKit", true, Some("HomeKit.framework"));
    pub const ICLOUD: Capability = Capability {
        optional_framework: true,
        ..cap("com.apple.iCloud", true, Some("CloudKit.framework"))
    };
    pub const IN_APP_PURCHASE: Capability =
        cap("com.apple.InAppPurchase", false, Some("StoreKit.framework"));
    pub const INTER_APP_AUDIO: Capability =
        cap("com.apple.InterAppAudio", true, Some("AudioToolbox.framework"));
    pub const KEYCHAIN_SHARING: Capability = cap("com.apple.KeychainSharing", true, None);
    pub const MAPS: Capability = cap("com.apple.Maps.iOS", false, Some("MapKit.framework"));
    pub const PERSONAL_VPN: Capability =
        cap("com.apple.VPNLite", true, Some("NetworkExtension.framework"));
    pub const PUSH_NOTIFICATIONS: Capability = cap("com.apple.Push", true, None);
    pub const SIRI: Capability = cap("com.apple.Siri", true, None);
    pub const WALLET: Capability = cap("com.apple.Wallet", true, Some("PassKit.framework"));
    pub const WIRELESS_ACCESSORY: Capability =
        cap("com.apple.WAC", true, Some("ExternalAccessory.framework"));

    pub const ALL: [Capability; 18] = [
        Self::APPLE_PAY,
        Self::APP_GROUPS,
        Self::ASSOCIATED_DOMAINS,
        Self::BACKGROUND_MODES,
        Self::DATA_PROTECTION,
        Self::GAME_CENTER,
        Self::HEALTH_KIT,
        Self::HOME_KIT,
        Self::ICLOUD,
        Self::IN_APP_PURCHASE,
        Self::INTER_APP_AUDIO,
        Self::KEYCHAIN_SHARING,
        Self::MAPS,
        Self::PERSONAL_VPN,
        Self::PUSH_NOTIFICATIONS,
        Self::SIRI,
        Self::WALLET,
        Self::WIRELESS_ACCESSORY,
    ];

    pub fn by_id(id: &str) -> Option<Capability> {
        Self::ALL.iter().copied().find(|c| c.id == id)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}

/// Set `path` (the last element being the key) in a chain of nested
/// dictionaries, creating or replacing the intermediate ones.
fn set_nested(dict: &mut Dict, path: &[&str], value: Value) {
    match path {
        [] => {}
        [key] => {
            dict.insert(key.to_string(), value);
        }
        [key, rest @ ..] => {
            let mut inner = match dict.remove(*key) {
                Some(Value::Dict(inner)) => inner,
                _ => Dict::new(),
            };
            set_nested(&mut inner, rest, value);
            dict.insert(key.to_string(), Value::Dict(inner));
        }
    }
}

impl Project {
    /// Mark `capability` enabled for `target` in the project attributes
    /// (`TargetAttributes.<target>.SystemCapabilities.<id>.enabled = 1`).
    pub fn enable_system_capability(&mut self, target: &Identifier, capability: &str) -> Result<()> {
        if !self.node(target)?.kind.is_target() {
            return Err(EditError::invalid(format!("{target} is not a target")));
        }
        let project = self.project_id()?;
        let mut attributes = match self.node(&project)?.field("attributes") {
            Some(Value::Dict(attributes)) => attributes.clone(),
            _ => Dict::new(),
        };
        let before = attributes.clone();
        set_nested(
            &mut attributes,
            &[
                "TargetAttributes",
                target.as_str(),
                "SystemCapabilities",
                capability,
                "enabled",
            ],
            Value::string("1"),
        );
        if attributes != before {
            self.graph_mut()
                .set_field(&project, "attributes", Value::Dict(attributes))?;
            debug!(%target, capability, "enabled system capability");
        }
        Ok(())
    }

    /// Whether `capability` is recorded as enabled for `target`.
    pub fn has_system_capability(&self, target: &Identifier, capability: &str) -> Result<bool> {
        let mut value = self.project_node()?.field("attributes");
        for key in ["TargetAttributes", target.as_str(), "SystemCapabilities", capability, "enabled"] {
            value = value.and_then(Value::as_dict).and_then(|d| d.get(key));
        }
        Ok(value.and_then(Value::as_str) == Some("1"))
    }

    /// The project half of adding a capability to `target`: point
    /// `CODE_SIGN_ENTITLEMENTS` at `entitlements` (a path relative to the
    /// project root) and reference that file, link the capability's
    /// framework, and record the system capability.
    ///
    /// `entitlements` is required exactly when the capability writes
    /// entitlements.
    pub fn add_capability(
        &mut self,
        target: &Identifier,
        capability: Capability,
        entitlements: Option<&str>,
        add_optional_framework: bool,
    ) -> Result<()> {
        if !self.node(target)?.kind.is_target() {
            return Err(EditError::invalid(format!("{target} is not a target")));
        }
        let entitlements = match entitlements {
            _ if !capability.requires_entitlements => None,
            Some(path) if !path.is_empty() => Some(path),
            _ => {
                return Err(EditError::invalid(format!(
                    "{capability} needs an entitlements file"
                )))
            }
        };
        self.atomically(|p| {
            if let Some(path) = entitlements {
                p.set_build_property(target, "CODE_SIGN_ENTITLEMENTS", path)?;
                if p.find_file_by_project_path(path).is_none() {
                    p.add_file(path, path, SourceTree::Source)?;
                }
            }
            if let Some(framework) = capability.framework {
                if !capability.optional_framework || add_optional_framework {
                    p.add_framework(target, framework, false)?;
                }
            }
            p.enable_system_capability(target, capability.id)
        })?;
        debug!(%target, %capability, "added capability");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::tests::base;

    #[test]
    fn table_lookup() {
        assert_eq!(Capability::by_id("com.apple.iCloud"), Some(Capability::ICLOUD));
        assert!(Capability::ICLOUD.optional_framework);
        assert!(!Capability::GAME_CENTER.requires_entitlements);
        assert_eq!(Capability::by_id("com.example.nope"), None);
        let mut ids: Vec<&str> = Capability::ALL.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), Capability::ALL.len());
    }

    #[test]
    fn enabling_records_target_attribute_once() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        assert!(!p.has_system_capability(&target, "com.apple.Push").unwrap());
        p.enable_system_capability(&target, "com.apple.Push").unwrap();
        let text = p.to_text().unwrap();
        p.enable_system_capability(&target, "com.apple.Push").unwrap();
        assert_eq!(p.to_text().unwrap(), text);
        assert!(p.has_system_capability(&target, "com.apple.Push").unwrap());
        assert!(text.contains("com.apple.Push = {\n"));
        assert!(text.contains("enabled = 1;\n"));
    }

    #[test]
    fn entitlements_capability_needs_a_path() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        assert!(matches!(
            p.add_capability(&target, Capability::SIRI, None, false),
            Err(EditError::Invalid(_))
        ));
        assert!(matches!(
            p.add_capability(&target, Capability::SIRI, Some(""), false),
            Err(EditError::Invalid(_))
        ));
    }

    #[test]
    fn optional_framework_only_when_asked() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        p.add_capability(&target, Capability::ICLOUD, Some("App/app.entitlements"), false)
            .unwrap();
        assert!(!p.contains_framework(&target, "CloudKit.framework").unwrap());
        p.add_capability(&target, Capability::ICLOUD, Some("App/app.entitlements"), true)
            .unwrap();
        assert!(p.contains_framework(&target, "CloudKit.framework").unwrap());
        assert!(p.find_file_by_project_path("App/app.entitlements").is_some());
    }

    #[test]
    fn capability_without_entitlements_links_framework() {
        let mut p = base();
        let target = p.target("Unity-iPhone").unwrap();
        p.add_capability(&target, Capability::GAME_CENTER, None, false)
            .unwrap();
        assert!(p.contains_framework(&target, "GameKit.framework").unwrap());
        assert!(p.has_system_capability(&target, "com.apple.GameCenter").unwrap());
        let config = p.build_configuration_by_name(&target, "Debug").unwrap();
        assert_eq!(p.build_property(&config, "CODE_SIGN_ENTITLEMENTS").unwrap(), None);
    }

    #[test]
    fn failed_capability_changes_nothing() {
        let mut p = base();
        let before = p.to_text().unwrap();
        let main = p.main_group().unwrap();
        assert!(matches!(
            p.add_capability(&main, Capability::GAME_CENTER, None, false),
            Err(EditError::Invalid(_))
        ));
        assert_eq!(p.to_text().unwrap(), before);

        // CODE_SIGN_ENTITLEMENTS is written before the file is referenced;
        // a path naming no file fails on the second step.
        let target = p.target("Unity-iPhone").unwrap();
        assert!(matches!(
            p.add_capability(&target, Capability::SIRI, Some("App/"), false),
            Err(EditError::Invalid(_))
        ));
        assert_eq!(p.to_text().unwrap(), before);
        let config = p.build_configuration_by_name(&target, "Debug").unwrap();
        assert_eq!(p.build_property(&config, "CODE_SIGN_ENTITLEMENTS").unwrap(), None);
    }
}
