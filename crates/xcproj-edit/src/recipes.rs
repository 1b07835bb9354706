//! The capability recipe catalogue.
//!
//! Each recipe writes the entitlement and application-metadata keys of
//! one capability, then performs the project half through
//! [`Project::add_capability`](crate::Project::add_capability). Array
//! entries are appended only when missing, so applying a recipe twice
//! leaves every document as applying it once.

use serde::Deserialize;
use tracing::debug;
use xcproj_plist::{PlistDict, PlistValue};

use crate::capability::Capability;
use crate::error::Result;
use crate::manager::CapabilityManager;

const CONTAINER_IDENTIFIERS: &str = "com.apple.developer.icloud-container-identifiers";
const ICLOUD_SERVICES: &str = "com.apple.developer.icloud-services";
const UBIQUITY_CONTAINERS: &str = "com.apple.developer.ubiquity-container-identifiers";
const UBIQUITY_KVSTORE: &str = "com.apple.developer.ubiquity-kvstore-identifier";
const DEFAULT_CONTAINER: &str = "iCloud.$(CFBundleIdentifier)";
const KVSTORE_VALUE: &str = "$(TeamIdentifierPrefix)$(CFBundleIdentifier)";

const APS_ENVIRONMENT: &str = "aps-environment";
const PASS_TYPE_IDENTIFIERS: &str = "com.apple.developer.pass-type-identifiers";
const TEAM_PREFIX: &str = "$(TeamIdentifierPrefix)";
const APP_PREFIX: &str = "$(AppIdentifierPrefix)";
const SIRI: &str = "com.apple.developer.siri";
const IN_APP_PAYMENTS: &str = "com.apple.developer.in-app-payments";
const VPN_API: &str = "com.apple.developer.networking.vpn.api";
const KEYCHAIN_GROUPS: &str = "keychain-access-groups";
const INTER_APP_AUDIO: &str = "inter-app-audio";
const ASSOCIATED_DOMAINS: &str = "com.apple.developer.associated-domains";
const APP_GROUPS: &str = "com.apple.security.application-groups";
const HOMEKIT: &str = "com.apple.developer.homekit";
const DATA_PROTECTION: &str = "com.apple.developer.default-data-protection";
const HEALTHKIT: &str = "com.apple.developer.healthkit";
const WIRELESS_CONFIGURATION: &str = "com.apple.external-accessory.wireless-configuration";

const REQUIRED_DEVICE_CAPABILITIES: &str = "UIRequiredDeviceCapabilities";
const BACKGROUND_MODES: &str = "UIBackgroundModes";
const DIRECTIONS_MODES: &str = "MKDirectionsApplicationSupportedModes";
const DOCUMENT_TYPES: &str = "CFBundleDocumentTypes";
const DIRECTIONS_REQUEST: &str = "MKDirectionsRequest";
const DIRECTIONS_CONTENT_TYPE: &str = "com.apple.maps.directionsrequest";

/// iCloud services to enable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ICloudOptions {
    pub key_value_storage: bool,
    pub documents: bool,
    pub cloud_kit: bool,
    /// Add the default container when only CloudKit is enabled.
    pub default_containers: bool,
    pub custom_containers: Vec<String>,
}

impl Default for ICloudOptions {
    fn default() -> Self {
        Self {
            key_value_storage: true,
            documents: true,
            cloud_kit: true,
            default_containers: true,
            custom_containers: Vec::new(),
        }
    }
}

/// Background execution modes (`UIBackgroundModes` values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundMode {
    Audio,
    Location,
    Voip,
    NewsstandContent,
    ExternalAccessory,
    BluetoothCentral,
    BluetoothPeripheral,
    Fetch,
    RemoteNotification,
}

impl BackgroundMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BackgroundMode::Audio => "audio",
            BackgroundMode::Location => "location",
            BackgroundMode::Voip => "voip",
            BackgroundMode::NewsstandContent => "newsstand-content",
            BackgroundMode::ExternalAccessory => "external-accessory",
            BackgroundMode::BluetoothCentral => "bluetooth-central",
            BackgroundMode::BluetoothPeripheral => "bluetooth-peripheral",
            BackgroundMode::Fetch => "fetch",
            BackgroundMode::RemoteNotification => "remote-notification",
        }
    }
}

/// Transport modes a routing app supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapsMode {
    Airplane,
    Bike,
    Bus,
    Car,
    Ferry,
    Other,
    Pedestrian,
    RideSharing,
    StreetCar,
    Subway,
    Taxi,
    Train,
}

impl MapsMode {
    pub fn as_str(self) -> &'static str {
        match self {
            MapsMode::Airplane => "MKDirectionsModePlane",
            MapsMode::Bike => "MKDirectionsModeBike",
            MapsMode::Bus => "MKDirectionsModeBus",
            MapsMode::Car => "MKDirectionsModeCar",
            MapsMode::Ferry => "MKDirectionsModeFerry",
            MapsMode::Other => "MKDirectionsModeOther",
            MapsMode::Pedestrian => "MKDirectionsModePedestrian",
            MapsMode::RideSharing => "MKDirectionsModeRideShare",
            MapsMode::StreetCar => "MKDirectionsModeStreetCar",
            MapsMode::Subway => "MKDirectionsModeSubway",
            MapsMode::Taxi => "MKDirectionsModeTaxi",
            MapsMode::Train => "MKDirectionsModeTrain",
        }
    }
}

fn yes() -> bool {
    true
}

/// One recipe with its options, as listed in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Recipe {
    #[serde(rename = "icloud")]
    ICloud(ICloudOptions),
    PushNotifications {
        #[serde(default = "yes")]
        development: bool,
    },
    GameCenter,
    Wallet {
        #[serde(default)]
        passes: Vec<String>,
    },
    Siri,
    ApplePay {
        merchants: Vec<String>,
    },
    InAppPurchase,
    Maps {
        #[serde(default)]
        modes: Vec<MapsMode>,
    },
    PersonalVpn,
    BackgroundModes {
        modes: Vec<BackgroundMode>,
    },
    KeychainSharing {
        groups: Vec<String>,
    },
    InterAppAudio,
    AssociatedDomains {
        domains: Vec<String>,
    },
    AppGroups {
        groups: Vec<String>,
    },
    HomeKit,
    DataProtection,
    HealthKit,
    WirelessAccessoryConfiguration,
}

impl Recipe {
    /// The capability table entry this recipe enables.
    pub fn capability(&self) -> Capability {
        match self {
            Recipe::ICloud(_) => Capability::ICLOUD,
            Recipe::PushNotifications { .. } => Capability::PUSH_NOTIFICATIONS,
            Recipe::GameCenter => Capability::GAME_CENTER,
            Recipe::Wallet { .. } => Capability::WALLET,
            Recipe::Siri => Capability::SIRI,
            Recipe::ApplePay { .. } => Capability::APPLE_PAY,
            Recipe::InAppPurchase => Capability::IN_APP_PURCHASE,
            Recipe::Maps { .. } => Capability::MAPS,
            Recipe::PersonalVpn => Capability::PERSONAL_VPN,
            Recipe::BackgroundModes { .. } => Capability::BACKGROUND_MODES,
            Recipe::KeychainSharing { .. } => Capability::KEYCHAIN_SHARING,
            Recipe::InterAppAudio => Capability::INTER_APP_AUDIO,
            Recipe::AssociatedDomains { .. } => Capability::ASSOCIATED_DOMAINS,
            Recipe::AppGroups { .. } => Capability::APP_GROUPS,
            Recipe::HomeKit => Capability::HOME_KIT,
            Recipe::DataProtection => Capability::DATA_PROTECTION,
            Recipe::HealthKit => Capability::HEALTH_KIT,
            Recipe::WirelessAccessoryConfiguration => Capability::WIRELESS_ACCESSORY,
        }
    }

    pub fn apply(&self, manager: &mut CapabilityManager) -> Result<()> {
        match self {
            Recipe::ICloud(options) => manager.add_icloud(options),
            Recipe::PushNotifications { development } => manager.add_push_notifications(*development),
            Recipe::GameCenter => manager.add_game_center(),
            Recipe::Wallet { passes } => manager.add_wallet(passes),
            Recipe::Siri => manager.add_siri(),
            Recipe::ApplePay { merchants } => manager.add_apple_pay(merchants),
            Recipe::InAppPurchase => manager.add_in_app_purchase(),
            Recipe::Maps { modes } => manager.add_maps(modes),
            Recipe::PersonalVpn => manager.add_personal_vpn(),
            Recipe::BackgroundModes { modes } => manager.add_background_modes(modes),
            Recipe::KeychainSharing { groups } => manager.add_keychain_sharing(groups),
            Recipe::InterAppAudio => manager.add_inter_app_audio(),
            Recipe::AssociatedDomains { domains } => manager.add_associated_domains(domains),
            Recipe::AppGroups { groups } => manager.add_app_groups(groups),
            Recipe::HomeKit => manager.add_home_kit(),
            Recipe::DataProtection => manager.add_data_protection(),
            Recipe::HealthKit => manager.add_health_kit(),
            Recipe::WirelessAccessoryConfiguration => manager.add_wireless_accessory_configuration(),
        }
    }
}

impl CapabilityManager {
    fn finish(&mut self, capability: Capability, add_optional_framework: bool) -> Result<()> {
        let target = self.target().clone();
        let entitlements = capability
            .requires_entitlements
            .then(|| self.entitlements_path().to_string());
        self.project_mut().add_capability(
            &target,
            capability,
            entitlements.as_deref(),
            add_optional_framework,
        )?;
        debug!(%capability, "applied recipe");
        Ok(())
    }

    pub fn add_icloud(&mut self, options: &ICloudOptions) -> Result<()> {
        let ent = self.entitlements_mut()?;
        if options.documents || options.cloud_kit {
            let mut containers = Vec::new();
            if options.documents || options.default_containers {
                containers.push(DEFAULT_CONTAINER.to_string());
            }
            containers.extend(options.custom_containers.iter().cloned());
            ent.append_unique(CONTAINER_IDENTIFIERS, containers);

            let mut services = Vec::new();
            if options.documents {
                services.push("CloudDocuments");
            }
            if options.cloud_kit {
                services.push("CloudKit");
            }
            ent.append_unique(ICLOUD_SERVICES, services);

            if options.documents {
                ent.append_unique(UBIQUITY_CONTAINERS, [DEFAULT_CONTAINER]);
            }
        }
        if options.key_value_storage {
            ent.set(UBIQUITY_KVSTORE, KVSTORE_VALUE);
        }
        self.finish(Capability::ICLOUD, options.cloud_kit)
    }

    pub fn add_push_notifications(&mut self, development: bool) -> Result<()> {
        let environment = if development { "development" } else { "production" };
        self.entitlements_mut()?.set(APS_ENVIRONMENT, environment);
        self.finish(Capability::PUSH_NOTIFICATIONS, false)
    }

    pub fn add_game_center(&mut self) -> Result<()> {
        self.info_plist_mut()?
            .append_unique(REQUIRED_DEVICE_CAPABILITIES, ["gamekit"]);
        self.finish(Capability::GAME_CENTER, false)
    }

    /// Wallet passes; an empty list allows every pass type of the team.
    pub fn add_wallet(&mut self, passes: &[String]) -> Result<()> {
        let ids: Vec<String> = if passes.is_empty() {
            vec![format!("{TEAM_PREFIX}*")]
        } else {
            passes.iter().map(|p| format!("{TEAM_PREFIX}{p}")).collect()
        };
        self.entitlements_mut()?.append_unique(PASS_TYPE_IDENTIFIERS, ids);
        self.finish(Capability::WALLET, false)
    }

    pub fn add_siri(&mut self) -> Result<()> {
        self.entitlements_mut()?.set(SIRI, true);
        self.finish(Capability::SIRI, false)
    }

    pub fn add_apple_pay(&mut self, merchants: &[String]) -> Result<()> {
        self.entitlements_mut()?
            .append_unique(IN_APP_PAYMENTS, merchants.iter().cloned());
        self.finish(Capability::APPLE_PAY, false)
    }

    pub fn add_in_app_purchase(&mut self) -> Result<()> {
        self.finish(Capability::IN_APP_PURCHASE, false)
    }

    pub fn add_maps(&mut self, modes: &[MapsMode]) -> Result<()> {
        let info = self.info_plist_mut()?;
        info.append_unique(DIRECTIONS_MODES, modes.iter().map(|m| m.as_str()));

        let request_type = PlistDict::from([
            ("CFBundleTypeName".to_string(), PlistValue::from(DIRECTIONS_REQUEST)),
            (
                "LSItemContentTypes".to_string(),
                PlistValue::from(vec![DIRECTIONS_CONTENT_TYPE]),
            ),
        ]);
        info.update_array(DOCUMENT_TYPES, |types| {
            let present = types.iter().any(|t| {
                t.as_dict()
                    .and_then(|d| d.get("CFBundleTypeName"))
                    .and_then(PlistValue::as_str)
                    == Some(DIRECTIONS_REQUEST)
            });
            if !present {
                types.push(PlistValue::Dict(request_type));
            }
        });
        self.finish(Capability::MAPS, false)
    }

    pub fn add_personal_vpn(&mut self) -> Result<()> {
        self.entitlements_mut()?.append_unique(VPN_API, ["allow-vpn"]);
        self.finish(Capability::PERSONAL_VPN, false)
    }

    pub fn add_background_modes(&mut self, modes: &[BackgroundMode]) -> Result<()> {
        self.info_plist_mut()?
            .append_unique(BACKGROUND_MODES, modes.iter().map(|m| m.as_str()));
        self.finish(Capability::BACKGROUND_MODES, false)
    }

    pub fn add_keychain_sharing(&mut self, groups: &[String]) -> Result<()> {
        let groups = groups.iter().map(|g| format!("{APP_PREFIX}{g}"));
        self.entitlements_mut()?.append_unique(KEYCHAIN_GROUPS, groups);
        self.finish(Capability::KEYCHAIN_SHARING, false)
    }

    pub fn add_inter_app_audio(&mut self) -> Result<()> {
        self.entitlements_mut()?.set(INTER_APP_AUDIO, true);
        self.finish(Capability::INTER_APP_AUDIO, false)
    }

    pub fn add_associated_domains(&mut self, domains: &[String]) -> Result<()> {
        self.entitlements_mut()?
            .append_unique(ASSOCIATED_DOMAINS, domains.iter().cloned());
        self.finish(Capability::ASSOCIATED_DOMAINS, false)
    }

    pub fn add_app_groups(&mut self, groups: &[String]) -> Result<()> {
        self.entitlements_mut()?
            .append_unique(APP_GROUPS, groups.iter().cloned());
        self.finish(Capability::APP_GROUPS, false)
    }

    pub fn add_home_kit(&mut self) -> Result<()> {
        self.entitlements_mut()?.set(HOMEKIT, true);
        self.finish(Capability::HOME_KIT, false)
    }

    pub fn add_data_protection(&mut self) -> Result<()> {
        self.entitlements_mut()?
            .set(DATA_PROTECTION, "NSFileProtectionComplete");
        self.finish(Capability::DATA_PROTECTION, false)
    }

    pub fn add_health_kit(&mut self) -> Result<()> {
        self.info_plist_mut()?
            .append_unique(REQUIRED_DEVICE_CAPABILITIES, ["healthkit"]);
        self.entitlements_mut()?.set(HEALTHKIT, true);
        self.finish(Capability::HEALTH_KIT, false)
    }

    pub fn add_wireless_accessory_configuration(&mut self) -> Result<()> {
        self.entitlements_mut()?.set(WIRELESS_CONFIGURATION, true);
        self.finish(Capability::WIRELESS_ACCESSORY, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icloud_options_default_to_everything() {
        let options = ICloudOptions::default();
        assert!(options.key_value_storage && options.documents && options.cloud_kit);
        assert!(options.custom_containers.is_empty());
    }

    #[test]
    fn mode_names() {
        assert_eq!(MapsMode::RideSharing.as_str(), "MKDirectionsModeRideShare");
        assert_eq!(MapsMode::Airplane.as_str(), "MKDirectionsModePlane");
        assert_eq!(BackgroundMode::Fetch.as_str(), "fetch");
        assert_eq!(BackgroundMode::NewsstandContent.as_str(), "newsstand-content");
    }

    #[test]
    fn every_recipe_maps_to_a_table_entry() {
        let recipes = [
            Recipe::ICloud(ICloudOptions::default()),
            Recipe::PushNotifications { development: true },
            Recipe::GameCenter,
            Recipe::Wallet { passes: Vec::new() },
            Recipe::Siri,
            Recipe::ApplePay { merchants: Vec::new() },
            Recipe::InAppPurchase,
            Recipe::Maps { modes: Vec::new() },
            Recipe::PersonalVpn,
            Recipe::BackgroundModes { modes: Vec::new() },
            Recipe::KeychainSharing { groups: Vec::new() },
            Recipe::InterAppAudio,
            Recipe::AssociatedDomains { domains: Vec::new() },
            Recipe::AppGroups { groups: Vec::new() },
            Recipe::HomeKit,
            Recipe::DataProtection,
            Recipe::HealthKit,
            Recipe::WirelessAccessoryConfiguration,
        ];
        let mut ids: Vec<&str> = recipes.iter().map(|r| r.capability().id).collect();
        ids.sort_unstable();
        let mut all: Vec<&str> = Capability::ALL.iter().map(|c| c.id).collect();
        all.sort_unstable();
        assert_eq!(ids, all);
    }
}
