//! Editing Xcode projects.
//!
//! [`Project`] wraps one project graph with composite operations (targets,
//! groups, files, build phases, build settings, frameworks, system
//! capabilities) that find before they create. [`CapabilityManager`]
//! pairs a project with its entitlements and Info.plist documents and
//! runs capability [`Recipe`]s against all three.

pub mod capability;
mod error;
pub mod files;
mod manager;
pub mod phases;
mod project;
pub mod recipes;
mod settings;

pub use capability::Capability;
pub use error::{EditError, Result};
pub use files::{FileKind, SourceTree};
pub use manager::{project_root, CapabilityManager, ManagerConfig};
pub use phases::PhaseKind;
pub use project::{ProductType, Project};
pub use recipes::{BackgroundMode, ICloudOptions, MapsMode, Recipe};
