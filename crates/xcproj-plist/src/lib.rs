//! Flat property-list documents for Xcode projects.
//!
//! Entitlements files and `Info.plist` are ordered key/value dictionaries
//! with no cross-references. They are loaded with
//! [`PlistDocument::open`] (or started empty), edited in memory, and
//! written back with [`PlistDocument::flush`]. Writing twice without an
//! intervening edit yields identical bytes.

mod document;
mod error;
mod value;
mod xml;

pub use document::PlistDocument;
pub use error::{PlistError, Result};
pub use value::{PlistDict, PlistValue};
