//! Build settings applied uniformly across configurations.
//!
//! Every setter takes an `owner`: a target or the project applies the edit
//! to each of its build configurations, a single `XCBuildConfiguration`
//! applies it to that configuration only.

use tracing::debug;
use xcproj_core::{Dict, Identifier, Value};

use crate::error::{EditError, Result};
use crate::project::Project;

const BUILD_SETTINGS: &str = "buildSettings";

impl Project {
    fn settings_of(&self, config: &Identifier) -> Result<Dict> {
        let node = self.node(config)?;
        match node.field(BUILD_SETTINGS) {
            Some(Value::Dict(settings)) => Ok(settings.clone()),
            None => Ok(Dict::new()),
            Some(_) => Err(EditError::invalid(format!(
                "{config} has a non-dictionary {BUILD_SETTINGS}"
            ))),
        }
    }

    /// Rewrite the settings of every configuration of `owner` with `edit`.
    /// Configurations `edit` leaves unchanged are not touched.
    fn edit_settings<F>(&mut self, owner: &Identifier, mut edit: F) -> Result<usize>
    where
        F: FnMut(&mut Dict),
    {
        let mut changed = 0;
        for config in self.configurations_of(owner)? {
            let before = self.settings_of(&config)?;
            let mut after = before.clone();
            edit(&mut after);
            if after != before {
                self.graph_mut()
                    .set_field(&config, BUILD_SETTINGS, Value::Dict(after))?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// The value of `key` in one build configuration.
    pub fn build_property(&self, config: &Identifier, key: &str) -> Result<Option<Value>> {
        Ok(self.settings_of(config)?.remove(key))
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn set_build_property(
        &mut self,
        owner: &Identifier,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let value = value.into();
        let changed = self.edit_settings(owner, |settings| {
            settings.insert(key.to_string(), value.clone());
        })?;
        debug!(%owner, key, changed, "set build property");
        Ok(())
    }

    /// Add `value` to `key`. An absent key becomes the plain string; a
    /// differing string becomes a list of both; a list gains `value` unless
    /// it already holds it.
    pub fn add_build_property(&mut self, owner: &Identifier, key: &str, value: &str) -> Result<()> {
        let added = Value::string(value);
        let changed = self.edit_settings(owner, |settings| match settings.get_mut(key) {
            None => {
                settings.insert(key.to_string(), added.clone());
            }
            Some(Value::Array(items)) => {
                if !items.contains(&added) {
                    items.push(added.clone());
                }
            }
            Some(existing) if *existing == added => {}
            Some(existing) => {
                let previous = existing.clone();
                *existing = Value::Array(vec![previous, added.clone()]);
            }
        })?;
        debug!(%owner, key, value, changed, "added build property");
        Ok(())
    }

    /// Remove `key` entirely.
    pub fn remove_build_property(&mut self, owner: &Identifier, key: &str) -> Result<()> {
        let changed = self.edit_settings(owner, |settings| {
            settings.remove(key);
        })?;
        debug!(%owner, key, changed, "removed build property");
        Ok(())
    }

    /// Remove one `value` from `key`; a plain string equal to `value`
    /// removes the key.
    pub fn remove_build_property_value(&mut self, owner: &Identifier, key: &str, value: &str) -> Result<()> {
        let removed = Value::string(value);
        self.edit_settings(owner, |settings| {
            let drop_key = match settings.get_mut(key) {
                Some(Value::Array(items)) => {
                    items.retain(|v| *v != removed);
                    false
                }
                Some(existing) => *existing == removed,
                None => false,
            };
            if drop_key {
                settings.remove(key);
            }
        })?;
        Ok(())
    }
}
