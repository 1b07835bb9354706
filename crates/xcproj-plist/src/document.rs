//! Flat documents with a scoped open/flush lifecycle.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{PlistError, Result};
use crate::value::{PlistDict, PlistValue};
use crate::xml;

/// An entitlements or application-metadata document.
///
/// The document holds no file handle: [`PlistDocument::open`] reads the
/// file and [`PlistDocument::flush`] writes it, each within the call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlistDocument {
    root: PlistDict,
}

impl PlistDocument {
    /// An empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse XML plist text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self {
            root: xml::read(text)?,
        })
    }

    /// Read and parse the document at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PlistError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc = Self::parse(&text)?;
        debug!(path = %path.display(), keys = doc.len(), "opened plist");
        Ok(doc)
    }

    /// Like [`PlistDocument::open`], but a missing file yields an empty
    /// document.
    pub fn open_or_empty(path: impl AsRef<Path>) -> Result<Self> {
        match Self::open(path.as_ref()) {
            Err(PlistError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.as_ref().display(), "plist missing, starting empty");
                Ok(Self::new())
            }
            other => other,
        }
    }

    /// The canonical XML text of this document.
    pub fn to_xml_string(&self) -> String {
        xml::write(&self.root)
    }

    /// Write the document to `path`, creating parent directories.
    pub fn flush(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| PlistError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_xml_string()).map_err(io_err)?;
        info!(path = %path.display(), keys = self.len(), "flushed plist");
        Ok(())
    }

    pub fn root(&self) -> &PlistDict {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.root.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// Set `key`, keeping its position when it already exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PlistValue>) -> Option<PlistValue> {
        self.root.insert(key.into(), value.into())
    }

    /// Remove `key`, preserving the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<PlistValue> {
        self.root.shift_remove(key)
    }

    /// Run `f` on the array at `key`. The array starts empty when the key
    /// is absent or holds something else; the key keeps its position.
    pub fn update_array<R>(&mut self, key: &str, f: impl FnOnce(&mut Vec<PlistValue>) -> R) -> R {
        let mut items = match self.root.get_mut(key) {
            Some(PlistValue::Array(items)) => std::mem::take(items),
            _ => Vec::new(),
        };
        let out = f(&mut items);
        self.root.insert(key.to_string(), PlistValue::Array(items));
        out
    }

    /// Run `f` on the dictionary at `key`, like [`update_array`].
    ///
    /// [`update_array`]: PlistDocument::update_array
    pub fn update_dict<R>(&mut self, key: &str, f: impl FnOnce(&mut PlistDict) -> R) -> R {
        let mut dict = match self.root.get_mut(key) {
            Some(PlistValue::Dict(dict)) => std::mem::take(dict),
            _ => PlistDict::new(),
        };
        let out = f(&mut dict);
        self.root.insert(key.to_string(), PlistValue::Dict(dict));
        out
    }

    /// Append each of `items` to the array at `key` unless already present.
    ///
    /// Returns whether anything was added.
    pub fn append_unique<I, T>(&mut self, key: &str, items: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: Into<PlistValue>,
    {
        self.update_array(key, |array| {
            let mut changed = false;
            for item in items {
                let item = item.into();
                if !array.contains(&item) {
                    array.push(item);
                    changed = true;
                }
            }
            changed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_keeps_key_position() {
        let mut doc = PlistDocument::new();
        doc.set("a", true);
        doc.set("b", "x");
        doc.set("a", false);
        let keys: Vec<&str> = doc.root().keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(doc.get("a"), Some(&PlistValue::Bool(false)));
    }

    #[test]
    fn remove_preserves_order() {
        let mut doc = PlistDocument::new();
        doc.set("a", 1i64);
        doc.set("b", 2i64);
        doc.set("c", 3i64);
        assert_eq!(doc.remove("b"), Some(PlistValue::Integer(2)));
        let keys: Vec<&str> = doc.root().keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "c"]);
        assert!(!doc.contains_key("b"));
    }

    #[test]
    fn append_unique_is_idempotent() {
        let mut doc = PlistDocument::new();
        assert!(doc.append_unique("groups", ["g1", "g2"]));
        assert!(!doc.append_unique("groups", ["g2", "g1"]));
        assert_eq!(doc.get("groups"), Some(&PlistValue::from(vec!["g1", "g2"])));
    }

    #[test]
    fn containers_replace_wrong_shapes() {
        let mut doc = PlistDocument::new();
        doc.set("k", "scalar");
        doc.set("after", 1i64);
        doc.update_array("k", |items| items.push("x".into()));
        assert_eq!(doc.get("k"), Some(&PlistValue::from(vec!["x"])));
        doc.update_dict("d", |d| d.insert("inner".into(), true.into()));
        assert_eq!(
            doc.get("d").and_then(PlistValue::as_dict).map(|d| d.len()),
            Some(1)
        );
        let keys: Vec<&str> = doc.root().keys().map(String::as_str).collect();
        assert_eq!(keys, ["k", "after", "d"]);
    }

    #[test]
    fn containers_keep_existing_contents() {
        let mut doc = PlistDocument::new();
        doc.set("k", vec!["a"]);
        let len = doc.update_array("k", |items| {
            items.push("b".into());
            items.len()
        });
        assert_eq!(len, 2);
        assert_eq!(doc.get("k"), Some(&PlistValue::from(vec!["a", "b"])));
    }

    #[test]
    fn flush_then_reopen_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("App").join("app.entitlements");
        let mut doc = PlistDocument::open_or_empty(&path).unwrap();
        assert!(doc.is_empty());
        doc.set("com.apple.developer.siri", true);
        doc.flush(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        let reopened = PlistDocument::open(&path).unwrap();
        assert_eq!(reopened, doc);
        reopened.flush(&path).unwrap();
        reopened.flush(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlistDocument::open(dir.path().join("missing.plist")).unwrap_err();
        assert!(matches!(err, PlistError::Io { .. }));
    }
}
