//! Collections of serialized classes

use super::model::Class;
use super::{BinaryName, Error};
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Serialized classes, indexed by binary name
///
/// Adding a class with a name that is already registered replaces the earlier bytes.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: BTreeMap<BinaryName, Vec<u8>>,
}

impl ClassRegistry {
    pub fn new() -> ClassRegistry {
        ClassRegistry {
            classes: BTreeMap::new(),
        }
    }

    /// Serialize a class and register its bytes
    pub fn add(&mut self, class: &mut Class) -> Result<(), Error> {
        let bytes = class.to_bytes()?;
        debug!("Registered {} ({} bytes)", class.name(), bytes.len());
        self.classes.insert(class.name().clone(), bytes);
        Ok(())
    }

    pub fn resolve(&self, name: &BinaryName) -> Option<&[u8]> {
        self.classes.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &BinaryName> {
        self.classes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BinaryName, &[u8])> {
        self.classes
            .iter()
            .map(|(name, bytes)| (name, bytes.as_slice()))
    }

    /// Write every class under a root directory, following package structure
    pub fn save_all<P: AsRef<Path>>(&self, directory: P) -> Result<Vec<PathBuf>, Error> {
        let directory = directory.as_ref();
        let mut written = Vec::with_capacity(self.classes.len());
        for (name, bytes) in &self.classes {
            let path = directory.join(name.class_file_path());
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(Error::IoError)?;
            }
            fs::write(&path, bytes).map_err(Error::IoError)?;
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{ClassAccessFlags, Name};

    #[test]
    fn registered_classes_are_ordered() {
        let mut registry = ClassRegistry::new();
        for name in ["pkg/b/Second", "pkg/a/First"] {
            let mut class = Class::new(
                BinaryName::from_string(String::from(name)).unwrap(),
                BinaryName::OBJECT,
                ClassAccessFlags::PUBLIC,
            )
            .unwrap();
            registry.add(&mut class).unwrap();
        }

        let names: Vec<&str> = registry.class_names().map(|name| name.as_str()).collect();
        assert_eq!(names, vec!["pkg/a/First", "pkg/b/Second"]);

        let first = BinaryName::from_string(String::from("pkg/a/First")).unwrap();
        assert_eq!(&registry.resolve(&first).unwrap()[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert!(registry.resolve(&BinaryName::OBJECT).is_none());
    }
}
