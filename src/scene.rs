//! Downloaded-scene result collection.

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// One resolved scene: its identifier and the local files produced for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    name: String,
    files: Vec<PathBuf>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn with_files(name: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            files,
        }
    }

    pub fn add(&mut self, file: PathBuf) {
        self.files.push(file);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Ordered, name-addressable collection of scenes.
///
/// The insertion-ordered list and the name index are kept in sync: adding a
/// scene under an existing name replaces that scene in place instead of
/// appending a second entry.
#[derive(Debug, Default)]
pub struct Scenes {
    order: Vec<Scene>,
    index: HashMap<String, usize>,
}

impl Scenes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, scene: Scene) {
        if let Some(slot) = self.index.get(scene.name()).copied() {
            self.order[slot] = scene;
        } else {
            self.index.insert(scene.name().to_string(), self.order.len());
            self.order.push(scene);
        }
    }

    pub fn add_with_files(&mut self, name: &str, files: Vec<PathBuf>) {
        self.add(Scene::with_files(name, files));
    }

    /// Appends every scene from `other`, preserving `other`'s order.
    pub fn merge(&mut self, other: Scenes) {
        for scene in other.order {
            self.add(scene);
        }
    }

    pub fn by_name(&self, name: &str) -> Result<&Scene> {
        self.index
            .get(name)
            .map(|&slot| &self.order[slot])
            .ok_or_else(|| Error::UnknownScene(name.to_string()))
    }

    pub fn get(&self, index: usize) -> Option<&Scene> {
        self.order.get(index)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scene> {
        self.order.iter()
    }

    /// Scene names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|scene| scene.name()).collect()
    }
}

impl Index<usize> for Scenes {
    type Output = Scene;

    fn index(&self, index: usize) -> &Scene {
        &self.order[index]
    }
}

impl<'a> IntoIterator for &'a Scenes {
    type Item = &'a Scene;
    type IntoIter = std::slice::Iter<'a, Scene>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

impl fmt::Display for Scenes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "includes {} scenes", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(name: &str, file: &str) -> Scene {
        Scene::with_files(name, vec![PathBuf::from(file)])
    }

    #[test]
    fn lookup_by_name_and_position() {
        let mut scenes = Scenes::new();
        scenes.add(scene("LC80010092015051LGN00", "b4.TIF"));
        scenes.add(scene("LC82050312015136LGN00", "b3.TIF"));

        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[0].name(), "LC80010092015051LGN00");
        assert_eq!(
            scenes.by_name("LC82050312015136LGN00").unwrap().files(),
            &[PathBuf::from("b3.TIF")]
        );
        assert!(matches!(
            scenes.by_name("missing"),
            Err(Error::UnknownScene(_))
        ));
    }

    #[test]
    fn merge_preserves_insertion_order() {
        let mut scenes = Scenes::new();
        scenes.add(scene("s0", "a"));

        let mut incoming = Scenes::new();
        incoming.add(scene("s1", "b"));
        incoming.add(scene("s2", "c"));
        scenes.merge(incoming);

        assert_eq!(scenes.names(), vec!["s0", "s1", "s2"]);
    }

    #[test]
    fn duplicate_names_replace_in_place() {
        let mut scenes = Scenes::new();
        scenes.add(scene("s0", "old"));
        scenes.add(scene("s1", "other"));
        scenes.add(scene("s0", "new"));

        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes.names(), vec!["s0", "s1"]);
        assert_eq!(scenes[0].files(), &[PathBuf::from("new")]);
        assert_eq!(scenes.by_name("s0").unwrap().files(), &[PathBuf::from("new")]);
    }

    #[test]
    fn iteration_is_restartable() {
        let mut scenes = Scenes::new();
        scenes.add(scene("s0", "a"));
        scenes.add(scene("s1", "b"));

        let first: Vec<_> = scenes.iter().map(Scene::name).collect();
        let second: Vec<_> = scenes.iter().map(Scene::name).collect();
        assert_eq!(first, second);
    }
}
