//! A single point in a parameter space

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One concrete value per parameter, in parameter insertion order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combination<T> {
    entries: Vec<(String, T)>,
}

impl<T> Combination<T> {
    pub(crate) fn from_entries(entries: Vec<(String, T)>) -> Self {
        Self { entries }
    }

    /// Get the value chosen for a parameter
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Iterate over `(name, value)` pairs in parameter order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Parameter names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, T)> {
        self.entries
    }
}

impl<T: std::fmt::Display> Combination<T> {
    /// Human readable label, e.g. `lr=0.1, depth=3`
    pub fn describe(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<T: Serialize> Serialize for Combination<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A combination together with the zero-based index of every chosen value
/// within its candidate list
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct LabeledCombination<T> {
    pub values: Combination<T>,
    pub labels: Vec<(String, usize)>,
}

impl<T> LabeledCombination<T> {
    /// Candidate index chosen for a parameter
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, index)| *index)
    }
}
