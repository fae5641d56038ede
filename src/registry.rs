//! Known tool-marker registry.
//!
//! Maps marker ids to instrument labels. Detections whose id is not
//! registered are discarded before they ever reach the tracker.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Registry of marker ids and the instruments they are attached to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ToolRegistry {
    markers: BTreeMap<i32, String>,
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn empty() -> Self {
        Self {
            markers: BTreeMap::new(),
        }
    }

    /// Look up the instrument label for a marker id
    #[must_use]
    pub fn label(&self, id: i32) -> Option<&str> {
        self.markers.get(&id).map(String::as_str)
    }

    /// Whether the marker id belongs to a known instrument
    #[must_use]
    pub fn contains(&self, id: i32) -> bool {
        self.markers.contains_key(&id)
    }

    /// Number of registered markers
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the registry has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Iterate over (id, label) pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (i32, &str)> {
        self.markers.iter().map(|(id, label)| (*id, label.as_str()))
    }
}

impl Default for ToolRegistry {
    /// The standard instrument set
    fn default() -> Self {
        let markers = [
            (20, "scalpel"),
            (21, "artery_forceps"),
            (22, "iris_scissors"),
            (23, "operating_scissors"),
            (24, "tweezers"),
            (25, "aspirator"),
            (26, "bending_shear"),
            (27, "circular_spoon"),
            (28, "core_needle"),
            (29, "fine_needle"),
            (30, "rongeur_forceps_1"),
            (31, "rongeur_forceps_2"),
            (32, "stripping"),
            (33, "wire_grabbing_pliers"),
        ]
        .into_iter()
        .map(|(id, label)| (id, label.to_string()))
        .collect();

        Self { markers }
    }
}

impl FromIterator<(i32, String)> for ToolRegistry {
    fn from_iter<T: IntoIterator<Item = (i32, String)>>(iter: T) -> Self {
        Self {
            markers: iter.into_iter().collect(),
        }
    }
}
