//! Body catalog and run selection.
//!
//! The catalog is a JSON array of body descriptors. A run is started by
//! posting the selected descriptors, in catalog order, to the service.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Bodies pre-selected when the user names none.
pub const DEFAULT_SELECTION: [&str; 3] = ["Sun", "Earth", "Mars"];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown body: {0}")]
    UnknownBody(String),

    #[error("Selection is empty")]
    EmptySelection,
}

/// One catalog entry.
///
/// Only `label` is interpreted here; `mass`, `radius`, `yearLen` and any
/// other fields are carried through to the init request untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDescriptor {
    pub label: String,

    #[serde(flatten)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl BodyDescriptor {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            properties: serde_json::Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: serde_json::Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }
}

/// All bodies the service can simulate.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    bodies: Vec<BodyDescriptor>,
}

impl Catalog {
    pub fn new(bodies: Vec<BodyDescriptor>) -> Self {
        Self { bodies }
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn bodies(&self) -> &[BodyDescriptor] {
        &self.bodies
    }

    /// Picks the named bodies, in catalog order.
    ///
    /// An empty `labels` slice selects [`DEFAULT_SELECTION`].
    pub fn select<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<BodyDescriptor>, CatalogError> {
        let wanted: Vec<&str> = if labels.is_empty() {
            DEFAULT_SELECTION.to_vec()
        } else {
            labels.iter().map(AsRef::as_ref).collect()
        };

        if let Some(missing) = wanted
            .iter()
            .find(|label| !self.bodies.iter().any(|b| b.label == **label))
        {
            return Err(CatalogError::UnknownBody(missing.to_string()));
        }

        let selection: Vec<BodyDescriptor> = self
            .bodies
            .iter()
            .filter(|b| wanted.contains(&b.label.as_str()))
            .cloned()
            .collect();

        if selection.is_empty() {
            return Err(CatalogError::EmptySelection);
        }
        Ok(selection)
    }
}

/// Serializes a selection as the init request body.
pub fn init_payload(selection: &[BodyDescriptor]) -> Result<String, CatalogError> {
    Ok(serde_json::to_string(selection)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BODIES: &str = r#"[
        {"label": "Sun", "mass": 1.989e30, "radius": 696340, "yearLen": 0},
        {"label": "Mercury", "mass": 3.285e23, "radius": 2439.7, "yearLen": 88},
        {"label": "Earth", "mass": 5.972e24, "radius": 6371, "yearLen": 365},
        {"label": "Mars", "mass": 6.39e23, "radius": 3389.5, "yearLen": 687, "moons": 2}
    ]"#;

    #[test]
    fn test_default_selection() {
        let catalog = Catalog::from_json(BODIES).unwrap();
        let labels: Vec<String> = catalog
            .select::<&str>(&[])
            .unwrap()
            .into_iter()
            .map(|b| b.label)
            .collect();
        assert_eq!(labels, vec!["Sun", "Earth", "Mars"]);
    }

    #[test]
    fn test_selection_keeps_catalog_order() {
        let catalog = Catalog::from_json(BODIES).unwrap();
        let selection = catalog.select(&["Mars", "Mercury"]).unwrap();
        assert_eq!(selection[0].label, "Mercury");
        assert_eq!(selection[1].label, "Mars");
    }

    #[test]
    fn test_unknown_label_rejected() {
        let catalog = Catalog::from_json(BODIES).unwrap();
        assert!(matches!(
            catalog.select(&["Pluto"]),
            Err(CatalogError::UnknownBody(label)) if label == "Pluto"
        ));
    }

    #[test]
    fn test_payload_preserves_extra_fields() {
        let catalog = Catalog::from_json(BODIES).unwrap();
        let selection = catalog.select(&["Mars"]).unwrap();

        let payload: serde_json::Value = serde_json::from_str(&init_payload(&selection).unwrap()).unwrap();

        assert_eq!(payload[0]["label"], "Mars");
        assert_eq!(payload[0]["moons"], 2);
        assert_eq!(payload[0]["yearLen"], 687);
    }

    #[test]
    fn test_missing_label_is_parse_error() {
        assert!(matches!(
            Catalog::from_json(r#"[{"mass": 1}]"#),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_builder() {
        let body = BodyDescriptor::new("Venus").with_property("yearLen", json!(225));
        assert_eq!(body.property("yearLen"), Some(&json!(225)));
    }
}
