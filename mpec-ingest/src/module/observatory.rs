///! Observatory directory
///!
///! Read-only lookup of station metadata, loaded from a JSON object keyed by
///! the 3-character code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observatory {
    pub name: String,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub cos: Option<f64>,
    #[serde(default)]
    pub sin: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ObservatoryDirectory {
    stations: HashMap<String, Observatory>,
}

impl ObservatoryDirectory {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            stations: serde_json::from_str(content)?,
        })
    }

    /// Load when configured; a missing or malformed file yields an empty directory.
    pub fn load_optional(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        let loaded = fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| Self::from_json(&content).map_err(|e| e.to_string()));
        match loaded {
            Ok(directory) => {
                tracing::info!("Loaded {} observatories from {}", directory.len(), path.display());
                directory
            }
            Err(e) => {
                tracing::warn!("Failed to load observatory list {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&Observatory> {
        self.stations.get(code)
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        self.get(code).map(|o| o.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let directory = ObservatoryDirectory::from_json(
            r#"{
                "G96": {"name": "Mt. Lemmon Survey", "longitude": 249.2108, "cos": 0.845, "sin": 0.533},
                "C51": {"name": "WISE"}
            }"#,
        )
        .unwrap();

        assert_eq!(directory.len(), 2);
        assert_eq!(directory.name("G96"), Some("Mt. Lemmon Survey"));
        assert_eq!(directory.get("C51").unwrap().longitude, None);
        assert_eq!(directory.name("703"), None);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let directory = ObservatoryDirectory::load_optional(Some(Path::new("/nonexistent/obscodes.json")));
        assert!(directory.is_empty());
    }
}
