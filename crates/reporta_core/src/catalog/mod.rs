use serde::{Deserialize, Serialize};

use crate::domain::Priority;

/// One entry of the incident-type catalog supplied by the external configuration
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentType {
    pub key: String,
    pub label: String,
    pub default_priority: Priority,
}

impl IncidentType {
    pub fn new(key: &str, label: &str, default_priority: Priority) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            default_priority,
        }
    }
}

/// Category -> default-priority table consumed at report creation.
///
/// Unknown categories fall back to `medium` rather than failing: the catalog is
/// advisory, the admin re-classifies during review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentCatalog {
    types: Vec<IncidentType>,
}

impl IncidentCatalog {
    pub fn new(types: Vec<IncidentType>) -> Self {
        Self { types }
    }

    /// The campus catalog shipped with the reference deployment.
    pub fn campus_default() -> Self {
        Self::new(vec![
            IncidentType::new("robo", "Robo", Priority::High),
            IncidentType::new("emergencia", "Emergencia Médica", Priority::High),
            IncidentType::new("acoso", "Acoso o Intimidación", Priority::High),
            IncidentType::new("intento_robo", "Intento de Robo", Priority::Medium),
            IncidentType::new("sospechoso", "Actividad Sospechosa", Priority::Medium),
            IncidentType::new("vandalismo", "Vandalismo", Priority::Medium),
            IncidentType::new("otro", "Otro Incidente", Priority::Low),
        ])
    }

    /// Replace the whole table when the configuration collaborator changes it.
    pub fn replace(&mut self, types: Vec<IncidentType>) {
        self.types = types;
    }

    pub fn priority_for(&self, key: &str) -> Priority {
        self.types
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.default_priority)
            .unwrap_or(Priority::Medium)
    }

    pub fn label_for(&self, key: &str) -> String {
        self.types
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.label.clone())
            .unwrap_or_else(|| key.to_string())
    }

    pub fn types(&self) -> &[IncidentType] {
        &self.types
    }
}
