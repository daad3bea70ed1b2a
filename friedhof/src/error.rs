//! Types d'erreurs pour le crate friedhof

use thiserror::Error;

/// Erreurs pouvant survenir lors du décodage ou de la normalisation
#[derive(Debug, Error)]
pub enum FriedhofError {
    /// Document JSON illisible ou qui n'est pas une FeatureCollection
    #[error("Invalid feature collection: {0}")]
    Decode(String),

    /// Payload de coordonnées inutilisable pour une feature
    #[error("Malformed geometry: {reason}")]
    MalformedGeometry { reason: String },

    /// Sac de propriétés qui n'est pas un objet JSON
    #[error("Malformed properties: {reason}")]
    MalformedProperties { reason: String },
}

impl FriedhofError {
    /// Crée une erreur de géométrie invalide
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedGeometry {
            reason: reason.into(),
        }
    }

    /// Crée une erreur de propriétés invalides
    pub fn malformed_properties(reason: impl Into<String>) -> Self {
        Self::MalformedProperties {
            reason: reason.into(),
        }
    }

    /// Crée une erreur de décodage
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode(reason.into())
    }

    /// Cause sans le préfixe de catégorie
    pub fn reason(&self) -> &str {
        match self {
            Self::Decode(reason)
            | Self::MalformedGeometry { reason }
            | Self::MalformedProperties { reason } => reason,
        }
    }
}

impl From<serde_json::Error> for FriedhofError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
