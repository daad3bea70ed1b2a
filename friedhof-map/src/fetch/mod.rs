//! Récupération des jeux de données GeoJSON
//!
//! - [`Transport`] : appel réseau brut (GET d'un jeu de données)
//! - [`HttpTransport`] : implémentation `reqwest`
//! - [`DatasetCache`] : mémoïsation single-flight, sans expiration

pub mod cache;
pub mod http;

pub use cache::{DatasetCache, EntryState};
pub use http::HttpTransport;

use async_trait::async_trait;
use thiserror::Error;

/// Échec de récupération d'un jeu de données.
///
/// `Clone` : le même résultat est rejoué à tous les appelants du cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Erreur réseau ou HTTP (`status` absent si le serveur est injoignable)
    #[error("Transport error for dataset {dataset}: {message}")]
    Transport {
        dataset: String,
        status: Option<u16>,
        message: String,
    },

    /// La réponse n'est pas une FeatureCollection valide
    #[error("Failed to decode dataset {dataset}: {message}")]
    Decode { dataset: String, message: String },
}

impl FetchError {
    /// Réponse HTTP hors 2xx
    pub fn status(dataset: impl Into<String>, status: u16, reason: &str) -> Self {
        Self::Transport {
            dataset: dataset.into(),
            status: Some(status),
            message: format!("HTTP {} {}", status, reason).trim_end().to_string(),
        }
    }

    /// Serveur injoignable (DNS, connexion, timeout)
    pub fn unreachable(dataset: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Transport {
            dataset: dataset.into(),
            status: None,
            message: format!("network unreachable: {}", detail),
        }
    }

    pub fn decode(dataset: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Decode {
            dataset: dataset.into(),
            message: detail.to_string(),
        }
    }

    /// Jeu de données concerné
    pub fn dataset(&self) -> &str {
        match self {
            Self::Transport { dataset, .. } | Self::Decode { dataset, .. } => dataset,
        }
    }

    /// Code HTTP, si le serveur a répondu
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Decode { .. } => None,
        }
    }
}

/// Appel réseau brut : renvoie le corps de la réponse pour un jeu de données
#[async_trait]
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// [`FetchError::Transport`] si la requête échoue.
    async fn get(&self, dataset: &str) -> Result<Vec<u8>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error() {
        let err = FetchError::status("grab", 503, "Service Unavailable");
        assert_eq!(err.dataset(), "grab");
        assert_eq!(err.http_status(), Some(503));
        assert_eq!(
            err.to_string(),
            "Transport error for dataset grab: HTTP 503 Service Unavailable"
        );
    }

    #[test]
    fn test_unreachable_has_no_status() {
        let err = FetchError::unreachable("grabstelle", "connection refused");
        assert_eq!(err.http_status(), None);
        assert!(err.to_string().contains("network unreachable"));
    }
}
