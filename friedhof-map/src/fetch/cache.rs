//! Cache des jeux de données : single-flight, durée de vie illimitée
//!
//! Le premier appel pour un identifiant lance l'unique requête réseau ; tous
//! les appels concurrents ou ultérieurs partagent son résultat, succès comme
//! échec. Un échec reste en cache : pas de nouvelle tentative automatique.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use friedhof::RawFeatureCollection;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info};

use super::{FetchError, Transport};

/// Résultat partagé d'un jeu de données
pub type DatasetResult = Result<Arc<RawFeatureCollection>, FetchError>;

type PendingFetch = Shared<BoxFuture<'static, DatasetResult>>;

/// État d'une entrée du cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    NotRequested,
    InFlight,
    Settled,
}

/// Cache possédé explicitement (pas d'état global), indexé par identifiant
pub struct DatasetCache {
    transport: Arc<dyn Transport>,
    entries: Mutex<HashMap<String, PendingFetch>>,
}

impl DatasetCache {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Renvoie le jeu de données, en lançant la requête au premier appel.
    ///
    /// # Errors
    ///
    /// Le [`FetchError`] de la première requête, rejoué à chaque appel.
    pub async fn get_or_fetch(&self, dataset: &str) -> DatasetResult {
        let pending = {
            // seule la transition "absent → en cours" est sous verrou
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .entry(dataset.to_string())
                .or_insert_with(|| {
                    debug!(dataset, "Cache miss, starting fetch");
                    fetch_and_decode(Arc::clone(&self.transport), dataset.to_string())
                        .boxed()
                        .shared()
                })
                .clone()
        };
        pending.await
    }

    /// État courant d'une entrée
    pub fn state(&self, dataset: &str) -> EntryState {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(dataset) {
            None => EntryState::NotRequested,
            Some(pending) if pending.peek().is_some() => EntryState::Settled,
            Some(_) => EntryState::InFlight,
        }
    }
}

async fn load(transport: &dyn Transport, dataset: &str) -> Result<RawFeatureCollection, FetchError> {
    let body = transport.get(dataset).await?;
    RawFeatureCollection::from_slice(&body).map_err(|e| FetchError::decode(dataset, e))
}

async fn fetch_and_decode(transport: Arc<dyn Transport>, dataset: String) -> DatasetResult {
    match load(transport.as_ref(), &dataset).await {
        Ok(collection) => {
            info!(
                dataset = %dataset,
                features = collection.len(),
                crs = collection.declared_crs().unwrap_or("-"),
                "Dataset loaded"
            );
            Ok(Arc::new(collection))
        }
        Err(e) => {
            error!(dataset = %dataset, error = %e, "Dataset fetch failed");
            Err(e)
        }
    }
}
