use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::database::{self, CatalogueStore};
use crate::services::{ExternalCatalogue, IgdbSource};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogueStore>,
    pub verifier: Arc<TokenVerifier>,
    pub catalogue: ExternalCatalogue,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CatalogueStore>,
        verifier: TokenVerifier,
        catalogue: ExternalCatalogue,
    ) -> Self {
        Self {
            store,
            verifier: Arc::new(verifier),
            catalogue,
        }
    }

    /// Wire the configured backends: store, signing keys and metadata source
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store = database::open_store(&config.storage)
            .await
            .context("failed to open catalogue store")?;

        let verifier = TokenVerifier::load(&config.identity)
            .await
            .context("failed to load token signing keys")?;
        info!("Token verifier ready: {:?}", verifier);

        let source = IgdbSource::new(&config.catalogue).context("failed to build catalogue client")?;
        let catalogue = ExternalCatalogue::new(Arc::new(source));

        Ok(Self::new(store, verifier, catalogue))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("verifier", &self.verifier)
            .field("catalogue", &self.catalogue)
            .finish_non_exhaustive()
    }
}
