//! Catalogue of models known to the proxy.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::protocol::ModelTag;
use tracing::warn;

use crate::{api::ConsoleApi, nodes::NO_MODELS_AVAILABLE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelCatalogView {
    Loading,
    Empty(String),
    Listed(Vec<String>),
}

impl ModelCatalogView {
    /// Badge text next to the heading.
    pub fn count_label(&self) -> String {
        match self {
            Self::Loading => "...".to_string(),
            Self::Empty(_) => "0".to_string(),
            Self::Listed(names) => names.len().to_string(),
        }
    }
}

pub fn render_models(models: &[ModelTag]) -> ModelCatalogView {
    if models.is_empty() {
        return ModelCatalogView::Empty(NO_MODELS_AVAILABLE.to_string());
    }
    let mut names: Vec<String> = models.iter().map(|model| model.name.clone()).collect();
    names.sort();
    ModelCatalogView::Listed(names)
}

pub struct ModelCatalog {
    api: Arc<dyn ConsoleApi>,
    view: Mutex<ModelCatalogView>,
}

impl ModelCatalog {
    pub fn new(api: Arc<dyn ConsoleApi>) -> Self {
        Self {
            api,
            view: Mutex::new(ModelCatalogView::Loading),
        }
    }

    fn lock_view(&self) -> MutexGuard<'_, ModelCatalogView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> ModelCatalogView {
        self.lock_view().clone()
    }

    /// Failures are logged and read as an empty catalogue.
    pub async fn fetch(&self) -> Vec<ModelTag> {
        self.api.list_models().await.unwrap_or_else(|err| {
            warn!(error = %err, "model listing failed");
            Vec::new()
        })
    }

    pub async fn refresh(&self) -> ModelCatalogView {
        *self.lock_view() = ModelCatalogView::Loading;
        let view = render_models(&self.fetch().await);
        *self.lock_view() = view.clone();
        view
    }
}
