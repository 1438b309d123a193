//! In-process store of trained pipelines keyed by UUID

use super::pipeline::Pipeline;
use crate::error::{MetricsError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Trained models live for the lifetime of the process; nothing is evicted.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<HashMap<Uuid, Arc<Pipeline>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pipeline: Pipeline) -> Uuid {
        let id = Uuid::new_v4();
        let model = pipeline.model_name();
        self.models.write().insert(id, Arc::new(pipeline));
        info!("Registered {} model {}", model, id);
        id
    }

    /// Look up a model by its textual UUID
    pub fn get(&self, model_uuid: &str) -> Result<Arc<Pipeline>> {
        let not_found = || MetricsError::NotFound(format!("Model not found: {}", model_uuid));
        let id = Uuid::parse_str(model_uuid.trim()).map_err(|_| not_found())?;
        self.models.read().get(&id).cloned().ok_or_else(not_found)
    }

    pub fn len(&self) -> usize {
        self.models.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().is_empty()
    }
}
