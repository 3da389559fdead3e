use crate::application::ports::mutation_consumer::MutationConsumer;
use crate::domain::value_objects::MutationKind;
use crate::shared::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Binds each mutation kind to the single consumer that knows how to apply it.
#[derive(Default)]
pub struct ConsumerRegistry {
    consumers: RwLock<HashMap<MutationKind, Arc<dyn MutationConsumer>>>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        kind: MutationKind,
        consumer: Arc<dyn MutationConsumer>,
    ) -> Result<(), AppError> {
        let mut consumers = self.consumers.write().await;
        if consumers.contains_key(&kind) {
            return Err(AppError::ValidationError(format!(
                "A consumer is already registered for mutation kind {kind}"
            )));
        }
        debug!(kind = %kind, "Registered mutation consumer");
        consumers.insert(kind, consumer);
        Ok(())
    }

    pub async fn unregister(&self, kind: &MutationKind) -> bool {
        self.consumers.write().await.remove(kind).is_some()
    }

    pub async fn get(&self, kind: &MutationKind) -> Option<Arc<dyn MutationConsumer>> {
        self.consumers.read().await.get(kind).cloned()
    }

    pub async fn is_registered(&self, kind: &MutationKind) -> bool {
        self.consumers.read().await.contains_key(kind)
    }

    pub async fn kinds(&self) -> Vec<MutationKind> {
        let mut kinds: Vec<MutationKind> = self.consumers.read().await.keys().cloned().collect();
        kinds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        kinds
    }
}
