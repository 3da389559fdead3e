use crate::domain::entities::MutationRecord;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

/// Applies one queued mutation against the remote authority.
///
/// Implementations own every domain rule for their kind, including side effects
/// a live (non-queued) call would have performed.
#[async_trait]
pub trait MutationConsumer: Send + Sync {
    async fn apply(&self, mutation: &MutationRecord) -> Result<(), AppError>;
}

/// Adapts an async closure into a [`MutationConsumer`].
pub struct FnConsumer<F, Fut> {
    handler: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnConsumer<F, Fut>
where
    F: Fn(MutationRecord) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AppError>> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> MutationConsumer for FnConsumer<F, Fut>
where
    F: Fn(MutationRecord) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AppError>> + Send + 'static,
{
    async fn apply(&self, mutation: &MutationRecord) -> Result<(), AppError> {
        (self.handler)(mutation.clone()).await
    }
}
