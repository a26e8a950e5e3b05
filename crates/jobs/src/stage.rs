// crates/jobs/src/stage.rs
//! Pipeline stages: one category each, fetched once and then run through
//! the [`BatchExecutor`].

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use guild_sweep_core::{Category, ItemError};

use crate::executor::BatchExecutor;

type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<Vec<T>, ItemError>> + Send>>;
type ItemFuture = Pin<Box<dyn Future<Output = Result<u64, ItemError>> + Send>>;

/// One step of a sweep pipeline.
#[async_trait]
pub trait Stage: Send {
    fn category(&self) -> &str;

    fn status_label(&self) -> &str;

    /// Fetch the items and run them to completion. Returns the category count.
    async fn run(self: Box<Self>, executor: &BatchExecutor) -> u64;
}

/// Ordered list of stages executed by one job.
pub type Pipeline = Vec<Box<dyn Stage>>;

/// A category stage over items of type `T`.
///
/// The item list is materialised once, before any item call, so concurrent
/// external changes do not affect which items the stage attempts. A failed
/// fetch is logged and treated as an empty list.
pub struct CategoryOperation<T> {
    category: String,
    status_label: String,
    fetch: Box<dyn FnOnce() -> FetchFuture<T> + Send>,
    action: Box<dyn Fn(T) -> ItemFuture + Send + Sync>,
}

impl<T: Send + 'static> CategoryOperation<T> {
    /// Stage where each successful call counts one unit.
    pub fn new<Fe, FeFut, De, DeFut>(
        category: impl Into<String>,
        status_label: impl Into<String>,
        fetch: Fe,
        delete: De,
    ) -> Self
    where
        Fe: FnOnce() -> FeFut + Send + 'static,
        FeFut: Future<Output = Result<Vec<T>, ItemError>> + Send + 'static,
        De: Fn(T) -> DeFut + Send + Sync + 'static,
        DeFut: Future<Output = Result<(), ItemError>> + Send + 'static,
    {
        Self {
            category: category.into(),
            status_label: status_label.into(),
            fetch: Box::new(move || -> FetchFuture<T> { Box::pin(fetch()) }),
            action: Box::new(move |item| -> ItemFuture {
                let call = delete(item);
                Box::pin(async move { call.await.map(|()| 1u64) })
            }),
        }
    }

    /// Stage where each successful call reports how many units it affected.
    pub fn weighted<Fe, FeFut, De, DeFut>(
        category: impl Into<String>,
        status_label: impl Into<String>,
        fetch: Fe,
        action: De,
    ) -> Self
    where
        Fe: FnOnce() -> FeFut + Send + 'static,
        FeFut: Future<Output = Result<Vec<T>, ItemError>> + Send + 'static,
        De: Fn(T) -> DeFut + Send + Sync + 'static,
        DeFut: Future<Output = Result<u64, ItemError>> + Send + 'static,
    {
        Self {
            category: category.into(),
            status_label: status_label.into(),
            fetch: Box::new(move || -> FetchFuture<T> { Box::pin(fetch()) }),
            action: Box::new(move |item| -> ItemFuture { Box::pin(action(item)) }),
        }
    }

    /// Stage over the standard category catalogue, weighted when the
    /// category counts more than one unit per call.
    pub fn for_category<Fe, FeFut, De, DeFut>(category: Category, fetch: Fe, action: De) -> Self
    where
        Fe: FnOnce() -> FeFut + Send + 'static,
        FeFut: Future<Output = Result<Vec<T>, ItemError>> + Send + 'static,
        De: Fn(T) -> DeFut + Send + Sync + 'static,
        DeFut: Future<Output = Result<u64, ItemError>> + Send + 'static,
    {
        Self::weighted(category.as_str(), category.status_label(), fetch, action)
    }

    pub fn boxed(self) -> Box<dyn Stage> {
        Box::new(self)
    }
}

impl CategoryOperation<()> {
    /// Stage consisting of a single call counted once (server asset reset,
    /// settings update).
    pub fn single<De, DeFut>(category: impl Into<String>, status_label: impl Into<String>, action: De) -> Self
    where
        De: Fn() -> DeFut + Send + Sync + 'static,
        DeFut: Future<Output = Result<(), ItemError>> + Send + 'static,
    {
        Self::new(
            category,
            status_label,
            || async { Ok::<_, ItemError>(vec![()]) },
            move |()| action(),
        )
    }
}

#[async_trait]
impl<T: Send + 'static> Stage for CategoryOperation<T> {
    fn category(&self) -> &str {
        &self.category
    }

    fn status_label(&self) -> &str {
        &self.status_label
    }

    async fn run(self: Box<Self>, executor: &BatchExecutor) -> u64 {
        let CategoryOperation {
            category,
            status_label,
            fetch,
            action,
        } = *self;

        let items = match fetch().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    job_id = executor.job_id(),
                    category = %category,
                    kind = e.kind(),
                    error = %e,
                    "Fetch failed; skipping category"
                );
                Vec::new()
            }
        };
        tracing::debug!(
            job_id = executor.job_id(),
            category = %category,
            items = items.len(),
            "Stage starting"
        );

        executor
            .run_weighted(items, move |item| action(item), &category, &status_label)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelRegistry;
    use crate::progress::ProgressState;
    use crate::reporter::Reporter;
    use crate::sink::TracingSink;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn executor() -> BatchExecutor {
        BatchExecutor::new(
            1,
            5,
            Arc::new(ProgressState::new()),
            Arc::new(CancelRegistry::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(Reporter::new(1, 5, Arc::new(TracingSink))),
        )
    }

    #[tokio::test]
    async fn test_operation_runs_fetched_items() {
        let stage = CategoryOperation::new(
            "channels",
            "Deleting channels",
            || async { Ok::<_, ItemError>(vec!["general", "random", "memes"]) },
            |_name| async { Ok::<(), ItemError>(()) },
        )
        .boxed();
        assert_eq!(stage.category(), "channels");
        assert_eq!(stage.status_label(), "Deleting channels");
        assert_eq!(stage.run(&executor()).await, 3);
    }

    #[tokio::test]
    async fn test_failed_fetch_counts_zero() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let stage = CategoryOperation::new(
            "roles",
            "Deleting roles",
            || async { Err::<Vec<u32>, _>(ItemError::permission("roles")) },
            move |_| {
                calls_in.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), ItemError>(()) }
            },
        )
        .boxed();
        assert_eq!(stage.run(&executor()).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_stage_counts_once() {
        let stage = CategoryOperation::<()>::single(
            Category::GuildAssets,
            Category::GuildAssets.status_label(),
            || async { Ok::<(), ItemError>(()) },
        )
        .boxed();
        assert_eq!(stage.category(), "guild_assets");
        assert_eq!(stage.run(&executor()).await, 1);
    }

    #[tokio::test]
    async fn test_for_category_uses_catalogue_labels() {
        let stage = CategoryOperation::for_category(
            Category::PurgedMessages,
            || async { Ok::<_, ItemError>(vec![40u64, 60]) },
            |deleted| async move { Ok::<u64, ItemError>(deleted) },
        )
        .boxed();
        assert_eq!(stage.status_label(), "Purging messages");
        assert_eq!(stage.run(&executor()).await, 100);
    }
}
