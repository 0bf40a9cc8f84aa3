//! The operation a task runs.

use std::future::Future;

use async_trait::async_trait;

/// Abstraction for the unit of work behind a task.
///
/// The scheduler may call [`execute`](TaskExecutor::execute) more than once for
/// the same task: each failed attempt that is still within the retry limit is
/// queued again and re-executed from scratch.
///
/// Any `Fn() -> impl Future<Output = Result<T, E>>` closure is an executor, so
/// most callers never implement this trait by hand.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_admission::core::TaskExecutor;
///
/// struct Completion {
///     client: reqwest::Client,
///     prompt: String,
/// }
///
/// #[async_trait]
/// impl TaskExecutor<String, reqwest::Error> for Completion {
///     async fn execute(&self) -> Result<String, reqwest::Error> {
///         self.client
///             .post("https://llm.internal/v1/complete")
///             .body(self.prompt.clone())
///             .send()
///             .await?
///             .text()
///             .await
///     }
/// }
/// ```
#[async_trait]
pub trait TaskExecutor<T, E>: Send + Sync + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Run one attempt of the task.
    async fn execute(&self) -> Result<T, E>;
}

#[async_trait]
impl<F, Fut, T, E> TaskExecutor<T, E> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    async fn execute(&self) -> Result<T, E> {
        (self)().await
    }
}
