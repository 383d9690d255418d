//! Helpers for background tasks owned by a screen or executor.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinSet;

/// Wraps a future to catch panics and convert them to errors.
///
/// A panicking background task would otherwise vanish silently; this turns
/// the panic payload into an `Err(String)` the caller can log.
pub(crate) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Spawns `future` onto `tasks`, logging instead of propagating a panic.
///
/// Finished tasks are reaped first so a long-lived set does not grow.
/// Dropping the set aborts whatever is still running.
pub(crate) fn spawn_owned<F>(tasks: &mut JoinSet<()>, task: &'static str, future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    while tasks.try_join_next().is_some() {}

    tasks.spawn(async move {
        if let Err(panic_msg) = catch_task_panic(future).await {
            tracing::error!(task, error = %panic_msg, "Background task panicked");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_ok() {
        let result = catch_task_panic(async { 7 }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_catch_task_panic_str_payload() {
        let result: Result<(), String> = catch_task_panic(async { panic!("boom") }).await;
        assert_eq!(result, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_spawn_owned_survives_panic() {
        let mut tasks = JoinSet::new();
        spawn_owned(&mut tasks, "test", async { panic!("inside task") });
        // The wrapper swallows the panic, so the join itself succeeds.
        let joined = tasks.join_next().await.unwrap();
        assert!(joined.is_ok());
    }
}
