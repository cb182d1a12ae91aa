//! Task spawning abstraction for the single-threaded runtime.

use std::future::Future;

/// Provider for spawning local tasks in a single-threaded context.
///
/// The STOMP session runs its connection loop as a background task that
/// shares `Rc<RefCell<...>>` state with the foreground API. Futures are
/// therefore `!Send` and must be spawned with `spawn_local`; this trait
/// abstracts that so a test harness can intercept or name tasks.
pub trait TaskProvider: Clone {
    /// Spawn a named task on the current thread.
    fn spawn_task<F>(&self, name: &str, future: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + 'static;
}

/// Real task provider using `tokio::task::spawn_local`.
///
/// Requires a current-thread runtime with a `LocalSet` (or a local runtime)
/// to be running.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTaskProvider;

impl TaskProvider for TokioTaskProvider {
    fn spawn_task<F>(&self, name: &str, future: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + 'static,
    {
        tracing::debug!(task = name, "spawning local task");
        tokio::task::spawn_local(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[tokio::test]
    async fn spawn_task_runs_future() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let ran = Rc::new(Cell::new(false));
                let flag = ran.clone();
                let handle = TokioTaskProvider.spawn_task("test_task", async move {
                    flag.set(true);
                });
                handle.await.expect("task should not panic");
                assert!(ran.get());
            })
            .await;
    }
}
