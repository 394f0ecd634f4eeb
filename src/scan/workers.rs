use anyhow::{Context, Result};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Handle to a running pool of workers
///
/// Results arrive in completion order, not input order. The result channel
/// closes once every worker has drained the task queue, which is the pool's
/// completion signal.
pub struct WorkerPool<R> {
    results: mpsc::Receiver<R>,
    handles: Vec<JoinHandle<usize>>,
}

impl<R> WorkerPool<R> {
    /// Next finished result, or `None` once all workers are done
    pub async fn next_result(&mut self) -> Option<R> {
        self.results.recv().await
    }

    /// Waits for every worker to exit and returns how many tasks were
    /// handled. Results not yet taken are discarded.
    pub async fn join(mut self) -> Result<usize> {
        let mut discarded: usize = 0;
        while self.results.recv().await.is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!("Discarded {} unread results", discarded);
        }

        let mut handled: usize = 0;
        for joined in join_all(self.handles).await {
            handled += joined.context("Worker task panicked")?;
        }
        Ok(handled)
    }
}

/// Starts `workers` tasks that pull jobs from `task_rx` until it is closed
/// and empty, run `handler` on each and forward what it returns
///
/// Every job is handed to exactly one worker, once. At most `workers`
/// handlers run at the same time.
pub fn start_workers<T, R, F, Fut>(
    task_rx: mpsc::Receiver<T>,
    workers: usize,
    handler: F,
) -> WorkerPool<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let workers = workers.max(1);
    // Wrap the task receiver in a mutex so multiple workers can pull from it
    let task_rx = Arc::new(Mutex::new(task_rx));
    let handler = Arc::new(handler);
    let (result_tx, results) = mpsc::channel(workers);

    info!("Spawning {} workers", workers);
    let handles = (0..workers)
        .map(|worker_id| {
            let task_rx = task_rx.clone();
            let handler = handler.clone();
            let result_tx = result_tx.clone();

            tokio::spawn(async move {
                trace!("Worker {} started", worker_id);
                let mut handled: usize = 0;
                loop {
                    let task = { task_rx.lock().await.recv().await };
                    let Some(task) = task else {
                        debug!("Worker {} shutting down - queue closed", worker_id);
                        break;
                    };

                    let result = (*handler)(task).await;
                    handled += 1;

                    if result_tx.send(result).await.is_err() {
                        warn!("Worker {} failed to send result - receiver dropped", worker_id);
                    }
                }
                handled
            })
        })
        .collect();

    WorkerPool { results, handles }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn run_pool(workers: usize, tasks: usize) -> (Vec<usize>, usize) {
        let (task_tx, task_rx) = mpsc::channel(4);
        let mut pool = start_workers(task_rx, workers, |n: usize| async move { n * 2 });

        let producer = tokio::spawn(async move {
            for n in 0..tasks {
                task_tx.send(n).await.unwrap();
            }
        });

        let mut results = Vec::new();
        while let Some(result) = pool.next_result().await {
            results.push(result);
        }
        producer.await.unwrap();
        let handled = pool.join().await.unwrap();

        (results, handled)
    }

    #[tokio::test]
    async fn test_every_task_handled_exactly_once() {
        for workers in [1, 3, 40] {
            for tasks in [0, 1, 57] {
                let (results, handled) = run_pool(workers, tasks).await;

                assert_eq!(handled, tasks, "workers={} tasks={}", workers, tasks);
                assert_eq!(results.len(), tasks);
                let unique: HashSet<usize> = results.iter().copied().collect();
                let expected: HashSet<usize> = (0..tasks).map(|n| n * 2).collect();
                assert_eq!(unique, expected);
            }
        }
    }

    #[tokio::test]
    async fn test_zero_workers_still_drains() {
        let (results, handled) = run_pool(0, 5).await;
        assert_eq!(results.len(), 5);
        assert_eq!(handled, 5);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (task_tx, task_rx) = mpsc::channel(100);
        for n in 0..30 {
            task_tx.send(n).await.unwrap();
        }
        drop(task_tx);

        let (a, p) = (active.clone(), peak.clone());
        let pool = start_workers(task_rx, 4, move |_n: u32| {
            let (active, peak) = (a.clone(), p.clone());
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        });

        assert_eq!(pool.join().await.unwrap(), 30);
        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }
}
