use std::thread;

use anyhow::{anyhow, Result};
use crossbeam_channel::bounded;

/// An entry in the work queue. Each worker exits on the first `Shutdown`
/// it receives; the feeder enqueues exactly one per worker.
#[derive(Debug)]
pub enum WorkItem<T> {
    Job(T),
    Shutdown,
}

/// Return the default number of workers (number of CPU cores).
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// `0` means one worker per available core.
pub fn resolve_workers(requested: usize) -> usize {
    if requested == 0 {
        default_workers()
    } else {
        requested
    }
}

/// Run `handle` over `items` on `workers` threads.
///
/// Each worker builds private state with `init` and keeps it for its whole
/// lifetime. Items are fed from the calling thread through a queue bounded
/// at two items per worker, so enumeration never runs far ahead of
/// processing. Results come back grouped by worker, not in input order.
pub fn run<T, S, R, I, Init, Handle>(
    workers: usize,
    items: I,
    init: Init,
    handle: Handle,
) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    I: IntoIterator<Item = T>,
    Init: Fn(usize) -> Result<S> + Sync,
    Handle: Fn(&mut S, T) -> R + Sync,
{
    let workers = workers.max(1);
    let (sender, receiver) = bounded::<WorkItem<T>>(workers.saturating_mul(2));

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let receiver = receiver.clone();
            let init = &init;
            let handle = &handle;
            handles.push(scope.spawn(move || -> Result<Vec<R>> {
                let mut state = init(id)?;
                let mut results = Vec::new();
                while let Ok(WorkItem::Job(item)) = receiver.recv() {
                    results.push(handle(&mut state, item));
                }
                tracing::debug!("Worker {} finished after {} items", id, results.len());
                Ok(results)
            }));
        }
        // Workers hold the only receivers from here on, so sends fail
        // instead of blocking forever if every worker has exited.
        drop(receiver);

        for item in items {
            if sender.send(WorkItem::Job(item)).is_err() {
                tracing::warn!("All workers have exited, stopping the feed");
                break;
            }
        }
        for _ in 0..workers {
            if sender.send(WorkItem::Shutdown).is_err() {
                break;
            }
        }
        drop(sender);

        let mut results = Vec::new();
        for handle in handles {
            let worker_results = handle
                .join()
                .map_err(|_| anyhow!("Worker thread panicked"))??;
            results.extend(worker_results);
        }
        Ok(results)
    })
}
