use crate::common::*;
use flume::{Receiver, Sender};

/// A queue item tagged with its record index.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T> {
    pub index: usize,
    pub value: T,
}

impl<T> Keyed<T> {
    pub fn new(index: usize, value: T) -> Self {
        Self { index, value }
    }

    pub fn map<U, F>(self, f: F) -> Keyed<U>
    where
        F: FnOnce(T) -> U,
    {
        Keyed {
            index: self.index,
            value: f(self.value),
        }
    }
}

/// The cooperative shutdown flag shared by pipeline threads.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The threads of a pipeline.
///
/// Dropping it raises the stop flag and joins every thread. The consumer side
/// of the output channel must be dropped beforehand so that blocked senders
/// observe the disconnection.
#[derive(Debug, Default)]
pub(crate) struct Threads {
    stop: StopSignal,
    handles: Vec<JoinHandle<()>>,
}

impl Threads {
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn spawn<F>(&mut self, name: String, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(f)
            .with_context(|| format!("failed to spawn thread '{}'", name))?;
        self.handles.push(handle);
        Ok(())
    }
}

impl Drop for Threads {
    fn drop(&mut self) {
        self.stop.stop();
        self.handles.drain(..).for_each(|handle| {
            let name = handle.thread().name().unwrap_or("<unnamed>").to_string();
            if handle.join().is_err() {
                warn!("pipeline thread '{}' panicked", name);
            }
        });
    }
}

/// Spawn a producer feeding `getter(index)` for each record index in order.
///
/// The producer restarts from index zero after the last record if `cyclic` is
/// set, otherwise it closes its queue after a single pass.
pub(crate) fn spawn_producer<T, F>(
    threads: &mut Threads,
    name: &str,
    num_records: usize,
    cyclic: bool,
    capacity: usize,
    getter: F,
) -> Result<Receiver<Keyed<T>>>
where
    T: Send + 'static,
    F: Fn(usize) -> T + Send + 'static,
{
    ensure!(num_records > 0, "cannot produce from an empty record set");
    let (tx, rx) = flume::bounded(capacity);
    let stop = threads.stop_signal();
    let span_name = name.to_string();

    threads.spawn(format!("producer-{}", name), move || {
        let _span = info_span!("producer", queue = %span_name).entered();
        let indices: Box<dyn Iterator<Item = usize>> = if cyclic {
            Box::new((0..num_records).cycle())
        } else {
            Box::new(0..num_records)
        };

        for index in indices {
            if stop.is_stopped() || tx.send(Keyed::new(index, getter(index))).is_err() {
                break;
            }
        }
        debug!("producer finished");
    })?;

    Ok(rx)
}

/// Check that the items dequeued from parallel queues refer to the same record.
pub fn join_keys(keys: &[usize]) -> Result<usize> {
    let (&first, rest) = keys
        .split_first()
        .ok_or_else(|| format_err!("no keys to join"))?;
    ensure!(
        rest.iter().all(|&key| key == first),
        "parallel queues went out of sync: record indices {:?}",
        keys
    );
    Ok(first)
}

/// Spawn the coordinator that joins one item from each producer into a work item.
///
/// `next` returns `None` once any producer queue is closed. A key mismatch is
/// delivered to the consumer through `error_tx` and ends the coordinator.
pub(crate) fn spawn_coordinator<W, E, F>(
    threads: &mut Threads,
    work_tx: Sender<Keyed<W>>,
    error_tx: Sender<Result<Keyed<E>>>,
    mut next: F,
) -> Result<()>
where
    W: Send + 'static,
    E: Send + 'static,
    F: FnMut() -> Option<Result<Keyed<W>>> + Send + 'static,
{
    let stop = threads.stop_signal();

    threads.spawn("coordinator".into(), move || {
        let _span = info_span!("coordinator").entered();

        while !stop.is_stopped() {
            match next() {
                Some(Ok(work)) => {
                    if work_tx.send(work).is_err() {
                        break;
                    }
                }
                Some(Err(err)) => {
                    let _ = error_tx.send(Err(err));
                    break;
                }
                None => break,
            }
        }
        debug!("coordinator finished");
    })
}

/// Spawn `num_workers` workers turning work items into examples.
///
/// A worker that fails sends the error to the consumer and exits.
pub(crate) fn spawn_workers<W, E, F>(
    threads: &mut Threads,
    num_workers: usize,
    work_rx: Receiver<Keyed<W>>,
    example_tx: Sender<Result<Keyed<E>>>,
    process: F,
) -> Result<()>
where
    W: Send + 'static,
    E: Send + 'static,
    F: Fn(usize, W) -> Result<E> + Send + Sync + 'static,
{
    let process = Arc::new(process);

    for worker_index in 0..num_workers {
        let stop = threads.stop_signal();
        let work_rx = work_rx.clone();
        let example_tx = example_tx.clone();
        let process = process.clone();

        threads.spawn(format!("worker-{}", worker_index), move || {
            let _span = info_span!("worker", index = worker_index).entered();

            while !stop.is_stopped() {
                let Keyed { index, value } = match work_rx.recv() {
                    Ok(work) => work,
                    Err(_) => break,
                };

                let result = process(index, value)
                    .with_context(|| format!("failed to preprocess record {}", index));
                let failed = result.is_err();
                if failed {
                    warn!("worker {} stops on record {}", worker_index, index);
                }

                let sent = example_tx
                    .send(result.map(|example| Keyed::new(index, example)))
                    .is_ok();
                if failed || !sent {
                    break;
                }
            }
            debug!("worker finished");
        })?;
    }

    Ok(())
}
