//! Background duration probing.
//!
//! Tracks whose length is unknown are probed in small batches so only a few
//! files are open at once. Each batch gets a fixed time budget; probes still
//! running when it expires are reported as failed and their late results are
//! dropped. A timed-out probe still holds its slot until it returns, so at
//! most `batch_size` files are ever being read. Outcomes are sent back over a
//! channel and applied by the coordinator on its own thread.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use lofty::file::AudioFile;
use tracing::debug;

use crate::config::ProbeSettings;

/// Reads the duration of one file; `None` when it cannot be determined.
pub type ProbeFn = Arc<dyn Fn(&Path) -> Option<Duration> + Send + Sync>;

/// Result of probing one playlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub index: usize,
    pub duration: Option<Duration>,
}

/// Owner side of a running probe worker.
///
/// Dropping the handle cancels the worker: no further batch is started and
/// results of probes already in flight are discarded.
pub struct ProbeHandle {
    results: Receiver<ProbeOutcome>,
    _cancel: Sender<()>,
}

impl ProbeHandle {
    /// Collect every outcome available right now.
    ///
    /// The second value is `true` once the worker has finished and no more
    /// outcomes will arrive.
    pub fn drain(&self) -> (Vec<ProbeOutcome>, bool) {
        let mut outcomes = Vec::new();
        loop {
            match self.results.try_recv() {
                Ok(outcome) => outcomes.push(outcome),
                Err(TryRecvError::Empty) => return (outcomes, false),
                Err(TryRecvError::Disconnected) => return (outcomes, true),
            }
        }
    }
}

/// Read a file's duration from its container metadata with `lofty`.
pub fn read_duration(path: &Path) -> Option<Duration> {
    match lofty::read_from_path(path) {
        Ok(tagged) => Some(tagged.properties().duration()).filter(|d| !d.is_zero()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "duration probe failed");
            None
        }
    }
}

fn is_cancelled(cancel: &Receiver<()>) -> bool {
    !matches!(cancel.try_recv(), Err(TryRecvError::Empty))
}

/// Start probing `jobs` (playlist index, file) on a worker thread.
pub fn spawn(jobs: Vec<(usize, PathBuf)>, settings: &ProbeSettings, probe: ProbeFn) -> ProbeHandle {
    let (results_tx, results_rx) = mpsc::channel::<ProbeOutcome>();
    let (cancel_tx, cancel_rx) = mpsc::channel::<()>();

    let batch_size = settings.batch_size.max(1);
    let budget = Duration::from_millis(settings.timeout_ms);
    let pause = Duration::from_millis(settings.batch_pause_ms);

    thread::spawn(move || {
        // One token per probe allowed to run; a probe hands its token back
        // when it returns, even after its batch gave up on it.
        let (slot_tx, slot_rx) = mpsc::channel::<()>();
        for _ in 0..batch_size {
            let _ = slot_tx.send(());
        }
        let slots = Slots {
            give_back: slot_tx,
            free: slot_rx,
        };

        let batches: Vec<&[(usize, PathBuf)]> = jobs.chunks(batch_size).collect();
        let last = batches.len().saturating_sub(1);

        for (n, batch) in batches.into_iter().enumerate() {
            if !slots.acquire(batch.len(), &cancel_rx) {
                debug!("duration probing cancelled");
                return;
            }

            if !run_batch(batch, budget, &probe, &slots, &results_tx) {
                return;
            }

            if n < last {
                match cancel_rx.recv_timeout(pause) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => {
                        debug!("duration probing cancelled");
                        return;
                    }
                }
            }
        }
    });

    ProbeHandle {
        results: results_rx,
        _cancel: cancel_tx,
    }
}

/// How often a worker waiting for free slots checks for cancellation.
const SLOT_POLL: Duration = Duration::from_millis(10);

/// Counting semaphore over a channel of tokens.
struct Slots {
    give_back: Sender<()>,
    free: Receiver<()>,
}

impl Slots {
    /// Take `n` tokens, waiting for straggling probes to return theirs.
    /// Returns `false` if the handle was dropped while waiting.
    fn acquire(&self, n: usize, cancel: &Receiver<()>) -> bool {
        let mut taken = 0;
        while taken < n {
            if is_cancelled(cancel) {
                return false;
            }
            match self.free.recv_timeout(SLOT_POLL) {
                Ok(()) => taken += 1,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }
}

/// Probe one batch concurrently. Every job must already hold a slot.
/// Returns `false` when the receiving side is gone.
fn run_batch(
    batch: &[(usize, PathBuf)],
    budget: Duration,
    probe: &ProbeFn,
    slots: &Slots,
    results: &Sender<ProbeOutcome>,
) -> bool {
    let (tx, rx) = mpsc::channel::<ProbeOutcome>();
    for (index, path) in batch {
        let tx = tx.clone();
        let slot = slots.give_back.clone();
        let probe = Arc::clone(probe);
        let index = *index;
        let path = path.clone();
        thread::spawn(move || {
            let duration = probe(&path);
            let _ = slot.send(());
            // The batch may have timed out already; nobody is listening then.
            let _ = tx.send(ProbeOutcome { index, duration });
        });
    }
    drop(tx);

    let deadline = Instant::now() + budget;
    let mut pending: HashSet<usize> = batch.iter().map(|(i, _)| *i).collect();

    while !pending.is_empty() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(outcome) => {
                if pending.remove(&outcome.index) && results.send(outcome).is_err() {
                    return false;
                }
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Whatever is left timed out (or its probe thread died).
    for index in pending {
        debug!(index, "duration probe gave up");
        if results
            .send(ProbeOutcome {
                index,
                duration: None,
            })
            .is_err()
        {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings(batch_size: usize, timeout_ms: u64, batch_pause_ms: u64) -> ProbeSettings {
        ProbeSettings {
            enabled: true,
            timeout_ms,
            batch_size,
            batch_pause_ms,
        }
    }

    fn jobs(n: usize) -> Vec<(usize, PathBuf)> {
        (0..n)
            .map(|i| (i, PathBuf::from(format!("/music/{i}.mp3"))))
            .collect()
    }

    fn collect_all(handle: &ProbeHandle) -> Vec<ProbeOutcome> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut all = Vec::new();
        while Instant::now() < deadline {
            let (mut batch, finished) = handle.drain();
            all.append(&mut batch);
            if finished {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        all
    }

    #[test]
    fn every_job_gets_exactly_one_outcome() {
        let probe: ProbeFn = Arc::new(|_: &Path| Some(Duration::from_secs(1)));
        let handle = spawn(jobs(7), &settings(3, 1_000, 1), probe);

        let mut indices: Vec<usize> = collect_all(&handle).iter().map(|o| o.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn never_runs_more_than_one_batch_at_once() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, p) = (running.clone(), peak.clone());
        let probe: ProbeFn = Arc::new(move |_: &Path| {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            r.fetch_sub(1, Ordering::SeqCst);
            None
        });

        let handle = spawn(jobs(10), &settings(2, 1_000, 1), probe);
        let outcomes = collect_all(&handle);

        assert_eq!(outcomes.len(), 10);
        assert!(outcomes.iter().all(|o| o.duration.is_none()));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn timed_out_reads_keep_their_slot_until_they_return() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, p) = (running.clone(), peak.clone());
        let probe: ProbeFn = Arc::new(move |_: &Path| {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(150));
            r.fetch_sub(1, Ordering::SeqCst);
            Some(Duration::from_secs(1))
        });

        let handle = spawn(jobs(6), &settings(2, 20, 1), probe);
        let outcomes = collect_all(&handle);

        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(|o| o.duration.is_none()));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn probes_over_budget_are_reported_as_unknown() {
        let probe: ProbeFn = Arc::new(|path: &Path| {
            if path.ends_with("0.mp3") {
                thread::sleep(Duration::from_millis(300));
            }
            Some(Duration::from_secs(5))
        });
        let handle = spawn(jobs(2), &settings(2, 30, 1), probe);
        let mut outcomes = collect_all(&handle);
        outcomes.sort_by_key(|o| o.index);

        assert_eq!(
            outcomes,
            vec![
                ProbeOutcome {
                    index: 0,
                    duration: None
                },
                ProbeOutcome {
                    index: 1,
                    duration: Some(Duration::from_secs(5))
                },
            ]
        );
    }

    #[test]
    fn dropping_the_handle_stops_further_batches() {
        let started = Arc::new(AtomicUsize::new(0));
        let s = started.clone();
        let probe: ProbeFn = Arc::new(move |_: &Path| {
            s.fetch_add(1, Ordering::SeqCst);
            Some(Duration::from_secs(1))
        });

        let handle = spawn(jobs(20), &settings(1, 1_000, 200), probe);
        thread::sleep(Duration::from_millis(50));
        drop(handle);
        thread::sleep(Duration::from_millis(500));

        assert!(started.load(Ordering::SeqCst) < 20);
    }

    #[test]
    fn read_duration_of_garbage_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert_eq!(read_duration(&path), None);
        assert_eq!(read_duration(&dir.path().join("missing.mp3")), None);
    }
}
