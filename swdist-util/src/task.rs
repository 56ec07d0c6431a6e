//! Running parses and extractions off the caller's thread.

use crate::extract::{DistExtractor, ExtractResult};
use crate::options::ExtractOptions;
use crate::progress::ExtractProgress;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use swdist_idb::{FileEntry, ParseError, ParseResult};

/// A product to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub root: PathBuf,
    pub product: String,
}

/// A finished parse and the request it answers.
#[derive(Debug)]
pub struct ScanOutcome {
    pub request: ScanRequest,
    pub result: Result<ParseResult, ParseError>,
}

#[derive(Default)]
struct ScanState {
    queued: Option<ScanRequest>,
    busy: bool,
    shutdown: bool,
}

struct ScanShared {
    state: Mutex<ScanState>,
    wake: Condvar,
}

impl ScanShared {
    fn lock(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parses manifests on a background thread, one at a time.
///
/// A request made while a parse is running is queued, and a newer request
/// replaces the queued one, so only the latest request runs once the worker
/// is free. Results arrive through [`ScanWorker::recv`].
pub struct ScanWorker {
    shared: Arc<ScanShared>,
    results: Receiver<ScanOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl ScanWorker {
    pub fn spawn() -> io::Result<Self> {
        let shared = Arc::new(ScanShared {
            state: Mutex::new(ScanState::default()),
            wake: Condvar::new(),
        });
        let (tx, results) = mpsc::channel();
        let worker = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name("swdist-scan".into())
            .spawn(move || scan_loop(&worker, &tx))?;

        Ok(Self {
            shared,
            results,
            handle: Some(handle),
        })
    }

    /// Asks for `product` in `root` to be parsed.
    pub fn request(&self, root: impl Into<PathBuf>, product: impl Into<String>) {
        let request = ScanRequest {
            root: root.into(),
            product: product.into(),
        };
        let mut state = self.shared.lock();

        if let Some(replaced) = state.queued.replace(request) {
            tracing::debug!(product = %replaced.product, "superseded queued scan");
        }

        self.shared.wake.notify_one();
    }

    /// Returns `true` while a parse is running or queued.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        let state = self.shared.lock();
        state.busy || state.queued.is_some()
    }

    /// Waits for the next finished parse.
    pub fn recv(&self) -> Option<ScanOutcome> {
        self.results.recv().ok()
    }

    /// Returns a finished parse if one is ready.
    pub fn try_recv(&self) -> Option<ScanOutcome> {
        self.results.try_recv().ok()
    }
}

impl Drop for ScanWorker {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_one();

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn scan_loop(shared: &ScanShared, tx: &Sender<ScanOutcome>) {
    loop {
        let request = {
            let mut state = shared.lock();

            while state.queued.is_none() && !state.shutdown {
                state = shared
                    .wake
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }

            if state.shutdown {
                return;
            }

            let Some(request) = state.queued.take() else {
                continue;
            };

            state.busy = true;
            request
        };

        let result = swdist_idb::parse(&request.root, &request.product);

        // Not busy by the time the result can be received.
        shared.lock().busy = false;

        if tx.send(ScanOutcome { request, result }).is_err() {
            return;
        }
    }
}

/// Wraps a progress reporter so a flag can cancel the run.
struct Cancelable<P> {
    inner: P,
    cancel: Arc<AtomicBool>,
}

impl<P: ExtractProgress> ExtractProgress for Cancelable<P> {
    fn entry_start(&self, current: usize, total: usize, name: &str) -> bool {
        !self.cancel.load(Ordering::Relaxed) && self.inner.entry_start(current, total, name)
    }

    fn entry_failed(&self, name: &str, reason: &str) {
        self.inner.entry_failed(name, reason);
    }

    fn entry_skipped(&self, name: &str) {
        self.inner.entry_skipped(name);
    }

    fn completed(&self, result: &ExtractResult) {
        self.inner.completed(result);
    }
}

/// A running extraction.
pub struct ExtractTask {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<ExtractResult>,
}

impl ExtractTask {
    /// Asks the run to stop before its next entry.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the run to end.
    pub fn join(self) -> ExtractResult {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Starts extracting `entries` on a background thread.
pub fn spawn_extract<P>(
    root: PathBuf,
    entries: Vec<FileEntry>,
    output: PathBuf,
    options: ExtractOptions,
    progress: P,
) -> io::Result<ExtractTask>
where
    P: ExtractProgress + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let progress = Cancelable {
        inner: progress,
        cancel: Arc::clone(&cancel),
    };

    let handle = thread::Builder::new()
        .name("swdist-extract".into())
        .spawn(move || DistExtractor::new(&root, progress, options).extract(&entries, &output))?;

    Ok(ExtractTask { cancel, handle })
}
