//! Background worker resolving which repository owns a buffer.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::{resolve_repository, BufferId, RepositoryProvider, SharedRepository};

/// A repository lookup for one buffer.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Bind request id; answers carry it back.
    pub id: u64,
    /// Buffer asking.
    pub buffer: BufferId,
    /// Buffer path. Path-less buffers resolve to no repository.
    pub path: Option<PathBuf>,
    /// Project root directories at the time of the request.
    pub directories: Vec<PathBuf>,
}

/// Answer to a [`ResolveRequest`].
pub struct ResolveResponse {
    /// Id of the request answered.
    pub id: u64,
    /// Buffer that asked.
    pub buffer: BufferId,
    /// Repository found, if any.
    pub repository: Option<SharedRepository>,
}

impl std::fmt::Debug for ResolveResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveResponse")
            .field("id", &self.id)
            .field("buffer", &self.buffer)
            .field(
                "repository",
                &self.repository.as_ref().map(|r| r.workdir().to_path_buf()),
            )
            .finish()
    }
}

/// Cloneable handle for submitting lookups.
#[derive(Debug, Clone)]
pub struct ResolverHandle {
    tx: Sender<ResolveRequest>,
}

impl ResolverHandle {
    /// Queue a lookup. Returns false if the worker has stopped.
    pub fn submit(&self, request: ResolveRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}

/// Owns the worker thread and the response channel.
pub struct Resolver {
    handle: Option<ResolverHandle>,
    response_rx: Receiver<ResolveResponse>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("running", &self.handle.is_some())
            .field("thread", &self.thread.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Resolver {
    /// Spawn the worker thread over `provider`.
    pub fn spawn(provider: Arc<dyn RepositoryProvider>) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<ResolveRequest>();
        let (response_tx, response_rx) = mpsc::channel::<ResolveResponse>();

        let thread = thread::Builder::new()
            .name("gitgutter-resolver".into())
            .spawn(move || worker_loop(provider, request_rx, response_tx))
            .map_err(|e| tracing::error!(error = %e, "failed to spawn resolver thread"))
            .ok();

        Self {
            handle: thread.as_ref().map(|_| ResolverHandle { tx: request_tx }),
            response_rx,
            thread,
        }
    }

    /// Handle for submitting lookups, `None` once shut down.
    pub fn handle(&self) -> Option<ResolverHandle> {
        self.handle.clone()
    }

    /// Next finished lookup, without blocking.
    pub fn try_recv(&self) -> Option<ResolveResponse> {
        match self.response_rx.try_recv() {
            Ok(response) => Some(response),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Stop accepting requests and join the worker.
    ///
    /// Outstanding handles held elsewhere keep the channel open; the worker
    /// exits once the last one is dropped.
    pub fn shutdown(&mut self) {
        self.handle = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    provider: Arc<dyn RepositoryProvider>,
    request_rx: Receiver<ResolveRequest>,
    response_tx: Sender<ResolveResponse>,
) {
    while let Ok(req) = request_rx.recv() {
        let repository = req
            .path
            .as_deref()
            .and_then(|path| resolve_repository(provider.as_ref(), &req.directories, path));

        tracing::debug!(
            buffer = req.buffer.0,
            id = req.id,
            found = repository.is_some(),
            "repository resolved"
        );

        let response = ResolveResponse {
            id: req.id,
            buffer: req.buffer,
            repository,
        };
        if response_tx.send(response).is_err() {
            break;
        }
    }
}
