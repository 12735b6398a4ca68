//! Serialized command queue over a single socket.
//!
//! A [`SocketQueue`] owns one socket handle and one worker task. Every
//! [`send`](SocketQueue::send) appends an entry to an unbounded FIFO; the
//! worker pulls the next entry only after the previous entry's completion has
//! been delivered, so at most one round trip is ever in flight on the socket.
//!
//! Failure policy:
//!
//! - A transport error or timeout on the active entry closes the socket before
//!   the error is delivered. The next entry creates a fresh socket, so a late
//!   response can never be read as the answer to a different command.
//! - [`destroy`](SocketQueue::destroy) aborts the socket and fails every entry
//!   queued or active at that instant with [`QueueError::Destroyed`].
//! - An entry's timeout starts when the worker picks it up and covers lazy
//!   socket creation as well as the round trip. A creation that runs out the
//!   budget fails the entry with [`QueueError::Timeout`] and leaves the socket
//!   unbound for the next entry.
//! - Nothing is retried.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use super::connector::Connector;
use super::error::{QueueError, QueueResult};
use super::state::{QueueId, Slot, SocketState};
use crate::core::constants::DEFAULT_TIMEOUT;
use crate::core::{Destination, TransportKind};
use crate::logging::Logger;

/// Reason reported when the worker task is gone before an entry completed.
const WORKER_STOPPED: &str = "queue worker stopped";

/// Queue configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Timeout for entries sent without an explicit one.
    pub default_timeout: Duration,
    /// Close an idle bound socket after this long with an empty queue.
    pub idle_timeout: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            idle_timeout: None,
        }
    }
}

/// Builder for [`QueueConfig`].
#[derive(Debug, Clone, Default)]
pub struct QueueConfigBuilder {
    config: QueueConfig,
}

impl QueueConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default per-entry timeout.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Close the socket after it has been idle this long.
    pub fn idle_timeout(mut self, idle: Duration) -> Self {
        self.config.idle_timeout = Some(idle);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> QueueConfig {
        self.config
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Overrides the queue's default timeout for this entry.
    pub timeout: Option<Duration>,
}

impl SendOptions {
    /// Options with an explicit timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Factory<H> = Box<dyn FnOnce() -> BoxFuture<io::Result<H>> + Send>;

struct Entry<C: Connector> {
    request: C::Request,
    destination: Destination,
    timeout: Duration,
    epoch: u64,
    reply: oneshot::Sender<QueueResult<C::Response>>,
}

enum Command<C: Connector> {
    Send(Entry<C>),
    Create {
        factory: Factory<C::Handle>,
        epoch: u64,
        reply: oneshot::Sender<QueueResult<()>>,
    },
}

struct Shared<C: Connector> {
    id: QueueId,
    connector: C,
    logger: Arc<dyn Logger>,
    config: QueueConfig,
    slot: Mutex<Slot<C::Handle>>,
    /// Bumped by every `destroy`; entries tagged with an older epoch fail.
    epoch: watch::Sender<u64>,
    destroy_reason: Mutex<String>,
    pending: AtomicUsize,
}

impl<C: Connector> Shared<C> {
    fn current_epoch(&self) -> u64 {
        *self.epoch.borrow()
    }

    fn destroyed(&self) -> QueueError {
        QueueError::Destroyed(self.destroy_reason.lock().clone())
    }

    fn state(&self) -> SocketState {
        self.slot.lock().state()
    }

    /// Graceful close. A failed shutdown is logged; the handle is gone
    /// either way.
    async fn close_handle(&self, handle: C::Handle) {
        if let Err(e) = self.connector.teardown(handle).await {
            self.logger
                .warn(format_args!("[{}] socket shutdown failed: {}", self.id, e));
        }
    }

    /// Tear down a handle the worker no longer wants.
    async fn dispose(&self, handle: C::Handle, destroyed: bool) {
        if destroyed {
            let reason = self.destroy_reason.lock().clone();
            self.connector.force_teardown(handle, &reason);
        } else {
            self.close_handle(handle).await;
        }
    }
}

/// Future resolving to the outcome of one queued entry.
///
/// Dropping it does not cancel the entry; the result is discarded.
pub struct ResponseFuture<T> {
    rx: oneshot::Receiver<QueueResult<T>>,
}

impl<T> Future for ResponseFuture<T> {
    type Output = QueueResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(QueueError::Destroyed(WORKER_STOPPED.into()))))
    }
}

impl<T> fmt::Debug for ResponseFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFuture").finish_non_exhaustive()
    }
}

/// At-most-one-in-flight command queue over a single socket.
///
/// Share it between tasks behind an `Arc`. Dropping the last handle lets the
/// worker finish the backlog and close the socket, unless
/// [`unref`](SocketQueue::unref) was called.
pub struct SocketQueue<C: Connector> {
    shared: Arc<Shared<C>>,
    tx: mpsc::UnboundedSender<Command<C>>,
    worker: AbortHandle,
    unref: AtomicBool,
}

impl<C: Connector> SocketQueue<C> {
    /// Create a queue and spawn its worker.
    ///
    /// No socket is created until the first send or [`open`](Self::open).
    /// Must be called from within a Tokio runtime.
    pub fn new(connector: C, config: QueueConfig, logger: Arc<dyn Logger>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (epoch, epoch_rx) = watch::channel(0);

        let shared = Arc::new(Shared {
            id: QueueId::next(),
            connector,
            logger,
            config,
            slot: Mutex::new(Slot::Unbound),
            epoch,
            destroy_reason: Mutex::new(String::new()),
            pending: AtomicUsize::new(0),
        });

        let worker = Worker {
            shared: Arc::clone(&shared),
            rx,
            epoch_rx,
        };
        let worker = tokio::spawn(worker.run()).abort_handle();

        Self {
            shared,
            tx,
            worker,
            unref: AtomicBool::new(false),
        }
    }

    /// Label identifying this queue's socket in log output.
    pub fn id(&self) -> QueueId {
        self.shared.id
    }

    /// Transport kind of the socket.
    pub fn kind(&self) -> TransportKind {
        self.shared.connector.kind()
    }

    /// Current socket state.
    pub fn state(&self) -> SocketState {
        self.shared.state()
    }

    /// Entries sent and not yet completed, including the active one.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Enqueue a command.
    ///
    /// Returns immediately; the entry's position in the queue is fixed at call
    /// time, not when the returned future is first polled.
    pub fn send(
        &self,
        request: C::Request,
        destination: Destination,
        options: SendOptions,
    ) -> ResponseFuture<C::Response> {
        let timeout = options.timeout.unwrap_or(self.shared.config.default_timeout);
        let (reply, rx) = oneshot::channel();
        let entry = Entry {
            request,
            destination,
            timeout,
            epoch: self.shared.current_epoch(),
            reply,
        };

        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(Command::Send(entry)).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
        }

        ResponseFuture { rx }
    }

    /// Create the socket with a caller-supplied factory.
    ///
    /// Runs in queue order. Fails with [`QueueError::AlreadyCreated`] if a live
    /// socket exists when its turn comes, and with
    /// [`QueueError::CreationFailed`] if the factory fails (the socket is left
    /// unbound).
    pub async fn create_socket<F, Fut>(&self, factory: F) -> QueueResult<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = io::Result<C::Handle>> + Send + 'static,
    {
        let factory: Factory<C::Handle> =
            Box::new(move || -> BoxFuture<io::Result<C::Handle>> { Box::pin(factory()) });
        let (reply, rx) = oneshot::channel();

        let command = Command::Create {
            factory,
            epoch: self.shared.current_epoch(),
            reply,
        };
        if self.tx.send(command).is_err() {
            return Err(QueueError::Destroyed(WORKER_STOPPED.into()));
        }

        rx.await
            .unwrap_or_else(|_| Err(QueueError::Destroyed(WORKER_STOPPED.into())))
    }

    /// Create the socket through the queue's connector.
    pub async fn open(&self, destination: Destination) -> QueueResult<()> {
        let shared = Arc::clone(&self.shared);
        self.create_socket(move || async move { shared.connector.create(&destination).await })
            .await
    }

    /// Gracefully close the socket.
    ///
    /// Idempotent. If a command is active, the socket is released as soon as
    /// that command completes.
    pub async fn close(&self) {
        let id = self.shared.id;
        let previous = {
            let mut slot = self.shared.slot.lock();
            match *slot {
                Slot::Bound(_) | Slot::Busy => slot.take(Slot::Unbound),
                Slot::Unbound | Slot::Destroyed => Slot::Unbound,
            }
        };

        match previous {
            Slot::Bound(handle) => {
                self.shared.logger.debug(format_args!("[{}] closing socket", id));
                self.shared.close_handle(handle).await;
            }
            Slot::Busy => {
                self.shared.logger.debug(format_args!(
                    "[{}] close requested during active command; closing when it completes",
                    id
                ));
            }
            Slot::Unbound | Slot::Destroyed => {
                self.shared.logger.trace(format_args!("[{}] close: socket not bound", id));
            }
        }
    }

    /// Abort the socket and fail everything queued or active.
    ///
    /// Later sends create a fresh socket.
    pub fn destroy(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let id = self.shared.id;

        *self.shared.destroy_reason.lock() = reason.clone();
        let previous = self.shared.slot.lock().take(Slot::Destroyed);
        self.shared.epoch.send_modify(|epoch| *epoch += 1);

        self.shared.logger.warn(format_args!(
            "[{}] destroying socket ({} pending): {}",
            id,
            self.pending(),
            reason
        ));

        if let Slot::Bound(handle) = previous {
            self.shared.connector.force_teardown(handle, &reason);
        }
    }

    /// Do not let this queue's worker outlive the last handle.
    ///
    /// After this, dropping the queue aborts the worker immediately; entries
    /// still queued resolve with [`QueueError::Destroyed`].
    pub fn unref(&self) {
        self.unref.store(true, Ordering::SeqCst);
    }

    /// Whether [`unref`](Self::unref) has been called.
    pub fn is_unref(&self) -> bool {
        self.unref.load(Ordering::SeqCst)
    }
}

impl<C: Connector> Drop for SocketQueue<C> {
    fn drop(&mut self) {
        if self.is_unref() {
            self.worker.abort();
        }
    }
}

impl<C: Connector> fmt::Debug for SocketQueue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketQueue")
            .field("id", &self.shared.id)
            .field("kind", &self.kind())
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}

enum Outcome<R> {
    Done(R),
    Failed(QueueError),
    Destroyed,
}

/// Drains the queue one command at a time.
struct Worker<C: Connector> {
    shared: Arc<Shared<C>>,
    rx: mpsc::UnboundedReceiver<Command<C>>,
    epoch_rx: watch::Receiver<u64>,
}

impl<C: Connector> Worker<C> {
    async fn run(mut self) {
        while let Some(command) = self.next_command().await {
            match command {
                Command::Send(entry) => self.serve(entry).await,
                Command::Create {
                    factory,
                    epoch,
                    reply,
                } => {
                    let result = self.create(factory, epoch).await;
                    let _ = reply.send(result);
                }
            }
        }

        let previous = self.shared.slot.lock().take(Slot::Unbound);
        if let Slot::Bound(handle) = previous {
            self.shared
                .logger
                .debug(format_args!("[{}] queue dropped, closing socket", self.shared.id));
            self.shared.close_handle(handle).await;
        }
    }

    async fn next_command(&mut self) -> Option<Command<C>> {
        loop {
            let bound = matches!(self.shared.state(), SocketState::Bound);
            let idle = match self.shared.config.idle_timeout {
                Some(idle) if bound => idle,
                _ => return self.rx.recv().await,
            };

            match tokio::time::timeout(idle, self.rx.recv()).await {
                Ok(command) => return command,
                Err(_) => self.close_idle(idle).await,
            }
        }
    }

    async fn close_idle(&self, idle: Duration) {
        let previous = {
            let mut slot = self.shared.slot.lock();
            match *slot {
                Slot::Bound(_) => slot.take(Slot::Unbound),
                _ => Slot::Unbound,
            }
        };

        if let Slot::Bound(handle) = previous {
            self.shared.logger.debug(format_args!(
                "[{}] socket idle for {}ms, closing",
                self.shared.id,
                idle.as_millis()
            ));
            self.shared.close_handle(handle).await;
        }
    }

    /// True if a `destroy` happened after `epoch`. Also marks the current
    /// epoch as seen, so `changed()` only reports later destroys.
    fn is_stale(&mut self, epoch: u64) -> bool {
        let current = *self.epoch_rx.borrow_and_update();
        epoch < current
    }

    /// Take the handle, leaving the slot `Busy`. `None` means one must be
    /// created.
    fn checkout(&self) -> Option<C::Handle> {
        match self.shared.slot.lock().take(Slot::Busy) {
            Slot::Bound(handle) => Some(handle),
            _ => None,
        }
    }

    /// Return a healthy handle. If the socket was closed or destroyed while
    /// checked out, tear the handle down instead.
    async fn checkin(&self, handle: C::Handle) {
        let displaced = {
            let mut slot = self.shared.slot.lock();
            if slot.is_busy() {
                *slot = Slot::Bound(handle);
                None
            } else {
                Some((handle, slot.state() == SocketState::Destroyed))
            }
        };

        if let Some((handle, destroyed)) = displaced {
            self.shared.dispose(handle, destroyed).await;
        }
    }

    /// Close a handle after a failed round trip.
    async fn discard(&self, handle: C::Handle) {
        let destroyed = {
            let mut slot = self.shared.slot.lock();
            if slot.is_busy() {
                *slot = Slot::Unbound;
                false
            } else {
                slot.state() == SocketState::Destroyed
            }
        };

        self.shared
            .logger
            .debug(format_args!("[{}] closing socket after failure", self.shared.id));
        self.shared.dispose(handle, destroyed).await;
    }

    fn release_busy(&self, next: Slot<C::Handle>) {
        let mut slot = self.shared.slot.lock();
        if slot.is_busy() {
            *slot = next;
        }
    }

    /// Await a socket factory. The slot must already be `Busy`; any failure
    /// puts it back to `Unbound`.
    async fn establish<F>(&mut self, creating: F, kind: TransportKind) -> QueueResult<C::Handle>
    where
        F: Future<Output = QueueResult<C::Handle>> + Send,
    {
        let id = self.shared.id;
        self.shared
            .logger
            .debug(format_args!("[{}] creating {} socket", id, kind));

        let outcome = tokio::select! {
            biased;
            _ = self.epoch_rx.changed() => None,
            result = creating => Some(result),
        };

        match outcome {
            Some(Ok(handle)) => {
                self.shared.logger.debug(format_args!("[{}] socket created", id));
                Ok(handle)
            }
            Some(Err(e)) => {
                self.shared
                    .logger
                    .error(format_args!("[{}] socket creation failed: {}", id, e));
                self.release_busy(Slot::Unbound);
                Err(e)
            }
            None => {
                self.release_busy(Slot::Destroyed);
                Err(self.shared.destroyed())
            }
        }
    }

    async fn create(&mut self, factory: Factory<C::Handle>, epoch: u64) -> QueueResult<()> {
        if self.is_stale(epoch) {
            return Err(self.shared.destroyed());
        }

        let allowed = {
            let mut slot = self.shared.slot.lock();
            let allowed = slot.state().can_create();
            if allowed {
                *slot = Slot::Busy;
            }
            allowed
        };
        if !allowed {
            self.shared.logger.debug(format_args!(
                "[{}] create rejected: socket already exists",
                self.shared.id
            ));
            return Err(QueueError::AlreadyCreated);
        }

        let kind = self.shared.connector.kind();
        let creating = async move { factory().await.map_err(QueueError::CreationFailed) };
        let handle = self.establish(creating, kind).await?;
        self.checkin(handle).await;
        Ok(())
    }

    async fn serve(&mut self, entry: Entry<C>) {
        let Entry {
            request,
            destination,
            timeout,
            epoch,
            reply,
        } = entry;

        let result = self.execute(&request, &destination, timeout, epoch).await;
        self.shared.pending.fetch_sub(1, Ordering::SeqCst);

        if reply.send(result).is_err() {
            self.shared.logger.trace(format_args!(
                "[{}] caller dropped response for {}",
                self.shared.id, destination
            ));
        }
    }

    async fn execute(
        &mut self,
        request: &C::Request,
        destination: &Destination,
        timeout: Duration,
        epoch: u64,
    ) -> QueueResult<C::Response> {
        let shared = Arc::clone(&self.shared);
        let id = shared.id;
        // One budget covers lazy creation and the round trip.
        let deadline = Instant::now() + timeout;

        if self.is_stale(epoch) {
            shared
                .logger
                .debug(format_args!("[{}] dropping entry for {}: socket destroyed", id, destination));
            return Err(shared.destroyed());
        }

        shared.logger.debug(format_args!(
            "[{}] send to {} (timeout {}ms)",
            id,
            destination,
            timeout.as_millis()
        ));
        shared.logger.trace(format_args!("[{}] payload: {:?}", id, request));

        let mut handle = match self.checkout() {
            Some(handle) => handle,
            None => {
                let creating = async {
                    match tokio::time::timeout_at(deadline, shared.connector.create(destination)).await {
                        Ok(created) => created.map_err(QueueError::CreationFailed),
                        Err(_) => Err(QueueError::Timeout(timeout)),
                    }
                };
                self.establish(creating, shared.connector.kind()).await?
            }
        };

        let outcome = {
            let io = shared
                .connector
                .write_and_await(&mut handle, request, destination, timeout);

            tokio::select! {
                biased;
                _ = self.epoch_rx.changed() => Outcome::Destroyed,
                result = tokio::time::timeout_at(deadline, io) => match result {
                    Ok(Ok(response)) => Outcome::Done(response),
                    Ok(Err(e)) => Outcome::Failed(QueueError::Transport(e)),
                    Err(_) => Outcome::Failed(QueueError::Timeout(timeout)),
                },
            }
        };

        match outcome {
            Outcome::Done(response) => {
                shared
                    .logger
                    .debug(format_args!("[{}] response from {}", id, destination));
                self.checkin(handle).await;
                Ok(response)
            }
            Outcome::Failed(err) => {
                shared
                    .logger
                    .error(format_args!("[{}] send to {} failed: {}", id, destination, err));
                self.discard(handle).await;
                Err(err)
            }
            Outcome::Destroyed => {
                self.release_busy(Slot::Destroyed);
                shared.dispose(handle, true).await;
                Err(shared.destroyed())
            }
        }
    }
}
