//! Scripted in-memory connector for queue tests.
//!
//! Each request is a [`Step`] describing how the "device" behaves; every
//! create/write/teardown is recorded on a shared [`Probe`].

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::connector::Connector;
use crate::core::{Destination, TransportKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Create(u32),
    Start(u32, &'static str),
    Finish(u32, &'static str),
    Teardown(u32),
    ForceTeardown(u32, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Reply,
    Fail,
    Hang,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub label: &'static str,
    pub delay: Duration,
    pub outcome: Outcome,
}

impl Step {
    pub fn reply(label: &'static str) -> Self {
        Self::reply_after(label, 0)
    }

    pub fn reply_after(label: &'static str, delay_ms: u64) -> Self {
        Self {
            label,
            delay: Duration::from_millis(delay_ms),
            outcome: Outcome::Reply,
        }
    }

    pub fn fail(label: &'static str) -> Self {
        Self {
            label,
            delay: Duration::ZERO,
            outcome: Outcome::Fail,
        }
    }

    pub fn hang(label: &'static str) -> Self {
        Self {
            label,
            delay: Duration::ZERO,
            outcome: Outcome::Hang,
        }
    }
}

#[derive(Debug, Default)]
pub struct Probe {
    events: Mutex<Vec<Event>>,
    next_handle: AtomicU32,
    create_failures: AtomicUsize,
    create_hangs: AtomicUsize,
    teardown_failures: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Probe {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn creates(&self) -> usize {
        self.count(|e| matches!(e, Event::Create(_)))
    }

    pub fn teardowns(&self) -> usize {
        self.count(|e| matches!(e, Event::Teardown(_)))
    }

    pub fn finished(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Finish(_, label) => Some(label),
                _ => None,
            })
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fail_next_creates(&self, n: usize) {
        self.create_failures.store(n, Ordering::SeqCst);
    }

    /// The next `n` creates never complete.
    pub fn hang_next_creates(&self, n: usize) {
        self.create_hangs.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_teardowns(&self, n: usize) {
        self.teardown_failures.store(n, Ordering::SeqCst);
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| f(e)).count()
    }

    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }
}

/// Decrements the in-flight counter even when the round trip is dropped
/// mid-way by a timeout or destroy.
struct InFlight<'a>(&'a Probe);

impl<'a> InFlight<'a> {
    fn enter(probe: &'a Probe) -> Self {
        let now = probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(probe)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    probe: Arc<Probe>,
}

impl ScriptedConnector {
    pub fn probe(&self) -> Arc<Probe> {
        Arc::clone(&self.probe)
    }
}

impl Connector for ScriptedConnector {
    type Handle = u32;
    type Request = Step;
    type Response = String;

    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
    }

    async fn create(&self, _destination: &Destination) -> io::Result<u32> {
        if Probe::take_one(&self.probe.create_hangs) {
            return std::future::pending().await;
        }
        if Probe::take_one(&self.probe.create_failures) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "scripted refusal"));
        }

        let id = self.probe.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.record(Event::Create(id));
        Ok(id)
    }

    async fn write_and_await(
        &self,
        handle: &mut u32,
        request: &Step,
        _destination: &Destination,
        _timeout: Duration,
    ) -> io::Result<String> {
        let id = *handle;
        let _guard = InFlight::enter(&self.probe);
        self.probe.record(Event::Start(id, request.label));

        if !request.delay.is_zero() {
            tokio::time::sleep(request.delay).await;
        }

        match request.outcome {
            Outcome::Reply => {
                self.probe.record(Event::Finish(id, request.label));
                Ok(request.label.to_string())
            }
            Outcome::Fail => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "scripted failure",
            )),
            Outcome::Hang => std::future::pending().await,
        }
    }

    async fn teardown(&self, handle: u32) -> io::Result<()> {
        self.probe.record(Event::Teardown(handle));
        if Probe::take_one(&self.probe.teardown_failures) {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "scripted shutdown failure"));
        }
        Ok(())
    }

    fn force_teardown(&self, handle: u32, reason: &str) {
        self.probe
            .record(Event::ForceTeardown(handle, reason.to_string()));
    }
}
