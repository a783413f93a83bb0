//! In-memory checks and transport shared by the integration tests.
//!
//! `ScriptedTransport` records every payload sent and replays queued replies
//! in order; failures can be injected at each transport entry point.

#![allow(dead_code)]

use guestrpc::{
    CapabilityOracle, Channel, HypervisorPresence, IoPrivilege, PrivilegeEscalator, ProtocolId,
    Transport,
};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

// =============================================================================
// Transport
// =============================================================================

/// Recorded state of a [`ScriptedTransport`].
#[derive(Debug, Default)]
pub struct Script {
    pub opened: Vec<ProtocolId>,
    pub sent: Vec<Vec<u8>>,
    pub replies: VecDeque<io::Result<Vec<u8>>>,
    pub receives: usize,
    pub closed: usize,
    pub knocks: usize,
    pub knock_answer: bool,
    pub fail_open: bool,
    pub fail_send: bool,
    pub fail_close: bool,
    pub fail_knock: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose knock is answered.
    pub fn answering() -> Self {
        let transport = Self::new();
        transport.script().knock_answer = true;
        transport
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    /// Queues a raw reply.
    pub fn reply(&self, raw: &[u8]) -> &Self {
        self.script().replies.push_back(Ok(raw.to_vec()));
        self
    }

    /// Queues a receive failure.
    pub fn reply_error(&self, kind: io::ErrorKind) -> &Self {
        self.script()
            .replies
            .push_back(Err(io::Error::new(kind, "scripted receive failure")));
        self
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.script().sent.clone()
    }

    /// Number of channel operations performed (opens excluded).
    pub fn io_count(&self) -> usize {
        let script = self.script();
        script.sent.len() + script.receives + script.closed
    }

    pub fn shared(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, protocol: ProtocolId, _privilege: &IoPrivilege) -> io::Result<Box<dyn Channel>> {
        let mut script = self.script();
        if script.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted open failure",
            ));
        }
        script.opened.push(protocol);

        Ok(Box::new(ScriptedChannel {
            script: Arc::clone(&self.script),
        }))
    }

    fn knock(&self, _privilege: &IoPrivilege) -> io::Result<bool> {
        let mut script = self.script();
        script.knocks += 1;
        if script.fail_knock {
            return Err(io::Error::other("scripted knock failure"));
        }
        Ok(script.knock_answer)
    }
}

struct ScriptedChannel {
    script: Arc<Mutex<Script>>,
}

impl Channel for ScriptedChannel {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let mut script = self.script.lock().unwrap();
        if script.fail_send {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted send failure",
            ));
        }
        script.sent.push(data.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> io::Result<Vec<u8>> {
        let mut script = self.script.lock().unwrap();
        script.receives += 1;
        script.replies.pop_front().unwrap_or_else(|| {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no reply queued",
            ))
        })
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        let mut script = self.script.lock().unwrap();
        script.closed += 1;
        if script.fail_close {
            return Err(io::Error::other("scripted close failure"));
        }
        Ok(())
    }
}

// =============================================================================
// Checks
// =============================================================================

/// Oracle with fixed answers that counts how often it was asked.
#[derive(Debug, Clone)]
pub struct FakeOracle {
    presence: HypervisorPresence,
    vendor: Option<String>,
    pub vendor_queries: Arc<AtomicUsize>,
}

impl FakeOracle {
    pub fn bare_metal() -> Self {
        Self::new(HypervisorPresence::Absent, None)
    }

    pub fn hypervisor(vendor: &str) -> Self {
        Self::new(HypervisorPresence::Present, Some(vendor.to_string()))
    }

    pub fn new(presence: HypervisorPresence, vendor: Option<String>) -> Self {
        Self {
            presence,
            vendor,
            vendor_queries: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl CapabilityOracle for FakeOracle {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn hypervisor_presence(&self) -> HypervisorPresence {
        self.presence
    }

    fn hypervisor_vendor(&self) -> Option<String> {
        self.vendor_queries.fetch_add(1, Ordering::SeqCst);
        self.vendor.clone()
    }
}

/// Escalator that counts raises and optionally fails them.
#[derive(Debug, Clone, Default)]
pub struct CountingEscalator {
    fail: bool,
    pub calls: Arc<AtomicUsize>,
}

impl CountingEscalator {
    pub fn granting() -> Self {
        Self::default()
    }

    pub fn denying() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PrivilegeEscalator for CountingEscalator {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn raise(&self) -> io::Result<IoPrivilege> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(io::Error::from_raw_os_error(1));
        }
        // SAFETY: only handed to the scripted transport, which does no port I/O.
        Ok(unsafe { IoPrivilege::granted(3) })
    }
}

/// Permit for tests that start sessions directly.
pub fn permit() -> IoPrivilege {
    // SAFETY: only handed to the scripted transport, which does no port I/O.
    unsafe { IoPrivilege::granted(3) }
}

/// Formatted log output collected by [`capture_logs`].
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Lines containing `needle`.
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.contains(needle))
            .collect()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a thread-local subscriber and returns what it logged.
///
/// Targets are omitted so a span name shows up as the only `name:` prefix.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, LogCapture) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_target(false)
        .with_writer(move || writer.clone())
        .finish();

    let out = tracing::subscriber::with_default(subscriber, f);
    (out, capture)
}

/// Installs a subscriber so log statements are evaluated.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
