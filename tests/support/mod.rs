//! An in-memory duplex `Transport`, used by the integration tests in place
//! of a real socket (see SPEC_FULL.md "Test tooling"). A `MemoryTransport`
//! is a cheap-to-clone handle over shared inbound/outbound queues, so a
//! test can hand one clone to `Connection::open` (which takes ownership of
//! a `Box<dyn Transport>`) while keeping another clone to keep feeding
//! fake server bytes in as the scenario progresses.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Once;

use bolt_core::transport::Transport;

static LOG_INIT: Once = Once::new();

/// Routes `tracing`'s status-transition logging through `env_logger` so
/// `cargo test -- --nocapture` shows connection state changes. Safe to call
/// from every test; only the first call has any effect.
pub fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

#[derive(Debug, Default)]
struct Inner {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTransport(Rc<RefCell<Inner>>);

impl MemoryTransport {
    pub fn new() -> MemoryTransport {
        MemoryTransport::default()
    }

    /// Queues bytes for the connection's next `recv` calls to consume.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.0.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    /// Everything written via `send` so far.
    pub fn outbound(&self) -> Vec<u8> {
        self.0.borrow().outbound.clone()
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, bytes: &[u8]) -> bolt_core::Result<()> {
        self.0.borrow_mut().outbound.extend_from_slice(bytes);
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> bolt_core::Result<usize> {
        let mut inner = self.0.borrow_mut();
        if inner.inbound.is_empty() {
            return Ok(0);
        }
        let n = buf.len().min(inner.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = inner.inbound.pop_front().unwrap();
        }
        Ok(n)
    }
}
