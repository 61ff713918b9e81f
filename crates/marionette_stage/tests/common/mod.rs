use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use marionette_stage::{ServerMessage, Transceiver};

/// Route engine logs to the test harness; set `RUST_LOG` to see them.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Transceiver that keeps every payload it is given.
#[derive(Clone, Default)]
pub struct Inbox {
    payloads: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Inbox {
    pub fn messages(&self) -> Vec<ServerMessage> {
        self.payloads
            .borrow()
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }
}

impl Transceiver for Inbox {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.payloads.borrow_mut().push(payload.to_vec());
        Ok(())
    }
}

/// Transceiver whose peer has gone away.
pub struct Hangup;

impl Transceiver for Hangup {
    fn send(&mut self, _payload: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"))
    }
}
