//! Loopback listener that greets one client and then stays silent.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const AUTH_GREETING: &[u8] = b"Content-Type: auth/request\n\n";

/// Switch stand-in that requests authentication and ignores the reply.
///
/// The connection stays open until the client closes it, so the client sits
/// idle in the handshake until it is told to stop.
pub struct GreetingSwitch {
    port: u16,
    handle: JoinHandle<Vec<u8>>,
}

impl GreetingSwitch {
    /// Binds an ephemeral port and serves a single connection.
    #[must_use]
    pub fn start() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind loopback listener");
        let port = listener.local_addr().expect("listener address").port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept client");
            stream
                .set_read_timeout(Some(Duration::from_secs(10)))
                .expect("set read timeout");
            stream.write_all(AUTH_GREETING).expect("send greeting");
            stream.flush().expect("flush greeting");
            let mut received = Vec::new();
            stream.read_to_end(&mut received).ok();
            received
        });
        Self { port, handle }
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the client to hang up and returns everything it sent.
    #[must_use]
    pub fn finish(self) -> String {
        let received = self.handle.join().expect("switch thread panicked");
        String::from_utf8_lossy(&received).into_owned()
    }
}
