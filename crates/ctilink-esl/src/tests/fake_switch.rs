//! Scripted event socket server for end-to-end scenarios.
//!
//! Serves one connection on a loopback port. It answers the handshake,
//! acknowledges `bgapi` commands with sequential job ids and immediately
//! emits the matching `BACKGROUND_JOB` event.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const WATCHDOG: Duration = Duration::from_secs(10);

/// How the switch behaves once the client has subscribed.
#[derive(Debug, Clone)]
pub(crate) struct SwitchScript {
    pub(crate) password: String,
    pub(crate) results: HashMap<String, String>,
    pub(crate) heartbeat_on_subscribe: bool,
    pub(crate) hang_up_after_jobs: Option<usize>,
    pub(crate) drop_after_subscribe: bool,
    pub(crate) garbled_body_length: Option<String>,
}

impl Default for SwitchScript {
    fn default() -> Self {
        Self {
            password: String::from("ClueCon"),
            results: HashMap::new(),
            heartbeat_on_subscribe: false,
            hang_up_after_jobs: None,
            drop_after_subscribe: false,
            garbled_body_length: None,
        }
    }
}

/// A running fake switch.
pub(crate) struct FakeSwitch {
    port: u16,
    received: Arc<Mutex<Vec<String>>>,
    server: Option<JoinHandle<()>>,
}

impl FakeSwitch {
    pub(crate) fn start(script: SwitchScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake switch");
        let port = listener.local_addr().expect("fake switch address").port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);
        let server = thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                serve(stream, &script, &log);
            }
        });
        Self {
            port,
            received,
            server: Some(server),
        }
    }

    pub(crate) const fn port(&self) -> u16 {
        self.port
    }

    /// Commands received so far, in arrival order.
    pub(crate) fn received(&self) -> Vec<String> {
        self.received.lock().expect("received lock").clone()
    }

    pub(crate) fn finish(&mut self) {
        if let Some(server) = self.server.take() {
            server.join().expect("fake switch thread");
        }
    }
}

struct Conversation<'a> {
    stream: TcpStream,
    script: &'a SwitchScript,
    jobs: usize,
    subscriptions: usize,
}

impl Conversation<'_> {
    fn send(&mut self, text: &str) {
        // Write failures mean the client is gone; the read side notices next.
        if self.stream.write_all(text.as_bytes()).is_ok() {
            self.stream.flush().ok();
        }
    }

    fn reply(&mut self, reply_text: &str) {
        self.send(&format!(
            "Content-Type: command/reply\nReply-Text: {reply_text}\n\n"
        ));
    }

    fn event(&mut self, headers: &str, body: Option<&str>) {
        let mut inner = String::from(headers);
        if let Some(text) = body {
            inner.push_str(&format!("Content-Length: {}\n\n{text}", text.len()));
        } else {
            inner.push('\n');
        }
        self.send(&format!(
            "Content-Length: {}\nContent-Type: text/event-plain\n\n{inner}",
            inner.len()
        ));
    }

    /// A job event whose body length does not match what follows.
    fn garbled_event(&mut self, declared: &str) {
        let inner = format!(
            "Event-Name: BACKGROUND_JOB\nJob-UUID: J99\nContent-Length: {declared}\n\n-ERR stale: J99\n"
        );
        self.send(&format!(
            "Content-Length: {}\nContent-Type: text/event-plain\n\n{inner}",
            inner.len()
        ));
    }

    fn disconnect(&mut self) {
        self.send("Content-Type: text/disconnect-notice\nContent-Length: 0\n\n");
    }

    /// Returns `false` once the conversation should end.
    fn handle(&mut self, command: &str) -> bool {
        if let Some(password) = command.strip_prefix("auth ") {
            if password == self.script.password {
                self.reply("+OK accepted");
            } else {
                self.reply("-ERR invalid");
                self.disconnect();
            }
            return true;
        }

        if command.starts_with("event ") {
            self.subscriptions += 1;
            if self.script.drop_after_subscribe {
                return self.subscriptions < 2;
            }
            self.reply("+OK event listener enabled plain");
            if self.subscriptions == 2 {
                if let Some(declared) = self.script.garbled_body_length.clone() {
                    self.garbled_event(&declared);
                }
                if self.script.heartbeat_on_subscribe {
                    self.event("Event-Name: HEARTBEAT\nUp-Time: 0 years, 0 days\n", None);
                }
                self.maybe_hang_up();
            }
            return true;
        }

        if let Some(job_command) = command.strip_prefix("bgapi ") {
            self.jobs += 1;
            let job_uuid = format!("J{}", self.jobs);
            self.send(&format!(
                "Content-Type: command/reply\nReply-Text: +OK Job-UUID: {job_uuid}\nJob-UUID: {job_uuid}\n\n"
            ));
            let result = self
                .script
                .results
                .get(job_command)
                .cloned()
                .unwrap_or_else(|| String::from("+OK"));
            self.event(
                &format!(
                    "Event-Name: BACKGROUND_JOB\nJob-UUID: {job_uuid}\nJob-Command: {}\n",
                    job_command.replace(' ', "%20")
                ),
                Some(&result),
            );
            self.maybe_hang_up();
            return true;
        }

        self.reply("-ERR command not found");
        true
    }

    fn maybe_hang_up(&mut self) {
        if self.subscriptions >= 2
            && let Some(limit) = self.script.hang_up_after_jobs
            && self.jobs >= limit
        {
            self.disconnect();
        }
    }
}

fn serve(stream: TcpStream, script: &SwitchScript, log: &Mutex<Vec<String>>) {
    stream
        .set_read_timeout(Some(WATCHDOG))
        .expect("fake switch read timeout");
    let mut reader = BufReader::new(stream.try_clone().expect("clone fake switch stream"));
    let mut conversation = Conversation {
        stream,
        script,
        jobs: 0,
        subscriptions: 0,
    };

    conversation.send("Content-Type: auth/request\n\n");

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let command = line.trim_end();
        if command.is_empty() {
            continue;
        }
        log.lock().expect("received lock").push(command.to_owned());
        if !conversation.handle(command) {
            return;
        }
    }
}
