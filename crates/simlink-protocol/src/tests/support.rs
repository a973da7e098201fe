//! Test doubles shared by the unit and behavioural suites.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::channel::payload::{encode_command_payload, encode_result_payload, encode_version};
use crate::channel::{MessageKind, encode_frame};
use crate::model::{Command, FieldValue, RELATED_COMMAND_KEY};

/// In-memory stream that replays scripted reads and records writes.
///
/// Each scripted step is either a chunk of bytes or an I/O error. Once the
/// script is exhausted reads return `Ok(0)`, which the channel treats as the
/// peer closing the connection.
#[derive(Debug, Default)]
pub(crate) struct ScriptedStream {
    steps: VecDeque<Step>,
    max_read: Option<usize>,
    written: Vec<u8>,
}

#[derive(Debug)]
enum Step {
    Bytes(Vec<u8>),
    Fail(io::ErrorKind),
}

impl ScriptedStream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Limits every read to at most `max` bytes to exercise short reads.
    pub(crate) fn with_max_read(mut self, max: usize) -> Self {
        self.max_read = Some(max);
        self
    }

    pub(crate) fn push_bytes(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.steps.push_back(Step::Bytes(bytes.into()));
        self
    }

    pub(crate) fn push_error(&mut self, kind: io::ErrorKind) -> &mut Self {
        self.steps.push_back(Step::Fail(kind));
        self
    }

    pub(crate) fn push_frame(&mut self, kind: MessageKind, payload: &[u8]) -> &mut Self {
        let frame = encode_frame(kind, payload).expect("scripted frame fits");
        self.push_bytes(frame)
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.written
    }

    pub(crate) fn remaining_steps(&self) -> usize {
        self.steps.len()
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(step) = self.steps.pop_front() else {
            return Ok(0);
        };
        match step {
            Step::Fail(kind) => Err(io::Error::from(kind)),
            Step::Bytes(mut bytes) => {
                let limit = self.max_read.unwrap_or(usize::MAX).min(buf.len());
                let take = bytes.len().min(limit);
                let rest = bytes.split_off(take);
                buf[..take].copy_from_slice(&bytes);
                if !rest.is_empty() {
                    self.steps.push_front(Step::Bytes(rest));
                }
                Ok(take)
            }
        }
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds the `Result` frame payload the server would send for `related`.
///
/// The related command travels as an encoded JSON string, matching what the
/// simulator emits.
pub(crate) fn result_payload_for(
    name: &str,
    related: &Command,
    extra: &[(&str, FieldValue)],
) -> Vec<u8> {
    let mut result = Command::new(name);
    let related_json = related.to_json().expect("encode related command");
    result.set(RELATED_COMMAND_KEY, related_json);
    for (key, value) in extra {
        result.set(*key, value.clone());
    }
    let text = result.to_json().expect("encode result");
    encode_result_payload(&text).expect("result payload fits")
}

/// Builds a command frame payload.
pub(crate) fn command_payload_for(command: &Command) -> Vec<u8> {
    encode_command_payload(&command.to_json().expect("encode command"))
}

/// Builds an `ApiVersion` payload.
pub(crate) fn version_payload(version: u32) -> Vec<u8> {
    encode_version(version).to_vec()
}

/// Single-connection TCP server that writes scripted byte chunks.
///
/// The server records everything the client sends until the client closes
/// its half of the connection.
pub(crate) struct FakeServer {
    port: u16,
    received: Arc<Mutex<Vec<u8>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

/// One scripted action for [`FakeServer`].
#[derive(Debug, Clone)]
pub(crate) enum ServerStep {
    Write(Vec<u8>),
    Pause(Duration),
    Close,
}

impl FakeServer {
    pub(crate) fn spawn(steps: Vec<ServerStep>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake server")?;
        let port = listener.local_addr().context("local addr")?.port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().context("accept connection")?;
            Self::serve(stream, &steps, &received_clone)
        });
        Ok(Self {
            port,
            received,
            handle: Some(handle),
        })
    }

    pub(crate) const fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the server thread and returns the bytes it received.
    pub(crate) fn finish(&mut self) -> Result<Vec<u8>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake server thread panicked"))??;
        }
        let received = self
            .received
            .lock()
            .map_err(|error| anyhow!("lock received bytes: {error}"))?;
        Ok(received.clone())
    }

    fn serve(mut stream: TcpStream, steps: &[ServerStep], received: &Mutex<Vec<u8>>) -> Result<()> {
        let mut reader = stream.try_clone().context("clone stream")?;
        let recorder = {
            let sink = Arc::new(Mutex::new(Vec::new()));
            let sink_clone = Arc::clone(&sink);
            let handle = thread::spawn(move || -> Result<()> {
                let mut buf = [0_u8; 1024];
                loop {
                    let read = match reader.read(&mut buf) {
                        Ok(0) | Err(_) => return Ok(()),
                        Ok(read) => read,
                    };
                    sink_clone
                        .lock()
                        .map_err(|error| anyhow!("lock sink: {error}"))?
                        .extend_from_slice(&buf[..read]);
                }
            });
            (sink, handle)
        };

        for step in steps {
            match step {
                ServerStep::Write(bytes) => {
                    stream.write_all(bytes).context("write scripted bytes")?;
                }
                ServerStep::Pause(duration) => thread::sleep(*duration),
                ServerStep::Close => {
                    stream
                        .shutdown(std::net::Shutdown::Both)
                        .context("shutdown fake server")?;
                    break;
                }
            }
        }

        let (sink, handle) = recorder;
        // The recorder stops once the client closes or the socket shuts down.
        if matches!(steps.last(), Some(ServerStep::Close)) {
            handle
                .join()
                .map_err(|_| anyhow!("recorder thread panicked"))??;
        } else {
            stream
                .shutdown(std::net::Shutdown::Write)
                .context("shutdown write half")?;
            handle
                .join()
                .map_err(|_| anyhow!("recorder thread panicked"))??;
        }
        let bytes = sink
            .lock()
            .map_err(|error| anyhow!("lock sink: {error}"))?
            .clone();
        received
            .lock()
            .map_err(|error| anyhow!("lock received bytes: {error}"))?
            .extend_from_slice(&bytes);
        Ok(())
    }
}
