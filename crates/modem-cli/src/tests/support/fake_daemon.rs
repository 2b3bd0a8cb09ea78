//! Scripted stand-in for `modemd`.
//!
//! Listens on a Unix socket in a temporary directory, accepts one client,
//! and answers each query from a [`Script`] keyed by function name.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use modem_rpc::{Frame, Function, read_frame, write_frame};
use tempfile::TempDir;

/// Canned replies. Queued replies are used first, then the fixed reply,
/// then the empty failure payload.
#[derive(Debug, Clone, Default)]
pub(in crate::tests) struct Script {
    queued: HashMap<&'static str, VecDeque<Vec<u8>>>,
    fixed: HashMap<&'static str, Vec<u8>>,
}

impl Script {
    /// Answers every call to `function` with `payload`.
    pub fn answer(&mut self, function: Function, payload: Vec<u8>) {
        self.fixed.insert(function.name(), payload);
    }

    /// Answers the next unanswered call to `function` with `payload`.
    pub fn enqueue(&mut self, function: Function, payload: Vec<u8>) {
        self.queued
            .entry(function.name())
            .or_default()
            .push_back(payload);
    }

    /// Makes every call to `function` fail.
    pub fn refuse(&mut self, function: Function) {
        self.queued.remove(function.name());
        self.fixed.remove(function.name());
    }

    fn reply(&mut self, name: &str) -> Vec<u8> {
        if let Some(payload) = self
            .queued
            .get_mut(name)
            .and_then(VecDeque::pop_front)
        {
            return payload;
        }
        self.fixed.get(name).cloned().unwrap_or_default()
    }
}

/// A query received by the fake daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(in crate::tests) struct Request {
    pub function: String,
    pub payload: Vec<u8>,
}

pub(in crate::tests) struct FakeDaemon {
    _dir: TempDir,
    socket: PathBuf,
    requests: Arc<Mutex<Vec<Request>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeDaemon {
    /// Binds a socket and serves one client from `script`.
    pub fn spawn(script: Script) -> Result<Self> {
        let dir = tempfile::tempdir().context("socket directory")?;
        let socket = dir.path().join("modemd.ctl");
        let listener = UnixListener::bind(&socket).context("bind fake daemon")?;
        listener
            .set_nonblocking(true)
            .context("fake daemon nonblocking")?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || Self::serve(&listener, script, &recorded));
        Ok(Self {
            _dir: dir,
            socket,
            requests,
            handle: Some(handle),
        })
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Waits for the client to hang up and returns every query it sent.
    pub fn take_requests(&mut self) -> Result<Vec<Request>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake daemon thread panicked"))?
                .context("fake daemon failed")?;
        }
        let requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(requests.clone())
    }

    fn serve(
        listener: &UnixListener,
        mut script: Script,
        requests: &Mutex<Vec<Request>>,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut stream = loop {
            match listener.accept() {
                Ok((stream, _)) => break stream,
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                // The CLI gave up before connecting.
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) => return Err(error).context("accept connection"),
            }
        };
        stream.set_nonblocking(false).context("blocking stream")?;

        while let Some(frame) = read_frame(&mut stream).context("read query")? {
            let name = String::from_utf8_lossy(frame.name()).into_owned();
            let reply: Frame = frame.reply(script.reply(&name));
            requests
                .lock()
                .map_err(|error| anyhow!("lock requests: {error}"))?
                .push(Request {
                    function: name,
                    payload: frame.payload().to_vec(),
                });
            write_frame(&mut stream, &reply).context("write reply")?;
        }
        Ok(())
    }
}
