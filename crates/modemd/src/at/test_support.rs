//! Scripted AT channels for tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};

use super::{AtChannel, ChannelOpener};

#[derive(Default)]
struct Script {
    replies: HashMap<Vec<u8>, VecDeque<(Vec<u8>, Duration)>>,
    inbound: VecDeque<(Instant, Vec<u8>)>,
    wire: Vec<u8>,
    commands: Vec<String>,
    write_delay: Duration,
    fail_reads: bool,
    fail_writes: bool,
    closed: bool,
}

/// Channel that answers known commands with canned replies.
///
/// A reply registered once is repeated for every matching write; registering
/// several replies for one command plays them in order.
#[derive(Clone, Default)]
pub(crate) struct ScriptedChannel {
    script: Arc<Mutex<Script>>,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn reply_to(&self, command: &str, reply: &str) {
        self.reply_after(command, reply, Duration::ZERO);
    }

    pub(crate) fn reply_after(&self, command: &str, reply: &str, delay: Duration) {
        self.script()
            .replies
            .entry(command.as_bytes().to_vec())
            .or_default()
            .push_back((reply.as_bytes().to_vec(), delay));
    }

    pub(crate) fn inject(&self, bytes: &[u8]) {
        self.script()
            .inbound
            .push_back((Instant::now(), bytes.to_vec()));
    }

    pub(crate) fn set_write_delay(&self, delay: Duration) {
        self.script().write_delay = delay;
    }

    pub(crate) fn fail_reads(&self) {
        self.script().fail_reads = true;
    }

    pub(crate) fn fail_writes(&self) {
        self.script().fail_writes = true;
    }

    /// Complete commands in the order they were written.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.script().commands.clone()
    }

    /// Every byte written, in arrival order.
    pub(crate) fn wire(&self) -> Vec<u8> {
        self.script().wire.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.script().closed
    }
}

impl AtChannel for ScriptedChannel {
    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let delay = {
            let script = self.script();
            if script.closed {
                return Err(io::Error::from(io::ErrorKind::NotConnected));
            }
            if script.fail_writes {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            script.write_delay
        };

        let (head, tail) = bytes.split_at(bytes.len() / 2);
        self.script().wire.extend_from_slice(head);
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut script = self.script();
        script.wire.extend_from_slice(tail);
        script
            .commands
            .push(String::from_utf8_lossy(bytes).into_owned());
        let reply = match script.replies.get_mut(bytes) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        if let Some((reply, delay)) = reply {
            script.inbound.push_back((Instant::now() + delay, reply));
        }
        Ok(())
    }

    fn read_available(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut script = self.script();
        if script.fail_reads {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let now = Instant::now();
        let ready = script
            .inbound
            .iter()
            .position(|(at, _)| *at <= now);
        let Some(index) = ready else {
            return Ok(0);
        };
        let Some((at, mut bytes)) = script.inbound.remove(index) else {
            return Ok(0);
        };
        let count = bytes.len().min(buffer.len());
        buffer[..count].copy_from_slice(&bytes[..count]);
        if count < bytes.len() {
            let rest = bytes.split_off(count);
            script.inbound.insert(index, (at, rest));
        }
        Ok(count)
    }

    fn close(&self) {
        self.script().closed = true;
    }
}

/// Opener handing out scripted channels by device node.
#[derive(Clone, Default)]
pub(crate) struct ScriptedOpener {
    channels: Arc<Mutex<HashMap<Utf8PathBuf, ScriptedChannel>>>,
    opened: Arc<Mutex<Vec<Utf8PathBuf>>>,
}

impl ScriptedOpener {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers the channel served for `node`.
    pub(crate) fn insert(&self, node: impl Into<Utf8PathBuf>, channel: ScriptedChannel) {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node.into(), channel);
    }

    /// Nodes opened so far.
    pub(crate) fn opened(&self) -> Vec<Utf8PathBuf> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ChannelOpener for ScriptedOpener {
    fn open(&self, node: &Utf8Path) -> io::Result<Box<dyn AtChannel>> {
        let channel = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(node)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(node.to_path_buf());
        Ok(Box::new(channel))
    }
}
