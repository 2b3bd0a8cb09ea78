//! Writer/reader thread pair serialising AT exchanges over one channel.

use std::collections::BTreeSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{AT_TARGET, AtChannel, AtError, AtQuery, AtResponse};

const READ_CHUNK: usize = 1024;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_BUFFER_LIMIT: usize = 64 * 1024;

/// Tuning for an [`AtQueue`].
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Name used for worker threads and log fields.
    pub name: String,
    /// Pause between empty reads.
    pub poll_interval: Duration,
    /// Oldest buffered bytes are dropped beyond this size.
    pub buffer_limit: usize,
}

impl QueueOptions {
    /// Options with default timings for the named channel.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            buffer_limit: DEFAULT_BUFFER_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Writing,
    Written,
}

struct InFlight {
    ticket: u64,
    query: AtQuery,
    phase: Phase,
    outcome: Option<Result<AtResponse, AtError>>,
}

#[derive(Default)]
struct QueueState {
    next_ticket: u64,
    serving: u64,
    abandoned: BTreeSet<u64>,
    in_flight: Option<InFlight>,
    buffer: Vec<u8>,
    failure: Option<String>,
    suspended: bool,
    terminate: bool,
    generation: u64,
}

impl QueueState {
    fn advance(&mut self) {
        self.serving += 1;
        while self.abandoned.remove(&self.serving) {
            self.serving += 1;
        }
    }

    fn abandon(&mut self, ticket: u64) {
        if ticket == self.serving {
            self.advance();
        } else {
            self.abandoned.insert(ticket);
        }
    }

    fn fail(&mut self, error: &AtError) {
        if let AtError::Io { message } = error {
            self.failure = Some(message.clone());
        }
        if let Some(in_flight) = self.in_flight.as_mut()
            && in_flight.outcome.is_none()
        {
            in_flight.outcome = Some(Err(error.clone()));
        }
    }

    fn stale(&self, generation: u64) -> bool {
        self.terminate || self.suspended || self.generation != generation
    }
}

struct Shared {
    state: Mutex<QueueState>,
    signal: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(
        &self,
        guard: MutexGuard<'a, QueueState>,
        timeout: Duration,
    ) -> MutexGuard<'a, QueueState> {
        self.signal
            .wait_timeout(guard, timeout)
            .unwrap_or_else(PoisonError::into_inner)
            .0
    }
}

struct Workers {
    channel: Arc<dyn AtChannel>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Serialises command/response exchanges over one AT channel.
///
/// Callers are served strictly in submission order; at most one query is in
/// flight at a time.
pub struct AtQueue {
    shared: Arc<Shared>,
    workers: Mutex<Option<Workers>>,
    options: QueueOptions,
}

impl std::fmt::Debug for AtQueue {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AtQueue")
            .field("name", &self.options.name)
            .finish_non_exhaustive()
    }
}

impl AtQueue {
    /// Binds `channel` and starts the worker threads.
    pub fn open(channel: Box<dyn AtChannel>, options: QueueOptions) -> Result<Self, AtError> {
        let queue = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                signal: Condvar::new(),
            }),
            workers: Mutex::new(None),
            options,
        };
        queue.spawn_workers(Arc::from(channel), 0)?;
        debug!(target: AT_TARGET, queue = %queue.options.name, "AT queue opened");
        Ok(queue)
    }

    /// Runs `query` and waits for its reply.
    ///
    /// Blocks until every earlier submission has finished, then until the
    /// reply matches, the query deadline passes, or the channel fails.
    pub fn submit(&self, query: &AtQuery) -> Result<AtResponse, AtError> {
        let deadline = Instant::now() + query.timeout();
        let mut state = self.shared.lock();
        if let Some(message) = &state.failure {
            return Err(AtError::Io {
                message: message.clone(),
            });
        }
        if state.terminate {
            return Err(AtError::Closed);
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        loop {
            let early_exit = if state.terminate {
                Some(AtError::Closed)
            } else {
                state.failure.as_ref().map(|message| AtError::Io {
                    message: message.clone(),
                })
            };
            if let Some(error) = early_exit {
                state.abandon(ticket);
                self.shared.signal.notify_all();
                return Err(error);
            }
            if state.serving == ticket && state.in_flight.is_none() {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                state.abandon(ticket);
                self.shared.signal.notify_all();
                return Err(timeout_error(query));
            }
            state = self.shared.wait(state, deadline - now);
        }

        state.in_flight = Some(InFlight {
            ticket,
            query: query.clone(),
            phase: Phase::Pending,
            outcome: None,
        });
        self.shared.signal.notify_all();

        let outcome = loop {
            if let Some(outcome) = state
                .in_flight
                .as_mut()
                .and_then(|in_flight| in_flight.outcome.take())
            {
                break outcome;
            }
            if state.terminate {
                break Err(AtError::Closed);
            }
            let now = Instant::now();
            if now >= deadline {
                state.buffer.clear();
                break Err(timeout_error(query));
            }
            state = self.shared.wait(state, deadline - now);
        };

        state.in_flight = None;
        state.advance();
        self.shared.signal.notify_all();
        drop(state);

        match &outcome {
            Ok(_) => debug!(
                target: AT_TARGET,
                queue = %self.options.name,
                ticket,
                command = %query.label(),
                "AT query matched"
            ),
            Err(error) => debug!(
                target: AT_TARGET,
                queue = %self.options.name,
                ticket,
                command = %query.label(),
                error = %error,
                "AT query failed"
            ),
        }
        outcome
    }

    /// Stops the worker threads and closes the channel.
    ///
    /// Waiting submissions keep their place; a query already written is sent
    /// again once the queue resumes.
    pub fn suspend(&self) {
        {
            let mut state = self.shared.lock();
            state.suspended = true;
            state.generation += 1;
            if let Some(in_flight) = state.in_flight.as_mut()
                && in_flight.outcome.is_none()
            {
                in_flight.phase = Phase::Pending;
            }
            self.shared.signal.notify_all();
        }
        self.stop_workers();
        debug!(target: AT_TARGET, queue = %self.options.name, "AT queue suspended");
    }

    /// Binds a new channel, clears any failure, and restarts the workers.
    pub fn resume(&self, channel: Box<dyn AtChannel>) -> Result<(), AtError> {
        self.suspend();
        let generation = {
            let mut state = self.shared.lock();
            state.suspended = false;
            state.failure = None;
            state.buffer.clear();
            self.shared.signal.notify_all();
            state.generation
        };
        self.spawn_workers(Arc::from(channel), generation)?;
        debug!(target: AT_TARGET, queue = %self.options.name, "AT queue resumed");
        Ok(())
    }

    /// Marks the channel dead.
    ///
    /// Waiting and later submissions fail with [`AtError::Io`] until the next
    /// [`resume`](Self::resume).
    pub fn fail(&self, message: impl Into<String>) {
        let mut state = self.shared.lock();
        state.fail(&AtError::Io {
            message: message.into(),
        });
        self.shared.signal.notify_all();
    }

    /// Terminates the queue; waiting and later submissions fail with
    /// [`AtError::Closed`].
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            state.terminate = true;
            self.shared.signal.notify_all();
        }
        self.stop_workers();
    }

    /// Whether a channel failure has disabled the queue.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.shared.lock().failure.is_some()
    }

    fn spawn_workers(&self, channel: Arc<dyn AtChannel>, generation: u64) -> Result<(), AtError> {
        let reader = {
            let shared = Arc::clone(&self.shared);
            let channel = Arc::clone(&channel);
            let options = self.options.clone();
            thread::Builder::new()
                .name(format!("at-read-{}", self.options.name))
                .spawn(move || run_reader(&shared, channel.as_ref(), &options, generation))
                .map_err(|error| AtError::io(&error))?
        };
        let writer = {
            let shared = Arc::clone(&self.shared);
            let channel = Arc::clone(&channel);
            let name = self.options.name.clone();
            thread::Builder::new()
                .name(format!("at-write-{}", self.options.name))
                .spawn(move || run_writer(&shared, channel.as_ref(), &name, generation))
        };
        let writer = match writer {
            Ok(writer) => writer,
            Err(error) => {
                self.shared.lock().generation += 1;
                self.shared.signal.notify_all();
                join_worker(reader, &self.options.name);
                channel.close();
                return Err(AtError::io(&error));
            }
        };
        *self.workers.lock().unwrap_or_else(PoisonError::into_inner) = Some(Workers {
            channel,
            reader,
            writer,
        });
        Ok(())
    }

    fn stop_workers(&self) {
        let workers = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(workers) = workers {
            join_worker(workers.reader, &self.options.name);
            join_worker(workers.writer, &self.options.name);
            workers.channel.close();
        }
    }
}

impl Drop for AtQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn timeout_error(query: &AtQuery) -> AtError {
    AtError::Timeout {
        command: query.label(),
        timeout: query.timeout(),
    }
}

fn join_worker(handle: JoinHandle<()>, name: &str) {
    if handle.join().is_err() {
        warn!(target: AT_TARGET, queue = %name, "AT worker thread panicked");
    }
}

fn run_writer(shared: &Shared, channel: &dyn AtChannel, name: &str, generation: u64) {
    let mut state = shared.lock();
    loop {
        if state.stale(generation) {
            return;
        }
        let pending = state
            .in_flight
            .as_mut()
            .filter(|in_flight| in_flight.phase == Phase::Pending && in_flight.outcome.is_none())
            .map(|in_flight| {
                in_flight.phase = Phase::Writing;
                (in_flight.ticket, in_flight.query.command().to_vec())
            });
        let Some((ticket, command)) = pending else {
            state = shared
                .signal
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            continue;
        };
        drop(state);

        let written = channel.write(&command);

        state = shared.lock();
        if state.stale(generation) {
            return;
        }
        match written {
            Ok(()) => {
                if let Some(in_flight) = state.in_flight.as_mut()
                    && in_flight.ticket == ticket
                    && in_flight.phase == Phase::Writing
                {
                    in_flight.phase = Phase::Written;
                }
                shared.signal.notify_all();
            }
            Err(error) => {
                warn!(target: AT_TARGET, queue = %name, error = %error, "AT channel write failed");
                state.fail(&AtError::io(&error));
                shared.signal.notify_all();
                return;
            }
        }
    }
}

fn run_reader(shared: &Shared, channel: &dyn AtChannel, options: &QueueOptions, generation: u64) {
    let mut chunk = [0_u8; READ_CHUNK];
    loop {
        let read = channel.read_available(&mut chunk);

        let mut state = shared.lock();
        if state.stale(generation) {
            return;
        }
        let received = match read {
            Ok(received) => received,
            Err(error) => {
                warn!(
                    target: AT_TARGET,
                    queue = %options.name,
                    error = %error,
                    "AT channel read failed"
                );
                state.fail(&AtError::io(&error));
                shared.signal.notify_all();
                return;
            }
        };
        if let Some(bytes) = chunk.get(..received) {
            append_bounded(&mut state.buffer, bytes, options.buffer_limit);
        }
        if complete_in_flight(&mut state) {
            shared.signal.notify_all();
        }
        if received == 0 {
            drop(shared.wait(state, options.poll_interval));
        }
    }
}

fn append_bounded(buffer: &mut Vec<u8>, bytes: &[u8], limit: usize) {
    buffer.extend_from_slice(bytes);
    if buffer.len() > limit {
        let excess = buffer.len() - limit;
        buffer.drain(..excess);
    }
}

fn complete_in_flight(state: &mut QueueState) -> bool {
    let QueueState {
        in_flight, buffer, ..
    } = state;
    let Some(in_flight) = in_flight
        .as_mut()
        .filter(|in_flight| in_flight.phase == Phase::Written && in_flight.outcome.is_none())
    else {
        return false;
    };
    let Some((response, end)) = in_flight.query.try_match(buffer) else {
        return false;
    };
    buffer.drain(..end);
    in_flight.outcome = Some(Ok(response));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::at::test_support::ScriptedChannel;

    fn query(command: &str, pattern: &str, timeout_ms: u64) -> AtQuery {
        AtQuery::new(command, pattern, Duration::from_millis(timeout_ms)).expect("valid pattern")
    }

    #[test]
    fn buffer_keeps_newest_bytes() {
        let mut buffer = b"abc".to_vec();
        append_bounded(&mut buffer, b"defg", 5);
        assert_eq!(buffer, b"cdefg");
    }

    #[test]
    fn unsolicited_data_before_write_is_kept_for_matching() {
        let channel = ScriptedChannel::new();
        channel.inject(b"\r\nRING\r\n");
        let queue = AtQueue::open(Box::new(channel.clone()), QueueOptions::named("test"))
            .expect("open queue");
        channel.reply_to("AT+CSQ\r\n", "\r\n+CSQ: 20,99\r\n\r\nOK\r\n");

        let response = queue
            .submit(&query("AT+CSQ", "\r\n\\+CSQ: ([0-9]+),([0-9]+)\r\n\r\nOK\r\n", 1000))
            .expect("signal reply");
        assert_eq!(response.group(1), Some("20"));
        assert_eq!(response.group(2), Some("99"));
    }

    #[test]
    fn closed_queue_rejects_submissions() {
        let channel = ScriptedChannel::new();
        let queue = AtQueue::open(Box::new(channel.clone()), QueueOptions::named("test"))
            .expect("open queue");
        queue.shutdown();
        let error = queue
            .submit(&query("AT", "OK\r\n", 100))
            .expect_err("closed queue");
        assert!(matches!(error, AtError::Closed));
        assert!(channel.is_closed());
    }
}
