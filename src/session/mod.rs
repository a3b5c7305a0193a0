//! IEC 104 link session.
//!
//! A [`Session`] owns one byte stream. A single driver task runs the
//! [`Core`] state machine and multiplexes, via `tokio::select!`, inbound
//! frames, commands from session handles and the earliest timer deadline.
//! Writes go through a separate writer task, so a peer that stops reading
//! cannot hold up the timers or a close.
//! Handles are cheap to clone; the session closes when [`Session::close`]
//! is called or the last handle is dropped.
//!
//! ```rust,ignore
//! let session = Session::builder(Params::WIDE, Config::default())
//!     .on_asdu(|asdu| println!("{} from CA {}", asdu.type_id(), asdu.common_address()))
//!     .on_error(|e| eprintln!("{e}"))
//!     .open(stream)?;
//!
//! session.start_data_transfer().await?;
//! session.send_asdu(&Asdu::interrogation_command(1, QOI_STATION)).await?;
//! ```

pub mod core;

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use self::core::{Core, Event};
use crate::codec::{Apdu, Iec104Codec};
use crate::config::{Config, Params};
use crate::error::{AbortReason, Iec104Error, Result};
use crate::types::Asdu;

/// Link state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No stream.
    Disconnected,
    /// Stream being established.
    Connecting,
    /// Stream up, data transfer not active.
    ConnectedIdle,
    /// STARTDT confirmed; I-frames may flow.
    DataTransfer,
    /// Being torn down.
    Closing,
}

/// Callback for decoded ASDUs.
pub type AsduHandler = Box<dyn FnMut(Asdu) + Send>;

/// Callback for state transitions, called with (old, new).
pub type StateHandler = Box<dyn FnMut(SessionState, SessionState) + Send>;

/// Callback for payload decode errors and the final abort.
pub type ErrorHandler = Box<dyn FnMut(&Iec104Error) + Send>;

#[derive(Default)]
struct Hooks {
    asdu: Option<AsduHandler>,
    state: Option<StateHandler>,
    error: Option<ErrorHandler>,
}

enum Hook {
    Asdu(AsduHandler),
    State(StateHandler),
    Error(ErrorHandler),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SendMode {
    Wait,
    Until(Instant),
    Try,
}

type Reply = oneshot::Sender<Result<()>>;

enum Command {
    Send {
        payload: Bytes,
        mode: SendMode,
        reply: Reply,
    },
    Start(Reply),
    Stop(Reply),
    Close,
    Hook(Hook),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Status {
    state: SessionState,
    abort: Option<AbortReason>,
}

/// Handle to a running IEC 104 session.
#[derive(Debug, Clone)]
pub struct Session {
    params: Params,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<Status>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send { payload, .. } => write!(f, "Send({} bytes)", payload.len()),
            Self::Start(_) => f.write_str("Start"),
            Self::Stop(_) => f.write_str("Stop"),
            Self::Close => f.write_str("Close"),
            Self::Hook(_) => f.write_str("Hook"),
        }
    }
}

impl Session {
    /// Start a session on a connected stream without callbacks.
    ///
    /// Must be called within a tokio runtime.
    pub fn open<S>(stream: S, params: Params, config: Config) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::builder(params, config).open(stream)
    }

    /// Configure callbacks before the session starts.
    pub fn builder(params: Params, config: Config) -> SessionBuilder {
        SessionBuilder {
            params,
            config,
            hooks: Hooks::default(),
        }
    }

    /// Parameter set of this session.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Current link state.
    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    /// Why the session was aborted, if it was.
    pub fn abort_reason(&self) -> Option<AbortReason> {
        self.status.borrow().abort.clone()
    }

    /// Send STARTDT act and wait for the confirmation.
    pub async fn start_data_transfer(&self) -> Result<()> {
        self.request(Command::Start).await
    }

    /// Send STOPDT act and wait for the confirmation.
    pub async fn stop_data_transfer(&self) -> Result<()> {
        self.request(Command::Stop).await
    }

    /// Send an ASDU, waiting as long as needed for window space.
    pub async fn send_asdu(&self, asdu: &Asdu) -> Result<()> {
        self.send(asdu, SendMode::Wait).await
    }

    /// Send an ASDU, failing with [`Iec104Error::WindowFull`] if no window
    /// space opens within `timeout`.
    pub async fn send_asdu_timeout(&self, asdu: &Asdu, timeout: Duration) -> Result<()> {
        self.send(asdu, SendMode::Until(Instant::now() + timeout))
            .await
    }

    /// Send an ASDU only if the window has space now.
    pub async fn try_send_asdu(&self, asdu: &Asdu) -> Result<()> {
        self.send(asdu, SendMode::Try).await
    }

    /// Replace the ASDU callback.
    pub fn on_asdu<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(Asdu) + Send + 'static,
    {
        self.hook(Hook::Asdu(Box::new(f)))
    }

    /// Replace the state change callback.
    pub fn on_state_change<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(SessionState, SessionState) + Send + 'static,
    {
        self.hook(Hook::State(Box::new(f)))
    }

    /// Replace the error callback.
    pub fn on_error<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(&Iec104Error) + Send + 'static,
    {
        self.hook(Hook::Error(Box::new(f)))
    }

    /// Close the session and wait until the stream is released.
    ///
    /// Closing an already closed or aborted session succeeds.
    pub async fn close(&self) -> Result<()> {
        let _ = self.commands.send(Command::Close);
        self.wait_disconnected().await;
        Ok(())
    }

    /// Wait until the session ends.
    ///
    /// Returns [`Iec104Error::SessionAborted`] if it ended by a fatal error.
    pub async fn wait_closed(&self) -> Result<()> {
        self.wait_disconnected().await;
        match self.abort_reason() {
            Some(reason) => Err(Iec104Error::SessionAborted(reason)),
            None => Ok(()),
        }
    }

    async fn wait_disconnected(&self) {
        let mut status = self.status.clone();
        // The driver drops the sender only after publishing Disconnected.
        let _ = status
            .wait_for(|s| s.state == SessionState::Disconnected)
            .await;
    }

    async fn send(&self, asdu: &Asdu, mode: SendMode) -> Result<()> {
        let payload = asdu.encode(&self.params)?;
        self.request(|reply| Command::Send {
            payload,
            mode,
            reply,
        })
        .await
    }

    async fn request(&self, command: impl FnOnce(Reply) -> Command) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .map_err(|_| self.closed_error())?;
        rx.await.map_err(|_| self.closed_error())?
    }

    fn hook(&self, hook: Hook) -> Result<()> {
        self.commands
            .send(Command::Hook(hook))
            .map_err(|_| self.closed_error())
    }

    fn closed_error(&self) -> Iec104Error {
        match self.abort_reason() {
            Some(reason) => Iec104Error::SessionAborted(reason),
            None => Iec104Error::SessionClosed,
        }
    }
}

/// Builder registering callbacks before the driver starts, so that no
/// event is missed.
pub struct SessionBuilder {
    params: Params,
    config: Config,
    hooks: Hooks,
}

impl SessionBuilder {
    /// Parameter set the session will use.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Timer and window configuration the session will use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set the ASDU callback.
    pub fn on_asdu<F>(mut self, f: F) -> Self
    where
        F: FnMut(Asdu) + Send + 'static,
    {
        self.hooks.asdu = Some(Box::new(f));
        self
    }

    /// Set the state change callback.
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: FnMut(SessionState, SessionState) + Send + 'static,
    {
        self.hooks.state = Some(Box::new(f));
        self
    }

    /// Set the error callback.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Iec104Error) + Send + 'static,
    {
        self.hooks.error = Some(Box::new(f));
        self
    }

    /// Validate the configuration and spawn the driver on `stream`.
    pub fn open<S>(self, stream: S) -> Result<Session>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        self.params.validate()?;
        self.config.validate()?;

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(Status {
            state: SessionState::Connecting,
            abort: None,
        });

        let (sink, frames) = Framed::new(stream, Iec104Codec::new()).split();
        let (outgoing, pending) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_frames(sink, pending));

        let driver = Driver {
            frames,
            outgoing: Some(outgoing),
            writer,
            writer_done: false,
            core: Core::new(self.params, self.config),
            hooks: self.hooks,
            commands: command_rx,
            status: status_tx,
            queue: VecDeque::new(),
            start_waiter: None,
            stop_waiter: None,
        };
        tokio::spawn(driver.run());

        Ok(Session {
            params: self.params,
            commands,
            status,
        })
    }
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("params", &self.params)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

struct QueuedSend {
    payload: Bytes,
    deadline: Option<Instant>,
    reply: Reply,
}

/// Write frames in order until the channel closes, then shut the stream down.
async fn write_frames<S>(
    mut sink: SplitSink<Framed<S, Iec104Codec>, Apdu>,
    mut pending: mpsc::UnboundedReceiver<Apdu>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(apdu) = pending.recv().await {
        sink.feed(apdu).await?;
        while let Ok(apdu) = pending.try_recv() {
            sink.feed(apdu).await?;
        }
        sink.flush().await?;
    }
    sink.close().await
}

struct Driver<S> {
    frames: SplitStream<Framed<S, Iec104Codec>>,
    /// Feeds the writer task; dropped on shutdown.
    outgoing: Option<mpsc::UnboundedSender<Apdu>>,
    writer: JoinHandle<Result<()>>,
    writer_done: bool,
    core: Core,
    hooks: Hooks,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<Status>,
    /// Sends waiting for window space, in arrival order.
    queue: VecDeque<QueuedSend>,
    start_waiter: Option<Reply>,
    stop_waiter: Option<Reply>,
}

impl<S> Driver<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn run(mut self) {
        self.core.connected(Instant::now());

        loop {
            // State is published before the frames that reveal it to the peer.
            self.dispatch_events();
            self.drain_queue();
            self.flush();
            self.dispatch_events();
            if self.core.is_closed() {
                break;
            }

            let deadline = self.next_deadline();
            tokio::select! {
                frame = self.frames.next() => self.on_frame(frame),
                result = &mut self.writer, if !self.writer_done => {
                    self.writer_done = true;
                    let reason = match result {
                        Ok(Ok(())) => "writer stopped".to_string(),
                        Ok(Err(e)) => e.to_string(),
                        Err(e) => e.to_string(),
                    };
                    self.core.abort(AbortReason::Transport(reason));
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => {
                        debug!("all session handles dropped");
                        self.core.close();
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let now = Instant::now();
                    self.core.handle_timeout(now);
                    self.expire_queue(now);
                }
            }
        }

        self.shutdown().await;
    }

    fn on_frame(&mut self, frame: Option<Result<Apdu>>) {
        match frame {
            Some(Ok(apdu)) => self.core.handle_apdu(apdu, Instant::now()),
            Some(Err(Iec104Error::Frame(e))) => self.core.abort(AbortReason::Framing(e)),
            Some(Err(e)) => self.core.abort(AbortReason::Transport(e.to_string())),
            None => self.core.abort(AbortReason::PeerClosed),
        }
    }

    fn on_command(&mut self, command: Command) {
        trace!(?command, "session command");
        let now = Instant::now();
        match command {
            Command::Send {
                payload,
                mode,
                reply,
            } => {
                let queued = !self.queue.is_empty();
                if !queued && (self.core.window_available() || mode == SendMode::Try) {
                    let _ = reply.send(self.core.send_asdu(payload, now));
                } else if mode == SendMode::Try {
                    let _ = reply.send(Err(Iec104Error::WindowFull));
                } else {
                    let deadline = match mode {
                        SendMode::Until(deadline) => Some(deadline),
                        _ => None,
                    };
                    self.queue.push_back(QueuedSend {
                        payload,
                        deadline,
                        reply,
                    });
                }
            }
            Command::Start(reply) => match self.core.start_data_transfer(now) {
                Ok(()) => self.start_waiter = Some(reply),
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            Command::Stop(reply) => match self.core.stop_data_transfer(now) {
                Ok(()) => self.stop_waiter = Some(reply),
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            Command::Close => self.core.close(),
            Command::Hook(Hook::Asdu(f)) => self.hooks.asdu = Some(f),
            Command::Hook(Hook::State(f)) => self.hooks.state = Some(f),
            Command::Hook(Hook::Error(f)) => self.hooks.error = Some(f),
        }
    }

    /// Admit queued sends while the window has space.
    fn drain_queue(&mut self) {
        let now = Instant::now();
        while self.core.window_available() && !self.core.is_closed() {
            let Some(queued) = self.queue.pop_front() else {
                break;
            };
            if queued.reply.is_closed() {
                continue;
            }
            let _ = queued.reply.send(self.core.send_asdu(queued.payload, now));
        }
    }

    fn expire_queue(&mut self, now: Instant) {
        let mut kept = VecDeque::with_capacity(self.queue.len());
        for queued in self.queue.drain(..) {
            if queued.deadline.is_some_and(|deadline| deadline <= now) {
                let _ = queued.reply.send(Err(Iec104Error::WindowFull));
            } else {
                kept.push_back(queued);
            }
        }
        self.queue = kept;
    }

    fn next_deadline(&self) -> Option<Instant> {
        let queued = self.queue.iter().filter_map(|q| q.deadline).min();
        match (self.core.poll_timeout(), queued) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Hand transmitted frames to the writer task.
    fn flush(&mut self) {
        while let Some(apdu) = self.core.poll_transmit() {
            let Some(outgoing) = self.outgoing.as_ref() else {
                break;
            };
            // A failed send means the writer ended; its join result says why.
            if outgoing.send(apdu).is_err() {
                break;
            }
        }
    }

    fn dispatch_events(&mut self) {
        while let Some(event) = self.core.poll_event() {
            match event {
                Event::StateChanged { old, new } => {
                    self.status.send_modify(|s| s.state = new);
                    if let Some(f) = self.hooks.state.as_mut() {
                        f(old, new);
                    }
                    if new == SessionState::DataTransfer {
                        if let Some(reply) = self.start_waiter.take() {
                            let _ = reply.send(Ok(()));
                        }
                    }
                    if old == SessionState::DataTransfer && new == SessionState::ConnectedIdle {
                        if let Some(reply) = self.stop_waiter.take() {
                            let _ = reply.send(Ok(()));
                        }
                    }
                }
                Event::Asdu(asdu) => {
                    if let Some(f) = self.hooks.asdu.as_mut() {
                        f(asdu);
                    }
                }
                Event::DecodeError(e) => {
                    if let Some(f) = self.hooks.error.as_mut() {
                        f(&Iec104Error::Codec(e));
                    }
                }
                Event::Aborted(reason) => {
                    self.status.send_modify(|s| s.abort = Some(reason.clone()));
                    if let Some(f) = self.hooks.error.as_mut() {
                        f(&Iec104Error::SessionAborted(reason));
                    }
                }
            }
        }
    }

    async fn shutdown(mut self) {
        let failure = || match self.core.abort_reason() {
            Some(reason) => Iec104Error::SessionAborted(reason.clone()),
            None => Iec104Error::SessionClosed,
        };
        for queued in self.queue.drain(..) {
            let _ = queued.reply.send(Err(failure()));
        }
        for reply in [self.start_waiter.take(), self.stop_waiter.take()]
            .into_iter()
            .flatten()
        {
            let _ = reply.send(Err(failure()));
        }

        // Closing the channel lets the writer drain and shut the stream down.
        self.outgoing = None;
        if !self.writer_done {
            if self.core.abort_reason().is_some() {
                self.writer.abort();
            } else {
                let t1 = self.core.config().t1;
                match timeout(t1, &mut self.writer).await {
                    Ok(Ok(Err(e))) => trace!(error = %e, "stream shutdown failed"),
                    Ok(_) => {}
                    Err(_) => {
                        debug!("stream write stalled, dropping connection");
                        self.writer.abort();
                    }
                }
            }
        }
        self.core.finish();
        self.dispatch_events();
        debug!("session driver stopped");
    }
}
