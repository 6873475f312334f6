//! World protocol client – one `Connection` per engine session.
//!
//! ## Task model
//!
//! ```text
//! caller tasks            writer task                  reader task              dispatchers (×3)
//! ─────────────────────── ──────────────────────────── ──────────────────────── ─────────────────
//! send_command(name, args)
//!   outbound.send(frame) ─▶ pending.push_back(tx)       read line
//!                           write frame                 classify(line)
//!                                                        ├─ Response → pending.pop_front()
//!   rx.await ◀──────────────────────────────────────────┘
//!                                                        └─ Event → queue[category] ─▶ handlers
//! ```
//!
//! Correlation is strict FIFO: the engine answers requests in the order they
//! were written.  Only the writer task touches the socket, and it queues the
//! pending entry immediately before writing the frame, so queue order always
//! equals wire order.  A caller that stops waiting cannot interrupt a write;
//! its reply is still read and discarded.
//!
//! The session lock (`parking_lot::Mutex<Session>`) guards the state, the
//! pending queue and the subscriber table.  It is never held across an
//! `.await` and never held while a handler runs.

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::blocks::Block;
use crate::error::{Error, Result};
use crate::events::{Event, EventCategory, WorldEvent};
use crate::poller;
use crate::protocol::{self, commands, Frame};
use crate::registry::BlockRegistry;
use crate::subscription::{self, Handler, SubscriptionId, Subscribers};
use crate::types::{BlockPos, ClientConfig, Position};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

struct Pending {
    command: String,
    reply: oneshot::Sender<Result<String>>,
}

struct Session {
    state: ConnectionState,
    pending: VecDeque<Pending>,
    subscribers: Subscribers,
}

/// State shared between the handle, the reader and the dispatchers.
struct Shared {
    address: String,
    session: Mutex<Session>,
}

impl Shared {
    /// Hand `reply` to the oldest outstanding command.
    fn resolve(&self, reply: String) {
        let next = self.session.lock().pending.pop_front();
        match next {
            Some(pending) => {
                debug!("{} -> {:?}", pending.command, reply);
                // The caller may have given up waiting; its slot is still consumed.
                let _ = pending.reply.send(Ok(reply));
            }
            None => warn!("Dropping response {:?}: no command outstanding", reply),
        }
    }

    /// Move to `Disconnected`: fail everything pending and drop all
    /// subscriptions.  Idempotent.
    fn teardown(&self, reason: &str) {
        let (pending, handlers, was_connected) = {
            let mut session = self.session.lock();
            let was_connected = session.state == ConnectionState::Connected;
            session.state = ConnectionState::Disconnected;
            let handlers = session.subscribers.clear();
            (std::mem::take(&mut session.pending), handlers, was_connected)
        };
        // A handler may own the last `Connection`; dropping it re-enters here.
        drop(handlers);

        if was_connected {
            info!(
                "Disconnected from {} ({}); failing {} pending command(s)",
                self.address,
                reason,
                pending.len()
            );
        }
        for p in pending {
            let _ = p.reply.send(Err(Error::ConnectionLost));
        }
    }
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type EventQueues = [mpsc::UnboundedSender<WorldEvent>; 3];

/// Work for the writer task.
enum Outbound {
    Command {
        command: String,
        frame: String,
        reply: oneshot::Sender<Result<String>>,
    },
    Shutdown(oneshot::Sender<()>),
}

struct Inner {
    shared: Arc<Shared>,
    registry: BlockRegistry,
    outbound: mpsc::UnboundedSender<Outbound>,
    queues: EventQueues,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Inner {
    fn abort_tasks(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shared.teardown("connection dropped");
        self.abort_tasks();
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Handle to one engine session.  Cheap to clone; every clone drives the
/// same session.
///
/// The session ends on [`Connection::disconnect`], on a transport error, or
/// when the last handle is dropped.  Handlers that need the connection should
/// capture a [`WeakConnection`] so they do not keep the session alive.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

/// Non-owning handle; see [`Connection::downgrade`].
#[derive(Clone)]
pub struct WeakConnection {
    inner: Weak<Inner>,
}

impl WeakConnection {
    pub fn upgrade(&self) -> Option<Connection> {
        self.inner.upgrade().map(|inner| Connection { inner })
    }
}

fn failed(address: &str, reason: impl Into<String>) -> Error {
    Error::FailedToConnect {
        address: address.to_string(),
        reason: reason.into(),
    }
}

impl Connection {
    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Connect to `config.address` over TCP and perform the handshake.
    ///
    /// Both steps together are bounded by `config.connect_timeout`.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        info!(
            "Connecting to world engine at {} as '{}'",
            config.address, config.client_name
        );

        let attempt = async {
            let stream = TcpStream::connect(&config.address)
                .await
                .map_err(|e| failed(&config.address, e.to_string()))?;
            if let Err(e) = stream.set_nodelay(true) {
                debug!("Could not disable Nagle on {}: {}", config.address, e);
            }
            Self::establish(stream, config).await
        };

        match tokio::time::timeout(config.connect_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(failed(&config.address, "timed out")),
        }
    }

    /// [`Connection::connect`] with default settings.
    pub async fn connect_to(address: &str) -> Result<Self> {
        Self::connect(&ClientConfig::new(address)).await
    }

    /// Run the session over an already-open duplex stream.
    ///
    /// The handshake is bounded by `config.connect_timeout`.
    pub async fn from_stream<S>(stream: S, config: &ClientConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        match tokio::time::timeout(config.connect_timeout, Self::establish(stream, config)).await {
            Ok(result) => result,
            Err(_) => Err(failed(&config.address, "timed out during handshake")),
        }
    }

    async fn establish<S>(stream: S, config: &ClientConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        debug!("{} -> {:?}", config.address, ConnectionState::Connecting);

        let (read, write) = tokio::io::split(stream);
        let mut reader = BufReader::new(read);
        let mut writer: BoxedWriter = Box::new(write);

        handshake(&mut reader, &mut writer, config).await?;

        let shared = Arc::new(Shared {
            address: config.address.clone(),
            session: Mutex::new(Session {
                state: ConnectionState::Connected,
                pending: VecDeque::new(),
                subscribers: Subscribers::default(),
            }),
        });

        let mut receivers = Vec::with_capacity(EventCategory::ALL.len());
        let queues: EventQueues = std::array::from_fn(|_| {
            let (tx, rx) = mpsc::unbounded_channel();
            receivers.push(rx);
            tx
        });

        let mut tasks = Vec::with_capacity(6);
        for (category, rx) in EventCategory::ALL.into_iter().zip(receivers) {
            tasks.push(tokio::spawn(run_dispatcher(category, rx, shared.clone())));
        }

        tasks.push(tokio::spawn(run_reader(
            reader,
            shared.clone(),
            queues.clone(),
        )));

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        tasks.push(tokio::spawn(run_writer(writer, outbound_rx, shared.clone())));

        let connection = Connection {
            inner: Arc::new(Inner {
                shared,
                registry: config.registry.clone().unwrap_or_default(),
                outbound,
                queues,
                tasks: Mutex::new(tasks),
            }),
        };

        if let Some(interval) = config.poll_interval {
            let poller = poller::spawn(connection.downgrade(), interval);
            connection.inner.tasks.lock().push(poller);
        }

        info!("Connected to world engine at {}", config.address);
        Ok(connection)
    }

    /// End the session.  Every pending command resolves with
    /// [`Error::ConnectionLost`] and all subscriptions are dropped.
    pub async fn disconnect(&self) {
        self.inner.shared.teardown("disconnect requested");

        let (done, flushed) = oneshot::channel();
        if self.inner.outbound.send(Outbound::Shutdown(done)).is_ok() {
            let _ = flushed.await;
        }

        // Last, since the caller may itself be running on a dispatcher.
        self.inner.abort_tasks();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.shared.session.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn address(&self) -> &str {
        &self.inner.shared.address
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.inner.registry
    }

    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // -----------------------------------------------------------------------
    // Raw commands
    // -----------------------------------------------------------------------

    /// Send `name(args…)` and wait for its response line.
    ///
    /// A `Fail` reply becomes [`Error::CommandFailed`] for this command only.
    /// A name or argument containing a line break is refused with
    /// [`Error::InvalidFrame`] before anything is sent.
    ///
    /// Cancel-safe: dropping the returned future never leaves a partial frame
    /// on the wire or shifts the replies of later commands.
    pub async fn send_command(&self, name: &str, args: &[String]) -> Result<String> {
        let frame = protocol::request_frame(name, args)?;
        if !self.is_connected() {
            return Err(Error::ConnectionLost);
        }

        let (tx, rx) = oneshot::channel();
        let command = Outbound::Command {
            command: name.to_string(),
            frame,
            reply: tx,
        };
        if self.inner.outbound.send(command).is_err() {
            return Err(Error::ConnectionLost);
        }

        let reply = rx.await.map_err(|_| Error::ConnectionLost)??;
        if let Some(reason) = protocol::failure_reason(&reply) {
            return Err(Error::CommandFailed {
                command: name.to_string(),
                reply: reason.to_string(),
            });
        }
        Ok(reply)
    }

    // -----------------------------------------------------------------------
    // Typed commands
    // -----------------------------------------------------------------------

    pub async fn set_block(&self, block: &dyn Block, pos: BlockPos) -> Result<()> {
        let wire = self.inner.registry.encode(block);
        let mut args = protocol::block_pos_args(pos);
        args.extend(protocol::wire_block_args(wire));
        self.send_command(commands::SET_BLOCK, &args).await?;
        Ok(())
    }

    /// Fill the cuboid spanned by `from` and `to` (inclusive).
    pub async fn set_blocks(&self, block: &dyn Block, from: BlockPos, to: BlockPos) -> Result<()> {
        let wire = self.inner.registry.encode(block);
        let mut args = protocol::block_pos_args(from);
        args.extend(protocol::block_pos_args(to));
        args.extend(protocol::wire_block_args(wire));
        self.send_command(commands::SET_BLOCKS, &args).await?;
        Ok(())
    }

    /// Read a block and decode it through the registry.
    ///
    /// Fails with [`Error::UnknownBlockType`] when the engine reports a type
    /// the registry does not know; the session is unaffected.
    pub async fn get_block(&self, pos: BlockPos) -> Result<Box<dyn Block>> {
        let reply = self
            .send_command(commands::GET_BLOCK_WITH_DATA, &protocol::block_pos_args(pos))
            .await?;
        let wire = protocol::parse_wire_block(commands::GET_BLOCK_WITH_DATA, &reply)?;
        self.inner.registry.decode_wire(wire)
    }

    /// Y of the highest non-air block at column `(x, z)`.
    pub async fn get_height(&self, x: i32, z: i32) -> Result<i32> {
        let reply = self
            .send_command(commands::GET_HEIGHT, &[x.to_string(), z.to_string()])
            .await?;
        protocol::parse_int(commands::GET_HEIGHT, &reply)
    }

    pub async fn height_at(&self, pos: Position) -> Result<i32> {
        let tile = pos.tile();
        self.get_height(tile.x, tile.z).await
    }

    pub async fn player_position(&self) -> Result<Position> {
        let reply = self.send_command(commands::PLAYER_GET_POS, &[]).await?;
        protocol::parse_position(commands::PLAYER_GET_POS, &reply)
    }

    pub async fn set_player_position(&self, pos: Position) -> Result<()> {
        self.send_command(commands::PLAYER_SET_POS, &protocol::position_args(pos))
            .await?;
        Ok(())
    }

    pub async fn player_tile(&self) -> Result<BlockPos> {
        let reply = self.send_command(commands::PLAYER_GET_TILE, &[]).await?;
        protocol::parse_block_pos(commands::PLAYER_GET_TILE, &reply)
    }

    pub async fn set_player_tile(&self, pos: BlockPos) -> Result<()> {
        self.send_command(commands::PLAYER_SET_TILE, &protocol::block_pos_args(pos))
            .await?;
        Ok(())
    }

    pub async fn post_chat(&self, text: &str) -> Result<()> {
        self.send_command(commands::CHAT_POST, &[protocol::sanitize_chat(text)])
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Register `handler` for events of type `E`.  Handlers of one category
    /// run in registration order on that category's dispatcher task.
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let handler = Handler::Sync(Arc::new(move |event: &WorldEvent| {
            if let Some(event) = E::from_world_event(event) {
                handler(event);
            }
        }));
        self.add_handler(E::CATEGORY, handler)
    }

    /// Register an async handler.  It may issue commands on this connection;
    /// later events of the same category wait until it completes.
    pub fn subscribe_async<E, F, Fut>(&self, handler: F) -> SubscriptionId
    where
        E: Event,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Handler::Async(Arc::new(move |event: WorldEvent| -> BoxFuture<'static, ()> {
            match E::from_world_event(&event) {
                Some(event) => handler(event.clone()).boxed(),
                None => future::ready(()).boxed(),
            }
        }));
        self.add_handler(E::CATEGORY, handler)
    }

    /// Register one handler for every category.  Returns one id per category.
    pub fn subscribe_all<F>(&self, handler: F) -> Vec<SubscriptionId>
    where
        F: Fn(&WorldEvent) + Send + Sync + 'static,
    {
        let handler: Arc<dyn Fn(&WorldEvent) + Send + Sync> = Arc::new(handler);
        EventCategory::ALL
            .into_iter()
            .map(|category| self.add_handler(category, Handler::Sync(handler.clone())))
            .collect()
    }

    /// Remove one handler.  Unknown ids are a no-op and return `false`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.shared.session.lock().subscribers.remove(id)
    }

    pub fn subscriber_count(&self, category: EventCategory) -> usize {
        self.inner.shared.session.lock().subscribers.len(category)
    }

    fn add_handler(&self, category: EventCategory, handler: Handler) -> SubscriptionId {
        let mut session = self.inner.shared.session.lock();
        if session.state == ConnectionState::Connected {
            session.subscribers.insert(category, handler)
        } else {
            debug!("Ignoring {} subscription on a closed connection", category);
            session.subscribers.reserve(category)
        }
    }

    /// Feed a locally produced event through the normal dispatch path.
    pub(crate) fn publish(&self, event: WorldEvent) {
        let queue = &self.inner.queues[event.category().index()];
        if queue.send(event).is_err() {
            debug!("Dispatcher gone; dropping locally published event");
        }
    }
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

async fn handshake<R>(reader: &mut R, writer: &mut BoxedWriter, config: &ClientConfig) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let frame = protocol::request_frame(
        commands::HANDSHAKE,
        &[protocol::sanitize_chat(&config.client_name)],
    )
    .map_err(|e| failed(&config.address, e.to_string()))?;
    write_frame(writer, &frame)
        .await
        .map_err(|e| failed(&config.address, e.to_string()))?;

    loop {
        let line = read_frame(reader)
            .await
            .map_err(|e| failed(&config.address, e.to_string()))?
            .ok_or_else(|| failed(&config.address, "connection closed during handshake"))?;

        match protocol::classify(&line) {
            Ok(Frame::Response(reply)) => {
                if let Some(reason) = protocol::failure_reason(&reply) {
                    return Err(failed(
                        &config.address,
                        format!("handshake rejected: {}", reason),
                    ));
                }
                return Ok(());
            }
            // Events before the handshake completes have no subscribers yet.
            Ok(Frame::Event(event)) => debug!("Ignoring {} before handshake", event.category()),
            Err(e) => debug!("Ignoring {} before handshake", e),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport helpers
// ---------------------------------------------------------------------------

async fn write_frame<W>(writer: &mut W, frame: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await
}

/// Next line without its terminator; `None` at end of stream.  Invalid UTF-8
/// is replaced rather than treated as a transport fault.
async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

async fn run_reader<R>(mut reader: R, shared: Arc<Shared>, queues: EventQueues)
where
    R: AsyncBufRead + Unpin,
{
    let reason = loop {
        let line = match read_frame(&mut reader).await {
            Ok(Some(line)) => line,
            Ok(None) => break "engine closed the connection".to_string(),
            Err(e) => break format!("read error: {}", e),
        };

        match protocol::classify(&line) {
            Ok(Frame::Response(reply)) => shared.resolve(reply),
            Ok(Frame::Event(event)) => {
                if queues[event.category().index()].send(event).is_err() {
                    debug!("Dispatcher gone; dropping inbound event");
                }
            }
            Err(e) => warn!("Dropping {}", e),
        }
    };

    shared.teardown(&reason);
}

/// Sole owner of the write half.  Each command's pending entry is queued and
/// its frame written without yielding to the caller in between.
async fn run_writer(
    mut writer: BoxedWriter,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    shared: Arc<Shared>,
) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Command {
                command,
                frame,
                reply,
            } => {
                {
                    let mut session = shared.session.lock();
                    if session.state != ConnectionState::Connected {
                        let _ = reply.send(Err(Error::ConnectionLost));
                        continue;
                    }
                    session.pending.push_back(Pending { command, reply });
                }

                if let Err(e) = write_frame(&mut writer, &frame).await {
                    warn!("Write to {} failed: {}", shared.address, e);
                    shared.teardown("write error");
                    break;
                }
            }
            Outbound::Shutdown(done) => {
                if let Err(e) = writer.shutdown().await {
                    debug!("Shutdown of {} failed: {}", shared.address, e);
                }
                let _ = done.send(());
                break;
            }
        }
    }
    debug!("Writer for {} stopped", shared.address);
}

async fn run_dispatcher(
    category: EventCategory,
    mut rx: mpsc::UnboundedReceiver<WorldEvent>,
    shared: Arc<Shared>,
) {
    while let Some(event) = rx.recv().await {
        let handlers = shared.session.lock().subscribers.snapshot(category);
        subscription::dispatch(&event, handlers).await;
    }
    debug!("{} dispatcher stopped", category);
}
