//! Core endpoint implementation with automatic reconnection.
//!
//! One background task per endpoint runs the read loop for its entire
//! lifetime; all other operations are invoked from caller tasks and are
//! safe to use concurrently against the same endpoint. Frame writes are
//! serialized through an async mutex so concurrent senders never interleave
//! partial frames on the wire.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{JsonCodec, MessageCodec};
use crate::envelope::{Envelope, EnvelopeError, MethodId, RequestId, ServiceId};
use crate::handler::ServiceHandler;
use crate::pool::{RequestIdPool, REQUEST_ID_COUNT};

use super::config::EndpointConfig;
use super::error::RpcError;

type ConnectedFn = Arc<dyn Fn() + Send + Sync>;
type DisconnectedFn = Arc<dyn Fn(Option<RpcError>) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(RpcError) + Send + Sync>;

/// Lifecycle callbacks exposed to the owner of an [`Endpoint`].
///
/// `on_connected` fires on every (re)connection, `on_disconnected` on every
/// connection loss (with `None` when the disconnection was requested via
/// [`Endpoint::close`]), and `on_error` on non-fatal errors encountered
/// outside of a disconnection, such as a failed reconnect attempt.
#[derive(Clone)]
pub struct EndpointCallbacks {
    on_connected: ConnectedFn,
    on_disconnected: DisconnectedFn,
    on_error: ErrorFn,
}

impl Default for EndpointCallbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointCallbacks {
    /// Create callbacks that ignore every event.
    pub fn new() -> Self {
        Self {
            on_connected: Arc::new(|| {}),
            on_disconnected: Arc::new(|_| {}),
            on_error: Arc::new(|_| {}),
        }
    }

    /// Set the callback invoked when a connection is established.
    pub fn on_connected(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connected = Arc::new(f);
        self
    }

    /// Set the callback invoked when the connection is lost.
    ///
    /// The error is `None` when the disconnection was intentional.
    pub fn on_disconnected(mut self, f: impl Fn(Option<RpcError>) + Send + Sync + 'static) -> Self {
        self.on_disconnected = Arc::new(f);
        self
    }

    /// Set the callback invoked on non-disconnection errors.
    pub fn on_error(mut self, f: impl Fn(RpcError) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(f);
        self
    }
}

/// Connection state: a live writer, the error that took the link down, or
/// the terminal closed state.
///
/// Stored behind a mutex so senders, the read loop, and `close()` always
/// observe a single untorn value.
enum Link {
    Connected(Arc<Writer>),
    Down { details: String },
    Closed,
}

/// Write half of the transport. The async mutex serializes whole frames.
struct Writer {
    stream: tokio::sync::Mutex<OwnedWriteHalf>,
}

impl Writer {
    fn new(half: OwnedWriteHalf) -> Self {
        Self {
            stream: tokio::sync::Mutex::new(half),
        }
    }

    async fn write_frame(&self, envelope: &Envelope) -> std::io::Result<()> {
        let body = envelope.encode();
        let mut frame = Vec::with_capacity(4 + body.len());
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&body);

        let mut stream = self.stream.lock().await;
        stream.write_all(&frame).await
    }

    async fn shutdown(&self) {
        let mut stream = self.stream.lock().await;
        let _ = stream.shutdown().await;
    }
}

/// A client-side endpoint used to send and receive RPC requests.
///
/// Cloning is cheap and clones share the same connection.
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<Inner>,
}

struct Inner {
    config: EndpointConfig,
    callbacks: EndpointCallbacks,
    codec: JsonCodec,
    link: Mutex<Link>,
    handlers: Mutex<HashMap<ServiceId, Arc<dyn ServiceHandler>>>,
    /// Pool of available request IDs; each ID is bound 1:1 to the response
    /// slot at index `id - 1`.
    pool: RequestIdPool,
    slots: Vec<Mutex<Option<oneshot::Sender<Envelope>>>>,
    shutdown_tx: mpsc::UnboundedSender<()>,
}

impl Endpoint {
    /// Connect to the configured address.
    ///
    /// If the initial attempt fails with a connectivity error (refused,
    /// unreachable, timed out), construction still succeeds: the error is
    /// recorded as current state, `on_error` fires, and the background loop
    /// keeps retrying. This lets a caller build an endpoint before its peer
    /// is up. Any other failure aborts construction.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Io`] for non-connectivity failures of the
    /// initial attempt, e.g. an unresolvable address.
    ///
    /// # Panics
    ///
    /// Panics if the configured host is empty.
    pub async fn connect(
        config: EndpointConfig,
        callbacks: EndpointCallbacks,
    ) -> Result<Self, RpcError> {
        assert!(!config.host.is_empty(), "endpoint host must not be empty");

        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            config,
            callbacks,
            codec: JsonCodec,
            link: Mutex::new(Link::Down {
                details: "never connected".to_string(),
            }),
            handlers: Mutex::new(HashMap::new()),
            pool: RequestIdPool::new(),
            slots: (0..REQUEST_ID_COUNT).map(|_| Mutex::new(None)).collect(),
            shutdown_tx,
        });

        let reader = match dial(&inner.config).await {
            Ok(stream) => {
                let (read_half, write_half) = stream.into_split();
                inner.install_writer(Writer::new(write_half));
                tracing::debug!(endpoint = %inner.config.address(), "connected");
                (inner.callbacks.on_connected)();
                Some(read_half)
            }
            Err(error) if is_connectivity_error(&error) => {
                tracing::debug!(
                    endpoint = %inner.config.address(),
                    %error,
                    "initial connection failed; retrying in the background"
                );
                inner.mark_down(error.to_string());
                (inner.callbacks.on_error)(RpcError::Io(error));
                None
            }
            Err(error) => return Err(RpcError::Io(error)),
        };

        tokio::spawn(run_connection(inner.clone(), reader, shutdown_rx));

        Ok(Self { inner })
    }

    /// The `host:port` address this endpoint connects to.
    pub fn address(&self) -> String {
        self.inner.config.address()
    }

    /// Whether a live transport currently exists.
    pub fn is_connected(&self) -> bool {
        matches!(
            *self.inner.link.lock().expect("link lock poisoned"),
            Link::Connected(_)
        )
    }

    /// Register the handler for inbound requests of its service.
    ///
    /// Replaces any handler previously registered for the same service
    /// identifier.
    ///
    /// # Panics
    ///
    /// Panics if the handler reports service identifier zero.
    pub fn set_handler(&self, handler: Arc<dyn ServiceHandler>) {
        let service_id = handler.service_id();
        assert!(service_id != 0, "handler service id must not be zero");
        self.inner
            .handlers
            .lock()
            .expect("handler registry lock poisoned")
            .insert(service_id, handler);
    }

    /// Remove the handler for a service. Idempotent.
    pub fn remove_handler(&self, service_id: ServiceId) {
        self.inner
            .handlers
            .lock()
            .expect("handler registry lock poisoned")
            .remove(&service_id);
    }

    /// Send a one-way request to the given service/method pair.
    ///
    /// Intended to be used by generated service stubs.
    ///
    /// # Errors
    ///
    /// Fails immediately with [`RpcError::Disconnected`] while no live
    /// transport exists; one-way requests are never queued.
    pub async fn send_one_way<Req>(
        &self,
        service_id: ServiceId,
        method_id: MethodId,
        request: &Req,
    ) -> Result<(), RpcError>
    where
        Req: Serialize + Sync,
    {
        let writer = self.inner.writer()?;
        let message_bytes = self.inner.codec.encode(request)?;
        let envelope = Envelope::request(service_id, method_id, 0, message_bytes);
        writer.write_frame(&envelope).await.map_err(RpcError::Io)
    }

    /// Send a two-way request to the given service/method pair and await
    /// its response.
    ///
    /// At most 32 two-way calls may be outstanding concurrently per
    /// endpoint; further callers wait until a request ID is released.
    ///
    /// Intended to be used by generated service stubs.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Disconnected`] when no live transport exists
    /// - [`RpcError::ConnectionClosed`] when the connection drops before
    ///   the response arrives
    /// - [`RpcError::Remote`] when the peer's handler failed
    /// - [`RpcError::Codec`] when the response payload is malformed
    pub async fn send_two_way<Req, Res>(
        &self,
        service_id: ServiceId,
        method_id: MethodId,
        request: &Req,
    ) -> Result<Res, RpcError>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let message_bytes = self.inner.codec.encode(request)?;
        let writer = self.inner.writer()?;

        let request_id = self.inner.pool.acquire().await;
        let guard = SlotGuard {
            inner: &self.inner,
            request_id,
        };

        let (response_tx, response_rx) = oneshot::channel();
        *self.inner.slot(request_id) = Some(response_tx);

        let envelope = Envelope::request(service_id, method_id, request_id, message_bytes);
        writer.write_frame(&envelope).await.map_err(RpcError::Io)?;

        // The sender is dropped by `cancel_pending` on disconnection,
        // releasing this await with a closed-channel error.
        let response = response_rx
            .await
            .map_err(|_| RpcError::ConnectionClosed)?;
        drop(guard);

        if !response.error.is_empty() {
            return Err(RpcError::Remote(response.error));
        }
        Ok(self.inner.codec.decode(&response.message_bytes)?)
    }

    /// Close the endpoint. Terminal and idempotent.
    ///
    /// Pending two-way calls are released with
    /// [`RpcError::ConnectionClosed`], `on_disconnected(None)` fires if a
    /// transport was live, and the background read loop stops without
    /// reconnecting.
    pub async fn close(&self) {
        let previous = {
            let mut link = self.inner.link.lock().expect("link lock poisoned");
            std::mem::replace(&mut *link, Link::Closed)
        };
        if matches!(previous, Link::Closed) {
            return;
        }

        let _ = self.inner.shutdown_tx.send(());
        self.inner.cancel_pending();

        if let Link::Connected(writer) = previous {
            (self.inner.callbacks.on_disconnected)(None);
            writer.shutdown().await;
        }
        tracing::debug!(endpoint = %self.inner.config.address(), "endpoint closed");
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("address", &self.inner.config.address())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Returns the request ID to the pool once the call is done with it, and
/// clears the response slot so a stale sender never outlives its call.
struct SlotGuard<'a> {
    inner: &'a Inner,
    request_id: RequestId,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.inner.slot(self.request_id).take();
        self.inner.pool.release(self.request_id);
    }
}

impl Inner {
    fn slot(&self, id: RequestId) -> MutexGuard<'_, Option<oneshot::Sender<Envelope>>> {
        self.slots[(id - 1) as usize]
            .lock()
            .expect("response slot lock poisoned")
    }

    /// Swap in a fresh writer unless the endpoint was closed meanwhile.
    fn install_writer(&self, writer: Writer) -> bool {
        let mut link = self.link.lock().expect("link lock poisoned");
        if matches!(*link, Link::Closed) {
            return false;
        }
        *link = Link::Connected(Arc::new(writer));
        true
    }

    fn mark_down(&self, details: String) {
        let mut link = self.link.lock().expect("link lock poisoned");
        if matches!(*link, Link::Closed) {
            return;
        }
        *link = Link::Down { details };
    }

    fn is_closed(&self) -> bool {
        matches!(*self.link.lock().expect("link lock poisoned"), Link::Closed)
    }

    fn writer(&self) -> Result<Arc<Writer>, RpcError> {
        match &*self.link.lock().expect("link lock poisoned") {
            Link::Connected(writer) => Ok(writer.clone()),
            Link::Down { details } => Err(RpcError::Disconnected {
                details: details.clone(),
            }),
            Link::Closed => Err(RpcError::Disconnected {
                details: "endpoint closed".to_string(),
            }),
        }
    }

    /// Release every outstanding two-way call so blocked callers observe a
    /// connection-closed condition instead of stalling.
    fn cancel_pending(&self) {
        for slot in &self.slots {
            // Dropping the sender closes the caller's channel.
            slot.lock().expect("response slot lock poisoned").take();
        }
    }

    async fn handle_frame(&self, bytes: &[u8]) {
        let envelope = match Envelope::decode(bytes) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(
                    endpoint = %self.config.address(),
                    %error,
                    "cannot decode inbound envelope"
                );
                return;
            }
        };

        if envelope.cancel {
            // Cancellations are informational only; the pending response is
            // still delivered (and discarded) through the normal path.
            tracing::trace!(
                endpoint = %self.config.address(),
                request_id = envelope.request_id,
                "ignoring cancellation notice"
            );
            return;
        }

        if envelope.is_response() {
            self.handle_response(envelope);
            return;
        }
        self.handle_request(envelope).await;
    }

    fn handle_response(&self, envelope: Envelope) {
        let request_id = envelope.request_id;
        let Some(slot) = (request_id as usize)
            .checked_sub(1)
            .and_then(|index| self.slots.get(index))
        else {
            tracing::warn!(
                endpoint = %self.config.address(),
                request_id,
                "response for out-of-range request id"
            );
            return;
        };

        let sender = slot.lock().expect("response slot lock poisoned").take();
        match sender {
            Some(sender) => {
                if sender.send(envelope).is_err() {
                    tracing::debug!(
                        endpoint = %self.config.address(),
                        request_id,
                        "response waiter went away"
                    );
                }
            }
            None => {
                tracing::warn!(
                    endpoint = %self.config.address(),
                    request_id,
                    "response for unknown request"
                );
            }
        }
    }

    async fn handle_request(&self, envelope: Envelope) {
        let handler = self
            .handlers
            .lock()
            .expect("handler registry lock poisoned")
            .get(&envelope.service_id)
            .cloned();
        let Some(handler) = handler else {
            tracing::warn!(
                endpoint = %self.config.address(),
                service_id = envelope.service_id,
                "cannot process request for unknown service"
            );
            return;
        };

        let request_id = envelope.request_id;
        match handler
            .handle(envelope.method_id, &envelope.message_bytes)
            .await
        {
            Ok(Some(response_bytes)) if request_id != 0 => {
                self.respond(Envelope::response(request_id, response_bytes))
                    .await;
            }
            Ok(_) => {}
            Err(error) if request_id != 0 => {
                self.respond(Envelope::error_response(request_id, error.to_string()))
                    .await;
            }
            Err(error) => {
                tracing::warn!(
                    endpoint = %self.config.address(),
                    service_id = envelope.service_id,
                    %error,
                    "service handler failed"
                );
            }
        }
    }

    async fn respond(&self, envelope: Envelope) {
        let writer = match self.writer() {
            Ok(writer) => writer,
            Err(error) => {
                tracing::warn!(
                    endpoint = %self.config.address(),
                    %error,
                    "cannot respond on disconnected endpoint"
                );
                return;
            }
        };
        if let Err(error) = writer.write_frame(&envelope).await {
            tracing::warn!(
                endpoint = %self.config.address(),
                %error,
                "failed to send response message"
            );
        }
    }
}

/// Errors of the frame-reading layer. Oversized frames are distinguished
/// from transport failures so they can be reported as protocol violations.
enum ReadError {
    Io(std::io::Error),
    FrameTooLarge(usize),
}

impl ReadError {
    fn into_rpc(self) -> RpcError {
        match self {
            ReadError::Io(error) => RpcError::Io(error),
            ReadError::FrameTooLarge(size) => {
                RpcError::Envelope(EnvelopeError::FrameTooLarge { size })
            }
        }
    }
}

async fn read_frame(
    reader: &mut BufReader<OwnedReadHalf>,
    max_frame_size: usize,
) -> Result<Vec<u8>, ReadError> {
    let len = reader.read_u32_le().await.map_err(ReadError::Io)? as usize;
    if len > max_frame_size {
        return Err(ReadError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await.map_err(ReadError::Io)?;
    Ok(buf)
}

async fn dial(config: &EndpointConfig) -> std::io::Result<TcpStream> {
    match tokio::time::timeout(config.connect_timeout, TcpStream::connect(config.address())).await
    {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("connecting to {} timed out", config.address()),
        )),
    }
}

/// Whether an initial connection failure will be recovered from by the
/// background reconnect loop.
fn is_connectivity_error(error: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        error.kind(),
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::HostUnreachable
            | ErrorKind::NetworkUnreachable
            | ErrorKind::NotConnected
            | ErrorKind::TimedOut
    )
}

/// Background task owning the connection for the endpoint's lifetime:
/// alternates between the reconnect phase and the read phase until the
/// endpoint closes.
async fn run_connection(
    inner: Arc<Inner>,
    initial_reader: Option<OwnedReadHalf>,
    mut shutdown_rx: mpsc::UnboundedReceiver<()>,
) {
    let mut reader = initial_reader;
    loop {
        let read_half = match reader.take() {
            Some(half) => half,
            None => match reconnect(&inner, &mut shutdown_rx).await {
                Some(half) => half,
                None => return,
            },
        };
        if !read_until_disconnected(&inner, read_half, &mut shutdown_rx).await {
            return;
        }
    }
}

/// Read frames until the connection drops. Returns `false` when the
/// endpoint was closed and the connection task must exit.
async fn read_until_disconnected(
    inner: &Arc<Inner>,
    read_half: OwnedReadHalf,
    shutdown_rx: &mut mpsc::UnboundedReceiver<()>,
) -> bool {
    let mut reader = BufReader::new(read_half);
    loop {
        let frame = tokio::select! {
            _ = shutdown_rx.recv() => return false,
            frame = read_frame(&mut reader, inner.config.max_frame_size) => frame,
        };

        match frame {
            Ok(bytes) => inner.handle_frame(&bytes).await,
            Err(error) => {
                if inner.is_closed() {
                    return false;
                }
                let error = error.into_rpc();
                tracing::warn!(
                    endpoint = %inner.config.address(),
                    %error,
                    "connection lost"
                );
                inner.mark_down(error.to_string());
                inner.cancel_pending();
                let on_disconnected = inner.callbacks.on_disconnected.clone();
                tokio::spawn(async move { on_disconnected(Some(error)) });
                return true;
            }
        }
    }
}

/// Retry connecting with exponential backoff until a connection is
/// established or the endpoint closes. Returns `None` on close.
async fn reconnect(
    inner: &Arc<Inner>,
    shutdown_rx: &mut mpsc::UnboundedReceiver<()>,
) -> Option<OwnedReadHalf> {
    let mut delay = inner.config.initial_backoff;
    loop {
        if inner.is_closed() {
            return None;
        }

        match dial(&inner.config).await {
            Ok(stream) => {
                let (read_half, write_half) = stream.into_split();
                if !inner.install_writer(Writer::new(write_half)) {
                    // Closed while the connection attempt was in flight.
                    return None;
                }
                tracing::debug!(endpoint = %inner.config.address(), "connected");
                let on_connected = inner.callbacks.on_connected.clone();
                tokio::spawn(async move { on_connected() });
                return Some(read_half);
            }
            Err(error) => {
                tracing::debug!(
                    endpoint = %inner.config.address(),
                    %error,
                    retry_in = ?delay,
                    "failed to connect to endpoint"
                );
                let on_error = inner.callbacks.on_error.clone();
                tokio::spawn(async move { on_error(RpcError::Io(error)) });
            }
        }

        tokio::select! {
            _ = shutdown_rx.recv() => return None,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = (delay * 2).min(inner.config.max_backoff);
    }
}
