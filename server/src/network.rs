//! Server network layer handling stream connections and request coordination

use crate::error::ServerError;
use crate::game::MatchSummary;
use crate::inspect;
use crate::router::ProtocolRouter;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientFrame, ClientId, ServerFrame, MAX_FRAME_LENGTH};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

/// Messages sent from connection tasks to the coordinator
#[derive(Debug)]
pub enum ServerMessage {
    /// A connection passed the password challenge and needs an id
    Authenticated {
        outbound: mpsc::UnboundedSender<ServerFrame>,
        reply: oneshot::Sender<ClientId>,
    },
    FrameReceived {
        client_id: ClientId,
        line: String,
    },
    Disconnected {
        client_id: ClientId,
    },
    /// A client went quiet; the reply says whether it holds a turn
    IdleCheck {
        client_id: ClientId,
        reply: oneshot::Sender<bool>,
    },
    /// Read-only snapshot of every match, for inspection
    Snapshot {
        reply: oneshot::Sender<Vec<MatchSummary>>,
    },
    Shutdown,
}

/// Runtime configuration for [`Server::bind`]
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP address for game clients
    pub tcp_addr: String,
    /// Optional Unix domain socket path for game clients (Unix only)
    pub unix_socket: Option<PathBuf>,
    /// Optional TCP address for the HTTP inspection endpoint
    pub inspect_addr: Option<String>,
    /// Shared secret every client must present
    pub password: String,
    /// Close connections that stay silent this long before authenticating
    /// or while holding the turn
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tcp_addr: format!("127.0.0.1:{}", shared::DEFAULT_PORT),
            unix_socket: None,
            inspect_addr: None,
            password: String::new(),
            idle_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Cloneable handle for talking to a running server
#[derive(Debug, Clone)]
pub struct ServerHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    /// Asks the coordinator to stop; listeners are closed when it does
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Shutdown requested after server already stopped");
        }
    }

    /// Fetches a snapshot of every match without touching match state
    pub async fn snapshot(&self) -> Result<Vec<MatchSummary>, ServerError> {
        let (reply, response) = oneshot::channel();
        self.server_tx
            .send(ServerMessage::Snapshot { reply })
            .map_err(|_| ServerError::ChannelClosed)?;
        response.await.map_err(|_| ServerError::ChannelClosed)
    }
}

/// Password challenge and frame forwarding for a single connection
#[derive(Debug)]
pub struct Gateway {
    password: String,
    idle_timeout: Option<Duration>,
}

impl Gateway {
    pub fn new(password: impl Into<String>, idle_timeout: Option<Duration>) -> Self {
        Self {
            password: password.into(),
            idle_timeout,
        }
    }

    /// Drives one connection from greeting to disconnect.
    ///
    /// Transport errors, oversized frames and idle timeouts end the
    /// connection the same way a clean close does: the coordinator is told
    /// the client left. After authentication an idle timeout only ends the
    /// connection while the client holds the turn in a live match; clients
    /// waiting at the menu or on their opponent stay connected.
    pub async fn serve<S>(
        self: Arc<Self>,
        stream: S,
        peer: String,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let mut frames =
            FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH));
        let mut writer = FramedWrite::new(writer, LinesCodec::new());

        if let Err(e) = writer.send(ServerFrame::Greeting.to_string()).await {
            warn!("Failed to greet {}: {}", peer, e);
            return;
        }

        match self.next_frame(&mut frames).await {
            Ok(Some(line)) if self.accepts(&line) => {}
            Ok(Some(_)) => {
                info!("Rejected {}: wrong password", peer);
                if let Err(e) = reject(&mut writer).await {
                    debug!("Failed to send rejection to {}: {}", peer, e);
                }
                return;
            }
            Ok(None) => {
                debug!("{} closed before authenticating", peer);
                return;
            }
            Err(e) => {
                warn!("Dropping {} before authentication: {}", peer, e);
                return;
            }
        }

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ServerFrame>();
        let (reply, assigned) = oneshot::channel();
        if server_tx
            .send(ServerMessage::Authenticated { outbound, reply })
            .is_err()
        {
            error!("Coordinator stopped; dropping connection from {}", peer);
            return;
        }
        let client_id = match assigned.await {
            Ok(client_id) => client_id,
            Err(_) => {
                error!("Coordinator never assigned an id to {}", peer);
                return;
            }
        };
        info!("Client {} authenticated from {}", client_id, peer);

        // Runs until the roster drops this client's outbound handle
        let writer_task = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = writer.send(frame.to_string()).await {
                    warn!("Failed to write to client {}: {}", client_id, e);
                    break;
                }
            }
            let _ = SinkExt::<String>::close(&mut writer).await;
        });

        loop {
            match self.next_frame(&mut frames).await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if server_tx
                        .send(ServerMessage::FrameReceived { client_id, line })
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(None) => break,
                Err(ServerError::IdleTimeout) => {
                    if holds_turn(client_id, &server_tx).await {
                        info!("Client {} timed out holding the turn", client_id);
                        break;
                    }
                    debug!("Client {} idle while waiting", client_id);
                }
                Err(e) => {
                    warn!("Connection error from client {}: {}", client_id, e);
                    break;
                }
            }
        }

        let _ = server_tx.send(ServerMessage::Disconnected { client_id });
        if let Err(e) = writer_task.await {
            error!("Writer task for client {} panicked: {}", client_id, e);
        }
        info!("Client {} disconnected", client_id);
    }

    fn accepts(&self, line: &str) -> bool {
        matches!(
            ClientFrame::decode(line),
            Ok(ClientFrame::Password { secret }) if secret == self.password
        )
    }

    async fn next_frame<R>(
        &self,
        frames: &mut FramedRead<R, LinesCodec>,
    ) -> Result<Option<String>, ServerError>
    where
        R: AsyncRead + Unpin,
    {
        let next = match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, frames.next())
                .await
                .map_err(|_| ServerError::IdleTimeout)?,
            None => frames.next().await,
        };
        Ok(next.transpose()?)
    }
}

/// Asks the coordinator whether an idle client is the one everybody waits on
async fn holds_turn(
    client_id: ClientId,
    server_tx: &mpsc::UnboundedSender<ServerMessage>,
) -> bool {
    let (reply, answer) = oneshot::channel();
    if server_tx
        .send(ServerMessage::IdleCheck { client_id, reply })
        .is_err()
    {
        return true;
    }
    answer.await.unwrap_or(true)
}

async fn reject<W>(writer: &mut FramedWrite<W, LinesCodec>) -> Result<(), LinesCodecError>
where
    W: AsyncWrite + Unpin,
{
    writer.send(ServerFrame::WrongPassword.to_string()).await?;
    SinkExt::<String>::close(writer).await
}

/// Removes a socket file left behind by an earlier run; refuses to touch
/// anything that is not a socket
#[cfg(unix)]
fn remove_stale_socket(path: &std::path::Path) -> Result<(), ServerError> {
    use std::os::unix::fs::FileTypeExt;

    match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_socket() => {
            std::fs::remove_file(path)?;
            Ok(())
        }
        Ok(_) => Err(ServerError::Config(format!(
            "{} exists and is not a socket",
            path.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Word duel server: listeners plus the coordinator that owns all state
pub struct Server {
    local_addr: SocketAddr,
    inspect_addr: Option<SocketAddr>,
    listener: Option<TcpListener>,
    #[cfg(unix)]
    unix_listener: Option<(tokio::net::UnixListener, PathBuf)>,
    inspect_listener: Option<TcpListener>,
    gateway: Arc<Gateway>,
    router: ProtocolRouter,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        if config.password.is_empty() {
            return Err(ServerError::Config("password must not be empty".to_string()));
        }

        let listener = TcpListener::bind(&config.tcp_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on TCP {}", local_addr);

        #[cfg(unix)]
        let unix_listener = match config.unix_socket {
            Some(path) => {
                remove_stale_socket(&path)?;
                let listener = tokio::net::UnixListener::bind(&path)?;
                info!("Server listening on Unix socket {}", path.display());
                Some((listener, path))
            }
            None => None,
        };
        #[cfg(not(unix))]
        if config.unix_socket.is_some() {
            warn!("Unix sockets are not supported on this platform; ignoring");
        }

        let (inspect_listener, inspect_addr) = match &config.inspect_addr {
            Some(addr) => {
                let listener = TcpListener::bind(addr).await?;
                let bound = listener.local_addr()?;
                info!("Inspection endpoint on http://{}/matches", bound);
                (Some(listener), Some(bound))
            }
            None => (None, None),
        };

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            local_addr,
            inspect_addr,
            listener: Some(listener),
            #[cfg(unix)]
            unix_listener,
            inspect_listener,
            gateway: Arc::new(Gateway::new(config.password, config.idle_timeout)),
            router: ProtocolRouter::new(),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn inspect_addr(&self) -> Option<SocketAddr> {
        self.inspect_addr
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    /// Spawns the accept loop for TCP game clients
    fn spawn_tcp_acceptor(&self, listener: TcpListener) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        debug!("Accepted connection from {}", addr);
                        let gateway = Arc::clone(&gateway);
                        let server_tx = server_tx.clone();
                        tokio::spawn(gateway.serve(stream, addr.to_string(), server_tx));
                    }
                    Err(e) => {
                        error!("Error accepting TCP connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Spawns the accept loop for Unix socket game clients
    #[cfg(unix)]
    fn spawn_unix_acceptor(&self, listener: tokio::net::UnixListener) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let gateway = Arc::clone(&gateway);
                        let server_tx = server_tx.clone();
                        tokio::spawn(gateway.serve(stream, "unix socket".to_string(), server_tx));
                    }
                    Err(e) => {
                        error!("Error accepting Unix connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
    }

    /// Processes one coordinator message; returns false on shutdown
    fn handle_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::Authenticated { outbound, reply } => {
                let client_id = self.router.connect(outbound);
                if reply.send(client_id).is_err() {
                    self.router.disconnect(client_id);
                }
            }
            ServerMessage::FrameReceived { client_id, line } => {
                self.router.handle_frame(client_id, &line);
            }
            ServerMessage::Disconnected { client_id } => {
                self.router.disconnect(client_id);
            }
            ServerMessage::IdleCheck { client_id, reply } => {
                let _ = reply.send(self.router.holds_turn(client_id));
            }
            ServerMessage::Snapshot { reply } => {
                let _ = reply.send(self.router.summaries());
            }
            ServerMessage::Shutdown => return false,
        }
        true
    }

    /// Main server loop: accepts connections and serializes every request
    pub async fn run(mut self) -> Result<(), ServerError> {
        let mut tasks = Vec::new();

        if let Some(listener) = self.listener.take() {
            tasks.push(self.spawn_tcp_acceptor(listener));
        }

        #[cfg(unix)]
        let unix_path = match self.unix_listener.take() {
            Some((listener, path)) => {
                tasks.push(self.spawn_unix_acceptor(listener));
                Some(path)
            }
            None => None,
        };

        if let Some(listener) = self.inspect_listener.take() {
            tasks.push(tokio::spawn(inspect::serve(listener, self.handle())));
        }

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            if !self.handle_message(message) {
                info!("Server shutting down");
                break;
            }
        }

        for task in tasks {
            task.abort();
        }

        #[cfg(unix)]
        if let Some(path) = unix_path {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn gateway() -> Arc<Gateway> {
        Arc::new(Gateway::new("secret", Some(Duration::from_secs(5))))
    }

    /// Stands in for the coordinator: assigns id 42, answers idle checks
    /// with `holds_turn` and collects forwarded frames until disconnect
    fn fake_coordinator(
        mut server_rx: mpsc::UnboundedReceiver<ServerMessage>,
        holds_turn: bool,
    ) -> JoinHandle<Vec<(ClientId, String)>> {
        tokio::spawn(async move {
            let mut received = Vec::new();
            let mut outbound_handle = None;
            while let Some(message) = server_rx.recv().await {
                match message {
                    ServerMessage::Authenticated { outbound, reply } => {
                        outbound.send(ServerFrame::Id(42)).unwrap();
                        reply.send(42).unwrap();
                        outbound_handle = Some(outbound);
                    }
                    ServerMessage::FrameReceived { client_id, line } => {
                        received.push((client_id, line));
                    }
                    ServerMessage::IdleCheck { client_id, reply } => {
                        assert_eq!(client_id, 42);
                        reply.send(holds_turn).unwrap();
                    }
                    ServerMessage::Disconnected { client_id } => {
                        assert_eq!(client_id, 42);
                        drop(outbound_handle.take());
                        break;
                    }
                    other => panic!("Unexpected message {:?}", other),
                }
            }
            received
        })
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let stream = Builder::new()
            .write(b"Hello, please enter your password\n")
            .read(b"PASSWORD:guess\n")
            .write(b"Wrong password. Disconnecting...\n")
            .build();
        let (server_tx, mut server_rx) = mpsc::unbounded_channel();

        gateway().serve(stream, "test".to_string(), server_tx).await;

        assert!(server_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_non_password_first_frame_is_rejected() {
        let stream = Builder::new()
            .write(b"Hello, please enter your password\n")
            .read(b"LIST_OPPONENTS\n")
            .write(b"Wrong password. Disconnecting...\n")
            .build();
        let (server_tx, mut server_rx) = mpsc::unbounded_channel();

        gateway().serve(stream, "test".to_string(), server_tx).await;

        assert!(server_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_before_password() {
        let stream = Builder::new()
            .write(b"Hello, please enter your password\n")
            .build();
        let (server_tx, mut server_rx) = mpsc::unbounded_channel();

        gateway().serve(stream, "test".to_string(), server_tx).await;

        assert!(server_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_authenticated_frames_reach_coordinator() {
        let stream = Builder::new()
            .write(b"Hello, please enter your password\n")
            .read(b"PASSWORD:secret\r\n")
            .write(b"ID:42\n")
            .read(b"LIST_OPPONENTS\n")
            .build();
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let coordinator = fake_coordinator(server_rx, false);

        gateway().serve(stream, "test".to_string(), server_tx).await;

        let received = coordinator.await.unwrap();
        assert_eq!(received, vec![(42, "LIST_OPPONENTS".to_string())]);
    }

    #[tokio::test]
    async fn test_idle_timeout_before_password() {
        let stream = Builder::new()
            .write(b"Hello, please enter your password\n")
            .wait(Duration::from_millis(200))
            .build();
        let (server_tx, mut server_rx) = mpsc::unbounded_channel();
        let gateway = Arc::new(Gateway::new("secret", Some(Duration::from_millis(20))));

        gateway.serve(stream, "test".to_string(), server_tx).await;

        assert!(server_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_idle_client_waiting_on_opponent_stays_connected() {
        let stream = Builder::new()
            .write(b"Hello, please enter your password\n")
            .read(b"PASSWORD:secret\n")
            .write(b"ID:42\n")
            .wait(Duration::from_millis(150))
            .read(b"LIST_OPPONENTS\n")
            .build();
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let coordinator = fake_coordinator(server_rx, false);
        let gateway = Arc::new(Gateway::new("secret", Some(Duration::from_millis(20))));

        gateway.serve(stream, "test".to_string(), server_tx).await;

        let received = coordinator.await.unwrap();
        assert_eq!(received, vec![(42, "LIST_OPPONENTS".to_string())]);
    }

    #[tokio::test]
    async fn test_idle_turn_holder_is_disconnected() {
        let stream = Builder::new()
            .write(b"Hello, please enter your password\n")
            .read(b"PASSWORD:secret\n")
            .write(b"ID:42\n")
            .wait(Duration::from_secs(5))
            .build();
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let coordinator = fake_coordinator(server_rx, true);
        let gateway = Arc::new(Gateway::new("secret", Some(Duration::from_millis(20))));

        let started = std::time::Instant::now();
        gateway.serve(stream, "test".to_string(), server_tx).await;

        assert!(coordinator.await.unwrap().is_empty());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_oversized_frame_before_password_closes_connection() {
        let oversized = vec![b'x'; MAX_FRAME_LENGTH + 16];
        let stream = Builder::new()
            .write(b"Hello, please enter your password\n")
            .read(&oversized)
            .build();
        let (server_tx, mut server_rx) = mpsc::unbounded_channel();

        gateway().serve(stream, "test".to_string(), server_tx).await;

        assert!(server_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_oversized_frame_disconnects_client() {
        let mut oversized = format!("GUESS:1:{}", "x".repeat(MAX_FRAME_LENGTH)).into_bytes();
        oversized.push(b'\n');
        let stream = Builder::new()
            .write(b"Hello, please enter your password\n")
            .read(b"PASSWORD:secret\n")
            .write(b"ID:42\n")
            .read(&oversized)
            .build();
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let coordinator = fake_coordinator(server_rx, false);

        gateway().serve(stream, "test".to_string(), server_tx).await;

        assert!(coordinator.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bind_rejects_empty_password() {
        let config = ServerConfig {
            tcp_addr: "127.0.0.1:0".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Server::bind(config).await,
            Err(ServerError::Config(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_bind_refuses_to_replace_regular_file() {
        let path = std::env::temp_dir().join(format!("word-duel-{}.txt", std::process::id()));
        std::fs::write(&path, b"keep me").unwrap();

        let config = ServerConfig {
            tcp_addr: "127.0.0.1:0".to_string(),
            unix_socket: Some(path.clone()),
            password: "secret".to_string(),
            ..Default::default()
        };
        let result = Server::bind(config).await;

        assert!(matches!(result, Err(ServerError::Config(_))));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_and_shutdown() {
        let config = ServerConfig {
            tcp_addr: "127.0.0.1:0".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        };
        let server = Server::bind(config).await.unwrap();
        let handle = server.handle();
        let task = tokio::spawn(server.run());

        assert!(handle.snapshot().await.unwrap().is_empty());

        handle.shutdown();
        assert!(task.await.unwrap().is_ok());
        assert!(matches!(
            handle.snapshot().await,
            Err(ServerError::ChannelClosed)
        ));
    }
}
