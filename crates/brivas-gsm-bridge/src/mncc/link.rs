//! MNCC connection manager
//!
//! Owns the stream socket to the GSM stack. Connects to the well-known
//! socket path, retries at a constant interval while the stack is away,
//! reads length-prefixed records into the [`Bridge`] and drains its queue
//! whenever the socket is writable. Losing the socket releases every call
//! of the link and empties the queue before the next attempt.

use super::codec::{decode_message, split_record};
use super::queue::FlushStatus;
use crate::bridge::Bridge;
use crate::config::LinkConfig;
use crate::engine::{CommandReceiver, EngineSender};
use crate::errors::{BridgeError, Result, TransportError};
use crate::voice::{UnixVoiceFactory, VoiceEvent};
use bytes::BytesMut;
use metrics::counter;
use std::future::pending;
use std::io;
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, instrument, warn};

const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Connection state of the control socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct MnccLink {
    config: LinkConfig,
    bridge: Bridge,
    voice_rx: mpsc::UnboundedReceiver<VoiceEvent>,
    commands: CommandReceiver,
    state: LinkState,
    stream: Option<UnixStream>,
    read_buf: BytesMut,
    next_attempt: Instant,
}

impl MnccLink {
    pub fn new(config: LinkConfig, engine: EngineSender, commands: CommandReceiver) -> Self {
        let (voice_tx, voice_rx) = mpsc::unbounded_channel();
        let factory =
            UnixVoiceFactory::new(config.name.clone(), config.voice_socket_dir.clone(), voice_tx);
        let bridge = Bridge::new(&config, Box::new(factory), engine);
        Self {
            config,
            bridge,
            voice_rx,
            commands,
            state: LinkState::Disconnected,
            stream: None,
            read_buf: BytesMut::with_capacity(READ_BUFFER_SIZE),
            next_attempt: Instant::now(),
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Serve the link until `shutdown` flips or its sender goes away
    #[instrument(skip_all, fields(link = %self.config.name, path = ?self.config.socket_path))]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let retry = self.config.retry_interval();
        let mut commands_open = true;

        loop {
            let connected = self.stream.is_some();
            let want_write = connected && self.bridge.queue().wants_write();

            tokio::select! {
                _ = shutdown.changed() => {
                    info!("MNCC link shutting down");
                    if connected {
                        self.bridge.connection_lost();
                        self.bridge.run_deferred();
                    }
                    return Ok(());
                }
                _ = sleep_until(self.next_attempt), if !connected => {
                    self.connect(retry).await;
                }
                ready = readable(&self.stream), if connected => {
                    if let Err(e) = ready.map_err(BridgeError::from).and_then(|_| self.read()) {
                        self.lose_connection(e, retry);
                    }
                }
                ready = writable(&self.stream), if want_write => {
                    if let Err(e) = ready.map_err(BridgeError::from).and_then(|_| self.flush()) {
                        self.lose_connection(e, retry);
                    }
                }
                Some(event) = self.voice_rx.recv() => {
                    self.bridge.handle_voice(event);
                }
                command = self.commands.recv(), if commands_open => {
                    match command {
                        Some(command) => {
                            self.bridge.handle_engine(command);
                        }
                        None => {
                            debug!("Engine command channel closed");
                            commands_open = false;
                        }
                    }
                }
            }

            self.bridge.run_deferred();
        }
    }

    #[instrument(skip_all)]
    async fn connect(&mut self, retry: Duration) {
        self.state = LinkState::Connecting;
        debug!("Connecting to MNCC socket {:?}", self.config.socket_path);
        match UnixStream::connect(&self.config.socket_path).await {
            Ok(stream) => {
                info!("MNCC socket {:?} connected", self.config.socket_path);
                self.read_buf.clear();
                self.stream = Some(stream);
                self.state = LinkState::Connected;
            }
            Err(e) => {
                let e = TransportError::Connect {
                    path: self.config.socket_path.clone(),
                    source: e,
                };
                warn!("{}, retrying in {:?}", e, retry);
                self.state = LinkState::Disconnected;
                self.next_attempt = Instant::now() + retry;
            }
        }
    }

    /// Read everything available and dispatch complete records
    fn read(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_ref() else {
            return Ok(());
        };
        loop {
            match stream.try_read_buf(&mut self.read_buf) {
                Ok(0) => return Err(TransportError::PeerClosed.into()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        while let Some(record) = split_record(&mut self.read_buf)? {
            match decode_message(&record) {
                Ok(msg) => self.bridge.handle_mncc(msg),
                Err(e) => {
                    counter!("mncc_malformed_records_total").increment(1);
                    warn!(len = record.len(), "Dropping malformed MNCC record: {}", e);
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        if self.bridge.queue_mut().flush(stream)? == FlushStatus::Blocked {
            debug!(queued = self.bridge.queue().len(), "MNCC socket would block");
        }
        Ok(())
    }

    fn lose_connection(&mut self, reason: BridgeError, retry: Duration) {
        error!("MNCC socket lost: {}", reason);
        self.stream = None;
        self.state = LinkState::Disconnected;
        self.read_buf.clear();
        counter!("mncc_reconnects_total").increment(1);
        self.bridge.connection_lost();
        self.next_attempt = Instant::now() + retry;
    }
}

async fn readable(stream: &Option<UnixStream>) -> io::Result<()> {
    match stream {
        Some(stream) => stream.readable().await,
        None => pending().await,
    }
}

async fn writable(stream: &Option<UnixStream>) -> io::Result<()> {
    match stream {
        Some(stream) => stream.writable().await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    fn link(name: &str) -> (MnccLink, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("gsm-bridge-state-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let config = LinkConfig {
            name: name.to_string(),
            socket_path: dir.join("mncc"),
            voice_socket_dir: dir.clone(),
            ..Default::default()
        };
        let (engine_tx, _engine_rx) = mpsc::unbounded_channel();
        let (_command_tx, command_rx) = mpsc::unbounded_channel();
        (MnccLink::new(config, engine_tx, command_rx), dir)
    }

    #[tokio::test]
    async fn test_failed_attempt_returns_to_disconnected() {
        let (mut link, dir) = link("refused");
        assert_eq!(link.state(), LinkState::Disconnected);
        let before = Instant::now();
        link.connect(Duration::from_secs(3)).await;
        assert_eq!(link.state(), LinkState::Disconnected);
        assert!(link.next_attempt >= before + Duration::from_secs(3));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_attempt_reaches_connected() {
        let (mut link, dir) = link("accepted");
        let _listener = UnixListener::bind(dir.join("mncc")).unwrap();
        link.connect(Duration::from_secs(3)).await;
        assert_eq!(link.state(), LinkState::Connected);

        link.lose_connection(TransportError::PeerClosed.into(), Duration::from_secs(3));
        assert_eq!(link.state(), LinkState::Disconnected);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
