//! Voice transport sockets
//!
//! Each voice channel is a Unix datagram socket exchanging layer-1
//! primitives with the B-channel peer. A datagram is an 8-byte header
//! (`prim`, `id`, host byte order) followed by the payload.

use crate::errors::TransportError;
use crate::types::CallId;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use std::path::{Path, PathBuf};
use std::os::unix::net::UnixDatagram as StdUnixDatagram;
use tokio::net::UnixDatagram;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Primitive header length
pub const HEADER_LEN: usize = 8;

pub const PH_ACTIVATE_REQ: u32 = 0x0101;
pub const PH_DEACTIVATE_REQ: u32 = 0x0201;
pub const PH_DATA_REQ: u32 = 0x2001;
pub const PH_DATA_IND: u32 = 0x2002;
pub const PH_ACTIVATE_IND: u32 = 0x0202;
pub const PH_DEACTIVATE_IND: u32 = 0x0302;
pub const PH_DATA_CNF: u32 = 0x4002;

/// E1 timeslot serving voice channel `index`; slot 16 carries signalling
pub fn timeslot(index: usize) -> usize {
    index + 1 + usize::from(index > 15)
}

/// What arrived on a voice socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEventKind {
    Activated,
    Deactivated,
    Data(Bytes),
}

/// Inbound voice traffic handed to the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceEvent {
    pub call: CallId,
    pub index: usize,
    pub kind: VoiceEventKind,
}

/// An open voice socket
pub trait VoiceTransport: Send {
    /// Send one primitive without waiting
    fn send(&mut self, prim: u32, payload: &[u8]) -> io::Result<()>;
}

/// Opens voice sockets for a link
pub trait VoiceTransportFactory: Send {
    /// Bind channel `index` for `call` and send the activation request
    fn open(
        &mut self,
        index: usize,
        call: CallId,
    ) -> Result<Box<dyn VoiceTransport>, TransportError>;
}

/// Encode a primitive into one datagram
pub fn encode_primitive(prim: u32, payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u32_ne(prim);
    buf.put_u32_ne(0);
    buf.put_slice(payload);
    buf
}

/// Split a datagram into primitive and payload
pub fn decode_primitive(mut datagram: &[u8]) -> Option<(u32, &[u8])> {
    if datagram.len() < HEADER_LEN {
        return None;
    }
    let prim = datagram.get_u32_ne();
    let _id = datagram.get_u32_ne();
    Some((prim, datagram))
}

/// Factory binding datagram sockets under one directory
pub struct UnixVoiceFactory {
    link: String,
    dir: PathBuf,
    events: mpsc::UnboundedSender<VoiceEvent>,
}

impl UnixVoiceFactory {
    pub fn new(
        link: impl Into<String>,
        dir: impl Into<PathBuf>,
        events: mpsc::UnboundedSender<VoiceEvent>,
    ) -> Self {
        Self {
            link: link.into(),
            dir: dir.into(),
            events,
        }
    }

    fn local_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}-{}.sock", self.link, index))
    }

    fn peer_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("bchannel-{}", timeslot(index)))
    }
}

impl VoiceTransportFactory for UnixVoiceFactory {
    fn open(
        &mut self,
        index: usize,
        call: CallId,
    ) -> Result<Box<dyn VoiceTransport>, TransportError> {
        let path = self.local_path(index);
        let bind_err = |source| TransportError::Bind {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(bind_err)?;
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(bind_err(e)),
            _ => {}
        }

        // Sends go straight to the socket; the registered clone only reads
        let socket = StdUnixDatagram::bind(&path).map_err(bind_err)?;
        let reader = socket
            .set_nonblocking(true)
            .and_then(|_| socket.try_clone())
            .and_then(UnixDatagram::from_std)
            .map_err(|e| {
                remove_socket(&path);
                bind_err(e)
            })?;

        let mut transport = UnixVoiceTransport {
            socket,
            path,
            peer: self.peer_path(index),
            reader: tokio::spawn(read_loop(reader, call, index, self.events.clone())),
        };
        transport
            .send(PH_ACTIVATE_REQ, &[])
            .map_err(|source| TransportError::Activate { index, source })?;

        debug!(%call, index, peer = ?transport.peer, "Voice channel opened");
        Ok(Box::new(transport))
    }
}

struct UnixVoiceTransport {
    socket: StdUnixDatagram,
    path: PathBuf,
    peer: PathBuf,
    reader: JoinHandle<()>,
}

impl VoiceTransport for UnixVoiceTransport {
    fn send(&mut self, prim: u32, payload: &[u8]) -> io::Result<()> {
        let datagram = encode_primitive(prim, payload);
        self.socket.send_to(&datagram, &self.peer).map(|_| ())
    }
}

impl Drop for UnixVoiceTransport {
    fn drop(&mut self) {
        if let Err(e) = self.send(PH_DEACTIVATE_REQ, &[]) {
            trace!("Deactivation of {:?} not delivered: {}", self.peer, e);
        }
        self.reader.abort();
        remove_socket(&self.path);
    }
}

fn remove_socket(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        trace!("Socket {:?} not removed: {}", path, e);
    }
}

async fn read_loop(
    socket: UnixDatagram,
    call: CallId,
    index: usize,
    events: mpsc::UnboundedSender<VoiceEvent>,
) {
    let mut buf = vec![0u8; 2048];
    loop {
        let n = match socket.recv(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!(%call, index, "Voice socket read failed: {}", e);
                return;
            }
        };
        let Some((prim, payload)) = decode_primitive(&buf[..n]) else {
            trace!(%call, index, len = n, "Runt voice datagram");
            continue;
        };
        let kind = match prim {
            PH_ACTIVATE_IND => VoiceEventKind::Activated,
            PH_DEACTIVATE_IND => VoiceEventKind::Deactivated,
            PH_DATA_IND => VoiceEventKind::Data(Bytes::copy_from_slice(payload)),
            PH_DATA_CNF => continue,
            other => {
                trace!(%call, index, "Unhandled voice primitive 0x{:04x}", other);
                continue;
            }
        };
        if events.send(VoiceEvent { call, index, kind }).is_err() {
            return;
        }
    }
}
