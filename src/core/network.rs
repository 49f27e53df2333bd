//! Peer transport: one iroh QUIC connection carrying one bidirectional
//! stream of length-prefixed JSON frames.
//!
//! The host's endpoint id is the session code. The host opens the stream
//! and writes a handshake frame first, so the joiner's `accept_bi` resolves
//! as soon as the connection is up.

use std::io;

use anyhow::{anyhow, bail, Context as _, Result};
use iroh::endpoint::Connection;
use iroh::{Endpoint, EndpointId};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::connection::{ConnectionState, Outbox};
use crate::core::protocol::{self, PeerMessage};

pub const ALPN: &[u8] = b"pomopair/1";

const APP: &str = "pomopair";
const PROTOCOL_VERSION: u16 = 1;
/// Largest frame either side will accept.
const MAX_FRAME_LEN: usize = 1 << 20;

/// First frame on the stream, written by the host.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub app: String,
    pub version: u16,
}

impl Handshake {
    pub fn current() -> Self {
        Self {
            app: APP.to_string(),
            version: PROTOCOL_VERSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    Message(PeerMessage),
    Disconnected,
}

/// An established peer connection and the two tasks pumping it.
pub struct PeerLink {
    endpoint: Endpoint,
    conn: Connection,
    is_host: bool,
    session_code: String,
    outbox: Outbox,
    events: Option<UnboundedReceiver<NetworkEvent>>,
}

impl PeerLink {
    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn session_code(&self) -> &str {
        &self.session_code
    }

    /// Connection record for the session, sharing this link's outbox.
    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::connected(self.outbox.clone(), self.is_host)
            .with_session_code(self.session_code.clone())
    }

    /// Incoming events. Can be taken once.
    pub fn take_events(&mut self) -> Option<UnboundedReceiver<NetworkEvent>> {
        self.events.take()
    }

    pub async fn close(self) {
        self.conn.close(0u32.into(), b"bye");
        self.endpoint.close().await;
    }
}

pub async fn bind() -> Result<Endpoint> {
    let endpoint = Endpoint::builder()
        .alpns(vec![ALPN.to_vec()])
        .bind()
        .await?;
    Ok(endpoint)
}

/// Waits for one peer, opens the stream and sends the handshake.
pub async fn host(endpoint: Endpoint) -> Result<PeerLink> {
    let session_code = endpoint.id().to_string();
    let incoming = endpoint.accept().await.ok_or_else(|| anyhow!("Closed"))?;
    let conn = incoming.accept()?.await?;
    info!(peer = %conn.remote_id(), "peer connected");

    let (mut send, recv) = conn.open_bi().await?;
    let hello = postcard::to_stdvec(&Handshake::current())?;
    write_frame(&mut send, &hello).await?;
    debug!("handshake sent");

    Ok(start(endpoint, conn, true, session_code, send, recv))
}

/// Connects to the host named by `code` and checks its handshake.
pub async fn join(endpoint: Endpoint, code: &str) -> Result<PeerLink> {
    let peer_id: EndpointId = code
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a valid session code", code.trim()))?;
    let conn = endpoint.connect(peer_id, ALPN).await?;
    info!(host = %peer_id, "connected to host");

    let (send, mut recv) = conn.accept_bi().await?;
    let frame = read_frame(&mut recv)
        .await?
        .ok_or_else(|| anyhow!("host closed the stream before the handshake"))?;
    let hello: Handshake = postcard::from_bytes(&frame)?;
    check_handshake(&hello)?;
    debug!(version = hello.version, "handshake accepted");

    Ok(start(endpoint, conn, false, peer_id.to_string(), send, recv))
}

pub fn check_handshake(hello: &Handshake) -> Result<()> {
    let expected = Handshake::current();
    if hello.app != expected.app {
        bail!("peer is running '{}', not {APP}", hello.app);
    }
    if hello.version != expected.version {
        bail!(
            "protocol version mismatch: peer has {}, we have {}",
            hello.version,
            expected.version
        );
    }
    Ok(())
}

fn start<W, R>(
    endpoint: Endpoint,
    conn: Connection,
    is_host: bool,
    session_code: String,
    send: W,
    recv: R,
) -> PeerLink
where
    W: AsyncWrite + Unpin + Send + 'static,
    R: AsyncRead + Unpin + Send + 'static,
{
    let (outbox, outgoing) = mpsc::unbounded_channel();
    let (events_tx, events) = mpsc::unbounded_channel();
    spawn_writer(send, outgoing);
    spawn_reader(recv, events_tx);
    PeerLink {
        endpoint,
        conn,
        is_host,
        session_code,
        outbox,
        events: Some(events),
    }
}

/// Drains the outbox onto the stream until every sender is gone or the
/// stream fails.
pub fn spawn_writer<W>(mut send: W, mut outgoing: UnboundedReceiver<PeerMessage>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(msg) = outgoing.recv().await {
            let bytes = match protocol::encode(&msg) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(%err, kind = msg.kind(), "could not encode message");
                    continue;
                }
            };
            if let Err(err) = write_frame(&mut send, &bytes).await {
                warn!(%err, "peer stream closed while sending");
                return;
            }
        }
        if let Err(err) = send.shutdown().await {
            debug!(%err, "peer stream already gone at shutdown");
        }
    })
}

/// Decodes frames into events. Malformed frames are logged and skipped;
/// end of stream or a read error ends the task with `Disconnected`.
pub fn spawn_reader<R>(mut recv: R, events: UnboundedSender<NetworkEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let frame = match read_frame(&mut recv).await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "peer stream failed");
                    break;
                }
            };
            match protocol::decode(&frame) {
                Ok(msg) => {
                    debug!(kind = msg.kind(), "received peer message");
                    if events.send(NetworkEvent::Message(msg)).is_err() {
                        return;
                    }
                }
                Err(err) => warn!(%err, "dropping malformed frame"),
            }
        }
        if events.send(NetworkEvent::Disconnected).is_err() {
            debug!("session ended before the disconnect was seen");
        }
    })
}

/// `u32` big-endian length, then the body.
pub async fn write_frame<W: AsyncWrite + Unpin>(send: &mut W, bytes: &[u8]) -> io::Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    send.write_u32(len).await?;
    send.write_all(bytes).await?;
    send.flush().await
}

/// `None` on a clean end of stream at a frame boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(recv: &mut R) -> io::Result<Option<Vec<u8>>> {
    let len = match recv.read_u32().await {
        Ok(len) => len as usize,
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    };
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds limit"),
        ));
    }
    let mut buf = vec![0u8; len];
    recv.read_exact(&mut buf).await?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::TimerMessage;
    use crate::core::timer::TimerState;
    use crate::games::GameId;

    #[tokio::test]
    async fn frames_survive_a_pipe() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_frame(&mut a, b"hello").await.unwrap();
        write_frame(&mut a, b"").await.unwrap();
        drop(a);

        assert_eq!(read_frame(&mut b).await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!(read_frame(&mut b).await.unwrap(), Some(Vec::new()));
        assert_eq!(read_frame(&mut b).await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_u32(u32::MAX).await.unwrap();
        let err = read_frame(&mut b).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn reader_skips_garbage_and_reports_disconnect() {
        let (mut a, b) = tokio::io::duplex(1024);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reader = spawn_reader(b, tx);

        write_frame(&mut a, b"{\"type\":\"nonsense\"}").await.unwrap();
        let switch = PeerMessage::game_switch(GameId::Memory);
        write_frame(&mut a, &protocol::encode(&switch).unwrap()).await.unwrap();
        drop(a);

        assert_eq!(rx.recv().await, Some(NetworkEvent::Message(switch)));
        assert_eq!(rx.recv().await, Some(NetworkEvent::Disconnected));
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn writer_and_reader_talk_through_a_pipe() {
        let (a, b) = tokio::io::duplex(1024);
        let (outbox, outgoing) = mpsc::unbounded_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        spawn_writer(a, outgoing);
        spawn_reader(b, tx);

        let msg: PeerMessage = TimerMessage::TimerSync {
            state: TimerState::default(),
        }
        .into();
        outbox.send(msg.clone()).unwrap();
        drop(outbox);

        assert_eq!(rx.recv().await, Some(NetworkEvent::Message(msg)));
        assert_eq!(rx.recv().await, Some(NetworkEvent::Disconnected));
    }

    #[tokio::test]
    async fn pumps_wind_down_when_the_other_side_is_gone() {
        let (mut a, b) = tokio::io::duplex(1024);
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = spawn_reader(b, tx);
        drop(rx);
        let switch = PeerMessage::game_switch(GameId::Memory);
        write_frame(&mut a, &protocol::encode(&switch).unwrap()).await.unwrap();
        drop(a);
        reader.await.unwrap();

        let (a, b) = tokio::io::duplex(1024);
        let (outbox, outgoing) = mpsc::unbounded_channel();
        let writer = spawn_writer(a, outgoing);
        drop(b);
        outbox.send(switch).unwrap();
        drop(outbox);
        writer.await.unwrap();
    }

    #[test]
    fn handshake_rejects_other_apps_and_versions() {
        assert!(check_handshake(&Handshake::current()).is_ok());

        let other = Handshake {
            app: "someone-else".into(),
            version: PROTOCOL_VERSION,
        };
        assert!(check_handshake(&other).is_err());

        let future = Handshake {
            version: PROTOCOL_VERSION + 1,
            ..Handshake::current()
        };
        let bytes = postcard::to_stdvec(&future).unwrap();
        let decoded: Handshake = postcard::from_bytes(&bytes).unwrap();
        assert!(check_handshake(&decoded).is_err());
    }
}
