//! The per-connection session state machine and the roster fan-out that
//! backs it.
//!
//! Every accepted connection runs as its own task (see [`run`]). The task
//! owns its half of the TLS stream exclusively; the only state it shares
//! with other sessions is the [`Roster`], and only through its lock.

use std::{net::SocketAddr, sync::Arc};

use codec::{
    AuthResponse, AuthStatus, Disconnect, Frame, FrameKind, Header, KeyExchange, MessageAck,
    PublicKey, Username, HEADER_LEN,
};
use service::Roster;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::mpsc::{self, UnboundedSender},
};

use crate::{config::Config, error::SessionError, observer::Observer};

/// Outbound handle stored in the roster for a connection: frames sent here
/// are written to that connection's socket by its writer task.
type Outbound = UnboundedSender<Frame>;

/// The server-side session state, mirroring the distilled state machine.
/// `AUTH_REQ_RECVD` collapses into the `Init` step itself since the server
/// processes `AuthRequest` synchronously; there is nothing observable in
/// between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Authenticated,
    PublicKeySent,
    Chat,
}

/// Accepts connections on `config.listen` and spawns one session task per
/// connection. Runs until the listener itself errors.
pub async fn run(config: Arc<Config>, observer: Arc<dyn Observer>) -> anyhow::Result<()> {
    let roster: Arc<Roster<Outbound>> = Arc::new(Roster::new());
    let acceptor = crate::tls::acceptor(&config.tls)?;
    let listener = TcpListener::bind(config.listen).await?;

    log::info!("chat relay listening: addr={}", config.listen);

    loop {
        let (socket, addr) = listener.accept().await?;

        if let Err(e) = socket.set_nodelay(true) {
            log::warn!("tcp socket set nodelay failed: addr={addr}, err={e}");
        }

        let roster = roster.clone();
        let acceptor = acceptor.clone();
        let observer = observer.clone();
        let config = config.clone();

        tokio::spawn(async move {
            let socket = match acceptor.accept(socket).await {
                Ok(socket) => socket,
                Err(e) => {
                    log::warn!("tls handshake failed: addr={addr}, err={e}");
                    return;
                }
            };

            log::info!("session accepted: addr={addr}");

            if let Err(e) = session(socket, addr, &roster, &config, observer.as_ref()).await {
                log::warn!("session ended: addr={addr}, err={e}");
            }
        });
    }
}

async fn session<S>(
    stream: S,
    addr: SocketAddr,
    roster: &Arc<Roster<Outbound>>,
    config: &Config,
    observer: &dyn Observer,
) -> Result<(), SessionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
{
    let (mut reader, writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(frame) = rx.recv().await {
            if writer.write_all(&frame.encode(0)).await.is_err() {
                break;
            }
        }
    });

    let result = drive(&mut reader, &tx, roster, config, observer, addr).await;

    // Dropping `tx` lets the writer task drain and exit; no need to await
    // it, the reader side has already decided the session is over.
    drop(tx);
    writer_task.abort();

    result
}

/// Drives the read side of one session to completion, performing roster
/// cleanup on the way out regardless of how the session ended.
async fn drive<R>(
    reader: &mut R,
    outbound: &Outbound,
    roster: &Arc<Roster<Outbound>>,
    config: &Config,
    observer: &dyn Observer,
    addr: SocketAddr,
) -> Result<(), SessionError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut state = State::Init;
    let mut username: Option<Username> = None;

    let outcome = read_loop(reader, outbound, roster, config, observer, addr, &mut state, &mut username).await;

    if let Some(username) = username {
        let fanout = roster.remove(&username);
        for peer in fanout.peers {
            let _ = peer.send(Frame::KeyExchange(KeyExchange {
                username,
                key: PublicKey::TOMBSTONE,
            }));
        }

        observer.on_disconnect(&addr, Some(&username));
    } else {
        observer.on_disconnect(&addr, None);
    }

    outcome
}

#[allow(clippy::too_many_arguments)]
async fn read_loop<R>(
    reader: &mut R,
    outbound: &Outbound,
    roster: &Arc<Roster<Outbound>>,
    config: &Config,
    observer: &dyn Observer,
    addr: SocketAddr,
    state: &mut State,
    username: &mut Option<Username>,
) -> Result<(), SessionError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    loop {
        let mut header_buf = [0u8; HEADER_LEN];
        reader.read_exact(&mut header_buf).await?;
        let header = Header::decode(&header_buf)?;

        let mut payload = vec![0u8; header.kind.payload_len()];
        reader.read_exact(&mut payload).await?;
        let frame = Frame::decode(&header, &payload)?;

        match (*state, frame) {
            (State::Init, Frame::AuthRequest(req)) => {
                let user = req.username.as_str().unwrap_or("").to_string();
                let pass = req.password.as_str().unwrap_or("");

                if config.auth.check(&user, pass) {
                    let displaced = roster.authenticate(req.username, outbound.clone());
                    if displaced {
                        log::warn!("duplicate username displaced prior connection: user={user}");
                    }

                    *username = Some(req.username);
                    *state = State::Authenticated;
                    observer.on_authenticated(&addr, &req.username);

                    send(outbound, Frame::AuthResponse(AuthResponse { status: AuthStatus::Success }))?;
                } else {
                    observer.on_auth_rejected(&addr);
                    send(outbound, Frame::AuthResponse(AuthResponse { status: AuthStatus::Failure }))?;
                    return Err(SessionError::Unauthorized);
                }
            }

            (State::Authenticated, Frame::KeyExchange(req)) => {
                let me = username.expect("state is Authenticated only after username is set");
                let fanout = roster.publish_key(me, req.key)?;

                for (peer_name, peer_key) in fanout.existing_keys {
                    send(outbound, Frame::KeyExchange(KeyExchange { username: peer_name, key: peer_key }))?;
                }

                for peer in fanout.peers {
                    let _ = peer.send(Frame::KeyExchange(KeyExchange { username: me, key: req.key }));
                }

                *state = State::PublicKeySent;
                observer.on_key_exchange(&addr, &me);
            }

            (State::PublicKeySent | State::Chat, Frame::Message(msg)) => {
                let me = username.expect("state implies an authenticated username");

                if msg.sender.trimmed() != me.trimmed() {
                    return Err(SessionError::StateViolation {
                        state: "post-auth",
                        frame: "Message (sender mismatch)",
                    });
                }

                match roster.lookup(&me, &msg.recipient) {
                    Ok(peer) => {
                        observer.on_message_forwarded(&me, &msg.recipient);
                        let _ = peer.send(Frame::Message(msg));
                    }
                    Err(_) => {
                        observer.on_message_dropped(&me, &msg.recipient);
                    }
                }

                *state = State::Chat;
            }

            (_, Frame::Disconnect(Disconnect { reason })) => {
                log::info!("session disconnect requested: addr={addr}, reason={reason:?}");
                return Ok(());
            }

            (_, Frame::MessageAck(MessageAck { .. })) => {
                // Reserved and unused; decodable but never acted on.
            }

            (state, frame) => {
                return Err(SessionError::StateViolation {
                    state: state_name(state),
                    frame: frame_name(frame.kind()),
                });
            }
        }
    }
}

fn send(outbound: &Outbound, frame: Frame) -> Result<(), SessionError> {
    outbound
        .send(frame)
        .map_err(|_| SessionError::Transport(std::io::Error::other("outbound channel closed")))
}

fn state_name(state: State) -> &'static str {
    match state {
        State::Init => "INIT",
        State::Authenticated => "AUTHENTICATED",
        State::PublicKeySent => "PUBLIC_KEY_SENT",
        State::Chat => "CHAT",
    }
}

fn frame_name(kind: FrameKind) -> &'static str {
    match kind {
        FrameKind::AuthRequest => "AuthRequest",
        FrameKind::AuthResponse => "AuthResponse",
        FrameKind::KeyExchange => "KeyExchange",
        FrameKind::Message => "Message",
        FrameKind::MessageAck => "MessageAck",
        FrameKind::Disconnect => "Disconnect",
    }
}
