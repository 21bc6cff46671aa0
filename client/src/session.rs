//! Client-side session: the state machine, the peer directory, and the
//! inbound/outbound dispatch loop.
//!
//! One task owns the whole session and drives both directions with
//! `tokio::select!`, combining frames off the TLS stream with lines off a
//! background stdin-reading thread (see [`crate::ui`]). There is no writer
//! task as there is on the server: a client only ever has itself to write
//! to, so the half is just held across loop iterations.

use std::{collections::HashMap, time::{SystemTime, UNIX_EPOCH}};

use codec::{
    AuthRequest, AuthResponse, AuthStatus, Disconnect, DisconnectReason, Frame, FrameKind, Header,
    KeyExchange, Message, Password, PublicKey, Username, HEADER_LEN,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    crypto::{self, Keypair},
    error::ClientError,
    ui,
};

/// Mirrors the distilled client state machine. `AuthReqSend` collapses into
/// the connect step itself, the way the server collapses `AUTH_REQ_RECVD`:
/// there is nothing observable between sending the request and reading the
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Authenticated,
    PublicKeySent,
    PublicKeyRecvd,
    Chat,
}

/// Published keys of the other participants, keyed by trimmed username.
/// A tombstoned [`KeyExchange`] removes the entry.
#[derive(Default)]
struct Directory(HashMap<String, PublicKey>);

impl Directory {
    fn apply(&mut self, username: Username, key: PublicKey) -> bool {
        let name = username.as_str().unwrap_or("?").to_string();

        if key.is_tombstone() {
            self.0.remove(&name);
            false
        } else {
            self.0.insert(name, key);
            true
        }
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.keys().cloned().collect();
        names.sort();
        names
    }

    fn key(&self, name: &str) -> Option<&PublicKey> {
        self.0.get(name)
    }
}

/// Runs one client session to completion: authenticates, publishes our
/// public key, then dispatches inbound frames and stdin commands until the
/// user quits, the server disconnects us, or the connection fails.
pub async fn run<S>(stream: S, username: &str, password: &str, keypair: &Keypair) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let wire_username = Username::new(username);
    write_frame(
        &mut writer,
        Frame::AuthRequest(AuthRequest { username: wire_username, password: Password::new(password) }),
    )
    .await?;

    match read_frame(&mut reader).await? {
        Frame::AuthResponse(AuthResponse { status: AuthStatus::Success }) => {}
        Frame::AuthResponse(AuthResponse { status: AuthStatus::Failure }) => {
            return Err(ClientError::AuthRejected);
        }
        other => {
            return Err(ClientError::StateViolation { state: "INIT", frame: frame_name(other.kind()) });
        }
    }

    log::info!("authenticated as {username}");
    let mut state = State::Authenticated;

    write_frame(
        &mut writer,
        Frame::KeyExchange(KeyExchange { username: wire_username, key: keypair.public_wire() }),
    )
    .await?;
    state = State::PublicKeySent;

    let mut directory = Directory::default();
    let mut recipient: Option<String> = None;
    let mut stdin_rx = ui::spawn_stdin_reader();

    ui::print_help();

    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => {
                match frame {
                    Ok(frame) => {
                        if !dispatch_inbound(frame, &mut directory, &mut state, keypair) {
                            break;
                        }
                    }
                    Err(ClientError::Transport(_)) => break,
                    Err(e) => return Err(e),
                }
            }

            line = stdin_rx.recv() => {
                match line {
                    Some(line) => {
                        if !handle_command(&line, &mut recipient, &directory, &mut writer, wire_username).await? {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }

        // A peer leaving mid-chat must knock the picker loose: the
        // recipient we had selected is gone, so the outbound prompt has
        // nothing left to send to.
        if let Some(name) = &recipient {
            if directory.key(name).is_none() {
                println!("{name} is no longer available, back to the picker");
                recipient = None;
            }
        }
    }

    let _ = write_frame(&mut writer, Frame::Disconnect(Disconnect { reason: DisconnectReason::User })).await;

    Ok(())
}

/// Applies one inbound frame. Returns `false` when the session should end.
fn dispatch_inbound(frame: Frame, directory: &mut Directory, state: &mut State, keypair: &Keypair) -> bool {
    match frame {
        Frame::KeyExchange(KeyExchange { username, key }) => {
            let name = username.as_str().unwrap_or("?").to_string();

            if key.is_tombstone() {
                directory.apply(username, key);
                println!("{name} left");
            } else {
                let is_new = directory.apply(username, key);
                println!("{name} {}", if is_new { "joined" } else { "updated their key" });
            }

            // Any key-exchange event — join, rekey, or tombstone — hands
            // the session back to PUBLIC_KEY_RECVD per the protocol's
            // CHAT <-> PUBLIC_KEY_RECVD cycle; sending the next message is
            // what moves it back to CHAT.
            *state = State::PublicKeyRecvd;

            true
        }

        Frame::Message(message) => {
            match keypair.decrypt(message.ciphertext()) {
                Ok(plaintext) => {
                    let sender = message.sender.as_str().unwrap_or("?");
                    let text = String::from_utf8_lossy(&plaintext);
                    println!("{sender}: {text}");
                }
                Err(e) => {
                    log::warn!("dropping undecryptable message: err={e}");
                }
            }

            *state = State::Chat;
            true
        }

        Frame::Disconnect(Disconnect { reason }) => {
            log::info!("server closed the session: reason={reason:?}");
            false
        }

        Frame::MessageAck(_) => true,

        Frame::AuthRequest(_) | Frame::AuthResponse(_) => {
            log::warn!("unexpected frame after authentication, disconnecting: frame={:?}", frame.kind());
            false
        }
    }
}

/// Interprets one line of stdin input. Returns `false` on `/quit`.
async fn handle_command<W>(
    line: &str,
    recipient: &mut Option<String>,
    directory: &Directory,
    writer: &mut W,
    me: Username,
) -> Result<bool, ClientError>
where
    W: AsyncWrite + Unpin,
{
    let line = line.trim();

    if line.is_empty() {
        return Ok(true);
    }

    if line == "/quit" {
        return Ok(false);
    }

    if line == "/list" {
        ui::display_participants(&directory.names());
        return Ok(true);
    }

    if let Some(name) = line.strip_prefix("/to ") {
        let name = name.trim().to_string();
        if directory.key(&name).is_some() {
            println!("now talking to {name}");
            *recipient = Some(name);
        } else {
            println!("{name} has not published a key yet");
        }
        return Ok(true);
    }

    let Some(name) = recipient.clone() else {
        println!("pick a recipient first: /to <name>");
        return Ok(true);
    };

    let Some(peer_key) = directory.key(&name) else {
        println!("{name} is no longer available");
        *recipient = None;
        return Ok(true);
    };

    if line.len() > crypto::MAX_PLAINTEXT_LEN {
        println!("message too long: max {} bytes per message", crypto::MAX_PLAINTEXT_LEN);
        return Ok(true);
    }

    let ciphertext = crypto::encrypt_to(peer_key.der(), line.as_bytes())?;
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as u32).unwrap_or(0);

    let Some(message) = Message::new(timestamp, me, Username::new(&name), &ciphertext) else {
        println!("encrypted payload does not fit a single frame");
        return Ok(true);
    };

    write_frame(writer, Frame::Message(message)).await?;

    Ok(true)
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: Frame) -> Result<(), ClientError> {
    writer.write_all(&frame.encode(0)).await?;
    Ok(())
}

async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, ClientError> {
    let mut header_buf = [0u8; HEADER_LEN];
    reader.read_exact(&mut header_buf).await?;
    let header = Header::decode(&header_buf)?;

    let mut payload = vec![0u8; header.kind.payload_len()];
    reader.read_exact(&mut payload).await?;
    Ok(Frame::decode(&header, &payload)?)
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
