//! End-to-end scenarios driven over real TLS sockets against an in-process
//! server, the way the teacher's own integration suite starts its server
//! crate directly and talks raw frames at it rather than shelling out to a
//! binary.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use chat_relay_client::{crypto::Keypair, tls as client_tls};
use chat_relay_server::{config::Config, observer::LogObserver};
use codec::{
    AuthRequest, AuthResponse, AuthStatus, Disconnect, DisconnectReason, Frame, FrameKind, Header,
    KeyExchange, Message, Password, PublicKey, Username, HEADER_LEN,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_rustls::{client::TlsStream, rustls::pki_types::ServerName};

async fn start_server(addr: SocketAddr, auth: HashMap<String, String>) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.listen = addr;
    config.tls.certificate_chain = dir.path().join("cert.pem").display().to_string();
    config.tls.private_key = dir.path().join("key.pem").display().to_string();
    config.auth.static_credentials = auth;

    tokio::spawn(async move {
        // Held for the process lifetime of the test; tempdir must outlive
        // the server task using its cert/key paths.
        let _dir = dir;
        let _ = chat_relay_server::startup(Arc::new(config), Arc::new(LogObserver)).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
}

async fn connect(addr: SocketAddr) -> TlsStream<TcpStream> {
    let tcp = TcpStream::connect(addr).await.unwrap();
    let connector = client_tls::connector(None).unwrap();
    let name = ServerName::try_from("localhost".to_string()).unwrap();
    connector.connect(name, tcp).await.unwrap()
}

async fn send(stream: &mut TlsStream<TcpStream>, frame: Frame) {
    stream.write_all(&frame.encode(0)).await.unwrap();
}

async fn recv(stream: &mut TlsStream<TcpStream>) -> Frame {
    let mut header_buf = [0u8; HEADER_LEN];
    stream.read_exact(&mut header_buf).await.unwrap();
    let header = Header::decode(&header_buf).unwrap();

    let mut payload = vec![0u8; header.kind.payload_len()];
    stream.read_exact(&mut payload).await.unwrap();
    Frame::decode(&header, &payload).unwrap()
}

async fn authenticate(stream: &mut TlsStream<TcpStream>, username: &str, password: &str) -> AuthStatus {
    send(
        stream,
        Frame::AuthRequest(AuthRequest { username: Username::new(username), password: Password::new(password) }),
    )
    .await;

    match recv(stream).await {
        Frame::AuthResponse(AuthResponse { status }) => status,
        other => panic!("expected AuthResponse, got {:?}", other.kind()),
    }
}

async fn publish_key(stream: &mut TlsStream<TcpStream>, username: &str, key: PublicKey) {
    send(stream, Frame::KeyExchange(KeyExchange { username: Username::new(username), key })).await;
}

#[tokio::test]
async fn two_party_happy_path_forwards_an_encrypted_message() {
    let addr: SocketAddr = "127.0.0.1:18081".parse().unwrap();
    start_server(addr, HashMap::new()).await;

    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    assert_eq!(authenticate(&mut alice, "alice", "anything").await, AuthStatus::Success);
    assert_eq!(authenticate(&mut bob, "bob", "anything").await, AuthStatus::Success);

    let alice_keys = Keypair::generate().unwrap();
    let bob_keys = Keypair::generate().unwrap();

    publish_key(&mut alice, "alice", alice_keys.public_wire()).await;
    // Alice was first, so her join fanout is empty; she gets nothing yet.

    publish_key(&mut bob, "bob", bob_keys.public_wire()).await;
    // Bob's join fanout hands him alice's key, and hands alice bob's key.

    match recv(&mut bob).await {
        Frame::KeyExchange(KeyExchange { username, key }) => {
            assert_eq!(username.as_str().unwrap(), "alice");
            assert_eq!(key.der(), alice_keys.public_wire().der());
        }
        other => panic!("expected KeyExchange, got {:?}", other.kind()),
    }

    match recv(&mut alice).await {
        Frame::KeyExchange(KeyExchange { username, key }) => {
            assert_eq!(username.as_str().unwrap(), "bob");
            assert_eq!(key.der(), bob_keys.public_wire().der());
        }
        other => panic!("expected KeyExchange, got {:?}", other.kind()),
    }

    let ciphertext = chat_relay_client::crypto::encrypt_to(bob_keys.public_wire().der(), b"hello bob").unwrap();
    let message = Message::new(1, Username::new("alice"), Username::new("bob"), &ciphertext).unwrap();
    send(&mut alice, Frame::Message(message)).await;

    match recv(&mut bob).await {
        Frame::Message(message) => {
            let plaintext = bob_keys.decrypt(message.ciphertext()).unwrap();
            assert_eq!(plaintext, b"hello bob");
        }
        other => panic!("expected Message, got {:?}", other.kind()),
    }
}

#[tokio::test]
async fn bad_credentials_are_rejected_and_connection_is_closed() {
    let addr: SocketAddr = "127.0.0.1:18082".parse().unwrap();
    let mut creds = HashMap::new();
    creds.insert("alice".to_string(), "correct-horse".to_string());
    start_server(addr, creds).await;

    let mut stream = connect(addr).await;
    assert_eq!(authenticate(&mut stream, "alice", "wrong").await, AuthStatus::Failure);

    // The server tears the connection down after a rejected AuthRequest.
    let mut buf = [0u8; 1];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "expected EOF after rejected auth");
}

#[tokio::test]
async fn departing_peer_is_announced_with_a_tombstone() {
    let addr: SocketAddr = "127.0.0.1:18083".parse().unwrap();
    start_server(addr, HashMap::new()).await;

    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    authenticate(&mut alice, "alice", "x").await;
    authenticate(&mut bob, "bob", "x").await;

    let alice_keys = Keypair::generate().unwrap();
    let bob_keys = Keypair::generate().unwrap();
    publish_key(&mut alice, "alice", alice_keys.public_wire()).await;
    publish_key(&mut bob, "bob", bob_keys.public_wire()).await;

    // bob's join fanout: alice gets bob's key, bob gets alice's key.
    let _ = recv(&mut alice).await;
    let _ = recv(&mut bob).await;

    send(&mut alice, Frame::Disconnect(Disconnect { reason: DisconnectReason::User })).await;

    match recv(&mut bob).await {
        Frame::KeyExchange(KeyExchange { username, key }) => {
            assert_eq!(username.as_str().unwrap(), "alice");
            assert!(key.is_tombstone());
        }
        other => panic!("expected tombstone KeyExchange, got {:?}", other.kind()),
    }
}

#[tokio::test]
async fn unknown_frame_type_closes_the_connection() {
    let addr: SocketAddr = "127.0.0.1:18084".parse().unwrap();
    start_server(addr, HashMap::new()).await;

    let mut stream = connect(addr).await;

    let header = Header::new(FrameKind::Disconnect, 1, 0);
    let mut bytes = header.encode().to_vec();
    bytes[1] = 0x09; // not a valid frame type
    bytes.push(0x00);
    stream.write_all(&bytes).await.unwrap();

    let mut buf = [0u8; 1];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "expected the server to close the connection on an undecodable header");
}

#[tokio::test]
async fn message_with_spoofed_sender_closes_the_connection() {
    let addr: SocketAddr = "127.0.0.1:18086".parse().unwrap();
    start_server(addr, HashMap::new()).await;

    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    authenticate(&mut alice, "alice", "x").await;
    authenticate(&mut bob, "bob", "x").await;

    let alice_keys = Keypair::generate().unwrap();
    let bob_keys = Keypair::generate().unwrap();
    publish_key(&mut alice, "alice", alice_keys.public_wire()).await;
    publish_key(&mut bob, "bob", bob_keys.public_wire()).await;

    // bob's join fanout: alice gets bob's key, bob gets alice's key.
    let _ = recv(&mut alice).await;
    let _ = recv(&mut bob).await;

    // alice's connection claims to be sending as bob.
    let ciphertext = chat_relay_client::crypto::encrypt_to(bob_keys.public_wire().der(), b"spoofed").unwrap();
    let message = Message::new(1, Username::new("bob"), Username::new("bob"), &ciphertext).unwrap();
    send(&mut alice, Frame::Message(message)).await;

    let mut buf = [0u8; 1];
    let n = alice.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "expected the server to close alice's connection on a sender mismatch");
}

#[tokio::test]
async fn three_way_join_hands_the_newcomer_every_existing_key() {
    let addr: SocketAddr = "127.0.0.1:18085".parse().unwrap();
    start_server(addr, HashMap::new()).await;

    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    let mut carol = connect(addr).await;

    authenticate(&mut alice, "alice", "x").await;
    authenticate(&mut bob, "bob", "x").await;
    authenticate(&mut carol, "carol", "x").await;

    let alice_keys = Keypair::generate().unwrap();
    let bob_keys = Keypair::generate().unwrap();
    let carol_keys = Keypair::generate().unwrap();

    publish_key(&mut alice, "alice", alice_keys.public_wire()).await;
    publish_key(&mut bob, "bob", bob_keys.public_wire()).await;

    // bob's join: alice is handed bob's key, bob is handed alice's key.
    let _ = recv(&mut alice).await;
    let _ = recv(&mut bob).await;

    publish_key(&mut carol, "carol", carol_keys.public_wire()).await;

    // carol's join fanout hands her both existing keys, in some order.
    let mut seen = Vec::new();
    for _ in 0..2 {
        match recv(&mut carol).await {
            Frame::KeyExchange(KeyExchange { username, .. }) => {
                seen.push(username.as_str().unwrap().to_string());
            }
            other => panic!("expected KeyExchange, got {:?}", other.kind()),
        }
    }
    seen.sort();
    assert_eq!(seen, vec!["alice".to_string(), "bob".to_string()]);

    // alice and bob are each handed carol's key.
    match recv(&mut alice).await {
        Frame::KeyExchange(KeyExchange { username, .. }) => assert_eq!(username.as_str().unwrap(), "carol"),
        other => panic!("expected KeyExchange, got {:?}", other.kind()),
    }
    match recv(&mut bob).await {
        Frame::KeyExchange(KeyExchange { username, .. }) => assert_eq!(username.as_str().unwrap(), "carol"),
        other => panic!("expected KeyExchange, got {:?}", other.kind()),
    }
}
