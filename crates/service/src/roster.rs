use std::fmt;
use std::ops::{Deref, DerefMut};

use ahash::HashMap;
use codec::{PublicKey, Username};
use parking_lot::RwLock;

/// A `HashMap` newtype that pre-allocates a sensible starting capacity,
/// mirroring the teacher's session table.
#[derive(Debug)]
struct Table<K, V>(HashMap<K, V>);

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self(HashMap::with_capacity_and_hasher(64, Default::default()))
    }
}

impl<K, V> Deref for Table<K, V> {
    type Target = HashMap<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K, V> DerefMut for Table<K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

struct Entry<O> {
    outbound: O,
    key: Option<PublicKey>,
}

#[derive(Debug)]
pub enum RosterError {
    UnknownRecipient,
    NotAuthenticated,
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRecipient => write!(f, "recipient is not on the roster"),
            Self::NotAuthenticated => write!(f, "sender is not authenticated"),
        }
    }
}

impl std::error::Error for RosterError {}

/// What the caller must do after a participant publishes a key: hand the
/// joiner the keys already on the roster, and hand the joiner's key to
/// everyone already on the roster.
///
/// Mirrors the shape of the teacher's `ForwardResult`/`Outbound` split: the
/// roster computes *what* should happen under lock, the caller performs the
/// actual writes once the lock is released.
pub struct JoinFanout<O> {
    /// Keys already published by other participants, to send to the joiner.
    pub existing_keys: Vec<(Username, PublicKey)>,
    /// Outbound handles of other participants, to receive the joiner's key.
    pub peers: Vec<O>,
}

/// What the caller must do after a participant leaves: send a tombstone
/// `KeyExchange` to everyone still on the roster.
pub struct LeaveFanout<O> {
    pub peers: Vec<O>,
}

/// The authoritative `username -> {outbound handle, public key}` table.
///
/// `O` is the caller's outbound handle type (e.g. an unbounded channel
/// sender). It is cloned to notify multiple peers, so callers typically pick
/// something cheap to clone, like `tokio::sync::mpsc::UnboundedSender<T>`.
pub struct Roster<O> {
    table: RwLock<Table<Username, Entry<O>>>,
}

impl<O> Default for Roster<O> {
    fn default() -> Self {
        Self {
            table: RwLock::new(Table::default()),
        }
    }
}

impl<O: Clone> Roster<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly authenticated connection under `username`, storing
    /// `outbound` for later fan-out. If the username was already present the
    /// prior entry is silently displaced (its connection will find out on
    /// its next write), matching the original implementation's behavior;
    /// the caller is expected to log a warning when `displaced` is `true`.
    pub fn authenticate(&self, username: Username, outbound: O) -> bool {
        let mut table = self.table.write();

        let displaced = table
            .insert(
                username,
                Entry {
                    outbound,
                    key: None,
                },
            )
            .is_some();

        displaced
    }

    /// Publishes `username`'s public key and computes the two-pass join
    /// broadcast: existing keys to send to the joiner (only from peers who
    /// have themselves published a key), and the joiner's key to send to
    /// every other roster member (every entry in the table is, by
    /// construction, already authenticated — a strictly lower bar than
    /// "has published a key").
    ///
    /// Returns `Err(NotAuthenticated)` if `username` has no roster entry.
    pub fn publish_key(&self, username: Username, key: PublicKey) -> Result<JoinFanout<O>, RosterError> {
        let mut table = self.table.write();

        if !table.contains_key(&username) {
            return Err(RosterError::NotAuthenticated);
        }

        let existing_keys: Vec<(Username, PublicKey)> = table
            .iter()
            .filter(|(name, entry)| **name != username && entry.key.is_some())
            .map(|(name, entry)| (*name, entry.key.unwrap()))
            .collect();

        let peers: Vec<O> = table
            .iter()
            .filter(|(name, _)| **name != username)
            .map(|(_, entry)| entry.outbound.clone())
            .collect();

        let entry = table.get_mut(&username).expect("checked above");
        entry.key = Some(key);

        Ok(JoinFanout { existing_keys, peers })
    }

    /// Looks up the outbound handle for the authenticated `sender`'s
    /// declared `recipient`. A participant counts as reachable only once it
    /// has published a key (the roster's proxy for having reached
    /// `PUBLIC_KEY_SENT`/`CHAT`, since neither endpoint tracks per-entry
    /// state beyond key presence). Returns `NotAuthenticated` if the sender
    /// has not published a key, or `UnknownRecipient` if the recipient does
    /// not exist or has not published one either.
    pub fn lookup(&self, sender: &Username, recipient: &Username) -> Result<O, RosterError> {
        let table = self.table.read();

        match table.get(sender) {
            Some(entry) if entry.key.is_some() => {}
            _ => return Err(RosterError::NotAuthenticated),
        }

        table
            .get(recipient)
            .filter(|entry| entry.key.is_some())
            .map(|entry| entry.outbound.clone())
            .ok_or(RosterError::UnknownRecipient)
    }

    /// Removes `username` from the roster and returns the outbound handles
    /// of everyone remaining, so the caller can fan out a tombstone
    /// `KeyExchange`.
    pub fn remove(&self, username: &Username) -> LeaveFanout<O> {
        let mut table = self.table.write();
        table.remove(username);

        let peers = table.values().map(|entry| entry.outbound.clone()).collect();

        LeaveFanout { peers }
    }

    pub fn contains(&self, username: &Username) -> bool {
        self.table.read().contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}
