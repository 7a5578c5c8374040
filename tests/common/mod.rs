//! Shared fixtures for the integration tests: stores that fail on demand,
//! a coordinator harness and a client that drains its outbound queue.

#![allow(dead_code, clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use whiteboard_gateway::coordinator::{ApprovalPolicy, ConnectionHandle, Coordinator, OutboundReceiver};
use whiteboard_gateway::domain::{
    AccountId, Action, ClientEvent, ConnectionId, HistoryLog, Identity, Room, RoomId, ServerEvent,
};
use whiteboard_gateway::error::GatewayError;
use whiteboard_gateway::persistence::{
    HistoryStore, MemoryHistoryStore, MemoryRoomStore, PersistenceStats, RoomStore, StoreError,
};

fn injected() -> StoreError {
    StoreError::Backend("injected failure".to_string())
}

/// History store that fails every call while `failing` is set.
#[derive(Debug, Default)]
pub struct FlakyHistoryStore {
    inner: MemoryHistoryStore,
    failing: AtomicBool,
}

impl FlakyHistoryStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }

    /// Reads the stored log bypassing the failure switch.
    pub async fn stored(&self, room_id: RoomId) -> HistoryLog {
        let Ok(log) = self.inner.read(room_id).await else {
            panic!("memory read failed");
        };
        log
    }
}

impl HistoryStore for FlakyHistoryStore {
    fn init(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>> {
        if self.failing() {
            return async { Err(injected()) }.boxed();
        }
        self.inner.init(room_id)
    }

    fn append(&self, room_id: RoomId, action: Action) -> BoxFuture<'_, Result<(), StoreError>> {
        if self.failing() {
            return async { Err(injected()) }.boxed();
        }
        self.inner.append(room_id, action)
    }

    fn replace_all(
        &self,
        room_id: RoomId,
        actions: Vec<Action>,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        if self.failing() {
            return async { Err(injected()) }.boxed();
        }
        self.inner.replace_all(room_id, actions)
    }

    fn clear(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>> {
        if self.failing() {
            return async { Err(injected()) }.boxed();
        }
        self.inner.clear(room_id)
    }

    fn save_snapshot(
        &self,
        room_id: RoomId,
        snapshot: String,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        if self.failing() {
            return async { Err(injected()) }.boxed();
        }
        self.inner.save_snapshot(room_id, snapshot)
    }

    fn read(&self, room_id: RoomId) -> BoxFuture<'_, Result<HistoryLog, StoreError>> {
        if self.failing() {
            return async { Err(injected()) }.boxed();
        }
        self.inner.read(room_id)
    }

    fn delete(&self, room_id: RoomId) -> BoxFuture<'_, Result<(), StoreError>> {
        if self.failing() {
            return async { Err(injected()) }.boxed();
        }
        self.inner.delete(room_id)
    }
}

/// Room store whose `add_participant` fails while `failing_grants` is set.
///
/// Once attached to a coordinator it also records, for every grant, whether
/// the grantee was already present in the room's live channel.
#[derive(Debug, Default)]
pub struct FlakyRoomStore {
    inner: MemoryRoomStore,
    failing_grants: AtomicBool,
    coordinator: OnceLock<Weak<Coordinator>>,
    grants: Mutex<Vec<(AccountId, bool)>>,
}

impl FlakyRoomStore {
    pub fn set_failing_grants(&self, failing: bool) {
        self.failing_grants.store(failing, Ordering::SeqCst);
    }

    fn attach(&self, coordinator: &Arc<Coordinator>) {
        let _ = self.coordinator.set(Arc::downgrade(coordinator));
    }

    /// For each grant to `account`, whether it was already a channel member.
    pub fn present_at_grant(&self, account: &AccountId) -> Vec<bool> {
        self.grants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(granted, _)| granted == account)
            .map(|(_, present)| *present)
            .collect()
    }
}

impl RoomStore for FlakyRoomStore {
    fn create(
        &self,
        name: Option<String>,
        host: Identity,
        is_public: bool,
    ) -> BoxFuture<'_, Result<Room, StoreError>> {
        self.inner.create(name, host, is_public)
    }

    fn find(&self, room_id: RoomId) -> BoxFuture<'_, Result<Option<Room>, StoreError>> {
        self.inner.find(room_id)
    }

    fn add_participant(
        &self,
        room_id: RoomId,
        account: AccountId,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            if let Some(coordinator) = self.coordinator.get().and_then(Weak::upgrade) {
                let present = coordinator
                    .channel()
                    .members(room_id)
                    .await
                    .iter()
                    .any(|member| member.account_id == account);
                self.grants
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((account.clone(), present));
            }
            if self.failing_grants.load(Ordering::SeqCst) {
                return Err(injected());
            }
            self.inner.add_participant(room_id, account).await
        }
        .boxed()
    }

    fn delete(&self, room_id: RoomId) -> BoxFuture<'_, Result<bool, StoreError>> {
        self.inner.delete(room_id)
    }

    fn list_public(
        &self,
        limit: usize,
        newest_first: bool,
    ) -> BoxFuture<'_, Result<Vec<Room>, StoreError>> {
        self.inner.list_public(limit, newest_first)
    }
}

/// A coordinator wired over flaky in-memory stores.
#[derive(Debug)]
pub struct Harness {
    pub coordinator: Arc<Coordinator>,
    pub rooms: Arc<FlakyRoomStore>,
    pub histories: Arc<FlakyHistoryStore>,
    pub stats: Arc<PersistenceStats>,
}

impl Harness {
    pub fn new(policy: ApprovalPolicy) -> Self {
        let rooms = Arc::new(FlakyRoomStore::default());
        let histories = Arc::new(FlakyHistoryStore::default());
        let stats = Arc::new(PersistenceStats::new());
        let coordinator = Arc::new(Coordinator::new(
            Arc::clone(&rooms) as Arc<dyn RoomStore>,
            Arc::clone(&histories) as Arc<dyn HistoryStore>,
            policy,
            Arc::clone(&stats),
        ));
        rooms.attach(&coordinator);
        Self {
            coordinator,
            rooms,
            histories,
            stats,
        }
    }

    /// Creates a room hosted by `host`.
    pub async fn create_room(&self, host: &Identity) -> Room {
        let Ok(room) = self.rooms.create(Some("Sketches".into()), host.clone(), true).await else {
            panic!("room creation failed");
        };
        room
    }

    /// Grants `account` a durable seat without going through admission.
    pub async fn grant(&self, room_id: RoomId, account: &AccountId) {
        tokio_test::assert_ok!(self.rooms.add_participant(room_id, account.clone()).await);
    }

    pub async fn participants(&self, room_id: RoomId) -> Vec<AccountId> {
        let Ok(Some(room)) = self.rooms.find(room_id).await else {
            panic!("room {room_id} missing");
        };
        room.participants
    }

    pub async fn connect(&self, identity: &Identity) -> Client {
        let (handle, rx) = self.coordinator.connect(identity.clone()).await;
        Client {
            coordinator: Arc::clone(&self.coordinator),
            handle,
            rx,
        }
    }

    /// Connects `identity` and joins it to `room_id` as a participant,
    /// discarding the join traffic.
    pub async fn join(&self, identity: &Identity, room_id: RoomId) -> Client {
        let mut client = self.connect(identity).await;
        client.ok(ClientEvent::JoinRoom { room_id }).await;
        client.drain();
        client
    }
}

/// One live connection and its outbound queue.
#[derive(Debug)]
pub struct Client {
    coordinator: Arc<Coordinator>,
    pub handle: ConnectionHandle,
    pub rx: OutboundReceiver,
}

impl Client {
    pub fn id(&self) -> ConnectionId {
        self.handle.connection_id()
    }

    pub async fn send(&self, event: ClientEvent) -> Result<(), GatewayError> {
        self.coordinator.handle_event(self.id(), event).await
    }

    /// Sends an event that must succeed.
    pub async fn ok(&self, event: ClientEvent) {
        let name = event.name();
        tokio_test::assert_ok!(self.send(event).await, "{} failed", name);
    }

    pub async fn disconnect(&self) {
        self.coordinator.disconnect(self.id()).await;
    }

    /// Takes every event queued so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Takes every queued event and returns their wire names.
    pub fn names(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(ServerEvent::name).collect()
    }
}

pub fn identity(account: &str) -> Identity {
    let mut name = account.to_string();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    Identity::new(account, name)
}

pub fn action(n: u64) -> Action {
    Action::new(serde_json::json!({ "tool": "pen", "seq": n, "points": [[n, n]] }))
}
