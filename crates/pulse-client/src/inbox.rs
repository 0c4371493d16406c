//! Client-side inbox state: the merged feed, optimistic read states and the
//! compose draft. Pure data; all I/O lives in the driver.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use pulse_types::models::{BroadcastView, Category, DirectMessage, Role};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Direct(Uuid),
    Broadcast(Uuid),
}

/// Per-item read state as displayed. `PendingAck` is entered on tap, before
/// the server has confirmed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Unseen,
    PendingAck,
    Read,
}

/// Whether the caller's role received the item or sent it. Outgoing direct
/// messages show the receiving role's read flag and cannot be acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxItem {
    pub key: ItemKey,
    pub direction: Direction,
    pub body: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub state: ReadState,
    /// Set after a failed acknowledgement so the view can offer a retry.
    pub retry_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    Loading,
    Ready,
    /// Listing failed. Items from the last good refresh are kept.
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Direct,
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeStatus {
    Idle,
    Sending,
    Failed { message: String, outcome_unknown: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compose {
    pub channel: Channel,
    pub draft: String,
    pub category: Category,
    pub status: ComposeStatus,
}

/// One consistent read of both channels plus the server's unread count.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub direct: Vec<DirectMessage>,
    pub broadcasts: Vec<BroadcastView>,
    pub unread: u64,
}

pub struct Inbox {
    role: Role,
    broadcasts: Vec<InboxItem>,
    direct: Vec<InboxItem>,
    status: FeedStatus,
    compose: Compose,
    /// Text submitted by the send in flight.
    sending: Option<String>,
}

impl Inbox {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            broadcasts: Vec::new(),
            direct: Vec::new(),
            status: FeedStatus::Idle,
            compose: Compose {
                channel: Channel::Direct,
                draft: String::new(),
                category: Category::Info,
                status: ComposeStatus::Idle,
            },
            sending: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    pub fn compose(&self) -> &Compose {
        &self.compose
    }

    /// Broadcasts first, as their own group, then direct messages. Each
    /// group is newest first.
    pub fn feed(&self) -> impl Iterator<Item = &InboxItem> {
        self.broadcasts.iter().chain(self.direct.iter())
    }

    pub fn item(&self, key: ItemKey) -> Option<&InboxItem> {
        self.feed().find(|i| i.key == key)
    }

    fn item_mut(&mut self, key: ItemKey) -> Option<&mut InboxItem> {
        self.broadcasts
            .iter_mut()
            .chain(self.direct.iter_mut())
            .find(|i| i.key == key)
    }

    /// Incoming items still shown as unseen. Items awaiting acknowledgement
    /// are already displayed as read.
    pub fn unread_count(&self) -> usize {
        self.feed()
            .filter(|i| i.direction == Direction::Incoming && i.state == ReadState::Unseen)
            .count()
    }

    pub fn has_pending_acks(&self) -> bool {
        self.feed().any(|i| i.state == ReadState::PendingAck)
    }

    // -- Refresh --

    pub fn begin_refresh(&mut self) {
        self.status = FeedStatus::Loading;
    }

    /// Replace the feed with server truth. A server `read` always wins;
    /// otherwise a local `PendingAck` or retry flag carries over.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let previous: HashMap<ItemKey, (ReadState, bool)> = self
            .feed()
            .map(|i| (i.key, (i.state, i.retry_available)))
            .collect();

        let carry = |key: ItemKey, server_read: bool| -> (ReadState, bool) {
            if server_read {
                return (ReadState::Read, false);
            }
            match previous.get(&key) {
                // Read is only ever set from a server confirmation
                Some((ReadState::Read, _)) => (ReadState::Read, false),
                Some((ReadState::PendingAck, _)) => (ReadState::PendingAck, false),
                Some((ReadState::Unseen, retry)) => (ReadState::Unseen, *retry),
                None => (ReadState::Unseen, false),
            }
        };

        let mut broadcasts: Vec<InboxItem> = snapshot
            .broadcasts
            .into_iter()
            .map(|view| {
                let key = ItemKey::Broadcast(view.broadcast.id);
                let (state, retry_available) = carry(key, view.is_read);
                InboxItem {
                    key,
                    direction: Direction::Incoming,
                    body: view.broadcast.body,
                    category: view.broadcast.category,
                    created_at: view.broadcast.created_at,
                    state,
                    retry_available,
                }
            })
            .collect();

        let role = self.role;
        let mut direct: Vec<InboxItem> = snapshot
            .direct
            .into_iter()
            .map(|m| {
                let key = ItemKey::Direct(m.id);
                let direction = if m.is_addressed_to(role) {
                    Direction::Incoming
                } else {
                    Direction::Outgoing
                };
                let (state, retry_available) = match direction {
                    Direction::Incoming => carry(key, m.read),
                    Direction::Outgoing if m.read => (ReadState::Read, false),
                    Direction::Outgoing => (ReadState::Unseen, false),
                };
                InboxItem {
                    key,
                    direction,
                    body: m.body,
                    category: m.category,
                    created_at: m.created_at,
                    state,
                    retry_available,
                }
            })
            .collect();

        // Server order is authoritative within a channel, but nothing
        // guarantees it across implementations.
        broadcasts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        direct.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.broadcasts = broadcasts;
        self.direct = direct;
        self.status = FeedStatus::Ready;

        if !self.has_pending_acks() && self.unread_count() as u64 != snapshot.unread {
            debug!(
                "Local unread {} differs from server count {}",
                self.unread_count(),
                snapshot.unread
            );
        }
    }

    pub fn refresh_failed(&mut self, err: &ClientError) {
        self.status = FeedStatus::Failed {
            message: err.to_string(),
        };
    }

    // -- Acknowledgement --

    /// Tap an item. Returns true if a mark-read request must be issued.
    pub fn begin_ack(&mut self, key: ItemKey) -> bool {
        match self.item_mut(key) {
            Some(item) if item.direction == Direction::Incoming && item.state == ReadState::Unseen => {
                item.state = ReadState::PendingAck;
                item.retry_available = false;
                true
            }
            _ => false,
        }
    }

    /// Settle an acknowledgement. Failure reverts to `Unseen`; an item the
    /// server has meanwhile reported read stays read.
    pub fn resolve_ack(&mut self, key: ItemKey, result: Result<(), &ClientError>) {
        let Some(item) = self.item_mut(key) else {
            return;
        };
        if item.state != ReadState::PendingAck {
            return;
        }
        match result {
            Ok(()) => item.state = ReadState::Read,
            Err(e) => {
                debug!("Acknowledgement of {:?} failed: {}", key, e);
                item.state = ReadState::Unseen;
                item.retry_available = true;
            }
        }
    }

    // -- Compose --

    pub fn edit_draft(&mut self, channel: Channel, draft: String, category: Category) {
        self.compose.channel = channel;
        self.compose.draft = draft;
        self.compose.category = category;
        if matches!(self.compose.status, ComposeStatus::Failed { .. }) {
            self.compose.status = ComposeStatus::Idle;
        }
    }

    /// Start sending the current draft. Returns what to send, or `None` if
    /// the draft is blank or a send is already in flight.
    pub fn begin_send(&mut self) -> Option<(Channel, String, Category)> {
        if self.sending.is_some() || self.compose.draft.trim().is_empty() {
            return None;
        }
        let body = self.compose.draft.clone();
        self.sending = Some(body.clone());
        self.compose.status = ComposeStatus::Sending;
        Some((self.compose.channel, body, self.compose.category))
    }

    /// Settle a send. The draft is cleared only on confirmed success, and
    /// only if it was not edited while the send was in flight.
    pub fn resolve_send(&mut self, result: Result<(), &ClientError>) {
        let sent = self.sending.take();
        match result {
            Ok(()) => {
                if sent.as_deref() == Some(self.compose.draft.as_str()) {
                    self.compose.draft.clear();
                }
                self.compose.status = ComposeStatus::Idle;
            }
            Err(e) => {
                self.compose.status = ComposeStatus::Failed {
                    message: e.to_string(),
                    outcome_unknown: e.is_outcome_unknown(),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pulse_types::error::ErrorKind;
    use pulse_types::models::Broadcast;

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 9, minute, 0).unwrap()
    }

    fn direct(sender_role: Role, minute: u32, read: bool) -> DirectMessage {
        DirectMessage {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            sender_role,
            target_role: sender_role.opposite(),
            body: format!("direct at {}", minute),
            category: Category::Info,
            created_at: at(minute),
            read,
        }
    }

    fn broadcast(minute: u32, is_read: bool) -> BroadcastView {
        BroadcastView {
            broadcast: Broadcast {
                id: Uuid::new_v4(),
                author_id: Uuid::new_v4(),
                body: format!("broadcast at {}", minute),
                category: Category::Warning,
                created_at: at(minute),
            },
            is_read,
            read_at: None,
        }
    }

    fn snapshot(direct: Vec<DirectMessage>, broadcasts: Vec<BroadcastView>) -> Snapshot {
        let unread = direct.iter().filter(|m| m.target_role == Role::Standard && !m.read).count()
            + broadcasts.iter().filter(|b| !b.is_read).count();
        Snapshot {
            direct,
            broadcasts,
            unread: unread as u64,
        }
    }

    fn rejected() -> ClientError {
        ClientError::Rejected {
            kind: ErrorKind::Internal,
            message: "boom".into(),
        }
    }

    #[test]
    fn broadcasts_are_grouped_ahead_of_direct_messages() {
        let mut inbox = Inbox::new(Role::Standard);
        let late_direct = direct(Role::Admin, 50, false);
        let early_broadcast = broadcast(5, false);
        let late_broadcast = broadcast(30, false);
        inbox.apply_snapshot(snapshot(
            vec![direct(Role::Admin, 10, false), late_direct.clone()],
            vec![early_broadcast.clone(), late_broadcast.clone()],
        ));

        let keys: Vec<ItemKey> = inbox.feed().map(|i| i.key).collect();
        assert_eq!(keys[0], ItemKey::Broadcast(late_broadcast.broadcast.id));
        assert_eq!(keys[1], ItemKey::Broadcast(early_broadcast.broadcast.id));
        assert_eq!(keys[2], ItemKey::Direct(late_direct.id));
        assert_eq!(inbox.status(), &FeedStatus::Ready);
        assert_eq!(inbox.unread_count(), 4);
    }

    #[test]
    fn outgoing_messages_are_not_unread_or_tappable() {
        let mut inbox = Inbox::new(Role::Standard);
        let mine = direct(Role::Standard, 1, false);
        inbox.apply_snapshot(snapshot(vec![mine.clone()], vec![]));

        let item = inbox.item(ItemKey::Direct(mine.id)).unwrap();
        assert_eq!(item.direction, Direction::Outgoing);
        assert_eq!(inbox.unread_count(), 0);
        assert!(!inbox.begin_ack(ItemKey::Direct(mine.id)));
    }

    #[test]
    fn ack_success_moves_to_read() {
        let mut inbox = Inbox::new(Role::Standard);
        let b = broadcast(1, false);
        let key = ItemKey::Broadcast(b.broadcast.id);
        inbox.apply_snapshot(snapshot(vec![], vec![b]));

        assert!(inbox.begin_ack(key));
        assert_eq!(inbox.item(key).unwrap().state, ReadState::PendingAck);
        assert_eq!(inbox.unread_count(), 0);
        // A second tap while pending issues nothing
        assert!(!inbox.begin_ack(key));

        inbox.resolve_ack(key, Ok(()));
        assert_eq!(inbox.item(key).unwrap().state, ReadState::Read);
    }

    #[test]
    fn ack_failure_reverts_and_offers_retry() {
        let mut inbox = Inbox::new(Role::Standard);
        let m = direct(Role::Admin, 1, false);
        let key = ItemKey::Direct(m.id);
        inbox.apply_snapshot(snapshot(vec![m.clone()], vec![]));

        inbox.begin_ack(key);
        inbox.resolve_ack(key, Err(&rejected()));
        let item = inbox.item(key).unwrap();
        assert_eq!(item.state, ReadState::Unseen);
        assert!(item.retry_available);
        assert_eq!(inbox.unread_count(), 1);

        // Retry flag survives a refresh that still reports unread
        inbox.apply_snapshot(snapshot(vec![m], vec![]));
        assert!(inbox.item(key).unwrap().retry_available);

        assert!(inbox.begin_ack(key));
    }

    #[test]
    fn refresh_keeps_pending_ack_until_server_reports_read() {
        let mut inbox = Inbox::new(Role::Standard);
        let m = direct(Role::Admin, 1, false);
        let key = ItemKey::Direct(m.id);
        inbox.apply_snapshot(snapshot(vec![m.clone()], vec![]));
        inbox.begin_ack(key);

        inbox.apply_snapshot(snapshot(vec![m.clone()], vec![]));
        assert_eq!(inbox.item(key).unwrap().state, ReadState::PendingAck);

        // Another standard account flipped the shared flag
        inbox.apply_snapshot(snapshot(vec![DirectMessage { read: true, ..m }], vec![]));
        assert_eq!(inbox.item(key).unwrap().state, ReadState::Read);

        // A late failure must not regress a server-confirmed read
        inbox.resolve_ack(key, Err(&ClientError::Timeout));
        assert_eq!(inbox.item(key).unwrap().state, ReadState::Read);
    }

    #[test]
    fn failed_refresh_keeps_items() {
        let mut inbox = Inbox::new(Role::Standard);
        inbox.apply_snapshot(snapshot(vec![direct(Role::Admin, 1, false)], vec![broadcast(2, false)]));

        inbox.begin_refresh();
        inbox.refresh_failed(&ClientError::Connect("refused".into()));
        assert!(matches!(inbox.status(), FeedStatus::Failed { .. }));
        assert_eq!(inbox.feed().count(), 2);
    }

    #[test]
    fn draft_survives_failed_send() {
        let mut inbox = Inbox::new(Role::Admin);
        inbox.edit_draft(Channel::Broadcast, "Maintenance tonight".into(), Category::Warning);

        let (channel, body, category) = inbox.begin_send().unwrap();
        assert_eq!((channel, body.as_str(), category), (Channel::Broadcast, "Maintenance tonight", Category::Warning));
        assert!(inbox.begin_send().is_none());

        inbox.resolve_send(Err(&ClientError::Timeout));
        assert_eq!(inbox.compose().draft, "Maintenance tonight");
        assert_eq!(
            inbox.compose().status,
            ComposeStatus::Failed {
                message: "request timed out".into(),
                outcome_unknown: true
            }
        );

        inbox.begin_send().unwrap();
        inbox.resolve_send(Ok(()));
        assert!(inbox.compose().draft.is_empty());
        assert_eq!(inbox.compose().status, ComposeStatus::Idle);
    }

    #[test]
    fn draft_edited_during_send_is_kept() {
        let mut inbox = Inbox::new(Role::Standard);
        inbox.edit_draft(Channel::Direct, "first".into(), Category::Info);
        inbox.begin_send().unwrap();
        inbox.edit_draft(Channel::Direct, "second".into(), Category::Info);
        inbox.resolve_send(Ok(()));
        assert_eq!(inbox.compose().draft, "second");
    }

    #[test]
    fn blank_draft_is_not_sent() {
        let mut inbox = Inbox::new(Role::Standard);
        inbox.edit_draft(Channel::Direct, "   ".into(), Category::Info);
        assert!(inbox.begin_send().is_none());
    }
}
