//! Single-task inbox driver. Commands come in over an mpsc channel, API
//! calls run on a `JoinSet` so the loop never waits on the network, and
//! every state change is published as an `InboxView`.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{Id, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use pulse_types::models::{Category, Role};

use crate::api::DeliveryApi;
use crate::error::ClientError;
use crate::inbox::{Channel, Compose, FeedStatus, Inbox, InboxItem, ItemKey, Snapshot};

#[derive(Debug, Clone)]
pub enum InboxCommand {
    /// Panel opened: refresh now and start the poll timer.
    Open,
    /// Panel closed: stop polling.
    Close,
    Refresh,
    Tap(ItemKey),
    EditDraft {
        channel: Channel,
        draft: String,
        category: Category,
    },
    Send,
    Shutdown,
}

/// Everything a view needs to render the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct InboxView {
    pub open: bool,
    pub status: FeedStatus,
    pub items: Vec<InboxItem>,
    pub unread: usize,
    pub compose: Compose,
}

impl InboxView {
    fn of(inbox: &Inbox, open: bool) -> Self {
        Self {
            open,
            status: inbox.status().clone(),
            items: inbox.feed().cloned().collect(),
            unread: inbox.unread_count(),
            compose: inbox.compose().clone(),
        }
    }
}

/// UI-side handle to a running driver.
#[derive(Clone)]
pub struct InboxHandle {
    commands: mpsc::UnboundedSender<InboxCommand>,
    view: watch::Receiver<InboxView>,
}

impl InboxHandle {
    /// Queue a command. Returns false once the driver has stopped.
    pub fn send(&self, command: InboxCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn view(&self) -> InboxView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<InboxView> {
        self.view.clone()
    }
}

enum Pending {
    Refresh,
    Ack(ItemKey),
    Send,
}

enum Completion {
    Refreshed(Result<Snapshot, ClientError>),
    Acked(ItemKey, Result<(), ClientError>),
    Sent(Result<(), ClientError>),
}

pub struct InboxDriver<A> {
    api: A,
    inbox: Inbox,
    open: bool,
    poll_interval: Duration,
    tasks: JoinSet<Completion>,
    pending: HashMap<Id, Pending>,
    refresh_in_flight: bool,
    refresh_queued: bool,
    commands: mpsc::UnboundedReceiver<InboxCommand>,
    view_tx: watch::Sender<InboxView>,
}

impl<A> InboxDriver<A>
where
    A: DeliveryApi + Clone + 'static,
{
    pub fn new(api: A, role: Role, poll_interval: Duration) -> (Self, InboxHandle) {
        let inbox = Inbox::new(role);
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(InboxView::of(&inbox, false));
        let driver = Self {
            api,
            inbox,
            open: false,
            poll_interval,
            tasks: JoinSet::new(),
            pending: HashMap::new(),
            refresh_in_flight: false,
            refresh_queued: false,
            commands,
            view_tx,
        };
        let handle = InboxHandle {
            commands: commands_tx,
            view,
        };
        (driver, handle)
    }

    /// Run until `Shutdown` or until every handle is dropped. Outstanding
    /// requests are abandoned on exit.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(InboxCommand::Shutdown) => break,
                    Some(command) => self.handle_command(command, &mut ticker),
                },
                _ = ticker.tick(), if self.open => {
                    debug!("Poll interval elapsed");
                    self.start_refresh();
                }
                Some(joined) = self.tasks.join_next_with_id(), if !self.tasks.is_empty() => {
                    match joined {
                        Ok((id, completion)) => {
                            self.pending.remove(&id);
                            self.handle_completion(completion);
                        }
                        Err(e) => {
                            error!("Inbox request task failed: {}", e);
                            if let Some(pending) = self.pending.remove(&e.id()) {
                                self.handle_lost_task(pending);
                            }
                        }
                    }
                }
            }
            self.publish();
        }

        self.tasks.abort_all();
        info!("Inbox driver stopped");
    }

    fn publish(&self) {
        self.view_tx.send_replace(InboxView::of(&self.inbox, self.open));
    }

    fn handle_command(&mut self, command: InboxCommand, ticker: &mut tokio::time::Interval) {
        match command {
            InboxCommand::Open => {
                self.open = true;
                ticker.reset();
                self.start_refresh();
            }
            InboxCommand::Close => self.open = false,
            InboxCommand::Refresh => self.start_refresh(),
            InboxCommand::Tap(key) => {
                if self.inbox.begin_ack(key) {
                    self.start_ack(key);
                }
            }
            InboxCommand::EditDraft {
                channel,
                draft,
                category,
            } => self.inbox.edit_draft(channel, draft, category),
            InboxCommand::Send => {
                if let Some((channel, body, category)) = self.inbox.begin_send() {
                    self.start_send(channel, body, category);
                }
            }
            InboxCommand::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Refreshed(result) => {
                self.refresh_in_flight = false;
                match result {
                    Ok(snapshot) => self.inbox.apply_snapshot(snapshot),
                    Err(e) => self.inbox.refresh_failed(&e),
                }
                if std::mem::take(&mut self.refresh_queued) {
                    self.start_refresh();
                }
            }
            Completion::Acked(key, result) => {
                let unknown = result.as_ref().is_err_and(ClientError::is_outcome_unknown);
                self.inbox.resolve_ack(key, result.as_ref().copied());
                if unknown {
                    self.start_refresh();
                }
            }
            Completion::Sent(result) => {
                let reconcile = match &result {
                    Ok(()) => true,
                    Err(e) => e.is_outcome_unknown(),
                };
                self.inbox.resolve_send(result.as_ref().copied());
                if reconcile {
                    self.start_refresh();
                }
            }
        }
    }

    /// A request task panicked or was cancelled; its outcome is unknown.
    fn handle_lost_task(&mut self, pending: Pending) {
        let lost = ClientError::Transport("request task ended unexpectedly".into());
        match pending {
            Pending::Refresh => {
                self.refresh_in_flight = false;
                self.inbox.refresh_failed(&lost);
                if std::mem::take(&mut self.refresh_queued) {
                    self.start_refresh();
                }
            }
            Pending::Ack(key) => {
                self.inbox.resolve_ack(key, Err(&lost));
                self.start_refresh();
            }
            Pending::Send => {
                self.inbox.resolve_send(Err(&lost));
                self.start_refresh();
            }
        }
    }

    fn start_refresh(&mut self) {
        if self.refresh_in_flight {
            self.refresh_queued = true;
            return;
        }
        self.refresh_in_flight = true;
        self.inbox.begin_refresh();

        let api = self.api.clone();
        let handle = self.tasks.spawn(async move {
            let result = tokio::try_join!(
                api.list_direct_messages(),
                api.list_broadcasts(),
                api.unread_count()
            )
            .map(|(direct, broadcasts, unread)| Snapshot {
                direct,
                broadcasts,
                unread,
            });
            Completion::Refreshed(result)
        });
        self.pending.insert(handle.id(), Pending::Refresh);
    }

    fn start_ack(&mut self, key: ItemKey) {
        let api = self.api.clone();
        let handle = self.tasks.spawn(async move {
            let result = match key {
                ItemKey::Direct(id) => api.mark_direct_message_read(id).await.map(|_| ()),
                ItemKey::Broadcast(id) => api.mark_broadcast_read(id).await.map(|_| ()),
            };
            Completion::Acked(key, result)
        });
        self.pending.insert(handle.id(), Pending::Ack(key));
    }

    fn start_send(&mut self, channel: Channel, body: String, category: Category) {
        let api = self.api.clone();
        let handle = self.tasks.spawn(async move {
            let result = match channel {
                Channel::Direct => api.send_direct_message(&body, category).await.map(|_| ()),
                Channel::Broadcast => api.send_broadcast(&body, category).await.map(|_| ()),
            };
            Completion::Sent(result)
        });
        self.pending.insert(handle.id(), Pending::Send);
    }
}
