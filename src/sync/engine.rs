//! The session event loop.
//!
//! Every source of work (commands from the UI, connectivity transitions,
//! reminder ticks) becomes an `Event` on one FIFO queue consumed by a single
//! task, so the collection is only ever touched by one logical thread.
//!
//! A mutation completes synchronously (collection + local store) and then
//! schedules a reconciliation pass. Scheduled passes run in order, after the
//! event that scheduled them and before the next event is taken, so two
//! passes never overlap.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Connectivity, ConnectivityMonitor, ConnectivitySignal, PersistenceBridge, Subscription, SyncOutcome};
use crate::entity::{Attachment, Note, NoteChange, NoteId};
use crate::error::{CarnetError, Result};
use crate::reminder::{self, Clock, Notifier, ReminderScheduler};
use crate::storage::{LocalBackend, RecordBackend};
use crate::store::NoteStore;
use crate::view::{derive_view, ViewQuery};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub reminder_period: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            reminder_period: reminder::DEFAULT_PERIOD,
        }
    }
}

enum Command {
    Create(oneshot::Sender<NoteId>),
    Update(NoteId, NoteChange),
    Delete(NoteId),
    AddAttachments(NoteId, Vec<Attachment>),
    RemoveAttachment(NoteId, usize),
    AppendContent(NoteId, String),
}

enum Query {
    Snapshot(oneshot::Sender<Vec<Note>>),
    View(ViewQuery, oneshot::Sender<Vec<Note>>),
    Connectivity(oneshot::Sender<Connectivity>),
}

enum Event {
    Command(Command),
    Query(Query),
    ConnectivityChanged,
    ReminderTick,
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

pub struct Engine<L, R: RecordBackend, N> {
    store: NoteStore,
    bridge: PersistenceBridge<L, R>,
    monitor: ConnectivityMonitor,
    reminders: ReminderScheduler<N>,
    clock: Arc<dyn Clock>,
    events: mpsc::UnboundedReceiver<Event>,
    backlog: VecDeque<Connectivity>,
    cancel: CancellationToken,
    sources: Vec<JoinHandle<()>>,
}

impl<L, R, N> Engine<L, R, N>
where
    L: LocalBackend + 'static,
    R: RecordBackend + 'static,
    N: Notifier + 'static,
{
    /// Seed the collection from the local store and start the event loop
    /// along with its connectivity and reminder sources.
    pub fn spawn(
        bridge: PersistenceBridge<L, R>,
        signal: ConnectivitySignal,
        notifier: N,
        clock: Arc<dyn Clock>,
        options: EngineOptions,
    ) -> (EngineHandle, JoinHandle<()>) {
        let (tx, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let sources = vec![
            forward_connectivity(signal.subscribe(), tx.downgrade(), cancel.child_token()),
            forward_reminder_ticks(options.reminder_period, tx.downgrade(), cancel.child_token()),
        ];

        let engine = Engine {
            store: NoteStore::with_notes(bridge.load_local()),
            bridge,
            monitor: ConnectivityMonitor::new(signal),
            reminders: ReminderScheduler::new(notifier, options.reminder_period),
            clock,
            events,
            backlog: VecDeque::new(),
            cancel,
            sources,
        };

        let join = tokio::spawn(engine.run());
        (EngineHandle { tx }, join)
    }

    async fn run(mut self) {
        debug!(
            count = self.store.len(),
            connectivity = %self.monitor.state(),
            period_secs = self.reminders.period().as_secs(),
            "Engine started"
        );

        // Initial pass, as after any mutation.
        self.after_mutation();
        self.drain_backlog().await;

        let mut shutdown = None;
        while let Some(event) = self.events.recv().await {
            match event {
                Event::Command(command) => self.apply(command),
                Event::Query(query) => self.answer(query),
                Event::ConnectivityChanged => {
                    let state = self.monitor.on_event();
                    self.backlog.push_back(state);
                }
                Event::ReminderTick => self.fire_reminders(),
                Event::Flush(reply) => {
                    let _ = reply.send(());
                }
                Event::Shutdown(reply) => {
                    shutdown = Some(reply);
                    break;
                }
            }
            self.drain_backlog().await;
        }

        self.events.close();
        self.cancel.cancel();
        for source in self.sources.drain(..) {
            let _ = source.await;
        }
        self.bridge.close().await;
        debug!("Engine stopped");

        if let Some(reply) = shutdown {
            let _ = reply.send(());
        }
    }

    fn apply(&mut self, command: Command) {
        let found = match command {
            Command::Create(reply) => {
                let id = self.store.create_at(self.clock.now().timestamp_millis());
                debug!(id, "Created note");
                let _ = reply.send(id);
                true
            }
            Command::Update(id, change) => self.store.update(id, change),
            Command::Delete(id) => self.store.delete(id),
            Command::AddAttachments(id, attachments) => self.store.add_attachments(id, attachments),
            Command::RemoveAttachment(id, index) => self.store.remove_attachment(id, index),
            Command::AppendContent(id, markup) => self.store.append_content(id, &markup),
        };
        if !found {
            debug!("Mutation referenced an unknown note");
        }
        self.after_mutation();
    }

    fn answer(&self, query: Query) {
        match query {
            Query::Snapshot(reply) => {
                let _ = reply.send(self.store.snapshot());
            }
            Query::View(view, reply) => {
                let _ = reply.send(derive_view(self.store.notes(), &view));
            }
            Query::Connectivity(reply) => {
                let _ = reply.send(self.monitor.state());
            }
        }
    }

    fn fire_reminders(&mut self) {
        let now = self.clock.now().naive_local();
        for id in self.reminders.tick(self.store.notes(), now) {
            self.store.update(id, NoteChange::Reminder(None));
            self.after_mutation();
        }
    }

    /// Persist locally, then schedule a pass for the current connectivity.
    fn after_mutation(&mut self) {
        self.bridge.persist_local(self.store.notes());
        self.backlog.push_back(self.monitor.state());
    }

    async fn drain_backlog(&mut self) {
        while let Some(state) = self.backlog.pop_front() {
            let outcome = self.bridge.reconcile(state, self.store.notes()).await;
            debug!(connectivity = %state, ?outcome, "Reconciliation pass finished");
            if let SyncOutcome::Adopted(notes) = outcome {
                self.store.replace_all(notes);
                self.bridge.persist_local(self.store.notes());
            }
        }
    }
}

fn forward_connectivity(
    mut subscription: Subscription,
    queue: mpsc::WeakUnboundedSender<Event>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = subscription.next() => {
                    if event.is_none() {
                        break;
                    }
                    let Some(tx) = queue.upgrade() else { break };
                    if tx.send(Event::ConnectivityChanged).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn forward_reminder_ticks(
    period: Duration,
    queue: mpsc::WeakUnboundedSender<Event>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(tx) = queue.upgrade() else { break };
                    if tx.send(Event::ReminderTick).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Cloneable front door to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Event>,
}

impl EngineHandle {
    fn send(&self, event: Event) -> Result<()> {
        self.tx.send(event).map_err(|_| CarnetError::EngineStopped)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Event) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(make(reply))?;
        response.await.map_err(|_| CarnetError::EngineStopped)
    }

    pub async fn create(&self) -> Result<NoteId> {
        self.request(|reply| Event::Command(Command::Create(reply))).await
    }

    pub fn update(&self, id: NoteId, change: NoteChange) -> Result<()> {
        self.send(Event::Command(Command::Update(id, change)))
    }

    pub fn delete(&self, id: NoteId) -> Result<()> {
        self.send(Event::Command(Command::Delete(id)))
    }

    pub fn add_attachments(&self, id: NoteId, attachments: Vec<Attachment>) -> Result<()> {
        self.send(Event::Command(Command::AddAttachments(id, attachments)))
    }

    pub fn remove_attachment(&self, id: NoteId, index: usize) -> Result<()> {
        self.send(Event::Command(Command::RemoveAttachment(id, index)))
    }

    pub fn append_content(&self, id: NoteId, markup: impl Into<String>) -> Result<()> {
        self.send(Event::Command(Command::AppendContent(id, markup.into())))
    }

    pub async fn snapshot(&self) -> Result<Vec<Note>> {
        self.request(|reply| Event::Query(Query::Snapshot(reply))).await
    }

    pub async fn view(&self, query: ViewQuery) -> Result<Vec<Note>> {
        self.request(|reply| Event::Query(Query::View(query, reply))).await
    }

    pub async fn connectivity(&self) -> Result<Connectivity> {
        self.request(|reply| Event::Query(Query::Connectivity(reply))).await
    }

    /// Run a reminder check now, outside the periodic schedule.
    pub fn tick_reminders(&self) -> Result<()> {
        self.send(Event::ReminderTick)
    }

    /// Resolves once every event sent before it, and the reconciliation
    /// passes they scheduled, has been handled.
    pub async fn flush(&self) -> Result<()> {
        self.request(Event::Flush).await
    }

    /// Stop the engine after the events already queued.
    pub async fn shutdown(self) -> Result<()> {
        self.request(Event::Shutdown).await
    }
}
