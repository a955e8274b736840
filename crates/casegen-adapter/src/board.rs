/*
[INPUT]:  Task pages from the service, user actions, page navigation
[OUTPUT]: Atomic page snapshots via `watch` + lifecycle events via `mpsc`
[POS]:    Domain layer - shared task list state (last-issued refresh wins)
[UPDATE]: When changing pagination, refresh ordering, or action gating
*/

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::http::{ArtifactSink, CasegenClient, CasegenError, Result};
use crate::lifecycle::{LifecycleTracker, TaskAction, TaskEntry, TaskEvent, TaskPhase};
use crate::poller::{PollerHandle, TaskPoller};
use crate::types::{ClarificationReply, NewTask, Task, TaskId, TaskList};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Position within the server's task list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl Pagination {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total: 0,
        }
    }

    /// `ceil(total / page_size)`, never less than 1
    pub fn total_pages(&self) -> u32 {
        let size = u64::from(self.page_size.max(1));
        let pages = self.total.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Everything a view needs to render one page, replaced as a whole
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub pagination: Pagination,
    pub entries: Vec<TaskEntry>,
    /// Sequence number of the refresh that produced this snapshot (0 = nothing loaded)
    pub seq: u64,
}

impl PageSnapshot {
    fn empty(pagination: Pagination) -> Self {
        Self {
            pagination,
            entries: Vec::new(),
            seq: 0,
        }
    }

    pub fn entry(&self, task_id: TaskId) -> Option<&TaskEntry> {
        self.entries.iter().find(|entry| entry.id() == task_id)
    }

    pub fn is_loaded(&self) -> bool {
        self.seq > 0
    }
}

/// Identifies one issued list request. Only the most recently issued request
/// for the current page may update the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    seq: u64,
    generation: u64,
    page: u32,
    page_size: u32,
}

impl RefreshTicket {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

#[derive(Debug)]
struct BoardState {
    pagination: Pagination,
    /// Committed page generation; tickets from older generations are stale
    generation: u64,
    /// Latest generation handed to a page change, committed or not
    issued_generation: u64,
    issued_seq: u64,
    applied_seq: u64,
    tracker: LifecycleTracker,
}

impl BoardState {
    fn issue(&mut self) -> RefreshTicket {
        self.issued_seq += 1;
        RefreshTicket {
            seq: self.issued_seq,
            generation: self.generation,
            page: self.pagination.page,
            page_size: self.pagination.page_size,
        }
    }

    /// Ticket for loading another page. Nothing changes until its response
    /// is applied, so a failed page change leaves the current page intact.
    fn navigate(&mut self, page: u32) -> RefreshTicket {
        self.issued_seq += 1;
        self.issued_generation += 1;
        RefreshTicket {
            seq: self.issued_seq,
            generation: self.issued_generation,
            page,
            page_size: self.pagination.page_size,
        }
    }

    /// Drop any page change still in flight
    fn cancel_navigation(&mut self) {
        self.issued_generation += 1;
    }

    /// Same page: stale once a newer request was applied. Page change: only
    /// the most recently requested one may land.
    fn accepts(&self, ticket: &RefreshTicket) -> bool {
        if ticket.generation == self.generation {
            ticket.seq > self.applied_seq
        } else {
            ticket.generation > self.generation && ticket.generation == self.issued_generation
        }
    }

    fn commit_page(&mut self, ticket: &RefreshTicket) {
        self.pagination.page = ticket.page;
        self.generation = ticket.generation;
        self.tracker.reset();
    }
}

/// Shared task list: the only place task snapshots are stored.
///
/// State sits behind one async mutex that is never held across a network
/// call; readers get the current page through [`TaskBoard::subscribe`].
#[derive(Debug)]
pub struct TaskBoard {
    client: CasegenClient,
    state: Mutex<BoardState>,
    snapshot: watch::Sender<Arc<PageSnapshot>>,
    event_tx: mpsc::UnboundedSender<TaskEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<TaskEvent>>,
    downloads: StdMutex<HashSet<TaskId>>,
    poller: StdMutex<Option<CancellationToken>>,
}

impl TaskBoard {
    pub fn new(client: CasegenClient, page_size: u32) -> Self {
        let pagination = Pagination::new(page_size);
        let (snapshot, _rx) = watch::channel(Arc::new(PageSnapshot::empty(pagination)));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            client,
            state: Mutex::new(BoardState {
                pagination,
                generation: 0,
                issued_generation: 0,
                issued_seq: 0,
                applied_seq: 0,
                tracker: LifecycleTracker::new(),
            }),
            snapshot,
            event_tx,
            event_rx: Some(event_rx),
            downloads: StdMutex::new(HashSet::new()),
            poller: StdMutex::new(None),
        }
    }

    pub fn client(&self) -> &CasegenClient {
        &self.client
    }

    /// Take the lifecycle event stream (only once, before sharing the board)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TaskEvent>> {
        self.event_rx.take()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PageSnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> Arc<PageSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Effective phase of a task on the displayed page
    pub async fn phase_of(&self, task_id: TaskId) -> Option<TaskPhase> {
        self.state.lock().await.tracker.phase(task_id).cloned()
    }

    pub async fn pagination(&self) -> Pagination {
        self.state.lock().await.pagination
    }

    /// Issue a ticket for a list request of the current page
    pub async fn begin_refresh(&self) -> RefreshTicket {
        self.state.lock().await.issue()
    }

    /// Apply a list response. Returns `false` when the ticket is stale and the
    /// response was discarded.
    pub async fn apply(&self, ticket: RefreshTicket, list: TaskList) -> bool {
        let mut state = self.state.lock().await;
        if !state.accepts(&ticket) {
            debug!(
                seq = ticket.seq,
                applied = state.applied_seq,
                page = ticket.page,
                "discarding stale task page"
            );
            return false;
        }

        if ticket.generation != state.generation {
            state.commit_page(&ticket);
            info!(page = ticket.page, "switched task page");
        }
        // polls of the old page may have landed while the page change was in flight
        state.applied_seq = state.applied_seq.max(ticket.seq);
        state.pagination.total = list.total;
        let reconciled = state.tracker.apply_page(list.tasks);

        let snapshot = PageSnapshot {
            pagination: state.pagination,
            entries: reconciled.entries,
            seq: ticket.seq,
        };
        self.publish(snapshot);
        drop(state);

        self.emit(reconciled.events);
        true
    }

    /// Fetch the current page and apply it if still current
    pub async fn refresh(&self) -> Result<bool> {
        let ticket = self.begin_refresh().await;
        let list = self
            .client
            .list_tasks(ticket.page(), ticket.page_size())
            .await?;
        Ok(self.apply(ticket, list).await)
    }

    /// Advance one page; no-op on the last page
    pub async fn next_page(&self) -> Result<bool> {
        let target = {
            let state = self.state.lock().await;
            if !state.pagination.has_next() {
                return Ok(false);
            }
            state.pagination.page + 1
        };
        self.go_to_page(target).await
    }

    /// Go back one page; no-op on the first page
    pub async fn prev_page(&self) -> Result<bool> {
        let target = {
            let state = self.state.lock().await;
            if !state.pagination.has_prev() {
                return Ok(false);
            }
            state.pagination.page - 1
        };
        self.go_to_page(target).await
    }

    /// Jump to a 1-based page and load it.
    ///
    /// The board keeps showing the current page until the target page has
    /// loaded. Returns `false` when already there or when a later page change
    /// superseded this one.
    pub async fn go_to_page(&self, page: u32) -> Result<bool> {
        let ticket = {
            let mut state = self.state.lock().await;
            let total_pages = state.pagination.total_pages();
            if page == 0 || (state.applied_seq > 0 && page > total_pages) {
                return Err(CasegenError::validation(format!(
                    "page {page} is outside 1..={total_pages}"
                )));
            }
            if page == state.pagination.page {
                state.cancel_navigation();
                return Ok(false);
            }
            state.navigate(page)
        };
        let list = self
            .client
            .list_tasks(ticket.page(), ticket.page_size())
            .await?;
        Ok(self.apply(ticket, list).await)
    }

    /// Submit `task`, then reload the page
    pub async fn create(&self, task: &NewTask) -> Result<Task> {
        let created = self.client.create_task(task).await?;
        self.refresh_after("create").await;
        Ok(created)
    }

    /// Delete a task; available in every phase
    pub async fn delete(&self, task_id: TaskId) -> Result<()> {
        self.client.delete_task(task_id).await?;
        info!(task_id, "task deleted");
        self.refresh_after("delete").await;
        Ok(())
    }

    /// Answer a pending clarification. Refused unless the latest snapshot
    /// shows the task as clarifying.
    pub async fn clarify(&self, task_id: TaskId, reply: ClarificationReply) -> Result<Task> {
        let action = match &reply {
            ClarificationReply::Answer(_) => TaskAction::Reply,
            ClarificationReply::Skip => TaskAction::Skip,
            ClarificationReply::Stop => TaskAction::Stop,
        };
        self.require(task_id, action).await?;

        let updated = self.client.clarify_task(task_id, reply).await?;
        self.apply_task(updated.clone()).await;
        self.refresh_after("clarify").await;
        Ok(updated)
    }

    /// Summary of a finished task, from the snapshot when it already has one
    pub async fn summary(&self, task_id: TaskId) -> Result<String> {
        match self.require(task_id, TaskAction::ViewSummary).await? {
            TaskPhase::Finished {
                summary: Some(summary),
                ..
            } => Ok(summary),
            _ => self.client.fetch_summary(task_id).await,
        }
    }

    /// Download a finished task's artifact into `sink`.
    ///
    /// A second download of the same task while one is running is refused.
    pub async fn download(&self, task_id: TaskId, sink: &dyn ArtifactSink) -> Result<PathBuf> {
        self.require(task_id, TaskAction::Download).await?;
        let _guard = InFlight::acquire(&self.downloads, task_id)?;
        let path = self.client.download_to(task_id, sink).await?;
        info!(task_id, path = %path.display(), "artifact saved");
        Ok(path)
    }

    /// Start background polling, replacing any poller this board already runs
    pub fn start_polling(self: &Arc<Self>, interval: Duration) -> PollerHandle {
        let handle = TaskPoller::spawn(self, interval);
        let previous = match self.poller.lock() {
            Ok(mut slot) => slot.replace(handle.token()),
            Err(poisoned) => poisoned.into_inner().replace(handle.token()),
        };
        if let Some(previous) = previous {
            debug!("replacing running task poller");
            previous.cancel();
        }
        handle
    }

    async fn require(&self, task_id: TaskId, action: TaskAction) -> Result<TaskPhase> {
        let state = self.state.lock().await;
        let phase = state.tracker.phase(task_id).cloned().ok_or_else(|| {
            CasegenError::validation(format!("task {task_id} is not on the current page"))
        })?;
        if !phase.allows(action) {
            return Err(CasegenError::validation(format!(
                "{action:?} is not available while task {task_id} is {}",
                phase.status()
            )));
        }
        Ok(phase)
    }

    /// Point update from an action response. Consumes a ticket so that list
    /// requests issued before the action cannot roll the task back.
    async fn apply_task(&self, task: Task) {
        let mut state = self.state.lock().await;
        let ticket = state.issue();
        state.applied_seq = ticket.seq;

        let (entry, event) = state.tracker.observe(task);
        let current = self.snapshot();
        let mut entries = current.entries.clone();
        match entries.iter_mut().find(|existing| existing.id() == entry.id()) {
            Some(existing) => *existing = entry,
            None => return,
        }
        self.publish(PageSnapshot {
            pagination: current.pagination,
            entries,
            seq: ticket.seq,
        });
        drop(state);

        self.emit(event);
    }

    async fn refresh_after(&self, action: &str) {
        if let Err(err) = self.refresh().await {
            warn!(action, error = %err, "refresh after action failed");
        }
    }

    fn publish(&self, snapshot: PageSnapshot) {
        self.snapshot.send_replace(Arc::new(snapshot));
    }

    fn emit(&self, events: impl IntoIterator<Item = TaskEvent>) {
        for event in events {
            // nobody listening is fine
            let _ = self.event_tx.send(event);
        }
    }
}

impl Drop for TaskBoard {
    fn drop(&mut self) {
        let slot = match self.poller.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(token) = slot {
            token.cancel();
        }
    }
}

/// Marks a task id busy until dropped
struct InFlight<'a> {
    set: &'a StdMutex<HashSet<TaskId>>,
    task_id: TaskId,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a StdMutex<HashSet<TaskId>>, task_id: TaskId) -> Result<Self> {
        let mut busy = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !busy.insert(task_id) {
            return Err(CasegenError::validation(format!(
                "download already in progress for task {task_id}"
            )));
        }
        Ok(Self { set, task_id })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut busy = self
            .set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        busy.remove(&self.task_id);
    }
}
