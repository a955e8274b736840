/*
[INPUT]:  Task snapshots reported by the service (list, clarify responses)
[OUTPUT]: Typed task phases, per-phase action sets, de-duplicated lifecycle events
[POS]:    Domain layer - task state machine (purely reactive)
[UPDATE]: When adding task states, actions, or event semantics
*/

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::types::{Task, TaskId, TaskStatus};

/// Placeholder for failed tasks the service reported without a message
pub const MISSING_ERROR_MESSAGE: &str = "task failed without an error message";

/// Live data of a task, keyed by its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPhase {
    Running,
    Clarifying {
        question: String,
    },
    Finished {
        finished_at: Option<NaiveDateTime>,
        summary: Option<String>,
    },
    Failed {
        finished_at: Option<NaiveDateTime>,
        error: String,
    },
}

/// What a consumer may do with a task in a given phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskAction {
    Reply,
    Skip,
    Stop,
    Download,
    ViewSummary,
    Delete,
}

impl TaskPhase {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskPhase::Running => TaskStatus::Running,
            TaskPhase::Clarifying { .. } => TaskStatus::Clarifying,
            TaskPhase::Finished { .. } => TaskStatus::Finished,
            TaskPhase::Failed { .. } => TaskStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn actions(&self) -> &'static [TaskAction] {
        match self {
            TaskPhase::Running => &[TaskAction::Delete],
            TaskPhase::Clarifying { .. } => &[
                TaskAction::Reply,
                TaskAction::Skip,
                TaskAction::Stop,
                TaskAction::Delete,
            ],
            TaskPhase::Finished { .. } => &[
                TaskAction::Download,
                TaskAction::ViewSummary,
                TaskAction::Delete,
            ],
            TaskPhase::Failed { .. } => &[TaskAction::Delete],
        }
    }

    pub fn allows(&self, action: TaskAction) -> bool {
        self.actions().contains(&action)
    }
}

impl Task {
    /// Interpret the wire snapshot as a typed phase.
    ///
    /// Side-channel data that belongs to another status is ignored.
    pub fn phase(&self) -> TaskPhase {
        match self.status {
            TaskStatus::Running => TaskPhase::Running,
            TaskStatus::Clarifying => TaskPhase::Clarifying {
                question: self.clarification_message.clone().unwrap_or_default(),
            },
            TaskStatus::Finished => TaskPhase::Finished {
                finished_at: self.finished_at,
                summary: self.summary_content.clone(),
            },
            TaskStatus::Failed => TaskPhase::Failed {
                    finished_at: self.finished_at,
                    error: self
                        .error_message
                        .clone()
                        .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| MISSING_ERROR_MESSAGE.to_string()),
            },
        }
    }
}

/// Something a consumer should react to exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// Task entered `Clarifying`, or was asked a new question
    ClarificationRequested { task_id: TaskId, question: String },
    /// Clarification answered; the service is processing again
    Resumed { task_id: TaskId },
    Finished { task_id: TaskId },
    Failed { task_id: TaskId, error: String },
    /// Task is no longer on the displayed page (deleted or shifted away)
    LeftPage { task_id: TaskId },
}

impl TaskEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::ClarificationRequested { task_id, .. }
            | TaskEvent::Resumed { task_id }
            | TaskEvent::Finished { task_id }
            | TaskEvent::Failed { task_id, .. }
            | TaskEvent::LeftPage { task_id } => *task_id,
        }
    }
}

/// A task as displayed: the wire snapshot plus its effective phase.
///
/// `task` is the snapshot that produced `phase`. When a later snapshot is
/// rejected as an illegal transition, the entry keeps the earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEntry {
    pub task: Task,
    pub phase: TaskPhase,
}

impl TaskEntry {
    pub fn id(&self) -> TaskId {
        self.task.id
    }

    pub fn actions(&self) -> &'static [TaskAction] {
        self.phase.actions()
    }
}

/// Result of reconciling one page snapshot
#[derive(Debug, Default)]
pub struct Reconciled {
    pub entries: Vec<TaskEntry>,
    pub events: Vec<TaskEvent>,
}

/// Remembers the last accepted snapshot of every displayed task and turns
/// new snapshots into events.
///
/// Identical snapshots yield no events. Illegal transitions (including any
/// move out of a terminal state) are rejected per task: the previous entry
/// stays in effect. A terminal outcome is reported at most once per task,
/// even if the task leaves the page and comes back.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    entries: HashMap<TaskId, TaskEntry>,
    /// Tasks whose terminal outcome was reported or part of the baseline
    settled: HashSet<TaskId>,
    baseline_taken: bool,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, task_id: TaskId) -> Option<&TaskPhase> {
        self.entries.get(&task_id).map(|entry| &entry.phase)
    }

    /// Forget everything; the next snapshot becomes a new baseline
    pub fn reset(&mut self) {
        self.entries.clear();
        self.settled.clear();
        self.baseline_taken = false;
    }

    /// Reconcile a full page. Tasks tracked before but absent now emit `LeftPage`.
    pub fn apply_page(&mut self, tasks: Vec<Task>) -> Reconciled {
        let mut reconciled = Reconciled::default();
        let mut seen = Vec::with_capacity(tasks.len());

        for task in tasks {
            seen.push(task.id);
            let (entry, event) = self.observe(task);
            reconciled.entries.push(entry);
            reconciled.events.extend(event);
        }

        let mut departed: Vec<TaskId> = self
            .entries
            .keys()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        departed.sort_unstable();
        for task_id in departed {
            self.entries.remove(&task_id);
            reconciled.events.push(TaskEvent::LeftPage { task_id });
        }

        self.baseline_taken = true;
        reconciled
    }

    /// Reconcile a single task snapshot (e.g. the response of an action)
    pub fn observe(&mut self, task: Task) -> (TaskEntry, Option<TaskEvent>) {
        let next = task.phase();
        let task_id = task.id;

        let Some(prev) = self.entries.get(&task_id) else {
            let event = self.first_sighting_event(task_id, &next);
            return (self.accept(task, next, None), event);
        };

        if prev.phase == next {
            let entry = TaskEntry { task, phase: next };
            self.entries.insert(task_id, entry.clone());
            return (entry, None);
        }

        if !prev.phase.status().can_transition_to(next.status()) {
            warn!(
                task_id,
                from = %prev.phase.status(),
                to = %next.status(),
                "ignoring illegal task transition"
            );
            return (prev.clone(), None);
        }

        let prev_status = prev.phase.status();
        let event = transition_event(task_id, &prev.phase, &next);
        if let Some(event) = &event {
            info!(task_id, from = %prev_status, to = %next.status(), ?event, "task transition");
        }
        (self.accept(task, next, Some(prev_status)), event)
    }

    fn accept(&mut self, task: Task, phase: TaskPhase, prev: Option<TaskStatus>) -> TaskEntry {
        if missing_finish_time(&task, prev) {
            warn!(task_id = task.id, status = %task.status, "terminal task without finished_at");
        }
        if phase.is_terminal() {
            self.settled.insert(task.id);
        }
        let entry = TaskEntry { task, phase };
        self.entries.insert(entry.id(), entry.clone());
        entry
    }

    fn first_sighting_event(&self, task_id: TaskId, phase: &TaskPhase) -> Option<TaskEvent> {
        match phase {
            TaskPhase::Running => None,
            TaskPhase::Clarifying { question } => Some(TaskEvent::ClarificationRequested {
                task_id,
                question: question.clone(),
            }),
            // terminal history present when the view opened is not news,
            // and neither is an outcome already reported before the task left
            TaskPhase::Finished { .. } | TaskPhase::Failed { .. }
                if !self.baseline_taken || self.settled.contains(&task_id) =>
            {
                None
            }
            TaskPhase::Finished { .. } => Some(TaskEvent::Finished { task_id }),
            TaskPhase::Failed { error, .. } => Some(TaskEvent::Failed {
                task_id,
                error: error.clone(),
            }),
        }
    }
}

/// A terminal snapshot without `finished_at`, seen as the task enters that
/// state. Later copies of the same snapshot are not reported again.
fn missing_finish_time(task: &Task, prev: Option<TaskStatus>) -> bool {
    task.status.is_terminal() && task.finished_at.is_none() && prev != Some(task.status)
}

fn transition_event(task_id: TaskId, prev: &TaskPhase, next: &TaskPhase) -> Option<TaskEvent> {
    match (prev, next) {
        (_, TaskPhase::Clarifying { question }) => Some(TaskEvent::ClarificationRequested {
            task_id,
            question: question.clone(),
        }),
        (TaskPhase::Clarifying { .. }, TaskPhase::Running) => Some(TaskEvent::Resumed { task_id }),
        (TaskPhase::Running, TaskPhase::Running) => None,
        (prev, TaskPhase::Finished { .. }) if !prev.is_terminal() => {
            Some(TaskEvent::Finished { task_id })
        }
        (prev, TaskPhase::Failed { error, .. }) if !prev.is_terminal() => Some(TaskEvent::Failed {
            task_id,
            error: error.clone(),
        }),
        // terminal payload refresh (e.g. summary became available)
        (_, TaskPhase::Finished { .. } | TaskPhase::Failed { .. }) => None,
        (TaskPhase::Finished { .. } | TaskPhase::Failed { .. }, TaskPhase::Running) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 1)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .unwrap()
    }

    fn task(id: TaskId, status: TaskStatus) -> Task {
        Task {
            id,
            original_filename: format!("doc-{id}.pdf"),
            status,
            created_at: ts(),
            finished_at: status.is_terminal().then(ts),
            error_message: (status == TaskStatus::Failed).then(|| "boom".to_string()),
            clarification_message: (status == TaskStatus::Clarifying)
                .then(|| "Which endpoint?".to_string()),
            summary_content: None,
        }
    }

    fn clarifying(id: TaskId, question: &str) -> Task {
        Task {
            clarification_message: Some(question.to_string()),
            ..task(id, TaskStatus::Clarifying)
        }
    }

    #[test]
    fn test_phase_carries_required_data() {
        let failed = Task {
            error_message: None,
            ..task(1, TaskStatus::Failed)
        };
        assert_eq!(
            failed.phase(),
            TaskPhase::Failed {
                finished_at: Some(ts()),
                error: MISSING_ERROR_MESSAGE.to_string()
            }
        );

        let clarifying = task(2, TaskStatus::Clarifying);
        assert_eq!(
            clarifying.phase(),
            TaskPhase::Clarifying {
                question: "Which endpoint?".to_string()
            }
        );

        // stale side-channel data is ignored
        let running = Task {
            clarification_message: Some("old".to_string()),
            ..task(3, TaskStatus::Running)
        };
        assert_eq!(running.phase(), TaskPhase::Running);
    }

    #[test]
    fn test_action_sets() {
        assert_eq!(TaskPhase::Running.actions(), &[TaskAction::Delete]);
        assert!(task(1, TaskStatus::Clarifying).phase().allows(TaskAction::Reply));
        assert!(task(1, TaskStatus::Clarifying).phase().allows(TaskAction::Stop));
        let finished = task(1, TaskStatus::Finished).phase();
        assert!(finished.allows(TaskAction::Download));
        assert!(finished.allows(TaskAction::ViewSummary));
        assert!(!finished.allows(TaskAction::Reply));
        let failed = task(1, TaskStatus::Failed).phase();
        assert_eq!(failed.actions(), &[TaskAction::Delete]);
    }

    #[test]
    fn test_identical_snapshots_emit_nothing_twice() {
        let mut tracker = LifecycleTracker::new();
        let first = tracker.apply_page(vec![task(1, TaskStatus::Running)]);
        assert!(first.events.is_empty());

        let done = tracker.apply_page(vec![task(1, TaskStatus::Finished)]);
        assert_eq!(done.events, vec![TaskEvent::Finished { task_id: 1 }]);

        let again = tracker.apply_page(vec![task(1, TaskStatus::Finished)]);
        assert!(again.events.is_empty());
    }

    #[test]
    fn test_clarification_flow() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply_page(vec![task(1, TaskStatus::Running)]);

        let asked = tracker.apply_page(vec![clarifying(1, "Which endpoint?")]);
        assert_eq!(
            asked.events,
            vec![TaskEvent::ClarificationRequested {
                task_id: 1,
                question: "Which endpoint?".to_string()
            }]
        );
        assert!(tracker.apply_page(vec![clarifying(1, "Which endpoint?")]).events.is_empty());

        let resumed = tracker.apply_page(vec![task(1, TaskStatus::Running)]);
        assert_eq!(resumed.events, vec![TaskEvent::Resumed { task_id: 1 }]);

        let follow_up = tracker.apply_page(vec![clarifying(1, "Which auth scheme?")]);
        assert_eq!(follow_up.events.len(), 1);

        let replaced = tracker.apply_page(vec![clarifying(1, "Which region?")]);
        assert_eq!(
            replaced.events,
            vec![TaskEvent::ClarificationRequested {
                task_id: 1,
                question: "Which region?".to_string()
            }]
        );
    }

    #[test]
    fn test_terminal_states_absorb() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply_page(vec![task(1, TaskStatus::Running)]);
        tracker.apply_page(vec![task(1, TaskStatus::Finished)]);

        let resurrected = tracker.apply_page(vec![task(1, TaskStatus::Running)]);
        assert!(resurrected.events.is_empty());
        assert_eq!(resurrected.entries[0].phase.status(), TaskStatus::Finished);
        // the entry keeps the snapshot its phase came from
        assert_eq!(resurrected.entries[0].task.status, TaskStatus::Finished);
        assert!(resurrected.entries[0].task.finished_at.is_some());
        assert_eq!(
            tracker.phase(1).map(TaskPhase::status),
            Some(TaskStatus::Finished)
        );
    }

    #[test]
    fn test_baseline_suppresses_historic_terminal_events() {
        let mut tracker = LifecycleTracker::new();
        let baseline = tracker.apply_page(vec![
            task(1, TaskStatus::Finished),
            task(2, TaskStatus::Failed),
            task(3, TaskStatus::Clarifying),
        ]);
        assert_eq!(
            baseline.events,
            vec![TaskEvent::ClarificationRequested {
                task_id: 3,
                question: "Which endpoint?".to_string()
            }]
        );

        // a task that shows up already finished after the baseline is news
        let later = tracker.apply_page(vec![
            task(4, TaskStatus::Finished),
            task(1, TaskStatus::Finished),
            task(2, TaskStatus::Failed),
            task(3, TaskStatus::Clarifying),
        ]);
        assert_eq!(later.events, vec![TaskEvent::Finished { task_id: 4 }]);
    }

    #[test]
    fn test_departed_tasks_reported_once() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply_page(vec![task(1, TaskStatus::Running), task(2, TaskStatus::Running)]);

        let after_delete = tracker.apply_page(vec![task(2, TaskStatus::Running)]);
        assert_eq!(after_delete.events, vec![TaskEvent::LeftPage { task_id: 1 }]);

        let again = tracker.apply_page(vec![task(2, TaskStatus::Running)]);
        assert!(again.events.is_empty());
    }

    #[test]
    fn test_summary_refresh_is_silent() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply_page(vec![task(1, TaskStatus::Running)]);
        tracker.apply_page(vec![task(1, TaskStatus::Finished)]);

        let with_summary = Task {
            summary_content: Some("# report".to_string()),
            ..task(1, TaskStatus::Finished)
        };
        let (entry, event) = tracker.observe(with_summary);
        assert!(event.is_none());
        assert_eq!(
            entry.phase,
            TaskPhase::Finished {
                finished_at: Some(ts()),
                summary: Some("# report".to_string())
            }
        );
    }

    #[test]
    fn test_outcome_not_repeated_after_leaving_page() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply_page(vec![task(1, TaskStatus::Running)]);

        let done = tracker.apply_page(vec![task(1, TaskStatus::Finished)]);
        assert_eq!(done.events, vec![TaskEvent::Finished { task_id: 1 }]);

        let away = tracker.apply_page(vec![task(2, TaskStatus::Running)]);
        assert_eq!(away.events, vec![TaskEvent::LeftPage { task_id: 1 }]);
        assert!(tracker.phase(1).is_none());

        let back = tracker.apply_page(vec![task(1, TaskStatus::Finished)]);
        assert_eq!(back.events, vec![TaskEvent::LeftPage { task_id: 2 }]);
        assert_eq!(back.entries[0].phase.status(), TaskStatus::Finished);
    }

    #[test]
    fn test_outcome_reached_while_away_is_reported() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply_page(vec![task(1, TaskStatus::Running)]);
        tracker.apply_page(Vec::new());

        let back = tracker.apply_page(vec![task(1, TaskStatus::Failed)]);
        assert_eq!(
            back.events,
            vec![TaskEvent::Failed {
                task_id: 1,
                error: "boom".to_string()
            }]
        );

        tracker.reset();
        let reopened = tracker.apply_page(vec![task(1, TaskStatus::Failed)]);
        assert!(reopened.events.is_empty());
    }

    #[test]
    fn test_missing_finish_time_flagged_on_entry_only() {
        let unstamped = Task {
            finished_at: None,
            ..task(1, TaskStatus::Finished)
        };
        assert!(missing_finish_time(&unstamped, None));
        assert!(missing_finish_time(&unstamped, Some(TaskStatus::Running)));
        assert!(!missing_finish_time(&unstamped, Some(TaskStatus::Finished)));
        assert!(!missing_finish_time(&task(1, TaskStatus::Finished), None));
        assert!(!missing_finish_time(&task(1, TaskStatus::Running), None));

        // normalization still yields a usable phase
        assert_eq!(
            unstamped.phase(),
            TaskPhase::Finished {
                finished_at: None,
                summary: None
            }
        );
    }
}
