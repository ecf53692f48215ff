//! Ranking reconciliation engine.
//!
//! Drives the per-list state machine that ties a mutation (add,
//! remove, reorder) to a ranking batch:
//!
//! 1. apply the mutation synchronously and mark every non-errored
//!    task pending, clearing stale ranks
//! 2. persist that intermediate state so consumers can render the new
//!    order and pending markers before any network round trip
//! 3. submit the batch to the oracle (skipped when empty)
//! 4. validate the response; apply ranks or error every pending task
//! 5. recompute display order and persist unconditionally
//!
//! Each batch carries a monotonically increasing sequence number per
//! list; a response that arrives after a newer batch was issued is
//! discarded, never applied. Batches are terminal: no automatic retry,
//! the user retries by triggering another mutation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use uuid::Uuid;

use crate::oracle::RankingOracle;
use crate::rank::{build_batch, sort_for_display, validate_response};
use crate::store::{now_string, TaskStore};
use crate::task::{ListError, Task, TaskError, TaskId, TaskList};

/// Capacity of the event channel; slow subscribers lose old events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Errors surfaced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no open list {0}")]
    UnknownList(Uuid),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    List(#[from] ListError),

    #[error("storage error: {0}")]
    Store(String),
}

/// How a ranking batch settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every pending task received a validated rank
    Ranked,
    /// The batch failed as a whole; its pending tasks are now errored
    Failed { reason: String },
    /// Nothing was eligible for ranking; the mutation settled at once
    Empty,
    /// A newer batch superseded this one; its result was discarded
    Superseded,
}

/// State-transition events published to subscribers.
#[derive(Debug, Clone)]
pub enum ListEvent {
    /// The display order changed (intermediate or final)
    OrderChanged { list_id: Uuid, order: Vec<TaskId> },
    /// A non-empty batch was submitted to the oracle
    BatchStarted { list_id: Uuid, seq: u64, size: usize },
    /// A batch settled (or was discarded as superseded)
    BatchSettled {
        list_id: Uuid,
        seq: u64,
        outcome: BatchOutcome,
    },
}

/// Result of one mutation, after its batch settled.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// Snapshot of the list in final display order
    pub tasks: Vec<Task>,
    pub outcome: BatchOutcome,
}

struct ListState {
    list: TaskList,
    /// Sequence number of the most recent batch issued for this list
    seq: u64,
}

type TodayFn = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// The reconciliation engine. One instance serves many lists; each
/// list's reconciliation is independent, guarded by its own lock.
pub struct RankEngine {
    oracle: Arc<dyn RankingOracle>,
    store: Arc<dyn TaskStore>,
    lists: RwLock<HashMap<Uuid, Arc<Mutex<ListState>>>>,
    events: broadcast::Sender<ListEvent>,
    today: TodayFn,
}

impl RankEngine {
    pub fn new(oracle: Arc<dyn RankingOracle>, store: Arc<dyn TaskStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            oracle,
            store,
            lists: RwLock::new(HashMap::new()),
            events,
            today: Arc::new(|| Utc::now().date_naive()),
        }
    }

    /// Override the source of "today" (deterministic tests).
    pub fn with_today_fn(mut self, f: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(f);
        self
    }

    /// Subscribe to state-transition events.
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    /// Create an empty list and persist it.
    pub async fn create_list(&self, name: &str) -> Result<Uuid, EngineError> {
        let list = TaskList::new(name);
        let id = list.id;
        self.store
            .save_list(&list)
            .await
            .map_err(EngineError::Store)?;
        self.lists
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(ListState { list, seq: 0 })));
        tracing::info!("created list {} ({})", name, id);
        Ok(id)
    }

    /// Open a persisted list for reconciliation.
    ///
    /// Returns the stored tasks as-is; no batch is triggered by
    /// opening (a reload reflects the last persisted outcome).
    pub async fn open_list(&self, list_id: Uuid) -> Result<Vec<Task>, EngineError> {
        if let Some(state) = self.lists.read().await.get(&list_id).cloned() {
            return Ok(state.lock().await.list.tasks.clone());
        }
        let list = self
            .store
            .load_list(list_id)
            .await
            .map_err(EngineError::Store)?
            .ok_or(EngineError::UnknownList(list_id))?;
        let state = {
            let mut lists = self.lists.write().await;
            // a concurrent open may have inserted the entry already
            lists
                .entry(list_id)
                .or_insert_with(|| Arc::new(Mutex::new(ListState { list, seq: 0 })))
                .clone()
        };
        let tasks = state.lock().await.list.tasks.clone();
        Ok(tasks)
    }

    /// Snapshot of a list's current tasks in display order.
    pub async fn tasks(&self, list_id: Uuid) -> Result<Vec<Task>, EngineError> {
        let state = self
            .lists
            .read()
            .await
            .get(&list_id)
            .cloned()
            .ok_or(EngineError::UnknownList(list_id))?;
        let state = state.lock().await;
        Ok(state.list.tasks.clone())
    }

    /// Insert a new task at the head of the order and re-rank.
    ///
    /// Plan limits on task count are a caller-side precondition; the
    /// engine assumes they were already checked.
    pub async fn add_task(
        &self,
        list_id: Uuid,
        text: &str,
        due_date: Option<NaiveDate>,
    ) -> Result<MutationOutcome, EngineError> {
        let task = Task::new(text, due_date)?;
        self.mutate(list_id, move |list| {
            list.insert_front(task)?;
            Ok(())
        })
        .await
    }

    /// Remove a task by id and re-rank the survivors.
    pub async fn remove_task(
        &self,
        list_id: Uuid,
        task_id: TaskId,
    ) -> Result<MutationOutcome, EngineError> {
        self.mutate(list_id, move |list| {
            list.remove(task_id)?;
            Ok(())
        })
        .await
    }

    /// Move a task from index `from` to index `to` and re-rank.
    pub async fn move_task(
        &self,
        list_id: Uuid,
        from: usize,
        to: usize,
    ) -> Result<MutationOutcome, EngineError> {
        self.mutate(list_id, move |list| {
            list.move_task(from, to)?;
            Ok(())
        })
        .await
    }

    /// Run one mutation through the reconciliation pipeline.
    async fn mutate<F>(&self, list_id: Uuid, op: F) -> Result<MutationOutcome, EngineError>
    where
        F: FnOnce(&mut TaskList) -> Result<(), EngineError>,
    {
        let state_arc = self
            .lists
            .read()
            .await
            .get(&list_id)
            .cloned()
            .ok_or(EngineError::UnknownList(list_id))?;

        // Phase 1: apply the mutation, mark the batch pending, and
        // persist the intermediate state before any network wait. Only
        // this list's lock is held, so other lists reconcile freely.
        let mut state = state_arc.lock().await;
        op(&mut state.list)?;

        for task in state.list.tasks.iter_mut() {
            if !task.is_errored() {
                task.mark_pending();
            }
        }
        state.seq += 1;
        let seq = state.seq;
        let today = (self.today)();

        // The batch order is the manipulation order at the instant
        // of the mutation, captured before the display sort.
        let batch = build_batch(&state.list.tasks);
        sort_for_display(&mut state.list.tasks, today);
        state.list.updated_at = now_string();
        self.store
            .save_list(&state.list)
            .await
            .map_err(EngineError::Store)?;
        self.emit_order(&state.list);

        if batch.is_empty() {
            tracing::debug!("list {}: empty batch, mutation settles immediately", list_id);
            let _ = self.events.send(ListEvent::BatchSettled {
                list_id,
                seq,
                outcome: BatchOutcome::Empty,
            });
            return Ok(MutationOutcome {
                tasks: state.list.tasks.clone(),
                outcome: BatchOutcome::Empty,
            });
        }
        let _ = self.events.send(ListEvent::BatchStarted {
            list_id,
            seq,
            size: batch.len(),
        });
        drop(state);

        // Phase 2: the only suspension point. The list lock is not
        // held here, so newer mutations can proceed and supersede us.
        let result = self.oracle.rank(&batch, today).await;

        // Phase 3: settle, guarded by the batch sequence number.
        let mut state = state_arc.lock().await;
        if state.seq != seq {
            tracing::debug!(
                "list {}: discarding superseded batch {} (current is {})",
                list_id,
                seq,
                state.seq
            );
            let _ = self.events.send(ListEvent::BatchSettled {
                list_id,
                seq,
                outcome: BatchOutcome::Superseded,
            });
            return Ok(MutationOutcome {
                tasks: state.list.tasks.clone(),
                outcome: BatchOutcome::Superseded,
            });
        }

        let outcome = match result {
            Ok(raw) => match validate_response(&batch, &raw) {
                Ok(mapping) => {
                    for task in state.list.tasks.iter_mut().filter(|t| t.is_pending()) {
                        match mapping.get(&task.id) {
                            Some(assignment) => {
                                task.apply_rank(assignment.rank, assignment.justification.clone());
                            }
                            // Unreachable with a complete bijection, but no
                            // task may stay pending once its batch settles.
                            None => task.fail("oracle omitted this task"),
                        }
                    }
                    tracing::info!("list {}: batch {} ranked {} tasks", list_id, seq, batch.len());
                    BatchOutcome::Ranked
                }
                Err(e) => {
                    tracing::warn!(
                        "list {}: batch {} rejected ({}): {}",
                        list_id,
                        seq,
                        e.code(),
                        e
                    );
                    let reason = format!("{}: {}", e.code(), e);
                    for task in state.list.tasks.iter_mut().filter(|t| t.is_pending()) {
                        task.fail(reason.clone());
                    }
                    BatchOutcome::Failed { reason }
                }
            },
            Err(e) => {
                tracing::warn!("list {}: batch {} transport failure: {}", list_id, seq, e);
                let reason = format!("transport: {}", e);
                for task in state.list.tasks.iter_mut().filter(|t| t.is_pending()) {
                    task.fail(reason.clone());
                }
                BatchOutcome::Failed { reason }
            }
        };

        // Final order: with every non-errored task ranked this is pure
        // rank order; otherwise the fallback criteria take over.
        sort_for_display(&mut state.list.tasks, today);
        state.list.updated_at = now_string();
        // Persist the settled state unconditionally so a reload shows
        // the outcome rather than stale pending markers.
        self.store
            .save_list(&state.list)
            .await
            .map_err(EngineError::Store)?;
        self.emit_order(&state.list);
        let _ = self.events.send(ListEvent::BatchSettled {
            list_id,
            seq,
            outcome: outcome.clone(),
        });

        Ok(MutationOutcome {
            tasks: state.list.tasks.clone(),
            outcome,
        })
    }

    fn emit_order(&self, list: &TaskList) {
        let _ = self.events.send(ListEvent::OrderChanged {
            list_id: list.id,
            order: list.tasks.iter().map(|t| t.id).collect(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use crate::rank::RankInput;
    use crate::store::InMemoryTaskStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()
    }

    fn yesterday() -> NaiveDate {
        today() - chrono::Duration::days(1)
    }

    /// One scripted oracle behavior per call.
    enum Script {
        /// Valid response ranking the batch in submission order
        Identity,
        /// Fixed raw text
        Raw(String),
        /// Transport failure
        Fail(OracleError),
        /// Park until the test releases the call with an inner script
        Hold(oneshot::Receiver<Box<Script>>),
    }

    struct ScriptedOracle {
        scripts: StdMutex<VecDeque<Script>>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                scripts: StdMutex::new(VecDeque::new()),
                calls: AtomicUsize::new(0),
            })
        }

        fn push(&self, script: Script) {
            self.scripts.lock().unwrap().push_back(script);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn identity_response(batch: &[RankInput]) -> String {
            let items: Vec<serde_json::Value> = batch
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    json!({"id": t.id.to_string(), "rank": i + 1, "justification": "as ordered"})
                })
                .collect();
            serde_json::Value::Array(items).to_string()
        }

        fn apply(script: Script, batch: &[RankInput]) -> Result<String, OracleError> {
            match script {
                Script::Identity => Ok(Self::identity_response(batch)),
                Script::Raw(raw) => Ok(raw),
                Script::Fail(err) => Err(err),
                Script::Hold(_) => unreachable!("nested hold"),
            }
        }
    }

    #[async_trait]
    impl RankingOracle for ScriptedOracle {
        async fn rank(
            &self,
            batch: &[RankInput],
            _today: NaiveDate,
        ) -> Result<String, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Script::Identity);
            match script {
                Script::Hold(rx) => {
                    let inner = rx.await.expect("hold release");
                    Self::apply(*inner, batch)
                }
                other => Self::apply(other, batch),
            }
        }
    }

    fn engine_with(oracle: Arc<ScriptedOracle>) -> (RankEngine, Arc<InMemoryTaskStore>) {
        let store = Arc::new(InMemoryTaskStore::new());
        let engine = RankEngine::new(oracle, store.clone()).with_today_fn(today);
        (engine, store)
    }

    #[tokio::test]
    async fn test_add_ranks_and_persists() {
        let oracle = ScriptedOracle::new();
        let (engine, store) = engine_with(oracle.clone());
        let list_id = engine.create_list("inbox").await.unwrap();

        let outcome = engine.add_task(list_id, "write report", None).await.unwrap();
        assert_eq!(outcome.outcome, BatchOutcome::Ranked);
        assert_eq!(outcome.tasks.len(), 1);
        assert!(outcome.tasks[0].is_ranked());
        assert_eq!(outcome.tasks[0].rank, Some(1));
        assert_eq!(oracle.calls(), 1);

        let persisted = store.load_list(list_id).await.unwrap().unwrap();
        assert_eq!(persisted.tasks, outcome.tasks);
    }

    #[tokio::test]
    async fn test_add_to_unknown_list_fails() {
        let oracle = ScriptedOracle::new();
        let (engine, _store) = engine_with(oracle);
        let err = engine
            .add_task(Uuid::new_v4(), "orphan", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownList(_)));
    }

    #[tokio::test]
    async fn test_empty_text_rejected_before_any_batch() {
        let oracle = ScriptedOracle::new();
        let (engine, _store) = engine_with(oracle.clone());
        let list_id = engine.create_list("inbox").await.unwrap();
        let err = engine.add_task(list_id, "   ", None).await.unwrap_err();
        assert!(matches!(err, EngineError::Task(TaskError::EmptyText)));
        assert_eq!(oracle.calls(), 0);
    }

    /// Scenario: a two-task batch where the oracle elevates the
    /// overdue task; both settle ranked and order follows rank.
    #[tokio::test]
    async fn test_oracle_ranks_overdue_task_first() {
        let oracle = ScriptedOracle::new();
        let (engine, _store) = engine_with(oracle.clone());
        let list_id = engine.create_list("inbox").await.unwrap();

        engine.add_task(list_id, "task b", Some(yesterday())).await.unwrap();
        engine.add_task(list_id, "task a", None).await.unwrap();

        // current order is [a, b]; a was added last and sits on top
        let tasks = engine.tasks(list_id).await.unwrap();
        let a = tasks.iter().find(|t| t.text == "task a").unwrap().id;
        let b = tasks.iter().find(|t| t.text == "task b").unwrap().id;
        assert_eq!(tasks[0].id, a);

        oracle.push(Script::Raw(
            json!([
                {"id": b.to_string(), "rank": 1, "justification": "overdue"},
                {"id": a.to_string(), "rank": 2, "justification": "later"},
            ])
            .to_string(),
        ));
        let outcome = engine.move_task(list_id, 0, 0).await.unwrap();

        assert_eq!(outcome.outcome, BatchOutcome::Ranked);
        assert_eq!(outcome.tasks[0].id, b);
        assert_eq!(outcome.tasks[1].id, a);
        assert!(outcome.tasks.iter().all(|t| t.is_ranked()));
        assert_eq!(outcome.tasks[0].justification.as_deref(), Some("overdue"));
    }

    /// Scenario: duplicate ranks invalidate the whole batch; both
    /// tasks error out and the fallback comparator takes over, putting
    /// the overdue task first.
    #[tokio::test]
    async fn test_duplicate_rank_fails_batch_and_falls_back() {
        let oracle = ScriptedOracle::new();
        let (engine, _store) = engine_with(oracle.clone());
        let list_id = engine.create_list("inbox").await.unwrap();

        engine.add_task(list_id, "task b", Some(yesterday())).await.unwrap();
        engine.add_task(list_id, "task a", None).await.unwrap();
        let tasks = engine.tasks(list_id).await.unwrap();
        let a = tasks.iter().find(|t| t.text == "task a").unwrap().id;
        let b = tasks.iter().find(|t| t.text == "task b").unwrap().id;

        oracle.push(Script::Raw(
            json!([
                {"id": b.to_string(), "rank": 1, "justification": "overdue"},
                {"id": a.to_string(), "rank": 1, "justification": "also first"},
            ])
            .to_string(),
        ));
        let outcome = engine.move_task(list_id, 0, 0).await.unwrap();

        match &outcome.outcome {
            BatchOutcome::Failed { reason } => assert!(reason.contains("duplicate-rank")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(outcome.tasks.iter().all(|t| t.is_errored()));
        assert!(outcome.tasks[0]
            .error_reason()
            .unwrap()
            .contains("duplicate-rank"));
        // fallback: overdue b sorts before dateless a
        assert_eq!(outcome.tasks[0].id, b);
        assert_eq!(outcome.tasks[1].id, a);
    }

    /// Scenario: a short response is an incomplete permutation; all
    /// three tasks error, none stays pending.
    #[tokio::test]
    async fn test_short_response_errors_every_task() {
        let oracle = ScriptedOracle::new();
        let (engine, _store) = engine_with(oracle.clone());
        let list_id = engine.create_list("inbox").await.unwrap();
        for text in ["one", "two"] {
            engine.add_task(list_id, text, None).await.unwrap();
        }

        let tasks = engine.tasks(list_id).await.unwrap();
        oracle.push(Script::Raw(
            json!([
                {"id": tasks[0].id.to_string(), "rank": 1, "justification": "only"},
                {"id": tasks[1].id.to_string(), "rank": 2, "justification": "two"},
            ])
            .to_string(),
        ));
        let outcome = engine.add_task(list_id, "three", None).await.unwrap();

        match &outcome.outcome {
            BatchOutcome::Failed { reason } => {
                assert!(reason.contains("incomplete-permutation"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(outcome.tasks.len(), 3);
        assert!(outcome.tasks.iter().all(|t| t.is_errored()));
        assert!(!outcome.tasks.iter().any(|t| t.is_pending()));
    }

    #[tokio::test]
    async fn test_transport_failure_errors_pending_tasks() {
        let oracle = ScriptedOracle::new();
        let (engine, store) = engine_with(oracle.clone());
        let list_id = engine.create_list("inbox").await.unwrap();

        oracle.push(Script::Fail(OracleError::server_error(
            503,
            "overloaded".to_string(),
        )));
        let outcome = engine.add_task(list_id, "doomed", None).await.unwrap();

        assert!(matches!(outcome.outcome, BatchOutcome::Failed { .. }));
        assert!(outcome.tasks[0].error_reason().unwrap().contains("transport"));

        // the failed state is persisted, not the stale pending marker
        let persisted = store.load_list(list_id).await.unwrap().unwrap();
        assert!(persisted.tasks[0].is_errored());
    }

    /// Scenario: removing the last non-errored task leaves an empty
    /// eligible batch; no oracle call is made and the removal persists.
    #[tokio::test]
    async fn test_remove_last_eligible_task_skips_oracle() {
        let oracle = ScriptedOracle::new();
        let (engine, store) = engine_with(oracle.clone());
        let list_id = engine.create_list("inbox").await.unwrap();

        oracle.push(Script::Fail(OracleError::network_error("down".to_string())));
        engine.add_task(list_id, "broken one", None).await.unwrap();
        oracle.push(Script::Fail(OracleError::network_error("down".to_string())));
        engine.add_task(list_id, "broken two", None).await.unwrap();
        engine.add_task(list_id, "survivor", None).await.unwrap();

        let tasks = engine.tasks(list_id).await.unwrap();
        let survivor = tasks.iter().find(|t| t.text == "survivor").unwrap().id;
        let calls_before = oracle.calls();

        let outcome = engine.remove_task(list_id, survivor).await.unwrap();
        assert_eq!(outcome.outcome, BatchOutcome::Empty);
        assert_eq!(oracle.calls(), calls_before);
        assert_eq!(outcome.tasks.len(), 2);
        assert!(outcome.tasks.iter().all(|t| t.is_errored()));

        let persisted = store.load_list(list_id).await.unwrap().unwrap();
        assert_eq!(persisted.tasks.len(), 2);
    }

    /// Scenario: a reorder goes pending while the oracle is slow; a
    /// second mutation supersedes it, and the late response from the
    /// first batch is discarded rather than applied.
    #[tokio::test]
    async fn test_superseded_batch_result_is_discarded() {
        let oracle = ScriptedOracle::new();
        let (engine, _store) = engine_with(oracle.clone());
        let engine = Arc::new(engine);
        let list_id = engine.create_list("inbox").await.unwrap();
        for text in ["t3", "t2", "t1", "t0"] {
            engine.add_task(list_id, text, None).await.unwrap();
        }
        let before: Vec<TaskId> = engine
            .tasks(list_id)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        let calls_before = oracle.calls();

        // first mutation parks inside the oracle call
        let (release, held) = oneshot::channel();
        oracle.push(Script::Hold(held));
        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.move_task(list_id, 2, 0).await })
        };
        while oracle.calls() == calls_before {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // intermediate state: new order, everything pending
        let mid = engine.tasks(list_id).await.unwrap();
        assert!(mid.iter().all(|t| t.is_pending()));
        let mid_order: Vec<TaskId> = mid.iter().map(|t| t.id).collect();
        assert_eq!(mid_order, vec![before[2], before[0], before[1], before[3]]);

        // second mutation supersedes the first and settles normally
        let second = engine.move_task(list_id, 0, 1).await.unwrap();
        assert_eq!(second.outcome, BatchOutcome::Ranked);

        // release the first batch with a response that would have been
        // valid for it; it must be discarded
        release.send(Box::new(Script::Identity)).ok();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first.outcome, BatchOutcome::Superseded);

        let final_tasks = engine.tasks(list_id).await.unwrap();
        assert_eq!(final_tasks, second.tasks);
    }

    #[tokio::test]
    async fn test_lists_reconcile_independently() {
        let oracle = ScriptedOracle::new();
        let (engine, _store) = engine_with(oracle.clone());
        let engine = Arc::new(engine);
        let list_a = engine.create_list("alpha").await.unwrap();
        let list_b = engine.create_list("beta").await.unwrap();

        // park a batch for the first list inside the oracle call
        let (release, held) = oneshot::channel();
        oracle.push(Script::Hold(held));
        let slow = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.add_task(list_a, "parked", None).await })
        };
        while oracle.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // the other list's mutation settles while the first is in flight
        let outcome = engine.add_task(list_b, "independent", None).await.unwrap();
        assert_eq!(outcome.outcome, BatchOutcome::Ranked);

        release.send(Box::new(Script::Identity)).ok();
        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow.outcome, BatchOutcome::Ranked);
    }

    #[tokio::test]
    async fn test_open_list_restores_persisted_state() {
        let oracle = ScriptedOracle::new();
        let store = Arc::new(InMemoryTaskStore::new());
        let list_id = {
            let engine = RankEngine::new(oracle.clone(), store.clone()).with_today_fn(today);
            let list_id = engine.create_list("inbox").await.unwrap();
            engine.add_task(list_id, "keep me", None).await.unwrap();
            list_id
        };

        let engine = RankEngine::new(oracle, store).with_today_fn(today);
        let tasks = engine.open_list(list_id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "keep me");
        assert!(tasks[0].is_ranked());

        let missing = engine.open_list(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(missing, EngineError::UnknownList(_)));
    }

    #[tokio::test]
    async fn test_mutation_emits_lifecycle_events() {
        let oracle = ScriptedOracle::new();
        let (engine, _store) = engine_with(oracle);
        let list_id = engine.create_list("inbox").await.unwrap();
        let mut events = engine.subscribe();

        engine.add_task(list_id, "watched", None).await.unwrap();

        let mut saw_started = false;
        let mut saw_settled = false;
        let mut saw_order = false;
        while let Ok(event) = events.try_recv() {
            match event {
                ListEvent::BatchStarted { seq, size, .. } => {
                    assert_eq!(seq, 1);
                    assert_eq!(size, 1);
                    saw_started = true;
                }
                ListEvent::BatchSettled { outcome, .. } => {
                    assert_eq!(outcome, BatchOutcome::Ranked);
                    saw_settled = true;
                }
                ListEvent::OrderChanged { order, .. } => {
                    assert_eq!(order.len(), 1);
                    saw_order = true;
                }
            }
        }
        assert!(saw_started && saw_settled && saw_order);
    }

    #[tokio::test]
    async fn test_reranking_clears_previous_error_state_never() {
        // errored tasks are excluded from new batches and keep their
        // reason until removed
        let oracle = ScriptedOracle::new();
        let (engine, _store) = engine_with(oracle.clone());
        let list_id = engine.create_list("inbox").await.unwrap();

        oracle.push(Script::Fail(OracleError::network_error("down".to_string())));
        engine.add_task(list_id, "failed", None).await.unwrap();
        let outcome = engine.add_task(list_id, "fresh", None).await.unwrap();

        assert_eq!(outcome.outcome, BatchOutcome::Ranked);
        let failed = outcome.tasks.iter().find(|t| t.text == "failed").unwrap();
        let fresh = outcome.tasks.iter().find(|t| t.text == "fresh").unwrap();
        assert!(failed.is_errored());
        assert!(fresh.is_ranked());
        // only the fresh task was in the second batch
        assert_eq!(fresh.rank, Some(1));
    }

    #[tokio::test]
    async fn test_sequence_numbers_increase_per_mutation() {
        let oracle = ScriptedOracle::new();
        let (engine, _store) = engine_with(oracle);
        let list_id = engine.create_list("inbox").await.unwrap();
        let mut events = engine.subscribe();

        engine.add_task(list_id, "one", None).await.unwrap();
        engine.add_task(list_id, "two", None).await.unwrap();

        let mut seqs = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let ListEvent::BatchStarted { seq, .. } = event {
                seqs.push(seq);
            }
        }
        assert_eq!(seqs, vec![1, 2]);
    }
}
