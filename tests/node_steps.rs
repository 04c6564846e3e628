use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use workplan::plan::{NodeStatus, PlanNode};
use workplan::remote::{OperationClient, OperationHandle, OperationState};
use workplan::steps::{Step, StepRegistry, StepTrigger, WorkItem, WorkItemKind};

/// In-process stand-in for the remote platform: every trigger returns a
/// RUNNING handle, and the first poll resolves it to a scripted outcome.
#[derive(Default)]
struct FakeRemote {
    outcomes: Mutex<HashMap<String, VecDeque<OperationState>>>,
    next_id: AtomicUsize,
    triggered: Mutex<Vec<String>>,
    fail_items: Vec<String>,
}

impl FakeRemote {
    fn arc() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn triggered(&self) -> Vec<String> {
        self.triggered.lock().unwrap().clone()
    }
}

#[async_trait]
impl StepTrigger for FakeRemote {
    async fn trigger(
        &self,
        work_item: &WorkItem,
        step: Step,
        _asynchronous: bool,
    ) -> anyhow::Result<Vec<OperationHandle>> {
        let id = format!("op-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.triggered
            .lock()
            .unwrap()
            .push(format!("{}:{}", work_item.name, step));
        let outcome = if self.fail_items.contains(&work_item.name) {
            OperationState::Failed
        } else {
            OperationState::Succeeded
        };
        self.outcomes
            .lock()
            .unwrap()
            .insert(id.clone(), VecDeque::from([outcome]));
        Ok(vec![OperationHandle::new(id, OperationState::Running)])
    }
}

#[async_trait]
impl OperationClient for FakeRemote {
    async fn poll(&self, handle: &OperationHandle) -> anyhow::Result<OperationHandle> {
        let state = self
            .outcomes
            .lock()
            .unwrap()
            .get_mut(&handle.id)
            .and_then(|q| q.pop_front())
            .unwrap_or(handle.state);
        Ok(OperationHandle::new(handle.id.clone(), state))
    }
}

fn node(kind: WorkItemKind) -> PlanNode {
    PlanNode::new(WorkItem::new("item", kind), 0, NodeStatus::Runnable)
}

#[tokio::test]
async fn two_step_node_reports_pending_after_first_step_succeeds() {
    let remote = FakeRemote::arc();
    let registry = StepRegistry::uniform(remote.clone());

    let n = node(WorkItemKind::MultiStepFixed);
    let n = n.run_next_step(&registry, false).await.unwrap();
    assert_eq!(n.status, NodeStatus::Running);
    assert_eq!(n.current_step, Some(Step::UpdateDataset));
    assert_eq!(n.steps_to_run, vec![Step::UpdateResults]);

    // Remote operation resolves to SUCCEEDED; a step remains, so the node
    // must report pending-next-step, not succeeded.
    let n = n.poll(remote.as_ref()).await.unwrap();
    assert_eq!(n.status, NodeStatus::PendingNextStep);
}

#[tokio::test]
async fn running_every_step_visits_sequence_in_order() {
    let remote = FakeRemote::arc();
    let registry = StepRegistry::uniform(remote.clone());

    let sequence = StepRegistry::sequence(WorkItemKind::ProfileThenPublish, false);
    let mut n = node(WorkItemKind::ProfileThenPublish);
    for _ in 0..sequence.len() {
        n = n.run_next_step(&registry, false).await.unwrap();
        n = n.poll(remote.as_ref()).await.unwrap();
    }

    assert_eq!(
        remote.triggered(),
        vec!["item:profile", "item:update_dataset", "item:publish"]
    );
    assert!(n.steps_to_run.is_empty());
    assert_eq!(n.status, NodeStatus::Succeeded);
    assert_eq!(n.operations.len(), sequence.len());
}

#[tokio::test]
async fn train_flag_selects_training_sequence() {
    let remote = FakeRemote::arc();
    let registry = StepRegistry::uniform(remote.clone());

    let n = node(WorkItemKind::MultiStepTrainable);
    let n = n.run_next_step(&registry, true).await.unwrap();
    assert_eq!(n.steps_to_run, vec![Step::Train, Step::UpdateResults]);

    let n2 = node(WorkItemKind::MultiStepTrainable);
    let n2 = n2.run_next_step(&registry, false).await.unwrap();
    assert_eq!(n2.steps_to_run, vec![Step::UpdateResults]);
}

#[tokio::test]
async fn worst_status_wins_across_history() {
    let remote = Arc::new(FakeRemote {
        fail_items: vec!["item".to_string()],
        ..FakeRemote::default()
    });
    let registry = StepRegistry::uniform(remote.clone());

    // First step succeeds by hand-editing the scripted outcome.
    let n = node(WorkItemKind::MultiStepFixed);
    let n = n.run_next_step(&registry, false).await.unwrap();
    {
        let mut outcomes = remote.outcomes.lock().unwrap();
        let op_id = &n.current_operation.as_ref().unwrap().id;
        outcomes.insert(op_id.clone(), VecDeque::from([OperationState::Succeeded]));
    }
    let n = n.poll(remote.as_ref()).await.unwrap();
    assert_eq!(n.status, NodeStatus::PendingNextStep);

    // Second step fails: one SUCCEEDED and one FAILED in history reduce
    // to FAILED.
    let n = n.run_next_step(&registry, false).await.unwrap();
    let n = n.poll(remote.as_ref()).await.unwrap();
    assert_eq!(n.status, NodeStatus::Failed);
    assert_eq!(n.operations.len(), 2);
}

#[tokio::test]
async fn poll_without_current_operation_is_identity() {
    let remote = FakeRemote::arc();
    let n = node(WorkItemKind::SingleStep).with_status(NodeStatus::Blocked);
    let polled = n.poll(remote.as_ref()).await.unwrap();
    // Externally forced statuses stick.
    assert_eq!(polled, n);
}

#[tokio::test]
async fn terminal_operation_is_not_repolled() {
    let remote = FakeRemote::arc();
    let registry = StepRegistry::uniform(remote.clone());

    let n = node(WorkItemKind::SingleStep);
    let n = n.run_next_step(&registry, false).await.unwrap();
    let n = n.poll(remote.as_ref()).await.unwrap();
    assert_eq!(n.status, NodeStatus::Succeeded);

    // Script a contradictory outcome for the finished operation. A
    // terminal state cannot change, so the next poll must not reach the
    // remote at all and the node stays succeeded.
    {
        let mut outcomes = remote.outcomes.lock().unwrap();
        let op_id = &n.current_operation.as_ref().unwrap().id;
        outcomes.insert(op_id.clone(), VecDeque::from([OperationState::Failed]));
    }
    let polled = n.poll(remote.as_ref()).await.unwrap();
    assert_eq!(polled, n);
}

#[tokio::test]
async fn run_next_step_past_end_is_an_error() {
    let remote = FakeRemote::arc();
    let registry = StepRegistry::uniform(remote.clone());

    let mut n = node(WorkItemKind::SingleStep);
    n = n.run_next_step(&registry, false).await.unwrap();
    n = n.poll(remote.as_ref()).await.unwrap();
    assert_eq!(n.status, NodeStatus::Succeeded);

    assert!(n.run_next_step(&registry, false).await.is_err());
}
