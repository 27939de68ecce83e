//! Shared mocks for batch job integration tests
//!
//! Collaborators record what the job asked of them in a shared `MockState`, and
//! a `ManualClock` lets tests decide how much time each replica "takes".

#![allow(dead_code)]

use async_trait::async_trait;
use batch_replicator::error::{ReplicatorError, Result};
use batch_replicator::models::{CheckpointId, DerivedParams, ProducedItem, TemplateItem};
use batch_replicator::orchestration::ResumableBatchJob;
use batch_replicator::store::InMemoryCheckpointStore;
use batch_replicator::traits::{CheckpointStore, Clock, ItemResolver, Scheduler, UnitOfWork};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Reference of the template every harness can resolve
pub const TEMPLATE_REFERENCE: &str = "1234";

/// What the collaborators observed
#[derive(Debug, Default, Clone)]
pub struct MockState {
    /// Indices produced, in call order
    pub produced: Vec<u32>,
    /// Parameters of every produce call, in call order
    pub params: Vec<DerivedParams>,
    /// Resumes requested from the scheduler
    pub scheduled: Vec<(CheckpointId, DateTime<Utc>)>,
    /// Number of template lookups
    pub resolve_calls: usize,
}

pub type SharedState = Arc<Mutex<MockState>>;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
}

/// A one-hour booking starting at `epoch()`
pub fn template_item(reference: &str) -> TemplateItem {
    TemplateItem::new(reference, epoch(), epoch() + TimeDelta::hours(1))
        .with_attributes(serde_json::json!({ "resource_id": 42, "persons": 2 }))
}

/// Resolver backed by a fixed map of template items
pub struct MockResolver {
    items: HashMap<String, TemplateItem>,
    state: SharedState,
}

impl MockResolver {
    pub fn new(state: SharedState) -> Self {
        let mut items = HashMap::new();
        items.insert(TEMPLATE_REFERENCE.to_string(), template_item(TEMPLATE_REFERENCE));
        Self { items, state }
    }
}

#[async_trait]
impl ItemResolver for MockResolver {
    async fn resolve(&self, reference: &str) -> Option<TemplateItem> {
        self.state.lock().unwrap().resolve_calls += 1;
        self.items.get(reference).cloned()
    }
}

/// Records each replica and advances the clock by a fixed cost per replica
pub struct MockUnitOfWork {
    state: SharedState,
    clock: Arc<ManualClock>,
    cost_per_item: TimeDelta,
    fail_at: Option<u32>,
}

impl MockUnitOfWork {
    pub fn new(state: SharedState, clock: Arc<ManualClock>) -> Self {
        Self {
            state,
            clock,
            cost_per_item: TimeDelta::zero(),
            fail_at: None,
        }
    }

    pub fn with_cost_per_item(mut self, cost: TimeDelta) -> Self {
        self.cost_per_item = cost;
        self
    }

    pub fn failing_at(mut self, index: u32) -> Self {
        self.fail_at = Some(index);
        self
    }
}

#[async_trait]
impl UnitOfWork for MockUnitOfWork {
    async fn produce(
        &self,
        template: &TemplateItem,
        params: &DerivedParams,
    ) -> anyhow::Result<ProducedItem> {
        self.clock.advance(self.cost_per_item);

        if self.fail_at == Some(params.index) {
            anyhow::bail!("booking rejected for replica {}", params.index);
        }

        let mut state = self.state.lock().unwrap();
        state.produced.push(params.index);
        state.params.push(params.clone());
        Ok(ProducedItem {
            reference: format!("{}-{}", template.reference, params.index),
            index: params.index,
        })
    }
}

/// Scheduler that only records requests
pub struct RecordingScheduler {
    state: SharedState,
}

impl RecordingScheduler {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn schedule_resume(&self, id: &CheckpointId, earliest: DateTime<Utc>) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .scheduled
            .push((id.clone(), earliest));
        Ok(())
    }
}

/// Scheduler whose every request fails
pub struct FailingScheduler;

#[async_trait]
impl Scheduler for FailingScheduler {
    async fn schedule_resume(&self, _id: &CheckpointId, _earliest: DateTime<Utc>) -> Result<()> {
        Err(ReplicatorError::scheduling("cron facility unavailable"))
    }
}

/// A job wired to mocks, with handles on everything a test inspects
pub struct Harness {
    pub job: ResumableBatchJob,
    pub store: Arc<InMemoryCheckpointStore>,
    pub clock: Arc<ManualClock>,
    pub state: SharedState,
}

impl Harness {
    /// Replicas cost nothing; every run finishes in one invocation
    pub fn instant() -> Self {
        HarnessBuilder::new().build()
    }

    /// Each replica costs `seconds` of the invocation's budget
    pub fn with_cost(seconds: i64) -> Self {
        HarnessBuilder::new().cost_per_item(seconds).build()
    }

    pub fn produced(&self) -> Vec<u32> {
        self.state.lock().unwrap().produced.clone()
    }

    pub fn scheduled(&self) -> Vec<(CheckpointId, DateTime<Utc>)> {
        self.state.lock().unwrap().scheduled.clone()
    }

    pub fn resolve_calls(&self) -> usize {
        self.state.lock().unwrap().resolve_calls
    }
}

#[derive(Default)]
pub struct HarnessBuilder {
    cost_per_item: i64,
    fail_at: Option<u32>,
    failing_scheduler: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cost_per_item(mut self, seconds: i64) -> Self {
        self.cost_per_item = seconds;
        self
    }

    pub fn fail_at(mut self, index: u32) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn failing_scheduler(mut self) -> Self {
        self.failing_scheduler = true;
        self
    }

    pub fn build(self) -> Harness {
        let state: SharedState = Arc::new(Mutex::new(MockState::default()));
        let clock = Arc::new(ManualClock::new(epoch()));

        let mut unit_of_work = MockUnitOfWork::new(state.clone(), clock.clone())
            .with_cost_per_item(TimeDelta::seconds(self.cost_per_item));
        if let Some(index) = self.fail_at {
            unit_of_work = unit_of_work.failing_at(index);
        }

        let scheduler: Arc<dyn Scheduler> = if self.failing_scheduler {
            Arc::new(FailingScheduler)
        } else {
            Arc::new(RecordingScheduler::new(state.clone()))
        };

        let store = Arc::new(InMemoryCheckpointStore::default().with_clock(clock.clone()));
        let job = ResumableBatchJob::new(
            Arc::new(MockResolver::new(state.clone())),
            Arc::new(unit_of_work),
            store.clone() as Arc<dyn CheckpointStore>,
            scheduler,
        )
        .with_clock(clock.clone());

        Harness {
            job,
            store,
            clock,
            state,
        }
    }
}
