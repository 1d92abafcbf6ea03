//! Reconciler - Interruptible diff of element trees against the host tree.
//!
//! # Pipeline
//!
//! ```text
//! render()/schedule_update() → UpdateQueue → work loop (one fiber per check)
//!     → begin (diff children) → complete (collect effects) → commit (host)
//! ```
//!
//! ## Data Flow
//!
//! 1. **Entry points** enqueue a request and arm the idle task
//! 2. **perform_work** runs one granted slice: pops a request when no cycle is
//!    in progress, then advances fibers until the deadline probe says stop
//! 3. **begin** diffs one fiber's new children against its alternate's
//! 4. **complete** hands the fiber's effects (and its own) to its parent
//! 5. **commit** applies the root's effect list in order and swaps the anchor
//!
//! ## Key Design Principles
//!
//! - **One fiber per budget check**: a slice stops only between units of work,
//!   so resuming never sees a half-processed fiber
//! - **Committed tree is read-only**: the next tree is built from fresh records
//!   beside it; the few writes it receives are journaled and rolled back if the
//!   cycle aborts
//! - **Commit is atomic with respect to slicing**: once started it finishes in
//!   the same slice

mod begin;
mod commit;
mod complete;
mod journal;
mod queue;
mod work_loop;

pub use commit::{AppliedEffect, CommitReport};
pub use queue::{UpdateQueue, UpdateRequest};

use std::collections::HashMap;

use crate::component::{ComponentRegistry, ComponentRuntime};
use crate::config::ReconcilerConfig;
use crate::engine::{Fiber, FiberArena, FiberId};
use crate::error::ReconcileError;
use crate::renderer::HostRenderer;
use crate::scheduler::{Deadline, IdleTask, SliceDeadline};
use crate::types::{Children, HostNodeId, InstanceId, State};

use journal::CycleJournal;

// =============================================================================
// Slice Reporting
// =============================================================================

bitflags::bitflags! {
    /// What happened during one granted slice.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SliceStatus: u8 {
        /// A request was popped and a new cycle began.
        const STARTED_CYCLE = 1 << 0;
        /// Time ran out with a unit of work still pending.
        const YIELDED = 1 << 1;
        /// A cycle was committed to the host.
        const COMMITTED = 1 << 2;
        /// The cycle in progress was discarded after an error.
        const ABORTED = 1 << 3;
        /// Another slice was requested.
        const MORE_WORK = 1 << 4;
    }
}

/// Outcome of [`Reconciler::perform_work`].
#[derive(Debug, Clone, Default)]
pub struct SliceReport {
    pub status: SliceStatus,
    /// Fibers that went through begin during this slice.
    pub units_of_work: usize,
    pub commit: Option<CommitReport>,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Reconciler context: every piece of mutable reconciliation state.
///
/// Owned by whoever calls [`render`](Self::render). Nothing is global, so
/// independent reconcilers can coexist on one thread.
///
/// # Example
///
/// ```ignore
/// let mut host = MemoryHost::new();
/// let container = host.create_container("root");
/// let mut reconciler = Reconciler::new(host, ComponentRegistry::new());
///
/// reconciler.render(Element::host("div", PropMap::new(), Children::None), container);
/// reconciler.flush()?;
/// ```
pub struct Reconciler<H, R = ComponentRegistry> {
    pub(crate) config: ReconcilerConfig,
    pub(crate) host: H,
    pub(crate) runtime: R,
    pub(crate) fibers: FiberArena,
    pub(crate) queue: UpdateQueue,
    pub(crate) idle: IdleTask,
    /// Last committed root per container.
    pub(crate) anchors: HashMap<HostNodeId, FiberId>,
    pub(crate) next_unit_of_work: Option<FiberId>,
    pub(crate) pending_commit: Option<FiberId>,
    pub(crate) journal: CycleJournal,
}

impl<H: HostRenderer, R: ComponentRuntime> Reconciler<H, R> {
    pub fn new(host: H, runtime: R) -> Self {
        Self::with_config(host, runtime, ReconcilerConfig::default())
    }

    pub fn with_config(host: H, runtime: R, config: ReconcilerConfig) -> Self {
        Self {
            config,
            host,
            runtime,
            fibers: FiberArena::new(),
            queue: UpdateQueue::new(),
            idle: IdleTask::new(),
            anchors: HashMap::new(),
            next_unit_of_work: None,
            pending_commit: None,
            journal: CycleJournal::default(),
        }
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Mount or update `children` under `container`.
    ///
    /// Fire-and-forget: the work happens in later slices.
    pub fn render(&mut self, children: impl Into<Children>, container: HostNodeId) {
        self.queue.push(UpdateRequest::RootRender {
            container,
            children: children.into(),
        });
        log::trace!("queued render into {container}");
        self.idle.request();
    }

    /// Re-render `instance` with `patch` shallow-merged into its state.
    ///
    /// Fire-and-forget. An instance that is no longer mounted when the request
    /// is reached makes that slice fail with
    /// [`ReconcileError::DetachedInstanceUpdate`].
    pub fn schedule_update(&mut self, instance: InstanceId, patch: State) {
        self.queue.push(UpdateRequest::StateUpdate { instance, patch });
        log::trace!("queued state update for {instance}");
        self.idle.request();
    }

    // =========================================================================
    // Slices
    // =========================================================================

    /// Run one granted slice.
    ///
    /// Errors abort the cycle in progress (if any) and are returned here;
    /// the previously committed tree stays in place. Remaining queued work
    /// still re-arms the idle task.
    pub fn perform_work(&mut self, deadline: &dyn Deadline) -> Result<SliceReport, ReconcileError> {
        self.idle.take();

        let mut report = SliceReport::default();
        let outcome = self.work_loop(deadline, &mut report);

        if let Err(err) = &outcome {
            if self.is_cycle_in_progress() {
                log::warn!("aborting cycle: {err}");
                self.abort_cycle();
                report.status |= SliceStatus::ABORTED;
            } else {
                log::warn!("dropped request: {err}");
            }
        }

        if self.has_pending_work() {
            self.idle.request();
            report.status |= SliceStatus::MORE_WORK;
        }

        outcome.map(|()| report)
    }

    /// Grant wall-clock slices of `config.slice` until no work remains.
    ///
    /// Returns the commit reports in commit order. Stops at the first error;
    /// work still queued after it can be flushed again.
    pub fn flush(&mut self) -> Result<Vec<CommitReport>, ReconcileError> {
        self.config.validate()?;

        let mut commits = Vec::new();
        while self.idle.is_armed() {
            let deadline = SliceDeadline::new(self.config.slice);
            let report = self.perform_work(&deadline)?;
            commits.extend(report.commit);
        }
        Ok(commits)
    }

    // =========================================================================
    // State Queries
    // =========================================================================

    /// Whether the host should grant another slice.
    pub fn wants_slice(&self) -> bool {
        self.idle.is_armed()
    }

    /// Queued requests or a cycle under construction.
    pub fn has_pending_work(&self) -> bool {
        self.is_cycle_in_progress() || !self.queue.is_empty()
    }

    pub fn is_cycle_in_progress(&self) -> bool {
        self.next_unit_of_work.is_some() || self.pending_commit.is_some()
    }

    pub fn queued_requests(&self) -> usize {
        self.queue.len()
    }

    /// Root fiber of the last tree committed into `container`.
    pub fn anchor(&self, container: HostNodeId) -> Option<FiberId> {
        self.anchors.get(&container).copied()
    }

    pub fn fibers(&self) -> &FiberArena {
        &self.fibers
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    // =========================================================================
    // Fiber Access
    // =========================================================================

    pub(crate) fn fiber(&self, id: FiberId) -> Result<&Fiber, ReconcileError> {
        self.fibers.get(id).ok_or(ReconcileError::StaleFiber(id))
    }

    pub(crate) fn fiber_mut(&mut self, id: FiberId) -> Result<&mut Fiber, ReconcileError> {
        self.fibers.get_mut(id).ok_or(ReconcileError::StaleFiber(id))
    }

    /// Store a fiber built for the cycle in progress.
    pub(crate) fn alloc_fiber(&mut self, fiber: Fiber) -> FiberId {
        let id = self.fibers.insert(fiber);
        self.journal.fibers.push(id);
        id
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::component::component_fn;
    use crate::error::RenderError;
    use crate::renderer::{HostOp, MemoryHost};
    use crate::scheduler::UnitBudget;
    use crate::types::{prop_map, ComponentId, Element, PropMap, Value};

    fn setup() -> (Reconciler<MemoryHost>, HostNodeId) {
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        (Reconciler::new(host, ComponentRegistry::new()), container)
    }

    fn div_with_span(text: &str) -> Element {
        Element::host(
            "div",
            PropMap::new(),
            Element::host("span", prop_map([("text", Value::from(text))]), Children::None),
        )
    }

    fn one_unit() -> UnitBudget {
        UnitBudget::new(1, Duration::from_millis(5))
    }

    /// Renders `div > span{text}` from state; fails while `fail` is set.
    fn register_panel(reconciler: &mut Reconciler<MemoryHost>) -> ComponentId {
        reconciler.runtime_mut().register(
            component_fn("Panel", |_, state| {
                if state.get("fail").and_then(Value::as_bool) == Some(true) {
                    return Err(RenderError::new("panel failed"));
                }
                let text = state.get("text").cloned().unwrap_or_default();
                Ok(Element::host(
                    "div",
                    PropMap::new(),
                    Element::host("span", prop_map([("text", text)]), Children::None),
                )
                .into())
            })
            .with_initial_state(prop_map([("text", Value::from("a")), ("fail", Value::from(false))])),
        )
    }

    // =========================================================================
    // Slicing
    // =========================================================================

    #[test]
    fn test_empty_queue_does_nothing() {
        let (mut reconciler, _) = setup();
        let report = reconciler.perform_work(&one_unit()).unwrap();

        assert_eq!(report.status, SliceStatus::empty());
        assert_eq!(report.units_of_work, 0);
        assert!(!reconciler.wants_slice());
    }

    #[test]
    fn test_render_arms_idle_task() {
        let (mut reconciler, container) = setup();
        reconciler.render(div_with_span("a"), container);
        reconciler.render(div_with_span("b"), container);

        assert!(reconciler.wants_slice());
        assert_eq!(reconciler.queued_requests(), 2);
        assert!(!reconciler.is_cycle_in_progress());
    }

    #[test]
    fn test_one_fiber_per_budget_check() {
        let (mut reconciler, container) = setup();
        reconciler.render(div_with_span("a"), container);

        // root, then div: no host mutation until the commit
        for _ in 0..2 {
            let report = reconciler.perform_work(&one_unit()).unwrap();
            assert_eq!(report.units_of_work, 1);
            assert!(report.status.contains(SliceStatus::YIELDED | SliceStatus::MORE_WORK));
            assert!(report.commit.is_none());
            assert!(!reconciler.host().ops().iter().any(HostOp::is_mutation));
        }
        assert!(reconciler.host().children(container).is_empty());

        // span completes the tree and the commit follows in the same slice
        let report = reconciler.perform_work(&one_unit()).unwrap();
        assert_eq!(report.units_of_work, 1);
        assert!(report.status.contains(SliceStatus::COMMITTED));
        assert!(!report.status.contains(SliceStatus::MORE_WORK));
        assert_eq!(reconciler.host().children(container).len(), 1);
        assert!(!reconciler.wants_slice());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let (mut reconciler, container) = setup();
        reconciler.render(div_with_span("a"), container);

        // Exactly `enough_time` left is not enough
        let deadline = || Duration::from_millis(1);
        let report = reconciler.perform_work(&deadline).unwrap();

        assert!(report.status.contains(SliceStatus::STARTED_CYCLE | SliceStatus::YIELDED));
        assert_eq!(report.units_of_work, 0);
        assert!(reconciler.is_cycle_in_progress());
    }

    #[test]
    fn test_new_request_waits_for_active_cycle() {
        let (mut reconciler, container) = setup();
        reconciler.render(div_with_span("a"), container);
        reconciler.perform_work(&one_unit()).unwrap();

        reconciler.render(div_with_span("b"), container);
        let commits = reconciler.flush().unwrap();

        assert_eq!(commits.len(), 2);
        let span = reconciler.host().children(reconciler.host().children(container)[0])[0];
        assert_eq!(reconciler.host().attrs(span).unwrap()["text"], Value::from("b"));
    }

    #[test]
    fn test_flush_rejects_short_slice() {
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        let config = ReconcilerConfig::new().with_slice(Duration::from_millis(1));
        let mut reconciler = Reconciler::with_config(host, ComponentRegistry::new(), config);
        reconciler.render(div_with_span("a"), container);

        assert!(matches!(
            reconciler.flush(),
            Err(ReconcileError::SliceTooShort { .. })
        ));
        assert_eq!(reconciler.queued_requests(), 1);
    }

    // =========================================================================
    // Reclamation
    // =========================================================================

    #[test]
    fn test_replaced_tree_is_released() {
        let (mut reconciler, container) = setup();
        reconciler.render(div_with_span("a"), container);
        reconciler.flush().unwrap();
        assert_eq!(reconciler.fibers().len(), 3);

        reconciler.render(div_with_span("b"), container);
        let commits = reconciler.flush().unwrap();

        assert_eq!(commits[0].released, 3);
        assert_eq!(reconciler.fibers().len(), 3);
    }

    #[test]
    fn test_replaced_host_nodes_are_released() {
        let (mut reconciler, container) = setup();
        for round in 0..50 {
            let tag = if round % 2 == 0 { "p" } else { "h1" };
            reconciler.render(Element::host(tag, PropMap::new(), Children::None), container);
            reconciler.flush().unwrap();
        }

        // container + the one mounted node
        assert_eq!(reconciler.host().live_nodes(), 2);
        assert_eq!(reconciler.host().children(container).len(), 1);
    }

    #[test]
    fn test_committed_tree_is_clean() {
        let (mut reconciler, container) = setup();
        reconciler.render(div_with_span("a"), container);
        reconciler.flush().unwrap();
        reconciler.render(div_with_span("b"), container);
        reconciler.flush().unwrap();

        let root = reconciler.anchor(container).unwrap();
        for id in reconciler.fibers().subtree(root) {
            let fiber = reconciler.fibers().get(id).unwrap();
            assert!(fiber.effects.is_empty());
            assert_eq!(fiber.alternate, None);
            assert_eq!(fiber.effect_tag, None);
        }
    }

    // =========================================================================
    // Abort
    // =========================================================================

    #[test]
    fn test_failed_mount_leaves_nothing_behind() {
        let (mut reconciler, container) = setup();
        let panel = register_panel(&mut reconciler);
        let tree = Element::host(
            "section",
            PropMap::new(),
            Element::component(panel, PropMap::new(), Children::None),
        );

        // Fails on first render
        let failing = reconciler.runtime_mut().register(component_fn("Failing", |_, _| {
            Err(RenderError::new("no"))
        }));
        reconciler.render(
            vec![tree, Element::component(failing, PropMap::new(), Children::None)],
            container,
        );

        let err = reconciler.flush().unwrap_err();
        assert!(matches!(err, ReconcileError::Render { ref component, .. } if component == "Failing"));
        assert_eq!(reconciler.anchor(container), None);
        assert!(reconciler.fibers().is_empty());
        assert_eq!(reconciler.runtime().live_instances(), 0);
        assert!(reconciler.host().children(container).is_empty());
        assert!(!reconciler.is_cycle_in_progress());
    }

    #[test]
    fn test_failed_update_rolls_back() {
        let (mut reconciler, container) = setup();
        let panel = register_panel(&mut reconciler);
        reconciler.render(Element::component(panel, PropMap::new(), Children::None), container);
        reconciler.flush().unwrap();

        let instance = reconciler.runtime().instances_of(panel)[0];
        let anchor = reconciler.anchor(container);
        let before = reconciler.host().snapshot(container);
        let fibers = reconciler.fibers().len();

        reconciler.schedule_update(instance, prop_map([("fail", Value::from(true))]));
        let report = reconciler.perform_work(&|| Duration::from_millis(50));

        assert!(matches!(report, Err(ReconcileError::Render { .. })));
        assert_eq!(reconciler.anchor(container), anchor);
        assert_eq!(reconciler.host().snapshot(container), before);
        assert_eq!(reconciler.fibers().len(), fibers);
        let state = reconciler.runtime().state(instance).unwrap();
        assert_eq!(state["fail"], Value::Bool(false));

        // The committed owner no longer carries the failed patch
        let owner = reconciler.runtime().owner(instance).unwrap();
        assert!(reconciler.fibers().get(owner).unwrap().partial_state.is_none());

        reconciler.schedule_update(instance, prop_map([("text", Value::from("b"))]));
        reconciler.flush().unwrap();
        let div = reconciler.host().children(container)[0];
        let span = reconciler.host().children(div)[0];
        assert_eq!(reconciler.host().attrs(span).unwrap()["text"], Value::from("b"));
    }

    #[test]
    fn test_failure_keeps_later_requests() {
        let (mut reconciler, container) = setup();
        let panel = register_panel(&mut reconciler);
        reconciler.render(Element::component(panel, PropMap::new(), Children::None), container);
        reconciler.flush().unwrap();
        let instance = reconciler.runtime().instances_of(panel)[0];

        reconciler.schedule_update(instance, prop_map([("fail", Value::from(true))]));
        reconciler.schedule_update(instance, prop_map([("text", Value::from("c"))]));

        let report = reconciler.perform_work(&|| Duration::from_millis(50));
        assert!(report.is_err());
        assert!(reconciler.wants_slice());
        assert_eq!(reconciler.queued_requests(), 1);

        let commits = reconciler.flush().unwrap();
        assert_eq!(commits.len(), 1);
    }

    // =========================================================================
    // Detached Updates
    // =========================================================================

    #[test]
    fn test_update_after_unmount_is_dropped() {
        let (mut reconciler, container) = setup();
        let panel = register_panel(&mut reconciler);
        reconciler.render(Element::component(panel, PropMap::new(), Children::None), container);
        reconciler.flush().unwrap();
        let instance = reconciler.runtime().instances_of(panel)[0];

        reconciler.render(div_with_span("plain"), container);
        reconciler.flush().unwrap();
        assert!(!reconciler.runtime().is_mounted(instance));
        let before = reconciler.host().snapshot(container);

        reconciler.schedule_update(instance, prop_map([("text", Value::from("x"))]));
        let result = reconciler.perform_work(&|| Duration::from_millis(50));

        assert_eq!(result.unwrap_err(), ReconcileError::DetachedInstanceUpdate(instance));
        assert_eq!(reconciler.host().snapshot(container), before);
        assert!(!reconciler.has_pending_work());
    }

    #[test]
    fn test_update_for_unknown_instance_is_detached() {
        let (mut reconciler, _) = setup();
        reconciler.schedule_update(InstanceId(99), State::new());

        assert_eq!(
            reconciler.flush().unwrap_err(),
            ReconcileError::DetachedInstanceUpdate(InstanceId(99))
        );
    }
}
