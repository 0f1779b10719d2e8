//! Chain: an ordered, named sequence of links.
//!
//! Links strictly serialize; link *i+1* never begins before link *i* has
//! returned. The first non-success outcome ends the chain's iteration and
//! becomes its reported outcome, together with how many links actually ran.

use tracing::{debug, error, info, warn};

use serde::{Deserialize, Serialize};

use crate::context::PipelineContext;
use crate::error::EngineError;
use crate::link::{Link, Outcome};

/// Guard against a link that never stops asking for another execute pass.
/// Hitting the guard is a failure; the engine has no retry policy of its
/// own, it only honors a link-authored `Repeat`.
pub const MAX_EXECUTE_REPEATS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Configured,
    Initialized,
    Finalized,
}

struct LinkSlot {
    link: Box<dyn Link>,
    state: LinkState,
}

/// What happened when a chain ran.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainReport {
    /// Chain name.
    pub chain: String,
    /// First non-success outcome, or `Success` when every link succeeded.
    pub outcome: Outcome,
    /// How many links were actually invoked, including the failing one.
    pub links_run: usize,
    /// Name of the link that produced the non-success outcome.
    pub failed_link: Option<String>,
    /// Error text when the link failed through the error channel.
    pub error: Option<String>,
}

/// Ordered, named sequence of links.
pub struct Chain {
    name: String,
    slots: Vec<LinkSlot>,
    started: bool,
}

impl Chain {
    /// Creates an empty chain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            started: false,
        }
    }

    /// Chain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the chain holds no links.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Link names in execution order.
    pub fn link_names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|slot| slot.link.name())
    }

    /// Appends a link. Rejected once execution has started; the order is
    /// fixed from the first `run` on.
    pub fn add_link(&mut self, link: Box<dyn Link>) -> Result<&mut Self, EngineError> {
        if self.started {
            return Err(EngineError::Assembly(format!(
                "chain '{}' already started executing; links can no longer be added",
                self.name
            )));
        }
        debug!(chain = %self.name, link = link.name(), "link added");
        self.slots.push(LinkSlot {
            link,
            state: LinkState::Configured,
        });
        Ok(self)
    }

    /// Runs every link in order: initialize once (if not already done),
    /// then execute, honoring `Repeat` up to [`MAX_EXECUTE_REPEATS`]
    /// passes. Stops at the first non-success outcome and reports it along
    /// with the number of links invoked.
    pub fn run(&mut self, ctx: &mut PipelineContext) -> ChainReport {
        self.started = true;
        let mut links_run = 0;

        for index in 0..self.slots.len() {
            links_run += 1;
            let slot = &mut self.slots[index];
            let link_name = slot.link.name().to_string();

            if slot.state == LinkState::Configured {
                debug!(chain = %self.name, link = %link_name, "initializing link");
                match slot.link.initialize(ctx) {
                    Ok(Outcome::Success) => slot.state = LinkState::Initialized,
                    Ok(outcome) => {
                        warn!(chain = %self.name, link = %link_name, %outcome, "initialize returned non-success");
                        return self.report(outcome, links_run, Some(link_name), None);
                    }
                    Err(err) => {
                        error!(chain = %self.name, link = %link_name, error = %err, "initialize failed");
                        return self.report(Outcome::Failure, links_run, Some(link_name), Some(err.to_string()));
                    }
                }
            }

            let mut passes = 0u32;
            loop {
                passes += 1;
                match slot.link.execute(ctx) {
                    Ok(Outcome::Success) => break,
                    Ok(Outcome::Repeat) => {
                        if passes >= MAX_EXECUTE_REPEATS {
                            let message =
                                format!("repeat guard tripped after {passes} execute passes of link '{link_name}'");
                            error!(chain = %self.name, link = %link_name, "{message}");
                            return self.report(Outcome::Failure, links_run, Some(link_name), Some(message));
                        }
                    }
                    Ok(outcome) => {
                        info!(chain = %self.name, link = %link_name, %outcome, "link ended chain iteration");
                        return self.report(outcome, links_run, Some(link_name), None);
                    }
                    Err(err) => {
                        error!(chain = %self.name, link = %link_name, error = %err, "execute failed");
                        return self.report(Outcome::Failure, links_run, Some(link_name), Some(err.to_string()));
                    }
                }
            }
            debug!(chain = %self.name, link = %link_name, passes, "link executed");
        }

        self.report(Outcome::Success, links_run, None, None)
    }

    /// Finalizes, in forward order, every link that reached Initialized —
    /// including when a later link failed. Finalize is best-effort cleanup:
    /// a non-success here is logged and never masks the run outcome.
    pub fn finalize(&mut self, ctx: &mut PipelineContext) {
        for slot in &mut self.slots {
            if slot.state != LinkState::Initialized {
                continue;
            }
            let link_name = slot.link.name().to_string();
            match slot.link.finalize(ctx) {
                Ok(Outcome::Success) => debug!(chain = %self.name, link = %link_name, "link finalized"),
                Ok(outcome) => warn!(chain = %self.name, link = %link_name, %outcome, "finalize returned non-success"),
                Err(err) => warn!(chain = %self.name, link = %link_name, error = %err, "finalize failed"),
            }
            slot.state = LinkState::Finalized;
        }
    }

    fn report(&self, outcome: Outcome, links_run: usize, failed_link: Option<String>, error: Option<String>) -> ChainReport {
        let failed_link = if outcome == Outcome::Success { None } else { failed_link };
        ChainReport {
            chain: self.name.clone(),
            outcome,
            links_run,
            failed_link,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct ScriptedLink {
        name: String,
        journal: Journal,
        init_result: Result<Outcome, EngineError>,
        execute_outcomes: Vec<Outcome>,
        executed: usize,
    }

    impl ScriptedLink {
        fn succeeding(name: &str, journal: &Journal) -> Box<Self> {
            Self::scripted(name, journal, Ok(Outcome::Success), vec![Outcome::Success])
        }

        fn scripted(
            name: &str,
            journal: &Journal,
            init_result: Result<Outcome, EngineError>,
            execute_outcomes: Vec<Outcome>,
        ) -> Box<Self> {
            Box::new(Self {
                name: name.to_string(),
                journal: Rc::clone(journal),
                init_result,
                execute_outcomes,
                executed: 0,
            })
        }
    }

    impl Link for ScriptedLink {
        fn name(&self) -> &str {
            &self.name
        }

        fn initialize(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
            self.journal.borrow_mut().push(format!("init:{}", self.name));
            match &self.init_result {
                Ok(outcome) => Ok(*outcome),
                Err(_) => Err(EngineError::configuration(&self.name, "scripted initialize failure")),
            }
        }

        fn execute(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
            self.journal.borrow_mut().push(format!("exec:{}", self.name));
            let outcome = self
                .execute_outcomes
                .get(self.executed)
                .copied()
                .unwrap_or(Outcome::Success);
            self.executed += 1;
            Ok(outcome)
        }

        fn finalize(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
            self.journal.borrow_mut().push(format!("fini:{}", self.name));
            Ok(Outcome::Success)
        }
    }

    struct FailingLink {
        name: String,
        journal: Journal,
    }

    impl Link for FailingLink {
        fn name(&self) -> &str {
            &self.name
        }

        fn execute(&mut self, _ctx: &mut PipelineContext) -> Result<Outcome, EngineError> {
            self.journal.borrow_mut().push(format!("exec:{}", self.name));
            Err(StoreError::KeyNotFound("missing".into()).into())
        }
    }

    fn journal() -> Journal {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn all_links_run_in_order_on_success() {
        let journal = journal();
        let mut chain = Chain::new("demo");
        chain.add_link(ScriptedLink::succeeding("a", &journal)).expect("add a");
        chain.add_link(ScriptedLink::succeeding("b", &journal)).expect("add b");

        let mut ctx = PipelineContext::new();
        let report = chain.run(&mut ctx);

        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(report.links_run, 2);
        assert_eq!(report.failed_link, None);
        assert_eq!(
            *journal.borrow(),
            vec!["init:a", "exec:a", "init:b", "exec:b"],
            "links must strictly serialize in list order"
        );
    }

    #[test]
    fn first_failure_stops_the_chain() {
        let journal = journal();
        let mut chain = Chain::new("demo");
        chain.add_link(ScriptedLink::succeeding("a", &journal)).expect("add a");
        chain
            .add_link(Box::new(FailingLink {
                name: "boom".into(),
                journal: Rc::clone(&journal),
            }))
            .expect("add boom");
        chain.add_link(ScriptedLink::succeeding("never", &journal)).expect("add never");

        let mut ctx = PipelineContext::new();
        let report = chain.run(&mut ctx);

        assert_eq!(report.outcome, Outcome::Failure);
        assert_eq!(report.links_run, 2);
        assert_eq!(report.failed_link.as_deref(), Some("boom"));
        assert!(report.error.as_deref().unwrap_or_default().contains("missing"));
        assert!(
            !journal.borrow().iter().any(|entry| entry.contains("never")),
            "links after the failure must not be invoked"
        );
    }

    #[test]
    fn initialize_failure_prevents_execute() {
        let journal = journal();
        let mut chain = Chain::new("demo");
        chain
            .add_link(ScriptedLink::scripted(
                "bad",
                &journal,
                Err(EngineError::configuration("bad", "scripted")),
                vec![],
            ))
            .expect("add bad");

        let mut ctx = PipelineContext::new();
        let report = chain.run(&mut ctx);

        assert_eq!(report.outcome, Outcome::Failure);
        assert_eq!(report.links_run, 1);
        assert_eq!(*journal.borrow(), vec!["init:bad"], "execute must never run");
    }

    #[test]
    fn repeat_reinvokes_the_same_link() {
        let journal = journal();
        let mut chain = Chain::new("demo");
        chain
            .add_link(ScriptedLink::scripted(
                "stream",
                &journal,
                Ok(Outcome::Success),
                vec![Outcome::Repeat, Outcome::Repeat, Outcome::Success],
            ))
            .expect("add stream");
        chain.add_link(ScriptedLink::succeeding("after", &journal)).expect("add after");

        let mut ctx = PipelineContext::new();
        let report = chain.run(&mut ctx);

        assert_eq!(report.outcome, Outcome::Success);
        let executes = journal.borrow().iter().filter(|entry| *entry == "exec:stream").count();
        assert_eq!(executes, 3, "repeat must re-run execute until success");
        assert!(journal.borrow().contains(&"exec:after".to_string()));
    }

    #[test]
    fn repeat_guard_turns_runaway_links_into_failure() {
        let journal = journal();
        let mut chain = Chain::new("demo");
        chain
            .add_link(ScriptedLink::scripted(
                "forever",
                &journal,
                Ok(Outcome::Success),
                vec![Outcome::Repeat; MAX_EXECUTE_REPEATS as usize + 10],
            ))
            .expect("add forever");

        let mut ctx = PipelineContext::new();
        let report = chain.run(&mut ctx);

        assert_eq!(report.outcome, Outcome::Failure);
        assert!(report.error.as_deref().unwrap_or_default().contains("repeat guard"));
    }

    #[test]
    fn skip_remainder_is_reported_without_failed_error() {
        let journal = journal();
        let mut chain = Chain::new("demo");
        chain
            .add_link(ScriptedLink::scripted(
                "skipper",
                &journal,
                Ok(Outcome::Success),
                vec![Outcome::SkipChainRemainder],
            ))
            .expect("add skipper");
        chain.add_link(ScriptedLink::succeeding("rest", &journal)).expect("add rest");

        let mut ctx = PipelineContext::new();
        let report = chain.run(&mut ctx);

        assert_eq!(report.outcome, Outcome::SkipChainRemainder);
        assert_eq!(report.links_run, 1);
        assert_eq!(report.failed_link.as_deref(), Some("skipper"));
        assert_eq!(report.error, None);
        assert!(!journal.borrow().contains(&"exec:rest".to_string()));
    }

    #[test]
    fn finalize_covers_initialized_links_only() {
        let journal = journal();
        let mut chain = Chain::new("demo");
        chain.add_link(ScriptedLink::succeeding("a", &journal)).expect("add a");
        chain
            .add_link(Box::new(FailingLink {
                name: "boom".into(),
                journal: Rc::clone(&journal),
            }))
            .expect("add boom");
        chain.add_link(ScriptedLink::succeeding("tail", &journal)).expect("add tail");

        let mut ctx = PipelineContext::new();
        let report = chain.run(&mut ctx);
        assert_eq!(report.outcome, Outcome::Failure);

        chain.finalize(&mut ctx);
        let entries = journal.borrow();
        assert!(entries.contains(&"fini:a".to_string()), "initialized link must be finalized");
        assert!(
            !entries.iter().any(|entry| entry == "fini:tail"),
            "link that never initialized must not be finalized"
        );
    }

    #[test]
    fn finalize_runs_once_per_link() {
        let journal = journal();
        let mut chain = Chain::new("demo");
        chain.add_link(ScriptedLink::succeeding("a", &journal)).expect("add a");

        let mut ctx = PipelineContext::new();
        let _ = chain.run(&mut ctx);
        chain.finalize(&mut ctx);
        chain.finalize(&mut ctx);

        let count = journal.borrow().iter().filter(|entry| *entry == "fini:a").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn adding_links_after_start_is_rejected() {
        let journal = journal();
        let mut chain = Chain::new("demo");
        chain.add_link(ScriptedLink::succeeding("a", &journal)).expect("add a");

        let mut ctx = PipelineContext::new();
        let _ = chain.run(&mut ctx);

        let error = chain
            .add_link(ScriptedLink::succeeding("late", &journal))
            .expect_err("late add must fail");
        assert!(matches!(error, EngineError::Assembly(_)));
    }
}
