//! Convergence engine service.
//!
//! The `ConvergenceEngine` drives a bounded number of
//! generate -> decode -> validate -> feedback rounds against a
//! [`GenerationBackend`], using the policies of a [`ConvergenceTool`], until
//! the tool is satisfied, a round teaches nothing new, or the round cap is hit.
//!
//! Every failure inside a round (no handle, no text, undecodable text) narrows
//! that round to zero candidates; nothing here aborts a run.

use std::collections::HashSet;
use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use crate::domain::models::Candidate;
use crate::domain::ports::{ConvergenceTool, GenerationBackend};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Limits for one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceEngineConfig {
    /// Maximum backend submissions per run.
    pub max_iterations: usize,
}

impl ConvergenceEngineConfig {
    pub const fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl Default for ConvergenceEngineConfig {
    fn default() -> Self {
        Self { max_iterations: 1 }
    }
}

// ---------------------------------------------------------------------------
// IterationState
// ---------------------------------------------------------------------------

/// Per-run accumulator: accepted candidates in first-acceptance order, their
/// semantic keys, and the feedback carried into the next round.
struct IterationState<C: Candidate, F> {
    accepted: Vec<C>,
    seen: HashSet<C::Key>,
    feedback: Option<F>,
}

impl<C: Candidate, F> IterationState<C, F> {
    fn new() -> Self {
        Self {
            accepted: Vec::new(),
            seen: HashSet::new(),
            feedback: None,
        }
    }

    /// Valid candidates whose key has not been accepted yet, deduplicated
    /// within the batch as well.
    fn fresh(&self, valids: Vec<C>) -> Vec<C> {
        let mut batch_keys = HashSet::new();
        valids
            .into_iter()
            .filter(|candidate| {
                let key = candidate.semantic_key();
                !self.seen.contains(&key) && batch_keys.insert(key)
            })
            .collect()
    }

    fn accept(&mut self, candidate: C) {
        self.seen.insert(candidate.semantic_key());
        self.accepted.push(candidate);
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Exhausted,
    Terminated,
    NothingNew,
}

// ---------------------------------------------------------------------------
// ConvergenceEngine
// ---------------------------------------------------------------------------

/// Runs convergence tools against one backend.
///
/// The backend carries conversation state, so an engine (and its backend)
/// serves one run at a time; independent runs use independent engines.
pub struct ConvergenceEngine<B: GenerationBackend> {
    backend: B,
    config: ConvergenceEngineConfig,
}

impl<B: GenerationBackend> ConvergenceEngine<B> {
    pub const fn new(backend: B, config: ConvergenceEngineConfig) -> Self {
        Self { backend, config }
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn config(&self) -> &ConvergenceEngineConfig {
        &self.config
    }

    /// Run `tool` to convergence and return its accepted candidates, each
    /// once, in first-acceptance order.
    ///
    /// Candidates of a round are accepted one at a time and the tool's
    /// termination predicate is checked after each, so a count-based target is
    /// never overshot.
    pub async fn run<T: ConvergenceTool>(&self, tool: &T) -> Vec<T::Output> {
        let span = tracing::info_span!(
            "convergence_run",
            run_id = %Uuid::new_v4(),
            tool = tool.name(),
            backend = self.backend.name()
        );
        self.converge(tool).instrument(span).await
    }

    async fn converge<T: ConvergenceTool>(&self, tool: &T) -> Vec<T::Output> {
        let started = Instant::now();
        self.backend.reset().await;

        let mut state: IterationState<T::Output, T::Feedback> = IterationState::new();
        let mut stop = StopReason::Exhausted;
        let mut rounds = 0;

        for round in 1..=self.config.max_iterations {
            rounds = round;
            let raw = self.run_round(tool, state.feedback.as_ref(), round).await;

            let (valids, invalids): (Vec<_>, Vec<_>) =
                raw.into_iter().partition(|candidate| tool.is_valid(candidate));
            let new_valids = state.fresh(valids);

            tracing::info!(
                round,
                new_valid = new_valids.len(),
                invalid = invalids.len(),
                accepted = state.accepted.len(),
                "round evaluated"
            );

            if new_valids.is_empty() && invalids.is_empty() {
                stop = StopReason::NothingNew;
                break;
            }

            let mut terminated = tool.is_terminated(&state.accepted);
            for candidate in new_valids {
                if terminated {
                    break;
                }
                tracing::debug!(round, candidate = %candidate.summary(), "accepted");
                state.accept(candidate);
                terminated = tool.is_terminated(&state.accepted);
            }

            if terminated {
                stop = StopReason::Terminated;
                break;
            }

            state.feedback = Some(tool.build_feedback(invalids));
        }

        tracing::info!(
            rounds,
            accepted = state.accepted.len(),
            reason = ?stop,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "convergence run finished"
        );

        state.accepted
    }

    /// One backend round trip; any failure yields no candidates.
    async fn run_round<T: ConvergenceTool>(
        &self,
        tool: &T,
        feedback: Option<&T::Feedback>,
        round: usize,
    ) -> Vec<T::Output> {
        let messages = tool.build_request(feedback).into_messages();
        tracing::debug!(round, request = %messages.join(" "), "submitting request");

        let Some(handle) = self.backend.submit(&messages).await else {
            tracing::warn!(round, "backend rejected the request");
            return Vec::new();
        };

        let Some(text) = self.backend.poll(&handle).await else {
            tracing::warn!(round, response_id = %handle.id, "backend returned no text");
            return Vec::new();
        };
        if text.trim().is_empty() {
            return Vec::new();
        }

        match tool.decode(&text).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(round, error = %e, "failed to decode model output");
                Vec::new()
            }
        }
    }
}
