//! Pair Engine
//!
//! Runs one evaluation of the band automaton for one instrument pair:
//!
//! 1. Roll the session day, re-derive the position state from holdings
//! 2. Forced-flat gates: conflicting holdings, session close, trade limit
//! 3. Fetch and align history, run the cointegration gate
//! 4. Compute the decision statistic and band, advance the automaton
//! 5. Reconcile desired legs against holdings and send absolute targets
//!
//! Statistical failures skip the tick. Collaborator failures propagate and
//! leave the automaton, band cadence and session counters as they were.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{
    HeldPosition, InstrumentPair, Ohlcv, PositionError, PositionState, Series, TargetPositionCommand,
};
use crate::ports::{CollaboratorError, ExecutionPort, MarketDataPort};
use crate::strategy::{
    AutomatonConfig, BandCalculator, BandSchedule, CointegrationValidator, ConfigError,
    DecisionPoint, DecisionStatistic, FlattenReason, HedgeFit, PositionAutomaton,
    StationarityTester, StatsError, Transition, ValidityGate, ValidityPolicy,
};

use super::reconciler::PositionReconciler;
use super::session::SessionTracker;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(#[from] CollaboratorError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Scheduler-supplied information about the current evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickContext {
    /// Monotonic tick counter, for logging
    pub sequence: u64,
}

impl TickContext {
    pub fn new(sequence: u64) -> Self {
        Self { sequence }
    }
}

/// What one evaluation did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Evaluated {
        transition: Transition,
        /// Statistic and band, absent when a gate forced the book flat first
        decision: Option<DecisionPoint>,
        /// Targets sent to execution, in order
        commands: Vec<TargetPositionCommand>,
    },
    /// A statistical failure; nothing was sent and the state is unchanged
    Skipped { reason: StatsError },
}

impl TickOutcome {
    pub fn transition(&self) -> Option<Transition> {
        match self {
            TickOutcome::Evaluated { transition, .. } => Some(*transition),
            TickOutcome::Skipped { .. } => None,
        }
    }

    pub fn commands(&self) -> &[TargetPositionCommand] {
        match self {
            TickOutcome::Evaluated { commands, .. } => commands,
            TickOutcome::Skipped { .. } => &[],
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TickOutcome::Skipped { .. })
    }
}

/// Band automaton for one instrument pair
pub struct PairEngine {
    pair: InstrumentPair,
    config: AutomatonConfig,
    market_data: Arc<dyn MarketDataPort>,
    execution: Arc<dyn ExecutionPort>,
    automaton: PositionAutomaton,
    statistic: DecisionStatistic,
    validator: Option<CointegrationValidator>,
    schedule: BandSchedule,
    session: SessionTracker,
    reconciler: PositionReconciler,
}

impl PairEngine {
    pub fn new(
        pair: InstrumentPair,
        config: AutomatonConfig,
        market_data: Arc<dyn MarketDataPort>,
        execution: Arc<dyn ExecutionPort>,
    ) -> Result<Self, EngineError> {
        config.validate_for(&pair)?;

        let bands = &config.bands;
        let calculator = BandCalculator::new(bands.lookback, bands.multiplier_up, bands.multiplier_down)
            .with_source(bands.source);
        let validator = match config.validity.policy {
            ValidityPolicy::None => None,
            ValidityPolicy::Cointegration => Some(CointegrationValidator::new(
                StationarityTester::new(config.validity.adf_lag),
                config.validity.significance,
            )),
        };

        Ok(Self {
            automaton: PositionAutomaton::new(config.entry_mode),
            statistic: DecisionStatistic::new(config.statistic, calculator),
            validator,
            schedule: BandSchedule::new(bands.recompute_every_ticks),
            session: SessionTracker::new(&config.session)?,
            reconciler: PositionReconciler,
            pair,
            config,
            market_data,
            execution,
        })
    }

    pub fn pair(&self) -> &InstrumentPair {
        &self.pair
    }

    pub fn state(&self) -> PositionState {
        self.automaton.state()
    }

    pub fn round_trips_today(&self) -> u32 {
        self.session.round_trips()
    }

    /// Run one evaluation
    pub async fn on_evaluate(&mut self, ctx: &TickContext) -> Result<TickOutcome, EngineError> {
        let now = self.market_data.now();
        self.session.roll(now);

        let holdings = self.fetch_holdings().await?;
        let mut next = self.automaton.clone();

        match PositionState::from_holdings(&self.pair.lead, &holdings) {
            Ok(state) => next.sync(state),
            Err(PositionError::Conflicting(instrument)) => {
                tracing::warn!("[{}] {} held long and short, flattening", self.pair.name, instrument);
                let transition = next.force_flat(FlattenReason::ConflictingHoldings);
                return self.commit(ctx, next, None, transition, None, &holdings).await;
            }
        }

        if let Some(reason) = self.session.gate(now) {
            let transition = next.force_flat(reason);
            return self.commit(ctx, next, None, transition, None, &holdings).await;
        }

        let (a, b) = match self.fetch_closes().await? {
            Ok(series) => series,
            Err(reason) => return Ok(self.skip(ctx, reason)),
        };

        let gate = match self.check_validity(&a, b.as_deref()) {
            Ok(gate) => gate,
            Err(reason) => return Ok(self.skip(ctx, reason)),
        };
        if !gate.valid {
            tracing::warn!(
                "[{}] Cointegration rejected ({:?}), flattening",
                self.pair.name,
                gate.rejection
            );
            let transition = next.force_flat(FlattenReason::ValidityRejected);
            return self.commit(ctx, next, None, transition, None, &holdings).await;
        }

        let hedge = self.validator.is_some().then(|| HedgeFit {
            hedge_ratio: gate.hedge_ratio,
            intercept: gate.intercept,
        });
        let mut schedule = self.schedule.clone();
        let decision = match self.statistic.evaluate(&a, b.as_deref(), hedge, &mut schedule) {
            Ok(decision) => decision,
            Err(reason) => return Ok(self.skip(ctx, reason)),
        };

        tracing::debug!(
            "[{}] {} {:.4} | band [{:.4}, {:.4}, {:.4}] | {}",
            self.pair.name,
            self.statistic.kind(),
            decision.statistic,
            decision.band.lower,
            decision.band.center,
            decision.band.upper,
            next.state()
        );

        let transition = match next.advance(decision.statistic, &decision.band, self.session.allows_reversal()) {
            Ok(transition) => transition,
            Err(reason) => return Ok(self.skip(ctx, reason)),
        };

        self.commit(ctx, next, Some(schedule), transition, Some(decision), &holdings).await
    }

    /// Send the targets for `transition`, then adopt the new state and band
    /// cadence
    async fn commit(
        &mut self,
        ctx: &TickContext,
        next: PositionAutomaton,
        schedule: Option<BandSchedule>,
        transition: Transition,
        decision: Option<DecisionPoint>,
        holdings: &[HeldPosition],
    ) -> Result<TickOutcome, EngineError> {
        let quantity = match &decision {
            Some(d) => self.config.sizing.quantity(d.statistic, &d.band),
            None => 0,
        };
        let targets = self.pair.targets(transition.target(), quantity);
        let commands = self.reconciler.plan(&self.pair.instruments(), &targets, holdings);

        match transition {
            Transition::Hold(_) => {}
            Transition::ForcedFlat { .. } => {
                tracing::warn!("[{}] tick {} | {}", self.pair.name, ctx.sequence, transition)
            }
            _ => tracing::info!("[{}] tick {} | {}", self.pair.name, ctx.sequence, transition),
        }

        for command in &commands {
            self.execution.set_target_position(command).await?;
            tracing::info!("[{}] target {}", self.pair.name, command);
        }

        self.automaton = next;
        if let Some(schedule) = schedule {
            self.schedule = schedule;
        }
        self.session.record(&transition);

        Ok(TickOutcome::Evaluated {
            transition,
            decision,
            commands,
        })
    }

    fn skip(&self, ctx: &TickContext, reason: StatsError) -> TickOutcome {
        tracing::warn!("[{}] tick {} skipped: {}", self.pair.name, ctx.sequence, reason);
        TickOutcome::Skipped { reason }
    }

    async fn fetch_holdings(&self) -> Result<Vec<HeldPosition>, CollaboratorError> {
        let mut holdings = Vec::new();
        for instrument in self.pair.instruments() {
            holdings.extend(self.execution.current_positions(instrument).await?);
        }
        Ok(holdings)
    }

    /// Closes for both legs, aligned on timestamp.
    ///
    /// The outer error is a collaborator failure, the inner one a
    /// statistical problem with the data itself.
    async fn fetch_closes(
        &self,
    ) -> Result<Result<(Vec<f64>, Option<Vec<f64>>), StatsError>, CollaboratorError> {
        let len = self.config.history_len();
        let lead_bars = self.market_data.history(&self.pair.lead, len).await?;
        let hedge_bars = match &self.pair.hedge {
            Some(hedge) => Some(self.market_data.history(hedge, len).await?),
            None => None,
        };

        Ok(align_closes(&lead_bars, hedge_bars.as_deref()))
    }

    fn check_validity(&self, a: &[f64], b: Option<&[f64]>) -> Result<ValidityGate, StatsError> {
        match (&self.validator, b) {
            (Some(validator), Some(b)) => {
                let gate = validator.validate(a, b)?;
                if gate.valid {
                    tracing::debug!(
                        "[{}] Cointegrated: hedge ratio {:.4}, intercept {:.4}, p={:.4}",
                        self.pair.name,
                        gate.hedge_ratio,
                        gate.intercept,
                        gate.residual_p_value.unwrap_or(f64::NAN)
                    );
                }
                Ok(gate)
            }
            _ => Ok(ValidityGate::always_valid()),
        }
    }
}

fn align_closes(
    lead: &[Ohlcv],
    hedge: Option<&[Ohlcv]>,
) -> Result<(Vec<f64>, Option<Vec<f64>>), StatsError> {
    let lead = Series::closes(lead)?;
    match hedge {
        None => Ok((lead.values().to_vec(), None)),
        Some(hedge) => {
            let hedge = Series::closes(hedge)?;
            let (a, b) = Series::align(&lead, &hedge);
            Ok((a.values().to_vec(), Some(b.values().to_vec())))
        }
    }
}
