//! Game rounds
//!
//! A round binds one game to one session and settles at most once: either
//! from the action handler that concludes the game, or from the end callback
//! when the round times out under a forfeit policy. Whichever path commits
//! records the settlement in the round state, and the other path sees it and
//! stands down.

use crate::action_id::{ActionIdGenerator, Control};
use crate::clock::Clock;
use crate::economy::{commit, Ledger, PlayerRecord};
use crate::errors::{RoundError, StakehouseResult};
use crate::games::GameKind;
use crate::render::{ControlFrame, Frame, Renderer, RoundFrame, RoundPhase};
use crate::session::{
    ActionContext, ActionHandler, ActorId, EndContext, EndHandler, EventSource, SessionCollector,
    StopReason, SurfaceId,
};
use crate::stake::{Outcome, StakeInput, StakeOutcome, StakeResolutionEngine};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

/// Rules of one game
pub trait Game: Send + Sync + 'static {
    type Control: Control;
    /// Per-round game state
    type Logic: Send + 'static;

    fn kind(&self) -> GameKind;

    /// Set up a new round
    fn deal(&self, rng: &mut StdRng) -> Self::Logic;

    /// Apply a player action. `None` keeps the round going.
    fn act(
        &self,
        logic: &mut Self::Logic,
        control: Self::Control,
        record: &PlayerRecord,
        rng: &mut StdRng,
    ) -> Option<Verdict>;

    fn on_timeout(&self) -> TimeoutPolicy;

    /// What the player may see of the round
    fn view(&self, logic: &Self::Logic) -> serde_json::Value;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// A round nobody finished is settled as a loss
    Forfeit,
    /// A round nobody finished moves no money
    KeepStake,
}

/// A game's ruling on a round, plus the stake parameters to resolve it with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub base_rate: f64,
    pub multiplier: f64,
    pub random: f64,
}

impl Verdict {
    pub fn win(base_rate: f64, multiplier: f64, random: f64) -> Self {
        Self {
            outcome: Outcome::Win,
            base_rate,
            multiplier,
            random,
        }
    }

    pub fn jackpot(base_rate: f64, multiplier: f64, random: f64) -> Self {
        Self {
            outcome: Outcome::Jackpot,
            ..Self::win(base_rate, multiplier, random)
        }
    }

    pub fn loss() -> Self {
        Self {
            outcome: Outcome::Loss,
            ..Self::win(0.0, 0.0, 0.0)
        }
    }

    pub fn tie() -> Self {
        Self {
            outcome: Outcome::Tie,
            ..Self::win(0.0, 0.0, 0.0)
        }
    }

    fn stake(&self, bet: u64) -> StakeInput {
        StakeInput {
            bet,
            base_rate: self.base_rate,
            multiplier: self.multiplier,
            random: self.random,
        }
    }
}

/// Session-local state of a round
pub struct RoundState<G: Game> {
    pub record: PlayerRecord,
    pub logic: G::Logic,
    rng: StdRng,
    settlement: Option<StakeOutcome>,
}

impl<G: Game> RoundState<G> {
    pub fn settlement(&self) -> Option<&StakeOutcome> {
        self.settlement.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct RoundReport {
    pub game: GameKind,
    pub reason: StopReason,
    /// `None` when the round ended without moving money
    pub settlement: Option<StakeOutcome>,
    pub record: PlayerRecord,
}

/// Runs one round of `G` for one player
pub struct RoundRunner<G: Game> {
    game: Arc<G>,
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    seed: Option<u64>,
}

impl<G: Game> RoundRunner<G> {
    pub fn new(
        game: G,
        ledger: Arc<dyn Ledger>,
        renderer: Arc<dyn Renderer>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            game: Arc::new(game),
            ledger,
            renderer,
            clock,
            ttl,
            seed: None,
        }
    }

    /// Draw the round's randomness from a fixed seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub async fn run(
        self,
        origin: ActorId,
        surface: SurfaceId,
        record: PlayerRecord,
        events: Arc<dyn EventSource>,
    ) -> StakehouseResult<RoundReport> {
        if record.bet == 0 || record.bet > record.wallet {
            return Err(RoundError::InsufficientFunds {
                bet: record.bet,
                wallet: record.wallet,
            }
            .into());
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let logic = self.game.deal(&mut rng);
        let state = RoundState::<G> {
            record,
            logic,
            rng,
            settlement: None,
        };

        let ids = ActionIdGenerator::new(self.clock.now_ms());
        let kind = self.game.kind();
        let handlers = Arc::new(RoundHandlers {
            game: self.game,
            ledger: self.ledger,
            renderer: self.renderer,
            clock: self.clock,
            surface: surface.clone(),
            ids,
        });

        handlers
            .renderer
            .render(&surface, handlers.frame(&state, RoundPhase::Playing))
            .await?;
        tracing::debug!("{} round started for {} (bet {})", kind, origin, state.record.bet);

        let report = SessionCollector::new(origin, surface, ids, self.ttl)
            .on_all(handlers.clone())
            .on_end(handlers)
            .run(events, state)
            .await?;

        Ok(RoundReport {
            game: kind,
            reason: report.reason,
            settlement: report.state.settlement,
            record: report.state.record,
        })
    }
}

struct RoundHandlers<G: Game> {
    game: Arc<G>,
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    surface: SurfaceId,
    ids: ActionIdGenerator,
}

impl<G: Game> RoundHandlers<G> {
    fn frame(&self, state: &RoundState<G>, phase: RoundPhase) -> Frame {
        let kind = self.game.kind();
        Frame::Round(RoundFrame {
            game: kind.id().to_string(),
            phase,
            bet: state.record.bet,
            wallet: state.record.wallet,
            view: self.game.view(&state.logic),
            settlement: state.settlement,
            streak: state.record.stats(kind).active_streak(),
            controls: ControlFrame::all::<G::Control>(&self.ids, phase == RoundPhase::Playing),
        })
    }

    /// The single commit path of a round
    async fn settle(&self, state: &mut RoundState<G>, verdict: Verdict) -> StakehouseResult<StakeOutcome> {
        if state.settlement.is_some() {
            return Err(RoundError::AlreadySettled(self.ids.origin_ms().to_string()).into());
        }

        let settled = StakeResolutionEngine::settle(verdict.stake(state.record.bet), verdict.outcome);
        let kind = self.game.kind();
        let now_ms = self.clock.now_ms();
        commit(&*self.ledger, &mut state.record, |record| {
            record.apply_settlement(kind, &settled, now_ms)
        })
        .await?;
        state.settlement = Some(settled);

        tracing::info!(
            "{} round for {} settled: {} of {} (wallet now {})",
            kind,
            state.record.player,
            settled.outcome,
            settled.payout,
            state.record.wallet
        );
        Ok(settled)
    }
}

#[async_trait]
impl<G: Game> ActionHandler<G::Control, RoundState<G>> for RoundHandlers<G> {
    async fn handle(&self, ctx: &mut ActionContext<'_, G::Control, RoundState<G>>) -> StakehouseResult<()> {
        let control = ctx.control();
        let state = &mut *ctx.state;

        let verdict = {
            let RoundState {
                record, logic, rng, ..
            } = &mut *state;
            self.game.act(logic, control, record, rng)
        };

        let Some(verdict) = verdict else {
            self.renderer
                .render(&self.surface, self.frame(state, RoundPhase::Playing))
                .await?;
            return Ok(());
        };

        self.settle(state, verdict).await?;
        self.renderer
            .render(&self.surface, self.frame(state, RoundPhase::Settled))
            .await?;
        ctx.stop();
        Ok(())
    }
}

#[async_trait]
impl<G: Game> EndHandler<RoundState<G>> for RoundHandlers<G> {
    async fn on_end(&self, ctx: EndContext<'_, RoundState<G>>) -> StakehouseResult<()> {
        let state = ctx.state;
        if state.settlement.is_some() {
            return Ok(());
        }

        let phase = match ctx.reason {
            StopReason::Timeout => {
                if self.game.on_timeout() == TimeoutPolicy::Forfeit {
                    self.settle(state, Verdict::loss()).await?;
                }
                RoundPhase::TimedOut
            }
            StopReason::ExternalStop => RoundPhase::Abandoned,
            // A failed handler leaves the round uncommitted and the surface as it was
            StopReason::Action(_) | StopReason::Error => return Ok(()),
        };

        self.renderer
            .render(&self.surface, self.frame(state, phase))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::StakehouseConfig;
    use crate::economy::MemoryLedger;
    use crate::errors::{LedgerError, StakehouseError};
    use crate::render::RecordingRenderer;
    use crate::session::{ActorEvent, EventHub};
    use serde_json::json;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Coin {
        Heads,
        Tails,
        Peek,
    }

    impl Control for Coin {
        const ALL: &'static [Self] = &[Coin::Heads, Coin::Tails, Coin::Peek];

        fn label(self) -> &'static str {
            match self {
                Coin::Heads => "heads",
                Coin::Tails => "tails",
                Coin::Peek => "peek",
            }
        }
    }

    /// Heads always wins at base 0.5, tails always loses, peek does nothing
    struct RiggedCoin {
        policy: TimeoutPolicy,
    }

    impl Game for RiggedCoin {
        type Control = Coin;
        type Logic = u32;

        fn kind(&self) -> GameKind {
            GameKind::DiceRoll
        }

        fn deal(&self, _rng: &mut StdRng) -> u32 {
            0
        }

        fn act(&self, peeks: &mut u32, control: Coin, record: &PlayerRecord, _rng: &mut StdRng) -> Option<Verdict> {
            match control {
                Coin::Heads => Some(Verdict::win(0.5, record.multiplier, 0.0)),
                Coin::Tails => Some(Verdict::loss()),
                Coin::Peek => {
                    *peeks += 1;
                    None
                }
            }
        }

        fn on_timeout(&self) -> TimeoutPolicy {
            self.policy
        }

        fn view(&self, peeks: &u32) -> serde_json::Value {
            json!({ "peeks": peeks })
        }
    }

    struct Table {
        hub: Arc<EventHub>,
        ledger: Arc<MemoryLedger>,
        renderer: Arc<RecordingRenderer>,
        player: ActorId,
        surface: SurfaceId,
    }

    impl Table {
        fn new() -> Self {
            Self {
                hub: Arc::new(EventHub::new()),
                ledger: Arc::new(MemoryLedger::new(StakehouseConfig::default())),
                renderer: Arc::new(RecordingRenderer::new()),
                player: ActorId::new("p1"),
                surface: SurfaceId::new("round-1"),
            }
        }

        async fn start(
            &self,
            policy: TimeoutPolicy,
        ) -> tokio::task::JoinHandle<StakehouseResult<RoundReport>> {
            let record = self.ledger.fetch(&self.player).await.unwrap();
            self.start_with(policy, record)
        }

        fn start_with(
            &self,
            policy: TimeoutPolicy,
            record: PlayerRecord,
        ) -> tokio::task::JoinHandle<StakehouseResult<RoundReport>> {
            let runner = RoundRunner::new(
                RiggedCoin { policy },
                self.ledger.clone(),
                self.renderer.clone(),
                Arc::new(ManualClock::new(1_000)),
                Duration::from_secs(10),
            );
            tokio::spawn(runner.run(
                self.player.clone(),
                self.surface.clone(),
                record,
                self.hub.clone(),
            ))
        }

        async fn until_live(&self) {
            while self.hub.subscriber_count(&self.surface) == 0 {
                tokio::task::yield_now().await;
            }
        }

        fn round_frame(&self) -> RoundFrame {
            match self.renderer.last(&self.surface) {
                Some(Frame::Round(frame)) => frame,
                other => panic!("Expected a round frame, got {other:?}"),
            }
        }

        fn press(&self, coin: Coin) {
            let frame = self.round_frame();
            let control = frame
                .controls
                .iter()
                .find(|control| control.label == coin.label())
                .unwrap();
            self.hub.publish(ActorEvent::press(
                self.player.clone(),
                self.surface.clone(),
                control.action_id.clone(),
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_win_commits_exactly_once() {
        let table = Table::new();
        let round = table.start(TimeoutPolicy::Forfeit).await;
        table.until_live().await;

        table.press(Coin::Heads);
        let report = round.await.unwrap().unwrap();

        let settled = report.settlement.unwrap();
        assert_eq!(settled.outcome, Outcome::Win);
        assert_eq!(settled.payout, 500);
        assert_eq!(report.reason, StopReason::Action("heads".to_string()));
        assert_eq!(report.record.wallet, 10_500);

        // The TTL would have expired by now; nothing else may commit
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(table.ledger.persist_count(), 1);
        assert_eq!(table.ledger.get(&table.player).unwrap().wallet, 10_500);
        assert_eq!(table.round_frame().phase, RoundPhase::Settled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forfeit_on_timeout_debits_once() {
        let table = Table::new();
        let round = table.start(TimeoutPolicy::Forfeit).await;

        let report = round.await.unwrap().unwrap();

        assert_eq!(report.reason, StopReason::Timeout);
        assert_eq!(report.settlement.unwrap().outcome, Outcome::Loss);
        assert_eq!(report.record.wallet, 9_000);
        assert_eq!(table.ledger.persist_count(), 1);

        let frame = table.round_frame();
        assert_eq!(frame.phase, RoundPhase::TimedOut);
        assert!(frame.controls.iter().all(|control| !control.enabled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_stake_on_timeout_moves_nothing() {
        let table = Table::new();
        let round = table.start(TimeoutPolicy::KeepStake).await;

        let report = round.await.unwrap().unwrap();

        assert_eq!(report.reason, StopReason::Timeout);
        assert!(report.settlement.is_none());
        assert_eq!(report.record.wallet, 10_000);
        assert_eq!(table.ledger.persist_count(), 0);
        assert_eq!(table.round_frame().phase, RoundPhase::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_persist_leaves_round_unsettled() {
        let table = Table::new();
        let round = table.start(TimeoutPolicy::Forfeit).await;
        table.until_live().await;
        table.ledger.fail_persists(true);

        table.press(Coin::Tails);
        let error = round.await.unwrap().unwrap_err();

        assert!(matches!(
            error.ledger_error(),
            Some(LedgerError::PersistFailed { .. })
        ));
        assert_eq!(table.ledger.get(&table.player).unwrap().wallet, 10_000);
        assert_eq!(table.ledger.persist_count(), 0);
        assert_eq!(table.hub.subscriber_count(&table.surface), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_concluding_action_keeps_round_open() {
        let table = Table::new();
        let round = table.start(TimeoutPolicy::Forfeit).await;
        table.until_live().await;

        table.press(Coin::Peek);
        while table.renderer.frames(&table.surface).len() < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(table.round_frame().view, json!({ "peeks": 1 }));

        table.press(Coin::Tails);
        let report = round.await.unwrap().unwrap();

        assert_eq!(report.settlement.unwrap().outcome, Outcome::Loss);
        assert_eq!(table.renderer.frames(&table.surface).len(), 3);
    }

    #[tokio::test]
    async fn test_bet_above_wallet_is_refused() {
        let table = Table::new();
        let mut record = table.ledger.fetch(&table.player).await.unwrap();
        record.wallet = 10;

        let result = table.start_with(TimeoutPolicy::Forfeit, record).await.unwrap();

        assert!(matches!(
            result,
            Err(StakehouseError::Round(RoundError::InsufficientFunds { bet: 1_000, wallet: 10 }))
        ));
        assert!(table.renderer.frames(&table.surface).is_empty());
    }
}
