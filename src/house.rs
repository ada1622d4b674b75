//! The play flow: pick a game, pass the energy gate, play one round

use crate::action_id::ActionIdGenerator;
use crate::clock::Clock;
use crate::config::StakehouseConfig;
use crate::economy::{BetPolicy, BoosterCatalog, Ledger, PlayerRecord};
use crate::energy::EnergyRegulator;
use crate::errors::{RoundError, StakehouseResult};
use crate::games::{DiceRoll, GameKind, Highlow, SlotMachine};
use crate::menus::{
    BoosterShop, BoosterShopOutcome, EnergyMenu, EnergyMenuOutcome, EnergyPrompt, GamePicker,
};
use crate::render::{Frame, Renderer};
use crate::round::{Game, RoundReport, RoundRunner};
use crate::session::{ActorId, EventSource, SurfaceId};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum PlayOutcome {
    /// The picker was cancelled or timed out
    Cancelled,
    /// Energy is expired and there is no charge to recharge it with
    NoEnergy { expires_at_ms: u64 },
    /// The energy prompt was declined or timed out
    NotEnergized,
    Played(RoundReport),
}

/// Entry point of the command layer
pub struct GameHouse {
    config: StakehouseConfig,
    events: Arc<dyn EventSource>,
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    regulator: EnergyRegulator,
    bets: BetPolicy,
    catalog: BoosterCatalog,
    seed: Option<u64>,
}

impl GameHouse {
    pub fn new(
        config: StakehouseConfig,
        events: Arc<dyn EventSource>,
        ledger: Arc<dyn Ledger>,
        renderer: Arc<dyn Renderer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            regulator: EnergyRegulator::new(&config.energy),
            bets: BetPolicy::new(&config.economy),
            catalog: BoosterCatalog::default(),
            config,
            events,
            ledger,
            renderer,
            clock,
            seed: None,
        }
    }

    /// Seed every round's randomness
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the boosters on sale
    pub fn catalog(mut self, catalog: BoosterCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &StakehouseConfig {
        &self.config
    }

    /// Full flow: game picker, energy gate, round
    pub async fn play(&self, player: &ActorId, surface: &SurfaceId) -> StakehouseResult<PlayOutcome> {
        let record = self.ledger.fetch(player).await?;
        let picked = GamePicker::new(
            self.ledger.clone(),
            self.renderer.clone(),
            self.config.picker_ttl(),
        )
        .run(
            player.clone(),
            surface.clone(),
            self.ids(),
            record,
            self.events.clone(),
        )
        .await?;

        match picked.game {
            Some(game) => self.start_round(player, surface, game, picked.record).await,
            None => Ok(PlayOutcome::Cancelled),
        }
    }

    /// Skip the picker and play `game` directly
    pub async fn play_game(
        &self,
        player: &ActorId,
        surface: &SurfaceId,
        game: GameKind,
    ) -> StakehouseResult<PlayOutcome> {
        let record = self.ledger.fetch(player).await?;
        self.start_round(player, surface, game, record).await
    }

    /// Play the game named by a command argument such as `diceroll`
    pub async fn play_by_id(
        &self,
        player: &ActorId,
        surface: &SurfaceId,
        game_id: &str,
    ) -> StakehouseResult<PlayOutcome> {
        let game = GameKind::from_id(game_id)
            .ok_or_else(|| RoundError::UnknownGame(game_id.to_string()))?;
        self.play_game(player, surface, game).await
    }

    pub async fn energy_menu(&self, player: &ActorId, surface: &SurfaceId) -> StakehouseResult<EnergyMenuOutcome> {
        let record = self.ledger.fetch(player).await?;
        EnergyMenu::new(
            self.ledger.clone(),
            self.renderer.clone(),
            self.clock.clone(),
            self.regulator.clone(),
            self.config.energy_menu_ttl(),
        )
        .run(
            player.clone(),
            surface.clone(),
            self.ids(),
            record,
            self.events.clone(),
        )
        .await
    }

    pub async fn boosters(&self, player: &ActorId, surface: &SurfaceId) -> StakehouseResult<BoosterShopOutcome> {
        let record = self.ledger.fetch(player).await?;
        let shop = BoosterShop::new(
            self.ledger.clone(),
            self.renderer.clone(),
            self.clock.clone(),
            self.catalog.clone(),
            self.config.boosters_ttl(),
        );
        let shop = match self.seed {
            Some(seed) => shop.seed(seed),
            None => shop,
        };
        shop.run(
            player.clone(),
            surface.clone(),
            self.ids(),
            record,
            self.events.clone(),
        )
        .await
    }

    /// Parse, validate and persist a new bet
    pub async fn set_bet(&self, player: &ActorId, amount: &str) -> StakehouseResult<u64> {
        let mut record = self.ledger.fetch(player).await?;
        let amount = self.bets.parse_amount(amount, &record)?;
        self.bets
            .set_bet(self.ledger.as_ref(), &mut record, amount)
            .await
    }

    async fn start_round(
        &self,
        player: &ActorId,
        surface: &SurfaceId,
        game: GameKind,
        record: PlayerRecord,
    ) -> StakehouseResult<PlayOutcome> {
        if record.bet == 0 || record.bet > record.wallet {
            return Err(RoundError::InsufficientFunds {
                bet: record.bet,
                wallet: record.wallet,
            }
            .into());
        }

        let record = match self.energy_gate(player, surface, record).await? {
            Ok(record) => record,
            Err(outcome) => return Ok(outcome),
        };

        tracing::info!("{} starts a {} round", player, game);
        let (player, surface, events) = (player.clone(), surface.clone(), self.events.clone());
        let report = match game {
            GameKind::Highlow => {
                self.round(Highlow::default(), game)
                    .run(player, surface, record, events)
                    .await?
            }
            GameKind::DiceRoll => {
                self.round(DiceRoll, game)
                    .run(player, surface, record, events)
                    .await?
            }
            GameKind::SlotMachine => {
                self.round(SlotMachine, game)
                    .run(player, surface, record, events)
                    .await?
            }
        };
        Ok(PlayOutcome::Played(report))
    }

    /// Pass through when energy is live; otherwise prompt for a recharge
    async fn energy_gate(
        &self,
        player: &ActorId,
        surface: &SurfaceId,
        record: PlayerRecord,
    ) -> StakehouseResult<Result<PlayerRecord, PlayOutcome>> {
        let now_ms = self.clock.now_ms();
        if !EnergyRegulator::is_expired(&record.energy, now_ms) {
            return Ok(Ok(record));
        }

        if record.energy.charge == 0 {
            let expires_at_ms = record.energy.expires_at_ms;
            tracing::debug!("{} is out of energy", player);
            self.renderer
                .render(surface, Frame::NoEnergy { expires_at_ms })
                .await?;
            return Ok(Err(PlayOutcome::NoEnergy { expires_at_ms }));
        }

        let prompt = EnergyPrompt::new(
            self.ledger.clone(),
            self.renderer.clone(),
            self.clock.clone(),
            self.regulator.clone(),
            self.config.energy_prompt_ttl(),
        )
        .run(
            player.clone(),
            surface.clone(),
            self.ids(),
            record,
            self.events.clone(),
        )
        .await?;

        if prompt.energized {
            Ok(Ok(prompt.record))
        } else {
            Ok(Err(PlayOutcome::NotEnergized))
        }
    }

    fn round<G: Game>(&self, game: G, kind: GameKind) -> RoundRunner<G> {
        let runner = RoundRunner::new(
            game,
            self.ledger.clone(),
            self.renderer.clone(),
            self.clock.clone(),
            self.config.game_ttl(kind),
        );
        match self.seed {
            Some(seed) => runner.seed(seed),
            None => runner,
        }
    }

    fn ids(&self) -> ActionIdGenerator {
        ActionIdGenerator::new(self.clock.now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::economy::MemoryLedger;
    use crate::energy::EnergyState;
    use crate::errors::{BetError, StakehouseError};
    use crate::render::RecordingRenderer;
    use crate::session::EventHub;

    struct Setup {
        house: GameHouse,
        ledger: Arc<MemoryLedger>,
        renderer: Arc<RecordingRenderer>,
        player: ActorId,
        surface: SurfaceId,
    }

    fn setup() -> Setup {
        let config = StakehouseConfig::testing();
        let ledger = Arc::new(MemoryLedger::new(config.clone()));
        let renderer = Arc::new(RecordingRenderer::new());
        let house = GameHouse::new(
            config,
            Arc::new(EventHub::new()),
            ledger.clone(),
            renderer.clone(),
            Arc::new(ManualClock::new(1_000_000)),
        );
        Setup {
            house,
            ledger,
            renderer,
            player: ActorId::new("p1"),
            surface: SurfaceId::new("play-1"),
        }
    }

    #[tokio::test]
    async fn test_no_energy_stops_before_round() {
        let s = setup();
        let mut record = s.ledger.fetch(&s.player).await.unwrap();
        record.energy = EnergyState::new(0);
        s.ledger.insert(record);

        let outcome = s
            .house
            .play_game(&s.player, &s.surface, GameKind::DiceRoll)
            .await
            .unwrap();

        assert!(matches!(outcome, PlayOutcome::NoEnergy { expires_at_ms: 0 }));
        assert_eq!(
            s.renderer.last(&s.surface),
            Some(Frame::NoEnergy { expires_at_ms: 0 })
        );
    }

    #[tokio::test]
    async fn test_insufficient_funds_checked_first() {
        let s = setup();
        let mut record = s.ledger.fetch(&s.player).await.unwrap();
        record.wallet = 100;
        s.ledger.insert(record);

        let result = s
            .house
            .play_game(&s.player, &s.surface, GameKind::Highlow)
            .await;

        assert!(matches!(
            result,
            Err(StakehouseError::Round(RoundError::InsufficientFunds { .. }))
        ));
        assert!(s.renderer.frames(&s.surface).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignored_energy_prompt_means_no_round() {
        let s = setup();

        let outcome = s
            .house
            .play_game(&s.player, &s.surface, GameKind::SlotMachine)
            .await
            .unwrap();

        assert!(matches!(outcome, PlayOutcome::NotEnergized));
        assert_eq!(s.ledger.get(&s.player).unwrap().wallet, 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_energy_skips_prompt_and_round_times_out() {
        let s = setup();
        let mut record = s.ledger.fetch(&s.player).await.unwrap();
        record.energy.expires_at_ms = u64::MAX;
        s.ledger.insert(record);

        let outcome = s
            .house
            .play_game(&s.player, &s.surface, GameKind::DiceRoll)
            .await
            .unwrap();

        match outcome {
            PlayOutcome::Played(report) => {
                assert!(report.reason.is_timeout());
                // Dice keep the stake on timeout
                assert!(report.settlement.is_none());
                assert_eq!(report.record.wallet, 10_000);
            }
            other => panic!("Expected a played round, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_game_id() {
        let s = setup();

        let result = s.house.play_by_id(&s.player, &s.surface, "roulette").await;
        assert!(matches!(
            result,
            Err(StakehouseError::Round(RoundError::UnknownGame(id))) if id == "roulette"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_boosters_shop_times_out_without_purchase() {
        let s = setup();

        let outcome = s.house.boosters(&s.player, &s.surface).await.unwrap();

        assert!(outcome.reason.is_timeout());
        assert!(outcome.purchase.is_none());
        assert!(outcome.record.boosters.is_empty());
        assert!(matches!(s.renderer.last(&s.surface), Some(Frame::Boosters(_))));
    }

    #[tokio::test]
    async fn test_set_bet_from_shorthand() {
        let s = setup();

        assert_eq!(s.house.set_bet(&s.player, "2k").await.unwrap(), 2_000);
        assert_eq!(s.ledger.get(&s.player).unwrap().bet, 2_000);

        let error = s.house.set_bet(&s.player, "1m").await.unwrap_err();
        assert!(matches!(
            error,
            StakehouseError::Bet(BetError::AboveMaximum { .. })
        ));
    }
}
