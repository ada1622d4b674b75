//! Energy menu: recharge on demand, or turn stars into charge

use super::energy_frame;
use crate::action_id::{ActionIdGenerator, Control};
use crate::clock::Clock;
use crate::economy::{commit, Ledger, PlayerRecord};
use crate::energy::EnergyRegulator;
use crate::errors::StakehouseResult;
use crate::render::{Frame, Renderer};
use crate::session::{
    ActionContext, ActionHandler, ActorId, EndContext, EndHandler, EventSource, SessionCollector,
    StopReason, SurfaceId,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyMenuControl {
    Recharge,
    Convert,
}

impl Control for EnergyMenuControl {
    const ALL: &'static [Self] = &[EnergyMenuControl::Recharge, EnergyMenuControl::Convert];

    fn label(self) -> &'static str {
        match self {
            EnergyMenuControl::Recharge => "energy_recharge",
            EnergyMenuControl::Convert => "energy_convert",
        }
    }
}

#[derive(Debug)]
pub struct EnergyMenuState {
    pub record: PlayerRecord,
    applied: Option<EnergyMenuControl>,
    /// Charge gained by the last conversion
    converted: u32,
}

#[derive(Debug, Clone)]
pub struct EnergyMenuOutcome {
    /// The action that changed the player's energy, if any
    pub applied: Option<EnergyMenuControl>,
    pub converted: u32,
    pub reason: StopReason,
    pub record: PlayerRecord,
}

pub struct EnergyMenu {
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    regulator: EnergyRegulator,
    ttl: Duration,
}

impl EnergyMenu {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        renderer: Arc<dyn Renderer>,
        clock: Arc<dyn Clock>,
        regulator: EnergyRegulator,
        ttl: Duration,
    ) -> Self {
        Self {
            ledger,
            renderer,
            clock,
            regulator,
            ttl,
        }
    }

    pub async fn run(
        self,
        origin: ActorId,
        surface: SurfaceId,
        ids: ActionIdGenerator,
        record: PlayerRecord,
        events: Arc<dyn EventSource>,
    ) -> StakehouseResult<EnergyMenuOutcome> {
        let state = EnergyMenuState {
            record,
            applied: None,
            converted: 0,
        };
        let handlers = Arc::new(MenuHandlers {
            ledger: self.ledger,
            renderer: self.renderer,
            clock: self.clock,
            regulator: self.regulator,
            surface: surface.clone(),
            ids,
        });
        handlers
            .renderer
            .render(&surface, handlers.frame(&state.record, true))
            .await?;

        // Any choice ends the menu
        let report = SessionCollector::new(origin, surface, ids, self.ttl)
            .max_events(1)
            .on_all(handlers.clone())
            .on_end(handlers)
            .run(events, state)
            .await?;

        Ok(EnergyMenuOutcome {
            applied: report.state.applied,
            converted: report.state.converted,
            reason: report.reason,
            record: report.state.record,
        })
    }
}

struct MenuHandlers {
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    regulator: EnergyRegulator,
    surface: SurfaceId,
    ids: ActionIdGenerator,
}

impl MenuHandlers {
    fn frame(&self, record: &PlayerRecord, live: bool) -> Frame {
        Frame::EnergyMenu(energy_frame::<EnergyMenuControl>(
            record,
            &self.regulator,
            &self.ids,
            |_| live,
        ))
    }
}

#[async_trait]
impl ActionHandler<EnergyMenuControl, EnergyMenuState> for MenuHandlers {
    async fn handle(&self, ctx: &mut ActionContext<'_, EnergyMenuControl, EnergyMenuState>) -> StakehouseResult<()> {
        let control = ctx.control();
        let state = &mut *ctx.state;
        let current = state.record.energy;

        let (energy, converted) = match control {
            EnergyMenuControl::Recharge => {
                match self
                    .regulator
                    .energize(current, state.record.tier, self.clock.now_ms())
                {
                    Ok(energy) => (energy, 0),
                    Err(error) => {
                        tracing::debug!("Recharge refused for {}: {}", state.record.player, error);
                        return Ok(());
                    }
                }
            }
            EnergyMenuControl::Convert => {
                let (energy, gained) = self.regulator.convert_stars(current);
                if gained == 0 {
                    return Ok(());
                }
                (energy, gained)
            }
        };

        commit(&*self.ledger, &mut state.record, |record| record.energy = energy).await?;
        state.applied = Some(control);
        state.converted = converted;
        Ok(())
    }
}

#[async_trait]
impl EndHandler<EnergyMenuState> for MenuHandlers {
    async fn on_end(&self, ctx: EndContext<'_, EnergyMenuState>) -> StakehouseResult<()> {
        if *ctx.reason == StopReason::Error {
            return Ok(());
        }
        self.renderer
            .render(&self.surface, self.frame(&ctx.state.record, false))
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
    use crate::energy::EnergyState;
    use crate::render::RecordingRenderer;
    use crate::session::{ActorEvent, EventHub};

    const NOW: u64 = 2_000_000;

    async fn run_menu(
        energy: EnergyState,
        press: Option<EnergyMenuControl>,
    ) -> (EnergyMenuOutcome, Arc<MemoryLedger>) {
        let hub = Arc::new(EventHub::new());
        let ledger = Arc::new(MemoryLedger::new(StakehouseConfig::default()));
        let player = ActorId::new("p1");
        let surface = SurfaceId::new("energy-1");
        let ids = ActionIdGenerator::with_nonce(NOW, 1);
        let config = StakehouseConfig::default();

        let mut record = ledger.fetch(&player).await.unwrap();
        record.energy = energy;
        record.tier = 2;

        let menu = EnergyMenu::new(
            ledger.clone(),
            Arc::new(RecordingRenderer::new()),
            Arc::new(ManualClock::new(NOW)),
            EnergyRegulator::new(&config.energy),
            config.energy_menu_ttl(),
        );
        let handle = tokio::spawn(menu.run(player.clone(), surface.clone(), ids, record, hub.clone()));
        while hub.subscriber_count(&surface) == 0 {
            tokio::task::yield_now().await;
        }

        if let Some(control) = press {
            hub.publish(ActorEvent::press(
                player,
                surface,
                ids.create_control(control).to_string(),
            ));
        }
        (handle.await.unwrap().unwrap(), ledger)
    }

    #[tokio::test(start_paused = true)]
    async fn test_recharge_uses_tier_window() {
        let (outcome, ledger) = run_menu(EnergyState::new(3), Some(EnergyMenuControl::Recharge)).await;

        assert_eq!(outcome.applied, Some(EnergyMenuControl::Recharge));
        assert_eq!(outcome.record.energy.charge, 2);
        assert_eq!(outcome.record.energy.expires_at_ms, NOW + 30 * 60 * 1_000);
        assert_eq!(outcome.reason, StopReason::Action("energy_recharge".to_string()));
        assert_eq!(ledger.persist_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_convert_stars() {
        let energy = EnergyState {
            charge: 1,
            stars: 25,
            ..EnergyState::default()
        };
        let (outcome, _) = run_menu(energy, Some(EnergyMenuControl::Convert)).await;

        assert_eq!(outcome.converted, 2);
        assert_eq!(outcome.record.energy.charge, 3);
        assert_eq!(outcome.record.energy.stars, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_choice_still_ends_menu() {
        let (outcome, ledger) = run_menu(EnergyState::new(0), Some(EnergyMenuControl::Recharge)).await;

        assert_eq!(outcome.applied, None);
        assert_eq!(outcome.record.energy.charge, 0);
        assert_eq!(ledger.persist_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_choice() {
        let (outcome, _) = run_menu(EnergyState::new(1), None).await;

        assert_eq!(outcome.reason, StopReason::Timeout);
        assert_eq!(outcome.applied, None);
    }
}
