//! Energy prompt: shown before a round when the player's energy has expired

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
pub enum EnergyPromptControl {
    Energize,
    Cancel,
}

impl Control for EnergyPromptControl {
    const ALL: &'static [Self] = &[EnergyPromptControl::Energize, EnergyPromptControl::Cancel];

    fn label(self) -> &'static str {
        match self {
            EnergyPromptControl::Energize => "energy_energize",
            EnergyPromptControl::Cancel => "energy_cancel",
        }
    }
}

#[derive(Debug)]
pub struct EnergyPromptState {
    pub record: PlayerRecord,
    energized: bool,
    /// Energize turned out to be impossible
    drained: bool,
}

#[derive(Debug, Clone)]
pub struct EnergyPromptOutcome {
    pub energized: bool,
    pub reason: StopReason,
    pub record: PlayerRecord,
}

pub struct EnergyPrompt {
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    regulator: EnergyRegulator,
    ttl: Duration,
}

impl EnergyPrompt {
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
    ) -> StakehouseResult<EnergyPromptOutcome> {
        let state = EnergyPromptState {
            record,
            energized: false,
            drained: false,
        };
        let handlers = Arc::new(PromptHandlers {
            ledger: self.ledger,
            renderer: self.renderer,
            clock: self.clock,
            regulator: self.regulator,
            surface: surface.clone(),
            ids,
        });
        handlers
            .renderer
            .render(&surface, handlers.frame(&state, true))
            .await?;

        let report = SessionCollector::new(origin, surface, ids, self.ttl)
            .on_all(handlers.clone())
            .on_end(handlers)
            .run(events, state)
            .await?;

        Ok(EnergyPromptOutcome {
            energized: report.state.energized,
            reason: report.reason,
            record: report.state.record,
        })
    }
}

struct PromptHandlers {
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    regulator: EnergyRegulator,
    surface: SurfaceId,
    ids: ActionIdGenerator,
}

impl PromptHandlers {
    fn frame(&self, state: &EnergyPromptState, live: bool) -> Frame {
        Frame::EnergyPrompt(energy_frame::<EnergyPromptControl>(
            &state.record,
            &self.regulator,
            &self.ids,
            |control| match control {
                EnergyPromptControl::Energize => live && !state.drained,
                EnergyPromptControl::Cancel => live,
            },
        ))
    }
}

#[async_trait]
impl ActionHandler<EnergyPromptControl, EnergyPromptState> for PromptHandlers {
    async fn handle(
        &self,
        ctx: &mut ActionContext<'_, EnergyPromptControl, EnergyPromptState>,
    ) -> StakehouseResult<()> {
        if ctx.control() == EnergyPromptControl::Cancel {
            ctx.stop();
            return Ok(());
        }

        let state = &mut *ctx.state;
        let energy = self
            .regulator
            .energize(state.record.energy, state.record.tier, self.clock.now_ms());
        match energy {
            Ok(energy) => {
                commit(&*self.ledger, &mut state.record, |record| record.energy = energy).await?;
                state.energized = true;
                ctx.stop();
            }
            Err(error) => {
                // Nothing to spend: leave the prompt up with only cancel enabled
                tracing::debug!("Energize refused for {}: {}", state.record.player, error);
                state.drained = true;
                self.renderer
                    .render(&self.surface, self.frame(state, true))
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EndHandler<EnergyPromptState> for PromptHandlers {
    async fn on_end(&self, ctx: EndContext<'_, EnergyPromptState>) -> StakehouseResult<()> {
        if *ctx.reason == StopReason::Error {
            return Ok(());
        }
        self.renderer
            .render(&self.surface, self.frame(ctx.state, false))
            .await?;
        Ok(())
    }
}
