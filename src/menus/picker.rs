//! Game picker session

use crate::action_id::{ActionIdGenerator, Control};
use crate::economy::{commit, Ledger, PlayerRecord};
use crate::errors::StakehouseResult;
use crate::games::GameKind;
use crate::render::{ControlFrame, Frame, PickerFrame, Renderer};
use crate::session::{
    ActionContext, ActionHandler, ActorId, EndContext, EndHandler, EventSource, SessionCollector,
    StopReason, SurfaceId,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickerControl {
    /// The game list; its events carry the selected game id
    List,
    Proceed,
    Cancel,
}

impl Control for PickerControl {
    const ALL: &'static [Self] = &[PickerControl::List, PickerControl::Proceed, PickerControl::Cancel];

    fn label(self) -> &'static str {
        match self {
            PickerControl::List => "picker_list",
            PickerControl::Proceed => "picker_proceed",
            PickerControl::Cancel => "picker_cancel",
        }
    }
}

#[derive(Debug)]
pub struct PickerState {
    pub record: PlayerRecord,
    pub selected: Option<GameKind>,
    proceeded: bool,
}

#[derive(Debug, Clone)]
pub struct PickerOutcome {
    /// The game to play; `None` when cancelled or timed out
    pub game: Option<GameKind>,
    pub reason: StopReason,
    pub record: PlayerRecord,
}

pub struct GamePicker {
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    ttl: Duration,
}

impl GamePicker {
    pub fn new(ledger: Arc<dyn Ledger>, renderer: Arc<dyn Renderer>, ttl: Duration) -> Self {
        Self {
            ledger,
            renderer,
            ttl,
        }
    }

    /// Let the player choose a game, starting from the last one they played
    pub async fn run(
        self,
        origin: ActorId,
        surface: SurfaceId,
        ids: ActionIdGenerator,
        record: PlayerRecord,
        events: Arc<dyn EventSource>,
    ) -> StakehouseResult<PickerOutcome> {
        let state = PickerState {
            selected: record.last_game,
            record,
            proceeded: false,
        };
        let handlers = Arc::new(PickerHandlers {
            ledger: self.ledger,
            renderer: self.renderer,
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

        let state = report.state;
        Ok(PickerOutcome {
            game: state.selected.filter(|_| state.proceeded),
            reason: report.reason,
            record: state.record,
        })
    }
}

struct PickerHandlers {
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    surface: SurfaceId,
    ids: ActionIdGenerator,
}

impl PickerHandlers {
    fn frame(&self, state: &PickerState, live: bool) -> Frame {
        let controls = PickerControl::ALL
            .iter()
            .map(|control| {
                let enabled = match control {
                    PickerControl::Proceed => live && state.selected.is_some(),
                    _ => live,
                };
                ControlFrame::of(&self.ids, *control, enabled)
            })
            .collect();

        Frame::Picker(PickerFrame {
            games: GameKind::ALL.iter().map(|kind| kind.id().to_string()).collect(),
            selected: state.selected.map(|kind| kind.id().to_string()),
            stats: state.selected.map(|kind| state.record.stats(kind)),
            controls,
        })
    }
}

#[async_trait]
impl ActionHandler<PickerControl, PickerState> for PickerHandlers {
    async fn handle(&self, ctx: &mut ActionContext<'_, PickerControl, PickerState>) -> StakehouseResult<()> {
        match ctx.control() {
            PickerControl::List => {
                let Some(kind) = ctx.event().selected().and_then(GameKind::from_id) else {
                    tracing::debug!("Ignoring unknown picker selection {:?}", ctx.event().selected());
                    return Ok(());
                };
                ctx.state.selected = Some(kind);
                self.renderer
                    .render(&self.surface, self.frame(ctx.state, true))
                    .await?;
                // Browsing keeps the picker open
                ctx.reset_timer();
            }
            PickerControl::Proceed => {
                let Some(kind) = ctx.state.selected else {
                    return Ok(());
                };
                commit(&*self.ledger, &mut ctx.state.record, |record| {
                    record.last_game = Some(kind)
                })
                .await?;
                ctx.state.proceeded = true;
                ctx.stop();
            }
            PickerControl::Cancel => ctx.stop(),
        }
        Ok(())
    }
}

#[async_trait]
impl EndHandler<PickerState> for PickerHandlers {
    async fn on_end(&self, ctx: EndContext<'_, PickerState>) -> StakehouseResult<()> {
        if ctx.state.proceeded {
            self.renderer
                .render(&self.surface, self.frame(ctx.state, false))
                .await?;
            return Ok(());
        }

        let notice = match ctx.reason {
            StopReason::Timeout => "No game picked in time",
            StopReason::Error => return Ok(()),
            _ => "Game selection cancelled",
        };
        self.renderer
            .render(
                &self.surface,
                Frame::Closed {
                    notice: notice.to_string(),
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StakehouseConfig;
    use crate::economy::MemoryLedger;
    use crate::render::RecordingRenderer;
    use crate::session::{ActorEvent, EventHub};

    struct Fixture {
        hub: Arc<EventHub>,
        ledger: Arc<MemoryLedger>,
        renderer: Arc<RecordingRenderer>,
        player: ActorId,
        surface: SurfaceId,
        ids: ActionIdGenerator,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                hub: Arc::new(EventHub::new()),
                ledger: Arc::new(MemoryLedger::new(StakehouseConfig::default())),
                renderer: Arc::new(RecordingRenderer::new()),
                player: ActorId::new("p1"),
                surface: SurfaceId::new("play-1"),
                ids: ActionIdGenerator::with_nonce(5_000, 9),
            }
        }

        async fn start(&self, record: PlayerRecord) -> tokio::task::JoinHandle<StakehouseResult<PickerOutcome>> {
            let picker = GamePicker::new(self.ledger.clone(), self.renderer.clone(), Duration::from_secs(10));
            let handle = tokio::spawn(picker.run(
                self.player.clone(),
                self.surface.clone(),
                self.ids,
                record,
                self.hub.clone(),
            ));
            while self.hub.subscriber_count(&self.surface) == 0 {
                tokio::task::yield_now().await;
            }
            handle
        }

        fn select(&self, game: &str) {
            self.hub.publish(ActorEvent::select(
                self.player.clone(),
                self.surface.clone(),
                self.ids.create_control(PickerControl::List).to_string(),
                vec![game.to_string()],
            ));
        }

        fn press(&self, control: PickerControl) {
            self.hub.publish(ActorEvent::press(
                self.player.clone(),
                self.surface.clone(),
                self.ids.create_control(control).to_string(),
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_then_proceed_persists_last_game() {
        let fx = Fixture::new();
        let record = fx.ledger.fetch(&fx.player).await.unwrap();
        let picker = fx.start(record).await;

        fx.select("slotmachine");
        fx.press(PickerControl::Proceed);
        let outcome = picker.await.unwrap().unwrap();

        assert_eq!(outcome.game, Some(GameKind::SlotMachine));
        assert_eq!(outcome.record.last_game, Some(GameKind::SlotMachine));
        assert_eq!(
            fx.ledger.get(&fx.player).unwrap().last_game,
            Some(GameKind::SlotMachine)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_proceed_without_selection_is_ignored() {
        let fx = Fixture::new();
        let record = fx.ledger.fetch(&fx.player).await.unwrap();
        let picker = fx.start(record).await;

        fx.press(PickerControl::Proceed);
        let outcome = picker.await.unwrap().unwrap();

        assert_eq!(outcome.game, None);
        assert_eq!(outcome.reason, StopReason::Timeout);
        assert_eq!(fx.ledger.persist_count(), 0);
        assert_eq!(
            fx.renderer.last(&fx.surface),
            Some(Frame::Closed {
                notice: "No game picked in time".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_selecting_extends_the_picker() {
        let fx = Fixture::new();
        let record = fx.ledger.fetch(&fx.player).await.unwrap();
        let picker = fx.start(record).await;

        tokio::time::advance(Duration::from_secs(8)).await;
        fx.select("diceroll");
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        tokio::time::advance(Duration::from_secs(8)).await;
        fx.press(PickerControl::Proceed);

        let outcome = picker.await.unwrap().unwrap();
        assert_eq!(outcome.game, Some(GameKind::DiceRoll));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_game_preselected_and_cancel() {
        let fx = Fixture::new();
        let mut record = fx.ledger.fetch(&fx.player).await.unwrap();
        record.last_game = Some(GameKind::Highlow);
        let picker = fx.start(record).await;

        match fx.renderer.last(&fx.surface) {
            Some(Frame::Picker(frame)) => {
                assert_eq!(frame.selected.as_deref(), Some("highlow"));
                assert!(frame.controls.iter().all(|control| control.enabled));
            }
            other => panic!("Expected picker frame, got {other:?}"),
        }

        fx.press(PickerControl::Cancel);
        let outcome = picker.await.unwrap().unwrap();
        assert_eq!(outcome.game, None);
        assert_eq!(outcome.reason, StopReason::Action("picker_cancel".to_string()));
    }
}
