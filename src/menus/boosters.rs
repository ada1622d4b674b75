//! Booster shop session: pick a booster, pick an offer, buy

use crate::action_id::{ActionIdGenerator, Control};
use crate::clock::Clock;
use crate::economy::{commit, BoosterCatalog, BoosterOffer, Ledger, PaymentUnit, PlayerRecord};
use crate::errors::StakehouseResult;
use crate::render::{BoosterFrame, BoosterListing, ControlFrame, Frame, Renderer};
use crate::session::{
    ActionContext, ActionHandler, ActorId, EndContext, EndHandler, EventSource, SessionCollector,
    StopReason, SurfaceId,
};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoosterControl {
    /// Booster list; events carry the booster id
    Picker,
    /// Offer list of the picked booster; events carry the offer id
    Offer,
    Buy,
    Cancel,
}

impl Control for BoosterControl {
    const ALL: &'static [Self] = &[
        BoosterControl::Picker,
        BoosterControl::Offer,
        BoosterControl::Buy,
        BoosterControl::Cancel,
    ];

    fn label(self) -> &'static str {
        match self {
            BoosterControl::Picker => "booster_picker",
            BoosterControl::Offer => "booster_offer",
            BoosterControl::Buy => "booster_buy",
            BoosterControl::Cancel => "booster_cancel",
        }
    }
}

/// A completed purchase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoosterPurchase {
    pub booster: String,
    pub offer: String,
    pub unit: PaymentUnit,
    pub cost: u64,
    /// Milliseconds or uses, depending on the offer kind
    pub granted: u64,
}

#[derive(Debug)]
pub struct BoosterShopState {
    pub record: PlayerRecord,
    pub booster: Option<String>,
    pub offer: Option<String>,
    purchase: Option<BoosterPurchase>,
    rng: StdRng,
}

#[derive(Debug, Clone)]
pub struct BoosterShopOutcome {
    pub purchase: Option<BoosterPurchase>,
    pub reason: StopReason,
    pub record: PlayerRecord,
}

pub struct BoosterShop {
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    catalog: BoosterCatalog,
    ttl: Duration,
    seed: Option<u64>,
}

impl BoosterShop {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        renderer: Arc<dyn Renderer>,
        clock: Arc<dyn Clock>,
        catalog: BoosterCatalog,
        ttl: Duration,
    ) -> Self {
        Self {
            ledger,
            renderer,
            clock,
            catalog,
            ttl,
            seed: None,
        }
    }

    /// Draw random offer values from a fixed seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub async fn run(
        self,
        origin: ActorId,
        surface: SurfaceId,
        ids: ActionIdGenerator,
        record: PlayerRecord,
        events: Arc<dyn EventSource>,
    ) -> StakehouseResult<BoosterShopOutcome> {
        let state = BoosterShopState {
            record,
            booster: None,
            offer: None,
            purchase: None,
            rng: match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        };
        let handlers = Arc::new(ShopHandlers {
            ledger: self.ledger,
            renderer: self.renderer,
            clock: self.clock,
            catalog: self.catalog,
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

        Ok(BoosterShopOutcome {
            purchase: report.state.purchase,
            reason: report.reason,
            record: report.state.record,
        })
    }
}

struct ShopHandlers {
    ledger: Arc<dyn Ledger>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    catalog: BoosterCatalog,
    surface: SurfaceId,
    ids: ActionIdGenerator,
}

impl ShopHandlers {
    fn chosen(&self, state: &BoosterShopState) -> Option<&BoosterOffer> {
        let booster = self.catalog.get(state.booster.as_deref()?)?;
        booster.offer(state.offer.as_deref()?)
    }

    fn frame(&self, state: &BoosterShopState, live: bool) -> Frame {
        let chosen = self.chosen(state);
        let affordable = chosen.is_some_and(|offer| offer.check_affordable(&state.record).is_ok());
        let controls = BoosterControl::ALL
            .iter()
            .map(|control| {
                let enabled = match control {
                    BoosterControl::Offer => live && state.booster.is_some(),
                    BoosterControl::Buy => live && affordable,
                    _ => live,
                };
                ControlFrame::of(&self.ids, *control, enabled)
            })
            .collect();

        let offers = state
            .booster
            .as_deref()
            .and_then(|id| self.catalog.get(id))
            .map(|booster| booster.offers.clone())
            .unwrap_or_default();

        Frame::Boosters(BoosterFrame {
            boosters: self
                .catalog
                .boosters()
                .iter()
                .map(|booster| BoosterListing {
                    id: booster.id.clone(),
                    name: booster.name.clone(),
                    description: booster.description.clone(),
                })
                .collect(),
            selected: state.booster.clone(),
            offers,
            selected_offer: state.offer.clone(),
            balance: chosen.map(|offer| offer.unit.balance(&state.record)),
            controls,
        })
    }

    async fn buy(&self, state: &mut BoosterShopState) -> StakehouseResult<bool> {
        let (Some(booster), Some(offer)) = (state.booster.clone(), state.offer.clone()) else {
            return Ok(false);
        };
        let (_, offer) = self.catalog.find(&booster, &offer)?;
        if let Err(error) = offer.check_affordable(&state.record) {
            tracing::debug!("Purchase refused for {}: {}", state.record.player, error);
            return Ok(false);
        }

        let granted = offer.value.draw(&mut state.rng);
        let now_ms = self.clock.now_ms();
        commit(&*self.ledger, &mut state.record, |record| {
            offer.apply(&booster, granted, record, now_ms)
        })
        .await?;

        tracing::info!(
            "{} bought {} ({} for {} {})",
            state.record.player,
            booster,
            granted,
            offer.cost,
            offer.unit
        );
        state.purchase = Some(BoosterPurchase {
            booster,
            offer: offer.id.clone(),
            unit: offer.unit,
            cost: offer.cost,
            granted,
        });
        Ok(true)
    }
}

#[async_trait]
impl ActionHandler<BoosterControl, BoosterShopState> for ShopHandlers {
    async fn handle(&self, ctx: &mut ActionContext<'_, BoosterControl, BoosterShopState>) -> StakehouseResult<()> {
        match ctx.control() {
            BoosterControl::Picker => {
                let Some(booster) = ctx.event().selected().and_then(|id| self.catalog.get(id)) else {
                    tracing::debug!("Ignoring unknown booster {:?}", ctx.event().selected());
                    return Ok(());
                };
                ctx.state.booster = Some(booster.id.clone());
                ctx.state.offer = None;
            }
            BoosterControl::Offer => {
                let Some(booster) = ctx.state.booster.as_deref().and_then(|id| self.catalog.get(id)) else {
                    return Ok(());
                };
                let Some(offer) = ctx.event().selected().and_then(|id| booster.offer(id)) else {
                    tracing::debug!("Ignoring unknown offer {:?}", ctx.event().selected());
                    return Ok(());
                };
                ctx.state.offer = Some(offer.id.clone());
            }
            BoosterControl::Buy => {
                if self.buy(ctx.state).await? {
                    ctx.stop();
                    return Ok(());
                }
            }
            BoosterControl::Cancel => {
                ctx.stop();
                return Ok(());
            }
        }

        self.renderer
            .render(&self.surface, self.frame(ctx.state, true))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EndHandler<BoosterShopState> for ShopHandlers {
    async fn on_end(&self, ctx: EndContext<'_, BoosterShopState>) -> StakehouseResult<()> {
        if *ctx.reason == StopReason::Error {
            return Ok(());
        }
        self.renderer
            .render(&self.surface, self.frame(ctx.state, false))
            .await?;
        Ok(())
    }
}
