//! The session collector state machine

use super::event::{ActorEvent, ActorId, EventSource, SurfaceId};
use super::{SessionPhase, SessionReport, StopReason};
use crate::action_id::{ActionId, ActionIdGenerator, Control};
use crate::errors::{DispatchMiss, SessionError, SessionResult, StakehouseError, StakehouseResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

/// Predicate over an event and the session's originating actor
pub type ActorFilter = Arc<dyn Fn(&ActorEvent, &ActorId) -> bool + Send + Sync>;

/// Accept only events produced by the originating actor
pub fn origin_only() -> ActorFilter {
    Arc::new(|event, origin| &event.actor == origin)
}

/// Handles the events of one or more controls
#[async_trait]
pub trait ActionHandler<C: Control, S: Send + 'static>: Send + Sync {
    async fn handle(&self, ctx: &mut ActionContext<'_, C, S>) -> StakehouseResult<()>;
}

/// Runs once when the session stops, after the subscription is torn down
#[async_trait]
pub trait EndHandler<S: Send + 'static>: Send + Sync {
    async fn on_end(&self, ctx: EndContext<'_, S>) -> StakehouseResult<()>;
}

#[derive(Debug, Default)]
struct Signals {
    stop: Option<String>,
    /// When the handler asked for a fresh TTL
    reset_at: Option<Instant>,
}

/// What a handler sees for one event
pub struct ActionContext<'a, C, S> {
    event: &'a ActorEvent,
    action: &'a ActionId,
    control: C,
    /// Session-local state, shared by every handler of the session
    pub state: &'a mut S,
    signals: Signals,
}

impl<'a, C: Control, S> ActionContext<'a, C, S> {
    pub fn event(&self) -> &ActorEvent {
        self.event
    }

    pub fn action(&self) -> &ActionId {
        self.action
    }

    pub fn control(&self) -> C {
        self.control
    }

    /// Stop the session once this handler returns; the reason is the control label
    pub fn stop(&mut self) {
        let label = self.control.label();
        self.stop_with(label);
    }

    /// Stop with an explicit reason. Only the first stop counts.
    pub fn stop_with(&mut self, reason: impl Into<String>) {
        if self.signals.stop.is_none() {
            self.signals.stop = Some(reason.into());
        }
    }

    /// Restart the TTL, counted from the moment of this call
    pub fn reset_timer(&mut self) {
        self.signals.reset_at = Some(Instant::now());
    }

    pub fn is_stopping(&self) -> bool {
        self.signals.stop.is_some()
    }
}

/// What the end callback sees
pub struct EndContext<'a, S> {
    pub reason: &'a StopReason,
    pub processed: usize,
    pub state: &'a mut S,
}

/// Remote control over a session: external stop and phase inspection
#[derive(Clone)]
pub struct SessionHandle {
    stop: Arc<watch::Sender<bool>>,
    phase: Arc<watch::Sender<SessionPhase>>,
}

impl SessionHandle {
    fn new() -> Self {
        let (stop, _) = watch::channel(false);
        let (phase, _) = watch::channel(SessionPhase::Idle);
        Self {
            stop: Arc::new(stop),
            phase: Arc::new(phase),
        }
    }

    /// Request an external stop. Idempotent; a no-op once stopped.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase.borrow().clone()
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.phase(), SessionPhase::Stopped(_))
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.send_replace(phase);
    }
}

type BoundHandler<C, S> = (C, Arc<dyn ActionHandler<C, S>>);

/// A single-use session over controls `C` with session-local state `S`
pub struct SessionCollector<C: Control, S: Send + 'static> {
    origin: ActorId,
    surface: SurfaceId,
    ids: ActionIdGenerator,
    ttl: Duration,
    max_events: Option<usize>,
    filter: ActorFilter,
    handlers: HashMap<ActionId, BoundHandler<C, S>>,
    on_end: Option<Arc<dyn EndHandler<S>>>,
    handle: SessionHandle,
}

impl<C: Control, S: Send + 'static> SessionCollector<C, S> {
    pub fn new(origin: ActorId, surface: SurfaceId, ids: ActionIdGenerator, ttl: Duration) -> Self {
        Self {
            origin,
            surface,
            ids,
            ttl,
            max_events: None,
            filter: origin_only(),
            handlers: HashMap::new(),
            on_end: None,
            handle: SessionHandle::new(),
        }
    }

    /// Stop with an `Action` reason after this many handled events
    pub fn max_events(mut self, max: usize) -> Self {
        self.max_events = Some(max.max(1));
        self
    }

    pub fn filter(mut self, filter: ActorFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Bind `handler` to the action id of `control`
    pub fn on(mut self, control: C, handler: Arc<dyn ActionHandler<C, S>>) -> Self {
        self.handlers
            .insert(self.ids.create_control(control), (control, handler));
        self
    }

    /// Bind `handler` to every control of `C`
    pub fn on_all(mut self, handler: Arc<dyn ActionHandler<C, S>>) -> Self {
        for control in C::ALL {
            self = self.on(*control, Arc::clone(&handler));
        }
        self
    }

    pub fn on_end(mut self, handler: Arc<dyn EndHandler<S>>) -> Self {
        self.on_end = Some(handler);
        self
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn ids(&self) -> ActionIdGenerator {
        self.ids
    }

    /// Run the session on its own task
    pub fn spawn(
        self,
        source: Arc<dyn EventSource>,
        state: S,
    ) -> JoinHandle<SessionResult<SessionReport<S>>> {
        tokio::spawn(self.run(source, state))
    }

    /// Run the session to completion.
    ///
    /// Returns the stop reason and the final state. A handler failure is
    /// returned as `SessionError::Handler` after the session has been torn
    /// down and the end callback has run.
    pub async fn run(self, source: Arc<dyn EventSource>, mut state: S) -> SessionResult<SessionReport<S>> {
        let Self {
            origin,
            surface,
            ids,
            ttl,
            max_events,
            filter,
            handlers,
            on_end,
            handle,
        } = self;

        let mut stop_rx = handle.stop.subscribe();
        let mut subscription = source.subscribe(&surface).await?;
        handle.set_phase(SessionPhase::Active);
        tracing::debug!(
            "Session {} started on surface {} for {} (ttl {:?})",
            ids.origin_ms(),
            surface,
            origin,
            ttl
        );

        let deadline = sleep(ttl);
        tokio::pin!(deadline);

        let mut processed = 0usize;
        let mut failure: Option<(ActionId, StakehouseError)> = None;

        let reason = loop {
            tokio::select! {
                // An expired timer wins over an event that arrived too late
                biased;

                () = external_stop(&mut stop_rx) => break StopReason::ExternalStop,
                () = &mut deadline => break StopReason::Timeout,
                event = subscription.recv() => {
                    let Some(event) = event else {
                        tracing::warn!("Event source closed surface {} under a live session", surface);
                        break StopReason::ExternalStop;
                    };

                    let (action, control, handler) = match dispatch(&event, &origin, &filter, &handlers) {
                        Ok(bound) => bound,
                        Err(miss) => {
                            tracing::trace!("Ignoring event on {}: {}", surface, miss);
                            continue;
                        }
                    };

                    tracing::debug!("Dispatching {} from {}", action, event.actor);
                    let mut ctx = ActionContext {
                        event: &event,
                        action: &action,
                        control,
                        state: &mut state,
                        signals: Signals::default(),
                    };
                    let result = handler.handle(&mut ctx).await;
                    let signals = ctx.signals;
                    processed += 1;

                    if let Err(error) = result {
                        tracing::error!("Handler for {} failed: {}", action, error);
                        failure = Some((action, error));
                        break StopReason::Error;
                    }
                    if let Some(reason) = signals.stop {
                        break StopReason::Action(reason);
                    }
                    if max_events.is_some_and(|max| processed >= max) {
                        break StopReason::Action(action.label().to_string());
                    }
                    if let Some(reset_at) = signals.reset_at {
                        deadline.as_mut().reset(reset_at + ttl);
                    }
                }
            }
        };

        // Teardown precedes the end callback: nothing is delivered past this point
        subscription.close();
        source.unsubscribe(subscription.id()).await;
        handle.set_phase(SessionPhase::Stopped(reason.clone()));
        tracing::debug!(
            "Session {} stopped: {} after {} events",
            ids.origin_ms(),
            reason,
            processed
        );

        let ended = match &on_end {
            Some(on_end) => {
                on_end
                    .on_end(EndContext {
                        reason: &reason,
                        processed,
                        state: &mut state,
                    })
                    .await
            }
            None => Ok(()),
        };

        if let Some((action, source)) = failure {
            if let Err(end_error) = ended {
                tracing::error!("End callback also failed: {}", end_error);
            }
            return Err(SessionError::Handler {
                action,
                source: Box::new(source),
            });
        }
        ended.map_err(|error| SessionError::End(Box::new(error)))?;

        Ok(SessionReport {
            reason,
            processed,
            state,
        })
    }
}

/// Resolves once an external stop has been requested
async fn external_stop(stop_rx: &mut watch::Receiver<bool>) {
    let closed = stop_rx.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

fn dispatch<C: Control, S: Send + 'static>(
    event: &ActorEvent,
    origin: &ActorId,
    filter: &ActorFilter,
    handlers: &HashMap<ActionId, BoundHandler<C, S>>,
) -> Result<(ActionId, C, Arc<dyn ActionHandler<C, S>>), DispatchMiss> {
    if !filter(event, origin) {
        return Err(DispatchMiss::FilterRejected {
            actor: event.actor.to_string(),
        });
    }

    let unmatched = || DispatchMiss::NoHandlerMatched {
        action_id: event.action_id.clone(),
    };
    let action = ActionId::parse(&event.action_id).ok_or_else(unmatched)?;
    let (control, handler) = handlers.get(&action).ok_or_else(unmatched)?;

    Ok((action, *control, Arc::clone(handler)))
}
