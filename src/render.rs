//! Renderer boundary
//!
//! The core never builds chat payloads. It hands the renderer a `Frame`, a
//! neutral snapshot of what a session currently shows, and the renderer turns
//! it into whatever the surface speaks.

use crate::action_id::{ActionIdGenerator, Control};
use crate::economy::{BoosterOffer, GameStats};
use crate::errors::RenderError;
use crate::session::SurfaceId;
use crate::stake::StakeOutcome;
use crate::streak::StreakState;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};

/// A control as the renderer should wire it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    pub action_id: String,
    pub label: String,
    pub enabled: bool,
}

impl ControlFrame {
    pub fn of<C: Control>(ids: &ActionIdGenerator, control: C, enabled: bool) -> Self {
        Self {
            action_id: ids.create_control(control).to_string(),
            label: control.label().to_string(),
            enabled,
        }
    }

    /// Every control of `C`, in render order
    pub fn all<C: Control>(ids: &ActionIdGenerator, enabled: bool) -> Vec<Self> {
        C::ALL
            .iter()
            .map(|control| Self::of(ids, *control, enabled))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Waiting for the player
    Playing,
    Settled,
    /// No action arrived in time
    TimedOut,
    /// Stopped from outside before the player acted
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundFrame {
    pub game: String,
    pub phase: RoundPhase,
    pub bet: u64,
    pub wallet: u64,
    /// Game-specific public state (hint, dice, reels)
    pub view: serde_json::Value,
    pub settlement: Option<StakeOutcome>,
    /// Present only while the streak is active
    pub streak: Option<StreakState>,
    pub controls: Vec<ControlFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerFrame {
    pub games: Vec<String>,
    pub selected: Option<String>,
    /// The player's history with the selected game
    pub stats: Option<GameStats>,
    pub controls: Vec<ControlFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyFrame {
    pub charge: u32,
    pub max_charge: u32,
    pub stars: u64,
    pub expires_at_ms: u64,
    pub controls: Vec<ControlFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoosterListing {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoosterFrame {
    pub boosters: Vec<BoosterListing>,
    pub selected: Option<String>,
    /// Offers of the selected booster
    pub offers: Vec<BoosterOffer>,
    pub selected_offer: Option<String>,
    /// What the player holds of the selected offer's payment unit
    pub balance: Option<u64>,
    pub controls: Vec<ControlFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum Frame {
    Round(RoundFrame),
    Picker(PickerFrame),
    EnergyPrompt(EnergyFrame),
    EnergyMenu(EnergyFrame),
    Boosters(BoosterFrame),
    /// Energy is expired and there is no charge left to recharge it
    NoEnergy { expires_at_ms: u64 },
    /// A menu closed without a result
    Closed { notice: String },
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, surface: &SurfaceId, frame: Frame) -> Result<(), RenderError>;
}

/// Keeps every frame per surface; surfaces can be closed to simulate a
/// deleted message
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    frames: DashMap<SurfaceId, Vec<Frame>>,
    gone: DashSet<SurfaceId>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self, surface: &SurfaceId) -> Vec<Frame> {
        self.frames
            .get(surface)
            .map(|frames| frames.clone())
            .unwrap_or_default()
    }

    pub fn last(&self, surface: &SurfaceId) -> Option<Frame> {
        self.frames
            .get(surface)
            .and_then(|frames| frames.last().cloned())
    }

    /// Make every later render on `surface` fail
    pub fn close_surface(&self, surface: &SurfaceId) {
        self.gone.insert(surface.clone());
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render(&self, surface: &SurfaceId, frame: Frame) -> Result<(), RenderError> {
        if self.gone.contains(surface) {
            return Err(RenderError::SurfaceGone(surface.to_string()));
        }

        tracing::trace!("Rendering {:?} on {}", frame, surface);
        self.frames.entry(surface.clone()).or_default().push(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Knob {
        Up,
        Down,
    }

    impl Control for Knob {
        const ALL: &'static [Self] = &[Knob::Up, Knob::Down];

        fn label(self) -> &'static str {
            match self {
                Knob::Up => "up",
                Knob::Down => "down",
            }
        }
    }

    #[test]
    fn test_control_frames_carry_session_ids() {
        let ids = ActionIdGenerator::with_nonce(10, 3);
        let controls = ControlFrame::all::<Knob>(&ids, true);

        assert_eq!(controls.len(), 2);
        assert_eq!(controls[0].label, "up");
        assert_eq!(ids.resolve::<Knob>(&controls[1].action_id), Some(Knob::Down));
    }

    #[tokio::test]
    async fn test_recording_and_closed_surface() {
        let renderer = RecordingRenderer::new();
        let surface = SurfaceId::new("msg-1");

        renderer
            .render(&surface, Frame::NoEnergy { expires_at_ms: 5 })
            .await
            .unwrap();
        assert_eq!(renderer.frames(&surface).len(), 1);
        assert_eq!(renderer.last(&surface), Some(Frame::NoEnergy { expires_at_ms: 5 }));

        renderer.close_surface(&surface);
        let result = renderer
            .render(&surface, Frame::Closed { notice: "bye".to_string() })
            .await;
        assert!(matches!(result, Err(RenderError::SurfaceGone(_))));
    }

    #[test]
    fn test_frame_serializes_with_tag() {
        let json = serde_json::to_value(Frame::NoEnergy { expires_at_ms: 9 }).unwrap();
        assert_eq!(json["frame"], "no_energy");
        assert_eq!(json["expires_at_ms"], 9);
    }
}
