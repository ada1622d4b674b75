//! Menu sessions around the games: the picker, the energy menus and the
//! booster shop

pub mod boosters;
pub mod energy_menu;
pub mod energy_prompt;
pub mod picker;

pub use boosters::{BoosterControl, BoosterPurchase, BoosterShop, BoosterShopOutcome};
pub use energy_menu::{EnergyMenu, EnergyMenuControl, EnergyMenuOutcome};
pub use energy_prompt::{EnergyPrompt, EnergyPromptControl, EnergyPromptOutcome};
pub use picker::{GamePicker, PickerControl, PickerOutcome};

use crate::action_id::{ActionIdGenerator, Control};
use crate::economy::PlayerRecord;
use crate::energy::EnergyRegulator;
use crate::render::{ControlFrame, EnergyFrame};

/// Energy snapshot of `record` with the controls of `C`
fn energy_frame<C: Control>(
    record: &PlayerRecord,
    regulator: &EnergyRegulator,
    ids: &ActionIdGenerator,
    enabled: impl Fn(C) -> bool,
) -> EnergyFrame {
    EnergyFrame {
        charge: record.energy.charge,
        max_charge: regulator.max_charge(),
        stars: record.energy.stars,
        expires_at_ms: record.energy.expires_at_ms,
        controls: C::ALL
            .iter()
            .map(|control| ControlFrame::of(ids, *control, enabled(*control)))
            .collect(),
    }
}
