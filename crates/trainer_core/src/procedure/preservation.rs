use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::registry::{Instruction, TargetId};

use super::collaborators::{Point3, SceneCommand};
use super::feedback::Cue;
use super::markers::{MarkOutcome, MarkerTracker};

pub const DEFAULT_HELPER_PREFIX: &str = "Helper_";
pub const DEFAULT_PIN_PICKUP: &str = "Pin";

pub const IDLE_INSTRUCTION: &str = "Open the insect viewer and choose an insect to preserve.";
pub const COMPLETE_INSTRUCTION: &str = "Congratulations! You've successfully preserved this insect.";
pub const NOTEBOOK_CLEARED: &str = "Notebook cleared. Ready for new pinning notes.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecimenError {
    #[error("unknown specimen `{key}`")]
    UnknownSpecimen { key: String },
    #[error("specimen `{key}` has no helper points")]
    NoHelpers { key: String },
    #[error("specimen `{key}` helper `{helper}` does not start with `{prefix}`")]
    InvalidHelper {
        key: String,
        helper: String,
        prefix: String,
    },
    #[error("specimen `{key}` lists helper `{helper}` more than once")]
    DuplicateHelper { key: String, helper: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PreservationPhase {
    Idle,
    PinSelection,
    PinPlacement,
    PreservationComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PinOutcome {
    Ignored,
    PinModeActivated,
    Pinned {
        target: TargetId,
        count: usize,
        required: usize,
    },
    Complete {
        target: TargetId,
        required: usize,
    },
    AlreadyPinned {
        target: TargetId,
    },
    InvalidTarget {
        target: TargetId,
    },
    SessionComplete,
}

impl PinOutcome {
    /// Outcomes after which the pin tool is put down again.
    pub fn exits_pin_mode(&self) -> bool {
        matches!(
            self,
            Self::Pinned { .. } | Self::Complete { .. } | Self::AlreadyPinned { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadedSpecimen {
    key: String,
    helpers: Vec<TargetId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreservationSnapshot {
    pub phase: PreservationPhase,
    pub specimen: Option<String>,
    pub pinned: Vec<TargetId>,
    pub required: usize,
    pub pin_mode: bool,
}

/// Insect pinning against a per-specimen set of helper points.
#[derive(Debug, Clone)]
pub struct PreservationMachine {
    helper_prefix: String,
    pin_pickup: String,
    specimen: Option<LoadedSpecimen>,
    pins: MarkerTracker,
    pin_mode: bool,
    pending: Vec<SceneCommand>,
}

impl Default for PreservationMachine {
    fn default() -> Self {
        Self::new(DEFAULT_HELPER_PREFIX, DEFAULT_PIN_PICKUP)
    }
}

impl PreservationMachine {
    pub fn new(helper_prefix: impl Into<String>, pin_pickup: impl Into<String>) -> Self {
        let helper_prefix = helper_prefix.into();
        Self {
            pins: MarkerTracker::new(0, helper_prefix.clone()),
            helper_prefix,
            pin_pickup: pin_pickup.into(),
            specimen: None,
            pin_mode: false,
            pending: Vec::new(),
        }
    }

    pub fn phase(&self) -> PreservationPhase {
        if self.specimen.is_none() {
            PreservationPhase::Idle
        } else if self.pins.is_complete() {
            PreservationPhase::PreservationComplete
        } else if self.pin_mode {
            PreservationPhase::PinPlacement
        } else {
            PreservationPhase::PinSelection
        }
    }

    pub fn helper_prefix(&self) -> &str {
        &self.helper_prefix
    }

    pub fn pin_pickup(&self) -> &str {
        &self.pin_pickup
    }

    pub fn specimen_key(&self) -> Option<&str> {
        self.specimen.as_ref().map(|specimen| specimen.key.as_str())
    }

    pub fn helpers(&self) -> &[TargetId] {
        self.specimen
            .as_ref()
            .map(|specimen| specimen.helpers.as_slice())
            .unwrap_or(&[])
    }

    pub fn pinned(&self) -> &[TargetId] {
        self.pins.marked()
    }

    pub fn required_count(&self) -> usize {
        self.pins.required_count()
    }

    pub fn is_pin_mode(&self) -> bool {
        self.pin_mode
    }

    /// Swaps in a new specimen. Every helper must carry the helper prefix and
    /// the set may not be empty; on error the previous state is kept.
    pub fn load_specimen(
        &mut self,
        key: impl Into<String>,
        helpers: &[TargetId],
    ) -> Result<usize, SpecimenError> {
        let key = key.into();
        if helpers.is_empty() {
            return Err(SpecimenError::NoHelpers { key });
        }
        let mut unique: Vec<TargetId> = Vec::with_capacity(helpers.len());
        for helper in helpers {
            if !helper.as_str().starts_with(self.helper_prefix.as_str()) {
                return Err(SpecimenError::InvalidHelper {
                    key,
                    helper: helper.to_string(),
                    prefix: self.helper_prefix.clone(),
                });
            }
            if unique.contains(helper) {
                return Err(SpecimenError::DuplicateHelper {
                    key,
                    helper: helper.to_string(),
                });
            }
            unique.push(helper.clone());
        }

        let required = unique.len();
        self.pins = MarkerTracker::new(required, self.helper_prefix.clone())
            .with_allowed(unique.iter().cloned());
        self.pin_mode = false;
        self.pending.clear();
        info!(specimen = %key, required, "specimen_loaded");
        self.specimen = Some(LoadedSpecimen {
            key,
            helpers: unique,
        });
        Ok(required)
    }

    /// Picks up the pin. Only meaningful while a specimen awaits pins.
    pub fn activate_pin_mode(&mut self) -> PinOutcome {
        match self.phase() {
            PreservationPhase::PinSelection => {
                self.pin_mode = true;
                info!("pin_mode_activated");
                PinOutcome::PinModeActivated
            }
            PreservationPhase::PinPlacement => PinOutcome::Ignored,
            PreservationPhase::Idle | PreservationPhase::PreservationComplete => {
                debug!(phase = ?self.phase(), "pin_mode_unavailable");
                PinOutcome::Ignored
            }
        }
    }

    /// Routes a click in the preservation view. The pin pickup toggles pin
    /// mode on; anything else counts as a pin only while pin mode is active.
    pub fn click(&mut self, target: &str, point: Option<Point3>) -> PinOutcome {
        if target == self.pin_pickup {
            return self.activate_pin_mode();
        }
        if self.phase() != PreservationPhase::PinPlacement {
            return PinOutcome::Ignored;
        }
        self.submit_pin_at(target, point)
    }

    pub fn submit_pin(&mut self, target: &str) -> PinOutcome {
        self.submit_pin_at(target, None)
    }

    pub fn submit_pin_at(&mut self, target: &str, point: Option<Point3>) -> PinOutcome {
        if self.specimen.is_none() {
            debug!(target_id = target, "pin_without_specimen");
            return PinOutcome::InvalidTarget {
                target: TargetId::from(target),
            };
        }
        let outcome = match self.pins.submit(target) {
            MarkOutcome::InvalidTarget => {
                warn!(target_id = target, "pin_invalid_helper");
                PinOutcome::InvalidTarget {
                    target: TargetId::from(target),
                }
            }
            MarkOutcome::AlreadyMarked => {
                warn!(target_id = target, "helper_already_pinned");
                PinOutcome::AlreadyPinned {
                    target: TargetId::from(target),
                }
            }
            MarkOutcome::SessionComplete => PinOutcome::SessionComplete,
            MarkOutcome::Marked { count, required } => {
                self.place_pin(target, point);
                PinOutcome::Pinned {
                    target: TargetId::from(target),
                    count,
                    required,
                }
            }
            MarkOutcome::Completed { required } => {
                self.place_pin(target, point);
                info!(specimen = self.specimen_key().unwrap_or_default(), "preservation_complete");
                PinOutcome::Complete {
                    target: TargetId::from(target),
                    required,
                }
            }
        };
        if outcome.exits_pin_mode() {
            self.pin_mode = false;
        }
        outcome
    }

    /// Clears pins for the loaded specimen without unloading it.
    pub fn reset_pins(&mut self) {
        self.pins.reset();
        self.pin_mode = false;
        self.pending.clear();
        info!(specimen = self.specimen_key().unwrap_or_default(), "pins_reset");
    }

    /// Unloads the specimen and returns to the idle state.
    pub fn reset(&mut self) {
        *self = Self::new(
            std::mem::take(&mut self.helper_prefix),
            std::mem::take(&mut self.pin_pickup),
        );
        info!("preservation_reset");
    }

    pub fn drain_commands(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.pending)
    }

    /// Instruction script for the current specimen: the loaded prompt
    /// followed by the completion message, or the idle prompt alone.
    pub fn instructions(&self) -> Vec<Instruction> {
        match &self.specimen {
            None => vec![text_instruction(IDLE_INSTRUCTION)],
            Some(specimen) => vec![
                text_instruction(format!(
                    "* Rotate the insect using arrows to find helpers.\n\
                     * Select the Pin tool to start.\n\
                     * This insect requires {} pin(s) for preservation.",
                    specimen.helpers.len()
                )),
                text_instruction(COMPLETE_INSTRUCTION),
            ],
        }
    }

    pub fn instruction_index(&self) -> usize {
        match self.phase() {
            PreservationPhase::PreservationComplete => 1,
            _ => 0,
        }
    }

    pub fn cue_for(&self, outcome: &PinOutcome) -> Cue {
        match outcome {
            PinOutcome::Ignored => Cue::silent(),
            PinOutcome::SessionComplete => Cue::warning("This insect is already fully pinned."),
            PinOutcome::PinModeActivated => Cue::notice("Pin Mode Activated"),
            PinOutcome::Pinned {
                target,
                count,
                required,
            } => Cue::notice(format!("Pin placed on {target} ({count}/{required})")),
            PinOutcome::Complete { .. } => {
                Cue::notice("Congratulations! You've finished pinning this insect.")
            }
            PinOutcome::AlreadyPinned { target } => {
                Cue::warning(format!("{target} already pinned!"))
            }
            PinOutcome::InvalidTarget { .. } => Cue::warning("Not a valid helper spot!"),
        }
    }

    pub fn snapshot(&self) -> PreservationSnapshot {
        PreservationSnapshot {
            phase: self.phase(),
            specimen: self.specimen_key().map(str::to_string),
            pinned: self.pins.marked().to_vec(),
            required: self.pins.required_count(),
            pin_mode: self.pin_mode,
        }
    }

    fn place_pin(&mut self, target: &str, point: Option<Point3>) {
        self.pending.push(SceneCommand::PlaceMarker {
            position: point,
            target: TargetId::from(target),
        });
    }
}

fn text_instruction(text: impl Into<String>) -> Instruction {
    Instruction {
        text: text.into(),
        image: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helpers(names: &[&str]) -> Vec<TargetId> {
        names.iter().map(|name| TargetId::from(*name)).collect()
    }

    fn loaded(names: &[&str]) -> PreservationMachine {
        let mut machine = PreservationMachine::default();
        machine
            .load_specimen("wasps", &helpers(names))
            .expect("specimen should load");
        machine
    }

    #[test]
    fn single_helper_specimen_completes_on_first_pin() {
        let mut machine = loaded(&["Helper_Thorax"]);
        assert_eq!(machine.phase(), PreservationPhase::PinSelection);
        assert_eq!(
            machine.submit_pin("Helper_Thorax"),
            PinOutcome::Complete {
                target: TargetId::from("Helper_Thorax"),
                required: 1,
            }
        );
        assert_eq!(machine.phase(), PreservationPhase::PreservationComplete);
        assert_eq!(machine.submit_pin("Helper_Other"), PinOutcome::InvalidTarget {
            target: TargetId::from("Helper_Other"),
        });
        assert_eq!(
            machine.submit_pin("Helper_Thorax"),
            PinOutcome::AlreadyPinned {
                target: TargetId::from("Helper_Thorax")
            }
        );
    }

    #[test]
    fn repinning_earlier_helper_after_completion_changes_nothing() {
        let mut machine = loaded(&["Helper_A", "Helper_B"]);
        machine.submit_pin("Helper_A");
        assert!(matches!(
            machine.submit_pin("Helper_B"),
            PinOutcome::Complete { required: 2, .. }
        ));
        let pinned = machine.pinned().to_vec();
        let outcome = machine.submit_pin("Helper_A");
        assert_eq!(
            outcome,
            PinOutcome::AlreadyPinned {
                target: TargetId::from("Helper_A")
            }
        );
        assert!(machine.cue_for(&outcome).is_warning());
        assert_eq!(machine.pinned(), pinned.as_slice());
        assert_eq!(machine.phase(), PreservationPhase::PreservationComplete);
    }

    #[test]
    fn session_complete_cue_is_a_warning() {
        let machine = PreservationMachine::default();
        assert!(machine.cue_for(&PinOutcome::SessionComplete).is_warning());
    }

    #[test]
    fn three_helpers_count_up_and_latch() {
        let mut machine = loaded(&["Helper_A", "Helper_B", "Helper_C"]);
        assert_eq!(
            machine.submit_pin("Helper_A"),
            PinOutcome::Pinned {
                target: TargetId::from("Helper_A"),
                count: 1,
                required: 3,
            }
        );
        machine.submit_pin("Helper_B");
        assert!(matches!(
            machine.submit_pin("Helper_C"),
            PinOutcome::Complete { required: 3, .. }
        ));
        assert_eq!(machine.pinned().len(), 3);
    }

    #[test]
    fn prefix_mismatch_is_invalid_target() {
        let mut machine = loaded(&["Helper_A", "Helper_B"]);
        assert!(matches!(
            machine.submit_pin("Wing"),
            PinOutcome::InvalidTarget { .. }
        ));
        assert!(machine.pinned().is_empty());
    }

    #[test]
    fn pin_without_specimen_is_invalid() {
        let mut machine = PreservationMachine::default();
        assert_eq!(machine.phase(), PreservationPhase::Idle);
        assert!(matches!(
            machine.submit_pin("Helper_A"),
            PinOutcome::InvalidTarget { .. }
        ));
        assert_eq!(machine.activate_pin_mode(), PinOutcome::Ignored);
    }

    #[test]
    fn load_rejects_empty_or_unprefixed_helpers() {
        let mut machine = PreservationMachine::default();
        assert_eq!(
            machine.load_specimen("stink", &[]),
            Err(SpecimenError::NoHelpers {
                key: "stink".to_string()
            })
        );
        assert!(matches!(
            machine.load_specimen("stink", &helpers(&["Helper_A", "Thorax"])),
            Err(SpecimenError::InvalidHelper { .. })
        ));
        assert!(matches!(
            machine.load_specimen("stink", &helpers(&["Helper_A", "Helper_A"])),
            Err(SpecimenError::DuplicateHelper { .. })
        ));
        assert_eq!(machine.phase(), PreservationPhase::Idle);
    }

    #[test]
    fn clicks_only_pin_while_pin_mode_is_active() {
        let mut machine = loaded(&["Helper_A", "Helper_B"]);
        assert_eq!(machine.click("Helper_A", None), PinOutcome::Ignored);
        assert_eq!(machine.click("Pin", None), PinOutcome::PinModeActivated);
        assert_eq!(machine.phase(), PreservationPhase::PinPlacement);
        assert!(matches!(
            machine.click("Helper_A", Some([0.0, 1.0, 0.0])),
            PinOutcome::Pinned { count: 1, .. }
        ));
        assert_eq!(machine.phase(), PreservationPhase::PinSelection);
        assert_eq!(
            machine.drain_commands(),
            vec![SceneCommand::PlaceMarker {
                position: Some([0.0, 1.0, 0.0]),
                target: TargetId::from("Helper_A"),
            }]
        );
    }

    #[test]
    fn invalid_helper_keeps_pin_mode() {
        let mut machine = loaded(&["Helper_A"]);
        machine.activate_pin_mode();
        assert!(matches!(
            machine.click("Abdomen", None),
            PinOutcome::InvalidTarget { .. }
        ));
        assert!(machine.is_pin_mode());
    }

    #[test]
    fn reset_pins_keeps_specimen_and_is_idempotent() {
        let mut machine = loaded(&["Helper_A"]);
        machine.submit_pin("Helper_A");
        machine.reset_pins();
        let once = machine.snapshot();
        machine.reset_pins();
        assert_eq!(machine.snapshot(), once);
        assert_eq!(once.phase, PreservationPhase::PinSelection);
        assert_eq!(once.specimen.as_deref(), Some("wasps"));
        assert!(matches!(
            machine.submit_pin("Helper_A"),
            PinOutcome::Complete { .. }
        ));
    }

    #[test]
    fn full_reset_unloads_specimen() {
        let mut machine = loaded(&["Helper_A"]);
        machine.reset();
        assert_eq!(machine.phase(), PreservationPhase::Idle);
        assert_eq!(machine.helper_prefix(), DEFAULT_HELPER_PREFIX);
        assert_eq!(machine.instructions()[0].text, IDLE_INSTRUCTION);
    }

    #[test]
    fn reloading_discards_previous_pins() {
        let mut machine = loaded(&["Helper_A"]);
        machine.submit_pin("Helper_A");
        machine
            .load_specimen("ladybug", &helpers(&["Helper_X", "Helper_Y"]))
            .expect("second specimen should load");
        assert!(machine.pinned().is_empty());
        assert_eq!(machine.required_count(), 2);
        assert!(machine.instructions()[0].text.contains("requires 2 pin(s)"));
    }
}
