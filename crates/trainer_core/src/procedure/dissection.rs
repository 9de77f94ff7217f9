use serde::Serialize;
use tracing::{debug, info, warn};

use crate::registry::{Side, TargetId, TargetRegistry, TargetRole};

use super::collaborators::{Point3, SceneCommand};
use super::feedback::Cue;
use super::markers::{MarkOutcome, MarkerTracker};
use super::tools::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DissectionPhase {
    Pinning,
    Slicing,
    BellyOpening,
    OrganRemoval,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Ignored,
    Blocked,
    Selected {
        target: TargetId,
    },
    Deselected {
        target: TargetId,
    },
    Dropped {
        organ: TargetId,
        tray: TargetId,
    },
    AllOrgansComplete {
        organ: TargetId,
        tray: TargetId,
    },
    Pinned {
        target: TargetId,
        next_expected: Option<TargetId>,
    },
    Advanced {
        target: TargetId,
        next_expected: Option<TargetId>,
    },
    BellyOpened {
        side: Side,
    },
    WrongTool {
        expected: ToolKind,
        target: TargetId,
    },
    AlreadyDone {
        target: TargetId,
    },
}

impl Outcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DissectionSnapshot {
    pub phase: DissectionPhase,
    pub cursor: usize,
    pub pinned: Vec<TargetId>,
    pub left_opened: bool,
    pub right_opened: bool,
    pub selected: Option<TargetId>,
    pub dropped: Vec<TargetId>,
    pub organ_total: usize,
    pub expected_next: Option<TargetId>,
}

/// Ordered frog dissection: pin the limbs, cut the belly in sequence, open
/// both flaps, then move every organ into the tray.
#[derive(Debug, Clone)]
pub struct DissectionMachine {
    registry: TargetRegistry,
    limbs: Vec<TargetId>,
    slices: Vec<TargetId>,
    organ_total: usize,
    phase: DissectionPhase,
    pins: MarkerTracker,
    slice_cursor: usize,
    left_opened: bool,
    right_opened: bool,
    selected: Option<TargetId>,
    dropped: Vec<TargetId>,
    pending: Vec<SceneCommand>,
}

impl DissectionMachine {
    pub fn new(registry: TargetRegistry) -> Self {
        let limbs = registry.limbs();
        let slices = registry.slices();
        let organ_total = registry.organs().len();
        let pins = MarkerTracker::new(limbs.len(), "").with_allowed(limbs.iter().cloned());
        Self {
            registry,
            limbs,
            slices,
            organ_total,
            phase: DissectionPhase::Pinning,
            pins,
            slice_cursor: 0,
            left_opened: false,
            right_opened: false,
            selected: None,
            dropped: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Discards every cursor, set and flag. Equivalent to a fresh machine.
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.registry));
        info!("dissection_reset");
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn phase(&self) -> DissectionPhase {
        self.phase
    }

    /// Cursor into the ordered sequence of the active phase.
    pub fn cursor(&self) -> usize {
        match self.phase {
            DissectionPhase::Pinning => self.pins.count(),
            _ => self.slice_cursor,
        }
    }

    pub fn pinned(&self) -> &[TargetId] {
        self.pins.marked()
    }

    pub fn selected(&self) -> Option<&TargetId> {
        self.selected.as_ref()
    }

    pub fn dropped(&self) -> &[TargetId] {
        &self.dropped
    }

    pub fn both_bellies_opened(&self) -> bool {
        self.left_opened && self.right_opened
    }

    /// Position in the instruction script that matches the current progress.
    pub fn instruction_index(&self) -> usize {
        let ordered_steps = self.limbs.len() + self.slices.len();
        match self.phase {
            DissectionPhase::Pinning | DissectionPhase::Slicing | DissectionPhase::BellyOpening => {
                (self.pins.count() + self.slice_cursor).min(ordered_steps)
            }
            DissectionPhase::OrganRemoval => ordered_steps + 1,
            DissectionPhase::Complete => ordered_steps + 2,
        }
    }

    /// The target the trainee should act on next, if the phase has one.
    pub fn expected_next(&self) -> Option<TargetId> {
        match self.phase {
            DissectionPhase::Pinning => self
                .limbs
                .iter()
                .find(|limb| !self.pins.contains(limb.as_str()))
                .cloned(),
            DissectionPhase::Slicing => self.slices.get(self.slice_cursor).cloned(),
            DissectionPhase::BellyOpening => {
                let side = if self.left_opened {
                    Side::Right
                } else {
                    Side::Left
                };
                self.registry
                    .belly_flap(side)
                    .map(|target| target.id.clone())
            }
            DissectionPhase::OrganRemoval | DissectionPhase::Complete => None,
        }
    }

    /// True when hovering `target` should highlight it as the next step.
    pub fn hover(&self, target: &str) -> bool {
        self.expected_next()
            .is_some_and(|expected| expected.as_str() == target)
    }

    pub fn submit_action(&mut self, target: &str, tool: ToolKind) -> Outcome {
        self.submit_action_at(target, None, tool)
    }

    /// Validates one resolved hit against the registry and the current phase.
    /// State is fully updated before the outcome is returned.
    pub fn submit_action_at(
        &mut self,
        target_id: &str,
        point: Option<Point3>,
        tool: ToolKind,
    ) -> Outcome {
        if self.phase == DissectionPhase::Complete {
            return Outcome::Ignored;
        }
        let Some(target) = self.registry.lookup(target_id) else {
            debug!(target_id, "decorative_target_ignored");
            return Outcome::Ignored;
        };
        let role = target.role;
        let required_tool = target.required_tool;
        let id = target.id.clone();

        if role == TargetRole::Organ && self.phase == DissectionPhase::OrganRemoval {
            return self.toggle_selection(id);
        }

        if role == TargetRole::TrayDrop {
            if let Some(organ) = self.selected.clone() {
                if !self.dropped.contains(&organ) {
                    return self.drop_selected(organ, id, point);
                }
            }
        }

        if role == TargetRole::Limb && tool == ToolKind::Pins {
            return self.pin_limb(id, point);
        }

        // Limbs and belly flaps may be done in any order within their phase.
        let is_expected = match (self.phase, role) {
            (DissectionPhase::Pinning, TargetRole::Limb) => !self.pins.contains(id.as_str()),
            (DissectionPhase::BellyOpening, TargetRole::BellyFlap(side)) => !self.is_opened(side),
            _ => self.expected_next().as_ref() == Some(&id),
        };

        if self.phase == DissectionPhase::Slicing
            && is_expected
            && required_tool == Some(tool)
        {
            return self.cut_slice(id);
        }

        if self.phase == DissectionPhase::BellyOpening && required_tool == Some(tool) {
            if let TargetRole::BellyFlap(side) = role {
                return self.open_belly(side);
            }
        }

        if is_expected {
            if let Some(expected_tool) = required_tool.filter(|required| *required != tool) {
                warn!(target_id, expected = %expected_tool, held = %tool, "wrong_tool");
                return Outcome::WrongTool {
                    expected: expected_tool,
                    target: id,
                };
            }
        }

        debug!(target_id, phase = ?self.phase, "target_irrelevant_for_phase");
        Outcome::Ignored
    }

    /// Scene commands produced by the last transitions, oldest first.
    pub fn drain_commands(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.pending)
    }

    /// Feedback the given outcome should produce.
    pub fn cue_for(&self, outcome: &Outcome) -> Cue {
        match outcome {
            Outcome::Ignored
            | Outcome::Blocked
            | Outcome::Pinned { .. }
            | Outcome::BellyOpened { .. } => Cue::silent(),
            Outcome::Selected { target } => Cue::notice(format!("Selected organ: {target}")),
            Outcome::Deselected { target } => Cue::notice(format!("Deselected {target}")),
            Outcome::Dropped { organ, .. } | Outcome::AllOrgansComplete { organ, .. } => {
                Cue::notice(format!("Dropped {organ} into tray"))
            }
            Outcome::Advanced {
                next_expected: Some(next),
                ..
            } => {
                let tool = self
                    .registry
                    .lookup(next.as_str())
                    .and_then(|target| target.required_tool)
                    .unwrap_or_default();
                Cue::notice(format!("next expected: {next} with tool {tool}"))
            }
            Outcome::Advanced {
                next_expected: None,
                ..
            } => Cue::silent(),
            Outcome::WrongTool { expected, target } => {
                Cue::warning(format!("Hey, wrong tool. Need {expected} for {target}"))
            }
            Outcome::AlreadyDone { target } => {
                Cue::warning(format!("{target} already has a pin. Skipping."))
            }
        }
    }

    pub fn snapshot(&self) -> DissectionSnapshot {
        DissectionSnapshot {
            phase: self.phase,
            cursor: self.cursor(),
            pinned: self.pins.marked().to_vec(),
            left_opened: self.left_opened,
            right_opened: self.right_opened,
            selected: self.selected.clone(),
            dropped: self.dropped.clone(),
            organ_total: self.organ_total,
            expected_next: self.expected_next(),
        }
    }

    fn toggle_selection(&mut self, organ: TargetId) -> Outcome {
        if self.dropped.contains(&organ) {
            debug!(organ = %organ, "dropped_organ_not_selectable");
            return Outcome::Ignored;
        }
        if self.selected.as_ref() == Some(&organ) {
            self.selected = None;
            info!(organ = %organ, "organ_deselected");
            return Outcome::Deselected { target: organ };
        }
        self.selected = Some(organ.clone());
        info!(organ = %organ, "organ_selected");
        Outcome::Selected { target: organ }
    }

    fn drop_selected(&mut self, organ: TargetId, tray: TargetId, point: Option<Point3>) -> Outcome {
        self.selected = None;
        self.dropped.push(organ.clone());
        self.pending.push(SceneCommand::PlaceMarker {
            position: point,
            target: organ.clone(),
        });
        info!(
            organ = %organ,
            dropped = self.dropped.len(),
            total = self.organ_total,
            "organ_dropped"
        );
        if self.dropped.len() >= self.organ_total {
            self.phase = DissectionPhase::Complete;
            info!("dissection_complete");
            return Outcome::AllOrgansComplete { organ, tray };
        }
        Outcome::Dropped { organ, tray }
    }

    fn pin_limb(&mut self, limb: TargetId, point: Option<Point3>) -> Outcome {
        match self.pins.submit(limb.as_str()) {
            MarkOutcome::AlreadyMarked => {
                warn!(limb = %limb, "limb_already_pinned");
                Outcome::AlreadyDone { target: limb }
            }
            MarkOutcome::Marked { .. } => {
                self.pending.push(SceneCommand::PlaceMarker {
                    position: point,
                    target: limb.clone(),
                });
                Outcome::Pinned {
                    target: limb,
                    next_expected: self.expected_next(),
                }
            }
            MarkOutcome::Completed { .. } => {
                self.pending.push(SceneCommand::PlaceMarker {
                    position: point,
                    target: limb.clone(),
                });
                self.phase = DissectionPhase::Slicing;
                info!("all_limbs_pinned");
                Outcome::Pinned {
                    target: limb,
                    next_expected: self.expected_next(),
                }
            }
            MarkOutcome::InvalidTarget | MarkOutcome::SessionComplete => Outcome::Ignored,
        }
    }

    fn cut_slice(&mut self, slice: TargetId) -> Outcome {
        self.slice_cursor += 1;
        self.pending.push(SceneCommand::SetVisible {
            target: slice.clone(),
            visible: false,
        });
        info!(slice = %slice, cursor = self.slice_cursor, "slice_cut");
        if self.slice_cursor >= self.slices.len() {
            self.phase = DissectionPhase::BellyOpening;
            info!("all_slices_cut");
        }
        Outcome::Advanced {
            target: slice,
            next_expected: self.expected_next(),
        }
    }

    fn is_opened(&self, side: Side) -> bool {
        match side {
            Side::Left => self.left_opened,
            Side::Right => self.right_opened,
        }
    }

    fn open_belly(&mut self, side: Side) -> Outcome {
        if self.is_opened(side) {
            let target = self
                .registry
                .belly_flap(side)
                .map(|flap| flap.id.clone())
                .unwrap_or_else(|| TargetId::new(side.as_token()));
            return Outcome::AlreadyDone { target };
        }
        match side {
            Side::Left => self.left_opened = true,
            Side::Right => self.right_opened = true,
        }
        if let Some(animation) = self
            .registry
            .belly_flap(side)
            .and_then(|flap| flap.animation.clone())
        {
            self.pending.push(SceneCommand::PlayAnimation { name: animation });
        }
        info!(side = side.as_token(), "belly_opened");
        if self.both_bellies_opened() {
            self.phase = DissectionPhase::OrganRemoval;
            info!("organ_removal_started");
        }
        Outcome::BellyOpened { side }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProcedureDef;

    const LIMBS: [&str; 4] = ["leftHand", "rightHand", "leftFoot", "rightFoot"];
    const SLICES: [&str; 5] = [
        "centerBelly",
        "leftTopSliceBelly",
        "rightTopSliceBelly",
        "leftBottomSliceBelly",
        "rightBottomSliceBelly",
    ];
    const ORGANS: [&str; 11] = [
        "heart",
        "fatBodies",
        "gallBladder",
        "kidneys",
        "largeIntestine",
        "liver",
        "lungs",
        "rectum",
        "smallIntestine",
        "stomach",
        "urinaryBladder",
    ];
    const TRAY: &str = "Plane026";

    fn machine() -> DissectionMachine {
        DissectionMachine::new(ProcedureDef::builtin().registry)
    }

    fn pin_all(machine: &mut DissectionMachine) {
        for limb in LIMBS {
            machine.submit_action(limb, ToolKind::Pins);
        }
    }

    fn cut_all(machine: &mut DissectionMachine) {
        for slice in SLICES {
            machine.submit_action(slice, ToolKind::Scissors);
        }
    }

    fn open_both(machine: &mut DissectionMachine) {
        machine.submit_action("leftBelly", ToolKind::Forceps);
        machine.submit_action("rightBelly", ToolKind::Forceps);
    }

    fn at_organ_removal() -> DissectionMachine {
        let mut machine = machine();
        pin_all(&mut machine);
        cut_all(&mut machine);
        open_both(&mut machine);
        assert_eq!(machine.phase(), DissectionPhase::OrganRemoval);
        machine.drain_commands();
        machine
    }

    #[test]
    fn end_to_end_dissection_reaches_completion() {
        let mut machine = machine();

        assert_eq!(
            machine.submit_action("leftHand", ToolKind::Pins),
            Outcome::Pinned {
                target: TargetId::from("leftHand"),
                next_expected: Some(TargetId::from("rightHand")),
            }
        );
        assert_eq!(machine.cursor(), 1);
        for limb in &LIMBS[1..] {
            assert!(matches!(
                machine.submit_action(limb, ToolKind::Pins),
                Outcome::Pinned { .. }
            ));
        }
        assert_eq!(machine.phase(), DissectionPhase::Slicing);
        assert_eq!(machine.pinned().len(), 4);

        assert_eq!(
            machine.submit_action("centerBelly", ToolKind::Scissors),
            Outcome::Advanced {
                target: TargetId::from("centerBelly"),
                next_expected: Some(TargetId::from("leftTopSliceBelly")),
            }
        );
        for slice in &SLICES[1..] {
            assert!(matches!(
                machine.submit_action(slice, ToolKind::Scissors),
                Outcome::Advanced { .. }
            ));
        }
        assert_eq!(machine.phase(), DissectionPhase::BellyOpening);

        assert_eq!(
            machine.submit_action("leftBelly", ToolKind::Forceps),
            Outcome::BellyOpened { side: Side::Left }
        );
        assert_eq!(machine.phase(), DissectionPhase::BellyOpening);
        assert_eq!(
            machine.submit_action("rightBelly", ToolKind::Forceps),
            Outcome::BellyOpened { side: Side::Right }
        );
        assert_eq!(machine.phase(), DissectionPhase::OrganRemoval);

        let mut last = Outcome::Ignored;
        for organ in ORGANS {
            assert!(matches!(
                machine.submit_action(organ, ToolKind::None),
                Outcome::Selected { .. }
            ));
            last = machine.submit_action(TRAY, ToolKind::None);
        }
        assert_eq!(
            last,
            Outcome::AllOrgansComplete {
                organ: TargetId::from("urinaryBladder"),
                tray: TargetId::from(TRAY),
            }
        );
        assert_eq!(machine.phase(), DissectionPhase::Complete);
        assert_eq!(machine.submit_action("heart", ToolKind::None), Outcome::Ignored);
        assert_eq!(machine.submit_action(TRAY, ToolKind::None), Outcome::Ignored);
    }

    #[test]
    fn wrong_tool_does_not_advance_cursor() {
        let mut machine = machine();
        pin_all(&mut machine);
        assert_eq!(
            machine.submit_action("centerBelly", ToolKind::Forceps),
            Outcome::WrongTool {
                expected: ToolKind::Scissors,
                target: TargetId::from("centerBelly"),
            }
        );
        assert_eq!(machine.cursor(), 0);
        assert!(matches!(
            machine.submit_action("centerBelly", ToolKind::Scissors),
            Outcome::Advanced { .. }
        ));
        assert_eq!(machine.cursor(), 1);
    }

    #[test]
    fn out_of_order_slice_is_ignored() {
        let mut machine = machine();
        pin_all(&mut machine);
        assert_eq!(
            machine.submit_action("rightBottomSliceBelly", ToolKind::Scissors),
            Outcome::Ignored
        );
        assert_eq!(machine.cursor(), 0);
    }

    #[test]
    fn repinning_a_limb_is_already_done() {
        let mut machine = machine();
        machine.submit_action("rightFoot", ToolKind::Pins);
        let before = machine.snapshot();
        assert_eq!(
            machine.submit_action("rightFoot", ToolKind::Pins),
            Outcome::AlreadyDone {
                target: TargetId::from("rightFoot")
            }
        );
        assert_eq!(machine.snapshot(), before);
    }

    #[test]
    fn repinning_after_pinning_phase_is_still_already_done() {
        let mut machine = machine();
        pin_all(&mut machine);
        assert_eq!(
            machine.submit_action("leftHand", ToolKind::Pins),
            Outcome::AlreadyDone {
                target: TargetId::from("leftHand")
            }
        );
        assert_eq!(machine.phase(), DissectionPhase::Slicing);
    }

    #[test]
    fn limbs_pin_in_any_order_and_expected_tracks_first_unpinned() {
        let mut machine = machine();
        assert_eq!(
            machine.submit_action("rightFoot", ToolKind::Pins),
            Outcome::Pinned {
                target: TargetId::from("rightFoot"),
                next_expected: Some(TargetId::from("leftHand")),
            }
        );
        assert!(machine.hover("leftHand"));
        assert!(!machine.hover("rightFoot"));
    }

    #[test]
    fn limb_with_wrong_tool_is_wrong_tool() {
        let mut machine = machine();
        assert_eq!(
            machine.submit_action("leftFoot", ToolKind::Scalpel),
            Outcome::WrongTool {
                expected: ToolKind::Pins,
                target: TargetId::from("leftFoot"),
            }
        );
        assert_eq!(machine.cursor(), 0);
    }

    #[test]
    fn unknown_and_decorative_targets_are_ignored() {
        let mut machine = machine();
        assert_eq!(machine.submit_action("speaker", ToolKind::Pins), Outcome::Ignored);
        assert_eq!(machine.submit_action("heart", ToolKind::Forceps), Outcome::Ignored);
        assert_eq!(machine.submit_action(TRAY, ToolKind::None), Outcome::Ignored);
        assert_eq!(machine.cursor(), 0);
    }

    #[test]
    fn belly_flaps_need_forceps_and_both_sides() {
        let mut machine = machine();
        pin_all(&mut machine);
        cut_all(&mut machine);
        machine.drain_commands();
        assert!(matches!(
            machine.submit_action("rightBelly", ToolKind::Scissors),
            Outcome::WrongTool { .. }
        ));
        assert_eq!(
            machine.submit_action("rightBelly", ToolKind::Forceps),
            Outcome::BellyOpened { side: Side::Right }
        );
        assert_eq!(
            machine.submit_action("rightBelly", ToolKind::Forceps),
            Outcome::AlreadyDone {
                target: TargetId::from("rightBelly")
            }
        );
        assert_eq!(machine.phase(), DissectionPhase::BellyOpening);
        machine.submit_action("leftBelly", ToolKind::Forceps);
        assert!(machine.both_bellies_opened());
        assert_eq!(machine.phase(), DissectionPhase::OrganRemoval);
        assert_eq!(
            machine.drain_commands(),
            vec![
                SceneCommand::PlayAnimation {
                    name: "rightBellyAnimation".to_string()
                },
                SceneCommand::PlayAnimation {
                    name: "leftBellyAnimation".to_string()
                },
            ]
        );
    }

    #[test]
    fn organ_selection_toggles_and_replaces() {
        let mut machine = at_organ_removal();
        machine.submit_action("heart", ToolKind::None);
        assert_eq!(
            machine.submit_action("heart", ToolKind::None),
            Outcome::Deselected {
                target: TargetId::from("heart")
            }
        );
        assert!(machine.selected().is_none());
        assert!(machine.dropped().is_empty());

        machine.submit_action("heart", ToolKind::None);
        machine.submit_action("liver", ToolKind::Scalpel);
        assert_eq!(machine.selected(), Some(&TargetId::from("liver")));
    }

    #[test]
    fn dropped_organ_cannot_be_reselected() {
        let mut machine = at_organ_removal();
        machine.submit_action("lungs", ToolKind::None);
        assert_eq!(
            machine.submit_action_at(TRAY, Some([1.0, 2.0, 3.0]), ToolKind::None),
            Outcome::Dropped {
                organ: TargetId::from("lungs"),
                tray: TargetId::from(TRAY),
            }
        );
        assert_eq!(
            machine.drain_commands(),
            vec![SceneCommand::PlaceMarker {
                position: Some([1.0, 2.0, 3.0]),
                target: TargetId::from("lungs"),
            }]
        );
        assert_eq!(machine.submit_action("lungs", ToolKind::None), Outcome::Ignored);
        assert_eq!(machine.submit_action(TRAY, ToolKind::None), Outcome::Ignored);
        assert_eq!(machine.dropped().len(), 1);
    }

    #[test]
    fn cursor_is_monotonic_and_bounded() {
        let mut machine = machine();
        let noisy = ["centerBelly", "leftHand", "speaker", "leftHand", "heart"];
        let tools = [ToolKind::Scissors, ToolKind::Pins, ToolKind::Forceps];
        let mut last_progress = 0;
        for round in 0..40 {
            let target = if round % 3 == 0 {
                LIMBS[round % LIMBS.len()]
            } else if round % 3 == 1 {
                SLICES[round % SLICES.len()]
            } else {
                noisy[round % noisy.len()]
            };
            machine.submit_action(target, tools[round % tools.len()]);
            let progress = machine.instruction_index();
            assert!(progress >= last_progress);
            last_progress = progress;
            assert!(machine.pinned().len() <= LIMBS.len());
            assert!(machine.snapshot().cursor <= SLICES.len().max(LIMBS.len()));
        }
    }

    #[test]
    fn reset_matches_fresh_machine() {
        let mut machine = at_organ_removal();
        machine.submit_action("heart", ToolKind::None);
        machine.reset();
        assert_eq!(machine.snapshot(), self::machine().snapshot());
        assert!(machine.drain_commands().is_empty());
        assert!(matches!(
            machine.submit_action("leftHand", ToolKind::Pins),
            Outcome::Pinned { .. }
        ));
    }

    #[test]
    fn instruction_index_follows_progress() {
        let mut machine = machine();
        assert_eq!(machine.instruction_index(), 0);
        pin_all(&mut machine);
        assert_eq!(machine.instruction_index(), 4);
        cut_all(&mut machine);
        assert_eq!(machine.instruction_index(), 9);
        machine.submit_action("leftBelly", ToolKind::Forceps);
        assert_eq!(machine.instruction_index(), 9);
        machine.submit_action("rightBelly", ToolKind::Forceps);
        assert_eq!(machine.instruction_index(), 10);
    }

    #[test]
    fn cues_match_outcomes() {
        let machine = machine();
        let wrong = machine.cue_for(&Outcome::WrongTool {
            expected: ToolKind::Scissors,
            target: TargetId::from("centerBelly"),
        });
        assert!(wrong.is_warning());
        let advanced = machine.cue_for(&Outcome::Advanced {
            target: TargetId::from("centerBelly"),
            next_expected: Some(TargetId::from("leftTopSliceBelly")),
        });
        assert_eq!(
            advanced.toast.map(|toast| toast.text),
            Some("next expected: leftTopSliceBelly with tool scissors".to_string())
        );
        assert_eq!(machine.cue_for(&Outcome::Ignored), Cue::silent());
    }
}
