use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{organ_entries, Carousel, InsectInfo, OrganEntry, SpecimenCatalog};
use crate::registry::{Instruction, ProcedureDef, TargetId, TargetRole};

use super::collaborators::{Hit, Picking, Presentation, SceneSink};
use super::dissection::{DissectionMachine, DissectionSnapshot, Outcome};
use super::feedback::{Cue, FeedbackEmitter, FeedbackEvent};
use super::preservation::{
    PinOutcome, PreservationMachine, PreservationSnapshot, SpecimenError, NOTEBOOK_CLEARED,
};
use super::tools::{ToolChange, ToolKind, ToolSelector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Dissection,
    Preservation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Popup {
    Organs,
    Insects,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// A viewer popup swallowed the click.
    Blocked,
    /// The pointer resolved to nothing.
    Missed,
    ToolPicked {
        tool: ToolKind,
    },
    Dissection(Outcome),
    Preservation(PinOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub flow: Flow,
    pub tool: ToolKind,
    pub popup: Option<Popup>,
    pub instruction_index: usize,
    pub dissection: DissectionSnapshot,
    pub preservation: PreservationSnapshot,
}

/// One trainee at the bench: the active tool, both procedure flows with
/// their feedback channels, the viewer popups, and the collaborators that
/// render the results.
///
/// Every entry point finishes mutating state before any scene command or
/// presentation event is handed out.
pub struct Session<S: SceneSink, P: Presentation> {
    definition: ProcedureDef,
    catalog: SpecimenCatalog,
    tools: ToolSelector,
    flow: Flow,
    dissection: DissectionMachine,
    preservation: PreservationMachine,
    dissection_feedback: FeedbackEmitter,
    preservation_feedback: FeedbackEmitter,
    organ_viewer: Carousel<OrganEntry>,
    insect_viewer: Carousel<InsectInfo>,
    popup: Option<Popup>,
    scene: S,
    presentation: P,
}

impl<S: SceneSink, P: Presentation> Session<S, P> {
    pub fn new(
        definition: ProcedureDef,
        catalog: SpecimenCatalog,
        scene: S,
        presentation: P,
    ) -> Self {
        let dissection = DissectionMachine::new(definition.registry.clone());
        let preservation =
            PreservationMachine::new(catalog.helper_prefix.clone(), catalog.pin_pickup.clone());
        let dissection_feedback = FeedbackEmitter::new(definition.instructions.clone());
        let preservation_feedback = FeedbackEmitter::new(preservation.instructions());
        let organ_viewer = Carousel::new(organ_entries(&definition.registry));
        let insect_viewer = Carousel::new(catalog.insects.clone());
        let mut session = Self {
            definition,
            catalog,
            tools: ToolSelector::new(),
            flow: Flow::Dissection,
            dissection,
            preservation,
            dissection_feedback,
            preservation_feedback,
            organ_viewer,
            insect_viewer,
            popup: None,
            scene,
            presentation,
        };
        let mut events = session.dissection_feedback.restart(None);
        session.preservation_feedback.restart(None);
        session.deliver(&mut events);
        info!(
            procedure = %session.definition.name,
            targets = session.definition.registry.len(),
            insects = session.catalog.insects.len(),
            "session_started"
        );
        session
    }

    pub fn definition(&self) -> &ProcedureDef {
        &self.definition
    }

    pub fn catalog(&self) -> &SpecimenCatalog {
        &self.catalog
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn tool(&self) -> ToolKind {
        self.tools.active_tool()
    }

    pub fn popup(&self) -> Option<Popup> {
        self.popup
    }

    pub fn dissection(&self) -> &DissectionMachine {
        &self.dissection
    }

    pub fn preservation(&self) -> &PreservationMachine {
        &self.preservation
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.active_feedback().current_instruction()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            flow: self.flow,
            tool: self.tools.active_tool(),
            popup: self.popup,
            instruction_index: self.active_feedback().current_index(),
            dissection: self.dissection.snapshot(),
            preservation: self.preservation.snapshot(),
        }
    }

    /// Brings the other flow to the front and re-announces its instruction.
    pub fn set_flow(&mut self, flow: Flow) {
        if self.flow == flow {
            return;
        }
        let mut events = self.cancel_toasts();
        self.flow = flow;
        events.extend(self.active_feedback().replay());
        info!(flow = ?flow, "flow_switched");
        self.deliver(&mut events);
    }

    pub fn select_tool(&mut self, tool: ToolKind) -> ToolChange {
        let change = self.set_tool(tool);
        if tool == ToolKind::Pins && self.flow == Flow::Preservation {
            let outcome = self.preservation.activate_pin_mode();
            self.settle_preservation(&outcome);
        }
        change
    }

    /// Validates a dissection action with the tool currently in hand.
    pub fn submit_action(&mut self, target: &str) -> Outcome {
        if self.popup.is_some() {
            debug!(target_id = target, "action_blocked_by_popup");
            return Outcome::Blocked;
        }
        let outcome = self
            .dissection
            .submit_action(target, self.tools.active_tool());
        self.settle_dissection(&outcome);
        outcome
    }

    /// Pins a helper directly, regardless of pin mode.
    pub fn submit_pin(&mut self, target: &str) -> PinOutcome {
        let outcome = self.preservation.submit_pin(target);
        self.settle_preservation(&outcome);
        outcome
    }

    pub fn pointer_click(&mut self, picking: &mut impl Picking) -> ClickOutcome {
        let hit = picking.resolved_hit();
        self.click(hit)
    }

    /// Routes one resolved pointer hit to the active flow.
    pub fn click(&mut self, hit: Option<Hit>) -> ClickOutcome {
        if self.popup.is_some() {
            debug!("click_blocked_by_popup");
            return ClickOutcome::Blocked;
        }
        let Some(Hit { target, point }) = hit else {
            return ClickOutcome::Missed;
        };

        match self.flow {
            Flow::Dissection => {
                let pickup = self
                    .definition
                    .registry
                    .lookup(target.as_str())
                    .and_then(|entry| match entry.role {
                        TargetRole::ToolPickup(tool) => Some(tool),
                        _ => None,
                    });
                if let Some(tool) = pickup {
                    self.select_tool(tool);
                    return ClickOutcome::ToolPicked { tool };
                }
                let outcome =
                    self.dissection
                        .submit_action_at(target.as_str(), point, self.tools.active_tool());
                self.settle_dissection(&outcome);
                ClickOutcome::Dissection(outcome)
            }
            Flow::Preservation => {
                let outcome = self.preservation.click(target.as_str(), point);
                self.settle_preservation(&outcome);
                ClickOutcome::Preservation(outcome)
            }
        }
    }

    /// Whether hovering `target` should highlight it as the next step.
    pub fn hover(&self, target: &str) -> bool {
        match self.flow {
            Flow::Dissection => self.dissection.hover(target),
            Flow::Preservation => {
                self.preservation.is_pin_mode()
                    && self
                        .preservation
                        .helpers()
                        .iter()
                        .any(|helper| helper.as_str() == target)
                    && !self
                        .preservation
                        .pinned()
                        .iter()
                        .any(|pinned| pinned.as_str() == target)
            }
        }
    }

    pub fn expected_next(&self) -> Option<TargetId> {
        self.dissection.expected_next()
    }

    /// Loads a catalog insect as the preservation specimen and brings the
    /// preservation flow forward.
    pub fn load_specimen(&mut self, key: &str) -> Result<usize, SpecimenError> {
        let helpers = self
            .catalog
            .find(key)
            .map(|insect| insect.helpers.clone())
            .ok_or_else(|| SpecimenError::UnknownSpecimen {
                key: key.to_string(),
            })?;
        self.load_specimen_helpers(key, &helpers)
    }

    pub fn load_specimen_helpers(
        &mut self,
        key: &str,
        helpers: &[TargetId],
    ) -> Result<usize, SpecimenError> {
        let required = self.preservation.load_specimen(key, helpers)?;
        let mut events = self.cancel_toasts();
        self.flow = Flow::Preservation;
        events.extend(
            self.preservation_feedback
                .restart(Some(self.preservation.instructions())),
        );
        self.put_tool_down();
        self.deliver(&mut events);
        Ok(required)
    }

    /// Drops every pin on the loaded specimen and restarts its instructions.
    pub fn reset_pins(&mut self) {
        self.preservation.reset_pins();
        let mut events = self.preservation_feedback.restart(None);
        events.extend(self.preservation_feedback.apply(
            self.preservation.instruction_index(),
            Cue::notice(NOTEBOOK_CLEARED),
        ));
        self.put_tool_down();
        self.publish(Flow::Preservation, events);
    }

    /// Returns to the state of a freshly constructed session.
    pub fn reset(&mut self) {
        self.dissection.reset();
        self.preservation.reset();
        self.popup = None;
        self.organ_viewer.rewind();
        self.insect_viewer.rewind();
        self.flow = Flow::Dissection;
        let mut events = self.dissection_feedback.restart(None);
        events.extend(
            self.preservation_feedback
                .restart(Some(self.preservation.instructions()))
                .into_iter()
                .filter(|event| matches!(event, FeedbackEvent::ToastCleared)),
        );
        self.put_tool_down();
        info!("session_reset");
        self.deliver(&mut events);
    }

    /// Drives toast expiry. At most one emitter holds a live toast, so a
    /// `ToastCleared` always refers to the toast on screen.
    pub fn advance(&mut self, dt_seconds: f32) {
        let mut events = Vec::new();
        events.extend(self.dissection_feedback.advance(dt_seconds));
        events.extend(self.preservation_feedback.advance(dt_seconds));
        self.deliver(&mut events);
    }

    /// Opens a viewer popup and returns the text of the entry on display.
    pub fn open_popup(&mut self, popup: Popup) -> Option<String> {
        self.popup = Some(popup);
        debug!(popup = ?popup, "popup_opened");
        self.viewer_text()
    }

    pub fn close_popup(&mut self) {
        if let Some(popup) = self.popup.take() {
            debug!(popup = ?popup, "popup_closed");
        }
    }

    pub fn viewer_next(&mut self) -> Option<String> {
        match self.popup? {
            Popup::Organs => self.organ_viewer.next().map(OrganEntry::describe),
            Popup::Insects => self.insect_viewer.next().map(InsectInfo::describe),
        }
    }

    pub fn viewer_prev(&mut self) -> Option<String> {
        match self.popup? {
            Popup::Organs => self.organ_viewer.prev().map(OrganEntry::describe),
            Popup::Insects => self.insect_viewer.prev().map(InsectInfo::describe),
        }
    }

    pub fn viewer_text(&self) -> Option<String> {
        match self.popup? {
            Popup::Organs => self.organ_viewer.current().map(OrganEntry::describe),
            Popup::Insects => self.insect_viewer.current().map(InsectInfo::describe),
        }
    }

    /// Preserves the insect on display in the insect viewer. Returns `None`
    /// when that viewer is not open.
    pub fn preserve_current(&mut self) -> Option<Result<usize, SpecimenError>> {
        if self.popup != Some(Popup::Insects) {
            return None;
        }
        let key = self.insect_viewer.current()?.key.clone();
        let result = self.load_specimen(&key);
        if result.is_ok() {
            self.close_popup();
        }
        Some(result)
    }

    fn set_tool(&mut self, tool: ToolKind) -> ToolChange {
        let change = self.tools.select_tool(tool);
        self.presentation.on_tool_selected(change.current);
        self.presentation.on_cursor_style_changed(change.current);
        change
    }

    fn put_tool_down(&mut self) {
        if self.tools.active_tool() != ToolKind::None {
            self.set_tool(ToolKind::None);
        }
    }

    fn settle_dissection(&mut self, outcome: &Outcome) {
        if matches!(outcome, Outcome::Blocked) {
            return;
        }
        let cue = self.dissection.cue_for(outcome);
        let events = self
            .dissection_feedback
            .apply(self.dissection.instruction_index(), cue);
        for command in self.dissection.drain_commands() {
            self.scene.apply(&command);
        }
        self.publish(Flow::Dissection, events);
    }

    fn settle_preservation(&mut self, outcome: &PinOutcome) {
        let cue = self.preservation.cue_for(outcome);
        let events = self
            .preservation_feedback
            .apply(self.preservation.instruction_index(), cue);
        for command in self.preservation.drain_commands() {
            self.scene.apply(&command);
        }
        match outcome {
            PinOutcome::PinModeActivated if !self.tools.is_active(ToolKind::Pins) => {
                self.set_tool(ToolKind::Pins);
            }
            other if other.exits_pin_mode() => self.put_tool_down(),
            _ => {}
        }
        self.publish(Flow::Preservation, events);
    }

    /// Toasts reach the presentation from either flow and take over the
    /// single toast slot; instruction changes only from the flow on screen.
    fn publish(&mut self, source: Flow, mut events: Vec<FeedbackEvent>) {
        let shows_toast = events.iter().any(|event| {
            matches!(
                event,
                FeedbackEvent::Warning { .. } | FeedbackEvent::Notice { .. }
            )
        });
        if shows_toast {
            let other = match source {
                Flow::Dissection => &mut self.preservation_feedback,
                Flow::Preservation => &mut self.dissection_feedback,
            };
            // Replaced on screen by the new toast, so no clear event.
            let _ = other.cancel_toast();
        }
        if source != self.flow {
            events.retain(|event| !matches!(event, FeedbackEvent::InstructionChanged { .. }));
        }
        self.deliver(&mut events);
    }

    fn cancel_toasts(&mut self) -> Vec<FeedbackEvent> {
        let mut events = Vec::new();
        events.extend(self.dissection_feedback.cancel_toast());
        events.extend(self.preservation_feedback.cancel_toast());
        events
    }

    fn active_feedback(&self) -> &FeedbackEmitter {
        match self.flow {
            Flow::Dissection => &self.dissection_feedback,
            Flow::Preservation => &self.preservation_feedback,
        }
    }

    fn deliver(&mut self, events: &mut Vec<FeedbackEvent>) {
        for event in events.drain(..) {
            self.presentation.deliver(&event);
        }
    }
}
