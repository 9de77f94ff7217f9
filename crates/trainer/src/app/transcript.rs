use std::io::Write;

use serde::Serialize;
use trainer_core::procedure::{Point3, Presentation, PresentationEvent, SceneCommand, SceneSink};
use trainer_core::{Instruction, TargetId, ToolKind};
use tracing::warn;

pub(crate) const SCENE_PREFIX: &str = "scene ";
pub(crate) const UI_PREFIX: &str = "ui ";

/// Writes one prefixed JSON object per line. Write failures are logged and
/// dropped so a closed pipe never stalls the procedure.
fn write_json_line<W: Write, T: Serialize>(writer: &mut W, prefix: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(error) => {
            warn!(error = %error, "transcript_encode_failed");
            return;
        }
    };
    if let Err(error) = writeln!(writer, "{prefix}{json}").and_then(|()| writer.flush()) {
        warn!(error = %error, "transcript_write_failed");
    }
}

/// Scene command sink that records every command as a `scene {...}` line.
pub(crate) struct SceneTranscript<W: Write> {
    writer: W,
}

impl<W: Write> SceneTranscript<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> SceneSink for SceneTranscript<W> {
    fn set_visible(&mut self, target: &TargetId, visible: bool) {
        self.apply(&SceneCommand::SetVisible {
            target: target.clone(),
            visible,
        });
    }

    fn play_animation(&mut self, name: &str) {
        self.apply(&SceneCommand::PlayAnimation {
            name: name.to_string(),
        });
    }

    fn place_marker(&mut self, position: Option<Point3>, target: &TargetId) {
        self.apply(&SceneCommand::PlaceMarker {
            position,
            target: target.clone(),
        });
    }

    fn apply(&mut self, command: &SceneCommand) {
        write_json_line(&mut self.writer, SCENE_PREFIX, command);
    }
}

pub(crate) struct PresentationTranscript<W: Write> {
    writer: W,
}

impl<W: Write> PresentationTranscript<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    fn emit(&mut self, event: PresentationEvent) {
        write_json_line(&mut self.writer, UI_PREFIX, &event);
    }
}

impl<W: Write> Presentation for PresentationTranscript<W> {
    fn on_instruction_changed(&mut self, index: usize, instruction: &Instruction) {
        self.emit(PresentationEvent::InstructionChanged {
            index,
            text: instruction.text.clone(),
            image: instruction.image.clone(),
        });
    }

    fn on_warning(&mut self, text: &str) {
        self.emit(PresentationEvent::Warning {
            text: text.to_string(),
        });
    }

    fn on_notice(&mut self, text: &str) {
        self.emit(PresentationEvent::Notice {
            text: text.to_string(),
        });
    }

    fn on_toast_cleared(&mut self) {
        self.emit(PresentationEvent::ToastCleared);
    }

    fn on_cursor_style_changed(&mut self, tool: ToolKind) {
        self.emit(PresentationEvent::CursorStyleChanged {
            style: tool.cursor_style().to_string(),
        });
    }

    fn on_tool_selected(&mut self, tool: ToolKind) {
        self.emit(PresentationEvent::ToolSelected { tool });
    }
}
