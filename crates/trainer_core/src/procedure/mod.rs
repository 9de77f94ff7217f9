mod collaborators;
mod dissection;
mod feedback;
mod markers;
mod preservation;
mod session;
mod tools;

pub use collaborators::{
    Hit, Picking, Point3, Presentation, PresentationEvent, QueuedPicking, RecordingPresentation,
    RecordingScene, SceneCommand, SceneSink,
};
pub use dissection::{DissectionMachine, DissectionPhase, DissectionSnapshot, Outcome};
pub use feedback::{Cue, FeedbackEmitter, FeedbackEvent, Toast, ToastKind, TOAST_TTL_SECONDS};
pub use markers::{MarkOutcome, MarkerTracker};
pub use preservation::{
    PinOutcome, PreservationMachine, PreservationPhase, PreservationSnapshot, SpecimenError,
    COMPLETE_INSTRUCTION, DEFAULT_HELPER_PREFIX, DEFAULT_PIN_PICKUP, IDLE_INSTRUCTION,
    NOTEBOOK_CLEARED,
};
pub use session::{ClickOutcome, Flow, Popup, Session, SessionSnapshot};
pub use tools::{ToolChange, ToolKind, ToolSelector};
