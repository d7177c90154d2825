// ── Domain model ──
//
// Canonical representations of the entities a server pushes during
// and after the initial sync, plus the derived views the session hands
// to consumers.

pub mod channel;
pub mod program;
pub mod recording;
pub mod series;
pub mod status;

// ── Re-exports ──────────────────────────────────────────────────────

pub use channel::{Channel, ChannelKind, ChannelService, TunerInput};
pub use program::Program;
pub use recording::{Recording, RecordingState, RecordingView};
pub use series::{SeriesRule, SeriesRuleView, Weekdays};
pub use status::{ServerStatus, StreamInfo};
