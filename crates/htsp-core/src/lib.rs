// htsp-core: Session coordination and entity caches between htsp-api and consumers.

pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;
pub mod supervisor;
pub mod sync;

mod router;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult, SeriesTimerRequest, TimerRequest, UpdateTimerRequest};
pub use config::SessionConfig;
pub use convert::HtspEntity;
pub use error::CoreError;
pub use session::{HtspSession, SessionStats};
pub use store::{CacheStats, DataStore, StoreStats};
pub use stream::EntityStream;
pub use supervisor::{Supervised, Supervisor, supervise};
pub use sync::{SyncBarrier, SyncState};

pub use model::{
    Channel, ChannelKind, ChannelService, Program, Recording, RecordingState, RecordingView,
    SeriesRule, SeriesRuleView, ServerStatus, StreamInfo, TunerInput, Weekdays,
};

// Wire-level types consumers commonly need alongside the session.
pub use htsp_api::{DiskSpace, ServerInfo};
