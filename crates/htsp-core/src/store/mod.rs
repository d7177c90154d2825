// ── Entity caches ──
//
// One cache per entity kind the server pushes, all maintained from the
// receive loop and read by the session's snapshot operations.

mod autorec;
mod cache;
mod channels;
mod data_store;
mod dvr;

pub use autorec::AutorecStore;
pub use cache::{CacheStats, EntityCache};
pub use channels::{ChannelStore, TunerStore};
pub use data_store::{DataStore, StoreStats};
pub use dvr::DvrStore;
