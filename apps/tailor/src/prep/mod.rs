//! Interview prep cache: keyed prep bundles, lazily generated sub-analyses,
//! and device-local user annotations with debounced backend sync.

pub mod cache;
pub mod events;
pub mod record;
pub mod sync;

pub use cache::{PrepCache, PrepStatus};
pub use events::PrepEvent;
pub use record::{PrepRecord, Slot, SubAnalysisData};
