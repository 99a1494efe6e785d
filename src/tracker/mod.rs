pub mod events;
pub mod scheduler;
pub mod zones;

pub use events::TrackerEvent;
pub use scheduler::{run_tracker, PriceQuote, TrackerCommand, TrackerSettings};
pub use zones::{StructureChange, TrackerUpdate, ZoneLifecycleTracker, ZoneView};
