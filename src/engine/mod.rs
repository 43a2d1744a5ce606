//! Stateful editing engine.
//!
//! - **detector**: filter pipeline from pixels to a solid edge mask
//! - **merge**: gap filling and erasing under a disk
//! - **circle**: circle tool pointer handling and the hold ticker
//! - **paint**: brush strokes and painted-area bookkeeping
//! - **history**: linear undo
//! - **session**: the object owning all of the above for one capture

pub mod detector;
pub mod merge;
pub mod circle;
pub mod paint;
pub mod history;
pub mod session;

pub use circle::{CircleRegionProcessor, HoldTicker};
pub use detector::{Detection, RegionEdgeDetector};
pub use merge::{GapFillMerger, MergeMode, MergeOutcome};
pub use session::{DisplaySink, EditingSession, SharedSession};
