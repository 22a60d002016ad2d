//! Collaborators outside the database: the vision model, image storage,
//! the allocation callback and distance ranking.

pub mod allocation;
pub mod geo;
pub mod images;
pub mod scan;
pub mod vision;

pub use allocation::{AllocationNotifier, HttpAllocationNotifier, dispatch_allocation};
pub use images::{BucketImageStore, ImageStore};
pub use scan::ScanService;
pub use vision::{OpenAiVision, VisionAnalyzer};
