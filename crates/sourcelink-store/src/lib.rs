pub mod error;
pub mod local_tracker;
pub mod store;

pub use error::StoreError;
pub use local_tracker::LocalTracker;
pub use store::SourceStore;
