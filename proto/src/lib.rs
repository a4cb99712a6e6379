pub mod alert;
pub mod segment_id;
pub mod snapshot;

pub use alert::*;
pub use segment_id::*;
pub use snapshot::*;
