use crate::error::TypeLookupError;
use async_trait::async_trait;
use segmerge_proto::{SegmentId, Severity};
use std::collections::HashMap;

/// Fire-and-forget calls into the host viewer. No return values are consumed;
/// the viewer renders whatever it is last told.
pub trait ViewerActions: Send + Sync {
    /// Show exactly this id set
    fn set_segments(&self, ids: &[SegmentId]);
    /// Replace the rendered merge groupings, one `[main, others...]` list per group
    fn set_segment_equivalences(&self, groups: &[Vec<SegmentId>]);
    /// Replace the per-segment color overrides
    fn set_segment_colors(&self, colors: &HashMap<SegmentId, String>);
}

/// Optional collaborator resolving semantic types from the connectivity
/// service. The engine operates fully without one; only the conflict-warning
/// and merged-type features degrade.
#[async_trait]
pub trait TypeLookup: Send + Sync {
    async fn get_types(&self, ids: &[SegmentId]) -> Result<Vec<(SegmentId, Option<String>)>, TypeLookupError>;
}

/// Sink for every recoverable failure and advisory warning. Nothing
/// recoverable crosses the engine's public API as an error.
pub type AlertFn = dyn Fn(Severity, &str) + Send + Sync + 'static;
