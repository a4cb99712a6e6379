use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for one reconstructed object in the image volume.
///
/// Values come from the host segmentation and can exceed 2^53, so they are
/// carried as full u64s end to end. The engine never interprets the value;
/// equality and map-keying are the only operations it relies on.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SegmentId(u64);

impl SegmentId {
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl From<u64> for SegmentId {
    fn from(val: u64) -> Self { SegmentId(val) }
}

impl From<SegmentId> for u64 {
    fn from(id: SegmentId) -> Self { id.0 }
}

impl std::str::FromStr for SegmentId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(SegmentId(s.parse()?)) }
}

impl TryFrom<String> for SegmentId {
    type Error = std::num::ParseIntError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl fmt::Debug for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl AsRef<SegmentId> for SegmentId {
    fn as_ref(&self) -> &SegmentId { self }
}
