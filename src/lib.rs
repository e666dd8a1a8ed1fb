pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;

pub use error::{KerflineError, Result};
pub use geometry::{Chain, Geometry, Shape};
pub use operations::chain_offset::{offset_chain, ChainOffsetParameters, ChainOffsetResult};
pub use operations::kerf::{CalculatedOffset, KerfCompensation};
pub use operations::offset::OffsetDirection;
