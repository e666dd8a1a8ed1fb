pub mod chain_offset;
pub mod intersect;
pub mod kerf;
pub mod offset;
