//! Sparse matrices, grid masks and regions

pub mod sparse;
pub mod mask;
pub mod region;

pub use sparse::SparseGrid;
pub use mask::{mask_ij, mask_matrix, mask_ranges};
pub use region::Region;
