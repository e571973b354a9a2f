pub mod cg;
pub mod sparse;
pub mod vector;

pub use cg::{conjugate_gradient, CgParams, CgSolution};
pub use sparse::{SparseMatrix, SparseRow};
pub use vector::DenseVector;
