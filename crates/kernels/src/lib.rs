//! Cascade Kernels
//!
//! Stock elementwise kernels for the cascade engine: arithmetic, comparison
//! and logic, vector-list operations, closure-backed one-offs, and an
//! internally parallel variant. Each constructor returns an
//! `Arc<dyn Kernel>` ready to register on a procedure.

pub mod closure;
pub mod compare;
pub mod math;
pub mod parallel;
pub mod vector;
