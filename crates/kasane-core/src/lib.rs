//! Core tensor container and math backend for the Kasane layer kernels.
//!
//! This crate provides the pieces the layer crate builds on:
//!
//! - **tensor**: NCHW tensor with parallel value and gradient storage
//! - **shape**: dimension bookkeeping
//! - **error**: error taxonomy shared by every operation
//! - **backend**: pluggable elementwise/im2col primitive set with a CPU
//!   reference implementation
//!
//! Layers never allocate tensors; they read and write through slice views
//! handed out by [`Tensor`], offset per batch item.

pub mod backend;
pub mod error;
pub mod shape;
pub mod tensor;

pub use backend::{Backend, CpuBackend};
pub use error::{Result, TensorError};
pub use shape::Shape;
pub use tensor::Tensor;
