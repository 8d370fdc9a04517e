//! Layer kernels built on `kasane-core`.
//!
//! Two layer variants share the [`Layer`] abstraction:
//!
//! - [`Im2colLayer`]: the im2col/col2im patch transform that lets a
//!   convolution be expressed as a matrix multiplication
//! - [`PowerLayer`]: the elementwise transform `y = (shift + scale*x)^power`
//!   with an exact, algebraically special-cased backward pass
//!
//! Call order per instance: `configure` once per shape, then `forward`
//! per batch, then `backward` with the upstream gradient in the output
//! tensor's `diff` storage.

pub mod layers;

pub use layers::im2col::{ConvParams, Im2colLayer};
pub use layers::power::{PowerLayer, PowerParams};
pub use layers::Layer;
