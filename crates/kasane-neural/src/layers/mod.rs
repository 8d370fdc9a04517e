pub mod im2col;
pub mod power;

use kasane_core::{Result, Shape, Tensor};

/// Common interface for computational layers.
///
/// A layer is configured once for an input shape, then invoked any number
/// of times on tensors of that shape. `configure` takes `&mut self` and
/// must not overlap with compute calls on the same instance; `forward`
/// and `backward` borrow the layer immutably and are reentrant across
/// instances.
pub trait Layer<T> {
    /// Layer identifier for diagnostics.
    fn name(&self) -> &str;

    /// Validates parameters, caches derived shape state, and returns the
    /// output shape the caller must allocate.
    fn configure(&mut self, input_shape: &Shape) -> Result<Shape>;

    /// Computes the layer output from `input.data` into `output.data`.
    ///
    /// Returns the layer's contribution to the scalar objective (zero for
    /// pure transforms).
    fn forward(&self, input: &Tensor<T>, output: &mut Tensor<T>) -> Result<T>;

    /// Propagates the upstream gradient in `output.diff` into
    /// `input.diff`. When `propagate_down` is false the input gradient is
    /// not requested and implementations may skip all work.
    fn backward(
        &self,
        output: &Tensor<T>,
        propagate_down: bool,
        input: &mut Tensor<T>,
    ) -> Result<()>;
}
