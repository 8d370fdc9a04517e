//! Pluggable math backend.
//!
//! Layers delegate every element-touching operation to a [`Backend`]
//! implementation injected at construction time. The trait is dispatched
//! once per buffer, never per element, so swapping backends (CPU,
//! accelerator) costs nothing in the hot loops.
//!
//! The elementwise primitives use in-place forms (`dst` doubles as an
//! operand) rather than the three-buffer forms a C library would expose;
//! Rust's aliasing rules make the in-place contracts explicit.

mod cpu;

pub use cpu::CpuBackend;

use num_traits::Float;

/// Elementwise and patch-rearrangement primitives consumed by the layers.
pub trait Backend<T: Float> {
    /// `dst[i] = value`
    fn fill(&self, value: T, dst: &mut [T]);

    /// `dst[i] = src[i]`
    fn copy(&self, src: &[T], dst: &mut [T]);

    /// `dst[i] *= alpha`
    fn scale(&self, alpha: T, dst: &mut [T]);

    /// `dst[i] += value`
    fn add_scalar(&self, value: T, dst: &mut [T]);

    /// `dst[i] *= src[i]`
    fn mul_assign(&self, src: &[T], dst: &mut [T]);

    /// `dst[i] = numer[i] / dst[i]`
    ///
    /// Division by zero is not guarded; NaN/Inf propagate per IEEE 754.
    fn div_into(&self, numer: &[T], dst: &mut [T]);

    /// `dst[i] = dst[i]^exponent`
    fn powx(&self, exponent: T, dst: &mut [T]);

    /// `dst[i] = alpha * x[i] + beta * dst[i]`
    fn axpby(&self, alpha: T, x: &[T], beta: T, dst: &mut [T]);

    /// Unfolds one `channels x height x width` spatial block into column
    /// form: `dst` receives `channels * kernel_h * kernel_w` rows of
    /// `out_h * out_w` patch values, zero-padded outside the input bounds.
    #[allow(clippy::too_many_arguments)]
    fn im2col(
        &self,
        src: &[T],
        channels: usize,
        height: usize,
        width: usize,
        kernel_h: usize,
        kernel_w: usize,
        pad_h: usize,
        pad_w: usize,
        stride_h: usize,
        stride_w: usize,
        dst: &mut [T],
    );

    /// Adjoint of [`Backend::im2col`]: folds column-form values back into
    /// spatial form. `dst` is zeroed first, then overlapping patch
    /// contributions accumulate additively into the same cell.
    #[allow(clippy::too_many_arguments)]
    fn col2im(
        &self,
        src: &[T],
        channels: usize,
        height: usize,
        width: usize,
        kernel_h: usize,
        kernel_w: usize,
        pad_h: usize,
        pad_w: usize,
        stride_h: usize,
        stride_w: usize,
        dst: &mut [T],
    );
}
