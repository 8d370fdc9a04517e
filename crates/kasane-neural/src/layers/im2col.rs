//! im2col/col2im patch transform layer.
//!
//! Forward rearranges each `channels x height x width` item into
//! `channels*kernel_h*kernel_w` rows of sliding-window patch values so a
//! convolution reduces to one matrix multiplication. Backward folds the
//! column-form gradient back into spatial form, summing the contributions
//! of overlapping patches. The two directions are exact adjoints:
//! `<im2col(x), g> == <x, col2im(g)>` for all matching `x` and `g`.

use crate::layers::Layer;
use kasane_core::{Backend, CpuBackend, Result, Shape, Tensor, TensorError};
use num_traits::Float;
use std::marker::PhantomData;

/// Kernel/pad/stride parameters.
///
/// Each of the three controls comes in a unified form (`kernel_size`) or a
/// split height/width form (`kernel_h` + `kernel_w`). The kernel must use
/// exactly one form; pad and stride may also be left entirely unset, which
/// defaults to pad 0 and stride 1. Mixing forms is a configuration error.
#[derive(Debug, Clone, Default)]
pub struct ConvParams {
    pub kernel_size: Option<usize>,
    pub kernel_h: Option<usize>,
    pub kernel_w: Option<usize>,
    pub pad: Option<usize>,
    pub pad_h: Option<usize>,
    pub pad_w: Option<usize>,
    pub stride: Option<usize>,
    pub stride_h: Option<usize>,
    pub stride_w: Option<usize>,
}

impl ConvParams {
    /// Resolves the unified/split fields into concrete
    /// `(kernel, pad, stride)` height/width pairs.
    fn resolve(&self) -> Result<((usize, usize), (usize, usize), (usize, usize))> {
        let op = "im2col_configure";
        let kernel = match (self.kernel_size, self.kernel_h, self.kernel_w) {
            (Some(k), None, None) => (k, k),
            (None, Some(h), Some(w)) => (h, w),
            (Some(_), _, _) => {
                return Err(TensorError::invalid_configuration(
                    op,
                    "kernel is kernel_size OR kernel_h and kernel_w; not both",
                ))
            }
            (None, _, _) => {
                return Err(TensorError::invalid_configuration(
                    op,
                    "non-square kernels require both kernel_h and kernel_w",
                ))
            }
        };
        if kernel.0 == 0 || kernel.1 == 0 {
            return Err(TensorError::invalid_configuration(
                op,
                "kernel dimensions cannot be zero",
            ));
        }
        let pad = resolve_axis_pair(op, "pad", self.pad, self.pad_h, self.pad_w, 0)?;
        let stride = resolve_axis_pair(op, "stride", self.stride, self.stride_h, self.stride_w, 1)?;
        Ok((kernel, pad, stride))
    }
}

/// Unified-or-split resolution shared by pad and stride: the unified field
/// alone, both split fields alone, or nothing (default) are accepted.
fn resolve_axis_pair(
    op: &str,
    label: &str,
    unified: Option<usize>,
    h: Option<usize>,
    w: Option<usize>,
    default: usize,
) -> Result<(usize, usize)> {
    match (unified, h, w) {
        (None, None, None) => Ok((default, default)),
        (Some(v), None, None) => Ok((v, v)),
        (None, Some(h), Some(w)) => Ok((h, w)),
        _ => Err(TensorError::invalid_configuration(
            op,
            format!("{label} is {label} OR {label}_h and {label}_w; not both"),
        )),
    }
}

/// Derived shape state cached by `configure`.
#[derive(Debug, Clone, Copy)]
struct UnfoldDims {
    kernel_h: usize,
    kernel_w: usize,
    pad_h: usize,
    pad_w: usize,
    stride_h: usize,
    stride_w: usize,
    channels: usize,
    height: usize,
    width: usize,
}

impl UnfoldDims {
    fn out_height(&self) -> usize {
        (self.height + 2 * self.pad_h - self.kernel_h) / self.stride_h + 1
    }

    fn out_width(&self) -> usize {
        (self.width + 2 * self.pad_w - self.kernel_w) / self.stride_w + 1
    }

    fn channels_col(&self) -> usize {
        self.channels * self.kernel_h * self.kernel_w
    }
}

/// Spatial unfold transform (im2col forward, col2im backward).
pub struct Im2colLayer<T: Float, B: Backend<T> = CpuBackend> {
    backend: B,
    params: ConvParams,
    dims: Option<UnfoldDims>,
    _marker: PhantomData<T>,
}

impl<T, B> Im2colLayer<T, B>
where
    T: Float,
    B: Backend<T>,
{
    pub fn new(params: ConvParams) -> Self
    where
        B: Default,
    {
        Self::with_backend(params, B::default())
    }

    pub fn with_backend(params: ConvParams, backend: B) -> Self {
        Self {
            backend,
            params,
            dims: None,
            _marker: PhantomData,
        }
    }

    fn dims(&self, op: &str) -> Result<UnfoldDims> {
        self.dims
            .ok_or_else(|| TensorError::invalid_configuration(op, "layer is not configured"))
    }

    fn check_counts(
        &self,
        op: &str,
        dims: &UnfoldDims,
        input: &Tensor<T>,
        output: &Tensor<T>,
    ) -> Result<()> {
        let item = dims.channels * dims.height * dims.width;
        let col_item = dims.channels_col() * dims.out_height() * dims.out_width();
        if input.count() != input.num() * item {
            return Err(TensorError::shape_mismatch(
                op,
                format!("{} elements per input item", item),
                format!("{} elements", input.count() / input.num().max(1)),
            ));
        }
        if output.count() != input.num() * col_item {
            return Err(TensorError::shape_mismatch(
                op,
                format!("{} column elements", input.num() * col_item),
                format!("{} elements", output.count()),
            ));
        }
        Ok(())
    }
}

impl<T, B> Layer<T> for Im2colLayer<T, B>
where
    T: Float,
    B: Backend<T>,
{
    fn name(&self) -> &str {
        "im2col"
    }

    fn configure(&mut self, input_shape: &Shape) -> Result<Shape> {
        let (kernel, pad, stride) = self.params.resolve()?;
        if input_shape.rank() != 4 {
            return Err(TensorError::invalid_shape(
                "im2col_configure",
                format!("input must be 4D (NCHW), got rank {}", input_shape.rank()),
            ));
        }
        let dims = UnfoldDims {
            kernel_h: kernel.0,
            kernel_w: kernel.1,
            pad_h: pad.0,
            pad_w: pad.1,
            stride_h: stride.0,
            stride_w: stride.1,
            channels: input_shape[1],
            height: input_shape[2],
            width: input_shape[3],
        };
        // The shape formula subtracts the kernel from the padded extent;
        // a kernel that overhangs it has no valid output position.
        if dims.kernel_h > dims.height + 2 * dims.pad_h
            || dims.kernel_w > dims.width + 2 * dims.pad_w
        {
            return Err(TensorError::invalid_configuration(
                "im2col_configure",
                format!(
                    "kernel {}x{} exceeds padded input {}x{}",
                    dims.kernel_h,
                    dims.kernel_w,
                    dims.height + 2 * dims.pad_h,
                    dims.width + 2 * dims.pad_w
                ),
            ));
        }
        let output_shape = Shape::from_slice(&[
            input_shape[0],
            dims.channels_col(),
            dims.out_height(),
            dims.out_width(),
        ]);
        self.dims = Some(dims);
        Ok(output_shape)
    }

    fn forward(&self, input: &Tensor<T>, output: &mut Tensor<T>) -> Result<T> {
        let dims = self.dims("im2col_forward")?;
        self.check_counts("im2col_forward", &dims, input, output)?;
        let item = dims.channels * dims.height * dims.width;
        let col_item = dims.channels_col() * dims.out_height() * dims.out_width();
        let src = input.data();
        let dst = output.data_mut();
        for n in 0..input.num() {
            self.backend.im2col(
                &src[input.offset(n)..input.offset(n) + item],
                dims.channels,
                dims.height,
                dims.width,
                dims.kernel_h,
                dims.kernel_w,
                dims.pad_h,
                dims.pad_w,
                dims.stride_h,
                dims.stride_w,
                &mut dst[n * col_item..(n + 1) * col_item],
            );
        }
        Ok(T::zero())
    }

    fn backward(
        &self,
        output: &Tensor<T>,
        _propagate_down: bool,
        input: &mut Tensor<T>,
    ) -> Result<()> {
        let dims = self.dims("im2col_backward")?;
        self.check_counts("im2col_backward", &dims, input, output)?;
        let item = dims.channels * dims.height * dims.width;
        let col_item = dims.channels_col() * dims.out_height() * dims.out_width();
        let src = output.diff();
        let num = input.num();
        let dst = input.diff_mut();
        for n in 0..num {
            self.backend.col2im(
                &src[n * col_item..(n + 1) * col_item],
                dims.channels,
                dims.height,
                dims.width,
                dims.kernel_h,
                dims.kernel_w,
                dims.pad_h,
                dims.pad_w,
                dims.stride_h,
                dims.stride_w,
                &mut dst[n * item..(n + 1) * item],
            );
        }
        Ok(())
    }
}
