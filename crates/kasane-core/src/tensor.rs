//! NCHW tensor with parallel value and gradient storage.
//!
//! A [`Tensor`] owns two buffers of identical shape: `data` holds values
//! flowing forward through the network and `diff` holds the gradients
//! flowing backward. Layers receive read/write slice views into these
//! buffers, never ownership, and address individual batch items through
//! [`Tensor::offset`].

use crate::error::{Result, TensorError};
use crate::shape::Shape;
use ndarray::{ArrayD, IxDyn};
use num_traits::Zero;

/// Multi-dimensional buffer with a value and a gradient storage.
#[derive(Debug, Clone)]
pub struct Tensor<T> {
    data: ArrayD<T>,
    diff: ArrayD<T>,
    shape: Shape,
}

impl<T> Tensor<T>
where
    T: Clone + Zero,
{
    /// Creates a zero-filled tensor (both values and gradients).
    pub fn zeros(dims: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(dims)),
            diff: ArrayD::zeros(IxDyn(dims)),
            shape: Shape::from_slice(dims),
        }
    }

    /// Creates a tensor from a flat value vector; gradients start at zero.
    pub fn from_vec(values: Vec<T>, dims: &[usize]) -> Result<Self> {
        let shape = Shape::from_slice(dims);
        if values.len() != shape.size() {
            return Err(TensorError::shape_mismatch(
                "from_vec",
                format!("{} elements for shape {shape}", shape.size()),
                format!("{} elements", values.len()),
            ));
        }
        let data = ArrayD::from_shape_vec(IxDyn(dims), values)
            .map_err(|e| TensorError::invalid_shape("from_vec", e.to_string()))?;
        Ok(Self {
            diff: ArrayD::zeros(IxDyn(dims)),
            data,
            shape,
        })
    }

    /// Reinterprets both storages under a new shape with the same element
    /// count, e.g. to reuse a buffer for the output shape a layer's
    /// `configure` returns.
    pub fn reshape(&mut self, dims: &[usize]) -> Result<()> {
        let shape = Shape::from_slice(dims);
        if shape.size() != self.count() {
            return Err(TensorError::shape_mismatch(
                "reshape",
                format!("{} elements", self.count()),
                format!("{} elements for shape {shape}", shape.size()),
            ));
        }
        // Both storages are contiguous, so this is a metadata change.
        let data = std::mem::replace(&mut self.data, ArrayD::zeros(IxDyn(&[0])));
        self.data = data
            .into_shape_with_order(IxDyn(dims))
            .map_err(|e| TensorError::invalid_shape("reshape", e.to_string()))?;
        let diff = std::mem::replace(&mut self.diff, ArrayD::zeros(IxDyn(&[0])));
        self.diff = diff
            .into_shape_with_order(IxDyn(dims))
            .map_err(|e| TensorError::invalid_shape("reshape", e.to_string()))?;
        self.shape = shape;
        Ok(())
    }
}

impl<T> Tensor<T> {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Total number of elements.
    pub fn count(&self) -> usize {
        self.shape.size()
    }

    /// Batch size (first NCHW axis).
    pub fn num(&self) -> usize {
        self.shape[0]
    }

    pub fn channels(&self) -> usize {
        self.shape[1]
    }

    pub fn height(&self) -> usize {
        self.shape[2]
    }

    pub fn width(&self) -> usize {
        self.shape[3]
    }

    /// Flat offset of batch item `n` in either storage.
    pub fn offset(&self, n: usize) -> usize {
        debug_assert!(n < self.num());
        n * (self.count() / self.num())
    }

    /// Value buffer as a contiguous slice.
    pub fn data(&self) -> &[T] {
        self.data
            .as_slice()
            .unwrap_or_else(|| panic!("tensor value storage is not contiguous"))
    }

    /// Mutable value buffer.
    pub fn data_mut(&mut self) -> &mut [T] {
        self.data
            .as_slice_mut()
            .unwrap_or_else(|| panic!("tensor value storage is not contiguous"))
    }

    /// Gradient buffer as a contiguous slice.
    pub fn diff(&self) -> &[T] {
        self.diff
            .as_slice()
            .unwrap_or_else(|| panic!("tensor gradient storage is not contiguous"))
    }

    /// Mutable gradient buffer.
    pub fn diff_mut(&mut self) -> &mut [T] {
        self.diff
            .as_slice_mut()
            .unwrap_or_else(|| panic!("tensor gradient storage is not contiguous"))
    }

    /// Split borrow: read the values while writing the gradients.
    ///
    /// Backward passes compute `dL/dx` from `x` in place, so they need both
    /// storages of the same tensor at once.
    pub fn data_and_diff_mut(&mut self) -> (&[T], &mut [T]) {
        let data = self
            .data
            .as_slice()
            .unwrap_or_else(|| panic!("tensor value storage is not contiguous"));
        let diff = self
            .diff
            .as_slice_mut()
            .unwrap_or_else(|| panic!("tensor gradient storage is not contiguous"));
        (data, diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_has_matching_storages() {
        let t = Tensor::<f32>::zeros(&[2, 3, 4, 4]);
        assert_eq!(t.count(), 96);
        assert_eq!(t.data().len(), t.diff().len());
        assert!(t.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Tensor::from_vec(vec![1.0f32, 2.0], &[1, 1, 2, 2]).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { .. }));
    }

    #[test]
    fn offset_strides_by_item() {
        let t = Tensor::<f32>::zeros(&[4, 2, 3, 3]);
        assert_eq!(t.offset(0), 0);
        assert_eq!(t.offset(1), 18);
        assert_eq!(t.offset(3), 54);
    }

    #[test]
    fn reshape_preserves_elements() {
        let mut t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 1, 2, 3]).unwrap();
        t.diff_mut().copy_from_slice(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        t.reshape(&[1, 6, 1, 1]).unwrap();
        assert_eq!(t.shape().dims(), &[1, 6, 1, 1]);
        assert_eq!(t.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(t.diff(), &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn reshape_rejects_element_count_change() {
        let mut t = Tensor::<f32>::zeros(&[1, 1, 2, 3]);
        let err = t.reshape(&[1, 1, 2, 2]).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { .. }));
        assert_eq!(t.shape().dims(), &[1, 1, 2, 3]);
    }

    #[test]
    fn split_borrow_reads_values_and_writes_gradients() {
        let mut t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[1, 1, 2, 2]).unwrap();
        let (data, diff) = t.data_and_diff_mut();
        for (d, x) in diff.iter_mut().zip(data.iter()) {
            *d = x * 2.0;
        }
        assert_eq!(t.diff(), &[2.0, 4.0, 6.0, 8.0]);
    }
}
