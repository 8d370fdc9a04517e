//! Reference CPU backend.
//!
//! Straightforward scalar loops; the im2col/col2im pair iterates in
//! column order so the unfolded matrix is written sequentially.

use super::Backend;
use num_traits::Float;

#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl<T: Float> Backend<T> for CpuBackend {
    fn fill(&self, value: T, dst: &mut [T]) {
        for v in dst.iter_mut() {
            *v = value;
        }
    }

    fn copy(&self, src: &[T], dst: &mut [T]) {
        dst.copy_from_slice(src);
    }

    fn scale(&self, alpha: T, dst: &mut [T]) {
        for v in dst.iter_mut() {
            *v = *v * alpha;
        }
    }

    fn add_scalar(&self, value: T, dst: &mut [T]) {
        for v in dst.iter_mut() {
            *v = *v + value;
        }
    }

    fn mul_assign(&self, src: &[T], dst: &mut [T]) {
        debug_assert_eq!(src.len(), dst.len());
        for (v, s) in dst.iter_mut().zip(src.iter()) {
            *v = *v * *s;
        }
    }

    fn div_into(&self, numer: &[T], dst: &mut [T]) {
        debug_assert_eq!(numer.len(), dst.len());
        for (v, n) in dst.iter_mut().zip(numer.iter()) {
            *v = *n / *v;
        }
    }

    fn powx(&self, exponent: T, dst: &mut [T]) {
        for v in dst.iter_mut() {
            *v = v.powf(exponent);
        }
    }

    fn axpby(&self, alpha: T, x: &[T], beta: T, dst: &mut [T]) {
        debug_assert_eq!(x.len(), dst.len());
        for (v, xv) in dst.iter_mut().zip(x.iter()) {
            *v = alpha * *xv + beta * *v;
        }
    }

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
    ) {
        let out_h = (height + 2 * pad_h - kernel_h) / stride_h + 1;
        let out_w = (width + 2 * pad_w - kernel_w) / stride_w + 1;
        let channels_col = channels * kernel_h * kernel_w;
        debug_assert_eq!(src.len(), channels * height * width);
        debug_assert_eq!(dst.len(), channels_col * out_h * out_w);

        for c in 0..channels_col {
            let w_offset = c % kernel_w;
            let h_offset = (c / kernel_w) % kernel_h;
            let c_im = c / kernel_w / kernel_h;
            for h in 0..out_h {
                let h_pad = (h * stride_h + h_offset) as isize - pad_h as isize;
                for w in 0..out_w {
                    let w_pad = (w * stride_w + w_offset) as isize - pad_w as isize;
                    let col_index = (c * out_h + h) * out_w + w;
                    dst[col_index] = if h_pad >= 0
                        && h_pad < height as isize
                        && w_pad >= 0
                        && w_pad < width as isize
                    {
                        src[(c_im * height + h_pad as usize) * width + w_pad as usize]
                    } else {
                        T::zero()
                    };
                }
            }
        }
    }

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
    ) {
        let out_h = (height + 2 * pad_h - kernel_h) / stride_h + 1;
        let out_w = (width + 2 * pad_w - kernel_w) / stride_w + 1;
        let channels_col = channels * kernel_h * kernel_w;
        debug_assert_eq!(src.len(), channels_col * out_h * out_w);
        debug_assert_eq!(dst.len(), channels * height * width);

        <Self as Backend<T>>::fill(self, T::zero(), dst);
        for c in 0..channels_col {
            let w_offset = c % kernel_w;
            let h_offset = (c / kernel_w) % kernel_h;
            let c_im = c / kernel_w / kernel_h;
            for h in 0..out_h {
                let h_pad = (h * stride_h + h_offset) as isize - pad_h as isize;
                for w in 0..out_w {
                    let w_pad = (w * stride_w + w_offset) as isize - pad_w as isize;
                    if h_pad >= 0
                        && h_pad < height as isize
                        && w_pad >= 0
                        && w_pad < width as isize
                    {
                        let im_index = (c_im * height + h_pad as usize) * width + w_pad as usize;
                        let col_index = (c * out_h + h) * out_w + w;
                        dst[im_index] = dst[im_index] + src[col_index];
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> CpuBackend {
        CpuBackend
    }

    #[test]
    fn fill_and_scale() {
        let b = backend();
        let mut buf = vec![0.0f32; 4];
        b.fill(3.0, &mut buf);
        assert_eq!(buf, [3.0, 3.0, 3.0, 3.0]);
        b.scale(0.5, &mut buf);
        assert_eq!(buf, [1.5, 1.5, 1.5, 1.5]);
    }

    #[test]
    fn axpby_with_zero_beta_overwrites() {
        let b = backend();
        let x = [1.0f32, 2.0, 3.0];
        let mut dst = [7.0f32, 7.0, 7.0];
        b.axpby(2.0, &x, 0.0, &mut dst);
        assert_eq!(dst, [2.0, 4.0, 6.0]);
    }

    #[test]
    fn div_into_divides_numerator_by_dst() {
        let b = backend();
        let numer = [8.0f32, 9.0, 10.0];
        let mut dst = [2.0f32, 3.0, 5.0];
        b.div_into(&numer, &mut dst);
        assert_eq!(dst, [4.0, 3.0, 2.0]);
    }

    #[test]
    fn div_into_propagates_nan_on_zero() {
        let b = backend();
        let numer = [0.0f32];
        let mut dst = [0.0f32];
        b.div_into(&numer, &mut dst);
        assert!(dst[0].is_nan());
    }

    #[test]
    fn im2col_known_values() {
        // 1 channel, 3x3 input, 2x2 kernel, stride 1, no padding.
        let b = backend();
        let src: Vec<f32> = (1..=9).map(|v| v as f32).collect();
        let mut dst = vec![0.0f32; 4 * 2 * 2];
        b.im2col(&src, 1, 3, 3, 2, 2, 0, 0, 1, 1, &mut dst);
        // Row per kernel offset, column per output position.
        assert_eq!(&dst[0..4], &[1.0, 2.0, 4.0, 5.0]); // offset (0,0)
        assert_eq!(&dst[4..8], &[2.0, 3.0, 5.0, 6.0]); // offset (0,1)
        assert_eq!(&dst[8..12], &[4.0, 5.0, 7.0, 8.0]); // offset (1,0)
        assert_eq!(&dst[12..16], &[5.0, 6.0, 8.0, 9.0]); // offset (1,1)
    }

    #[test]
    fn im2col_zero_pads_outside_bounds() {
        let b = backend();
        let src = vec![5.0f32];
        // 1 channel, 1x1 input, 3x3 kernel, pad 1 -> single 1x1 output per row.
        let mut dst = vec![f32::NAN; 9];
        b.im2col(&src, 1, 1, 1, 3, 3, 1, 1, 1, 1, &mut dst);
        assert_eq!(dst, vec![0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn col2im_accumulates_overlaps() {
        // Folding all-ones columns counts how many patches cover each cell.
        let b = backend();
        let src = vec![1.0f32; 4 * 2 * 2];
        let mut dst = vec![f32::NAN; 9];
        b.col2im(&src, 1, 3, 3, 2, 2, 0, 0, 1, 1, &mut dst);
        assert_eq!(
            dst,
            vec![1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0]
        );
    }
}
