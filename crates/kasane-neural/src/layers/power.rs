//! Elementwise power transform: `y = (shift + scale * x)^power`.
//!
//! The backward pass picks the cheapest exact form of
//! `dy/dx = scale * power * (shift + scale * x)^(power - 1)` instead of
//! recomputing the power:
//!
//! - `power == 1` or `scale * power == 0`: the derivative is a constant
//! - `power == 2`: a single scaled-add, `diff_scale*scale*x + diff_scale*shift`
//! - `shift == 0`: `power * y / x`, reusing the cached forward output
//! - otherwise: `diff_scale * y / (shift + scale * x)`
//!
//! The division-based branches are intentionally unguarded: at `x == 0`
//! (or `shift + scale*x == 0`) the closed form itself is singular and the
//! gradient propagates as NaN/Inf rather than being clamped.

use crate::layers::Layer;
use kasane_core::{Backend, CpuBackend, Result, Shape, Tensor, TensorError};
use num_traits::Float;

/// Power/scale/shift scalars, defaulting to the identity transform.
#[derive(Debug, Clone, Copy)]
pub struct PowerParams<T> {
    pub power: T,
    pub scale: T,
    pub shift: T,
}

impl<T: Float> Default for PowerParams<T> {
    fn default() -> Self {
        Self {
            power: T::one(),
            scale: T::one(),
            shift: T::zero(),
        }
    }
}

/// Scalars cached by `configure`.
#[derive(Debug, Clone, Copy)]
struct PowerState<T> {
    power: T,
    scale: T,
    shift: T,
    /// `power * scale`, the constant factor of the chain rule. Zero marks
    /// the degenerate case where the output does not depend on the input.
    diff_scale: T,
}

/// Elementwise power layer.
pub struct PowerLayer<T: Float, B: Backend<T> = CpuBackend> {
    backend: B,
    params: PowerParams<T>,
    state: Option<PowerState<T>>,
}

impl<T, B> PowerLayer<T, B>
where
    T: Float,
    B: Backend<T>,
{
    pub fn new(params: PowerParams<T>) -> Self
    where
        B: Default,
    {
        Self::with_backend(params, B::default())
    }

    pub fn with_backend(params: PowerParams<T>, backend: B) -> Self {
        Self {
            backend,
            params,
            state: None,
        }
    }

    fn state(&self, op: &str) -> Result<PowerState<T>> {
        self.state
            .ok_or_else(|| TensorError::invalid_configuration(op, "layer is not configured"))
    }

    fn check_count(&self, op: &str, input: &Tensor<T>, output: &Tensor<T>) -> Result<()> {
        if input.count() != output.count() {
            return Err(TensorError::shape_mismatch(
                op,
                format!("{} elements", input.count()),
                format!("{} elements", output.count()),
            ));
        }
        Ok(())
    }
}

impl<T, B> Layer<T> for PowerLayer<T, B>
where
    T: Float,
    B: Backend<T>,
{
    fn name(&self) -> &str {
        "power"
    }

    fn configure(&mut self, input_shape: &Shape) -> Result<Shape> {
        let PowerParams {
            power,
            scale,
            shift,
        } = self.params;
        self.state = Some(PowerState {
            power,
            scale,
            shift,
            diff_scale: power * scale,
        });
        Ok(input_shape.clone())
    }

    fn forward(&self, input: &Tensor<T>, output: &mut Tensor<T>) -> Result<T> {
        let state = self.state("power_forward")?;
        self.check_count("power_forward", input, output)?;
        let dst = output.data_mut();

        // The input is irrelevant when scale or power is zero: every
        // element of the output is the same constant.
        if state.diff_scale == T::zero() {
            let value = if state.power == T::zero() {
                T::one()
            } else {
                state.shift.powf(state.power)
            };
            self.backend.fill(value, dst);
            return Ok(T::zero());
        }

        self.backend.copy(input.data(), dst);
        if state.scale != T::one() {
            self.backend.scale(state.scale, dst);
        }
        if state.shift != T::zero() {
            self.backend.add_scalar(state.shift, dst);
        }
        if state.power != T::one() {
            self.backend.powx(state.power, dst);
        }
        Ok(T::zero())
    }

    fn backward(
        &self,
        output: &Tensor<T>,
        propagate_down: bool,
        input: &mut Tensor<T>,
    ) -> Result<()> {
        if !propagate_down {
            return Ok(());
        }
        let state = self.state("power_backward")?;
        self.check_count("power_backward", input, output)?;
        let (x, dx) = input.data_and_diff_mut();

        if state.diff_scale == T::zero() || state.power == T::one() {
            // dy/dx is the constant diff_scale everywhere.
            self.backend.fill(state.diff_scale, dx);
        } else if state.power == (T::one() + T::one()) {
            // dy/dx = 2*scale*(shift + scale*x)
            //       = diff_scale*scale*x + diff_scale*shift
            self.backend
                .axpby(state.diff_scale * state.scale, x, T::zero(), dx);
            if state.shift != T::zero() {
                self.backend.add_scalar(state.diff_scale * state.shift, dx);
            }
        } else if state.shift == T::zero() {
            // y = (scale*x)^power -> dy/dx = power * y / x. Relies on the
            // cached forward output still matching the current parameters.
            self.backend.copy(x, dx);
            self.backend.div_into(output.data(), dx);
            self.backend.scale(state.power, dx);
        } else {
            // dy/dx = diff_scale * y / (shift + scale*x); rebuild the base
            // in the gradient buffer, then divide the cached output by it.
            self.backend.copy(x, dx);
            if state.scale != T::one() {
                self.backend.scale(state.scale, dx);
            }
            self.backend.add_scalar(state.shift, dx);
            self.backend.div_into(output.data(), dx);
            if state.diff_scale != T::one() {
                self.backend.scale(state.diff_scale, dx);
            }
        }

        // Chain rule. In the diff_scale == 0 case the fill above already
        // wrote the final (constant zero) gradient, not a multiplier.
        if state.diff_scale != T::zero() {
            self.backend.mul_assign(output.diff(), dx);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_forward(params: PowerParams<f32>, values: Vec<f32>) -> Vec<f32> {
        let dims = [1, 1, 1, values.len()];
        let input = Tensor::from_vec(values, &dims).unwrap();
        let mut output = Tensor::<f32>::zeros(&dims);
        let mut layer = PowerLayer::<f32>::new(params);
        layer.configure(input.shape()).unwrap();
        let loss = layer.forward(&input, &mut output).unwrap();
        assert_eq!(loss, 0.0);
        output.data().to_vec()
    }

    #[test]
    fn identity_parameters_pass_through() {
        let out = run_forward(PowerParams::default(), vec![-1.5, 0.0, 2.5]);
        assert_eq!(out, vec![-1.5, 0.0, 2.5]);
    }

    #[test]
    fn degenerate_power_zero_ignores_input() {
        // NaN input proves the degenerate branch never reads the values.
        let params = PowerParams {
            power: 0.0,
            scale: 3.0,
            shift: -2.0,
        };
        let out = run_forward(params, vec![f32::NAN, f32::NAN]);
        assert_eq!(out, vec![1.0, 1.0]);
    }

    #[test]
    fn degenerate_scale_zero_fills_shift_power() {
        let params = PowerParams {
            power: 3.0,
            scale: 0.0,
            shift: 2.0,
        };
        let out = run_forward(params, vec![f32::NAN, f32::NAN, f32::NAN]);
        assert_eq!(out, vec![8.0, 8.0, 8.0]);
    }

    #[test]
    fn unconfigured_forward_fails() {
        let layer = PowerLayer::<f32>::new(PowerParams::default());
        let input = Tensor::<f32>::zeros(&[1, 1, 1, 2]);
        let mut output = Tensor::<f32>::zeros(&[1, 1, 1, 2]);
        assert!(matches!(
            layer.forward(&input, &mut output).unwrap_err(),
            TensorError::InvalidConfiguration { .. }
        ));
    }
}
