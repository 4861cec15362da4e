//! Core trait for flow elements.

use crate::error::FlowResult;
use pd_fluids::FluidState;

/// Per-evaluation context handed to every element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowContext {
    /// Crank angle [rad]
    pub theta: f64,
    /// True from the truncated step onto the discharge angle until the
    /// cycle has moved past it.
    pub discharge_pending: bool,
}

impl FlowContext {
    pub fn at(theta: f64) -> Self {
        Self {
            theta,
            discharge_pending: false,
        }
    }
}

/// Mass-flow element between two states.
pub trait FlowFunction: Send + Sync {
    fn name(&self) -> &str;

    /// Flow magnitude [kg/s] from `up` to `down`; `up.p >= down.p`.
    ///
    /// Returning zero is how an element reports that it is closed.
    fn mdot(&self, ctx: &FlowContext, up: &FluidState, down: &FluidState) -> FlowResult<f64>;
}

impl<F: FlowFunction + ?Sized> FlowFunction for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn mdot(&self, ctx: &FlowContext, up: &FluidState, down: &FluidState) -> FlowResult<f64> {
        (**self).mdot(ctx, up, down)
    }
}
