//! Predicate gate around another flow element.

use crate::error::FlowResult;
use crate::traits::{FlowContext, FlowFunction};
use pd_fluids::FluidState;

type Predicate = Box<dyn Fn(&FlowContext) -> bool + Send + Sync>;

/// Passes flow through `inner` only while `open(ctx)` holds.
///
/// Used for paths that are physically blocked by intervening chambers over
/// part of the revolution.
pub struct Gated<F> {
    inner: F,
    open: Predicate,
}

impl<F: FlowFunction> Gated<F> {
    pub fn new(inner: F, open: impl Fn(&FlowContext) -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner,
            open: Box::new(open),
        }
    }

    /// Closed while the discharge transition is pending.
    pub fn after_discharge(inner: F) -> Self {
        Self::new(inner, |ctx| !ctx.discharge_pending)
    }
}

impl<F: FlowFunction> FlowFunction for Gated<F> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn mdot(&self, ctx: &FlowContext, up: &FluidState, down: &FluidState) -> FlowResult<f64> {
        if (self.open)(ctx) {
            self.inner.mdot(ctx, up, down)
        } else {
            Ok(0.0)
        }
    }
}
