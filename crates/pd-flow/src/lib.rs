//! pd-flow: mass-flow elements connecting chambers and boundary nodes.
//!
//! A flow element is a stateless function of the upstream and downstream
//! states. Direction is resolved by the caller from the end pressures;
//! elements only ever see `up` with the higher pressure.

pub mod common;
pub mod error;
pub mod gated;
pub mod nozzle;
pub mod traits;

pub use common::{EPSILON_PRESSURE, check_finite, flow_direction, friction_factor};
pub use error::{FlowError, FlowResult};
pub use gated::Gated;
pub use nozzle::{ConstantArea, FlowArea, IsentropicNozzle};
pub use traits::{FlowContext, FlowFunction};
