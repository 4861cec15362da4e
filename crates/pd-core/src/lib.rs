//! pd-core: shared foundation for the positive-displacement simulator.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (tolerances, float helpers, periodic angle arithmetic, quadrature)
//! - ids (compact row identifiers for chambers, paths and tubes)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
