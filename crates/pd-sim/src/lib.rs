//! Crank-angle simulation of positive-displacement compressors.
//!
//! Provides:
//! - Control-volume registry with event-driven chamber existence
//! - Flow-path registry and boundary tube network
//! - Mass/energy derivative evaluation over a flat `[m…, U…]` state vector
//! - Adaptive RKF45 and fixed-step RK4 integrators
//! - Discharge and merge event machine
//! - Force, bearing and motor loss post-processing
//! - Lump energy balance and the outer cyclic steady-state loop

pub mod control_volume;
pub mod derivs;
pub mod error;
pub mod events;
pub mod flow_path;
pub mod forces;
pub mod heat_transfer;
pub mod history;
pub mod integrator;
pub mod losses;
pub mod lump;
pub mod sim;
pub mod solve;
pub mod summary;
pub mod tubes;

pub use control_volume::{
    ChamberShape, ControlVolume, CvRegistry, InvoluteSpan, Successor, VolumeFunction,
};
pub use derivs::{DerivativeEvaluator, Evaluation};
pub use error::{SimError, SimResult};
pub use events::{DischargePhase, EventConfig, EventMachine, MergeRule, StepPlan};
pub use flow_path::{FlowPath, FlowRegistry, Node, PathFlow};
pub use forces::{ForceCoefficients, ForceGeometry, ForceMeans, ForceOptions, ForceSummary};
pub use heat_transfer::{Adiabatic, HeatTransferInput, HeatTransferModel, WallConvection};
pub use history::{CvSample, Field, History};
pub use integrator::{IntegratorKind, IntegratorOptions, Rk4, Rkf45};
pub use losses::{
    JournalBearing, MechanicalConfig, MechanicalLosses, Motor, MotorPoint, ShellPressure,
    ThrustBearing,
};
pub use sim::{CycleStats, SimulationState};
pub use solve::{CompressorModel, SolveOptions, SolveSummary};
pub use tubes::{Tube, TubeEnd, TubeNetwork};
