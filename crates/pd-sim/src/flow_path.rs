//! Directed flow connections between chambers and tube nodes.

use pd_core::ids::PathId;
use pd_flow::{FlowContext, FlowFunction, flow_direction};
use pd_fluids::FluidState;

use crate::control_volume::CvRegistry;
use crate::error::{SimError, SimResult};
use crate::tubes::{TubeEnd, TubeNetwork};

/// Resolved end of a flow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Cv(usize),
    Tube(usize, TubeEnd),
}

pub struct FlowPath {
    pub key1: String,
    pub key2: String,
    func: Box<dyn FlowFunction>,
    ends: Option<(Node, Node)>,
}

impl FlowPath {
    pub fn new(
        key1: impl Into<String>,
        key2: impl Into<String>,
        func: impl FlowFunction + 'static,
    ) -> Self {
        Self {
            key1: key1.into(),
            key2: key2.into(),
            func: Box::new(func),
            ends: None,
        }
    }

    pub fn ends(&self) -> Option<(Node, Node)> {
        self.ends
    }
}

impl std::fmt::Debug for FlowPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowPath")
            .field("key1", &self.key1)
            .field("key2", &self.key2)
            .field("func", &self.func.name())
            .finish()
    }
}

/// One path's result: flow is positive from `key1` to `key2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathFlow {
    pub mdot: f64,
    pub h_up: f64,
}

impl PathFlow {
    pub const ZERO: PathFlow = PathFlow {
        mdot: 0.0,
        h_up: 0.0,
    };
}

#[derive(Debug, Default)]
pub struct FlowRegistry {
    paths: Vec<FlowPath>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: FlowPath) -> PathId {
        self.paths.push(path);
        PathId::from_index(self.paths.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlowPath> {
        self.paths.iter()
    }

    /// Bind every path key to a chamber row or tube node.
    pub fn resolve(&mut self, cvs: &CvRegistry, tubes: &TubeNetwork) -> SimResult<()> {
        let lookup = |key: &str| -> SimResult<Node> {
            if let Some(row) = cvs.index_of(key) {
                return Ok(Node::Cv(row));
            }
            tubes
                .node(key)
                .map(|(t, end)| Node::Tube(t, end))
                .ok_or_else(|| {
                    SimError::config(format!("flow path end '{key}' is neither a chamber nor a tube node"))
                })
        };
        for path in &mut self.paths {
            if path.key1 == path.key2 {
                return Err(SimError::config(format!(
                    "flow path connects '{}' to itself",
                    path.key1
                )));
            }
            path.ends = Some((lookup(&path.key1)?, lookup(&path.key2)?));
        }
        Ok(())
    }

    /// Evaluate every path. `state_of` returns `None` for ends that do not
    /// currently exist; such paths carry no flow.
    pub fn evaluate_all<'s, S>(&self, ctx: &FlowContext, state_of: S) -> SimResult<Vec<PathFlow>>
    where
        S: Fn(Node) -> Option<&'s FluidState>,
    {
        self.paths
            .iter()
            .map(|path| {
                let (n1, n2) = path.ends.ok_or_else(|| {
                    SimError::invariant(format!(
                        "flow path {}-{} used before resolve()",
                        path.key1, path.key2
                    ))
                })?;
                let (Some(s1), Some(s2)) = (state_of(n1), state_of(n2)) else {
                    return Ok(PathFlow::ZERO);
                };
                let dir = flow_direction(s1.p_pa(), s2.p_pa());
                if dir == 0.0 {
                    return Ok(PathFlow::ZERO);
                }
                let (up, down) = if dir > 0.0 { (s1, s2) } else { (s2, s1) };
                let mdot = path.func.mdot(ctx, up, down)?;
                Ok(PathFlow {
                    mdot: dir * mdot,
                    h_up: up.h(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_volume::{ChamberShape, ControlVolume};
    use pd_core::units::{k, pa};
    use pd_flow::{ConstantArea, IsentropicNozzle};
    use pd_fluids::{FluidModel, IdealGasModel, Species, StateInput};

    fn air(p: f64) -> FluidState {
        IdealGasModel::new()
            .state(StateInput::PT { p: pa(p), t: k(300.0) }, Species::Air)
            .unwrap()
    }

    fn setup() -> (CvRegistry, TubeNetwork, FlowRegistry) {
        let mut cvs = CvRegistry::new();
        cvs.add(ControlVolume::new("a", ChamberShape::Compression, |_| (1e-5, 0.0), air(2e5)))
            .unwrap();
        cvs.add(ControlVolume::new("b", ChamberShape::Compression, |_| (1e-5, 0.0), air(1e5)))
            .unwrap();
        let tubes = TubeNetwork::new();
        let mut flows = FlowRegistry::new();
        flows.add(FlowPath::new(
            "b",
            "a",
            IsentropicNozzle::new("b-a", 1.0, ConstantArea(1e-6)).unwrap(),
        ));
        (cvs, tubes, flows)
    }

    #[test]
    fn direction_follows_pressure() {
        let (cvs, tubes, mut flows) = setup();
        flows.resolve(&cvs, &tubes).unwrap();
        let out = flows
            .evaluate_all(&FlowContext::at(0.0), |n| match n {
                Node::Cv(r) => cvs.get(r).map(|cv| cv.state()),
                Node::Tube(..) => None,
            })
            .unwrap();
        // b is the low side, so flow runs key2 -> key1
        assert!(out[0].mdot < 0.0);
        assert_eq!(out[0].h_up, air(2e5).h());
    }

    #[test]
    fn missing_end_gives_no_flow() {
        let (cvs, tubes, mut flows) = setup();
        flows.resolve(&cvs, &tubes).unwrap();
        let out = flows
            .evaluate_all(&FlowContext::at(0.0), |_| None)
            .unwrap();
        assert_eq!(out[0], PathFlow::ZERO);
    }

    #[test]
    fn unknown_key_fails_resolution() {
        let (cvs, tubes, mut flows) = setup();
        flows.add(FlowPath::new(
            "a",
            "ghost",
            IsentropicNozzle::new("a-ghost", 1.0, ConstantArea(1e-6)).unwrap(),
        ));
        assert!(matches!(
            flows.resolve(&cvs, &tubes),
            Err(SimError::Config { .. })
        ));
    }
}
