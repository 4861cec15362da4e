//! Chambers and the registry that owns them.
//!
//! Every chamber gets a permanent row at setup. Existence is a per-row flag
//! toggled only by the event machine; the cached `exists_*` views are rebuilt
//! by [`CvRegistry::update_existence`] and are invalid until then.

use std::collections::{HashMap, HashSet};

use pd_core::ids::CvId;
use pd_fluids::FluidState;

use crate::error::{SimError, SimResult};

/// Involute angle span bounding a chamber's walls [rad].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoluteSpan {
    pub phi_min: f64,
    pub phi_max: f64,
}

/// Chamber volume as a function of crank angle.
pub trait VolumeFunction: Send + Sync {
    /// `(V [m³], dV/dθ [m³/rad])`
    fn volume(&self, theta: f64) -> (f64, f64);

    /// Wall involute angles, for heat-transfer area.
    fn involute_angles(&self, _theta: f64) -> Option<InvoluteSpan> {
        None
    }
}

impl<F> VolumeFunction for F
where
    F: Fn(f64) -> (f64, f64) + Send + Sync,
{
    fn volume(&self, theta: f64) -> (f64, f64) {
        self(theta)
    }
}

/// Force-coefficient class of a chamber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChamberShape {
    /// Shell-side suction plenum; carries no orbiting-scroll force.
    Plenum,
    Suction,
    Compression,
    Discharge,
    DischargeMerged,
}

/// Chamber a CV turns into after one revolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Successor {
    #[default]
    None,
    One(String),
    /// Ordered one-to-many split.
    Split(Vec<String>),
}

impl Successor {
    pub fn keys(&self) -> &[String] {
        match self {
            Successor::None => &[],
            Successor::One(k) => std::slice::from_ref(k),
            Successor::Split(ks) => ks,
        }
    }
}

pub struct ControlVolume {
    key: String,
    shape: ChamberShape,
    volume_fn: Box<dyn VolumeFunction>,
    state: FluidState,
    exists: bool,
    initially_exists: bool,
    becomes: Successor,
    discharge_becomes: Option<String>,
}

impl ControlVolume {
    pub fn new(
        key: impl Into<String>,
        shape: ChamberShape,
        volume_fn: impl VolumeFunction + 'static,
        initial_state: FluidState,
    ) -> Self {
        Self {
            key: key.into(),
            shape,
            volume_fn: Box::new(volume_fn),
            state: initial_state,
            exists: true,
            initially_exists: true,
            becomes: Successor::None,
            discharge_becomes: None,
        }
    }

    /// Existence at θ = 0 of every cycle.
    pub fn exists_at_start(mut self, exists: bool) -> Self {
        self.exists = exists;
        self.initially_exists = exists;
        self
    }

    pub fn becomes(mut self, key: impl Into<String>) -> Self {
        self.becomes = Successor::One(key.into());
        self
    }

    pub fn becomes_split<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.becomes = Successor::Split(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn discharge_becomes(mut self, key: impl Into<String>) -> Self {
        self.discharge_becomes = Some(key.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shape(&self) -> ChamberShape {
        self.shape
    }

    pub fn state(&self) -> &FluidState {
        &self.state
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn initially_exists(&self) -> bool {
        self.initially_exists
    }

    pub fn successor(&self) -> &Successor {
        &self.becomes
    }

    pub fn discharge_successor(&self) -> Option<&str> {
        self.discharge_becomes.as_deref()
    }

    pub fn volume(&self, theta: f64) -> (f64, f64) {
        self.volume_fn.volume(theta)
    }

    pub fn involute_angles(&self, theta: f64) -> Option<InvoluteSpan> {
        self.volume_fn.involute_angles(theta)
    }
}

impl std::fmt::Debug for ControlVolume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlVolume")
            .field("key", &self.key)
            .field("shape", &self.shape)
            .field("exists", &self.exists)
            .field("becomes", &self.becomes)
            .field("discharge_becomes", &self.discharge_becomes)
            .finish_non_exhaustive()
    }
}

/// Ordered chamber set with fixed row identity.
#[derive(Debug, Default)]
pub struct CvRegistry {
    cvs: Vec<ControlVolume>,
    index: HashMap<String, usize>,
    exists_keys: Vec<String>,
    exists_indices: Vec<usize>,
    stale: bool,
}

impl CvRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chamber; keys must be unique.
    pub fn add(&mut self, cv: ControlVolume) -> SimResult<CvId> {
        if self.index.contains_key(cv.key()) {
            return Err(SimError::config(format!(
                "duplicate control volume key '{}'",
                cv.key()
            )));
        }
        let row = self.cvs.len();
        self.index.insert(cv.key.clone(), row);
        self.cvs.push(cv);
        self.update_existence();
        Ok(CvId::from_index(row))
    }

    /// Rebuild the existing-subset cache. Must follow every flag toggle.
    pub fn update_existence(&mut self) {
        self.exists_indices.clear();
        self.exists_keys.clear();
        for (i, cv) in self.cvs.iter().enumerate() {
            if cv.exists {
                self.exists_indices.push(i);
                self.exists_keys.push(cv.key.clone());
            }
        }
        self.stale = false;
    }

    pub fn set_exists(&mut self, row: usize, exists: bool) -> SimResult<()> {
        let cv = self
            .cvs
            .get_mut(row)
            .ok_or_else(|| SimError::invariant(format!("no control volume at row {row}")))?;
        if cv.exists != exists {
            cv.exists = exists;
            self.stale = true;
        }
        Ok(())
    }

    /// Restore the θ = 0 existence flags.
    pub fn reset_existence(&mut self) {
        for cv in &mut self.cvs {
            cv.exists = cv.initially_exists;
        }
        self.update_existence();
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    fn ensure_fresh(&self) -> SimResult<()> {
        if self.stale {
            return Err(SimError::invariant(
                "existence flags changed without update_existence()",
            ));
        }
        Ok(())
    }

    /// `(row, V, dV/dθ)` for every existing chamber, in row order.
    pub fn volumes(&self, theta: f64) -> SimResult<Vec<(usize, f64, f64)>> {
        self.ensure_fresh()?;
        Ok(self
            .exists_indices
            .iter()
            .map(|&i| {
                let (v, dv) = self.cvs[i].volume(theta);
                (i, v, dv)
            })
            .collect())
    }

    pub fn exists_indices(&self) -> SimResult<&[usize]> {
        self.ensure_fresh()?;
        Ok(&self.exists_indices)
    }

    pub fn exists_keys(&self) -> SimResult<&[String]> {
        self.ensure_fresh()?;
        Ok(&self.exists_keys)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn require(&self, key: &str) -> SimResult<usize> {
        self.index_of(key)
            .ok_or_else(|| SimError::config(format!("unknown control volume '{key}'")))
    }

    pub fn get(&self, row: usize) -> Option<&ControlVolume> {
        self.cvs.get(row)
    }

    pub fn set_state(&mut self, row: usize, state: FluidState) -> SimResult<()> {
        let cv = self
            .cvs
            .get_mut(row)
            .ok_or_else(|| SimError::invariant(format!("no control volume at row {row}")))?;
        cv.state = state;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cvs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cvs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlVolume> {
        self.cvs.iter()
    }

    pub fn keys(&self) -> Vec<String> {
        self.cvs.iter().map(|cv| cv.key.clone()).collect()
    }

    /// Check that every successor named anywhere is a registered chamber and
    /// that no chamber is the successor of two others.
    pub fn validate_successions(&self) -> SimResult<()> {
        let mut claimed: HashSet<&str> = HashSet::new();
        for cv in &self.cvs {
            for next in cv.becomes.keys() {
                if !self.index.contains_key(next) {
                    return Err(SimError::config(format!(
                        "'{}' becomes unknown chamber '{next}'",
                        cv.key
                    )));
                }
                if !claimed.insert(next.as_str()) {
                    return Err(SimError::config(format!(
                        "chamber '{next}' is the successor of more than one chamber"
                    )));
                }
            }
            if let Some(next) = &cv.discharge_becomes
                && !self.index.contains_key(next)
            {
                return Err(SimError::config(format!(
                    "'{}' discharge_becomes unknown chamber '{next}'",
                    cv.key
                )));
            }
        }
        Ok(())
    }
}
