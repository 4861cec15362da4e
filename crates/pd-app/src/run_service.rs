//! Run execution and caching service.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use pd_project::schema::{MechDef, MotorDef, Project};
use pd_results::{CvIndex, ForcesRecord, RunManifest, RunOutputs, RunRecord, RunStore};
use pd_sim::{CompressorModel, SolveSummary};
use tracing::info;

use crate::compile::compile_model;
use crate::error::AppResult;
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service;

/// Version folded into every run id; a new engine never reuses old runs.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub engine_version: String,
    /// Store directory; defaults to `.pdsim/runs` next to the project file
    pub runs_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            engine_version: ENGINE_VERSION.to_string(),
            runs_dir: None,
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub solve_time_s: f64,
    pub save_time_s: f64,
    pub load_cache_time_s: f64,
    pub total_time_s: f64,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub timing: RunTimingSummary,
}

type ProgressCb<'a> = Option<&'a mut dyn FnMut(RunProgressEvent)>;

fn emit_progress(progress_cb: &mut ProgressCb<'_>, stage: RunStage, started: Instant, message: &str) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            Some(message.to_string()),
        ));
    }
}

/// Store for a project: the explicit directory, or the project's own.
pub fn open_store(project_path: &Path, runs_dir: Option<&Path>) -> AppResult<RunStore> {
    Ok(match runs_dir {
        Some(dir) => RunStore::new(dir.to_path_buf())?,
        None => RunStore::for_project(project_path)?,
    })
}

/// Execute or load a run.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: ProgressCb<'_>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    emit_progress(&mut progress_cb, RunStage::LoadingProject, started, "Loading project");
    let project = project_service::load_project(request.project_path)?;
    let store = open_store(request.project_path, request.options.runs_dir.as_deref())?;
    run_project_inner(&project, &store, &request.options, &mut progress_cb, started)
}

/// Execute or load a run for an in-memory project.
pub fn run_project(project: &Project, store: &RunStore, options: &RunOptions) -> AppResult<RunResponse> {
    run_project_inner(project, store, options, &mut None, Instant::now())
}

fn run_project_inner(
    project: &Project,
    store: &RunStore,
    options: &RunOptions,
    progress_cb: &mut ProgressCb<'_>,
    started: Instant,
) -> AppResult<RunResponse> {
    let mut timing = RunTimingSummary::default();
    emit_progress(progress_cb, RunStage::CheckingCache, started, "Checking run cache");
    let run_id = pd_results::compute_run_id(project, &options.engine_version);

    if options.use_cache && store.has_run(&run_id) {
        emit_progress(progress_cb, RunStage::LoadingCachedResult, started, "Loading cached run");
        let load_started = Instant::now();
        let manifest = store.load_manifest(&run_id)?;
        timing.load_cache_time_s = load_started.elapsed().as_secs_f64();
        timing.total_time_s = started.elapsed().as_secs_f64();
        info!(run_id = %run_id, "loaded cached run");
        emit_progress(progress_cb, RunStage::Completed, started, "Loaded cached run");
        return Ok(RunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
            timing,
        });
    }

    emit_progress(progress_cb, RunStage::CompilingModel, started, "Compiling model");
    let compile_started = Instant::now();
    let mut compiled = compile_model(project)?;
    timing.compile_time_s = compile_started.elapsed().as_secs_f64();

    emit_progress(progress_cb, RunStage::Solving, started, "Solving to cyclic steady state");
    let solve_started = Instant::now();
    let summary = compiled.model.solve(&compiled.options)?;
    timing.solve_time_s = solve_started.elapsed().as_secs_f64();

    emit_progress(progress_cb, RunStage::SavingResults, started, "Saving results");
    let save_started = Instant::now();
    let record = build_record(&compiled.model, &summary, &project.mech);
    let manifest = RunManifest::new(
        run_id.clone(),
        project.name.clone(),
        options.engine_version.clone(),
        outputs_from_summary(&summary),
    );
    store.save_run(&manifest, &record)?;
    timing.save_time_s = save_started.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    info!(
        run_id = %run_id,
        cycles = summary.cycles,
        eta_oi = summary.eta_oi,
        mdot = summary.mdot_kg_s,
        "run completed"
    );
    emit_progress(progress_cb, RunStage::Completed, started, "Run completed");
    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        timing,
    })
}

pub fn outputs_from_summary(summary: &SolveSummary) -> RunOutputs {
    RunOutputs {
        eta_oi: summary.eta_oi,
        mdot_kg_s: summary.mdot_kg_s,
        wdot_pv_w: summary.wdot_pv_w,
        wdot_mech_w: summary.wdot_mech_w,
        wdot_el_w: summary.wdot_el_w,
        motor_losses_w: summary.motor_losses_w,
        volumetric_efficiency: summary.volumetric_efficiency,
        t_lump_k: summary.t_lump_k,
        q_ambient_w: summary.q_ambient_w,
        omega_rad_s: summary.omega,
        cycles: summary.cycles,
    }
}

/// Last-cycle history, forces and losses of a solved model.
pub fn build_record(model: &CompressorModel, summary: &SolveSummary, mech: &MechDef) -> RunRecord {
    let h = &model.sim.history;
    let keys = model.sim.cvs.keys();
    let f = &summary.forces;
    let m = f.mean;

    let series = f
        .series()
        .into_iter()
        .map(|(name, values)| (name.to_string(), values.to_vec()))
        .collect();
    let means = [
        ("mean_Fz", m.fz),
        ("mean_Fx", m.fx),
        ("mean_Fy", m.fy),
        ("mean_Fm", m.fm),
        ("mean_Fr", m.fr),
        ("mean_Ft", m.ft),
        ("mean_Mz", m.mz),
        ("mean_Mx", m.mx),
        ("mean_My", m.my),
        ("mean_tau", m.tau),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let l = &summary.losses;
    let losses = [
        ("crank_bearing", l.crank_bearing_w),
        ("upper_bearing", l.upper_bearing_w),
        ("lower_bearing", l.lower_bearing_w),
        ("thrust_bearing", l.thrust_bearing_w),
        ("bearings_total", l.total_w),
        ("crank_load", l.crank_load_n),
        ("upper_load", l.upper_load_n),
        ("lower_load", l.lower_load_n),
        ("motor", summary.motor_losses_w),
        ("motor_efficiency", summary.motor_efficiency),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    RunRecord {
        t: h.theta.clone(),
        p: h.p.to_rows(),
        temperature: h.t.to_rows(),
        rho: h.rho.to_rows(),
        volume: h.v.to_rows(),
        dvolume: h.dv.to_rows(),
        heat: h.q.to_rows(),
        forces: ForcesRecord {
            series,
            means,
            f_back_n: f.f_back,
            inertial_n: f.inertial,
        },
        cvs: CvIndex {
            n: keys.len(),
            keys,
        },
        mech: mech_echo(mech),
        losses,
    }
}

fn mech_echo(mech: &MechDef) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    let journals = [
        ("upper_bearing", &mech.upper_bearing),
        ("lower_bearing", &mech.lower_bearing),
        ("crank_bearing", &mech.crank_bearing),
    ];
    for (name, j) in journals {
        out.insert(format!("{name}_diameter"), j.diameter_m);
        out.insert(format!("{name}_length"), j.length_m);
        out.insert(format!("{name}_clearance"), j.clearance_m);
    }
    out.insert("thrust_friction_coefficient".to_string(), mech.thrust_friction_coefficient);
    out.insert("thrust_inner_diameter".to_string(), mech.thrust_inner_diameter_m);
    out.insert("mu_oil".to_string(), mech.mu_oil_pa_s);
    out.insert("L_ratio_bearings".to_string(), mech.l_ratio_bearings);
    out.insert("journal_tune_factor".to_string(), mech.journal_tune_factor);
    out.insert("orbiting_scroll_mass".to_string(), mech.orbiting_mass_kg);
    out.insert("h_shell".to_string(), mech.h_shell_w_per_m2k);
    out.insert("A_shell".to_string(), mech.a_shell_m2);
    out.insert("Tamb".to_string(), mech.t_amb_k);
    out.insert("suction_fraction".to_string(), mech.suction_fraction);
    if let MotorDef::ConstantEfficiency { efficiency } = mech.motor {
        out.insert("motor_efficiency".to_string(), efficiency);
    }
    out
}

/// Runs in the store, most recent first.
pub fn list_runs(store: &RunStore) -> AppResult<Vec<RunManifest>> {
    Ok(store.list_runs()?)
}

/// Load a run by id or unique id prefix.
pub fn load_run(store: &RunStore, id_or_prefix: &str) -> AppResult<(RunManifest, RunRecord)> {
    let run_id = store.resolve(id_or_prefix)?;
    let manifest = store.load_manifest(&run_id)?;
    let record = store.load_record(&run_id)?;
    Ok((manifest, record))
}
