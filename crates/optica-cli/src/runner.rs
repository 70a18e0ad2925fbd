//! Simulation runner: ties together netlist, mesh, pipeline and output files.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::debug;
use ndarray::Array2;
use num_complex::Complex64;
use serde::Serialize;

use optica_compute::{ComputeError, CpuBackend, FftBackend};
use optica_core::fields::{intensity, phase, total_power};
use optica_core::{
    BackwardPolicy, Emission, FieldSink, OpticalPlane, SinkError, Simulation, SourceOutcome,
    StepReport,
};

use crate::config::JobConfig;

/// Results from a simulation run.
pub struct SimulationOutput {
    pub outcomes: Vec<SourceOutcome>,
    /// Number of intermediate field files written.
    pub emissions_written: usize,
}

/// Parse the netlist and build optical planes, reporting anything skipped.
pub fn load_planes(path: &Path) -> Result<Vec<OpticalPlane>> {
    let netlist = optica_netlist::parse_file(path)
        .with_context(|| format!("Cannot read netlist {}", path.display()))?;
    for diagnostic in &netlist.diagnostics {
        eprintln!("Warning: {}", diagnostic);
    }

    let (planes, failures) = netlist.to_planes();
    for failure in &failures {
        eprintln!("Warning: skipping '{}': {}", failure.identity, failure.error);
    }

    println!(
        "Netlist: {} sources, {} masks ({} lines skipped, {} elements rejected)",
        netlist.sources.len(),
        netlist.masks.len(),
        netlist.diagnostics.len(),
        failures.len()
    );
    Ok(planes)
}

/// Resolve the netlist path: CLI override first, then the config entry
/// (relative to the configuration file's directory).
pub fn resolve_netlist(job: &JobConfig, config_path: &Path, cli: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli {
        return Ok(path.to_path_buf());
    }
    let entry = job
        .netlist
        .as_ref()
        .context("No netlist given: pass --netlist or set `netlist` in the configuration")?;
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let path = base.join(entry);
    debug!("Netlist resolved to {}", path.display());
    Ok(path)
}

/// Build a configured simulation from a job and its planes.
pub fn build_simulation(job: &JobConfig, planes: Vec<OpticalPlane>) -> Result<Simulation> {
    let mesh = job.mesh.build()?;
    let backend = create_backend(&job.simulation.backend, job.simulation.threads)?;
    let policy = parse_backward_policy(&job.simulation.backward)?;
    Ok(Simulation::new(mesh, planes)
        .with_backend(backend)
        .with_backward_policy(policy))
}

/// Run a full simulation, writing outputs under `out_dir`.
pub fn run_simulation(
    job: &JobConfig,
    planes: Vec<OpticalPlane>,
    out_dir: &Path,
) -> Result<SimulationOutput> {
    let sim = build_simulation(job, planes)?;
    let mesh = sim.mesh();
    let (dx, dy) = mesh.pitch();
    println!(
        "Mesh: {}x{} samples over {:.3}x{:.3} mm (pitch {:.4}x{:.4} mm)",
        mesh.nx(),
        mesh.ny(),
        mesh.lx(),
        mesh.ly(),
        dx,
        dy
    );
    if sim.sources().is_empty() {
        anyhow::bail!("No sources in netlist, nothing to propagate");
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Cannot create output directory {}", out_dir.display()))?;

    let mut sink = CsvSink {
        directory: out_dir.to_path_buf(),
        enabled: job.output.save_intermediate,
        written: 0,
    };
    let outcomes = if job.simulation.parallel {
        sim.run_parallel(&mut sink)
    } else {
        sim.run(&mut sink)
    };

    for (i, outcome) in outcomes.iter().enumerate() {
        match &outcome.field {
            Ok(field) => {
                println!(
                    "  [{}/{}] {} (λ={:.1} nm): z={:.3} mm, {} steps, P={:.4e}",
                    i + 1,
                    outcomes.len(),
                    outcome.identity,
                    outcome.wavelength * 1e6,
                    field.z,
                    outcome.steps.len(),
                    total_power(&field.values, field.lx, field.ly)
                );
                if job.output.save_final {
                    let path = out_dir.join(format!("{}_final.csv", file_stem(&outcome.identity)));
                    write_field_csv(
                        &path,
                        &field.values,
                        &FieldMetadata {
                            title: format!("{} final field", outcome.identity),
                            lx: field.lx,
                            ly: field.ly,
                            z: field.z,
                            wavelength: field.wavelength,
                        },
                    )?;
                }
            }
            Err(e) => eprintln!(
                "  [{}/{}] {}: aborted after {} steps: {}",
                i + 1,
                outcomes.len(),
                outcome.identity,
                outcome.steps.len(),
                e
            ),
        }
    }

    if job.output.save_json {
        write_summary_json(&sim, &outcomes, &out_dir.join("summary.json"))?;
    }

    Ok(SimulationOutput {
        outcomes,
        emissions_written: sink.written,
    })
}

fn parse_backward_policy(text: &str) -> Result<BackwardPolicy> {
    match text {
        "skip" => Ok(BackwardPolicy::Skip),
        "propagate" => Ok(BackwardPolicy::Propagate),
        "reject" => Ok(BackwardPolicy::Reject),
        other => anyhow::bail!(
            "Unknown backward policy '{}'. Valid values: skip, propagate, reject",
            other
        ),
    }
}

/// Create an FFT backend from the user's preference string.
fn create_backend(preference: &str, threads: Option<usize>) -> Result<Arc<dyn FftBackend>> {
    match preference {
        "cpu" | "auto" => {
            let cpu = match threads {
                Some(n) => CpuBackend::with_threads(n)?,
                None => CpuBackend::new(),
            };
            let info = cpu.device_info();
            println!("Backend: {}", info.name);
            if let Some(units) = info.compute_units {
                debug!("FFT passes split across {} compute units", units);
            }
            Ok(Arc::new(cpu))
        }
        other => Err(ComputeError::Unavailable(format!(
            "'{}' (valid backends: auto, cpu)",
            other
        ))
        .into()),
    }
}

/// Writes each emission as a CSV file named `<source>_<mask>_<stage>.csv`.
struct CsvSink {
    directory: PathBuf,
    enabled: bool,
    written: usize,
}

impl FieldSink for CsvSink {
    fn emit(&mut self, emission: &Emission<'_>) -> Result<(), SinkError> {
        if !self.enabled {
            return Ok(());
        }
        let name = format!(
            "{}_{}_{}.csv",
            file_stem(emission.source),
            file_stem(emission.mask),
            emission.stage.as_str()
        );
        let meta = FieldMetadata {
            title: format!(
                "{} at {} ({})",
                emission.source,
                emission.mask,
                emission.stage.as_str()
            ),
            lx: emission.lx,
            ly: emission.ly,
            z: emission.z,
            wavelength: emission.wavelength,
        };
        write_field_csv(&self.directory.join(name), emission.grid, &meta)
            .map_err(|e| SinkError::Other(e.to_string()))?;
        self.written += 1;
        Ok(())
    }
}

/// Reduce an element identity to a safe file-name component.
///
/// Anything outside `[A-Za-z0-9_-]` becomes `_`, so identities can never
/// name a path outside the output directory.
fn file_stem(identity: &str) -> String {
    identity
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Header information written above a field's samples.
pub struct FieldMetadata {
    pub title: String,
    pub lx: f64,
    pub ly: f64,
    pub z: f64,
    pub wavelength: f64,
}

/// Write a complex field to CSV with a metadata header.
///
/// Columns: `x_mm,y_mm,re,im,intensity,phase`, one row per sample in
/// row-major order, coordinates on the centred mesh.
pub fn write_field_csv(path: &Path, grid: &Array2<Complex64>, meta: &FieldMetadata) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    let mut out = std::io::BufWriter::new(file);

    let (rows, cols) = grid.dim();
    let dx = meta.lx / cols as f64;
    let dy = meta.ly / rows as f64;

    writeln!(out, "# Optica: {}", meta.title)?;
    writeln!(out, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "# Grid: {}x{} (cols x rows)", cols, rows)?;
    writeln!(out, "# Lx: {} mm, Ly: {} mm", meta.lx, meta.ly)?;
    writeln!(out, "# z: {} mm", meta.z)?;
    writeln!(out, "# wavelength: {} mm", meta.wavelength)?;
    writeln!(out, "#")?;
    writeln!(out, "x_mm,y_mm,re,im,intensity,phase")?;

    let intensity = intensity(grid);
    let phase = phase(grid);
    for ((i, j), v) in grid.indexed_iter() {
        let x = (j as f64 - (cols / 2) as f64) * dx;
        let y = (i as f64 - (rows / 2) as f64) * dy;
        writeln!(
            out,
            "{:.6},{:.6},{:.6e},{:.6e},{:.6e},{:.6}",
            x,
            y,
            v.re,
            v.im,
            intensity[[i, j]],
            phase[[i, j]]
        )?;
    }
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct RunSummary<'a> {
    version: &'static str,
    nx: usize,
    ny: usize,
    lx_mm: f64,
    ly_mm: f64,
    dx_mm: f64,
    dy_mm: f64,
    backward_policy: BackwardPolicy,
    sources: Vec<SourceSummary<'a>>,
}

#[derive(Serialize)]
struct SourceSummary<'a> {
    identity: &'a str,
    wavelength_mm: f64,
    status: String,
    final_z_mm: Option<f64>,
    final_power: Option<f64>,
    steps: &'a [StepReport],
}

/// Write a JSON summary of every source's chain.
pub fn write_summary_json(sim: &Simulation, outcomes: &[SourceOutcome], path: &Path) -> Result<()> {
    let mesh = sim.mesh();
    let (dx_mm, dy_mm) = mesh.pitch();
    let summary = RunSummary {
        version: env!("CARGO_PKG_VERSION"),
        nx: mesh.nx(),
        ny: mesh.ny(),
        lx_mm: mesh.lx(),
        ly_mm: mesh.ly(),
        dx_mm,
        dy_mm,
        backward_policy: sim.backward_policy(),
        sources: outcomes
            .iter()
            .map(|o| SourceSummary {
                identity: &o.identity,
                wavelength_mm: o.wavelength,
                status: match &o.field {
                    Ok(_) => "ok".into(),
                    Err(e) => e.to_string(),
                },
                final_z_mm: o.field.as_ref().ok().map(|f| f.z),
                final_power: o
                    .field
                    .as_ref()
                    .ok()
                    .map(|f| total_power(&f.values, f.lx, f.ly)),
                steps: &o.steps,
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;
    println!("Summary (JSON) written to: {}", path.display());
    Ok(())
}
