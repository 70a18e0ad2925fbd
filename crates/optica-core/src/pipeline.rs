//! The simulation pipeline: sources walked through masks in ascending `z`.
//!
//! For each source the pipeline samples the initial field on the shared mesh,
//! then for every mask in order: samples the mask at the source's wavelength,
//! propagates the field by `mask.z - field.z`, emits the pre-mask field,
//! multiplies by the mask (unless it is pass-through) and emits the
//! post-mask field. Masks whose transmission does not depend on wavelength
//! are sampled once and shared by all sources. Sources are independent of
//! each other; a failure aborts only the chain it happened in.

use std::sync::Arc;

use log::{debug, info, warn};
use ndarray::Array2;
use num_complex::Complex64;
use optica_compute::FftBackend;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emission::{Emission, FieldSink, RecordingSink, SinkError, Stage};
use crate::mesh::Mesh;
use crate::plane::{Field, OpticalPlane, PlaneError};
use crate::propagation::{FresnelPropagator, PropagationError};
use crate::sampler;

/// What to do when a mask lies behind the field's current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackwardPolicy {
    /// Leave the field where it is and still apply the mask.
    #[default]
    Skip,
    /// Propagate backwards with the same transfer function.
    Propagate,
    /// Abort the source's chain.
    Reject,
}

/// Errors that abort one source's propagation chain.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Plane '{plane}': {error}")]
    Plane {
        plane: String,
        #[source]
        error: PlaneError,
    },

    #[error("Propagation to '{mask}' failed: {error}")]
    Propagation {
        mask: String,
        #[source]
        error: PropagationError,
    },

    #[error("Source '{0}' produced no field")]
    NoSourceField(String),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Record of one mask step in a source's chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Identity of the mask.
    pub mask: String,
    /// Axial position of the mask (mm).
    pub z: f64,
    /// Requested distance `mask.z - field.z` (mm).
    pub delta: f64,
    /// Sampling diagnostic for the step; zero when nothing was propagated.
    pub oversampling_ratio: f64,
    /// Whether a propagation was actually performed.
    pub propagated: bool,
    /// Whether the mask's transmission was multiplied in.
    pub applied_mask: bool,
}

impl StepReport {
    /// Number of emissions the step produced: the pre-mask field, plus the
    /// post-mask field when a transmission was applied.
    pub fn emissions(&self) -> usize {
        if self.applied_mask {
            2
        } else {
            1
        }
    }
}

/// Result of running one source through the masks.
#[derive(Debug)]
pub struct SourceOutcome {
    pub identity: String,
    /// Wavelength (mm).
    pub wavelength: f64,
    /// Steps completed before the chain ended or aborted.
    pub steps: Vec<StepReport>,
    /// The final field, or the error that aborted the chain.
    pub field: Result<Field, PipelineError>,
}

impl SourceOutcome {
    pub fn is_ok(&self) -> bool {
        self.field.is_ok()
    }
}

/// A configured run: shared mesh, sources, masks and propagation policy.
pub struct Simulation {
    mesh: Mesh,
    sources: Vec<OpticalPlane>,
    masks: Vec<OpticalPlane>,
    /// Transmission grids of wavelength-independent masks, sampled once and
    /// shared by every source. Parallel to `masks`.
    mask_grids: Vec<Option<Array2<Complex64>>>,
    propagator: FresnelPropagator,
    backward: BackwardPolicy,
}

impl Simulation {
    /// Split `planes` into sources and masks and order both by ascending `z`.
    ///
    /// The sort is stable, so planes sharing a `z` keep their input order.
    pub fn new(mesh: Mesh, planes: impl IntoIterator<Item = OpticalPlane>) -> Self {
        let (mut sources, mut masks): (Vec<_>, Vec<_>) =
            planes.into_iter().partition(OpticalPlane::is_source);
        sources.sort_by(|a, b| a.z().total_cmp(&b.z()));
        masks.sort_by(|a, b| a.z().total_cmp(&b.z()));
        let mask_grids = masks.iter().map(|m| presample(m, &mesh)).collect();

        Self {
            mesh,
            sources,
            masks,
            mask_grids,
            propagator: FresnelPropagator::default(),
            backward: BackwardPolicy::default(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn FftBackend>) -> Self {
        self.propagator = FresnelPropagator::new(backend);
        self
    }

    pub fn with_backward_policy(mut self, policy: BackwardPolicy) -> Self {
        self.backward = policy;
        self
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Sources in ascending `z`.
    pub fn sources(&self) -> &[OpticalPlane] {
        &self.sources
    }

    /// Masks in ascending `z`.
    pub fn masks(&self) -> &[OpticalPlane] {
        &self.masks
    }

    pub fn backward_policy(&self) -> BackwardPolicy {
        self.backward
    }

    /// Run every source in turn, emitting to `sink` as the chains progress.
    pub fn run(&self, sink: &mut dyn FieldSink) -> Vec<SourceOutcome> {
        self.sources
            .iter()
            .map(|source| self.run_source(source, sink))
            .collect()
    }

    /// Run sources concurrently on the Rayon pool.
    ///
    /// Each chain buffers its emissions; they are replayed into `sink` in
    /// source order once all chains have finished, so the sink sees the same
    /// sequence as with [`Simulation::run`].
    pub fn run_parallel(&self, sink: &mut dyn FieldSink) -> Vec<SourceOutcome> {
        let chains: Vec<(SourceOutcome, RecordingSink)> = self
            .sources
            .par_iter()
            .map(|source| {
                let mut recorder = RecordingSink::new();
                let outcome = self.run_source(source, &mut recorder);
                (outcome, recorder)
            })
            .collect();

        chains
            .into_iter()
            .map(|(mut outcome, recorder)| {
                for (delivered, recorded) in recorder.emissions.iter().enumerate() {
                    if let Err(e) = sink.emit(&recorded.as_emission()) {
                        warn!("Source '{}': sink rejected emission: {}", outcome.identity, e);
                        outcome.steps.truncate(steps_delivered(&outcome.steps, delivered));
                        outcome.field = Err(PipelineError::Sink(e));
                        break;
                    }
                }
                outcome
            })
            .collect()
    }

    fn run_source(&self, source: &OpticalPlane, sink: &mut dyn FieldSink) -> SourceOutcome {
        let wavelength = source.wavelength().unwrap_or_default();
        let mut steps = Vec::with_capacity(self.masks.len());
        let field = self.propagate_chain(source, wavelength, sink, &mut steps);

        match &field {
            Ok(f) => info!(
                "Source '{}' finished at z={:.4} mm after {} steps",
                f.identity,
                f.z,
                steps.len()
            ),
            Err(e) => warn!("Source '{}' aborted: {}", source.identity(), e),
        }

        SourceOutcome {
            identity: source.identity().to_string(),
            wavelength,
            steps,
            field,
        }
    }

    fn propagate_chain(
        &self,
        source: &OpticalPlane,
        wavelength: f64,
        sink: &mut dyn FieldSink,
        steps: &mut Vec<StepReport>,
    ) -> Result<Field, PipelineError> {
        let values = sampler::sample(source, &self.mesh, wavelength)
            .map_err(|error| PipelineError::Plane {
                plane: source.identity().to_string(),
                error,
            })?
            .ok_or_else(|| PipelineError::NoSourceField(source.identity().to_string()))?;

        let mut field = Field {
            identity: source.identity().to_string(),
            z: source.z(),
            wavelength,
            lx: self.mesh.lx(),
            ly: self.mesh.ly(),
            values,
        };
        info!(
            "Source '{}': λ={:.3e} mm, z={:.4} mm, {} masks",
            field.identity,
            wavelength,
            field.z,
            self.masks.len()
        );

        for (mask, cached) in self.masks.iter().zip(&self.mask_grids) {
            let report = self.step(&mut field, mask, cached.as_ref(), sink)?;
            steps.push(report);
        }

        Ok(field)
    }

    fn step(
        &self,
        field: &mut Field,
        mask: &OpticalPlane,
        cached: Option<&Array2<Complex64>>,
        sink: &mut dyn FieldSink,
    ) -> Result<StepReport, PipelineError> {
        let sampled = match cached {
            Some(_) => None,
            None => sampler::sample(mask, &self.mesh, field.wavelength).map_err(|error| {
                PipelineError::Plane {
                    plane: mask.identity().to_string(),
                    error,
                }
            })?,
        };
        let transmission = cached.or(sampled.as_ref());
        let propagation_error = |error| PipelineError::Propagation {
            mask: mask.identity().to_string(),
            error,
        };

        let delta = mask.z() - field.z;
        let (oversampling_ratio, propagated) = if delta > 0.0 {
            let ratio = field
                .fresnel_propagate(&self.propagator, delta)
                .map_err(propagation_error)?;
            (ratio, true)
        } else if delta < 0.0 {
            match self.backward {
                BackwardPolicy::Skip => {
                    warn!(
                        "Source '{}': mask '{}' is {:.4} mm behind the field, not propagating",
                        field.identity,
                        mask.identity(),
                        -delta
                    );
                    (0.0, false)
                }
                BackwardPolicy::Propagate => {
                    let ratio = field
                        .fresnel_propagate_signed(&self.propagator, delta)
                        .map_err(propagation_error)?;
                    (ratio, true)
                }
                BackwardPolicy::Reject => {
                    return Err(propagation_error(PropagationError::BackwardPropagation {
                        distance: delta,
                    }))
                }
            }
        } else {
            (0.0, false)
        };

        debug!(
            "Source '{}' -> '{}': Δz={:.4} mm, oversampling ratio {:.3}",
            field.identity,
            mask.identity(),
            delta,
            oversampling_ratio
        );

        emit(sink, field, mask, Stage::PreMask)?;

        let applied_mask = match transmission {
            Some(t) => {
                field.apply_mask(t).map_err(|error| PipelineError::Plane {
                    plane: mask.identity().to_string(),
                    error,
                })?;
                emit(sink, field, mask, Stage::PostMask)?;
                true
            }
            None => false,
        };

        Ok(StepReport {
            mask: mask.identity().to_string(),
            z: mask.z(),
            delta,
            oversampling_ratio,
            propagated,
            applied_mask,
        })
    }
}

/// Sample a mask once for all sources when its transmission cannot depend
/// on wavelength. Masks that fail to sample are left to the per-source path,
/// which reports the error against each chain.
fn presample(mask: &OpticalPlane, mesh: &Mesh) -> Option<Array2<Complex64>> {
    if mask.is_dispersive() || mask.is_pass_through() {
        return None;
    }
    // Any positive wavelength; the profiles ignore it.
    match sampler::sample(mask, mesh, 1.0) {
        Ok(grid) => grid,
        Err(e) => {
            debug!("Mask '{}' not cached: {}", mask.identity(), e);
            None
        }
    }
}

/// How many leading steps had every one of their emissions delivered, given
/// that the first `delivered` emissions reached the sink.
fn steps_delivered(steps: &[StepReport], delivered: usize) -> usize {
    let mut remaining = delivered;
    steps
        .iter()
        .take_while(|step| {
            let needed = step.emissions();
            if needed <= remaining {
                remaining -= needed;
                true
            } else {
                false
            }
        })
        .count()
}

fn emit(
    sink: &mut dyn FieldSink,
    field: &Field,
    mask: &OpticalPlane,
    stage: Stage,
) -> Result<(), SinkError> {
    sink.emit(&Emission {
        source: &field.identity,
        mask: mask.identity(),
        stage,
        grid: &field.values,
        lx: field.lx,
        ly: field.ly,
        z: field.z,
        wavelength: field.wavelength,
    })
}
