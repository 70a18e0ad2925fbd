//! # Optica Core
//!
//! The numerical backbone of the Optica framework: monochromatic scalar-wave
//! propagation along a single optical axis using Fourier optics.
//!
//! ## Architecture
//!
//! A simulation is a list of [`plane::OpticalPlane`]s located along `z`.
//! Sources inject a field; masks multiply it. The [`pipeline::Simulation`]
//! samples every plane onto a shared [`mesh::Mesh`], then walks each source
//! through the masks in ascending `z`, advancing the field between them with
//! the [`propagation::FresnelPropagator`].
//!
//! ## Modules
//!
//! - [`profile`]: Parameterised capability functions (Gaussian, lens, apertures).
//! - [`plane`]: Optical planes, value sources and the propagating [`plane::Field`].
//! - [`mesh`]: The shared coordinate mesh.
//! - [`sampler`]: Materialises planes onto the mesh.
//! - [`propagation`]: Fresnel transfer-function propagation.
//! - [`pipeline`]: Orchestration of sources through masks.
//! - [`emission`]: Sink interface for intermediate and final fields.
//! - [`fields`]: Derived quantities (power, intensity, phase).

pub mod emission;
pub mod fields;
pub mod mesh;
pub mod pipeline;
pub mod plane;
pub mod profile;
pub mod propagation;
pub mod sampler;

pub use emission::{Emission, FieldSink, NullSink, RecordedEmission, RecordingSink, SinkError, Stage};
pub use mesh::Mesh;
pub use pipeline::{BackwardPolicy, PipelineError, Simulation, SourceOutcome, StepReport};
pub use plane::{Field, OpticalPlane, PlaneBuilder, PlaneError, PlaneRole, ValueSource};
pub use profile::Profile;
pub use propagation::{FresnelPropagator, Propagated, PropagationError};
