//! Emission of intermediate and final fields to persistence collaborators.

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where in a pipeline step an emission was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// After propagating to the mask, before applying it.
    PreMask,
    /// After multiplying by the mask's transmission.
    PostMask,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PreMask => "pre_mask",
            Stage::PostMask => "post_mask",
        }
    }
}

/// A borrowed snapshot of a source's field at one mask.
#[derive(Debug, Clone, Copy)]
pub struct Emission<'a> {
    pub source: &'a str,
    pub mask: &'a str,
    pub stage: Stage,
    pub grid: &'a Array2<Complex64>,
    /// Physical width (mm).
    pub lx: f64,
    /// Physical height (mm).
    pub ly: f64,
    /// Axial position of the field (mm).
    pub z: f64,
    /// Source wavelength (mm).
    pub wavelength: f64,
}

/// Errors reported by a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Receives every emission a pipeline produces, in chain order.
pub trait FieldSink {
    fn emit(&mut self, emission: &Emission<'_>) -> Result<(), SinkError>;
}

/// An owned copy of an [`Emission`].
#[derive(Debug, Clone)]
pub struct RecordedEmission {
    pub source: String,
    pub mask: String,
    pub stage: Stage,
    pub grid: Array2<Complex64>,
    pub lx: f64,
    pub ly: f64,
    pub z: f64,
    pub wavelength: f64,
}

impl RecordedEmission {
    pub fn as_emission(&self) -> Emission<'_> {
        Emission {
            source: &self.source,
            mask: &self.mask,
            stage: self.stage,
            grid: &self.grid,
            lx: self.lx,
            ly: self.ly,
            z: self.z,
            wavelength: self.wavelength,
        }
    }
}

/// Sink that keeps every emission in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub emissions: Vec<RecordedEmission>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the emission for a `(source, mask, stage)` triple.
    pub fn find(&self, source: &str, mask: &str, stage: Stage) -> Option<&RecordedEmission> {
        self.emissions
            .iter()
            .find(|e| e.source == source && e.mask == mask && e.stage == stage)
    }
}

impl FieldSink for RecordingSink {
    fn emit(&mut self, emission: &Emission<'_>) -> Result<(), SinkError> {
        self.emissions.push(RecordedEmission {
            source: emission.source.to_string(),
            mask: emission.mask.to_string(),
            stage: emission.stage,
            grid: emission.grid.clone(),
            lx: emission.lx,
            ly: emission.ly,
            z: emission.z,
            wavelength: emission.wavelength,
        });
        Ok(())
    }
}

/// Sink that drops everything; for runs where only final fields matter.
#[derive(Debug, Default)]
pub struct NullSink;

impl FieldSink for NullSink {
    fn emit(&mut self, _emission: &Emission<'_>) -> Result<(), SinkError> {
        Ok(())
    }
}
