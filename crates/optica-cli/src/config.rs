//! TOML configuration deserialisation for simulation jobs.

use std::path::Path;

use anyhow::Context;
use optica_core::Mesh;
use serde::Deserialize;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    /// Netlist path, relative to the configuration file. The CLI may override it.
    pub netlist: Option<String>,
    pub mesh: MeshConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Sampling grid shared by every plane.
#[derive(Debug, Deserialize)]
pub struct MeshConfig {
    /// Number of columns.
    pub nx: usize,
    /// Number of rows (default: `nx`).
    pub ny: Option<usize>,
    /// Physical width in mm.
    pub lx: f64,
    /// Physical height in mm (default: `lx`).
    pub ly: Option<f64>,
}

impl MeshConfig {
    pub fn build(&self) -> anyhow::Result<Mesh> {
        let ny = self.ny.unwrap_or(self.nx);
        let ly = self.ly.unwrap_or(self.lx);
        Mesh::new(self.nx, ny, self.lx, ly).context("Invalid [mesh] section")
    }
}

/// Simulation parameters from TOML.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Masks behind the field: "skip", "propagate" or "reject". Default: "skip".
    #[serde(default = "default_backward")]
    pub backward: String,
    /// Process sources concurrently. Default: true.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// FFT backend: "auto" or "cpu". Default: "auto".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Worker threads for the FFT backend (default: the global Rayon pool).
    pub threads: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            backward: default_backward(),
            parallel: true,
            backend: default_backend(),
            threads: None,
        }
    }
}

fn default_backward() -> String {
    "skip".into()
}

fn default_backend() -> String {
    "auto".into()
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Write every pre- and post-mask field as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_intermediate: bool,
    /// Write the final field of each source as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_final: bool,
    /// Also write a JSON run summary (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_intermediate: true,
            save_final: true,
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read configuration {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid configuration {}", path.display()))
}

pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let job = parse_config("[mesh]\nnx = 64\nlx = 5.0\n").unwrap();
        assert!(job.netlist.is_none());
        assert_eq!(job.simulation.backward, "skip");
        assert!(job.simulation.parallel);
        assert_eq!(job.simulation.threads, None);
        assert_eq!(job.output.directory, "./output");
        assert!(job.output.save_intermediate);
        assert!(!job.output.save_json);

        let mesh = job.mesh.build().unwrap();
        assert_eq!(mesh.shape(), (64, 64));
        assert_eq!(mesh.ly(), 5.0);
    }

    #[test]
    fn test_full_config() {
        let job = parse_config(
            r#"
netlist = "beam.txt"

[mesh]
nx = 128
ny = 64
lx = 10.0
ly = 5.0

[simulation]
backward = "propagate"
parallel = false
threads = 4

[output]
directory = "out"
save_json = true
"#,
        )
        .unwrap();
        assert_eq!(job.netlist.as_deref(), Some("beam.txt"));
        assert_eq!(job.mesh.build().unwrap().shape(), (64, 128));
        assert_eq!(job.simulation.backward, "propagate");
        assert!(!job.simulation.parallel);
        assert_eq!(job.simulation.threads, Some(4));
        assert!(job.output.save_json);
    }

    #[test]
    fn test_missing_mesh_is_an_error() {
        assert!(parse_config("netlist = \"a.txt\"\n").is_err());
    }

    #[test]
    fn test_invalid_mesh_extent() {
        let job = parse_config("[mesh]\nnx = 8\nlx = -1.0\n").unwrap();
        assert!(job.mesh.build().is_err());
    }
}
