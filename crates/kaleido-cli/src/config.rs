//! TOML configuration deserialisation for clone-pattern jobs.

use log::warn;
use nalgebra::Vector3;
use serde::Deserialize;

use kaleido_core::pattern::{LinearPattern, MirrorPattern, RadialPattern};
use kaleido_core::{ClonePattern, PatternError, PatternGeometry, PatternKind};
use kaleido_geometry::RigidPlacement;

use crate::elements::{ElementKind, PartElement};

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub pattern: PatternConfig,
    #[serde(default)]
    pub element: Vec<ElementConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Pattern parameters from TOML.
///
/// Only the parameters of the selected kind are used. Missing ones take the
/// kind's defaults.
#[derive(Debug, Deserialize)]
pub struct PatternConfig {
    /// "mirror", "linear" or "radial" (any case).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub origin: Option<[f64; 3]>,
    /// Mirror plane normal.
    #[serde(default)]
    pub normal: Option<[f64; 3]>,
    /// Linear step direction.
    #[serde(default)]
    pub direction: Option<[f64; 3]>,
    #[serde(default)]
    pub spacing: Option<f64>,
    /// Radial rotation axis.
    #[serde(default)]
    pub axis: Option<[f64; 3]>,
    /// Radial step in degrees.
    #[serde(default)]
    pub angle: Option<f64>,
    /// Instances per element, seed included. Defaults to the pattern's own
    /// count.
    #[serde(default)]
    pub count: Option<usize>,
}

impl PatternConfig {
    pub fn kind(&self) -> Result<PatternKind, PatternError> {
        self.kind.parse()
    }

    /// Build the configured pattern.
    pub fn build(&self) -> Result<ClonePattern, PatternError> {
        let kind = self.kind()?;
        let origin = vector_or(self.origin, Vector3::zeros());

        let pattern = match kind {
            PatternKind::Mirror => {
                self.warn_unused(
                    kind,
                    &[
                        ("direction", self.direction.is_some()),
                        ("spacing", self.spacing.is_some()),
                        ("axis", self.axis.is_some()),
                        ("angle", self.angle.is_some()),
                    ],
                );
                MirrorPattern::new(origin, vector_or(self.normal, Vector3::z())).into()
            }
            PatternKind::Linear => {
                self.warn_unused(
                    kind,
                    &[
                        ("normal", self.normal.is_some()),
                        ("axis", self.axis.is_some()),
                        ("angle", self.angle.is_some()),
                    ],
                );
                let defaults = LinearPattern::default();
                LinearPattern::new(
                    origin,
                    vector_or(self.direction, defaults.direction()),
                    self.spacing.unwrap_or(defaults.spacing()),
                )
                .into()
            }
            PatternKind::Radial => {
                self.warn_unused(
                    kind,
                    &[
                        ("normal", self.normal.is_some()),
                        ("direction", self.direction.is_some()),
                        ("spacing", self.spacing.is_some()),
                    ],
                );
                let defaults = RadialPattern::default();
                RadialPattern::new(
                    origin,
                    vector_or(self.axis, Vector3::z()),
                    self.angle.unwrap_or(defaults.angle()),
                )
                .into()
            }
        };
        Ok(pattern)
    }

    /// Number of instances to generate for each element.
    pub fn instance_count(&self, pattern: &ClonePattern) -> usize {
        self.count.unwrap_or_else(|| pattern.default_instance_count())
    }

    fn warn_unused(&self, kind: PatternKind, keys: &[(&str, bool)]) {
        for (key, present) in keys {
            if *present {
                warn!("Ignoring '{}': not a parameter of {} patterns", key, kind);
            }
        }
    }
}

fn vector_or(value: Option<[f64; 3]>, default: Vector3<f64>) -> Vector3<f64> {
    value.map(Vector3::from).unwrap_or(default)
}

/// A single seed element in the job.
#[derive(Debug, Deserialize)]
pub struct ElementConfig {
    pub name: String,
    /// Kind tag and kind-specific fields.
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(default)]
    pub position: [f64; 3],
    /// Euler angles in degrees.
    #[serde(default)]
    pub rotation: [f64; 3],
}

impl ElementConfig {
    pub fn to_element(&self) -> PartElement {
        PartElement::new(
            self.name.clone(),
            self.kind.clone(),
            RigidPlacement {
                position: self.position,
                rotation: self.rotation,
            },
        )
    }
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save instances as JSON (default: true).
    #[serde(default = "default_true")]
    pub save_json: bool,
    /// Whether to save instances as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_csv: bool,
    /// Whether to save the pattern node as XML (default: false).
    #[serde(default)]
    pub save_xml: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_json: true,
            save_csv: true,
            save_xml: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Parse a TOML job configuration.
pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    Ok(config)
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}
