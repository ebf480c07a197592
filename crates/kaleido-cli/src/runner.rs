//! Job runner: builds the pattern, clones every seed element, writes results.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use nalgebra::Vector3;
use serde::Serialize;

use kaleido_core::persist::{AttributeValue, ParameterNode};
use kaleido_core::{
    clone_pattern_into, ClonePattern, ClonedInstance, PatternError, PatternGeometry, PatternKind,
};
use kaleido_core::pattern::MAX_INSTANCES;
use kaleido_geometry::RigidPlacement;

use crate::config::JobConfig;
use crate::elements::PartElement;

/// Results from a job run.
pub struct RunOutput {
    pub pattern: ClonePattern,
    /// Instances generated per element, seed included.
    pub count: usize,
    pub instances: Vec<ClonedInstance<PartElement>>,
    /// Elements left out, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// One row of the written results.
#[derive(Debug, Serialize)]
pub struct InstanceRecord {
    pub element: String,
    pub kind: String,
    pub detail: String,
    pub index: usize,
    pub seed: bool,
    pub placement: RigidPlacement,
}

impl From<&ClonedInstance<PartElement>> for InstanceRecord {
    fn from(instance: &ClonedInstance<PartElement>) -> Self {
        Self {
            element: instance.payload.name.clone(),
            kind: instance.payload.kind.label().to_owned(),
            detail: instance.payload.kind.detail(),
            index: instance.index,
            seed: instance.is_seed(),
            placement: instance.placement.clone(),
        }
    }
}

#[derive(Serialize)]
struct InstanceDocument<'a> {
    pattern: PatternKind,
    count: usize,
    instances: &'a [InstanceRecord],
}

/// Run a full job from a parsed configuration.
///
/// Elements that cannot be duplicated are skipped and reported; any other
/// cloning failure aborts the run.
pub fn run_job(job: &JobConfig) -> Result<RunOutput> {
    let pattern = job.pattern.build().context("Invalid pattern configuration")?;
    let count = job.pattern.instance_count(&pattern);
    if !(1..=MAX_INSTANCES).contains(&count) {
        bail!("Pattern count must be between 1 and {} (got {})", MAX_INSTANCES, count);
    }

    println!(
        "  Pattern: {} (origin {:?}, axis {:?}), {} instances per element",
        pattern.kind(),
        pattern.origin().as_slice(),
        pattern.axis().as_slice(),
        count
    );

    let mut instances = Vec::new();
    let mut skipped = Vec::new();

    for config in &job.element {
        let seed = Arc::new(config.to_element());
        match clone_pattern_into(&seed, &pattern, count, &mut instances) {
            Ok(added) => {
                println!("  Element {}: {} instances", seed, added);
            }
            Err(PatternError::PayloadNotClonable { element }) => {
                warn!("Skipping {}: it cannot be duplicated", element);
                println!("  Element {}: skipped (not clonable)", seed);
                skipped.push((config.name.clone(), "not clonable".to_owned()));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to clone element '{}'", config.name));
            }
        }
    }

    debug!("Generated {} instances, skipped {}", instances.len(), skipped.len());

    Ok(RunOutput {
        pattern,
        count,
        instances,
        skipped,
    })
}

/// Snap the job's pattern onto an authored frame.
pub fn quantize_pattern(job: &JobConfig, authored: &RigidPlacement) -> Result<ClonePattern> {
    let mut pattern = job.pattern.build().context("Invalid pattern configuration")?;
    pattern.snap_to(&authored.to_matrix());
    Ok(pattern)
}

/// Parse an `x,y,z` command-line vector.
pub fn parse_vector(text: &str) -> std::result::Result<Vector3<f64>, String> {
    Vector3::<f64>::parse_attribute(text)
        .ok_or_else(|| format!("expected three comma-separated numbers, got '{}'", text))
}

/// Default parameter node for every supported pattern kind.
pub fn pattern_catalogue() -> Vec<ParameterNode> {
    PatternKind::ALL
        .into_iter()
        .map(|kind| ClonePattern::with_defaults(kind).serialize_parameters())
        .collect()
}

/// Write instances to a JSON file.
pub fn write_instances_json(output: &RunOutput, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let records: Vec<InstanceRecord> = output.instances.iter().map(InstanceRecord::from).collect();
    let document = InstanceDocument {
        pattern: output.pattern.kind(),
        count: output.count,
        instances: &records,
    };
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Instances (JSON) written to: {}", path.display());
    Ok(())
}

/// Quote a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\"")).into()
    } else {
        value.into()
    }
}

/// Fixed-point CSV number; negative zero is written as zero.
fn csv_number(value: f64) -> String {
    let text = format!("{:.6}", value);
    match text.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_owned(),
        _ => text,
    }
}

/// Write instances to a CSV file.
pub fn write_instances_csv(output: &RunOutput, path: &Path) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    writeln!(file, "# Kaleido clone pattern instances")?;
    writeln!(file, "# Pattern: {}", output.pattern.kind())?;
    writeln!(file, "# Instances per element: {}", output.count)?;
    writeln!(file, "#")?;
    writeln!(file, "element,kind,detail,index,x,y,z,rx_deg,ry_deg,rz_deg")?;

    for instance in &output.instances {
        let record = InstanceRecord::from(instance);
        let numbers: Vec<String> = record
            .placement
            .position
            .iter()
            .chain(record.placement.rotation.iter())
            .map(|v| csv_number(*v))
            .collect();
        writeln!(
            file,
            "{},{},{},{},{}",
            csv_field(&record.element),
            csv_field(&record.kind),
            csv_field(&record.detail),
            record.index,
            numbers.join(",")
        )?;
    }

    println!("Instances (CSV) written to: {}", path.display());
    Ok(())
}

/// Write the pattern parameter node as XML.
pub fn write_pattern_xml(pattern: &ClonePattern, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let xml = pattern.to_xml().context("Failed to serialise pattern")?;
    std::fs::write(path, xml)?;

    println!("Pattern (XML) written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use approx::assert_relative_eq;

    const JOB: &str = r#"
[pattern]
type = "mirror"

[[element]]
name = "stud"
kind = "connection"
position = [5.0, 0.0, 2.0]

[[element]]
name = "skin"
kind = "surface"
position = [1.0, 1.0, 1.0]
"#;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("kaleido-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_run_mirrors_and_skips_surface() {
        let job = parse_config(JOB).unwrap();
        let output = run_job(&job).unwrap();

        assert_eq!(output.count, 2);
        assert_eq!(output.instances.len(), 2);
        assert_eq!(output.skipped, vec![("skin".to_owned(), "not clonable".to_owned())]);
        assert!(output.instances[0].is_seed());
        assert_relative_eq!(
            output.instances[1].placement.position(),
            Vector3::new(5.0, 0.0, -2.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_zero_count_aborts() {
        let job = parse_config("[pattern]\ntype = \"linear\"\ncount = 0\n").unwrap();
        assert!(run_job(&job).is_err());
    }

    #[test]
    fn test_tiny_radial_angle_is_capped() {
        let job = parse_config("[pattern]\ntype = \"radial\"\nangle = 1e-8\n").unwrap();
        let output = run_job(&job).unwrap();
        assert_eq!(output.count, MAX_INSTANCES);

        let job = parse_config("[pattern]\ntype = \"linear\"\ncount = 1000000\n").unwrap();
        assert!(run_job(&job).is_err());
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("stud"), "stud");
        assert_eq!(csv_field("stud, left"), "\"stud, left\"");
        assert_eq!(csv_field("6\" plate"), "\"6\"\" plate\"");
        assert_eq!(csv_number(-0.0000001), "0.000000");
        assert_eq!(csv_number(-2.0), "-2.000000");
    }

    #[test]
    fn test_csv_keeps_columns_with_commas_in_names() {
        let job = parse_config(
            r#"
[pattern]
type = "mirror"

[[element]]
name = "stud, left"
kind = "mesh_reference"
mesh_id = "a,b"
position = [1.0, 0.0, 1.0]
"#,
        )
        .unwrap();
        let output = run_job(&job).unwrap();
        let dir = scratch_dir("csv-quoting");
        let path = dir.join("instances.csv");
        write_instances_csv(&output, &path).unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<_> = csv.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[2],
            concat!(
                "\"stud, left\",mesh_reference,\"a,b\",1,",
                "1.000000,0.000000,-1.000000,0.000000,0.000000,0.000000"
            )
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_quantize_discards_roll() {
        let job = parse_config("[pattern]\ntype = \"radial\"\n").unwrap();
        let authored =
            RigidPlacement::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(0.0, 0.0, 37.0));
        let pattern = quantize_pattern(&job, &authored).unwrap();
        assert_relative_eq!(pattern.origin(), Vector3::new(1.0, 2.0, 3.0), epsilon = 1e-12);
        assert_relative_eq!(pattern.axis().normalize(), Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("1, 2.5,-3").unwrap(), Vector3::new(1.0, 2.5, -3.0));
        assert!(parse_vector("1,2").is_err());
    }

    #[test]
    fn test_catalogue_lists_every_kind() {
        let names: Vec<_> = pattern_catalogue()
            .iter()
            .filter_map(|node| node.attribute("Type").map(str::to_owned))
            .collect();
        assert_eq!(names, ["Linear", "Radial", "Mirror"]);
    }

    #[test]
    fn test_writers_create_files() {
        let job = parse_config(JOB).unwrap();
        let output = run_job(&job).unwrap();
        let dir = scratch_dir("writers");

        write_instances_json(&output, &dir.join("instances.json")).unwrap();
        write_instances_csv(&output, &dir.join("instances.csv")).unwrap();
        write_pattern_xml(&output.pattern, &dir.join("pattern.xml")).unwrap();

        let text = std::fs::read_to_string(dir.join("instances.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["pattern"], "mirror");
        assert_eq!(json["instances"].as_array().unwrap().len(), 2);
        let z = json["instances"][1]["placement"]["position"][2].as_f64().unwrap();
        assert_relative_eq!(z, -2.0, epsilon = 1e-12);

        let csv = std::fs::read_to_string(dir.join("instances.csv")).unwrap();
        let rows: Vec<_> = csv.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[2].starts_with("stud,connection,Custom2DField:0,1,5.000000,"));
        assert!(rows[2].contains(",-2.000000,"));

        let xml = std::fs::read_to_string(dir.join("pattern.xml")).unwrap();
        assert_eq!(ClonePattern::from_xml(&xml).unwrap(), output.pattern);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
