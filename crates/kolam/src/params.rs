use std::path::Path;

use kolam_core::RuntimeConfig;
use kolam_dots::DotDetectorParams;
use kolam_render::DigitizeParams;
use kolam_trace::TracerParams;
use serde::{Deserialize, Serialize};

use crate::error::KolamError;
use crate::preprocess::PreprocessParams;

/// Every tunable of the pipeline in one place.
///
/// Missing sections or fields in a JSON config fall back to their defaults,
/// so a file only needs to name what it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KolamParams {
    /// Advisory wall-clock budget for detection plus tracing.
    pub budget_secs: f32,
    pub runtime: RuntimeConfig,
    pub preprocess: PreprocessParams,
    pub detector: DotDetectorParams,
    pub tracer: TracerParams,
    pub digitize: DigitizeParams,
}

impl Default for KolamParams {
    fn default() -> Self {
        Self {
            budget_secs: 55.0,
            runtime: RuntimeConfig::default(),
            preprocess: PreprocessParams::default(),
            detector: DotDetectorParams::default(),
            tracer: TracerParams::default(),
            digitize: DigitizeParams::default(),
        }
    }
}

impl KolamParams {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, KolamError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_config_keeps_other_defaults() {
        let params: KolamParams = serde_json::from_str(
            r#"{ "budget_secs": 10.0, "detector": { "max_dots": 40 }, "tracer": { "stitch": { "threshold": 3.5 } } }"#,
        )
        .unwrap();
        assert_eq!(params.budget_secs, 10.0);
        assert_eq!(params.detector.max_dots, 40);
        assert_eq!(params.detector.budget_secs, 8.0);
        assert_eq!(params.tracer.stitch.threshold, 3.5);
        assert_eq!(params.tracer.budget_secs, 20.0);
        assert_eq!(params.preprocess, PreprocessParams::default());
        assert!(params.runtime.optimized);
    }

    #[test]
    fn load_json_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "runtime": {{ "optimized": false }} }}"#).unwrap();
        let params = KolamParams::load_json(file.path()).unwrap();
        assert!(!params.runtime.optimized);
        assert_eq!(params.digitize.canvas_size, 500);
    }

    #[test]
    fn load_json_reports_bad_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            KolamParams::load_json(file.path()),
            Err(KolamError::Json(_))
        ));
        assert!(matches!(
            KolamParams::load_json("/nonexistent/kolam.json"),
            Err(KolamError::Io(_))
        ));
    }
}
