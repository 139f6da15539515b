//! Mapping from raw engine output to the canonical measurement record.
//!
//! The engine's stdout is JSON with a dynamic shape; every expected field is
//! extracted explicitly. A missing or non-numeric metric maps to absent —
//! never to zero, since zero is a valid physical measurement and must not be
//! confused with "not detected".

use serde::Deserialize;
use serde_json::{Map, Value};
use taper_core::{
  engine::{EngineError, EngineReport},
  measurement::Metrics,
};

/// The engine's wire shape: either a success payload or a structured failure.
#[derive(Debug, Deserialize)]
struct RawOutput {
  success:      bool,
  #[serde(default)]
  error:        Option<String>,
  #[serde(default)]
  measurements: Option<Map<String, Value>>,
  #[serde(default)]
  metadata:     Option<Value>,
  #[serde(default)]
  confidence:   Option<Value>,
}

/// Parse raw engine stdout into an [`EngineReport`].
///
/// Anything that is not well-formed per the contract is a
/// [`EngineError::Malformed`]; a well-formed `success: false` is a
/// [`EngineError::Rejected`].
pub fn parse_report(stdout: &[u8]) -> Result<EngineReport, EngineError> {
  let raw: RawOutput = serde_json::from_slice(stdout)
    .map_err(|e| EngineError::Malformed(e.to_string()))?;

  if !raw.success {
    return Err(EngineError::Rejected(
      raw
        .error
        .unwrap_or_else(|| "engine reported failure without detail".to_owned()),
    ));
  }

  let measurements = raw.measurements.ok_or_else(|| {
    EngineError::Malformed("success output is missing the measurements object".to_owned())
  })?;

  Ok(EngineReport {
    metrics:    map_metrics(&measurements),
    metadata:   raw.metadata,
    confidence: raw.confidence,
  })
}

fn metric(map: &Map<String, Value>, key: &str) -> Option<f64> {
  map.get(key).and_then(Value::as_f64)
}

/// Field-by-field extraction of the twelve metrics.
pub fn map_metrics(map: &Map<String, Value>) -> Metrics {
  Metrics {
    shoulder_width:      metric(map, "shoulder_width"),
    chest_circumference: metric(map, "chest_circumference"),
    waist_circumference: metric(map, "waist_circumference"),
    hip_circumference:   metric(map, "hip_circumference"),
    neck_circumference:  metric(map, "neck_circumference"),
    bicep_circumference: metric(map, "bicep_circumference"),
    wrist_circumference: metric(map, "wrist_circumference"),
    thigh_circumference: metric(map, "thigh_circumference"),
    sleeve_length:       metric(map, "sleeve_length"),
    upper_arm_length:    metric(map, "upper_arm_length"),
    inseam:              metric(map, "inseam"),
    torso_length:        metric(map, "torso_length"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn maps_success_output_field_by_field() {
    let stdout = serde_json::json!({
      "success": true,
      "measurements": {
        "shoulder_width": 40.2,
        "chest_circumference": 92.5,
        "inseam": 78.0
      },
      "metadata": { "body_height_pixels": 1043.5 },
      "confidence": { "front_detection": true, "landmarks_detected": 33 }
    })
    .to_string();

    let report = parse_report(stdout.as_bytes()).unwrap();
    assert_eq!(report.metrics.shoulder_width, Some(40.2));
    assert_eq!(report.metrics.chest_circumference, Some(92.5));
    assert_eq!(report.metrics.inseam, Some(78.0));
    assert_eq!(report.metrics.waist_circumference, None);
    assert_eq!(
      report.confidence,
      Some(serde_json::json!({ "front_detection": true, "landmarks_detected": 33 }))
    );
  }

  #[test]
  fn missing_or_malformed_metric_is_absent_not_zero() {
    let stdout = serde_json::json!({
      "success": true,
      "measurements": {
        "shoulder_width": "n/a",
        "wrist_circumference": null,
        "inseam": 0.0
      }
    })
    .to_string();

    let report = parse_report(stdout.as_bytes()).unwrap();
    assert_eq!(report.metrics.shoulder_width, None);
    assert_eq!(report.metrics.wrist_circumference, None);
    // Zero is a real value, not a null stand-in.
    assert_eq!(report.metrics.inseam, Some(0.0));
  }

  #[test]
  fn structured_failure_is_rejected() {
    let stdout = serde_json::json!({
      "success": false,
      "error": "Could not detect body pose in front image."
    })
    .to_string();

    let err = parse_report(stdout.as_bytes()).unwrap_err();
    assert!(matches!(err, EngineError::Rejected(msg)
      if msg.contains("front image")));
  }

  #[test]
  fn garbage_output_is_malformed() {
    assert!(matches!(
      parse_report(b"segfault at 0x0"),
      Err(EngineError::Malformed(_))
    ));
  }

  #[test]
  fn success_without_measurements_is_malformed() {
    let stdout = serde_json::json!({ "success": true }).to_string();
    assert!(matches!(
      parse_report(stdout.as_bytes()),
      Err(EngineError::Malformed(_))
    ));
  }
}
