//! The pipeline orchestrator: intake → computation → record.
//!
//! All validation happens before any disk write; any failure after staging
//! discards both artifacts before the error propagates unchanged. The
//! orchestrator holds no lock across requests — the engine invocation is the
//! only long-blocking step and runs on request-scoped state only.

use taper_core::{
  engine::{EngineRequest, MeasurementEngine},
  measurement::{Gender, Measurement, NewMeasurement, check_height},
  store::MeasurementStore,
};
use uuid::Uuid;

use crate::{
  Result, cleanup,
  intake::{ImageRole, Staging, Upload, validate},
};

/// One measurement submission, as assembled by the transport layer.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
  pub subject_id: Uuid,
  pub height:     f64,
  pub gender:     Gender,
  pub notes:      Option<String>,
  pub front:      Upload,
  pub side:       Upload,
}

/// Run the full pipeline for one submission.
pub async fn process<E, S>(
  staging: &Staging,
  engine: &E,
  store: &S,
  request: SubmitRequest,
) -> Result<Measurement>
where
  E: MeasurementEngine,
  S: MeasurementStore,
{
  // Everything that can be rejected without I/O is rejected here.
  store
    .get_subject(request.subject_id)
    .await?
    .ok_or(taper_core::Error::SubjectNotFound(request.subject_id))?;
  check_height(request.height)?;
  validate(ImageRole::Front, &request.front)?;
  validate(ImageRole::Side, &request.side)?;

  // Both files exist before the engine sees either.
  let staged = staging.stage_pair(&request.front, &request.side).await?;

  let engine_request = EngineRequest {
    front_image: staged.front.clone(),
    side_image:  staged.side.clone(),
    height:      request.height,
    gender:      request.gender,
  };

  let report = match engine.compute(&engine_request).await {
    Ok(report) => report,
    Err(e) => {
      cleanup::discard([&staged.front, &staged.side]).await;
      return Err(e.into());
    }
  };

  let input = NewMeasurement {
    subject_id:  request.subject_id,
    height:      request.height,
    metrics:     report.metrics,
    front_image: staged.front.display().to_string(),
    side_image:  staged.side.display().to_string(),
    metadata:    report.metadata,
    confidence:  report.confidence,
    notes:       request.notes,
  };

  match store.insert_measurement(input).await {
    Ok(measurement) => Ok(measurement),
    Err(e) => {
      // The record never became durable; the staged sources go too.
      cleanup::discard([&staged.front, &staged.side]).await;
      Err(e.into())
    }
  }
}
