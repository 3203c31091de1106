//! Shared inference pipeline used by the dataset-driven commands.
//!
//! settings -> prior set -> rotation-curve model -> controller -> context
//!
//! Commands then only differ in which controller entry point they call and how
//! they present the result.

use crate::data::{InferenceData, RotationCurveData};
use crate::domain::FitSettings;
use crate::engine::{InferenceController, ScanResult};
use crate::error::AppError;
use crate::models::RotationCurveModel;
use crate::physics::RotationParams;
use crate::priors::PriorCatalog;

/// A configured controller plus its cached context.
pub struct Session {
    pub controller: InferenceController<RotationCurveModel>,
    pub context: InferenceData<RotationCurveData>,
}

/// Build the built-in model for `settings` and initialise it on the dataset.
pub fn open_session(settings: FitSettings, fiducial: RotationParams) -> Result<Session, AppError> {
    let catalog = PriorCatalog::with_defaults();
    let prior = catalog.resolve(&settings.prior_name())?;
    let model = RotationCurveModel::default()
        .with_fiducial(fiducial)
        .with_layout_from(&prior)?;

    let controller = InferenceController::with_prior(settings, model, prior)?;
    let context = controller.initialise()?;
    Ok(Session { controller, context })
}

impl Session {
    pub fn probability(&self, theta: &[f64]) -> Result<f64, AppError> {
        self.controller.get_probability(&self.context, theta)
    }

    pub fn scan(&self, param: &str) -> Result<Option<ScanResult>, AppError> {
        self.controller.brute_force(&self.context, param)
    }
}
