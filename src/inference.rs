use std::io::Cursor;

use ndarray::Array3;
use tract_onnx::prelude::*;

use crate::config::ModelSource;
use crate::error::InferenceError;
use crate::preprocess::INPUT_SIZE;

type OnnxPlan = TypedSimplePlan<TypedModel>;

/// The loaded classification model. Constructed once at startup and shared
/// read-only across requests; `run` takes `&self`, so concurrent predictions
/// need no locking.
pub struct Model {
    plan: OnnxPlan,
}

impl Model {
    /// Loads the ONNX model from a local path or downloads it over HTTPS.
    /// Both sources yield an equivalent runnable plan pinned to a
    /// [1, 224, 224, 3] f32 input.
    pub async fn load(source: &ModelSource) -> Result<Self, InferenceError> {
        let model = match source {
            ModelSource::Path(path) => {
                onnx().model_for_path(path).map_err(InferenceError::Load)?
            }
            ModelSource::Url(url) => {
                let bytes = reqwest::get(url.as_str())
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                onnx()
                    .model_for_read(&mut Cursor::new(bytes.as_ref()))
                    .map_err(InferenceError::Load)?
            }
        };

        let size = INPUT_SIZE as usize;
        let plan = model
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, size, size, 3)),
            )
            .map_err(InferenceError::Load)?
            .into_optimized()
            .map_err(InferenceError::Load)?
            .into_runnable()
            .map_err(InferenceError::Load)?;

        Ok(Self { plan })
    }

    /// Runs one normalized [224, 224, 3] tensor through the model with a
    /// batch dimension of 1 and returns the scalar P(cancer).
    pub fn predict(&self, input: &Array3<f32>) -> Result<f32, InferenceError> {
        let size = INPUT_SIZE as usize;
        let flat: Vec<f32> = input.iter().copied().collect();
        let tensor = tract_ndarray::Array4::from_shape_vec((1, size, size, 3), flat)?
            .into_tensor();

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(InferenceError::Run)?;
        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(InferenceError::Run)?;

        view.iter().next().copied().ok_or(InferenceError::EmptyOutput)
    }
}
