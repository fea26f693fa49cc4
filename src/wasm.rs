//! Привязки для браузера: предсказание по экспортированной модели

use wasm_bindgen::prelude::*;

use crate::export::ModelExporter;
use crate::types::JobFeatures;

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// model_json - документ ModelExporter, job_json - параметры работы
#[wasm_bindgen]
pub fn predict_labor_hours(model_json: &str, job_json: &str) -> Result<f64, JsValue> {
    let blob = ModelExporter::from_json(model_json).map_err(to_js)?;
    let fitted = ModelExporter::import_pipeline(&blob).map_err(to_js)?;
    let job: JobFeatures = serde_json::from_str(job_json).map_err(to_js)?;
    fitted.predict(&job).map_err(to_js)
}
