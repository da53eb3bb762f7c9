pub mod model_metadata;
pub mod model_storage;
pub mod inference_config;
pub mod config;

pub use model_metadata::ModelMetadata;
pub use model_storage::{load_model_bundle, parse_model_bundle, read_model_bundle, save_model_bundle, write_model_bundle};
pub use inference_config::InferenceConfig;
pub use config::{AppConfig, ModelSettings, PreprocessSettings};
