mod predictor;
pub use predictor::Predictor;

mod predictor_config;
pub use predictor_config::PredictorConfig;
