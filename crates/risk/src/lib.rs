pub mod learner;

pub use learner::{ParameterLearner, RISK_BUDGET};
