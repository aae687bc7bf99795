//! Knowledge distillation lifecycle
//!
//! - `DistillLoss`: temperature-scaled KL plus hard cross-entropy
//! - `Student`: a model trained to match a frozen teacher
//! - `DistillationController`: teacher bootstrap, promotion and the
//!   depth-one nested training job at the end of each round

mod controller;
mod loss;
mod student;

pub use controller::DistillationController;
pub use loss::DistillLoss;
pub use student::Student;
