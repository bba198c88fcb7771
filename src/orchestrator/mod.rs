//! Orchestrator module
//!
//! Resources tracked by the service and the operations on them. All list
//! operations are paginated and scoped to what the caller may see.

mod resources;
mod service;

pub use resources::{
    Catalog, CatalogRegistry, Certificate, CertificateRequest, TargetOfEvaluation,
    TargetOfEvaluationRequest, TargetType, DEFAULT_TARGET_OF_EVALUATION_ID,
    DEFAULT_TARGET_OF_EVALUATION_NAME,
};
pub use service::Orchestrator;
