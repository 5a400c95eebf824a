pub mod ci_status;
pub mod comments;
pub mod merge_decision;

pub use ci_status::{CiOutcome, CiReconciler, CiStage};
pub use merge_decision::{MergeDecision, MergeOutcome};
