use serde::{Deserialize, Serialize};

/// A merge decision parked until CI for `head_sha` settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMerge {
    pub head_sha: String,
    pub issue_number: u64,
}

impl PendingMerge {
    pub fn new(head_sha: impl Into<String>, issue_number: u64) -> Self {
        Self {
            head_sha: head_sha.into(),
            issue_number,
        }
    }
}
