pub const POSTPONED: &str = "One or more checks are still pending, we will wait for them to finish and if it succeeds we will merge this.";
pub const MERGE_COMPLETED: &str = "Merge completed";
pub const DRY_RUN_REASON: &str = "Merging is disabled (dry run)";

pub struct CommentGenerator;

impl CommentGenerator {
    fn mention(requester: Option<&str>, text: &str) -> String {
        match requester {
            Some(login) => format!("@{} {}", login, text),
            None => {
                let mut chars = text.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }

    /// All reasons from every strategy and from CI, one per line.
    pub fn not_permitted(requester: Option<&str>, reasons: &[String]) -> String {
        let mut msg = format!("{} \n", Self::mention(requester, "merge not permitted:"));
        for reason in reasons {
            msg.push_str(reason);
            msg.push('\n');
        }
        msg
    }

    pub fn merge_failed(requester: Option<&str>, error_summary: &str) -> String {
        [
            Self::mention(requester, "merge failed:"),
            "```".to_string(),
            error_summary.to_string(),
            "```".to_string(),
        ]
        .join("\n")
    }
}
