use glob::Pattern;

use crate::config::PolicyConfig;
use crate::github::PullRequestRef;
use crate::validation::MergeVerdict;

/// Checks every strategy runs before its own logic: the pull request must be
/// open, target an allowed branch, and only touch a bounded number of files
/// inside package directories.
pub struct TechnicalLimits;

impl TechnicalLimits {
    pub fn check(pull_request: &PullRequestRef, settings: &PolicyConfig) -> MergeVerdict {
        let mut verdict = MergeVerdict::approve();

        if !pull_request.is_open() {
            verdict.decline(format!(
                "pull request is not open (state: {})",
                pull_request.state
            ));
        }

        if !settings
            .allowed_base_branches
            .iter()
            .any(|branch| branch == &pull_request.base_ref)
        {
            verdict.decline(format!(
                "pull request targets {}, allowed branches are: {}",
                pull_request.base_ref,
                settings.allowed_base_branches.join(", ")
            ));
        }

        let changed = pull_request.changed_files.len();
        if changed == 0 {
            verdict.decline("pull request does not change any files");
        } else if changed > settings.max_changed_files {
            verdict.decline(format!(
                "pull request changes {} files, at most {} are allowed",
                changed, settings.max_changed_files
            ));
        }

        let patterns: Vec<Pattern> = settings
            .package_paths
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        for path in &pull_request.changed_files {
            if !patterns.iter().any(|pattern| pattern.matches(path)) {
                verdict.decline(format!(
                    "{} is not inside a package directory ({})",
                    path,
                    settings.package_paths.join(", ")
                ));
            }
        }

        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull_request(files: &[&str]) -> PullRequestRef {
        PullRequestRef {
            owner: "NixOS".to_string(),
            repo: "nixpkgs".to_string(),
            number: 1,
            title: "hello: 2.12 -> 2.12.1".to_string(),
            state: "open".to_string(),
            author_login: "r-ryantm".to_string(),
            head_sha: "abc123".to_string(),
            base_ref: "master".to_string(),
            changed_files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_package_only_change_passes() {
        let verdict = TechnicalLimits::check(
            &pull_request(&["pkgs/by-name/he/hello/package.nix"]),
            &PolicyConfig::default(),
        );
        assert_eq!(verdict, MergeVerdict::approve());
    }

    #[test]
    fn test_each_file_outside_packages_is_reported() {
        let verdict = TechnicalLimits::check(
            &pull_request(&["lib/default.nix", "pkgs/by-name/he/hello/package.nix", "flake.nix"]),
            &PolicyConfig::default(),
        );
        assert!(!verdict.approved);
        assert_eq!(verdict.decline_reasons.len(), 2);
        assert!(verdict.decline_reasons[0].starts_with("lib/default.nix"));
        assert!(verdict.decline_reasons[1].starts_with("flake.nix"));
    }

    #[test]
    fn test_closed_pr_and_wrong_branch_are_declined() {
        let mut pr = pull_request(&["pkgs/by-name/he/hello/package.nix"]);
        pr.state = "closed".to_string();
        pr.base_ref = "release-23.05".to_string();
        let verdict = TechnicalLimits::check(&pr, &PolicyConfig::default());
        assert!(!verdict.approved);
        assert_eq!(verdict.decline_reasons.len(), 2);
    }

    #[test]
    fn test_too_many_files_is_declined() {
        let settings = PolicyConfig {
            max_changed_files: 1,
            ..PolicyConfig::default()
        };
        let verdict = TechnicalLimits::check(
            &pull_request(&[
                "pkgs/by-name/he/hello/package.nix",
                "pkgs/by-name/he/hello/fix.patch",
            ]),
            &settings,
        );
        assert_eq!(
            verdict.decline_reasons,
            vec!["pull request changes 2 files, at most 1 are allowed"]
        );
    }

    #[test]
    fn test_empty_diff_is_declined() {
        let verdict = TechnicalLimits::check(&pull_request(&[]), &PolicyConfig::default());
        assert!(!verdict.approved);
    }
}
