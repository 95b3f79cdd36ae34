//! Property-based tests for cache keys, names and the state decision.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::mirror::mirror_path;
    use crate::package::normalize_name;
    use crate::state::{decide, Action, CheckoutMode, PackageRecord, PackageState, UpdatePolicy};
    use proptest::prelude::*;
    use std::path::Path;

    fn mode() -> impl Strategy<Value = CheckoutMode> {
        prop_oneof![
            Just(CheckoutMode::Worktree),
            Just(CheckoutMode::Full),
            Just(CheckoutMode::Vendored),
        ]
    }

    fn record(commit: String, mode: CheckoutMode) -> PackageRecord {
        PackageRecord {
            name: "p".to_string(),
            repository_url: "https://example.com/p.git".to_string(),
            commit,
            checkout_mode: mode,
        }
    }

    proptest! {
        /// Property: the mirror path is a pure function of the URL
        #[test]
        fn mirror_path_is_deterministic(url in ".*") {
            let root = Path::new("/cache");
            prop_assert_eq!(mirror_path(root, &url), mirror_path(root, &url));
        }

        /// Property: distinct URLs map to distinct mirrors
        #[test]
        fn mirror_path_separates_urls(a in ".+", b in ".+") {
            prop_assume!(a != b);
            let root = Path::new("/cache");
            prop_assert_ne!(mirror_path(root, &a), mirror_path(root, &b));
        }

        /// Property: the mirror directory name is 64 lowercase hex characters
        #[test]
        fn mirror_path_is_filesystem_safe(url in ".*") {
            let path = mirror_path(Path::new("/cache"), &url);
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            prop_assert_eq!(name.len(), 64);
            prop_assert!(name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }

        /// Property: normalization is idempotent
        #[test]
        fn normalize_name_is_idempotent(name in "[A-Za-z0-9_.-]+") {
            let once = normalize_name(&name);
            prop_assert_eq!(normalize_name(&once), once.clone());
        }

        /// Property: a missing directory is always realized
        #[test]
        fn absent_always_realizes(commit in "[0-9a-f]{40}", m in mode(), global: bool, package: bool) {
            let desired = record(commit, m);
            let d = decide(&desired, None, false, UpdatePolicy { global, package });
            prop_assert_eq!(d.state, PackageState::Absent);
            prop_assert_eq!(d.action, Action::Realize);
        }

        /// Property: nothing but an absent or updatable stale package is realized
        #[test]
        fn realize_only_when_allowed(
            desired_commit in "[0-9a-f]{40}",
            recorded_commit in "[0-9a-f]{40}",
            desired_mode in mode(),
            recorded_mode in mode(),
            global: bool,
            package: bool,
        ) {
            let desired = record(desired_commit, desired_mode);
            let recorded = record(recorded_commit, recorded_mode);
            let d = decide(&desired, Some(&recorded), true, UpdatePolicy { global, package });
            if d.action == Action::Realize {
                prop_assert_eq!(d.state, PackageState::Stale);
                prop_assert!(global && package);
                prop_assert_eq!(desired_mode, recorded_mode);
            }
        }
    }
}
