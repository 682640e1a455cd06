//! Property-based tests for apicompat invariants.
//!
//! - Explicit previous versions never reach the repository
//! - The searched range is always `[m.0.0, (m+1).0.0)`
//! - Major version zero always skips
//! - Argument assembly is deterministic and flag tokens are all-or-nothing

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use proptest::prelude::*;

    use crate::args::build_arguments;
    use crate::gate::{RunDecision, SkipReason, should_run};
    use crate::project::ProjectInfo;
    use crate::resolve::testing::FakeRepository;
    use crate::resolve::{Resolution, previous_version_range, resolve_previous_version};
    use crate::types::CompatibilityCheckConfig;

    const FLAGS: [&str; 12] = [
        "-keep-internal",
        "-skip-deprecated",
        "-quick",
        "-sort",
        "-show-access",
        "-hide-templates",
        "-show-packages",
        "-compact",
        "-added-annotations",
        "-removed-annotations",
        "-limit-affected",
        "-annotations-list",
    ];

    fn config(out: &Path) -> CompatibilityCheckConfig {
        let project = ProjectInfo {
            group_id: "org.example".to_string(),
            artifact_id: "demo".to_string(),
            version: "3.0.0".to_string(),
            packaging: "jar".to_string(),
            name: "Demo".to_string(),
            base_dir: out.to_path_buf(),
            build_directory: out.to_path_buf(),
            final_name: "demo-3.0.0".to_string(),
        };
        CompatibilityCheckConfig::for_project(&project, None)
    }

    fn version_strategy() -> impl Strategy<Value = String> {
        "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}"
    }

    proptest! {
        /// Property: a non-blank explicit version is returned without a repository query
        #[test]
        fn explicit_version_short_circuits(
            version in version_strategy(),
            major in 1u64..50,
            skip_first in any::<bool>(),
        ) {
            let repo = FakeRepository::with_versions(&["1.0.0"]);
            let r = resolve_previous_version(&repo, major, Some(&version), "g", "a", skip_first)
                .unwrap();
            prop_assert_eq!(r, Resolution::Version(version));
            prop_assert_eq!(repo.version_queries.get(), 0);
        }

        /// Property: the range queried is exactly `[m.0.0, (m+1).0.0)`
        #[test]
        fn range_is_half_open_major_series(major in 1u64..100_000) {
            let repo = FakeRepository::default();
            let _ = resolve_previous_version(&repo, major, None, "g", "a", true);
            let expected = format!("[{major}.0.0, {}.0.0)", major + 1);
            let ranges = repo.ranges.borrow().clone();
            prop_assert_eq!(ranges, vec![expected.clone()]);
            prop_assert_eq!(previous_version_range(major).to_string(), expected);
        }

        /// Property: the resolved version always stays inside the current major series
        #[test]
        fn resolved_version_shares_the_major(
            versions in prop::collection::vec((0u64..6, 0u64..20, 0u64..20), 1..20),
            major in 1u64..6,
        ) {
            let versions: Vec<String> = versions
                .iter()
                .map(|(a, b, c)| format!("{a}.{b}.{c}"))
                .collect();
            let refs: Vec<&str> = versions.iter().map(String::as_str).collect();
            let repo = FakeRepository::with_versions(&refs);
            if let Resolution::Version(v) =
                resolve_previous_version(&repo, major, None, "g", "a", true).unwrap()
            {
                let prefix = format!("{}.", major);
                prop_assert!(v.starts_with(&prefix), "{} outside series {}", v, major);
            }
        }

        /// Property: major version zero skips regardless of the other inputs
        #[test]
        fn major_zero_always_skips(
            rest in "[0-9]{1,3}(\\.[0-9]{1,3})?",
            fail_on_error in any::<bool>(),
        ) {
            let version = format!("0.{rest}");
            let d = should_run("jar", &version, false, Path::new("/no/such/perl"), fail_on_error)
                .unwrap();
            prop_assert_eq!(d, RunDecision::Skip(SkipReason::PreRelease));
        }

        /// Property: identical configuration yields identical arguments
        #[test]
        fn argument_assembly_is_deterministic(
            flags in prop::collection::vec(any::<bool>(), 10),
            limit in -5i32..50,
            annotations in prop::collection::vec("[a-z]{1,8}(\\.[A-Z][a-z]{1,8})?", 0..5),
        ) {
            let td = tempfile::tempdir().unwrap();
            let mut cfg = config(td.path());
            cfg.keep_internal = flags[0];
            cfg.skip_deprecated = flags[1];
            cfg.quick = flags[2];
            cfg.sort = flags[3];
            cfg.show_access = flags[4];
            cfg.hide_templates = flags[5];
            cfg.show_packages = flags[6];
            cfg.compact = flags[7];
            cfg.added_annotations = flags[8];
            cfg.removed_annotations = flags[9];
            cfg.limit_affected = limit;
            cfg.annotations_list = annotations.clone();
            cfg.skip_annotations_list = annotations.into_iter().rev().collect();

            let prev = PathBuf::from("/repo/demo-2.9.0.jar");
            let new = PathBuf::from("/work/demo-3.0.0.jar");
            let first = build_arguments(&cfg, &prev, &new).unwrap();
            let first_list =
                std::fs::read(td.path().join(crate::args::SKIP_ANNOTATIONS_LIST_FILE)).unwrap();
            let second = build_arguments(&cfg, &prev, &new).unwrap();
            let second_list =
                std::fs::read(td.path().join(crate::args::SKIP_ANNOTATIONS_LIST_FILE)).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first_list, second_list);

            let tokens = first.as_slice();
            let expected = [
                cfg.keep_internal,
                cfg.skip_deprecated,
                cfg.quick,
                cfg.sort,
                cfg.show_access,
                cfg.hide_templates,
                cfg.show_packages,
                cfg.compact,
                cfg.added_annotations,
                cfg.removed_annotations,
                cfg.limit_affected > 0,
                !cfg.annotations_list.is_empty(),
            ];
            for (flag, enabled) in FLAGS.iter().zip(expected) {
                let count = tokens.iter().filter(|t| t.as_str() == *flag).count();
                prop_assert_eq!(count, usize::from(enabled), "{}", flag);
            }
            prop_assert_eq!(tokens[tokens.len() - 2].as_str(), "/repo/demo-2.9.0.jar");
            prop_assert_eq!(tokens[tokens.len() - 1].as_str(), "/work/demo-3.0.0.jar");
        }
    }
}
