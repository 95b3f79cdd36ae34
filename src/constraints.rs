//! # Constraint Registry & Finalizer
//!
//! Dependents assert "package X needs at least commit M". Assertions are only
//! collected while packages are being declared, since a dependent may be
//! processed before the package it needs. Once every package is declared,
//! [`ConstraintRegistry::finalize`] checks each assertion against the pinned
//! commit, in declaration order, and stops at the first violation.

use std::collections::HashMap;

use log::debug;

use crate::ancestry::AncestryOracle;
use crate::error::{Error, Result};
use crate::package::{is_commit_id, normalize_name, PackageDecl};

/// Anything that can answer ancestry questions for the finalizer.
pub trait Ancestry {
    fn is_ancestor(&mut self, repo_url: &str, a: &str, b: &str) -> Result<bool>;
}

impl Ancestry for AncestryOracle {
    fn is_ancestor(&mut self, repo_url: &str, a: &str, b: &str) -> Result<bool> {
        AncestryOracle::is_ancestor(self, repo_url, a, b)
    }
}

/// "`origin` needs `package_name` at or after `min_commit`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Who asserted it, for diagnostics.
    pub origin: String,
    pub package_name: String,
    /// Where the dependent expects the package to come from. Documentation only.
    pub advisory_repository_url: Option<String>,
    pub min_commit: Option<String>,
}

#[derive(Debug, Default)]
pub struct ConstraintRegistry {
    requirements: Vec<Requirement>,
}

impl ConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(
        &mut self,
        origin: &str,
        package_name: &str,
        advisory_url: Option<&str>,
        min_commit: Option<&str>,
    ) {
        self.requirements.push(Requirement {
            origin: origin.to_string(),
            package_name: package_name.to_string(),
            advisory_repository_url: advisory_url.map(str::to_string),
            min_commit: min_commit.map(|c| c.to_ascii_lowercase()),
        });
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Validates and drains every requirement against `packages`, keyed by
    /// normalized name.
    pub fn finalize(
        &mut self,
        packages: &HashMap<String, PackageDecl>,
        ancestry: &mut dyn Ancestry,
    ) -> Result<usize> {
        let mut checked = 0;
        for requirement in std::mem::take(&mut self.requirements) {
            let Some(min_commit) = requirement.min_commit.as_deref() else {
                continue;
            };
            if !is_commit_id(min_commit) {
                return Err(Error::ConfigParse {
                    message: format!(
                        "{} requires package '{}' at '{}', which is not a full commit id",
                        requirement.origin, requirement.package_name, min_commit
                    ),
                    hint: Some("Use the full 40 or 64 character hex commit id".to_string()),
                });
            }
            let package = packages
                .get(&normalize_name(&requirement.package_name))
                .ok_or_else(|| Error::UnknownPackage {
                    origin: requirement.origin.clone(),
                    package: requirement.package_name.clone(),
                })?;

            debug!(
                "checking {} requires {} >= {} (pinned {})",
                requirement.origin, package.name, min_commit, package.commit
            );
            if !ancestry.is_ancestor(&package.repository_url, min_commit, &package.commit)? {
                return Err(Error::ConstraintViolation {
                    origin: requirement.origin,
                    package: package.name.clone(),
                    required: min_commit.to_string(),
                    actual: package.commit.clone(),
                });
            }
            checked += 1;
        }
        Ok(checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const C1: &str = "1111111111111111111111111111111111111111";
    const C2: &str = "2222222222222222222222222222222222222222";
    const URL: &str = "https://example.com/p.git";

    /// Linear history C1 -> C2; records every question asked.
    #[derive(Default)]
    struct FakeAncestry {
        edges: HashSet<(String, String)>,
        asked: Vec<(String, String, String)>,
    }

    impl FakeAncestry {
        fn linear() -> Self {
            let mut edges = HashSet::new();
            edges.insert((C1.to_string(), C2.to_string()));
            Self {
                edges,
                asked: Vec::new(),
            }
        }
    }

    impl Ancestry for FakeAncestry {
        fn is_ancestor(&mut self, repo_url: &str, a: &str, b: &str) -> Result<bool> {
            self.asked
                .push((repo_url.to_string(), a.to_string(), b.to_string()));
            Ok(a == b || self.edges.contains(&(a.to_string(), b.to_string())))
        }
    }

    fn packages(pinned: &str) -> HashMap<String, PackageDecl> {
        let mut map = HashMap::new();
        map.insert("p".to_string(), PackageDecl::new("P", URL, pinned));
        map
    }

    #[test]
    fn test_satisfied_requirement_passes() {
        let mut registry = ConstraintRegistry::new();
        registry.declare("dependent", "P", None, Some(C1));
        let mut ancestry = FakeAncestry::linear();

        registry.finalize(&packages(C2), &mut ancestry).unwrap();

        assert_eq!(
            ancestry.asked,
            vec![(URL.to_string(), C1.to_string(), C2.to_string())]
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reversed_pair_is_a_violation() {
        let mut registry = ConstraintRegistry::new();
        registry.declare("dependent", "p", None, Some(C2));

        let err = registry
            .finalize(&packages(C1), &mut FakeAncestry::linear())
            .unwrap_err();

        match err {
            Error::ConstraintViolation {
                origin,
                package,
                required,
                actual,
            } => {
                assert_eq!(origin, "dependent");
                assert_eq!(package, "P");
                assert_eq!(required, C2);
                assert_eq!(actual, C1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_package_names_origin_and_package() {
        let mut registry = ConstraintRegistry::new();
        registry.declare("libfoo", "Q", None, Some(C1));

        let err = registry
            .finalize(&packages(C2), &mut FakeAncestry::linear())
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("libfoo"));
        assert!(message.contains("'Q'"));
    }

    #[test]
    fn test_requirements_without_min_commit_are_skipped() {
        let mut registry = ConstraintRegistry::new();
        registry.declare("doc", "never-declared", Some("https://x"), None);
        let mut ancestry = FakeAncestry::linear();

        let checked = registry.finalize(&HashMap::new(), &mut ancestry).unwrap();
        assert_eq!(checked, 0);
        assert!(ancestry.asked.is_empty());
    }

    #[test]
    fn test_first_violation_aborts_in_declaration_order() {
        let mut registry = ConstraintRegistry::new();
        registry.declare("first", "missing", None, Some(C1));
        registry.declare("second", "p", None, Some(C2));
        let mut ancestry = FakeAncestry::linear();

        let err = registry.finalize(&packages(C1), &mut ancestry).unwrap_err();
        assert!(matches!(err, Error::UnknownPackage { ref origin, .. } if origin == "first"));
        assert!(ancestry.asked.is_empty());
    }

    #[test]
    fn test_symbolic_min_commit_is_rejected_before_any_query() {
        let mut registry = ConstraintRegistry::new();
        registry.declare("dependent", "p", None, Some("main"));
        let mut ancestry = FakeAncestry::linear();

        let err = registry.finalize(&packages(C2), &mut ancestry).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert!(err.to_string().contains("'main'"));
        assert!(ancestry.asked.is_empty());
    }

    #[test]
    fn test_lookup_uses_normalized_name() {
        let mut registry = ConstraintRegistry::new();
        registry.declare("dependent", "P", None, Some(&C1.to_uppercase()));
        let mut ancestry = FakeAncestry::linear();

        registry.finalize(&packages(C2), &mut ancestry).unwrap();
        assert_eq!(ancestry.asked[0].1, C1);
    }
}
