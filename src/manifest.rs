//! # Manifest Schema and Parsing
//!
//! This module defines `gitpin.yaml`, the file through which a project declares
//! the packages it pins and the minimum commits it needs from packages pinned
//! elsewhere.
//!
//! ```yaml
//! packages_dir: extern
//! build_descriptors: [CMakeLists.txt]
//! packages:
//!   - name: fmt
//!     url: https://github.com/fmtlib/fmt.git
//!     commit: 0c9fce2ffefecfdce794e1859584e25877b7b592
//!     mode: full
//! requires:
//!   - package: fmt
//!     min_commit: 0c9fce2ffefecfdce794e1859584e25877b7b592
//! ```
//!
//! The root project uses every section. A realized package may ship its own
//! `gitpin.yaml`; only its `requires` list is read.
//!
//! Everything that can be checked without touching disk or git (names,
//! duplicates, commit ids, modes) is checked by [`Manifest::package_decls`] so
//! a bad manifest fails before any package is realized.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::package::{is_commit_id, PackageDecl};
use crate::state::CheckoutMode;

/// A package entry as written in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageEntry {
    pub name: String,
    pub url: String,
    pub commit: String,
    /// `worktree` (default), `full` or `vendored`.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub update_ref: Option<String>,
    #[serde(default = "enabled")]
    pub wire: bool,
    #[serde(default = "enabled")]
    pub auto_update: bool,
}

/// A requirement entry as written in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementEntry {
    pub package: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub min_commit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default = "default_packages_dir")]
    pub packages_dir: String,
    #[serde(default = "default_build_descriptors")]
    pub build_descriptors: Vec<String>,
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
    #[serde(default)]
    pub requires: Vec<RequirementEntry>,
}

fn enabled() -> bool {
    true
}

fn default_packages_dir() -> String {
    defaults::PACKAGES_DIR.to_string()
}

fn default_build_descriptors() -> Vec<String> {
    defaults::BUILD_DESCRIPTORS
        .iter()
        .map(|d| d.to_string())
        .collect()
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            packages_dir: default_packages_dir(),
            build_descriptors: default_build_descriptors(),
            packages: Vec::new(),
            requires: Vec::new(),
        }
    }
}

/// Parses manifest YAML. An empty document is an empty manifest.
pub fn parse(yaml_content: &str) -> Result<Manifest> {
    if yaml_content.trim().is_empty() {
        return Ok(Manifest::default());
    }
    let manifest: Manifest = serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: Some(
            "each package needs 'name', 'url' and 'commit'; each requirement needs 'package'"
                .to_string(),
        ),
    })?;
    manifest.check_requirements()?;
    Ok(manifest)
}

/// Reads and parses the manifest at `path`.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content).map_err(|e| match e {
        Error::ConfigParse { message, hint } => Error::ConfigParse {
            message: format!("{}: {}", path.display(), message),
            hint,
        },
        other => other,
    })
}

impl Manifest {
    fn check_requirements(&self) -> Result<()> {
        for requirement in &self.requires {
            if let Some(commit) = &requirement.min_commit {
                if !is_commit_id(commit) {
                    return Err(Error::ConfigParse {
                        message: format!(
                            "requirement on '{}' has invalid min_commit '{}'",
                            requirement.package, commit
                        ),
                        hint: Some("use a full 40-character (or 64-character) commit hash".to_string()),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validated declarations in manifest order.
    pub fn package_decls(&self) -> Result<Vec<PackageDecl>> {
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut decls = Vec::with_capacity(self.packages.len());

        for entry in &self.packages {
            let mode = match &entry.mode {
                Some(mode) => mode.parse::<CheckoutMode>()?,
                None => CheckoutMode::default(),
            };
            let mut decl = PackageDecl::new(&entry.name, &entry.url, &entry.commit)
                .mode(mode)
                .wired(entry.wire)
                .auto_update(entry.auto_update);
            if let Some(branch) = &entry.update_ref {
                decl = decl.update_ref(branch);
            }
            let decl = decl.validate()?;

            let normalized = decl.normalized_name();
            if let Some(existing) = seen.get(&normalized) {
                return Err(Error::DuplicatePackage {
                    name: decl.name.clone(),
                    existing: existing.clone(),
                    normalized,
                });
            }
            seen.insert(normalized, decl.name.clone());
            decls.push(decl);
        }
        Ok(decls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C1: &str = "0c9fce2ffefecfdce794e1859584e25877b7b592";

    #[test]
    fn test_parse_full_manifest() {
        let yaml = format!(
            r#"
packages_dir: third_party
build_descriptors: [CMakeLists.txt, meson.build]
packages:
  - name: fmt
    url: https://github.com/fmtlib/fmt.git
    commit: {C1}
    mode: full
    update_ref: master
    wire: false
  - name: glm
    url: https://github.com/g-truc/glm.git
    commit: {C1}
requires:
  - package: fmt
    url: https://github.com/fmtlib/fmt.git
    min_commit: {C1}
  - package: glm
"#
        );
        let manifest = parse(&yaml).unwrap();
        assert_eq!(manifest.packages_dir, "third_party");
        assert_eq!(manifest.build_descriptors.len(), 2);
        assert_eq!(manifest.requires.len(), 2);

        let decls = manifest.package_decls().unwrap();
        assert_eq!(decls[0].checkout_mode, CheckoutMode::Full);
        assert_eq!(decls[0].update_ref.as_deref(), Some("master"));
        assert!(!decls[0].wire_into_build);
        assert_eq!(decls[1].checkout_mode, CheckoutMode::Worktree);
        assert!(decls[1].wire_into_build);
        assert!(decls[1].auto_update);
    }

    #[test]
    fn test_defaults_for_empty_manifest() {
        let manifest = parse("").unwrap();
        assert_eq!(manifest.packages_dir, "extern");
        assert_eq!(manifest.build_descriptors, vec!["CMakeLists.txt"]);
        assert!(manifest.packages.is_empty());
    }

    #[test]
    fn test_missing_commit_is_config_error() {
        let err = parse("packages:\n  - name: fmt\n    url: u\n").unwrap_err();
        match err {
            Error::ConfigParse { message, hint } => {
                assert!(message.contains("commit"));
                assert!(hint.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_mode_is_config_error() {
        let yaml = format!("packages:\n  - name: fmt\n    url: u\n    commit: {C1}\n    mode: shallow\n");
        let err = parse(&yaml).unwrap().package_decls().unwrap_err();
        assert!(err.to_string().contains("unknown checkout mode"));
    }

    #[test]
    fn test_duplicate_normalized_names_rejected() {
        let yaml = format!(
            "packages:\n  - name: clean-core\n    url: a\n    commit: {C1}\n  - name: Clean_Core\n    url: b\n    commit: {C1}\n"
        );
        let err = parse(&yaml).unwrap().package_decls().unwrap_err();
        assert!(matches!(err, Error::DuplicatePackage { .. }));
    }

    #[test]
    fn test_invalid_min_commit_rejected() {
        let err = parse("requires:\n  - package: fmt\n    min_commit: main\n").unwrap_err();
        assert!(err.to_string().contains("min_commit"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(parse("pakages: []\n").is_err());
    }
}
