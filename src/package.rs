//! Package declarations and their validation.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::state::{CheckoutMode, PackageRecord};

/// One declared package, as handed to [`crate::session::Session::declare_package`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDecl {
    pub name: String,
    pub repository_url: String,
    pub commit: String,
    pub checkout_mode: CheckoutMode,
    /// Branch the pin is expected to follow. Advisory only.
    pub update_ref: Option<String>,
    pub wire_into_build: bool,
    pub auto_update: bool,
}

impl PackageDecl {
    /// A WORKTREE declaration wired into the build, with auto-update on.
    pub fn new(name: &str, repository_url: &str, commit: &str) -> Self {
        Self {
            name: name.to_string(),
            repository_url: repository_url.to_string(),
            commit: commit.to_string(),
            checkout_mode: CheckoutMode::default(),
            update_ref: None,
            wire_into_build: true,
            auto_update: true,
        }
    }

    pub fn mode(mut self, mode: CheckoutMode) -> Self {
        self.checkout_mode = mode;
        self
    }

    pub fn wired(mut self, wire: bool) -> Self {
        self.wire_into_build = wire;
        self
    }

    pub fn auto_update(mut self, enabled: bool) -> Self {
        self.auto_update = enabled;
        self
    }

    pub fn update_ref(mut self, branch: &str) -> Self {
        self.update_ref = Some(branch.to_string());
        self
    }

    /// Checks every field and lowercases the commit id.
    pub fn validate(mut self) -> Result<Self> {
        validate_name(&self.name)?;
        if self.repository_url.trim().is_empty() {
            return Err(Error::ConfigParse {
                message: format!("package '{}' has no repository url", self.name),
                hint: Some("set 'url:' on the package".to_string()),
            });
        }
        if !is_commit_id(&self.commit) {
            return Err(Error::ConfigParse {
                message: format!(
                    "package '{}' has invalid commit '{}'",
                    self.name, self.commit
                ),
                hint: Some("pin a full 40-character (or 64-character) commit hash".to_string()),
            });
        }
        self.commit = self.commit.to_ascii_lowercase();
        Ok(self)
    }

    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// The metadata record this declaration realizes to.
    pub fn to_record(&self) -> PackageRecord {
        PackageRecord {
            name: self.name.clone(),
            repository_url: self.repository_url.clone(),
            commit: self.commit.clone(),
            checkout_mode: self.checkout_mode,
        }
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("static regex is valid"))
}

pub fn validate_name(name: &str) -> Result<()> {
    if name_pattern().is_match(name) && name != "." && name != ".." {
        Ok(())
    } else {
        Err(Error::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Case-insensitive identifier used for uniqueness and lookups.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Full SHA-1 or SHA-256 object id.
pub fn is_commit_id(s: &str) -> bool {
    (s.len() == 40 || s.len() == 64) && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const C1: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Clean-Core"), "clean_core");
        assert_eq!(normalize_name("clean.core"), "clean_core");
        assert_eq!(normalize_name("typed_geometry"), "typed_geometry");
    }

    #[test]
    fn test_validate_name_rejects_bad_characters() {
        assert!(validate_name("fmt").is_ok());
        assert!(validate_name("glm-0.9.9").is_ok());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("with space").is_err());
    }

    #[test]
    fn test_is_commit_id() {
        assert!(is_commit_id(C1));
        assert!(is_commit_id(&"a".repeat(64)));
        assert!(!is_commit_id("0123abc"));
        assert!(!is_commit_id(&"g".repeat(40)));
    }

    #[test]
    fn test_validate_lowercases_commit() {
        let decl = PackageDecl::new("fmt", "u", &C1.to_uppercase())
            .validate()
            .unwrap();
        assert_eq!(decl.commit, C1);
    }

    #[test]
    fn test_validate_requires_url_and_commit() {
        assert!(PackageDecl::new("fmt", " ", C1).validate().is_err());
        assert!(PackageDecl::new("fmt", "u", "main").validate().is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let decl = PackageDecl::new("fmt", "u", C1);
        assert_eq!(decl.checkout_mode, CheckoutMode::Worktree);
        assert!(decl.wire_into_build);
        assert!(decl.auto_update);
        assert_eq!(decl.update_ref, None);
    }
}
