//! # Session
//!
//! One run of the engine. The session owns the table of declared packages and
//! the list of requirements; every declaration and the final validation go
//! through it, so "everything declared so far" is an explicit value rather
//! than global state.
//!
//! Packages are realized as they are declared, in order. Requirements may name
//! packages that are declared later; they are only checked by
//! [`Session::finalize`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::ancestry::{AncestryOracle, FactStore};
use crate::constraints::{ConstraintRegistry, Requirement};
use crate::defaults;
use crate::error::{Error, Result};
use crate::git::GitRunner;
use crate::manifest::{self, Manifest};
use crate::mirror::ObjectCache;
use crate::package::PackageDecl;
use crate::realize::{Outcome, Realizer};
use crate::state::{Decision, PackageRecord};

/// Origin recorded for requirements declared by the root manifest.
pub const ROOT_ORIGIN: &str = "root project";

/// Everything a session needs to know about its environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_root: PathBuf,
    /// Relative to `project_root`.
    pub packages_dir: PathBuf,
    pub build_descriptors: Vec<String>,
    pub cache_root: PathBuf,
    /// Global auto-update switch for stale packages.
    pub auto_update: bool,
}

impl Settings {
    pub fn new(project_root: &Path, cache_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            packages_dir: PathBuf::from(defaults::PACKAGES_DIR),
            build_descriptors: defaults::BUILD_DESCRIPTORS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            cache_root: cache_root.to_path_buf(),
            auto_update: false,
        }
    }

    /// Takes `packages_dir` and `build_descriptors` from a manifest.
    pub fn with_manifest(mut self, manifest: &Manifest) -> Self {
        self.packages_dir = PathBuf::from(&manifest.packages_dir);
        self.build_descriptors = manifest.build_descriptors.clone();
        self
    }

    pub fn auto_update(mut self, enabled: bool) -> Self {
        self.auto_update = enabled;
        self
    }
}

pub struct Session {
    settings: Settings,
    packages: HashMap<String, PackageDecl>,
    registry: ConstraintRegistry,
    realizer: Realizer,
    oracle: AncestryOracle,
    outcomes: Vec<Outcome>,
}

impl Session {
    pub fn new(settings: Settings, git: Arc<dyn GitRunner>, store: Box<dyn FactStore>) -> Self {
        let cache = ObjectCache::new(settings.cache_root.clone(), git);
        let realizer = Realizer::new(
            cache.clone(),
            settings.build_descriptors.clone(),
            settings.auto_update,
        );
        let oracle = AncestryOracle::new(cache, store);
        Self {
            settings,
            packages: HashMap::new(),
            registry: ConstraintRegistry::new(),
            realizer,
            oracle,
            outcomes: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Checkout directory for a package.
    pub fn package_dir(&self, decl: &PackageDecl) -> PathBuf {
        self.settings
            .project_root
            .join(&self.settings.packages_dir)
            .join(&decl.name)
    }

    /// Declares and realizes one package.
    ///
    /// Requirements listed in the package's own manifest are declared with
    /// the package as their origin.
    pub fn declare_package(&mut self, decl: PackageDecl) -> Result<&Outcome> {
        let decl = decl.validate()?;
        let normalized = decl.normalized_name();
        if let Some(existing) = self.packages.get(&normalized) {
            return Err(Error::DuplicatePackage {
                name: decl.name.clone(),
                existing: existing.name.clone(),
                normalized,
            });
        }

        let dir = self.package_dir(&decl);
        let outcome = self.realizer.realize(&decl, &dir)?;
        self.ingest_dependent_manifest(&decl.name, &dir)?;

        self.packages.insert(normalized, decl);
        self.outcomes.push(outcome);
        Ok(&self.outcomes[self.outcomes.len() - 1])
    }

    fn ingest_dependent_manifest(&mut self, name: &str, dir: &Path) -> Result<()> {
        let path = dir.join(defaults::MANIFEST_FILE);
        if !path.is_file() {
            return Ok(());
        }
        let manifest = manifest::from_file(&path)?;
        debug!(
            "{} declares {} requirement(s)",
            name,
            manifest.requires.len()
        );
        for requirement in &manifest.requires {
            self.declare_requirement(
                name,
                &requirement.package,
                requirement.url.as_deref(),
                requirement.min_commit.as_deref(),
            );
        }
        Ok(())
    }

    /// Records that `origin` needs `package_name` at or after `min_commit`.
    pub fn declare_requirement(
        &mut self,
        origin: &str,
        package_name: &str,
        advisory_url: Option<&str>,
        min_commit: Option<&str>,
    ) {
        self.registry
            .declare(origin, package_name, advisory_url, min_commit);
    }

    pub fn requirements(&self) -> &[Requirement] {
        self.registry.requirements()
    }

    /// Checks every requirement against the declared packages, returning how
    /// many carried a minimum commit.
    pub fn finalize(&mut self) -> Result<usize> {
        if !self.registry.is_empty() {
            info!("Checking {} requirement(s)", self.registry.len());
        }
        self.registry.finalize(&self.packages, &mut self.oracle)
    }

    /// Declares everything in a root manifest, then finalizes.
    pub fn sync(&mut self, manifest: &Manifest) -> Result<usize> {
        let decls = manifest.package_decls()?;
        for requirement in &manifest.requires {
            self.declare_requirement(
                ROOT_ORIGIN,
                &requirement.package,
                requirement.url.as_deref(),
                requirement.min_commit.as_deref(),
            );
        }
        for decl in decls {
            self.declare_package(decl)?;
        }
        self.finalize()
    }

    /// What realizing `decl` would do, without doing anything.
    pub fn inspect(&self, decl: &PackageDecl) -> Result<(Decision, Option<PackageRecord>)> {
        self.realizer.inspect(decl, &self.package_dir(decl))
    }

    /// [`Realizer::preview`] for `decl` at its checkout directory.
    pub fn preview(&self, decl: &PackageDecl) -> Result<Outcome> {
        self.realizer.preview(decl, &self.package_dir(decl))
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn package(&self, name: &str) -> Option<&PackageDecl> {
        self.packages.get(&crate::package::normalize_name(name))
    }
}
