//! # gitpin
//!
//! This library pins external source dependencies ("packages") of a root
//! project to exact git commits and realizes them on disk. It is used by the
//! `gitpin` command-line tool but can be driven directly through
//! [`session::Session`].
//!
//! ## Quick Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use gitpin::ancestry::JsonFactStore;
//! use gitpin::git::SystemGit;
//! use gitpin::package::PackageDecl;
//! use gitpin::session::{Session, Settings, ROOT_ORIGIN};
//! use gitpin::state::CheckoutMode;
//!
//! # fn main() -> gitpin::error::Result<()> {
//! let cache_root = gitpin::defaults::resolve_cache_root(None);
//! let settings = Settings::new(Path::new("."), &cache_root);
//! let store = JsonFactStore::in_cache_root(&cache_root)?;
//! let mut session = Session::new(settings, Arc::new(SystemGit::new()), Box::new(store));
//!
//! session.declare_requirement(ROOT_ORIGIN, "fmt", None, Some("0c9fce2ffefecfdce794e1859584e25877b7b592"));
//! session.declare_package(
//!     PackageDecl::new(
//!         "fmt",
//!         "https://github.com/fmtlib/fmt.git",
//!         "0c9fce2ffefecfdce794e1859584e25877b7b592",
//!     )
//!     .mode(CheckoutMode::Full),
//! )?;
//! session.finalize()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! - **Object cache (`mirror`)**: one bare mirror per remote URL under the user
//!   cache directory, shared by every project, so objects are fetched once.
//! - **Package state (`state`)**: a TOML record inside each checkout naming the
//!   realized `(name, repository_url, commit, checkout_mode)`, and the pure
//!   decision function that compares it with a declaration.
//! - **Realizer (`realize`)**: brings a checkout to its declared state, never
//!   touching directories it did not create and never discarding uncommitted
//!   work in a history-carrying checkout.
//! - **Ancestry (`ancestry`)**: memoized, persisted `is_ancestor` answers.
//! - **Constraints (`constraints`)**: "package X needs at least commit M"
//!   assertions, validated once all packages are declared.
//!
//! ## Execution Flow
//!
//! 1.  **Declaration**: the root manifest's requirements and packages are
//!     declared into a `Session`, packages in order.
//! 2.  **Realization**: each package is realized as it is declared; its own
//!     manifest may add requirements.
//! 3.  **Finalization**: every requirement with a minimum commit is checked
//!     against the pinned commit; the first violation aborts the run.

pub mod ancestry;
pub mod constraints;
pub mod defaults;
pub mod error;
pub mod git;
pub mod lock;
pub mod manifest;
pub mod mirror;
pub mod output;
pub mod package;
pub mod realize;
pub mod session;
pub mod state;

#[cfg(test)]
mod mirror_proptest;
