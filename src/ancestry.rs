//! # Ancestry Oracle
//!
//! Answers "is commit A an ancestor of commit B?" for a repository, running
//! `git merge-base --is-ancestor` against the repository's mirror.
//!
//! Answers are memoized for the life of the process and written through to a
//! [`FactStore`] that survives across invocations. Facts are keyed by the commit
//! pair alone: commit ids are content hashes, so a fact about a pair never
//! changes and never depends on which repository it was computed in.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::lock;
use crate::mirror::ObjectCache;
use crate::package::is_commit_id;

/// Key of one ancestry fact: is `ancestor` an ancestor of `descendant`?
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactKey {
    pub ancestor: String,
    pub descendant: String,
}

impl FactKey {
    pub fn new(ancestor: &str, descendant: &str) -> Self {
        Self {
            ancestor: ancestor.to_string(),
            descendant: descendant.to_string(),
        }
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.ancestor, self.descendant)
    }
}

/// Durable key/value storage for ancestry facts.
pub trait FactStore {
    fn get(&self, key: &FactKey) -> Result<Option<bool>>;

    /// Records a fact. It must be visible to later processes once this returns.
    fn put(&mut self, key: &FactKey, value: bool) -> Result<()>;
}

/// In-memory store. Clones share the same facts, so a test can keep a handle
/// while the oracle owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryFactStore {
    facts: Arc<Mutex<HashMap<FactKey, bool>>>,
}

impl MemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> HashMap<FactKey, bool> {
        self.facts
            .lock()
            .map(|facts| facts.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FactStore for MemoryFactStore {
    fn get(&self, key: &FactKey) -> Result<Option<bool>> {
        let facts = self.facts.lock().map_err(|_| Error::Store {
            message: "fact store lock poisoned".to_string(),
        })?;
        Ok(facts.get(key).copied())
    }

    fn put(&mut self, key: &FactKey, value: bool) -> Result<()> {
        let mut facts = self.facts.lock().map_err(|_| Error::Store {
            message: "fact store lock poisoned".to_string(),
        })?;
        facts.insert(key.clone(), value);
        Ok(())
    }
}

/// Facts persisted as one JSON object (`{"<a>..<b>": true}`) in a file shared
/// by every project on the machine.
///
/// Each `put` re-reads the file under an exclusive lock, merges, and replaces
/// the file atomically, so concurrent runs never lose each other's facts.
#[derive(Debug)]
pub struct JsonFactStore {
    path: PathBuf,
    facts: BTreeMap<String, bool>,
}

impl JsonFactStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let facts = Self::load(&path)?;
        Ok(Self { path, facts })
    }

    /// The store used by default: `<cache root>/ancestry.json`.
    pub fn in_cache_root(root: &Path) -> Result<Self> {
        Self::open(root.join("ancestry.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<BTreeMap<String, bool>> {
        match fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| Error::Store {
                message: format!("{} is corrupt: {}", path.display(), e),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl FactStore for JsonFactStore {
    fn get(&self, key: &FactKey) -> Result<Option<bool>> {
        Ok(self.facts.get(&key.to_string()).copied())
    }

    fn put(&mut self, key: &FactKey, value: bool) -> Result<()> {
        let dir = self.path.parent().ok_or_else(|| Error::Store {
            message: format!("{} has no parent directory", self.path.display()),
        })?;
        fs::create_dir_all(dir)?;
        let _guard = lock::acquire(&lock::lock_path_for(&self.path))?;

        let mut merged = Self::load(&self.path)?;
        merged.insert(key.to_string(), value);

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &merged)?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| Error::Store {
            message: format!("cannot replace {}: {}", self.path.display(), e.error),
        })?;

        self.facts = merged;
        Ok(())
    }
}

/// Memoized ancestry queries over the repository object cache.
pub struct AncestryOracle {
    cache: ObjectCache,
    store: Box<dyn FactStore>,
    memo: HashMap<FactKey, bool>,
}

impl AncestryOracle {
    pub fn new(cache: ObjectCache, store: Box<dyn FactStore>) -> Self {
        Self {
            cache,
            store,
            memo: HashMap::new(),
        }
    }

    /// Is `a` an ancestor of `b` in the repository at `repo_url`?
    ///
    /// A commit counts as its own ancestor. When the mirror lacks either
    /// commit, both are fetched without trees and the query is retried once;
    /// a second inconclusive answer is fatal.
    pub fn is_ancestor(&mut self, repo_url: &str, a: &str, b: &str) -> Result<bool> {
        if let Some(bad) = [a, b].into_iter().find(|c| !is_commit_id(c)) {
            return Err(Error::ConfigParse {
                message: format!("'{}' is not a full commit id", bad),
                hint: Some("Ancestry is only decided between exact commits".to_string()),
            });
        }
        if a == b {
            return Ok(true);
        }
        let key = FactKey::new(a, b);
        if let Some(&known) = self.memo.get(&key) {
            return Ok(known);
        }
        if let Some(known) = self.store.get(&key)? {
            self.memo.insert(key, known);
            return Ok(known);
        }

        let path = self.cache.path_for(repo_url);
        self.cache.ensure_initialized(repo_url, &path)?;

        let answer = match self.query(&path, a, b)? {
            Some(answer) => answer,
            None => {
                info!("Fetching {} and {} from {} to check ancestry", a, b, repo_url);
                self.cache.fetch_commits_treeless(&path, &[a, b])?;
                self.query(&path, a, b)?
                    .ok_or_else(|| Error::AncestryUndetermined {
                        url: repo_url.to_string(),
                        ancestor: a.to_string(),
                        descendant: b.to_string(),
                    })?
            }
        };

        self.store.put(&key, answer)?;
        self.memo.insert(key, answer);
        Ok(answer)
    }

    /// `Some(answer)` when git could decide, `None` when commits are missing.
    fn query(&self, path: &Path, a: &str, b: &str) -> Result<Option<bool>> {
        let output = self
            .cache
            .runner()
            .run(path, &["merge-base", "--is-ancestor", a, b])?;
        debug!("merge-base --is-ancestor {} {} -> {:?}", a, b, output.code);
        Ok(match output.code {
            Some(0) => Some(true),
            Some(1) => Some(false),
            _ => None,
        })
    }
}
