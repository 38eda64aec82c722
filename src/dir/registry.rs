//! Process-wide, named in-memory directories, reference-counted so that
//! every caller that opens the same name observes the same instance.
//!
//! This is the one piece of shared mutable state in the engine (§5): a
//! single module-level map, guarded by a single mutex held only for the
//! duration of open/close bookkeeping. Directory operations themselves
//! happen outside the lock, through the `Arc<Mutex<MemoryDir>>` each handle
//! hands out.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::dir::memory::MemoryDir;
use crate::error::{EngineError, Result};

struct Entry {
    dir: Arc<Mutex<MemoryDir>>,
    refcount: usize,
    /// Every name under which `dir` is currently registered. Ordinarily a
    /// singleton; grows past one only via [`NamedRegistry::alias`].
    aliases: BTreeSet<String>,
}

static REGISTRY: Lazy<Mutex<HashMap<String, Entry>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// A handle to a named in-memory directory, obtained from
/// [`NamedRegistry::open`]. Call [`NamedHandle::close`] when done; there is
/// no implicit release on drop, since closing can itself fail (§8 S6).
pub struct NamedHandle {
    name: String,
    dir: Arc<Mutex<MemoryDir>>,
}

impl NamedHandle {
    /// The name this handle was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared access to the underlying directory.
    pub fn dir(&self) -> &Arc<Mutex<MemoryDir>> {
        &self.dir
    }

    /// Release this handle. Decrements the registry's refcount for `name`;
    /// at zero, removes the entry — unless the underlying directory is
    /// still registered under another name, in which case this fails with
    /// [`EngineError::MultiNamedDirectory`] and the entry is left alone.
    pub fn close(self) -> Result<()> {
        NamedRegistry::close(&self.name)
    }
}

/// The process-wide named-directory registry. A zero-sized handle onto the
/// module's single static map; all state lives in `REGISTRY`.
pub struct NamedRegistry;

impl NamedRegistry {
    /// Open (creating if necessary) the in-memory directory registered
    /// under `name`, incrementing its refcount.
    pub fn open(name: &str) -> NamedHandle {
        let mut registry = REGISTRY.lock().expect("registry mutex poisoned");
        let entry = registry.entry(name.to_string()).or_insert_with(|| {
            debug!(name, "creating new named in-memory directory");
            let mut aliases = BTreeSet::new();
            aliases.insert(name.to_string());
            Entry {
                dir: Arc::new(Mutex::new(MemoryDir::with_path(name))),
                refcount: 0,
                aliases,
            }
        });
        entry.refcount += 1;
        debug!(name, refcount = entry.refcount, "opened named directory");

        NamedHandle {
            name: name.to_string(),
            dir: entry.dir.clone(),
        }
    }

    /// Register the directory already known as `existing_name` under the
    /// additional name `new_name`, so both names resolve to the same
    /// instance. Neither name's refcount changes; `new_name` must not
    /// already be registered to something else.
    pub fn alias(existing_name: &str, new_name: &str) -> Result<()> {
        let mut registry = REGISTRY.lock().expect("registry mutex poisoned");
        if registry.contains_key(new_name) {
            return Err(EngineError::MultiNamedDirectory {
                name: new_name.to_string(),
            });
        }
        let dir = {
            let existing = registry.get(existing_name).ok_or_else(|| {
                EngineError::NotFound(existing_name.into())
            })?;
            existing.dir.clone()
        };
        if let Some(existing) = registry.get_mut(existing_name) {
            existing.aliases.insert(new_name.to_string());
        }
        let aliases = registry[existing_name].aliases.clone();
        registry.insert(
            new_name.to_string(),
            Entry {
                dir,
                refcount: 0,
                aliases,
            },
        );
        Ok(())
    }

    /// Decrement `name`'s refcount; at zero, remove it from the registry
    /// unless it is still registered under another name.
    fn close(name: &str) -> Result<()> {
        let mut registry = REGISTRY.lock().expect("registry mutex poisoned");
        let Some(entry) = registry.get_mut(name) else {
            return Ok(());
        };

        entry.refcount = entry.refcount.saturating_sub(1);
        debug!(name, refcount = entry.refcount, "closed named directory");
        if entry.refcount > 0 {
            return Ok(());
        }

        if entry.aliases.len() > 1 {
            return Err(EngineError::MultiNamedDirectory {
                name: name.to_string(),
            });
        }

        registry.remove(name);
        Ok(())
    }

    /// Number of live handles currently registered under `name`. Exposed
    /// for tests; not part of the external contract.
    #[cfg(test)]
    fn refcount(name: &str) -> usize {
        REGISTRY
            .lock()
            .expect("registry mutex poisoned")
            .get(name)
            .map(|e| e.refcount)
            .unwrap_or(0)
    }
}
