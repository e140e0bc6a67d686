/*!
 * Shared API key pool.
 *
 * Every key is in exactly one state: available, held by one worker, or
 * disabled. Disabled is terminal. All three sets live behind one mutex, so a
 * concurrent return can never slip a key back in between a disable and the
 * next checkout.
 */

use anyhow::{Context, Result};
use log::debug;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::path::Path;

#[derive(Debug, Default)]
struct PoolState {
    available: VecDeque<String>,
    held: HashSet<String>,
    disabled: HashSet<String>,
}

/// Thread-safe registry of API keys
#[derive(Debug, Default)]
pub struct KeyPool {
    state: Mutex<PoolState>,
}

impl KeyPool {
    /// Create a pool from keys in priority order; duplicates are dropped
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let available = keys
            .into_iter()
            .map(Into::into)
            .filter(|key| seen.insert(key.clone()))
            .collect();

        Self {
            state: Mutex::new(PoolState {
                available,
                ..Default::default()
            }),
        }
    }

    /// Take the next available key without waiting; `None` means no capacity left
    pub fn checkout(&self) -> Option<String> {
        let mut state = self.state.lock();
        while let Some(key) = state.available.pop_front() {
            if state.disabled.contains(&key) {
                continue;
            }
            state.held.insert(key.clone());
            return Some(key);
        }
        None
    }

    /// Permanently remove a key from circulation
    pub fn disable(&self, key: &str) {
        let mut state = self.state.lock();
        state.held.remove(key);
        state.available.retain(|k| k != key);
        state.disabled.insert(key.to_string());
    }

    /// Hand a held key back; ignored for disabled keys and keys not checked out
    pub fn give_back(&self, key: &str) {
        let mut state = self.state.lock();
        if state.disabled.contains(key) || !state.held.remove(key) {
            return;
        }
        state.available.push_back(key.to_string());
    }

    /// Keys currently waiting to be checked out
    pub fn available_count(&self) -> usize {
        self.state.lock().available.len()
    }

    /// Keys permanently disabled so far
    pub fn disabled_count(&self) -> usize {
        self.state.lock().disabled.len()
    }

    pub fn is_disabled(&self, key: &str) -> bool {
        self.state.lock().disabled.contains(key)
    }
}

/// Load keys from a newline-delimited file and a comma-delimited override list
///
/// File keys come first, then override keys; blanks are skipped and duplicates
/// keep their first position. A missing file is not an error.
pub fn load_keys(keys_file: Option<&Path>, overrides: Option<&str>) -> Result<Vec<String>> {
    let mut keys = Vec::new();

    if let Some(path) = keys_file {
        if path.is_file() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read keys file: {:?}", path))?;
            keys.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string),
            );
        } else {
            debug!("Keys file {:?} not found, relying on override list", path);
        }
    }

    if let Some(list) = overrides {
        keys.extend(
            list.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        );
    }

    let mut seen = HashSet::new();
    keys.retain(|k| seen.insert(k.clone()));
    Ok(keys)
}

/// Short, log-safe form of a key
pub fn key_prefix(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{}…", prefix)
}
