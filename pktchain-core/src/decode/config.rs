//! Configuration-driven decoder table.
//!
//! The mapping is read from properties text:
//!
//! ```text
//! # Packet.classFor.<TagKind>.<decimal value> = <decoder id>
//! Packet.classFor.EtherType.2048 = ipv4
//! Packet.classFor.IpNumber.6 = tcp
//! Packet.classFor.unknownNumber = unknown
//! ```
//!
//! Parsing is lenient: a bad entry is only reported when a lookup actually
//! reaches it, or up front through [`DecoderConfig::validate`]. Resolved
//! decoders are cached per tag until [`ConfiguredDecoderTable::clear_cache`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use compact_str::CompactString;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::table::{DecoderTable, Resolved};
use super::{BuiltinDecoder, Decoder, DecoderHandle};
use crate::error::ConfigError;
use crate::protocol::UnknownDecoder;
use crate::tag::{ProtocolTag, TagKind};

/// The only target kind decoders can be configured for.
pub const PACKET_TARGET: &str = "Packet";

const CLASS_FOR: &str = ".classFor.";
const UNKNOWN_NUMBER: &str = "unknownNumber";

/// Built-in mapping, equivalent to [`FixedDecoderTable::builtin`](super::FixedDecoderTable::builtin).
const BUILTIN_PROPERTIES: &str = include_str!("../../resources/decoders.properties");

/// One `key = value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: CompactString,
    pub value: CompactString,
}

/// What a well-formed decoder key selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyTarget {
    Mapping(TagKind, u32),
    Fallback,
}

/// Parsed decoder configuration.
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    entries: Vec<ConfigEntry>,
    mappings: HashMap<(TagKind, u32), usize>,
    fallback: Option<usize>,
    /// Decoder keys that can never match a lookup
    issues: Vec<ConfigError>,
}

impl DecoderConfig {
    /// Parse properties text. Never fails; see [`DecoderConfig::validate`].
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        for (key, value) in parse_properties(text) {
            let index = config.entries.len();
            match parse_key(&key, &value) {
                Ok(Some(KeyTarget::Mapping(kind, number))) => {
                    // Later entries win, as with any properties file
                    config.mappings.insert((kind, number), index);
                }
                Ok(Some(KeyTarget::Fallback)) => config.fallback = Some(index),
                Ok(None) => debug!(key = %key, "ignoring non-decoder property"),
                Err(e) => config.issues.push(e),
            }
            config.entries.push(ConfigEntry { key, value });
        }
        config
    }

    /// The built-in mapping.
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_PROPERTIES)
    }

    /// Every entry in file order, including ones that are not decoder keys.
    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    /// Entry mapped to a (kind, value) pair.
    pub fn mapping(&self, kind: TagKind, value: u32) -> Option<&ConfigEntry> {
        self.mappings.get(&(kind, value)).map(|&i| &self.entries[i])
    }

    /// Entry selecting the fallback decoder.
    pub fn fallback(&self) -> Option<&ConfigEntry> {
        self.fallback.map(|i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Every problem that would surface at lookup time, plus entries that
    /// can never be looked up at all. Each one is logged at `warn`.
    pub fn validate(&self, catalog: &DecoderCatalog) -> Vec<ConfigError> {
        let mut errors = self.issues.clone();
        for &index in self.mappings.values() {
            let entry = &self.entries[index];
            if let Err(e) = catalog.resolve(entry) {
                errors.push(e);
            }
        }
        if let Some(entry) = self.fallback() {
            if let Err(e) = catalog.resolve_fallback(entry) {
                errors.push(e);
            }
        }
        for e in &errors {
            warn!(error = %e, "invalid decoder configuration entry");
        }
        errors
    }
}

/// Split properties text into key/value pairs.
///
/// Supports `=`, `:` or whitespace separators, `#` and `!` comments and
/// backslash line continuations.
fn parse_properties(text: &str) -> Vec<(CompactString, CompactString)> {
    let mut pairs = Vec::new();
    let mut logical = String::new();
    for line in text.lines() {
        let line = line.trim_start();
        if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!'))
        {
            continue;
        }
        if let Some(continued) = line.strip_suffix('\\') {
            logical.push_str(continued);
            continue;
        }
        logical.push_str(line);
        pairs.push(split_pair(&logical));
        logical.clear();
    }
    if !logical.is_empty() {
        pairs.push(split_pair(&logical));
    }
    pairs
}

fn split_pair(line: &str) -> (CompactString, CompactString) {
    let end = line
        .find(|c: char| c == '=' || c == ':' || c.is_whitespace())
        .unwrap_or(line.len());
    let key = &line[..end];
    let rest = line[end..].trim_start();
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .unwrap_or(rest);
    (key.into(), rest.trim().into())
}

/// Classify a key. `Ok(None)` means it is not a decoder key at all.
fn parse_key(key: &str, value: &str) -> Result<Option<KeyTarget>, ConfigError> {
    let Some((target, selector)) = key.split_once(CLASS_FOR) else {
        return Ok(None);
    };
    if target != PACKET_TARGET {
        return Err(ConfigError::UnsupportedTarget {
            key: key.to_string(),
            target: target.to_string(),
        });
    }
    if selector == UNKNOWN_NUMBER {
        return Ok(Some(KeyTarget::Fallback));
    }
    let Some((kind_name, number)) = selector.split_once('.') else {
        return Err(ConfigError::UnknownTagKind {
            key: key.to_string(),
            kind: selector.to_string(),
        });
    };
    let kind: TagKind = kind_name.parse().map_err(|_| ConfigError::UnknownTagKind {
        key: key.to_string(),
        kind: kind_name.to_string(),
    })?;
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        value: number.to_string(),
    };
    if !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let number: u32 = number.parse().map_err(|_| invalid())?;
    if number > kind.max_value() {
        return Err(invalid());
    }
    if value.is_empty() {
        return Err(ConfigError::UnknownDecoder {
            key: key.to_string(),
            decoder: String::new(),
        });
    }
    Ok(Some(KeyTarget::Mapping(kind, number)))
}

/// Decoders that configuration may refer to, by identifier.
#[derive(Debug, Clone)]
pub struct DecoderCatalog {
    decoders: HashMap<CompactString, DecoderHandle>,
}

impl Default for DecoderCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DecoderCatalog {
    /// Catalog of every built-in decoder under its [`Decoder::name`].
    pub fn builtin() -> Self {
        let decoders = BuiltinDecoder::all()
            .into_iter()
            .map(|d| (CompactString::from(d.name()), DecoderHandle::Builtin(d)))
            .collect();
        Self { decoders }
    }

    /// Register a custom decoder under its name, replacing any previous one.
    pub fn register(&mut self, decoder: Arc<dyn Decoder>) {
        self.decoders
            .insert(decoder.name().into(), DecoderHandle::Custom(decoder));
    }

    pub fn get(&self, name: &str) -> Option<&DecoderHandle> {
        self.decoders.get(name)
    }

    /// Registered identifiers, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.decoders.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn resolve(&self, entry: &ConfigEntry) -> Result<DecoderHandle, ConfigError> {
        self.get(&entry.value)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownDecoder {
                key: entry.key.to_string(),
                decoder: entry.value.to_string(),
            })
    }

    fn resolve_fallback(&self, entry: &ConfigEntry) -> Result<DecoderHandle, ConfigError> {
        let handle = self.resolve(entry)?;
        if !handle.is_total() {
            return Err(ConfigError::InvalidFallback {
                key: entry.key.to_string(),
                decoder: entry.value.to_string(),
            });
        }
        Ok(handle)
    }
}

/// Cached resolutions for one configuration generation.
#[derive(Debug)]
struct CacheState {
    config: Arc<DecoderConfig>,
    generation: u64,
    resolved: HashMap<(TagKind, u32), Resolved>,
}

/// Decoder table backed by a [`DecoderConfig`].
///
/// Lookups take a read lock on the cache; a miss resolves outside the lock
/// and inserts under the write lock, unless the cache was cleared or the
/// configuration replaced in the meantime.
#[derive(Debug)]
pub struct ConfiguredDecoderTable {
    catalog: DecoderCatalog,
    state: RwLock<CacheState>,
}

impl ConfiguredDecoderTable {
    pub fn new(config: Arc<DecoderConfig>, catalog: DecoderCatalog) -> Self {
        debug!(mappings = config.len(), "decoder configuration loaded");
        Self {
            catalog,
            state: RwLock::new(CacheState {
                config,
                generation: 0,
                resolved: HashMap::new(),
            }),
        }
    }

    /// Table over the built-in mapping and decoders.
    pub fn builtin() -> Self {
        Self::new(Arc::new(DecoderConfig::builtin()), DecoderCatalog::builtin())
    }

    pub fn catalog(&self) -> &DecoderCatalog {
        &self.catalog
    }

    pub fn config(&self) -> Arc<DecoderConfig> {
        Arc::clone(&self.state.read().config)
    }

    /// Drop every cached resolution.
    pub fn clear_cache(&self) {
        let mut state = self.state.write();
        debug!(entries = state.resolved.len(), "clearing decoder cache");
        state.resolved.clear();
        state.generation += 1;
    }

    /// Swap in a new configuration and drop the cache atomically.
    pub fn reload(&self, config: Arc<DecoderConfig>) {
        let mut state = self.state.write();
        debug!(mappings = config.len(), "reloading decoder configuration");
        state.config = config;
        state.resolved.clear();
        state.generation += 1;
    }

    /// Number of cached resolutions.
    pub fn cached(&self) -> usize {
        self.state.read().resolved.len()
    }

    fn lookup(&self, config: &DecoderConfig, kind: TagKind, value: u32) -> Result<Resolved, ConfigError> {
        if let Some(entry) = config.mapping(kind, value) {
            return Ok(Resolved::Mapped(self.catalog.resolve(entry)?));
        }
        let fallback = match config.fallback() {
            Some(entry) => self.catalog.resolve_fallback(entry)?,
            None => DecoderHandle::Builtin(UnknownDecoder.into()),
        };
        Ok(Resolved::Fallback(fallback))
    }
}

impl DecoderTable for ConfiguredDecoderTable {
    fn resolve(&self, tag: &ProtocolTag) -> Result<Resolved, ConfigError> {
        let key = (tag.kind(), tag.value());
        let (config, generation) = {
            let state = self.state.read();
            if let Some(resolved) = state.resolved.get(&key) {
                return Ok(resolved.clone());
            }
            (Arc::clone(&state.config), state.generation)
        };

        let resolved = self.lookup(&config, key.0, key.1)?;

        let mut state = self.state.write();
        if state.generation != generation {
            // Invalidated while resolving; answer without caching
            return Ok(resolved);
        }
        Ok(state.resolved.entry(key).or_insert(resolved).clone())
    }
}

/// Loads configuration files once per path.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    cache: Mutex<HashMap<PathBuf, Arc<DecoderConfig>>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed configuration for `path`, read from disk on first use.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<DecoderConfig>, ConfigError> {
        let path = path.as_ref();
        if let Some(config) = self.cache.lock().get(path) {
            return Ok(Arc::clone(config));
        }

        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Arc::new(DecoderConfig::parse(&text));
        debug!(path = %path.display(), mappings = config.len(), "read decoder configuration");

        let mut cache = self.cache.lock();
        Ok(Arc::clone(cache.entry(path.to_path_buf()).or_insert(config)))
    }

    /// Forget every loaded file so the next `load` rereads it.
    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        debug!(files = cache.len(), "clearing configuration loader cache");
        cache.clear();
    }
}
