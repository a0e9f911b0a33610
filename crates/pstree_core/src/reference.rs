//! Registry of named, versioned sub-assembly references.

use std::collections::HashMap;

use thiserror::Error;

use crate::asset::AssetHandle;
use crate::structure::ReferenceDescriptor;

/// A reference name that is not in the registry at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Reference not found: {name} (version {version})")]
    NotFound { name: String, version: String },
}

/// How to pick a version when the requested one does not exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VersionFallback {
    /// The version registered first under the name
    #[default]
    FirstRegistered,

    /// The lexicographically lowest version string
    Lowest,

    /// The lexicographically highest version string
    Highest,
}

/// One sub-assembly from the reference list.
#[derive(Debug)]
pub struct ReferenceEntry {
    pub name: String,
    pub version: String,

    /// Asset location relative to the document folder
    pub url: String,

    /// Canonical asset, set the first time the entry is placed in the tree
    pub cached_asset: Option<AssetHandle>,
}

impl ReferenceEntry {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            url: url.into(),
            cached_asset: None,
        }
    }
}

impl From<&ReferenceDescriptor> for ReferenceEntry {
    fn from(desc: &ReferenceDescriptor) -> Self {
        Self::new(&desc.name, &desc.version, &desc.url)
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct Resolved<'a> {
    pub entry: &'a mut ReferenceEntry,

    /// The version that was asked for, when a different one was substituted
    pub fallback_from: Option<String>,
}

impl Resolved<'_> {
    /// Diagnostic for a substituted version, `None` on an exact match.
    pub fn fallback_message(&self) -> Option<String> {
        let requested = self.fallback_from.as_deref()?;
        Some(format!(
            "{} - Version not found: {}, using version {}",
            self.entry.name, requested, self.entry.version
        ))
    }
}

/// name -> version -> entry, with versions kept in registration order.
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    references: HashMap<String, Vec<ReferenceEntry>>,
    fallback: VersionFallback,
}

impl ReferenceRegistry {
    pub fn new(fallback: VersionFallback) -> Self {
        Self {
            references: HashMap::new(),
            fallback,
        }
    }

    /// Register every entry of a reference list.
    pub fn register_all(&mut self, references: &[ReferenceDescriptor]) {
        for desc in references {
            self.register(ReferenceEntry::from(desc));
        }
    }

    /// Register one entry. An existing (name, version) is replaced in place.
    pub fn register(&mut self, entry: ReferenceEntry) {
        let versions = self.references.entry(entry.name.clone()).or_default();
        match versions.iter_mut().find(|e| e.version == entry.version) {
            Some(existing) => {
                log::debug!(
                    "Reference {} {} registered twice, keeping the last",
                    entry.name,
                    entry.version
                );
                *existing = entry;
            }
            None => versions.push(entry),
        }
    }

    /// Look up `name` at `version`, substituting another version of the same
    /// name when the exact one is missing.
    pub fn resolve_mut(
        &mut self,
        name: &str,
        version: &str,
    ) -> Result<Resolved<'_>, ReferenceError> {
        let not_found = || ReferenceError::NotFound {
            name: name.to_string(),
            version: version.to_string(),
        };

        let fallback = self.fallback;
        let versions = self.references.get_mut(name).ok_or_else(not_found)?;

        if let Some(idx) = versions.iter().position(|e| e.version == version) {
            return Ok(Resolved {
                entry: &mut versions[idx],
                fallback_from: None,
            });
        }

        let idx = Self::fallback_index(versions, fallback).ok_or_else(not_found)?;
        let resolved = Resolved {
            entry: &mut versions[idx],
            fallback_from: Some(version.to_string()),
        };
        if let Some(message) = resolved.fallback_message() {
            log::warn!("{}", message);
        }
        Ok(resolved)
    }

    fn fallback_index(versions: &[ReferenceEntry], fallback: VersionFallback) -> Option<usize> {
        let by_version = versions.iter().enumerate();
        match fallback {
            VersionFallback::FirstRegistered => (!versions.is_empty()).then_some(0),
            VersionFallback::Lowest => by_version
                .min_by(|a, b| a.1.version.cmp(&b.1.version))
                .map(|(i, _)| i),
            VersionFallback::Highest => by_version
                .max_by(|a, b| a.1.version.cmp(&b.1.version))
                .map(|(i, _)| i),
        }
    }

    /// Look up the exact (name, version) pair.
    pub fn get(&self, name: &str, version: &str) -> Option<&ReferenceEntry> {
        self.references.get(name)?.iter().find(|e| e.version == version)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.references.contains_key(name)
    }

    /// Versions registered under `name`, in registration order.
    pub fn versions(&self, name: &str) -> Vec<&str> {
        self.references
            .get(name)
            .map(|versions| versions.iter().map(|e| e.version.as_str()).collect())
            .unwrap_or_default()
    }

    /// Total number of (name, version) entries.
    pub fn len(&self) -> usize {
        self.references.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}
