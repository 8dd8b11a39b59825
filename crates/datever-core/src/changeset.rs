//! Date-ordered change sets and the folds over them
//!
//! A [`ChangeSet`] maps each version key to the changes introduced on that
//! date. For a requested version it selects every entry strictly newer than
//! the request ([`ChangeSet::active_changes`]). The selection folds two ways:
//!
//! - downgrade: newest entry first, `unapply`-ing each change, so the most
//!   recent change is peeled off before the ones underneath it;
//! - upgrade: oldest entry first, `apply`-ing each change in the order the
//!   changes were introduced.
//!
//! Changes grouped under one key always run in their declared order.
//!
//! Copyright (c) 2025 Datever Team
//! Licensed under the Apache-2.0 license

use crate::change::Change;
use crate::error::{Error, Result};
use crate::field::{FieldSet, Payload};
use crate::version::VersionIdentifier;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Every breaking change of one schema, keyed by the date it shipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    entries: BTreeMap<VersionIdentifier, Vec<Change>>,
}

impl ChangeSet {
    /// An empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a change set
    pub fn builder() -> ChangeSetBuilder {
        ChangeSetBuilder::new()
    }

    /// Register a change or group of changes under a version key
    pub fn insert(&mut self, version: VersionIdentifier, changes: Vec<Change>) -> Result<()> {
        if changes.is_empty() {
            return Err(Error::configuration(format!(
                "Change group for version {} is empty",
                version
            )));
        }
        match self.entries.entry(version) {
            Entry::Occupied(_) => Err(Error::configuration(format!(
                "Version {} is registered more than once",
                version
            ))),
            Entry::Vacant(slot) => {
                slot.insert(changes);
                Ok(())
            }
        }
    }

    /// Changes newer than `current`, or none when no version is bound
    pub fn active_changes(&self, current: Option<VersionIdentifier>) -> ActiveChanges<'_> {
        let Some(current) = current else {
            return ActiveChanges::default();
        };

        let entries: Vec<_> = self
            .entries
            .range(current..)
            .filter(|(version, _)| **version > current)
            .rev()
            .map(|(version, changes)| (*version, changes.as_slice()))
            .collect();

        tracing::debug!(
            version = %current,
            active = entries.len(),
            "selected active changes"
        );

        ActiveChanges { entries }
    }

    /// Every entry, newest first
    pub fn entries(&self) -> impl Iterator<Item = (VersionIdentifier, &[Change])> {
        self.entries
            .iter()
            .rev()
            .map(|(version, changes)| (*version, changes.as_slice()))
    }

    /// The most recent breaking change's version
    pub fn latest(&self) -> Option<VersionIdentifier> {
        self.entries.keys().next_back().copied()
    }

    /// Number of version keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The slice of a change set in effect for one request, newest first
#[derive(Debug, Clone, Default)]
pub struct ActiveChanges<'a> {
    entries: Vec<(VersionIdentifier, &'a [Change])>,
}

impl<'a> ActiveChanges<'a> {
    /// Number of selected version keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selected version keys, newest first
    pub fn versions(&self) -> impl Iterator<Item = VersionIdentifier> + '_ {
        self.entries.iter().map(|(version, _)| *version)
    }

    /// Whether the change set entry at `version` is selected
    pub fn contains(&self, version: VersionIdentifier) -> bool {
        self.entries.iter().any(|(v, _)| *v == version)
    }

    /// Changes in downgrade order: newest entry first, groups in list order
    pub fn downgrade_order(&self) -> impl Iterator<Item = (VersionIdentifier, &'a Change)> + '_ {
        self.entries
            .iter()
            .flat_map(|&(version, changes)| changes.iter().map(move |change| (version, change)))
    }

    /// Changes in upgrade order: oldest entry first, groups in list order
    pub fn upgrade_order(&self) -> impl Iterator<Item = (VersionIdentifier, &'a Change)> + '_ {
        self.entries
            .iter()
            .rev()
            .flat_map(|&(version, changes)| changes.iter().map(move |change| (version, change)))
    }

    /// Fold `unapply` over a field set
    pub fn downgrade_fields(&self, mut fields: FieldSet) -> Result<FieldSet> {
        for (version, change) in self.downgrade_order() {
            tracing::trace!(version = %version, change = %change, "unapplying change to fields");
            let (next, _) = change.unapply(Some(fields), None)?;
            fields = next.ok_or_else(|| Error::configuration("change dropped the field set"))?;
        }
        Ok(fields)
    }

    /// Fold `unapply` over a payload
    pub fn downgrade_payload(&self, mut payload: Payload) -> Result<Payload> {
        for (version, change) in self.downgrade_order() {
            tracing::trace!(version = %version, change = %change, "unapplying change to payload");
            let (_, next) = change.unapply(None, Some(payload))?;
            payload = next.ok_or_else(|| Error::configuration("change dropped the payload"))?;
        }
        Ok(payload)
    }

    /// Fold `apply` over a payload
    pub fn upgrade_payload(&self, mut payload: Payload) -> Result<Payload> {
        for (version, change) in self.upgrade_order() {
            tracing::trace!(version = %version, change = %change, "applying change to payload");
            payload = change.apply(payload)?;
        }
        Ok(payload)
    }
}

/// Builder for [`ChangeSet`] from date strings
#[derive(Debug, Default)]
pub struct ChangeSetBuilder {
    entries: Vec<(String, Vec<Change>)>,
}

impl ChangeSetBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single change at a version key
    pub fn change(mut self, version: impl Into<String>, change: Change) -> Self {
        self.entries.push((version.into(), vec![change]));
        self
    }

    /// Register an ordered group of changes at a version key
    pub fn group(mut self, version: impl Into<String>, changes: Vec<Change>) -> Self {
        self.entries.push((version.into(), changes));
        self
    }

    /// Build the change set
    pub fn build(self) -> Result<ChangeSet> {
        let mut set = ChangeSet::new();
        for (key, changes) in self.entries {
            let version = VersionIdentifier::parse(&key).map_err(|e| {
                Error::configuration(format!("Invalid change set key '{}': {}", key, e))
            })?;
            set.insert(version, changes)?;
        }
        Ok(set)
    }
}
