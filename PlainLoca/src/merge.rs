//! Additive union merge of independently edited assets
//!
//! SPDX-License-Identifier: MIT
//!
//! There is no conflict detection: for texts present on both sides the
//! second operand wins, and reference lists only ever grow.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{Error, Result};
use crate::overlay::TextOverlay;

/// Kind name reported for string overlays
pub const STRINGS_KIND: &str = "ModifiedPlainLocalizationResource";

/// Union of two overlays of the same resource; `incoming` wins on conflicts
///
/// Neither input is modified. An identity mismatch is logged, not rejected.
#[must_use]
pub fn merge_overlays(base: &TextOverlay, incoming: &TextOverlay) -> TextOverlay {
    let mut merged = base.clone();
    merged.merge(incoming);
    merged
}

/// Stable identity of a pointer to an object in another asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExternalRef {
    pub file_guid: [u8; 16],
    pub class_guid: [u8; 16],
}

impl ExternalRef {
    #[must_use]
    pub const fn new(file_guid: [u8; 16], class_guid: [u8; 16]) -> Self {
        Self {
            file_guid,
            class_guid,
        }
    }
}

/// Mergeable content of a modified asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetData {
    /// Edits to a string resource
    Strings(TextOverlay),
    /// An asset whose content is a list of external references, e.g. an item
    /// list or a network registry
    ReferenceList { kind: String, refs: Vec<ExternalRef> },
    /// Content this crate cannot merge
    Opaque { kind: String, payload: Vec<u8> },
}

impl AssetData {
    /// Type name of the content
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            AssetData::Strings(_) => STRINGS_KIND,
            AssetData::ReferenceList { kind, .. } | AssetData::Opaque { kind, .. } => kind,
        }
    }
}

/// One modified asset as stored in a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetModification {
    pub name: String,
    pub added_bundles: Vec<String>,
    /// `None` if the project only adds the asset to bundles
    pub data: Option<AssetData>,
}

impl AssetModification {
    #[must_use]
    pub fn new(name: impl Into<String>, data: Option<AssetData>) -> Self {
        Self {
            name: name.into(),
            added_bundles: Vec::new(),
            data,
        }
    }

    #[must_use]
    pub fn with_bundles<I, S>(mut self, bundles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.added_bundles = bundles.into_iter().map(Into::into).collect();
        self
    }
}

/// Merge two modifications of the same asset
///
/// Returns `Ok(None)` if the content kind has no automatic merge; the caller
/// has to merge it manually.
///
/// # Errors
/// Returns [`Error::IncompatibleMerge`] if the two sides hold different kinds
/// of content.
pub fn merge_assets(
    first: &AssetModification,
    second: &AssetModification,
) -> Result<Option<AssetModification>> {
    let data = match (&first.data, &second.data) {
        (Some(a), Some(b)) => match merge_data(&first.name, a, b)? {
            Some(data) => Some(data),
            None => return Ok(None),
        },
        (Some(data), None) | (None, Some(data)) => Some(data.clone()),
        (None, None) => None,
    };

    Ok(Some(AssetModification {
        name: first.name.clone(),
        added_bundles: union_bundles(&first.added_bundles, &second.added_bundles),
        data,
    }))
}

fn merge_data(name: &str, first: &AssetData, second: &AssetData) -> Result<Option<AssetData>> {
    if first.kind() != second.kind() {
        return Err(Error::IncompatibleMerge {
            name: name.to_string(),
            left: first.kind().to_string(),
            right: second.kind().to_string(),
        });
    }

    match (first, second) {
        (AssetData::Strings(a), AssetData::Strings(b)) => {
            Ok(Some(AssetData::Strings(merge_overlays(a, b))))
        }
        (AssetData::ReferenceList { kind, refs }, AssetData::ReferenceList { refs: other, .. }) => {
            Ok(Some(AssetData::ReferenceList {
                kind: kind.clone(),
                refs: union_refs(refs, other),
            }))
        }
        _ => {
            tracing::warn!(
                "Cannot merge asset <{}> of type {}! You have to manually do that!",
                name,
                first.kind()
            );
            Ok(None)
        }
    }
}

/// First-seen order, missing refs of `other` appended
fn union_refs(refs: &[ExternalRef], other: &[ExternalRef]) -> Vec<ExternalRef> {
    let mut seen: HashSet<ExternalRef> = refs.iter().copied().collect();
    let mut merged = refs.to_vec();
    for external in other {
        if seen.insert(*external) {
            merged.push(*external);
        }
    }
    merged
}

fn union_bundles(first: &[String], second: &[String]) -> Vec<String> {
    first
        .iter()
        .chain(second)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Outcome of merging two projects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Merged assets, sorted by name
    pub merged: Vec<AssetModification>,
    /// Assets edited by both projects where one side had no content
    pub skipped: Vec<String>,
    /// Assets edited by both projects that need a manual merge
    pub manual: Vec<String>,
}

impl MergeReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty() && self.skipped.is_empty() && self.manual.is_empty()
    }
}

/// Union merge the assets two projects both modify
///
/// Assets modified by only one project are left out of the report.
///
/// # Errors
/// Returns [`Error::IncompatibleMerge`] if an asset holds different kinds of
/// content in the two projects.
pub fn union_merge_projects(
    first: &[AssetModification],
    second: &[AssetModification],
) -> Result<MergeReport> {
    let first: BTreeMap<&str, &AssetModification> =
        first.iter().map(|m| (m.name.as_str(), m)).collect();
    let second: BTreeMap<&str, &AssetModification> = second
        .iter()
        .filter(|m| first.contains_key(m.name.as_str()))
        .map(|m| (m.name.as_str(), m))
        .collect();

    let mut report = MergeReport::default();
    if second.is_empty() {
        tracing::info!("Projects contain no overlapping asset edits");
        return Ok(report);
    }
    tracing::info!("Projects contain <{}> overlapping asset edit(s)", second.len());

    for (name, theirs) in second {
        let ours = first[name];
        if ours.data.is_none() || theirs.data.is_none() {
            tracing::warn!(
                "Same asset <{}> of both projects had the first data missing: <{}> | second data missing: <{}>",
                name,
                ours.data.is_none(),
                theirs.data.is_none()
            );
            report.skipped.push(name.to_string());
            continue;
        }

        tracing::debug!("...trying to merge asset <{}>", name);
        match merge_assets(ours, theirs)? {
            Some(merged) => report.merged.push(merged),
            None => report.manual.push(name.to_string()),
        }
    }

    Ok(report)
}
