//! Text id usage scan across assets
//!
//! Assets expose the text ids they reference through [`StringReferences`].
//! Assets are scanned in parallel; results are merged sequentially into sorted
//! containers, so the outcome does not depend on worker completion order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

/// An asset that references localized texts
pub trait StringReferences {
    /// Name reported for the asset
    fn asset_name(&self) -> &str;

    /// Call `visit` once for every text id the asset references
    fn visit_text_ids(&self, visit: &mut dyn FnMut(u32));
}

/// Which assets use which text ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageIndex {
    usages: BTreeMap<u32, BTreeSet<String>>,
}

impl UsageIndex {
    /// Assets referencing `id`
    #[must_use]
    pub fn assets_using(&self, id: u32) -> Option<&BTreeSet<String>> {
        self.usages.get(&id)
    }

    /// Referenced text ids, ascending
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.usages.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &BTreeSet<String>)> {
        self.usages.iter().map(|(id, assets)| (*id, assets))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.usages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<u32, BTreeSet<String>> {
        self.usages
    }
}

/// Collect the text ids referenced by every asset
pub fn scan_usages<A>(assets: &[A]) -> UsageIndex
where
    A: StringReferences + Sync,
{
    scan_usages_with_progress(assets, |_, _| {})
}

/// Like [`scan_usages`], reporting `(scanned, total)` after each asset
pub fn scan_usages_with_progress<A, F>(assets: &[A], progress: F) -> UsageIndex
where
    A: StringReferences + Sync,
    F: Fn(usize, usize) + Send + Sync,
{
    let total = assets.len();
    let scanned = AtomicUsize::new(0);

    // Each worker only touches its own id set
    let per_asset: Vec<(&str, BTreeSet<u32>)> = assets
        .par_iter()
        .map(|asset| {
            let mut ids = BTreeSet::new();
            asset.visit_text_ids(&mut |id| {
                ids.insert(id);
            });

            let current = scanned.fetch_add(1, Ordering::SeqCst) + 1;
            progress(current, total);
            (asset.asset_name(), ids)
        })
        .collect();

    let mut index = UsageIndex::default();
    for (name, ids) in per_asset {
        for id in ids {
            index
                .usages
                .entry(id)
                .or_default()
                .insert(name.to_string());
        }
    }

    tracing::info!(
        "Usage scan finished: {} assets reference {} text ids",
        total,
        index.len()
    );
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Asset {
        name: String,
        ids: Vec<u32>,
    }

    impl StringReferences for Asset {
        fn asset_name(&self) -> &str {
            &self.name
        }

        fn visit_text_ids(&self, visit: &mut dyn FnMut(u32)) {
            for id in &self.ids {
                visit(*id);
            }
        }
    }

    fn asset(name: &str, ids: &[u32]) -> Asset {
        Asset {
            name: name.to_string(),
            ids: ids.to_vec(),
        }
    }

    #[test]
    fn test_scan_aggregates_sorted() {
        let assets = vec![
            asset("items/sword", &[3, 1, 3]),
            asset("items/axe", &[1]),
            asset("ui/menu", &[]),
        ];
        let index = scan_usages(&assets);

        assert_eq!(index.ids().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(
            index.assets_using(1).unwrap().iter().collect::<Vec<_>>(),
            vec!["items/axe", "items/sword"]
        );
        assert_eq!(index.assets_using(2), None);
    }

    #[test]
    fn test_scan_deterministic() {
        let assets: Vec<Asset> = (0..64u32)
            .map(|i| asset(&format!("asset{i:02}"), &[i % 5, 100]))
            .collect();
        let first = scan_usages(&assets);
        let second = scan_usages(&assets);

        assert_eq!(first, second);
        assert_eq!(first.assets_using(100).unwrap().len(), 64);
    }

    #[test]
    fn test_progress_reports_every_asset() {
        let assets = vec![asset("a", &[1]), asset("b", &[2]), asset("c", &[3])];
        let calls = AtomicUsize::new(0);
        let index = scan_usages_with_progress(&assets, |_, total| {
            assert_eq!(total, 3);
            calls.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(index.len(), 3);
    }
}
