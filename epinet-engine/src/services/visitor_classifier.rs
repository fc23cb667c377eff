//! Known / anonymous visitor classification

use epinet_common::Result;
use std::collections::{BTreeSet, HashSet};

use crate::tenant::TenantContext;

/// Visitors with an identity mapping, read fresh from the tenant's store
pub async fn load_known_visitors(ctx: &TenantContext) -> Result<HashSet<String>> {
    ctx.store.known_visitor_ids().await
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorPartition {
    pub known: BTreeSet<String>,
    pub anonymous: BTreeSet<String>,
}

/// Split visitors into disjoint known and anonymous sets
pub fn partition<'a>(
    visitors: impl IntoIterator<Item = &'a String>,
    known: &HashSet<String>,
) -> VisitorPartition {
    let mut split = VisitorPartition::default();
    for visitor in visitors {
        if known.contains(visitor) {
            split.known.insert(visitor.clone());
        } else {
            split.anonymous.insert(visitor.clone());
        }
    }
    split
}
