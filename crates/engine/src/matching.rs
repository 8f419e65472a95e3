use crate::extract::project;
use crate::model::{Account, Identity};
use crate::similarity::lig3;

/// Identity pull partitioned by processing state for one source.
#[derive(Debug, Default)]
pub struct IdentitySets {
    /// Every non-protected identity on the tenant.
    pub all: Vec<Identity>,
    /// Identities already holding an account on the source under reconciliation.
    pub processed: Vec<Identity>,
    /// Identities anchored to an authoritative source but not yet linked here.
    pub unprocessed: Vec<Identity>,
}

/// Partition identities for a reconciliation pass against `source_id`.
///
/// Identities without an authoritative source anchor are neither processed
/// nor unprocessed; they stay in `all` only (not eligible for matching).
pub fn partition_identities(identities: Vec<Identity>, source_id: &str) -> IdentitySets {
    let mut sets = IdentitySets { all: identities, ..Default::default() };
    for identity in &sets.all {
        if identity.account_on(source_id).is_some() {
            sets.processed.push(identity.clone());
        } else if identity.authoritative_source().is_some() {
            sets.unprocessed.push(identity.clone());
        }
    }
    sets
}

/// Find the unique candidate whose attribute projection equals the entity's.
///
/// Ties never auto-resolve: two or more candidates sharing the identical
/// projection fall through to similarity scoring. An empty entity projection
/// (no configured attribute populated) never declares a match.
pub fn find_identical_match<'a>(
    identity: &Identity,
    candidates: &'a [Identity],
    attributes: &[String],
) -> Option<&'a Identity> {
    let wanted = project(&identity.attributes, attributes);
    if wanted.is_empty() {
        return None;
    }

    let mut hit: Option<&Identity> = None;
    for candidate in candidates {
        if project(&candidate.attributes, attributes) == wanted {
            if hit.is_some() {
                return None; // duplicate projection, ambiguous
            }
            hit = Some(candidate);
        }
    }
    hit
}

/// Average per-attribute LIG3 score for an identity against one candidate.
///
/// Attributes missing on either side contribute 0 to the average; the
/// divisor is always the configured attribute count. Callers must reject
/// empty attribute configurations up front.
fn identity_score(identity: &Identity, candidate: &Identity, attributes: &[String]) -> f64 {
    let mut total = 0.0;
    for attribute in attributes {
        if let (Some(iv), Some(cv)) = (identity.attr_str(attribute), candidate.attr_str(attribute))
        {
            total += lig3(iv, cv);
        }
    }
    total / attributes.len() as f64
}

/// Per-attribute score for an account: the account contributes both its
/// display name and its native identifier, and the better of the two counts.
fn account_score(account: &Account, candidate: &Identity, attributes: &[String]) -> f64 {
    let mut total = 0.0;
    for attribute in attributes {
        let Some(cv) = candidate.attr_str(attribute) else { continue };
        let by_name = account.name.as_deref().map_or(0.0, |n| lig3(n, cv));
        let by_native = lig3(&account.native_identity, cv);
        total += by_name.max(by_native);
    }
    total / attributes.len() as f64
}

/// All candidates whose averaged similarity clears the threshold.
///
/// `score` is a 0–100 percentage; qualifying candidates are returned in
/// input order, unranked.
pub fn find_similar_matches<'a>(
    identity: &Identity,
    candidates: &'a [Identity],
    attributes: &[String],
    score: u8,
) -> Vec<&'a Identity> {
    candidates
        .iter()
        .filter(|c| identity_score(identity, c, attributes) * 100.0 >= f64::from(score))
        .collect()
}

/// Account-based variant of [`find_similar_matches`] for orphan reconciliation.
pub fn find_account_similar_matches<'a>(
    account: &Account,
    candidates: &'a [Identity],
    attributes: &[String],
    score: u8,
) -> Vec<&'a Identity> {
    candidates
        .iter()
        .filter(|c| account_score(account, c, attributes) * 100.0 >= f64::from(score))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn identity(id: &str, attrs: &[(&str, &str)]) -> Identity {
        Identity {
            id: id.into(),
            name: id.into(),
            display_name: None,
            protected: false,
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), json!(v))).collect(),
            accounts: Vec::new(),
            source: None,
        }
    }

    fn account(native: &str, name: Option<&str>) -> Account {
        Account {
            id: "acc-1".into(),
            native_identity: native.into(),
            name: name.map(Into::into),
            source_id: "src-x".into(),
            source_name: "X".into(),
            identity_id: None,
            uncorrelated: true,
            attributes: HashMap::new(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_match_unique_winner() {
        let entity = identity("new", &[("uid", "X")]);
        let candidates = vec![identity("a", &[("uid", "X")]), identity("b", &[("uid", "Y")])];
        let hit = find_identical_match(&entity, &candidates, &names(&["uid"]));
        assert_eq!(hit.map(|i| i.id.as_str()), Some("a"));
    }

    #[test]
    fn identical_match_at_index_zero_resolves() {
        let entity = identity("new", &[("uid", "X")]);
        let candidates = vec![identity("only", &[("uid", "X")])];
        let hit = find_identical_match(&entity, &candidates, &names(&["uid"]));
        assert_eq!(hit.map(|i| i.id.as_str()), Some("only"));
    }

    #[test]
    fn identical_match_tie_does_not_resolve() {
        let entity = identity("new", &[("uid", "X")]);
        let candidates = vec![identity("a", &[("uid", "X")]), identity("b", &[("uid", "X")])];
        assert!(find_identical_match(&entity, &candidates, &names(&["uid"])).is_none());
    }

    #[test]
    fn empty_projection_never_matches() {
        let entity = identity("new", &[]);
        let candidates = vec![identity("a", &[])];
        assert!(find_identical_match(&entity, &candidates, &names(&["uid"])).is_none());
    }

    #[test]
    fn similarity_averaging_thresholds() {
        // average(lig3(John, Jon) = 6/7, lig3(Smith, Smith) = 1) ~ 0.93
        let entity = identity("new", &[("first", "John"), ("last", "Smith")]);
        let candidates = vec![identity("a", &[("first", "Jon"), ("last", "Smith")])];
        let attrs = names(&["first", "last"]);

        assert_eq!(find_similar_matches(&entity, &candidates, &attrs, 80).len(), 1);
        assert!(find_similar_matches(&entity, &candidates, &attrs, 95).is_empty());
    }

    #[test]
    fn missing_attribute_contributes_zero() {
        // Only "first" is comparable: average = lig3(John, John) / 2 = 0.5
        let entity = identity("new", &[("first", "John")]);
        let candidates = vec![identity("a", &[("first", "John"), ("last", "Smith")])];
        let attrs = names(&["first", "last"]);

        assert_eq!(find_similar_matches(&entity, &candidates, &attrs, 50).len(), 1);
        assert!(find_similar_matches(&entity, &candidates, &attrs, 60).is_empty());
    }

    #[test]
    fn empty_candidate_pool_yields_empty_result() {
        let entity = identity("new", &[("uid", "X")]);
        assert!(find_similar_matches(&entity, &[], &names(&["uid"]), 10).is_empty());
        assert!(find_identical_match(&entity, &[], &names(&["uid"])).is_none());
    }

    #[test]
    fn account_matching_takes_best_of_name_and_native_identity() {
        // Display name is unrelated, native identity is exact: max wins.
        let acc = account("jane.doe", Some("ZZZZ"));
        let candidates = vec![identity("a", &[("uid", "jane.doe")])];
        let hits = find_account_similar_matches(&acc, &candidates, &names(&["uid"]), 90);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn account_matching_without_display_name() {
        let acc = account("jane.doe", None);
        let candidates = vec![identity("a", &[("uid", "jane.doe")])];
        let hits = find_account_similar_matches(&acc, &candidates, &names(&["uid"]), 90);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn partition_excludes_unanchored_identities() {
        let mut linked = identity("linked", &[("authoritativeSource", "src-hr")]);
        linked.accounts.push(crate::model::AccountRef {
            id: "acc-1".into(),
            name: "jdoe".into(),
            source: Some(crate::model::SourceRef { id: "src-me".into(), name: "Me".into() }),
        });
        let anchored = identity("anchored", &[("authoritativeSource", "src-hr")]);
        let stray = identity("stray", &[]);

        let sets = partition_identities(vec![linked, anchored, stray], "src-me");
        assert_eq!(sets.processed.len(), 1);
        assert_eq!(sets.unprocessed.len(), 1);
        assert_eq!(sets.unprocessed[0].id, "anchored");
        assert_eq!(sets.all.len(), 3);
    }
}
