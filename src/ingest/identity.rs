//! Identity resolution: raw names from collection output to graph keys
//!
//! Collection tools report hosts sometimes as short names and sometimes as
//! FQDNs, while the baseline graph may have been seeded with either form.
//! Host lookups therefore try an ordered list of candidates, most specific
//! first, and the first one that hits wins.

use crate::graph::PropertyValue;
use std::fmt;

/// Canonical key of a graph entity (`name` for computers and users,
/// `objectid` for GPOs)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn new(key: impl Into<String>) -> Self {
        Identity(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Identity> for PropertyValue {
    fn from(identity: &Identity) -> Self {
        PropertyValue::String(identity.0.clone())
    }
}

/// `{NAME}.{DOMAIN}`, upper-cased
fn qualified(raw_name: &str, domain: &str) -> Identity {
    Identity(format!("{}.{}", raw_name.to_uppercase(), domain.to_uppercase()))
}

/// Host candidates in lookup order: fully qualified, then bare.
pub fn resolve_host(raw_name: &str, domain: &str) -> Vec<Identity> {
    vec![qualified(raw_name, domain), Identity(raw_name.to_uppercase())]
}

/// Host side of a session observation. Only the qualified form is used.
pub fn resolve_session_host(raw_host: &str, domain: &str) -> Identity {
    qualified(raw_host, domain)
}

/// User side of a session observation: `{USER}@{DOMAIN}`.
///
/// Any realm already on the raw user is dropped and replaced with the
/// target domain, so users seen through a trust land in the target
/// domain's namespace.
pub fn resolve_session_user(raw_user: &str, domain: &str) -> Identity {
    let user = raw_user.split('@').next().unwrap_or_default();
    Identity(format!("{}@{}", user, domain).to_uppercase())
}

/// GPOs are keyed by their literal objectid.
pub fn resolve_gpo(objectid: &str) -> Identity {
    Identity(objectid.to_string())
}

/// Owned marking looks a node up by its upper-cased name, whatever its label.
pub fn resolve_owned(raw_name: &str) -> Identity {
    Identity(raw_name.trim().to_uppercase())
}

/// Try each candidate in order and return the first one `lookup` finds,
/// together with what it found. Lookup errors stop the chain immediately.
pub fn first_match<'a, T, E>(
    candidates: impl IntoIterator<Item = &'a Identity>,
    mut lookup: impl FnMut(&Identity) -> Result<Option<T>, E>,
) -> Result<Option<(Identity, T)>, E> {
    for candidate in candidates {
        if let Some(found) = lookup(candidate)? {
            return Ok(Some((candidate.clone(), found)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_host_order() {
        let candidates = resolve_host("wkstn01", "lab.local");
        assert_eq!(
            candidates,
            vec![Identity::new("WKSTN01.LAB.LOCAL"), Identity::new("WKSTN01")]
        );
    }

    #[test]
    fn test_resolve_host_already_qualified() {
        let candidates = resolve_host("srv02.lab.local", "LAB.local");
        assert_eq!(candidates[0].as_str(), "SRV02.LAB.LOCAL.LAB.LOCAL");
        assert_eq!(candidates[1].as_str(), "SRV02.LAB.LOCAL");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        assert_eq!(resolve_host("Dc01", "lab.local"), resolve_host("Dc01", "lab.local"));
        assert_eq!(
            resolve_session_user("alice", "lab.local"),
            resolve_session_user("alice", "lab.local")
        );
    }

    #[test]
    fn test_resolve_session_user_restamps_realm() {
        assert_eq!(
            resolve_session_user("alice@other.realm", "lab.local").as_str(),
            "ALICE@LAB.LOCAL"
        );
        assert_eq!(resolve_session_user("bob", "lab.local").as_str(), "BOB@LAB.LOCAL");
        assert_eq!(resolve_session_user("carol@a@b", "lab.local").as_str(), "CAROL@LAB.LOCAL");
    }

    #[test]
    fn test_resolve_session_host() {
        assert_eq!(resolve_session_host("wkstn01", "lab.local").as_str(), "WKSTN01.LAB.LOCAL");
    }

    #[test]
    fn test_resolve_gpo_is_literal() {
        let id = "{31B2F340-016D-11D2-945F-00C04FB984F9}";
        assert_eq!(resolve_gpo(id).as_str(), id);
        assert_eq!(resolve_gpo("s-1-5-gpo").as_str(), "s-1-5-gpo");
    }

    #[test]
    fn test_resolve_owned() {
        assert_eq!(resolve_owned(" wkstn01 ").as_str(), "WKSTN01");
    }

    #[test]
    fn test_first_match_falls_back() {
        let candidates = resolve_host("wkstn01", "lab.local");
        let mut tried = Vec::new();
        let hit = first_match(&candidates, |id| {
            tried.push(id.clone());
            Ok::<_, ()>((id.as_str() == "WKSTN01").then_some(42))
        })
        .unwrap();

        assert_eq!(hit, Some((Identity::new("WKSTN01"), 42)));
        assert_eq!(tried.len(), 2);
    }

    #[test]
    fn test_first_match_stops_on_first_hit_and_error() {
        let candidates = resolve_host("wkstn01", "lab.local");
        let mut calls = 0;
        let hit = first_match(&candidates, |_| {
            calls += 1;
            Ok::<_, ()>(Some(()))
        })
        .unwrap();
        assert_eq!(hit.unwrap().0.as_str(), "WKSTN01.LAB.LOCAL");
        assert_eq!(calls, 1);

        let err = first_match(&candidates, |_| Err::<Option<()>, _>("down"));
        assert_eq!(err, Err("down"));
    }

    #[test]
    fn test_no_candidate_matches() {
        let candidates = resolve_host("ghost99", "lab.local");
        let hit = first_match(&candidates, |_| Ok::<Option<()>, ()>(None)).unwrap();
        assert!(hit.is_none());
    }
}
