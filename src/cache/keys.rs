//! Cache key convention.
//!
//! Items live under `{entity}:{tenant}:{id}` and list pages under
//! `{entity}:list:{tenant}:{descriptor}`, so a mutation can address one item precisely and
//! sweep all list pages of one tenant with a single prefix pattern.

use crate::domain::types::{RecordId, TenantId};

const LIST_SEGMENT: &str = "list";

pub fn item_key(namespace: &str, tenant: TenantId, id: RecordId) -> String {
    format!("{namespace}:{tenant}:{id}")
}

pub fn list_key(namespace: &str, tenant: TenantId, fingerprint: &str) -> String {
    format!("{namespace}:{LIST_SEGMENT}:{tenant}:{fingerprint}")
}

/// Glob matching every cached list page of `namespace` for `tenant`.
pub fn list_pattern(namespace: &str, tenant: TenantId) -> String {
    format!("{namespace}:{LIST_SEGMENT}:{tenant}:*")
}

/// Glob matching every cached item of `namespace` for `tenant`.
pub fn item_pattern(namespace: &str, tenant: TenantId) -> String {
    format!("{namespace}:{tenant}:*")
}

/// Glob match supporting `*` (any run) and `?` (any single character).
pub fn glob_matches(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let (mut p, mut c) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, c));
                p += 1;
            }
            Some(&ch) if ch == '?' || ch == candidate[c] => {
                p += 1;
                c += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    c = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|ch| *ch == '*')
}
