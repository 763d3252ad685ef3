// ABOUTME: Release naming for single- and multi-namespace packages.
// ABOUTME: Multi-namespace releases get a per-namespace suffix so they never share an identity.

use super::package::Package;
use crate::types::{ReleaseName, ReleaseNameError};

/// Release name for `package` deployed into `namespace`.
///
/// Single-namespace packages use the package name unchanged. Multi-namespace
/// packages become `<package>-<suffix>`, where the suffix is the namespace with
/// the shared prefix removed (`team-a` -> `a`).
pub fn release_name(
    package: &Package,
    namespace: &str,
    prefix: Option<&str>,
) -> Result<ReleaseName, ReleaseNameError> {
    if !package.multi_namespace {
        return ReleaseName::new(&package.name);
    }
    let suffix = namespace_suffix(namespace, &package.namespaces, prefix);
    ReleaseName::new(&format!("{}-{}", package.name, suffix))
}

/// Namespace with its shared environment prefix stripped.
///
/// An explicit `prefix` is tried first; otherwise the prefix shared by all
/// `siblings` up to the last hyphen is used. Falls back to the full namespace
/// rather than producing an empty suffix. Siblings whose stripped suffixes
/// collide all keep their full namespace, so suffixes stay unique.
pub fn namespace_suffix<'a>(namespace: &'a str, siblings: &[String], prefix: Option<&str>) -> &'a str {
    let shared = shared_prefix(siblings);
    let Some(index) = siblings.iter().position(|s| s == namespace) else {
        return stripped(namespace, prefix, &shared);
    };

    let resolved = unique_suffixes(siblings, prefix, &shared);
    let keep = resolved[index].len();
    &namespace[namespace.len() - keep..]
}

fn stripped<'a>(namespace: &'a str, prefix: Option<&str>, shared: &str) -> &'a str {
    let explicit = prefix.and_then(|p| namespace.strip_prefix(p));
    let derived = (!shared.is_empty())
        .then(|| namespace.strip_prefix(shared))
        .flatten();

    explicit
        .or(derived)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(namespace)
}

/// Stripped suffixes for every sibling, widened back to the full namespace
/// until no two distinct namespaces share one.
fn unique_suffixes<'a>(siblings: &'a [String], prefix: Option<&str>, shared: &str) -> Vec<&'a str> {
    let mut suffixes: Vec<&str> = siblings
        .iter()
        .map(|ns| stripped(ns, prefix, shared))
        .collect();

    loop {
        let colliding: Vec<usize> = (0..siblings.len())
            .filter(|&i| suffixes[i] != siblings[i])
            .filter(|&i| {
                (0..siblings.len())
                    .any(|j| j != i && siblings[j] != siblings[i] && suffixes[j] == suffixes[i])
            })
            .collect();
        if colliding.is_empty() {
            return suffixes;
        }
        for i in colliding {
            suffixes[i] = siblings[i].as_str();
        }
    }
}

/// Longest common prefix of two or more namespaces, cut back to a hyphen boundary.
fn shared_prefix(namespaces: &[String]) -> String {
    let [first, rest @ ..] = namespaces else {
        return String::new();
    };
    if rest.is_empty() {
        return String::new();
    }

    let mut len = first.len();
    for other in rest {
        len = first
            .bytes()
            .zip(other.bytes())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count();
    }

    match first.as_bytes()[..len].iter().rposition(|&b| b == b'-') {
        Some(idx) => first[..=idx].to_string(),
        None => String::new(),
    }
}
