use std::collections::BTreeMap;

use chainlift_core::ProjectManifest;

// Packages shipped as a family ("@scope/name" or "prefix-name") are expected
// to agree on their major version after an upgrade step.
pub(crate) fn family_key(name: &str) -> Option<String> {
    if let Some(rest) = name.strip_prefix('@') {
        let scope = rest.split('/').next()?;
        if !scope.is_empty() && rest.contains('/') {
            return Some(format!("@{scope}"));
        }
        return None;
    }

    let prefix = name.split('-').next()?;
    if prefix.len() < name.len() && !prefix.is_empty() {
        return Some(prefix.to_string());
    }
    None
}

pub(crate) fn family_mismatches(manifest: &ProjectManifest) -> Vec<String> {
    let mut families: BTreeMap<String, Vec<(&str, u64, String)>> = BTreeMap::new();
    for (name, version) in &manifest.dependencies {
        if let Some(key) = family_key(name) {
            families
                .entry(key)
                .or_default()
                .push((name, version.major, version.to_string()));
        }
    }

    let mut issues = Vec::new();
    for (family, members) in families {
        if members.len() < 2 {
            continue;
        }
        let newest = members
            .iter()
            .map(|(_, major, _)| *major)
            .max()
            .unwrap_or_default();
        for (name, major, version) in &members {
            if *major != newest {
                issues.push(format!(
                    "{name} {version} lags the {family} family (expected major {newest})"
                ));
            }
        }
    }
    issues
}
