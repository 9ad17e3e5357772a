//! Search filters in the registry's facet language: an AND of OR-groups,
//! sent as a JSON array of arrays of `"key:value"` strings.

use super::types::ProjectType;

pub type Facets = Vec<Vec<String>>;

/// Build facets for a search.
///
/// The project type group is always present. Version and loader groups are
/// added when non-empty, except for modpacks: installing a modpack decides
/// the instance's version, so it is never scoped to an existing one.
pub fn build_facets(project_type: ProjectType, versions: &[String], loaders: &[String]) -> Facets {
    let mut facets = vec![vec![format!("project_type:{}", project_type)]];
    if project_type == ProjectType::Modpack {
        return facets;
    }

    let versions: Vec<String> = versions
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| format!("versions:{}", v))
        .collect();
    if !versions.is_empty() {
        facets.push(versions);
    }

    let loaders: Vec<String> = loaders
        .iter()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty() && l != "none" && l != "vanilla")
        .map(|l| format!("categories:{}", l))
        .collect();
    if !loaders.is_empty() {
        facets.push(loaders);
    }

    facets
}

pub fn facets_json(facets: &Facets) -> String {
    serde_json::to_string(facets).unwrap_or_else(|_| "[]".to_string())
}
