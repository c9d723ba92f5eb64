//! Environment-variable key segmentation.
//!
//! Underscores in an environment variable are ambiguous: `FOO_BAR_BAZ` may
//! mean `foo.bar.baz`, `foo.bar-baz`, or `foo-bar.baz`. The resolver stores
//! every plausible segmentation so a lookup succeeds under any of them.

use dashmap::DashMap;
use std::sync::Arc;

/// Separator combinations explode as 2^n; past this many separators only the
/// fully-dotted and fully-hyphenated forms are generated.
const MAX_SEPARATORS: usize = 10;

/// Computes and caches candidate property names for environment variables.
///
/// Constructed explicitly and injected into the resolver so tests can supply
/// isolated instances. `fork` creates a child that reads through to an
/// already-populated parent while caching its own computations locally.
#[derive(Debug, Default)]
pub struct EnvironmentProperties {
    parent: Option<Arc<EnvironmentProperties>>,
    computed: DashMap<String, Arc<Vec<String>>>,
}

impl EnvironmentProperties {
    /// Create an empty, standalone instance.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a child instance sharing `parent`'s already-computed names.
    pub fn fork(parent: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(Arc::clone(parent)),
            computed: DashMap::new(),
        })
    }

    /// Every plausible dotted/hyphenated segmentation of `name`, in
    /// deterministic order: the fully-dotted form first, the form with only
    /// the last segment hyphenated second.
    pub fn find_property_names_for_environment_variable(&self, name: &str) -> Arc<Vec<String>> {
        if let Some(hit) = self.cached(name) {
            return hit;
        }
        let computed = Arc::new(compute_candidates(name));
        self.computed.insert(name.to_string(), Arc::clone(&computed));
        computed
    }

    fn cached(&self, name: &str) -> Option<Arc<Vec<String>>> {
        self.computed
            .get(name)
            .map(|entry| Arc::clone(&entry))
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.cached(name)))
    }
}

fn compute_candidates(name: &str) -> Vec<String> {
    let lowered = name.to_ascii_lowercase();
    let parts: Vec<&str> = lowered.split('_').filter(|part| !part.is_empty()).collect();
    if parts.is_empty() {
        return Vec::new();
    }
    if parts.len() == 1 {
        return vec![parts[0].to_string()];
    }
    let separators = parts.len() - 1;
    if separators > MAX_SEPARATORS {
        return vec![parts.join("."), parts.join("-")];
    }
    let mut names = Vec::with_capacity(1 << separators);
    for mask in 0u32..(1u32 << separators) {
        let mut candidate = String::with_capacity(lowered.len());
        for (position, part) in parts.iter().enumerate() {
            if position > 0 {
                // the low bit drives the last separator, so mask 0 is the
                // fully-dotted form and mask 1 hyphenates only the last segment
                let bit = separators - position;
                candidate.push(if (mask >> bit) & 1 == 1 { '-' } else { '.' });
            }
            candidate.push_str(part);
        }
        names.push(candidate);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn two_segments() {
        let env = EnvironmentProperties::empty();
        let names = env.find_property_names_for_environment_variable("FOO_BAR");
        assert_eq!(*names, vec!["foo.bar".to_string(), "foo-bar".to_string()]);
    }

    #[test]
    fn three_segments_in_documented_order() {
        let env = EnvironmentProperties::empty();
        let names = env.find_property_names_for_environment_variable("FOO_BAR_BAZ");
        assert_eq!(
            *names,
            vec![
                "foo.bar.baz".to_string(),
                "foo.bar-baz".to_string(),
                "foo-bar.baz".to_string(),
                "foo-bar-baz".to_string(),
            ]
        );
    }

    #[test]
    fn single_segment() {
        let env = EnvironmentProperties::empty();
        let names = env.find_property_names_for_environment_variable("PORT");
        assert_eq!(*names, vec!["port".to_string()]);
    }

    #[test]
    fn fork_reads_parent_cache() {
        let parent = EnvironmentProperties::empty();
        let from_parent = parent.find_property_names_for_environment_variable("FOO_BAR");
        let child = EnvironmentProperties::fork(&parent);
        let from_child = child.find_property_names_for_environment_variable("FOO_BAR");
        assert!(Arc::ptr_eq(&from_parent, &from_child));
    }

    #[test]
    fn oversized_names_fall_back_to_two_forms() {
        let env = EnvironmentProperties::empty();
        let name = "A_B_C_D_E_F_G_H_I_J_K_L";
        let names = env.find_property_names_for_environment_variable(name);
        assert_eq!(
            *names,
            vec!["a.b.c.d.e.f.g.h.i.j.k.l".to_string(), "a-b-c-d-e-f-g-h-i-j-k-l".to_string()]
        );
    }

    proptest! {
        #[test]
        fn candidates_are_deterministic_and_lead_with_dotted_form(
            name in "[A-Z]{1,6}(_[A-Z]{1,6}){0,4}",
        ) {
            let env = EnvironmentProperties::empty();
            let first = env.find_property_names_for_environment_variable(&name);
            let again = compute_candidates(&name);
            prop_assert_eq!((*first).clone(), again);
            let expected_first = name.to_ascii_lowercase().replace('_', ".");
            prop_assert_eq!(first[0].as_str(), expected_first.as_str());
        }
    }
}
