// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Domains: namespaces grouping concepts and pipes

use indexmap::IndexMap;
use serde::Serialize;

/// A domain and the prompt defaults its pipes inherit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub code: String,
    pub definition: Option<String>,
    pub system_prompt: Option<String>,
    pub system_prompt_to_structure: Option<String>,
    pub prompt_template_to_structure: Option<String>,
}

impl Domain {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Default::default()
        }
    }

    /// Fill empty fields from a later declaration of the same domain
    pub fn merge(&mut self, other: Domain) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.definition, other.definition);
        fill(&mut self.system_prompt, other.system_prompt);
        fill(
            &mut self.system_prompt_to_structure,
            other.system_prompt_to_structure,
        );
        fill(
            &mut self.prompt_template_to_structure,
            other.prompt_template_to_structure,
        );
    }
}

/// Domains by code
#[derive(Debug, Clone, Default)]
pub struct DomainLibrary {
    domains: IndexMap<String, Domain>,
}

impl DomainLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a domain, merging with an existing one of the same code
    pub fn add(&mut self, domain: Domain) {
        match self.domains.get_mut(&domain.code) {
            Some(existing) => existing.merge(domain),
            None => {
                self.domains.insert(domain.code.clone(), domain);
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&Domain> {
        self.domains.get(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn clear(&mut self) {
        self.domains.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domains_merge_by_code() {
        let mut library = DomainLibrary::new();
        library.add(Domain {
            definition: Some("Legal documents".into()),
            ..Domain::new("legal")
        });
        library.add(Domain {
            definition: Some("Ignored".into()),
            system_prompt: Some("You are a lawyer".into()),
            ..Domain::new("legal")
        });

        assert_eq!(library.len(), 1);
        let domain = library.get("legal").unwrap();
        assert_eq!(domain.definition.as_deref(), Some("Legal documents"));
        assert_eq!(domain.system_prompt.as_deref(), Some("You are a lawyer"));
    }
}
