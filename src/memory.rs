// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Working memory: the data bus passed between pipes
//!
//! An insertion-ordered map of named stuff plus an alias table. Every alias
//! resolves to an existing entry; `main_stuff` marks the current primary
//! output. Pipes only add or replace entries.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::errors::{PipeworksError, PipeworksResult};
use crate::stuff::Stuff;

/// Alias naming the current primary output
pub const MAIN_STUFF_NAME: &str = "main_stuff";

#[derive(Debug, Clone, Default)]
pub struct WorkingMemory {
    root: IndexMap<String, Arc<Stuff>>,
    aliases: IndexMap<String, String>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory holding a single stuff, which is also the main stuff
    pub fn from_stuff(stuff: Stuff) -> Self {
        let mut memory = Self::new();
        let name = stuff.name.clone();
        memory.set_new_main_stuff(stuff, &name);
        memory
    }

    /// Memory holding one text under `name`
    pub fn from_text(name: &str, text: &str) -> Self {
        Self::from_stuff(Stuff::text(name, text))
    }

    /// Memory holding several stuffs; the first becomes the main stuff
    pub fn from_stuffs(stuffs: Vec<Stuff>) -> Self {
        let mut memory = Self::new();
        for (i, stuff) in stuffs.into_iter().enumerate() {
            let name = stuff.name.clone();
            if i == 0 {
                memory.set_new_main_stuff(stuff, &name);
            } else {
                memory.add_new_stuff(&name, stuff);
            }
        }
        memory
    }

    /// Insert or replace a named entry
    ///
    /// An alias with the same name is dropped so the entry is reachable.
    pub fn add_new_stuff(&mut self, name: &str, stuff: Stuff) -> Arc<Stuff> {
        let stuff = if stuff.name == name {
            stuff
        } else {
            stuff.renamed(name)
        };
        let stuff = Arc::new(stuff);
        self.aliases.shift_remove(name);
        self.root.insert(name.to_string(), Arc::clone(&stuff));
        stuff
    }

    /// Insert an entry and make it the main stuff
    pub fn set_new_main_stuff(&mut self, stuff: Stuff, name: &str) -> Arc<Stuff> {
        let stuff = self.add_new_stuff(name, stuff);
        self.aliases
            .insert(MAIN_STUFF_NAME.to_string(), name.to_string());
        stuff
    }

    /// Point `alias` at an existing entry
    pub fn set_alias(&mut self, alias: &str, target: &str) -> PipeworksResult<()> {
        let canonical = self
            .canonical_name(target)
            .map(str::to_string)
            .ok_or_else(|| PipeworksError::AliasTargetMissing {
                alias: alias.to_string(),
                target: target.to_string(),
            })?;
        if canonical != alias {
            self.aliases.insert(alias.to_string(), canonical);
        }
        Ok(())
    }

    /// Name of the root entry `name` refers to, following aliases
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if let Some((key, _)) = self.root.get_key_value(name) {
            return Some(key.as_str());
        }
        self.aliases
            .get(name)
            .filter(|target| self.root.contains_key(target.as_str()))
            .map(String::as_str)
    }

    pub fn get_optional_stuff(&self, name: &str) -> Option<&Arc<Stuff>> {
        self.canonical_name(name).and_then(|n| self.root.get(n))
    }

    pub fn get_stuff(&self, name: &str) -> PipeworksResult<&Arc<Stuff>> {
        self.get_optional_stuff(name)
            .ok_or_else(|| PipeworksError::StuffNotFound {
                name: name.to_string(),
            })
    }

    pub fn main_stuff(&self) -> PipeworksResult<&Arc<Stuff>> {
        self.get_stuff(MAIN_STUFF_NAME)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_optional_stuff(name).is_some()
    }

    /// Root entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<Stuff>)> {
        self.root.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.root.keys()
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&String, &String)> {
        self.aliases.iter()
    }

    /// Number of root entries; aliases are not counted
    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Template context: every entry and alias mapped to its content value
    pub fn template_context(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut context: serde_json::Map<String, serde_json::Value> = self
            .root
            .iter()
            .map(|(name, stuff)| (name.clone(), stuff.content.to_template_value()))
            .collect();

        for (alias, target) in &self.aliases {
            if let Some(stuff) = self.root.get(target) {
                context
                    .entry(alias.clone())
                    .or_insert_with(|| stuff.content.to_template_value());
            }
        }

        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stuff::StuffContent;

    #[test]
    fn test_single_stuff_is_main() {
        let memory = WorkingMemory::from_text("input_text", "Hello world");
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.main_stuff().unwrap().name, "input_text");
    }

    #[test]
    fn test_empty_memory() {
        let memory = WorkingMemory::new();
        assert!(memory.is_empty());
        assert!(matches!(
            memory.main_stuff(),
            Err(PipeworksError::StuffNotFound { .. })
        ));
    }

    #[test]
    fn test_aliases_resolve_to_same_stuff() {
        let mut memory = WorkingMemory::from_text("question", "Why?");
        memory.set_alias("query", "question").unwrap();
        memory.set_alias("prompt", "query").unwrap();

        let a = memory.get_stuff("question").unwrap();
        let b = memory.get_stuff("query").unwrap();
        let c = memory.get_stuff("prompt").unwrap();
        assert!(Arc::ptr_eq(a, b));
        assert!(Arc::ptr_eq(a, c));
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn test_alias_target_must_exist() {
        let mut memory = WorkingMemory::new();
        let err = memory.set_alias("query", "question").unwrap_err();
        assert!(matches!(err, PipeworksError::AliasTargetMissing { .. }));
    }

    #[test]
    fn test_new_entry_shadows_alias() {
        let mut memory = WorkingMemory::from_text("question", "Why?");
        memory.set_alias("answer", "question").unwrap();
        memory.add_new_stuff("answer", Stuff::text("answer", "Because"));

        let answer = memory.get_stuff("answer").unwrap();
        assert_eq!(answer.content, StuffContent::text("Because"));
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_replacement_keeps_order() {
        let mut memory = WorkingMemory::from_stuffs(vec![
            Stuff::text("a", "1"),
            Stuff::text("b", "2"),
        ]);
        memory.add_new_stuff("a", Stuff::text("a", "3"));

        let names: Vec<_> = memory.names().cloned().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(
            memory.get_stuff("a").unwrap().content,
            StuffContent::text("3")
        );
    }

    #[test]
    fn test_template_context_includes_aliases() {
        let mut memory = WorkingMemory::from_text("input_text", "Hello");
        memory.set_alias("greeting", "input_text").unwrap();

        let context = memory.template_context();
        assert_eq!(context["input_text"], serde_json::json!("Hello"));
        assert_eq!(context["greeting"], serde_json::json!("Hello"));
        assert_eq!(context[MAIN_STUFF_NAME], serde_json::json!("Hello"));
    }
}
