//! Player name registry
//!
//! Names are keyed by a stable per-player identifier chosen by the client
//! (not the connection id), so a player who drops and comes back recovers
//! the same name. Requested names are normalized and made unique by
//! appending `-2`, `-3`, ... to the base; a conflict is never an error.
//!
//! Entries are not released when a player disconnects. The registry is only
//! cleared by dropping it or by an explicit [`SharedNames::reset`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use heck::ToKebabCase;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Defines the style of automatically generated guest names
#[derive(Debug, Clone, Copy, Deserialize, Serialize, garde::Validate)]
pub enum NameStyle {
    /// Roman-style names (praenomen + nomen, optionally + cognomen)
    Roman(#[garde(range(min = 2, max = 3))] usize),
    /// Pet-style names (adjective + animal combinations)
    Petname(#[garde(range(min = 2, max = 3))] usize),
}

impl Default for NameStyle {
    /// Default name style is Petname with 2 words
    fn default() -> Self {
        Self::Petname(2)
    }
}

impl NameStyle {
    /// Generates a random base name in kebab case
    ///
    /// An empty string comes back only if the generator fails, which the
    /// registry then replaces with the default base.
    pub fn get_name(&self) -> String {
        match self {
            Self::Roman(count) => romanname::romanname(romanname::NameConfig {
                praenomen: *count > 2,
            }),
            Self::Petname(count) => petname::petname(*count as u8, " ").unwrap_or_default(),
        }
        .to_kebab_case()
    }
}

/// Turns a requested name into a registry base
///
/// Trims, lowercases and cuts to the length limit. Empty or inappropriate
/// requests fall back to [`constants::names::DEFAULT_BASE`].
pub fn normalize(requested: &str) -> String {
    let trimmed = rustrict::trim_whitespace(requested).to_lowercase();
    let cut: String = trimmed
        .chars()
        .take(constants::names::MAX_LENGTH)
        .collect();
    let cut = cut.trim_end();

    if cut.is_empty() || cut.is_inappropriate() {
        constants::names::DEFAULT_BASE.to_owned()
    } else {
        cut.to_owned()
    }
}

/// Identifier to name assignments
#[derive(Debug, Default, Clone)]
pub struct Names {
    /// Primary mapping from identifier to assigned name
    mapping: HashMap<String, String>,
    /// Reverse mapping from assigned name to identifier
    owners: HashMap<String, String>,
}

impl Names {
    /// Returns the identifier's name, assigning one if it has none
    ///
    /// Calling this again with the same identifier returns the same name no
    /// matter what is requested the second time.
    pub fn assign(&mut self, identifier: &str, requested: &str) -> String {
        if let Some(name) = self.mapping.get(identifier) {
            return name.clone();
        }
        self.claim(identifier, &normalize(requested))
    }

    /// Replaces the identifier's name with a fresh one built from `requested`
    ///
    /// The old name becomes available to others. Asking for the current
    /// base again returns the current name.
    pub fn rename(&mut self, identifier: &str, requested: &str) -> String {
        let base = normalize(requested);
        if let Some(old) = self.mapping.remove(identifier) {
            self.owners.remove(&old);
        }
        self.claim(identifier, &base)
    }

    /// The identifier's assigned name, if any
    pub fn lookup(&self, identifier: &str) -> Option<&str> {
        self.mapping.get(identifier).map(String::as_str)
    }

    /// Number of assigned names
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Whether no name is assigned
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Forgets every assignment
    pub fn clear(&mut self) {
        self.mapping.clear();
        self.owners.clear();
    }

    fn claim(&mut self, identifier: &str, base: &str) -> String {
        let name = std::iter::once(base.to_owned())
            .chain((2u32..).map(|n| format!("{base}-{n}")))
            .find(|candidate| {
                self.owners
                    .get(candidate)
                    .is_none_or(|owner| owner == identifier)
            })
            .unwrap_or_else(|| base.to_owned());

        self.mapping.insert(identifier.to_owned(), name.clone());
        self.owners.insert(name.clone(), identifier.to_owned());

        name
    }
}

/// Cloneable handle to one registry shared by every lobby
///
/// All access goes through a single lock because name uniqueness spans
/// lobbies and rooms.
#[derive(Debug, Default, Clone)]
pub struct SharedNames(Arc<Mutex<Names>>);

impl SharedNames {
    fn with<R>(&self, f: impl FnOnce(&mut Names) -> R) -> R {
        let mut names = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut names)
    }

    /// See [`Names::assign`]
    pub fn assign(&self, identifier: &str, requested: &str) -> String {
        self.with(|names| names.assign(identifier, requested))
    }

    /// See [`Names::rename`]
    pub fn rename(&self, identifier: &str, requested: &str) -> String {
        self.with(|names| names.rename(identifier, requested))
    }

    /// See [`Names::lookup`]
    pub fn lookup(&self, identifier: &str) -> Option<String> {
        self.with(|names| names.lookup(identifier).map(ToOwned::to_owned))
    }

    /// Clears the registry, used when pairings are reshuffled
    pub fn reset(&self) {
        self.with(Names::clear);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_assign_is_idempotent() {
        let mut names = Names::default();
        let first = names.assign("device-1", "Ana");
        let second = names.assign("device-1", "Ana");
        let third = names.assign("device-1", "Somebody Else");
        assert_eq!(first, "ana");
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_same_base_gets_suffixes() {
        let mut names = Names::default();
        assert_eq!(names.assign("a", "Ana"), "ana");
        assert_eq!(names.assign("b", " ana "), "ana-2");
        assert_eq!(names.assign("c", "ANA"), "ana-3");
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_suffix_skips_names_taken_literally() {
        let mut names = Names::default();
        assert_eq!(names.assign("a", "ana-2"), "ana-2");
        assert_eq!(names.assign("b", "ana"), "ana");
        assert_eq!(names.assign("c", "ana"), "ana-3");
    }

    #[test]
    fn test_empty_and_blank_use_default_base() {
        let mut names = Names::default();
        assert_eq!(names.assign("a", ""), "player");
        assert_eq!(names.assign("b", "   \t"), "player-2");
    }

    #[test]
    fn test_inappropriate_names_use_default_base() {
        let mut names = Names::default();
        assert_eq!(names.assign("a", "shit"), "player");
    }

    #[test]
    fn test_long_names_are_cut() {
        let mut names = Names::default();
        let long = "abcdefghij".repeat(5);
        let cut = &long[..constants::names::MAX_LENGTH];

        assert_eq!(names.assign("a", &long), cut);
        assert_eq!(names.assign("b", &long), format!("{cut}-2"));
    }

    #[test]
    fn test_lookup() {
        let mut names = Names::default();
        assert_eq!(names.lookup("a"), None);
        names.assign("a", "Bo");
        assert_eq!(names.lookup("a"), Some("bo"));
    }

    #[test]
    fn test_rename_frees_old_name() {
        let mut names = Names::default();
        names.assign("a", "ana");
        assert_eq!(names.rename("a", "bo"), "bo");
        assert_eq!(names.lookup("a"), Some("bo"));
        assert_eq!(names.assign("b", "ana"), "ana");
    }

    #[test]
    fn test_rename_to_same_base_keeps_name() {
        let mut names = Names::default();
        names.assign("a", "ana");
        names.assign("b", "ana");
        assert_eq!(names.rename("b", "Ana"), "ana-2");
        assert_eq!(names.rename("a", "ana"), "ana");
    }

    #[test]
    fn test_distinct_identifiers_never_share_a_name() {
        let mut names = Names::default();
        let assigned: Vec<String> = (0..20)
            .map(|i| names.assign(&format!("id-{i}"), "same"))
            .collect();
        let mut unique = assigned.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), assigned.len());
    }

    #[test]
    fn test_shared_names_across_threads() {
        let shared = SharedNames::default();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.assign(&format!("id-{i}"), "crowd"))
            })
            .collect();
        let mut assigned: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assigned.sort();
        assigned.dedup();
        assert_eq!(assigned.len(), 8);
    }

    #[test]
    fn test_shared_names_reset() {
        let shared = SharedNames::default();
        shared.assign("a", "ana");
        assert_eq!(shared.lookup("a").as_deref(), Some("ana"));
        shared.reset();
        assert_eq!(shared.lookup("a"), None);
        assert_eq!(shared.assign("b", "ana"), "ana");
    }

    #[test]
    fn test_name_style_generates_kebab_names() {
        for style in [NameStyle::Petname(2), NameStyle::Roman(2), NameStyle::Roman(3)] {
            let name = style.get_name();
            assert!(!name.is_empty());
            assert!(!name.contains(' '));
            assert_eq!(name, name.to_lowercase());
        }
        assert_eq!(NameStyle::Petname(3).get_name().matches('-').count(), 2);
    }
}
