//! Capabilities the host runtime supplies to the store.
//!
//! The store never resolves identities or enumerates worlds itself. Legacy
//! upgrades consult a [`NameResolver`]; corner validation consults a
//! [`WorldRegistry`].

use std::collections::{BTreeSet, HashMap};

use landclaim_types::PlayerId;

/// Maps a historical player name to a stable identifier.
pub trait NameResolver: Send + Sync {
    /// Returns `None` when the name is unknown.
    fn resolve(&self, name: &str) -> Option<PlayerId>;
}

/// Answers whether a world referenced by stored coordinates still exists.
pub trait WorldRegistry: Send + Sync {
    fn contains(&self, world: &str) -> bool;
}

/// Resolver backed by a fixed name table. Lookups ignore ASCII case.
#[derive(Clone, Debug, Default)]
pub struct StaticNameResolver {
    names: HashMap<String, PlayerId>,
}

impl StaticNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, player: PlayerId) -> Self {
        self.insert(name, player);
        self
    }

    pub fn insert(&mut self, name: &str, player: PlayerId) {
        self.names.insert(name.to_ascii_lowercase(), player);
    }
}

impl NameResolver for StaticNameResolver {
    fn resolve(&self, name: &str) -> Option<PlayerId> {
        self.names.get(&name.to_ascii_lowercase()).copied()
    }
}

/// World registry backed by a fixed list. An unrestricted registry accepts
/// every world name.
#[derive(Clone, Debug, Default)]
pub struct StaticWorlds {
    worlds: Option<BTreeSet<String>>,
}

impl StaticWorlds {
    pub fn new<I, S>(worlds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            worlds: Some(worlds.into_iter().map(Into::into).collect()),
        }
    }

    pub fn unrestricted() -> Self {
        Self { worlds: None }
    }
}

impl WorldRegistry for StaticWorlds {
    fn contains(&self, world: &str) -> bool {
        self.worlds.as_ref().map_or(true, |w| w.contains(world))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_is_case_insensitive() {
        let id = PlayerId::random();
        let resolver = StaticNameResolver::new().with("Notch", id);
        assert_eq!(resolver.resolve("notch"), Some(id));
        assert_eq!(resolver.resolve("NOTCH"), Some(id));
        assert_eq!(resolver.resolve("jeb_"), None);
    }

    #[test]
    fn static_worlds_membership() {
        let worlds = StaticWorlds::new(["world", "world_nether"]);
        assert!(worlds.contains("world"));
        assert!(!worlds.contains("world_the_end"));
    }

    #[test]
    fn unrestricted_accepts_everything() {
        assert!(StaticWorlds::unrestricted().contains("anything"));
    }
}
