use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use landclaim_store::{StaticNameResolver, StaticWorlds, StoreConfig};
use landclaim_types::PlayerId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operator configuration file.
///
/// ```toml
/// worlds = ["world", "world_nether"]
///
/// [store]
/// root = "/srv/minecraft/plugins/GriefPreventionData"
///
/// [names]
/// Notch = "069a79f4-44e9-4726-a5be-fca90e38aaf5"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store: StoreConfig,
    /// Worlds that still exist. Empty accepts every world.
    pub worlds: Vec<String>,
    /// Historical player names for upgrading name-keyed data.
    pub names: BTreeMap<String, Uuid>,
}

impl CliConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("invalid configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Config file if given, defaults otherwise, with `root` taking precedence.
    pub fn resolve(path: Option<&Path>, root: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(root) = root {
            config.store.root = root;
        }
        Ok(config)
    }

    pub fn world_registry(&self) -> StaticWorlds {
        if self.worlds.is_empty() {
            StaticWorlds::unrestricted()
        } else {
            StaticWorlds::new(self.worlds.iter().cloned())
        }
    }

    pub fn name_resolver(&self) -> StaticNameResolver {
        let mut resolver = StaticNameResolver::new();
        for (name, uuid) in &self.names {
            resolver.insert(name, PlayerId::from_uuid(*uuid));
        }
        resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landclaim_store::{NameResolver, WorldRegistry};

    const SAMPLE: &str = r#"
worlds = ["world", "world_nether"]

[store]
root = "/srv/claims"
player_read_retries = 3

[names]
Notch = "069a79f4-44e9-4726-a5be-fca90e38aaf5"
"#;

    #[test]
    fn parses_full_file() {
        let config = CliConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.store.root, PathBuf::from("/srv/claims"));
        assert_eq!(config.store.player_read_retries, 3);
        assert_eq!(config.store.claim_extension, "json");
        assert_eq!(config.worlds.len(), 2);

        let worlds = config.world_registry();
        assert!(worlds.contains("world_nether"));
        assert!(!worlds.contains("world_the_end"));

        let expected: Uuid = "069a79f4-44e9-4726-a5be-fca90e38aaf5".parse().unwrap();
        assert_eq!(
            config.name_resolver().resolve("notch"),
            Some(PlayerId::from_uuid(expected))
        );
    }

    #[test]
    fn empty_file_accepts_every_world() {
        let config = CliConfig::from_toml_str("").unwrap();
        assert!(config.world_registry().contains("anything"));
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn root_flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landclaim.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = CliConfig::resolve(Some(&path), Some(PathBuf::from("/elsewhere"))).unwrap();
        assert_eq!(config.store.root, PathBuf::from("/elsewhere"));
        assert_eq!(config.store.player_read_retries, 3);
    }

    #[test]
    fn bad_uuid_is_rejected() {
        assert!(CliConfig::from_toml_str("[names]\nNotch = \"nope\"\n").is_err());
    }
}
