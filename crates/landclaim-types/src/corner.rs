use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A block position inside a named world.
///
/// Corners serialize as a single token `<world>:<x>,<y>,<z>`. The world name
/// is everything before the last `:`, so world names may themselves contain
/// colons (e.g. namespaced dimension keys).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Corner {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Corner {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{},{}", self.world, self.x, self.y, self.z)
    }
}

impl FromStr for Corner {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TypeError::InvalidCorner {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (world, coords) = s.rsplit_once(':').ok_or_else(|| invalid("missing ':'"))?;
        if world.is_empty() {
            return Err(invalid("empty world name"));
        }

        let mut parts = coords.split(',');
        let mut next = |axis: &str| -> Result<i32, TypeError> {
            parts
                .next()
                .ok_or_else(|| invalid(&format!("missing {axis} coordinate")))?
                .trim()
                .parse::<i32>()
                .map_err(|e| invalid(&format!("bad {axis} coordinate: {e}")))
        };
        let x = next("x")?;
        let y = next("y")?;
        let z = next("z")?;
        if parts.next().is_some() {
            return Err(invalid("too many coordinates"));
        }

        Ok(Self::new(world, x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn format_token() {
        assert_eq!(Corner::new("world", 0, 64, -10).to_string(), "world:0,64,-10");
    }

    #[test]
    fn parse_token() {
        let c: Corner = "world_nether:-5,70,12".parse().unwrap();
        assert_eq!(c, Corner::new("world_nether", -5, 70, 12));
    }

    #[test]
    fn world_may_contain_colons() {
        let c: Corner = "minecraft:overworld:1,2,3".parse().unwrap();
        assert_eq!(c.world, "minecraft:overworld");
        assert_eq!(c.to_string(), "minecraft:overworld:1,2,3");
    }

    #[test]
    fn reject_malformed() {
        assert!("".parse::<Corner>().is_err());
        assert!("world".parse::<Corner>().is_err());
        assert!(":1,2,3".parse::<Corner>().is_err());
        assert!("world:1,2".parse::<Corner>().is_err());
        assert!("world:1,2,3,4".parse::<Corner>().is_err());
        assert!("world:a,2,3".parse::<Corner>().is_err());
    }

    proptest! {
        #[test]
        fn text_roundtrip_is_exact(
            world in "[a-zA-Z_][a-zA-Z0-9_:]{0,16}",
            x in any::<i32>(),
            y in any::<i32>(),
            z in any::<i32>(),
        ) {
            let corner = Corner::new(world, x, y, z);
            let text = corner.to_string();
            let parsed: Corner = text.parse().unwrap();
            prop_assert_eq!(&parsed, &corner);
            prop_assert_eq!(parsed.to_string(), text);
        }
    }
}
