use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// One of the two buffers being compared.
///
/// Every two-sided quantity (line numbers, freeze state, snapshots) is indexed
/// by `Side`. `Left` is buffer 1 (typically the base revision) and `Right` is
/// buffer 2 (typically the working copy).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// The opposite side.
    pub const fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Index into a two-element array: 0 for left, 1 for right.
    pub const fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    /// Pick the value belonging to this side.
    pub fn select<T>(self, left: T, right: T) -> T {
        match self {
            Side::Left => left,
            Side::Right => right,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Side {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "1" => Ok(Side::Left),
            "right" | "2" => Ok(Side::Right),
            _ => Err(TypeError::UnknownSide(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_is_involution() {
        for side in Side::BOTH {
            assert_ne!(side, side.other());
            assert_eq!(side, side.other().other());
        }
    }

    #[test]
    fn select_and_index_agree() {
        let pair = ["a", "b"];
        for side in Side::BOTH {
            assert_eq!(side.select(pair[0], pair[1]), pair[side.index()]);
        }
    }

    #[test]
    fn parse_accepts_names_and_numbers() {
        assert_eq!("left".parse::<Side>().unwrap(), Side::Left);
        assert_eq!("RIGHT".parse::<Side>().unwrap(), Side::Right);
        assert_eq!("1".parse::<Side>().unwrap(), Side::Left);
        assert_eq!("2".parse::<Side>().unwrap(), Side::Right);
        assert_eq!(
            "middle".parse::<Side>(),
            Err(TypeError::UnknownSide("middle".into()))
        );
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Side::Right).unwrap();
        assert_eq!(json, "\"right\"");
        let back: Side = serde_json::from_str("\"left\"").unwrap();
        assert_eq!(back, Side::Left);
    }
}
