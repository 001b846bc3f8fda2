//! Named attribution regions

use serde::{Deserialize, Serialize};

/// Spatial zone with its own search radii.
///
/// `NorthernMontney` is the default region for anything outside every named
/// envelope polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "KSMMA")]
    Ksmma,
    #[serde(rename = "Northern Montney")]
    NorthernMontney,
}

impl Region {
    pub const ALL: [Self; 2] = [Self::Ksmma, Self::NorthernMontney];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ksmma => "KSMMA",
            Self::NorthernMontney => "Northern Montney",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
