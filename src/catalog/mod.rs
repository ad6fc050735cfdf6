//! Catalog domain vocabulary
//!
//! The two supported sources, their fixed site profiles, and the entity
//! hierarchy (category → material → variant) walked by the navigator.

pub mod entity;
pub mod profiles;

pub use entity::{CatalogEntity, EntityKind};
pub use profiles::{
    CategorySelect, ListSpec, Locator, MaterialOpen, MaterialScope, OSH_CUT, SEND_CUT_SEND, SiteProfile,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A source site. Each one has exactly one built-in [`SiteProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    OshCut,
    SendCutSend,
}

impl Source {
    /// Every source, in the order a full run visits them.
    pub const ALL: [Source; 2] = [Source::OshCut, Source::SendCutSend];

    /// Value written to the `Source` column.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OshCut => "OSH Cut",
            Self::SendCutSend => "SendCutSend",
        }
    }

    /// Short identifier used in file names and CLI flags.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::OshCut => "oshcut",
            Self::SendCutSend => "sendcutsend",
        }
    }

    #[must_use]
    pub fn profile(self) -> &'static SiteProfile {
        match self {
            Self::OshCut => &OSH_CUT,
            Self::SendCutSend => &SEND_CUT_SEND,
        }
    }

    /// Resolve a `Source` column value back to the source.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-', '_'], "");
        Self::ALL
            .into_iter()
            .find(|src| src.slug() == wanted)
            .ok_or_else(|| format!("unknown source '{s}' (expected 'oshcut' or 'sendcutsend')"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_parses_loose_spellings() {
        assert_eq!("OSH-Cut".parse::<Source>(), Ok(Source::OshCut));
        assert_eq!("send_cut_send".parse::<Source>(), Ok(Source::SendCutSend));
        assert!("laserbox".parse::<Source>().is_err());
    }

    #[test]
    fn labels_round_trip() {
        for src in Source::ALL {
            assert_eq!(Source::from_label(src.label()), Some(src));
        }
    }
}
