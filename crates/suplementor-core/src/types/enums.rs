//! # Closed Enumerations
//!
//! Every categorical tag on the wire is a closed string set. Unknown tags are
//! rejected by serde when decoding entities, and by [`std::str::FromStr`] when
//! a router input carries the tag as a raw string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a string is not a member of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag {
    /// Name of the enumeration (e.g. `NodeType`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownTag {}

/// Declares a closed enumeration with its wire tags.
///
/// Generates `ALL`, `as_str`, `Display` and `FromStr`; serde uses the same tags.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $tag)] $variant ),+
        }

        impl $name {
            /// Every member, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// The wire tag.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $tag ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownTag;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $tag => Ok($name::$variant), )+
                    _ => Err(UnknownTag {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

closed_enum! {
    /// Category of a knowledge graph node.
    NodeType {
        Supplement => "SUPPLEMENT",
        Neurotransmitter => "NEUROTRANSMITTER",
        BrainRegion => "BRAIN_REGION",
        CognitiveFunction => "COGNITIVE_FUNCTION",
        Pathway => "PATHWAY",
        Mechanism => "MECHANISM",
        Vitamin => "VITAMIN",
        Mineral => "MINERAL",
    }
}

closed_enum! {
    /// Kind of effect a relationship describes.
    RelationshipType {
        Enhances => "ENHANCES",
        Inhibits => "INHIBITS",
        Modulates => "MODULATES",
        Synergizes => "SYNERGIZES",
        Antagonizes => "ANTAGONIZES",
        Requires => "REQUIRES",
        Produces => "PRODUCES",
        Metabolizes => "METABOLIZES",
    }
}

closed_enum! {
    /// How strong the supporting research is for a claim.
    EvidenceLevel {
        Strong => "STRONG",
        Moderate => "MODERATE",
        Weak => "WEAK",
        Insufficient => "INSUFFICIENT",
        Conflicting => "CONFLICTING",
    }
}

closed_enum! {
    /// Historical or cultural tradition a history entry belongs to.
    MedicineSystem {
        Tcm => "TCM",
        Ayurveda => "AYURVEDA",
        GreekRoman => "GREEK_ROMAN",
        EuropeanHerbalism => "EUROPEAN_HERBALISM",
        ModernScience => "MODERN_SCIENCE",
        Other => "OTHER",
    }
}

closed_enum! {
    /// Whether the effect of a relationship wears off.
    Reversibility {
        Reversible => "REVERSIBLE",
        Irreversible => "IRREVERSIBLE",
        PartiallyReversible => "PARTIALLY_REVERSIBLE",
    }
}

closed_enum! {
    /// Target audience of a learning path.
    Difficulty {
        Beginner => "BEGINNER",
        Intermediate => "INTERMEDIATE",
        Advanced => "ADVANCED",
    }
}

impl EvidenceLevel {
    /// Ranking used when ordering results: stronger evidence ranks higher.
    ///
    /// Conflicting evidence ranks above insufficient evidence, since at least
    /// some studies exist.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Strong => 4,
            Self::Moderate => 3,
            Self::Weak => 2,
            Self::Conflicting => 1,
            Self::Insufficient => 0,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Intermediate
    }
}
