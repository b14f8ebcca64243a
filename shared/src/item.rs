//! Listings as delivered by the item data source.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geo::LatLon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or(0),
        )
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

/// Listing category. Serialized by wire name; decoding goes through
/// [`Category::parse`] and maps anything unrecognized to `Other`, so one new
/// server-side category never fails a whole result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Category {
    Cleaning,
    Repairs,
    Moving,
    Delivery,
    Tutoring,
    Gardening,
    PetCare,
    ItSupport,
    Beauty,
    Other,
}

impl Category {
    pub const ALL: [Self; 10] = [
        Self::Cleaning,
        Self::Repairs,
        Self::Moving,
        Self::Delivery,
        Self::Tutoring,
        Self::Gardening,
        Self::PetCare,
        Self::ItSupport,
        Self::Beauty,
        Self::Other,
    ];

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "cleaning" => Some(Self::Cleaning),
            "repairs" | "repair" => Some(Self::Repairs),
            "moving" => Some(Self::Moving),
            "delivery" | "courier" => Some(Self::Delivery),
            "tutoring" | "education" => Some(Self::Tutoring),
            "gardening" => Some(Self::Gardening),
            "pet_care" | "petcare" | "pets" => Some(Self::PetCare),
            "it_support" | "it" | "tech" => Some(Self::ItSupport),
            "beauty" => Some(Self::Beauty),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Wire value sent in the `category` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cleaning => "cleaning",
            Self::Repairs => "repairs",
            Self::Moving => "moving",
            Self::Delivery => "delivery",
            Self::Tutoring => "tutoring",
            Self::Gardening => "gardening",
            Self::PetCare => "pet_care",
            Self::ItSupport => "it_support",
            Self::Beauty => "beauty",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Cleaning => "Cleaning",
            Self::Repairs => "Repairs",
            Self::Moving => "Moving",
            Self::Delivery => "Delivery",
            Self::Tutoring => "Tutoring",
            Self::Gardening => "Gardening",
            Self::PetCare => "Pet care",
            Self::ItSupport => "IT support",
            Self::Beauty => "Beauty",
            Self::Other => "Other",
        }
    }

    /// Marker and row icon name understood by the shells.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Cleaning => "broom",
            Self::Repairs => "wrench",
            Self::Moving => "truck",
            Self::Delivery => "package",
            Self::Tutoring => "book",
            Self::Gardening => "leaf",
            Self::PetCare => "paw",
            Self::ItSupport => "laptop",
            Self::Beauty => "scissors",
            Self::Other => "pin",
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        Self::parse(&raw).unwrap_or_else(|| {
            tracing::debug!(category = %raw, "unknown category, showing as other");
            Self::Other
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorSummary {
    pub name: String,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Immutable snapshot of a listing as returned by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: Category,
    /// Price in minor currency units (cents).
    pub price_cents: u64,
    pub location: LatLon,
    #[serde(default)]
    pub urgent: bool,
    pub created_at: UnixTimeMs,
    pub creator: CreatorSummary,
}

impl Item {
    #[must_use]
    pub fn price_text(&self) -> String {
        let euros = self.price_cents / 100;
        let cents = self.price_cents % 100;
        if cents == 0 {
            format!("€{euros}")
        } else {
            format!("€{euros}.{cents:02}")
        }
    }

    /// Case-insensitive match of every whitespace-separated term against
    /// title, description, category and creator name.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let haystack = format!(
            "{} {} {} {}",
            self.title,
            self.description.as_deref().unwrap_or_default(),
            self.category.display_name(),
            self.creator.name
        )
        .to_lowercase();

        query
            .split_whitespace()
            .all(|term| haystack.contains(&term.to_lowercase()))
    }
}
