use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::listing::ListingId;

/// Portals and channels a listing can be published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    ImmobilienScout24,
    Immowelt,
    Kleinanzeigen,
    Homepage,
    Instagram,
    Facebook,
}

impl Platform {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ImmobilienScout24 => "ImmobilienScout24",
            Self::Immowelt => "Immowelt",
            Self::Kleinanzeigen => "Kleinanzeigen",
            Self::Homepage => "Homepage",
            Self::Instagram => "Instagram",
            Self::Facebook => "Facebook",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImmobilienScout24 => "immobilien_scout24",
            Self::Immowelt => "immowelt",
            Self::Kleinanzeigen => "kleinanzeigen",
            Self::Homepage => "homepage",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
        }
    }

    /// Listing portals, as opposed to social channels.
    pub const fn is_portal(self) -> bool {
        matches!(self, Self::ImmobilienScout24 | Self::Immowelt | Self::Kleinanzeigen)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "immobilienscout24" | "is24" => Ok(Self::ImmobilienScout24),
            "immowelt" => Ok(Self::Immowelt),
            "kleinanzeigen" => Ok(Self::Kleinanzeigen),
            "homepage" | "website" => Ok(Self::Homepage),
            "instagram" => Ok(Self::Instagram),
            "facebook" => Ok(Self::Facebook),
            _ => Err(format!("unknown platform '{raw}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PublicationStatus {
    Pending,
    Live { external_ref: Option<String> },
    Failed { error: String },
}

/// Publication state of a listing on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub platform: Platform,
    pub status: PublicationStatus,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attempts: u32,
}

impl Publication {
    pub fn is_live(&self) -> bool {
        matches!(self.status, PublicationStatus::Live { .. })
    }
}

/// Command handed to the portal gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishCommand {
    pub listing_id: ListingId,
    pub platform: Platform,
    pub title: String,
}
