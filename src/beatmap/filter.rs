use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Ranked status filter for searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankedStatus {
    #[default]
    All,
    RankedApproved,
    Qualified,
    Unranked,
}

impl RankedStatus {
    /// Mirror status parameter (`s=`); None means no filter
    pub fn mirror_code(&self) -> Option<&'static str> {
        match self {
            RankedStatus::All => None,
            RankedStatus::RankedApproved => Some("1,2"),
            RankedStatus::Qualified => Some("3"),
            RankedStatus::Unranked => Some("0,-1,-2"),
        }
    }

    /// Official status parameter; None when the official search has no equivalent
    pub fn official_code(&self) -> Option<&'static str> {
        match self {
            RankedStatus::All => Some("any"),
            RankedStatus::RankedApproved => Some("ranked"),
            RankedStatus::Qualified => Some("qualified"),
            RankedStatus::Unranked => None,
        }
    }
}

impl FromStr for RankedStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "any" => Ok(RankedStatus::All),
            "ranked" | "approved" => Ok(RankedStatus::RankedApproved),
            "qualified" => Ok(RankedStatus::Qualified),
            "unranked" => Ok(RankedStatus::Unranked),
            other => Err(format!("unknown ranked status '{}'", other)),
        }
    }
}

/// Game mode filter for searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    All,
    Standard,
    Taiko,
    Catch,
    Mania,
}

impl GameMode {
    /// Numeric mode code shared by both backends; None means all modes
    pub fn code(&self) -> Option<&'static str> {
        match self {
            GameMode::All => None,
            GameMode::Standard => Some("0"),
            GameMode::Taiko => Some("1"),
            GameMode::Catch => Some("2"),
            GameMode::Mania => Some("3"),
        }
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(GameMode::All),
            "osu" | "standard" | "std" => Ok(GameMode::Standard),
            "taiko" => Ok(GameMode::Taiko),
            "catch" | "ctb" | "fruits" => Ok(GameMode::Catch),
            "mania" => Ok(GameMode::Mania),
            other => Err(format!("unknown game mode '{}'", other)),
        }
    }
}

/// How the mirror interprets an all-digit query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdLookup {
    SetId,
    BeatmapId,
    MapperId,
    Text,
}

impl IdLookup {
    /// Mirror `c=` parameter
    pub fn mirror_code(&self) -> &'static str {
        match self {
            IdLookup::SetId => "s",
            IdLookup::BeatmapId => "b",
            IdLookup::MapperId => "u",
            IdLookup::Text => "o",
        }
    }

    /// Only all-digit queries can be looked up by id
    pub fn applies_to(query: &str) -> bool {
        !query.is_empty() && query.chars().all(|c| c.is_ascii_digit())
    }
}

impl FromStr for IdLookup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s" | "set" => Ok(IdLookup::SetId),
            "b" | "beatmap" => Ok(IdLookup::BeatmapId),
            "u" | "mapper" => Ok(IdLookup::MapperId),
            "o" | "text" => Ok(IdLookup::Text),
            other => Err(format!("unknown id lookup '{}'", other)),
        }
    }
}
