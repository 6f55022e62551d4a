use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two physical delivery routes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Route {
    #[serde(rename = "203D", alias = "203d")]
    R203D,
    #[serde(rename = "206A", alias = "206a")]
    R206A,
}

impl Route {
    pub const ALL: [Route; 2] = [Route::R203D, Route::R206A];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::R203D => "203D",
            Self::R206A => "206A",
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown route: {0}")]
pub struct RouteParseError(pub String);

impl FromStr for Route {
    type Err = RouteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "203D" => Ok(Self::R203D),
            "206A" => Ok(Self::R206A),
            _ => Err(RouteParseError(s.to_string())),
        }
    }
}

/// Route filter applied to a query. `All` reads the combined totals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RouteScope {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "203D", alias = "203d")]
    R203D,
    #[serde(rename = "206A", alias = "206a")]
    R206A,
}

impl RouteScope {
    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::R203D => "203D",
            Self::R206A => "206A",
        }
    }
}

impl From<Route> for RouteScope {
    fn from(value: Route) -> Self {
        match value {
            Route::R203D => Self::R203D,
            Route::R206A => Self::R206A,
        }
    }
}

impl Display for RouteScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

impl FromStr for RouteScope {
    type Err = RouteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Route::from_str(s).map(Self::from)
    }
}

/// Delivery circuit within a day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Round {
    First,
    Second,
}

impl Round {
    pub fn number(&self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl Display for Round {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.number())
    }
}

/// Workday checkpoint at which a group of source fields becomes available.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl Stage {
    pub const ALL: [Stage; 6] = [Stage::A, Stage::B, Stage::C, Stage::D, Stage::E, Stage::F];

    pub fn letter(&self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::F => 'F',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.letter() == letter.to_ascii_uppercase())
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Error)]
#[error("unknown stage: {0} (expected A-F)")]
pub struct StageParseError(pub String);

impl FromStr for Stage {
    type Err = StageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => {
                Self::from_letter(letter).ok_or_else(|| StageParseError(s.to_string()))
            }
            _ => Err(StageParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{Route, RouteScope, Stage};

    #[test]
    fn parses_routes_case_insensitively() {
        assert_eq!(Route::from_str("203d").unwrap(), Route::R203D);
        assert_eq!(Route::from_str(" 206A ").unwrap(), Route::R206A);
        assert!(Route::from_str("101B").is_err());
    }

    #[test]
    fn parses_route_scope_including_all() {
        assert_eq!(RouteScope::from_str("ALL").unwrap(), RouteScope::All);
        assert_eq!(RouteScope::from_str("206a").unwrap(), RouteScope::R206A);
        assert_eq!(RouteScope::R203D.to_string(), "203D");
    }

    #[test]
    fn parses_stage_letters() {
        assert_eq!(Stage::from_str("c").unwrap(), Stage::C);
        assert!(Stage::from_str("G").is_err());
        assert!(Stage::from_str("AB").is_err());
    }

    #[test]
    fn route_serializes_as_slug() {
        let json = serde_json::to_string(&Route::R203D).unwrap();
        assert_eq!(json, "\"203D\"");
        let scope: RouteScope = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(scope, RouteScope::All);
    }
}
