use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Closed set of vehicle kinds a request can be about. Inputs are normalized
/// to uppercase once, at the boundary; unknown values are rejected there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum VehicleCategory {
    Bike,
    Car,
    Auto,
    Bus,
    Lorry,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 5] = [
        VehicleCategory::Bike,
        VehicleCategory::Car,
        VehicleCategory::Auto,
        VehicleCategory::Bus,
        VehicleCategory::Lorry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleCategory::Bike => "BIKE",
            VehicleCategory::Car => "CAR",
            VehicleCategory::Auto => "AUTO",
            VehicleCategory::Bus => "BUS",
            VehicleCategory::Lorry => "LORRY",
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleCategory {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "unknown vehicle category {raw:?}, expected one of {}",
                    joined(Self::ALL.iter().map(VehicleCategory::as_str))
                ))
            })
    }
}

impl TryFrom<String> for VehicleCategory {
    type Error = EngineError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

/// Closed set of service kinds a provider can be skilled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum ServiceCategory {
    Puncture,
    Battery,
    Engine,
    Transmission,
    Lights,
    Brake,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 6] = [
        ServiceCategory::Puncture,
        ServiceCategory::Battery,
        ServiceCategory::Engine,
        ServiceCategory::Transmission,
        ServiceCategory::Lights,
        ServiceCategory::Brake,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Puncture => "PUNCTURE",
            ServiceCategory::Battery => "BATTERY",
            ServiceCategory::Engine => "ENGINE",
            ServiceCategory::Transmission => "TRANSMISSION",
            ServiceCategory::Lights => "LIGHTS",
            ServiceCategory::Brake => "BRAKE",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceCategory {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "unknown service category {raw:?}, expected one of {}",
                    joined(Self::ALL.iter().map(ServiceCategory::as_str))
                ))
            })
    }
}

impl TryFrom<String> for ServiceCategory {
    type Error = EngineError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

fn joined<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join("/")
}
