//! Closed vocabularies for the canonical file name tokens.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A token that is not part of one of the closed vocabularies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{token}'")]
pub struct UnknownToken {
    pub kind: &'static str,
    pub token: String,
}

macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $token)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Token as it appears in file names
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownToken;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok($name::$variant),)+
                    _ => Err(UnknownToken { kind: $kind, token: s.to_string() }),
                }
            }
        }
    };
}

vocabulary! {
    /// Modelling institutions taking part in the ensemble
    Institution, "institution" {
        Ecmwf => "ecmwf",
        Univu => "univu",
        Metfr => "metfr",
        Nerc => "nerc",
        Jrc => "jrc",
        Cnrs => "cnrs",
        Univk => "univk",
        Ambio => "ambio",
        Csiro => "csiro",
    }
}

vocabulary! {
    /// Experiment (reanalysis tier) versions
    Version, "version" {
        Wrr0 => "wrr0",
        Wrr1 => "wrr1",
        Wrr2 => "wrr2",
    }
}

vocabulary! {
    /// Spatial domains; each one pins a regular lat/lon reference grid
    Domain, "domain" {
        Glob30 => "glob30",
        Glob15 => "glob15",
    }
}

vocabulary! {
    Frequency, "frequency" {
        Daily => "day",
        Monthly => "mon",
        Fixed => "fix",
    }
}

vocabulary! {
    /// Output variables (ALMA names)
    Variable, "variable" {
        Precip => "Precip",
        Rainf => "Rainf",
        Evap => "Evap",
        Runoff => "Runoff",
        Qs => "Qs",
        Qsb => "Qsb",
        Qrec => "Qrec",
        Qsm => "Qsm",
        ECanop => "ECanop",
        TVeg => "TVeg",
        ESoil => "ESoil",
        EWater => "EWater",
        SWnet => "SWnet",
        LWnet => "LWnet",
        Qh => "Qh",
        Qle => "Qle",
        Swe => "SWE",
        SoilMoist => "SoilMoist",
        CanopInt => "CanopInt",
        SurfStor => "SurfStor",
        SurfMoist => "SurfMoist",
        RootMoist => "RootMoist",
        LandMask => "LandMask",
        SoilDepth => "SoilDepth",
    }
}

impl Domain {
    /// Grid spacing in degrees
    pub fn resolution(&self) -> f64 {
        match self {
            Domain::Glob30 => 0.5,
            Domain::Glob15 => 0.25,
        }
    }

    pub fn nlat(&self) -> usize {
        (180.0 / self.resolution()).round() as usize
    }

    pub fn nlon(&self) -> usize {
        (360.0 / self.resolution()).round() as usize
    }

    /// Cell-centre latitudes, north to south
    pub fn reference_lats(&self) -> Vec<f64> {
        let res = self.resolution();
        (0..self.nlat())
            .map(|i| 90.0 - res * (i as f64 + 0.5))
            .collect()
    }

    /// Cell-centre longitudes, west to east starting at the dateline
    pub fn reference_lons(&self) -> Vec<f64> {
        let res = self.resolution();
        (0..self.nlon())
            .map(|j| -180.0 + res * (j as f64 + 0.5))
            .collect()
    }
}

impl Variable {
    /// Variables that only exist as time-invariant fields
    pub fn is_fixed_only(&self) -> bool {
        matches!(self, Variable::LandMask | Variable::SoilDepth)
    }

    /// Variables carrying a vertical soil-level dimension
    pub fn is_layered(&self) -> bool {
        matches!(self, Variable::SoilMoist)
    }

    /// Soil moisture variables whose layer depth must be described in a `comment`
    pub fn requires_comment(&self) -> bool {
        matches!(self, Variable::SurfMoist | Variable::RootMoist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_parse_back() {
        for v in Variable::ALL {
            assert_eq!(v.as_str().parse::<Variable>().unwrap(), *v);
        }
        assert_eq!("mon".parse::<Frequency>().unwrap(), Frequency::Monthly);
    }

    #[test]
    fn test_unknown_token() {
        let err = "ukmo".parse::<Institution>().unwrap_err();
        assert_eq!(err.kind, "institution");
        assert_eq!(err.token, "ukmo");
    }

    #[test]
    fn test_domain_reference_grid() {
        let lats = Domain::Glob30.reference_lats();
        let lons = Domain::Glob30.reference_lons();
        assert_eq!(lats.len(), 360);
        assert_eq!(lons.len(), 720);
        assert_eq!(lats[0], 89.75);
        assert_eq!(lons[0], -179.75);
        assert_eq!(Domain::Glob15.nlat(), 720);
    }

    #[test]
    fn test_variable_classes() {
        assert!(Variable::LandMask.is_fixed_only());
        assert!(!Variable::Precip.is_fixed_only());
        assert!(Variable::SoilMoist.is_layered());
        assert!(Variable::RootMoist.requires_comment());
        assert!(!Variable::SoilMoist.requires_comment());
    }
}
