//! Naming Module
//!
//! Canonical dataset identity and its file-name encoding:
//! `e2o_<institution>_<version>_<domain>_<frequency>_<variable>[_<ystart>-<yend>].nc`

pub mod layout;
pub mod vocabulary;

pub use layout::FileLayout;
pub use vocabulary::{Domain, Frequency, Institution, UnknownToken, Variable, Version};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{QcError, QcResult};

/// Leading token shared by every file of the ensemble
pub const FILE_TAG: &str = "e2o";
const SEPARATOR: char = '_';
const EXTENSION: &str = ".nc";

/// Inclusive range of simulation years covered by one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

/// Years that fit the four-digit year token of a file name
const YEAR_DIGITS: std::ops::RangeInclusive<i32> = 0..=9999;

impl YearRange {
    pub fn new(start: i32, end: i32) -> QcResult<Self> {
        if !YEAR_DIGITS.contains(&start) || !YEAR_DIGITS.contains(&end) {
            return Err(QcError::InvalidDescriptor(format!(
                "year range {}-{} needs four-digit years",
                start, end
            )));
        }
        if start > end {
            return Err(QcError::InvalidDescriptor(format!(
                "year range {}-{} is reversed",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }

    pub fn year_count(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
}

impl std::fmt::Display for YearRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:04}", self.start, self.end)
    }
}

/// Years a run is allowed to reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBounds {
    pub min: i32,
    pub max: i32,
}

impl YearBounds {
    pub fn admits(&self, range: &YearRange) -> bool {
        range.start >= self.min && range.end <= self.max
    }
}

impl Default for YearBounds {
    fn default() -> Self {
        Self { min: 1979, max: 2014 }
    }
}

/// Canonical identity of one output file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileDescriptor {
    institution: Institution,
    version: Version,
    domain: Domain,
    frequency: Frequency,
    variable: Variable,
    years: Option<YearRange>,
}

impl FileDescriptor {
    pub fn builder() -> FileDescriptorBuilder {
        FileDescriptorBuilder::default()
    }

    pub fn institution(&self) -> Institution {
        self.institution
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn variable(&self) -> Variable {
        self.variable
    }

    /// Year range; `None` exactly when the frequency is `fix`
    pub fn years(&self) -> Option<YearRange> {
        self.years
    }

    /// Canonical file name
    pub fn encode(&self) -> String {
        let mut tokens = vec![
            FILE_TAG.to_string(),
            self.institution.to_string(),
            self.version.to_string(),
            self.domain.to_string(),
            self.frequency.to_string(),
            self.variable.to_string(),
        ];
        if let Some(years) = self.years {
            tokens.push(years.to_string());
        }
        format!("{}{}", tokens.join(&SEPARATOR.to_string()), EXTENSION)
    }

    pub fn path_in(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(self.encode())
    }

    /// Parse a descriptor back from a path; only the file name is inspected.
    pub fn decode(path: impl AsRef<Path>) -> QcResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| QcError::malformed(path.display().to_string(), "no file name"))?;

        let stem = name
            .strip_suffix(EXTENSION)
            .ok_or_else(|| QcError::malformed(&name, "missing .nc extension"))?;
        let tokens: Vec<&str> = stem.split(SEPARATOR).collect();
        if tokens.len() != 6 && tokens.len() != 7 {
            return Err(QcError::malformed(
                &name,
                format!("expected 6 or 7 tokens, found {}", tokens.len()),
            ));
        }
        if tokens[0] != FILE_TAG {
            return Err(QcError::malformed(
                &name,
                format!("leading tag must be '{}'", FILE_TAG),
            ));
        }

        let bad = |e: UnknownToken| QcError::malformed(&name, e.to_string());
        let mut builder = FileDescriptor::builder()
            .institution(tokens[1].parse().map_err(bad)?)
            .version(tokens[2].parse().map_err(bad)?)
            .domain(tokens[3].parse().map_err(bad)?)
            .frequency(tokens[4].parse().map_err(bad)?)
            .variable(tokens[5].parse().map_err(bad)?);

        if let Some(years) = tokens.get(6) {
            let (start, end) = parse_year_token(years)
                .ok_or_else(|| QcError::malformed(&name, format!("bad year range '{}'", years)))?;
            builder = builder.years(start, end);
        }

        builder
            .build()
            .map_err(|e| QcError::malformed(&name, e.to_string()))
    }
}

impl std::fmt::Display for FileDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

fn parse_year_token(token: &str) -> Option<(i32, i32)> {
    let (start, end) = token.split_once('-')?;
    if start.len() != 4 || end.len() != 4 {
        return None;
    }
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// Named, typed construction of a [`FileDescriptor`]
#[derive(Debug, Default, Clone)]
pub struct FileDescriptorBuilder {
    institution: Option<Institution>,
    version: Option<Version>,
    domain: Option<Domain>,
    frequency: Option<Frequency>,
    variable: Option<Variable>,
    years: Option<(i32, i32)>,
    bounds: Option<YearBounds>,
}

impl FileDescriptorBuilder {
    pub fn institution(mut self, institution: Institution) -> Self {
        self.institution = Some(institution);
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn variable(mut self, variable: Variable) -> Self {
        self.variable = Some(variable);
        self
    }

    pub fn years(mut self, start: i32, end: i32) -> Self {
        self.years = Some((start, end));
        self
    }

    /// Reject year ranges outside these bounds
    pub fn bounds(mut self, bounds: YearBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn build(self) -> QcResult<FileDescriptor> {
        let missing = |field: &str| QcError::InvalidDescriptor(format!("{} is required", field));
        let institution = self.institution.ok_or_else(|| missing("institution"))?;
        let version = self.version.ok_or_else(|| missing("version"))?;
        let domain = self.domain.ok_or_else(|| missing("domain"))?;
        let frequency = self.frequency.ok_or_else(|| missing("frequency"))?;
        let variable = self.variable.ok_or_else(|| missing("variable"))?;

        let years = match self.years {
            Some((start, end)) => Some(YearRange::new(start, end)?),
            None => None,
        };

        match (frequency, years) {
            (Frequency::Fixed, Some(_)) => {
                return Err(QcError::InvalidDescriptor(
                    "fixed frequency files carry no year range".to_string(),
                ))
            }
            (Frequency::Daily | Frequency::Monthly, None) => {
                return Err(QcError::InvalidDescriptor(format!(
                    "{} files need a year range",
                    frequency
                )))
            }
            _ => {}
        }

        if variable.is_fixed_only() != (frequency == Frequency::Fixed) {
            return Err(QcError::InvalidDescriptor(format!(
                "variable {} is not valid at frequency {}",
                variable, frequency
            )));
        }

        if let (Some(bounds), Some(range)) = (self.bounds, years) {
            if !bounds.admits(&range) {
                return Err(QcError::InvalidDescriptor(format!(
                    "years {} outside {}-{}",
                    range, bounds.min, bounds.max
                )));
            }
        }

        Ok(FileDescriptor {
            institution,
            version,
            domain,
            frequency,
            variable,
            years,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily_swe() -> FileDescriptor {
        FileDescriptor::builder()
            .institution(Institution::Ecmwf)
            .version(Version::Wrr2)
            .domain(Domain::Glob30)
            .frequency(Frequency::Daily)
            .variable(Variable::Swe)
            .years(1980, 1999)
            .build()
            .unwrap()
    }

    #[test]
    fn test_encode_canonical_name() {
        assert_eq!(daily_swe().encode(), "e2o_ecmwf_wrr2_glob30_day_SWE_1980-1999.nc");
    }

    #[test]
    fn test_fixed_name_has_six_tokens() {
        let d = FileDescriptor::builder()
            .institution(Institution::Nerc)
            .version(Version::Wrr1)
            .domain(Domain::Glob15)
            .frequency(Frequency::Fixed)
            .variable(Variable::LandMask)
            .build()
            .unwrap();
        assert_eq!(d.encode(), "e2o_nerc_wrr1_glob15_fix_LandMask.nc");
        assert_eq!(FileDescriptor::decode(d.encode()).unwrap(), d);
    }

    #[test]
    fn test_round_trip_through_directory() {
        let d = daily_swe();
        let path = d.path_in("/data/wrr2");
        assert_eq!(FileDescriptor::decode(&path).unwrap(), d);
    }

    #[test]
    fn test_round_trip_every_variable() {
        for &variable in Variable::ALL {
            for &frequency in Frequency::ALL {
                let mut builder = FileDescriptor::builder()
                    .institution(Institution::Csiro)
                    .version(Version::Wrr0)
                    .domain(Domain::Glob30)
                    .frequency(frequency)
                    .variable(variable);
                if frequency != Frequency::Fixed {
                    builder = builder.years(1979, 2012);
                }
                if let Ok(d) = builder.build() {
                    assert_eq!(FileDescriptor::decode(d.encode()).unwrap(), d);
                }
            }
        }
    }

    #[test]
    fn test_decode_rejects_short_names() {
        let err = FileDescriptor::decode("e2o_ecmwf_wrr2_day.nc").unwrap_err();
        assert!(matches!(err, QcError::MalformedName { .. }));
    }

    #[test]
    fn test_decode_rejects_unknown_tokens() {
        assert!(FileDescriptor::decode("e2o_ukmo_wrr2_glob30_day_SWE_1980-1999.nc").is_err());
        assert!(FileDescriptor::decode("e2o_ecmwf_wrr2_glob30_day_SWE_80-99.nc").is_err());
        assert!(FileDescriptor::decode("e2o_ecmwf_wrr2_glob30_day_SWE_1999-1980.nc").is_err());
        assert!(FileDescriptor::decode("wrr_ecmwf_wrr2_glob30_day_SWE_1980-1999.nc").is_err());
        assert!(FileDescriptor::decode("e2o_ecmwf_wrr2_glob30_day_LandMask_1980-1999.nc").is_err());
    }

    #[test]
    fn test_builder_bounds() {
        let result = FileDescriptor::builder()
            .institution(Institution::Ecmwf)
            .version(Version::Wrr2)
            .domain(Domain::Glob30)
            .frequency(Frequency::Monthly)
            .variable(Variable::Precip)
            .years(1970, 1990)
            .bounds(YearBounds::default())
            .build();
        assert!(matches!(result, Err(QcError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_builder_rejects_years_without_four_digits() {
        for (start, end) in [(10000, 10000), (-5, 3)] {
            let result = FileDescriptor::builder()
                .institution(Institution::Ecmwf)
                .version(Version::Wrr1)
                .domain(Domain::Glob30)
                .frequency(Frequency::Monthly)
                .variable(Variable::Precip)
                .years(start, end)
                .build();
            assert!(matches!(result, Err(QcError::InvalidDescriptor(_))), "{}-{}", start, end);
        }
        let edge = YearRange::new(0, 9999).unwrap();
        assert_eq!(edge.to_string(), "0000-9999");
    }
}
