//! File Layout
//!
//! Where the files of one institution/version/domain live and how their year
//! ranges are chunked.

use std::path::PathBuf;

use super::{Domain, FileDescriptor, Frequency, Institution, Variable, Version, YearBounds, YearRange};
use crate::error::{QcError, QcResult};

#[derive(Debug, Clone)]
pub struct FileLayout {
    pub data_dir: PathBuf,
    pub institution: Institution,
    pub version: Version,
    pub domain: Domain,
    pub bounds: YearBounds,
    year_ranges: Vec<YearRange>,
}

impl FileLayout {
    /// Split `[start, end]` into consecutive ranges of `years_per_file` years
    /// (the last one may be shorter). `None`, or a chunk at least as long as
    /// the run, keeps one range for the whole run.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        institution: Institution,
        version: Version,
        domain: Domain,
        run: YearRange,
        years_per_file: Option<u32>,
        bounds: YearBounds,
    ) -> QcResult<Self> {
        let year_ranges = match years_per_file {
            None => vec![run],
            Some(0) => {
                return Err(QcError::Config("years_per_file must be positive".to_string()))
            }
            Some(n) => {
                // a chunk longer than the run is the whole run
                let n = (n as usize).min(run.year_count()) as i32;
                let mut ranges = Vec::new();
                let mut start = run.start;
                while start <= run.end {
                    let end = (start + n - 1).min(run.end);
                    ranges.push(YearRange::new(start, end)?);
                    start = end + 1;
                }
                ranges
            }
        };

        Ok(Self {
            data_dir: data_dir.into(),
            institution,
            version,
            domain,
            bounds,
            year_ranges,
        })
    }

    pub fn year_ranges(&self) -> &[YearRange] {
        &self.year_ranges
    }

    pub fn range_containing(&self, year: i32) -> Option<YearRange> {
        self.year_ranges.iter().copied().find(|r| r.contains(year))
    }

    /// Descriptor of the file holding `variable` at `frequency` for `year`.
    /// `year` is ignored for fixed-frequency variables.
    pub fn descriptor_for(
        &self,
        variable: Variable,
        frequency: Frequency,
        year: i32,
    ) -> QcResult<FileDescriptor> {
        let mut builder = FileDescriptor::builder()
            .institution(self.institution)
            .version(self.version)
            .domain(self.domain)
            .frequency(frequency)
            .variable(variable)
            .bounds(self.bounds);
        if frequency != Frequency::Fixed {
            let range = self.range_containing(year).ok_or_else(|| {
                QcError::InvalidDescriptor(format!("year {} is outside the run", year))
            })?;
            builder = builder.years(range.start, range.end);
        }
        builder.build()
    }

    pub fn path_for(&self, variable: Variable, frequency: Frequency, year: i32) -> QcResult<PathBuf> {
        Ok(self
            .descriptor_for(variable, frequency, year)?
            .path_in(&self.data_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(years_per_file: Option<u32>) -> FileLayout {
        FileLayout::new(
            "/data",
            Institution::Ecmwf,
            Version::Wrr2,
            Domain::Glob30,
            YearRange::new(1980, 1994).unwrap(),
            years_per_file,
            YearBounds::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_single_range_by_default() {
        assert_eq!(layout(None).year_ranges(), &[YearRange { start: 1980, end: 1994 }]);
    }

    #[test]
    fn test_chunked_ranges() {
        let l = layout(Some(10));
        assert_eq!(
            l.year_ranges(),
            &[
                YearRange { start: 1980, end: 1989 },
                YearRange { start: 1990, end: 1994 }
            ]
        );
        let path = l.path_for(Variable::Precip, Frequency::Monthly, 1992).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/data/e2o_ecmwf_wrr2_glob30_mon_Precip_1990-1994.nc")
        );
    }

    #[test]
    fn test_oversized_chunk_is_whole_run() {
        for n in [15, 16, i32::MAX as u32, u32::MAX] {
            assert_eq!(
                layout(Some(n)).year_ranges(),
                &[YearRange { start: 1980, end: 1994 }],
                "{}",
                n
            );
        }
    }

    #[test]
    fn test_fixed_path_ignores_year() {
        let path = layout(None).path_for(Variable::SoilDepth, Frequency::Fixed, 0).unwrap();
        assert_eq!(path, PathBuf::from("/data/e2o_ecmwf_wrr2_glob30_fix_SoilDepth.nc"));
    }

    #[test]
    fn test_year_outside_run() {
        assert!(layout(None).path_for(Variable::Precip, Frequency::Monthly, 2001).is_err());
    }
}
