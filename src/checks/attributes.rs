//! Required metadata attributes.

use crate::naming::{FileDescriptor, Frequency};
use crate::report::DiagnosticReport;
use crate::store::{Availability, Dataset, LAT, LON};
use crate::time::TIME;

const DESCRIBED: &[&str] = &["long_name", "units"];

/// `(variable, attributes it must carry)` for one file
pub fn required_attributes(descriptor: &FileDescriptor) -> Vec<(String, Vec<&'static str>)> {
    let mut required = vec![
        (LAT.to_string(), DESCRIBED.to_vec()),
        (LON.to_string(), DESCRIBED.to_vec()),
    ];
    if descriptor.frequency() != Frequency::Fixed {
        required.push((TIME.to_string(), DESCRIBED.to_vec()));
    }

    let variable = descriptor.variable();
    let mut primary = vec!["long_name", "units", "_FillValue"];
    if variable.requires_comment() {
        primary.push("comment");
    }
    required.push((variable.as_str().to_string(), primary));
    required
}

pub fn check_attributes(
    dataset: &dyn Dataset,
    descriptor: &FileDescriptor,
    report: &mut DiagnosticReport,
    tag: &str,
) {
    for (variable, attrs) in required_attributes(descriptor) {
        match dataset.variable_status(&variable) {
            Availability::Present => {}
            Availability::Absent => {
                report.error(format!("{} attrs: Variable {} was not found", tag, variable));
                continue;
            }
            Availability::Unreadable(reason) => {
                report.error(format!(
                    "{} attrs: Variable {} is unreadable: {}",
                    tag, variable, reason
                ));
                continue;
            }
        }

        let missing: Vec<&str> = attrs
            .into_iter()
            .filter(|attr| dataset.attribute(&variable, attr).is_none())
            .collect();
        for attr in &missing {
            report.error(format!(
                "{} attrs: Variable {} is missing attribute {}",
                tag, variable, attr
            ));
        }
        if missing.is_empty() {
            report.status(format!(
                "{} attrs: Variable {} has all required attributes",
                tag, variable
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{Domain, Institution, Variable, Version};
    use crate::report::Category;
    use crate::store::{AttrValue, MemoryDataset};
    use ndarray::Array3;

    fn descriptor(variable: Variable) -> FileDescriptor {
        FileDescriptor::builder()
            .institution(Institution::Univu)
            .version(Version::Wrr2)
            .domain(Domain::Glob15)
            .frequency(Frequency::Monthly)
            .variable(variable)
            .years(2000, 2000)
            .build()
            .unwrap()
    }

    fn dataset(variable: &str) -> MemoryDataset {
        MemoryDataset::new()
            .with_grid(&[0.0], &[0.0])
            .with_time(&[0.0], "days since 2000-01-01", None)
            .with_variable(variable, &["time", "lat", "lon"], Array3::zeros((1, 1, 1)).into_dyn())
            .with_text_attribute(variable, "long_name", "something")
            .with_text_attribute(variable, "units", "kg m-2")
            .with_attribute(variable, "_FillValue", AttrValue::Number(1e20))
    }

    #[test]
    fn test_fully_attributed() {
        let mut report = DiagnosticReport::new();
        check_attributes(&dataset("Evap"), &descriptor(Variable::Evap), &mut report, "f");
        assert_eq!(report.count(Category::Error), 0);
        assert_eq!(report.count(Category::Status), 4);
    }

    #[test]
    fn test_comment_required_for_soil_layers() {
        let mut report = DiagnosticReport::new();
        let d = descriptor(Variable::RootMoist);
        check_attributes(&dataset("RootMoist"), &d, &mut report, "f");
        assert_eq!(report.count(Category::Error), 1);
        assert!(report.messages(Category::Error)[0].contains("comment"));

        let mut report = DiagnosticReport::new();
        let ds = dataset("RootMoist").with_text_attribute("RootMoist", "comment", "0-1m");
        check_attributes(&ds, &d, &mut report, "f");
        assert_eq!(report.count(Category::Error), 0);
    }

    #[test]
    fn test_one_error_per_missing_attribute() {
        let ds = dataset("Evap")
            .without_attribute("lat", "units")
            .without_attribute("Evap", "_FillValue")
            .without_variable("lon");
        let mut report = DiagnosticReport::new();
        check_attributes(&ds, &descriptor(Variable::Evap), &mut report, "f");
        assert_eq!(report.count(Category::Error), 3);
        assert_eq!(report.count(Category::Status), 1);
    }
}
