use std::{
    collections::BTreeSet,
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

use jiff::civil::Date;
use log::{info, warn};
use thiserror::Error;

use crate::{interval::interval::DateRange, settings::DatapackageSettings};

pub const EIA860_WORKING_YEARS: RangeInclusive<i16> = 2001..=2018;
pub const EIA923_WORKING_YEARS: RangeInclusive<i16> = 2001..=2018;
pub const FERC1_WORKING_YEARS: RangeInclusive<i16> = 1994..=2018;
pub const EPACEMS_WORKING_YEARS: RangeInclusive<i16> = 1995..=2018;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("{dataset} year {year} is not a working year")]
    InvalidYear { dataset: &'static str, year: i16 },
    #[error("datapackage bundle {0:?} already exists, use a unique pkg_bundle_name or --clobber")]
    BundleExists(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The union of the ETL parameters of all the datapackages in a bundle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedParameters {
    pub ferc1_years: Vec<i16>,
    pub eia923_years: Vec<i16>,
    pub eia860_years: Vec<i16>,
    pub epacems_years: Vec<i16>,
    pub epacems_states: Vec<String>,
}

impl FlattenedParameters {
    pub fn is_empty(&self) -> bool {
        self.ferc1_years.is_empty()
            && self.eia923_years.is_empty()
            && self.eia860_years.is_empty()
            && self.epacems_years.is_empty()
    }

    /// Fail on the first year that is outside the working years of its dataset.
    pub fn validate(&self) -> Result<(), EtlError> {
        let checks = [
            ("eia860", &self.eia860_years, &EIA860_WORKING_YEARS),
            ("eia923", &self.eia923_years, &EIA923_WORKING_YEARS),
            ("ferc1", &self.ferc1_years, &FERC1_WORKING_YEARS),
            ("epacems", &self.epacems_years, &EPACEMS_WORKING_YEARS),
        ];
        for (dataset, years, working) in checks {
            if let Some(&year) = years.iter().find(|y| !working.contains(*y)) {
                return Err(EtlError::InvalidYear { dataset, year });
            }
        }
        Ok(())
    }
}

/// Parameters of a single datapackage.
pub fn package_parameters(pkg: &DatapackageSettings) -> FlattenedParameters {
    get_flattened_etl_parameters(std::slice::from_ref(pkg))
}

/// Merge the parameters of all the datapackages, sorted and without repeats.
pub fn get_flattened_etl_parameters(pkgs: &[DatapackageSettings]) -> FlattenedParameters {
    let mut ferc1_years = BTreeSet::new();
    let mut eia923_years = BTreeSet::new();
    let mut eia860_years = BTreeSet::new();
    let mut epacems_years = BTreeSet::new();
    let mut epacems_states = BTreeSet::new();
    for dataset in pkgs.iter().flat_map(|p| p.datasets.iter()) {
        if let Some(eia) = &dataset.eia {
            eia860_years.extend(eia.eia860_years.iter().copied());
            eia923_years.extend(eia.eia923_years.iter().copied());
        }
        if let Some(ferc1) = &dataset.ferc1 {
            ferc1_years.extend(ferc1.ferc1_years.iter().copied());
        }
        if let Some(cems) = &dataset.epacems {
            epacems_years.extend(cems.epacems_years.iter().copied());
            epacems_states.extend(cems.epacems_states.iter().cloned());
        }
    }
    FlattenedParameters {
        ferc1_years: ferc1_years.into_iter().collect(),
        eia923_years: eia923_years.into_iter().collect(),
        eia860_years: eia860_years.into_iter().collect(),
        epacems_years: epacems_years.into_iter().collect(),
        epacems_states: epacems_states.into_iter().collect(),
    }
}

/// Jan 1 of the first year to Dec 31 of the last one.  No bounds if there are
/// no years.
pub fn glue_window(years: &[i16]) -> (Option<Date>, Option<Date>) {
    let first = years.iter().min();
    let last = years.iter().max();
    match (first, last) {
        (Some(&first), Some(&last)) => match DateRange::with_years(first, last) {
            Some(range) => (Some(range.start), Some(range.end)),
            None => (None, None),
        },
        _ => (None, None),
    }
}

/// Create the bundle directory under `datapkg_dir`.  An existing bundle is
/// only replaced when `clobber` is set.
pub fn prepare_bundle_dir(
    datapkg_dir: &Path,
    bundle_name: &str,
    clobber: bool,
) -> Result<PathBuf, EtlError> {
    let bundle_dir = datapkg_dir.join(bundle_name);
    if bundle_dir.exists() {
        if !clobber {
            return Err(EtlError::BundleExists(bundle_dir));
        }
        warn!("clobbering existing datapackage bundle {:?}", bundle_dir);
        fs::remove_dir_all(&bundle_dir)?;
    }
    fs::create_dir_all(&bundle_dir)?;
    info!("datapackage bundle directory {:?}", bundle_dir);
    Ok(bundle_dir)
}
