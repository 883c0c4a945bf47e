use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings key '{0}' is missing and has no default")]
    MissingKey(&'static str),
    #[error("failed reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed parsing {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Tables and years to pull from the EIA forms.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EiaSettings {
    #[serde(default)]
    pub eia860_tables: Vec<String>,
    #[serde(default)]
    pub eia860_years: Vec<i16>,
    #[serde(default)]
    pub eia923_tables: Vec<String>,
    #[serde(default)]
    pub eia923_years: Vec<i16>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Ferc1Settings {
    #[serde(default)]
    pub ferc1_tables: Vec<String>,
    #[serde(default)]
    pub ferc1_years: Vec<i16>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EpaCemsSettings {
    #[serde(default)]
    pub epacems_years: Vec<i16>,
    #[serde(default)]
    pub epacems_states: Vec<String>,
}

/// One entry of a datapackage's `datasets` list.  In the settings file each
/// entry is a map with a single key naming the dataset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DatasetSettings {
    pub eia: Option<EiaSettings>,
    pub ferc1: Option<Ferc1Settings>,
    pub epacems: Option<EpaCemsSettings>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatapackageSettings {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub datasets: Vec<DatasetSettings>,
}

/// The settings file as written by the user.  Every key is optional here,
/// see [`resolve`] for which ones must end up with a value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScriptSettings {
    pub pudl_in: Option<PathBuf>,
    pub pudl_out: Option<PathBuf>,
    pub pkg_bundle_name: Option<String>,
    pub pkg_bundle_settings: Option<Vec<DatapackageSettings>>,
}

/// Fallback workspace directories, usually kept in `$HOME/.pudl.yml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    pub pudl_in: Option<PathBuf>,
    pub pudl_out: Option<PathBuf>,
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, SettingsError> {
    let buffer = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&buffer).map_err(|source| SettingsError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

impl ScriptSettings {
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        read_yaml(path)
    }
}

impl Defaults {
    /// A missing defaults file means there are no defaults.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Defaults::default());
        }
        read_yaml(path)
    }
}

/// Directory layout of a PUDL workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct PudlPaths {
    pub pudl_in: PathBuf,
    pub data_dir: PathBuf,
    pub settings_dir: PathBuf,
    pub pudl_out: PathBuf,
    pub sqlite_dir: PathBuf,
    pub parquet_dir: PathBuf,
    pub datapkg_dir: PathBuf,
    pub notebook_dir: PathBuf,
    pub pudl_db: PathBuf,
}

pub fn derive_paths(pudl_in: &Path, pudl_out: &Path) -> PudlPaths {
    let sqlite_dir = pudl_out.join("sqlite");
    PudlPaths {
        pudl_in: pudl_in.to_path_buf(),
        data_dir: pudl_in.join("data"),
        settings_dir: pudl_in.join("settings"),
        pudl_out: pudl_out.to_path_buf(),
        pudl_db: sqlite_dir.join("pudl.duckdb"),
        sqlite_dir,
        parquet_dir: pudl_out.join("parquet"),
        datapkg_dir: pudl_out.join("datapkg"),
        notebook_dir: pudl_out.join("notebook"),
    }
}

/// Settings with every required key filled in.
#[derive(Debug, Clone)]
pub struct EtlSettings {
    pub paths: PudlPaths,
    pub pkg_bundle_name: String,
    pub pkg_bundle_settings: Vec<DatapackageSettings>,
}

/// Fill `pudl_in` and `pudl_out` from the defaults when the settings file
/// doesn't have them, and derive the directory layout.
pub fn resolve(settings: ScriptSettings, defaults: &Defaults) -> Result<EtlSettings, SettingsError> {
    let pudl_in = settings
        .pudl_in
        .or_else(|| defaults.pudl_in.clone())
        .ok_or(SettingsError::MissingKey("pudl_in"))?;
    let pudl_out = settings
        .pudl_out
        .or_else(|| defaults.pudl_out.clone())
        .ok_or(SettingsError::MissingKey("pudl_out"))?;
    let pkg_bundle_settings = settings
        .pkg_bundle_settings
        .ok_or(SettingsError::MissingKey("pkg_bundle_settings"))?;
    let pkg_bundle_name = settings
        .pkg_bundle_name
        .ok_or(SettingsError::MissingKey("pkg_bundle_name"))?;
    Ok(EtlSettings {
        paths: derive_paths(&pudl_in, &pudl_out),
        pkg_bundle_name,
        pkg_bundle_settings,
    })
}

#[cfg(test)]
mod tests {
    use std::{error::Error, io::Write};

    use super::*;

    const SETTINGS: &str = r#"
pudl_out: /tmp/pudl_out
pkg_bundle_name: pudl-test
pkg_bundle_settings:
  - name: pudl-test
    title: Test package
    datasets:
      - eia:
          eia860_tables:
            - boiler_generator_assn_eia860
          eia860_years: [2017, 2018]
          eia923_years: [2018]
      - epacems:
          epacems_years: [2018]
          epacems_states: [ID]
"#;

    #[test]
    fn parse_settings_file() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(SETTINGS.as_bytes())?;
        let settings = ScriptSettings::from_file(file.path())?;
        assert_eq!(settings.pudl_in, None);
        assert_eq!(settings.pudl_out, Some(PathBuf::from("/tmp/pudl_out")));
        let pkgs = settings.pkg_bundle_settings.unwrap();
        assert_eq!(pkgs.len(), 1);
        assert_eq!(pkgs[0].datasets.len(), 2);
        let eia = pkgs[0].datasets[0].eia.as_ref().unwrap();
        assert_eq!(eia.eia860_years, vec![2017, 2018]);
        assert!(pkgs[0].datasets[0].ferc1.is_none());
        let cems = pkgs[0].datasets[1].epacems.as_ref().unwrap();
        assert_eq!(cems.epacems_states, vec!["ID".to_string()]);
        Ok(())
    }

    #[test]
    fn fallback_to_defaults() -> Result<(), Box<dyn Error>> {
        let settings: ScriptSettings = serde_yaml::from_str(SETTINGS)?;
        let defaults = Defaults {
            pudl_in: Some(PathBuf::from("/home/pudl/in")),
            pudl_out: Some(PathBuf::from("/home/pudl/out")),
        };
        let etl = resolve(settings, &defaults)?;
        assert_eq!(etl.paths.pudl_in, PathBuf::from("/home/pudl/in"));
        // the settings file wins over the defaults
        assert_eq!(etl.paths.pudl_out, PathBuf::from("/tmp/pudl_out"));
        assert_eq!(etl.pkg_bundle_name, "pudl-test");
        Ok(())
    }

    #[test]
    fn missing_keys() -> Result<(), Box<dyn Error>> {
        let settings: ScriptSettings = serde_yaml::from_str(SETTINGS)?;
        let err = resolve(settings.clone(), &Defaults::default()).unwrap_err();
        assert!(matches!(err, SettingsError::MissingKey("pudl_in")));

        let defaults = Defaults {
            pudl_in: Some(PathBuf::from("/in")),
            pudl_out: None,
        };
        let mut no_name = settings;
        no_name.pkg_bundle_name = None;
        let err = resolve(no_name, &defaults).unwrap_err();
        assert!(matches!(err, SettingsError::MissingKey("pkg_bundle_name")));
        assert_eq!(
            err.to_string(),
            "settings key 'pkg_bundle_name' is missing and has no default"
        );
        Ok(())
    }

    #[test]
    fn missing_defaults_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let defaults = Defaults::from_file(&dir.path().join(".pudl.yml"))?;
        assert_eq!(defaults, Defaults::default());
        Ok(())
    }

    #[test]
    fn bad_yaml() -> Result<(), Box<dyn Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"pkg_bundle_settings: [unclosed")?;
        let err = ScriptSettings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Yaml { .. }));
        Ok(())
    }

    #[test]
    fn workspace_layout() {
        let paths = derive_paths(Path::new("/pudl/in"), Path::new("/pudl/out"));
        assert_eq!(paths.data_dir, PathBuf::from("/pudl/in/data"));
        assert_eq!(paths.settings_dir, PathBuf::from("/pudl/in/settings"));
        assert_eq!(paths.datapkg_dir, PathBuf::from("/pudl/out/datapkg"));
        assert_eq!(paths.parquet_dir, PathBuf::from("/pudl/out/parquet"));
        assert_eq!(paths.notebook_dir, PathBuf::from("/pudl/out/notebook"));
        assert_eq!(paths.pudl_db, PathBuf::from("/pudl/out/sqlite/pudl.duckdb"));
    }
}
