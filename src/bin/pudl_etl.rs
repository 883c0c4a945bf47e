use std::{env, error::Error, fs, path::PathBuf};

use clap::Parser;
use duckdb::AccessMode;
use log::{info, warn};
use pudl::{
    db::{eia::boiler_generator_assn::{boiler_generator_assn, flatten}, prod_db::ProdDb},
    etl::{get_flattened_etl_parameters, glue_window, package_parameters, prepare_bundle_dir},
    interval::freq::Freq,
    settings::{resolve, Defaults, ScriptSettings},
};
use tabled::{builder::Builder, settings::Style};

/// Build the datapackages listed in a settings file.
///
/// Directories missing from the settings file are taken from the defaults
/// file, `$HOME/.pudl.yml` unless the `PUDL_DEFAULTS` variable points
/// somewhere else.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML datapackage settings file
    settings_file: PathBuf,

    /// Replace the datapackage bundle directory if it already exists.
    /// Without it the build fails, so either pkg_bundle_name needs to be
    /// unique or you need to pass --clobber.
    #[arg(short, long, default_value_t = false)]
    clobber: bool,
}

fn defaults_path() -> PathBuf {
    if let Ok(path) = env::var("PUDL_DEFAULTS") {
        return PathBuf::from(path);
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".pudl.yml")
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    if dotenvy::dotenv().is_ok() {
        info!("loaded environment from .env");
    }

    let script_settings = ScriptSettings::from_file(&args.settings_file)?;
    let defaults = Defaults::from_file(&defaults_path())?;
    let settings = resolve(script_settings, &defaults)?;

    let params = get_flattened_etl_parameters(&settings.pkg_bundle_settings);
    params.validate()?;
    if params.is_empty() {
        warn!("no years or tables in the bundle settings, nothing to do");
        return Ok(());
    }

    let bundle_dir = prepare_bundle_dir(
        &settings.paths.datapkg_dir,
        &settings.pkg_bundle_name,
        args.clobber,
    )?;

    let db = ProdDb::new(settings.paths.clone());
    let archive = db.boiler_generator_assn_eia860();
    let conn = db.connect(AccessMode::ReadOnly)?;

    let mut builder = Builder::new();
    builder.push_record(vec!["Datapackage", "Start", "End", "Associations", "Rows"]);
    for pkg in &settings.pkg_bundle_settings {
        let pkg_params = package_parameters(pkg);
        if pkg_params.is_empty() {
            warn!("datapackage {} has empty parameters, skipping", pkg.name);
            continue;
        }
        let (start, end) = glue_window(&pkg_params.eia860_years);
        if start.is_none() {
            info!("datapackage {} has no EIA 860 years", pkg.name);
            continue;
        }
        let series = boiler_generator_assn(&archive, &conn, Freq::Annual, start, end)?;
        let n_keys = series.keys().len();
        let rows = flatten(series);

        let pkg_dir = bundle_dir.join(&pkg.name);
        fs::create_dir_all(&pkg_dir)?;
        let mut wtr = csv::Writer::from_path(pkg_dir.join("boiler_generator_assn.csv"))?;
        for row in &rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;

        builder.push_record(vec![
            pkg.name.clone(),
            start.map(|d| d.to_string()).unwrap_or_default(),
            end.map(|d| d.to_string()).unwrap_or_default(),
            n_keys.to_string(),
            rows.len().to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    info!("boiler generator associations:\n{}", table);

    Ok(())
}
