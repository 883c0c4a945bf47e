use std::{error::Error, time::Duration};

use duckdb::{AccessMode, Connection};

use crate::{settings::PudlPaths, utils::lib_duckdb::open_with_retry};

use super::eia::boiler_generator_assn::BoilerGeneratorAssnArchive;

/// Locations of the tables of a PUDL workspace.
pub struct ProdDb {
    paths: PudlPaths,
}

impl ProdDb {
    pub fn new(paths: PudlPaths) -> ProdDb {
        ProdDb { paths }
    }

    pub fn pudl_db_path(&self) -> String {
        self.paths.pudl_db.to_string_lossy().to_string()
    }

    pub fn boiler_generator_assn_eia860(&self) -> BoilerGeneratorAssnArchive {
        BoilerGeneratorAssnArchive {
            duckdb_path: self.pudl_db_path(),
        }
    }

    /// Open the PUDL database.
    pub fn connect(&self, access_mode: AccessMode) -> Result<Connection, Box<dyn Error>> {
        let conn = open_with_retry(
            &self.pudl_db_path(),
            8,
            Duration::from_millis(25),
            access_mode,
        )?;
        Ok(conn)
    }
}
