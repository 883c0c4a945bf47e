use std::error::Error;
use std::path::Path;

use duckdb::{params, Connection};
use itertools::Itertools;
use jiff::civil::Date;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::db::source::{extend_source, SourceQuery};
use crate::interval::freq::Freq;
use crate::timeseries::{
    association::{AssociationRecord, ExtendedSeries},
    extend::AnnualSeriesExtender,
};
use crate::utils::lib_duckdb::{date_from_epoch_days, epoch_days};

pub const TABLE: &str = "boiler_generator_assn_eia860";

/// Links a boiler to a generator of the same plant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BgaKey {
    pub plant_id_eia: i64,
    pub boiler_id: String,
    pub generator_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BgaAttrs {
    pub unit_id_eia: Option<String>,
    pub unit_id_pudl: Option<i64>,
    /// Where the association came from, e.g. `eia860` or `string_assn`.
    pub bga_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub plant_id_eia: i64,
    pub report_date: Date,
    pub generator_id: String,
    pub boiler_id: String,
    pub unit_id_eia: Option<String>,
    pub unit_id_pudl: Option<i64>,
    pub bga_source: Option<String>,
}

impl From<Row> for AssociationRecord<BgaKey, BgaAttrs> {
    fn from(row: Row) -> Self {
        AssociationRecord {
            key: BgaKey {
                plant_id_eia: row.plant_id_eia,
                boiler_id: row.boiler_id,
                generator_id: row.generator_id,
            },
            report_date: row.report_date,
            attrs: BgaAttrs {
                unit_id_eia: row.unit_id_eia,
                unit_id_pudl: row.unit_id_pudl,
                bga_source: row.bga_source,
            },
        }
    }
}

/// One row of the extended table, flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedBgaRow {
    pub plant_id_eia: i64,
    pub report_date: Date,
    pub generator_id: String,
    pub boiler_id: String,
    pub unit_id_eia: Option<String>,
    pub unit_id_pudl: Option<i64>,
    pub bga_source: Option<String>,
}

pub fn flatten(series: ExtendedSeries<BgaKey, BgaAttrs>) -> Vec<ExtendedBgaRow> {
    series
        .into_iter()
        .map(|r| ExtendedBgaRow {
            plant_id_eia: r.key.plant_id_eia,
            report_date: r.date,
            generator_id: r.key.generator_id,
            boiler_id: r.key.boiler_id,
            unit_id_eia: r.attrs.unit_id_eia,
            unit_id_pudl: r.attrs.unit_id_pudl,
            bga_source: r.attrs.bga_source,
        })
        .collect()
}

#[derive(Debug, Default, Clone)]
pub struct QueryBga {
    pub report_date_gte: Option<Date>,
    pub report_date_lte: Option<Date>,
    pub plant_ids: Option<Vec<i64>>,
}

#[derive(Default)]
pub struct QueryBgaBuilder {
    inner: QueryBga,
}

impl QueryBgaBuilder {
    pub fn new() -> Self {
        Self {
            inner: QueryBga::default(),
        }
    }

    pub fn report_date_gte(mut self, date: Date) -> Self {
        self.inner.report_date_gte = Some(date);
        self
    }

    pub fn report_date_lte(mut self, date: Date) -> Self {
        self.inner.report_date_lte = Some(date);
        self
    }

    pub fn plant_ids(mut self, ids: Vec<i64>) -> Self {
        self.inner.plant_ids = Some(ids);
        self
    }

    pub fn build(self) -> QueryBga {
        self.inner
    }
}

#[derive(Clone, Debug)]
pub struct BoilerGeneratorAssnArchive {
    pub duckdb_path: String,
}

impl BoilerGeneratorAssnArchive {
    pub fn create_table(&self, conn: &Connection) -> Result<(), Box<dyn Error>> {
        conn.execute_batch(&format!(
            r#"
CREATE TABLE IF NOT EXISTS {} (
    plant_id_eia BIGINT NOT NULL,
    report_date DATE NOT NULL,
    generator_id VARCHAR NOT NULL,
    boiler_id VARCHAR NOT NULL,
    unit_id_eia VARCHAR,
    unit_id_pudl BIGINT,
    bga_source VARCHAR
);"#,
            TABLE
        ))?;
        Ok(())
    }

    /// Insert the rows, in order.  Return the number of rows inserted.
    pub fn insert_rows(&self, conn: &Connection, rows: &[Row]) -> Result<usize, Box<dyn Error>> {
        let sql = format!(
            "INSERT INTO {} VALUES (?, ?::DATE, ?, ?, ?, ?, ?);",
            TABLE
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut n = 0;
        for row in rows {
            n += stmt.execute(params![
                row.plant_id_eia,
                row.report_date.to_string(),
                row.generator_id,
                row.boiler_id,
                row.unit_id_eia,
                row.unit_id_pudl,
                row.bga_source,
            ])?;
        }
        Ok(n)
    }

    /// Load a CSV export of the table, with a header row.  Rows already in
    /// the table are not inserted again.
    pub fn update_duckdb(&self, conn: &Connection, csv_path: &Path) -> Result<usize, Box<dyn Error>> {
        info!("inserting boiler generator associations from {:?} ...", csv_path);
        self.create_table(conn)?;
        let sql = format!(
            r#"
INSERT INTO {table}
(
    SELECT
        plant_id_eia::BIGINT,
        report_date::DATE,
        generator_id::VARCHAR,
        boiler_id::VARCHAR,
        unit_id_eia::VARCHAR,
        unit_id_pudl::BIGINT,
        bga_source::VARCHAR
    FROM read_csv('{path}', header = true, all_varchar = true) t
    WHERE NOT EXISTS (
        SELECT * FROM {table} d
        WHERE
            d.plant_id_eia = t.plant_id_eia::BIGINT AND
            d.report_date = t.report_date::DATE AND
            d.generator_id = t.generator_id AND
            d.boiler_id = t.boiler_id
    )
);"#,
            table = TABLE,
            path = csv_path.display()
        );
        match conn.execute(&sql, params![]) {
            Ok(n) => {
                info!("  inserted {} rows", n);
                Ok(n)
            }
            Err(e) => {
                error!("Failed to load {:?}: {}", csv_path, e);
                Err(e.into())
            }
        }
    }

    /// Select the associations, in insertion order.  The extension relies on
    /// this order to resolve duplicate (key, date) rows.
    pub fn get_data(&self, conn: &Connection, query: &QueryBga) -> Result<Vec<Row>, Box<dyn Error>> {
        let mut sql = format!(
            r#"
SELECT plant_id_eia, {}, generator_id, boiler_id, unit_id_eia, unit_id_pudl, bga_source
FROM {}
WHERE 1=1"#,
            epoch_days("report_date"),
            TABLE
        );
        if let Some(start) = query.report_date_gte {
            sql.push_str(&format!(" AND report_date >= '{}'", start));
        }
        if let Some(end) = query.report_date_lte {
            sql.push_str(&format!(" AND report_date <= '{}'", end));
        }
        if let Some(ids) = &query.plant_ids {
            if ids.is_empty() {
                return Ok(vec![]);
            }
            sql.push_str(&format!(" AND plant_id_eia IN ({})", ids.iter().join(", ")));
        }
        sql.push_str(" ORDER BY rowid;");

        let mut stmt = conn.prepare(&sql)?;
        let res_iter = stmt.query_map([], |row| {
            Ok(Row {
                plant_id_eia: row.get::<usize, i64>(0)?,
                report_date: date_from_epoch_days(row.get::<usize, i32>(1)?),
                generator_id: row.get::<usize, String>(2)?,
                boiler_id: row.get::<usize, String>(3)?,
                unit_id_eia: row.get::<usize, Option<String>>(4)?,
                unit_id_pudl: row.get::<usize, Option<i64>>(5)?,
                bga_source: row.get::<usize, Option<String>>(6)?,
            })
        })?;
        let rows = res_iter.collect::<Result<Vec<Row>, duckdb::Error>>()?;
        Ok(rows)
    }

    pub fn source<'a>(&'a self, conn: &'a Connection) -> BgaSource<'a> {
        BgaSource {
            archive: self,
            conn,
            plant_ids: None,
        }
    }
}

/// The association table as a [`SourceQuery`], with the date bounds pushed
/// down into the select.
pub struct BgaSource<'a> {
    archive: &'a BoilerGeneratorAssnArchive,
    conn: &'a Connection,
    pub plant_ids: Option<Vec<i64>>,
}

impl SourceQuery for BgaSource<'_> {
    type Key = BgaKey;
    type Attrs = BgaAttrs;

    fn fetch(
        &self,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<Vec<AssociationRecord<BgaKey, BgaAttrs>>, Box<dyn Error>> {
        let query = QueryBga {
            report_date_gte: start,
            report_date_lte: end,
            plant_ids: self.plant_ids.clone(),
        };
        let rows = self.archive.get_data(self.conn, &query)?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

/// Pull the boiler generator associations and fill them forward over
/// `[start, end]` at the given frequency.
pub fn boiler_generator_assn(
    archive: &BoilerGeneratorAssnArchive,
    conn: &Connection,
    freq: Freq,
    start: Option<Date>,
    end: Option<Date>,
) -> Result<ExtendedSeries<BgaKey, BgaAttrs>, Box<dyn Error>> {
    extend_source(
        &archive.source(conn),
        &AnnualSeriesExtender::new(freq),
        start,
        end,
    )
}

#[cfg(test)]
mod tests {
    use std::{error::Error, io::Write};

    use duckdb::Connection;
    use jiff::civil::date;

    use crate::db::source::VecSource;

    use super::*;

    fn row(plant: i64, d: Date, gen: &str, boiler: &str, unit: Option<i64>) -> Row {
        Row {
            plant_id_eia: plant,
            report_date: d,
            generator_id: gen.to_string(),
            boiler_id: boiler.to_string(),
            unit_id_eia: None,
            unit_id_pudl: unit,
            bga_source: Some("eia860".to_string()),
        }
    }

    fn fixture() -> Result<(BoilerGeneratorAssnArchive, Connection), Box<dyn Error>> {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Info)
            .is_test(true)
            .try_init();
        let archive = BoilerGeneratorAssnArchive {
            duckdb_path: ":memory:".to_string(),
        };
        let conn = Connection::open_in_memory()?;
        archive.create_table(&conn)?;
        let rows = vec![
            row(3, date(2011, 1, 1), "1", "1", Some(1)),
            row(3, date(2013, 1, 1), "1", "1", Some(2)),
            row(3, date(2012, 1, 1), "2", "2", None),
            row(10, date(2014, 1, 1), "GT1", "HRSG1", Some(7)),
        ];
        let n = archive.insert_rows(&conn, &rows)?;
        assert_eq!(n, 4);
        Ok((archive, conn))
    }

    #[test]
    fn get_data_pushdown() -> Result<(), Box<dyn Error>> {
        let (archive, conn) = fixture()?;
        let all = archive.get_data(&conn, &QueryBga::default())?;
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].report_date, date(2011, 1, 1));

        let query = QueryBgaBuilder::new()
            .report_date_gte(date(2012, 1, 1))
            .report_date_lte(date(2013, 1, 1))
            .build();
        let rows = archive.get_data(&conn, &query)?;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.plant_id_eia == 3));

        let query = QueryBgaBuilder::new().plant_ids(vec![10]).build();
        let rows = archive.get_data(&conn, &query)?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].boiler_id, "HRSG1");
        assert_eq!(rows[0].unit_id_pudl, Some(7));

        let query = QueryBgaBuilder::new().plant_ids(vec![]).build();
        assert!(archive.get_data(&conn, &query)?.is_empty());
        Ok(())
    }

    #[test]
    fn extend_from_db() -> Result<(), Box<dyn Error>> {
        let (archive, conn) = fixture()?;
        let out = boiler_generator_assn(
            &archive,
            &conn,
            Freq::Annual,
            Some(date(2011, 1, 1)),
            Some(date(2014, 12, 31)),
        )?;
        let key = BgaKey {
            plant_id_eia: 3,
            boiler_id: "1".to_string(),
            generator_id: "1".to_string(),
        };
        let units: Vec<Option<i64>> = out
            .rows_for(&key)
            .iter()
            .map(|r| r.attrs.unit_id_pudl)
            .collect();
        assert_eq!(units, vec![Some(1), Some(1), Some(2), Some(2)]);
        assert_eq!(out.keys().len(), 3);
        assert_eq!(out.len(), 4 + 3 + 1);

        let rows = flatten(out);
        assert_eq!(rows[0].plant_id_eia, 3);
        assert_eq!(rows[0].report_date, date(2011, 1, 1));
        assert_eq!(rows.last().map(|r| r.boiler_id.as_str()), Some("HRSG1"));
        Ok(())
    }

    #[test]
    fn filtered_and_unfiltered_agree() -> Result<(), Box<dyn Error>> {
        let (archive, conn) = fixture()?;
        let start = Some(date(2012, 1, 1));
        let end = Some(date(2013, 12, 31));
        let from_db = boiler_generator_assn(&archive, &conn, Freq::Annual, start, end)?;

        let all = archive.get_data(&conn, &QueryBga::default())?;
        let in_memory = VecSource(all.into_iter().map(|r| r.into()).collect());
        let from_memory = extend_source(
            &in_memory,
            &AnnualSeriesExtender::new(Freq::Annual),
            start,
            end,
        )?;
        assert_eq!(from_db, from_memory);
        Ok(())
    }

    #[test]
    fn update_from_csv() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bga.csv");
        let mut file = std::fs::File::create(&path)?;
        writeln!(
            file,
            "plant_id_eia,report_date,generator_id,boiler_id,unit_id_eia,unit_id_pudl,bga_source"
        )?;
        writeln!(file, "3,2011-01-01,1,1,,1,eia860")?;
        writeln!(file, "3,2012-01-01,1,1,,1,eia860")?;
        drop(file);

        let archive = BoilerGeneratorAssnArchive {
            duckdb_path: ":memory:".to_string(),
        };
        let conn = Connection::open_in_memory()?;
        assert_eq!(archive.update_duckdb(&conn, &path)?, 2);
        // loading the same file again adds nothing
        assert_eq!(archive.update_duckdb(&conn, &path)?, 0);
        let rows = archive.get_data(&conn, &QueryBga::default())?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].report_date, date(2012, 1, 1));
        assert_eq!(rows[0].unit_id_eia, None);
        Ok(())
    }
}
