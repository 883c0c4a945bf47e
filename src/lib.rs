pub mod db;
pub mod etl;
pub mod interval;
pub mod settings;
pub mod timeseries;
pub mod utils;
