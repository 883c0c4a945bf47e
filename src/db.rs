pub mod eia;
pub mod prod_db;
pub mod source;
