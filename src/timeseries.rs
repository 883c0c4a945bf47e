pub mod association;
pub mod extend;
