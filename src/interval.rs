pub mod freq;
pub mod interval;
