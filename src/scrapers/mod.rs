pub mod base;
pub mod yahoo;
