pub mod catalog;
pub mod core;
pub mod lifecycle;
pub mod results;
