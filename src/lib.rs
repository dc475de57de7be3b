pub mod config;
pub mod fetch;
pub mod holidays;
pub mod operators;
pub mod process;
pub mod years;
