#[macro_use]
pub mod macros;

pub mod analysis;
pub mod cli;
pub mod collections;
pub mod descriptor;
pub mod driver;
pub mod errors;
pub mod graph;
pub mod index;
pub mod logger;
pub mod model;
pub mod resolve;
pub mod utils;
