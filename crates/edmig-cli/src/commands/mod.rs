pub mod migrate;
pub mod strategies;
