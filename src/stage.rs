pub mod model;
pub mod outcome;
mod processor;
