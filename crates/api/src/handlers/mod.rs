pub mod datasets;
pub mod generation;
pub mod training;
