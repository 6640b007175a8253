pub mod generator;
pub mod reconcile;
