pub mod fill;
pub mod form;
pub mod metrics;
