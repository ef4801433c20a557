pub mod classify;
pub mod dump_model;
pub mod segment;
