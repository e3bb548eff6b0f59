pub mod acceptance;
pub mod schedule;
