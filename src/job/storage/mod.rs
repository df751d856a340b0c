pub mod database;
pub mod objstore;
