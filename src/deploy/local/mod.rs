pub mod db;
pub mod objstore;
