pub mod assignment_cache;
pub mod db_utils;
pub mod file_store;
