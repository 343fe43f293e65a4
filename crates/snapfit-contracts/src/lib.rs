pub mod capture;
pub mod result;
pub mod schema;
pub mod search;
pub mod storage;
pub mod tags;
