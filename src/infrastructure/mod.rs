pub mod connectivity;
pub mod jobs;
pub mod offline;
pub mod storage;
