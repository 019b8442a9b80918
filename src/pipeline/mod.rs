pub mod generation;
pub mod storage;
pub mod export;
