pub mod backend;
pub mod cdp;
pub mod network;
pub mod storage;
