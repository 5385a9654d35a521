pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod errors;
pub mod keystore;
pub mod storage;
