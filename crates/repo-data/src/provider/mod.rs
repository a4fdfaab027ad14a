//! 외부 데이터 소스.

pub mod fsc_repo;

pub use fsc_repo::{FscApiSettings, FscRepoClient, RepoTradeSource, DEFAULT_BASE_URL};
