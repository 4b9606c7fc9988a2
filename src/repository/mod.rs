//! 仓储层：钱包、账户与密钥的持久化

pub mod account_store;

pub use account_store::AccountStore;
