//! 服务层：链能力实现与签名认证协议

pub mod auth;
pub mod chain_ops;
