//! 工具模块

pub mod time_utils;
