//! 手续费估算值对象

use serde::{Deserialize, Serialize};

/// 一次转账的费用预估（不可变，无标识）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// UI 单位的费用字符串（如 "0.000015"）
    pub fee: String,
    pub symbol: String,
}
