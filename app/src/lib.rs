//! sw-app library crate
//! CLI 参数、JSON 报告与日志初始化，供 `sw-connectivity` 二进制使用。

pub mod cli;
pub mod report;
pub mod tracing_init;
