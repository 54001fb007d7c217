//! 测试支持 crate
//!
//! 提供架构相关操作的 Mock 实现，供各子系统 crate 在宿主机上测试

#![no_std]

pub mod mock;
