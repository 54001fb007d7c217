//! 与用户空间共用定义和声明
//!
//! 包含映射标志、错误码、固定的用户可见地址以及内核信息页（KIP）的布局，
//! 确保内核、pager 和用户任务之间的一致性。

#![no_std]

pub mod errno;
pub mod kip;
pub mod layout;
pub mod mm;

pub use kip::{KernelDesc, KernelInfoPage, SyscallTable};
pub use mm::{MapFlags, TaskId, VmFlags};
