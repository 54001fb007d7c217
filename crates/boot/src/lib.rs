//! 内核启动
//!
//! 从物理地址执行、MMU 关闭的状态出发，直到第一个任务被调度：
//!
//! 1. 启动映射：清零 init 页表，为内核所在的 1MB 段建立虚拟映射和恒等映射
//! 2. 启用 MMU：按固定顺序装入页表基址、设置访问域、打开 cache、失效旧内容、开启地址转换
//! 3. 跳转到虚拟地址继续执行，删除恒等映射
//! 4. 平台初始化、异常向量页、段映射换成小页、KIP、系统调用页、调度器与系统资源
//! 5. 交接：切换到第一个任务的栈，释放启动期内存，公布 UTCB 地址，启动调度器
//!
//! 整个过程由 [`BootContext`] 串起，硬件操作通过 [`MmuActivation`] 与架构解耦。
//! 第 2 步之后不存在“返回”：每次切换执行环境都是一次不返回的调用，
//! 上下文被复制到新的执行环境后继续推进 [`BootPhase`]。

#![no_std]

extern crate alloc;

mod activation;
mod context;
mod error;
mod handoff;
pub mod kip;
mod layout;
pub mod mapper;
mod platform;

pub use activation::{enable_translation, MmuActivation};
pub use context::{BootContext, BootPhase, BootTables, CurrentTask};
pub use error::{BootError, BootResult};
pub use handoff::stack_top_for;
pub use layout::{BuildInfo, KernelLayout};
pub use platform::{Container, KernelResources, Platform, Scheduler, TaskRef};
