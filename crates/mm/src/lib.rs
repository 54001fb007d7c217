//! 内存管理子系统
//!
//! 提供地址抽象、位图地址池、两级页表以及页映射引擎。
//!
//! # 架构解耦
//!
//! 通过 [`ArchMmOps`] 与架构特定组件解耦（物理/虚拟地址转换、TLB 维护），
//! 使用前必须调用 [`register_arch_ops`] 注册实现。
//!
//! # 模块组成
//!
//! - [`address`]：物理/虚拟地址类型与带页内偏移的映射指针
//! - [`id_pool`] / [`address_pool`]：固定容量位图及其之上的虚拟地址池
//! - [`page_table`]：段（1MB）与小页（4KB）两种粒度的两级页表
//! - [`mapping`]：多页映射/解除映射（失败时整体回滚）以及启动期的段映射操作
//! - [`space`]：按任务划分、加锁保护的地址空间句柄

#![no_std]

extern crate alloc;

mod arch_ops;
pub mod config;

pub mod address;
pub mod address_pool;
pub mod id_pool;
pub mod mapping;
pub mod page_table;
pub mod space;

pub use arch_ops::{arch_ops, register_arch_ops, ArchMmOps};

// Re-export 常用类型
pub use address::{AlignOps, MappedPtr, Paddr, Vaddr};
pub use address_pool::{AddressPool, PoolError};
pub use id_pool::IdPool;
pub use page_table::{
    Granularity, L1Entry, L1Kind, L2Entry, Mapping, PagingError, PagingResult, TranslationTable,
};
pub use space::AddressSpace;
pub use uapi::{MapFlags, TaskId};
