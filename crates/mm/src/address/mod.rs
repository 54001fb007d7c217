//! 地址模块
//!
//! 此模块提供物理地址与虚拟地址的强类型抽象，以及页对齐相关的运算。
//!
//! # 地址类型
//!
//! - [`Paddr`] - 物理地址类型
//! - [`Vaddr`] - 虚拟地址类型
//! - [`MappedPtr`] - 映射后的页基址加上原始页内偏移
//!
//! # 操作
//!
//! - [`AlignOps`] - 页/段对齐与页号计算
//!
//! 一级页表只覆盖 32 位虚拟地址空间，超出范围的虚拟地址由映射引擎以
//! [`PagingError::InvalidAddress`](crate::PagingError::InvalidAddress) 拒绝。
mod mapped;
mod types;

pub use mapped::MappedPtr;
pub use types::{AlignOps, Paddr, Vaddr};

use crate::config::{PAGE_MASK, PAGE_SHIFT};

/// 向下对齐到页边界
#[inline]
pub const fn page_align(addr: usize) -> usize {
    addr & !PAGE_MASK
}

/// 向上对齐到页边界
#[inline]
pub const fn page_align_up(addr: usize) -> usize {
    (addr + PAGE_MASK) & !PAGE_MASK
}

/// 向上对齐到页边界，溢出时返回 `None`
#[inline]
pub const fn checked_page_align_up(addr: usize) -> Option<usize> {
    match addr.checked_add(PAGE_MASK) {
        Some(v) => Some(v & !PAGE_MASK),
        None => None,
    }
}

/// 地址所在的页号
#[inline]
pub const fn pfn(addr: usize) -> usize {
    addr >> PAGE_SHIFT
}

/// 覆盖 `[addr, addr + size)` 所需的页数；区间末端超出地址空间时返回 `None`
#[inline]
pub const fn pages_spanned(addr: usize, size: usize) -> Option<usize> {
    let end = match addr.checked_add(size) {
        Some(end) => end,
        None => return None,
    };
    match checked_page_align_up(end) {
        Some(end) => Some(pfn(end) - pfn(page_align(addr))),
        None => None,
    }
}
