//! 映射指针
//!
//! 映射文件区间或用户缓冲区时，返回值是“新映射的页基址 | 原始页内偏移”，
//! 调用者据此直接访问原始字节。

use super::types::{AlignOps, Vaddr};
use crate::config::PAGE_MASK;

/// 页对齐的映射基址与原始页内偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedPtr {
    base: Vaddr,
    offset: usize,
}

impl MappedPtr {
    /// 组合映射基址与原始地址中的页内偏移
    ///
    /// `base` 必须页对齐；`addr` 只取其页内偏移部分。
    pub fn new(base: Vaddr, addr: usize) -> Self {
        debug_assert!(base.is_page_aligned());
        Self {
            base,
            offset: addr & PAGE_MASK,
        }
    }

    /// 页对齐的映射基址
    pub fn base(&self) -> Vaddr {
        self.base
    }

    /// 页内偏移
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 调用者可直接使用的地址
    pub fn encode(&self) -> usize {
        self.base.as_usize() | self.offset
    }

    /// 由调用者持有的地址还原
    pub fn decode(ptr: usize) -> Self {
        Self {
            base: Vaddr::new(ptr & !PAGE_MASK),
            offset: ptr & PAGE_MASK,
        }
    }
}

impl From<MappedPtr> for usize {
    fn from(ptr: MappedPtr) -> usize {
        ptr.encode()
    }
}
