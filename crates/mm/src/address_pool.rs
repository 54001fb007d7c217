//! 虚拟地址池
//!
//! 在 [`IdPool`] 之上按页分配一段固定虚拟地址区间 `[base, limit)`。
//! 区间大小在构造时对照位图容量检查，超出时拒绝而不是截断。
//!
//! 地址池本身不加锁；共享时由调用者放进 [`sync::SpinLock`]。

use core::fmt;

use log::debug;

use crate::address::{AlignOps, Vaddr};
use crate::config::{PAGE_SHIFT, PAGE_SIZE};
use crate::id_pool::IdPool;

/// 覆盖 256MB 虚拟地址所需的位图字数
pub const ADDRESS_POOL_256MB: usize = (256 << 20) / PAGE_SIZE / u64::BITS as usize;

/// 地址池错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// 区间边界或释放地址未页对齐
    Unaligned,
    /// `limit <= base`
    EmptyRange,
    /// 区间超出位图容量
    ExceedsCapacity,
    /// 释放的区间不在池内
    OutOfRange,
    /// 释放的区间包含未分配的页
    NotAllocated,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Unaligned => write!(f, "address is not page aligned"),
            PoolError::EmptyRange => write!(f, "pool range is empty"),
            PoolError::ExceedsCapacity => write!(f, "pool range exceeds bitmap capacity"),
            PoolError::OutOfRange => write!(f, "range is outside the pool"),
            PoolError::NotAllocated => write!(f, "range was not allocated"),
        }
    }
}

/// 虚拟地址池
pub struct AddressPool<const NWORDS: usize> {
    base: Vaddr,
    limit: Vaddr,
    bitmap: IdPool<NWORDS>,
}

impl<const NWORDS: usize> AddressPool<NWORDS> {
    /// 位图最多能描述的页数
    pub const CAPACITY_PAGES: usize = IdPool::<NWORDS>::CAPACITY;

    /// 创建覆盖 `[base, limit)` 的地址池
    pub fn new(base: Vaddr, limit: Vaddr) -> Result<Self, PoolError> {
        if !base.is_page_aligned() || !limit.is_page_aligned() {
            return Err(PoolError::Unaligned);
        }
        if limit <= base {
            return Err(PoolError::EmptyRange);
        }
        let pages = (limit - base) >> PAGE_SHIFT;
        let bitmap = IdPool::new(pages)?;
        debug!("address pool: [{:#x}, {:#x}), {} pages", base, limit, pages);
        Ok(Self { base, limit, bitmap })
    }

    /// 池起始地址
    pub fn base(&self) -> Vaddr {
        self.base
    }

    /// 池结束地址（不包含）
    pub fn limit(&self) -> Vaddr {
        self.limit
    }

    /// 分配 `npages` 个连续页，返回起始地址
    pub fn allocate(&mut self, npages: usize) -> Option<Vaddr> {
        let idx = self.bitmap.alloc_contig(npages)?;
        Some(self.base.add_pages(idx))
    }

    /// 归还 `allocate` 得到的区间
    pub fn free(&mut self, addr: Vaddr, npages: usize) -> Result<(), PoolError> {
        if !addr.is_page_aligned() {
            return Err(PoolError::Unaligned);
        }
        if addr < self.base || addr >= self.limit {
            return Err(PoolError::OutOfRange);
        }
        self.bitmap.free_contig((addr - self.base) >> PAGE_SHIFT, npages)
    }

    /// 地址是否落在池内
    pub fn contains(&self, addr: Vaddr) -> bool {
        addr >= self.base && addr < self.limit
    }

    /// 某页是否已分配
    pub fn is_allocated(&self, addr: Vaddr) -> bool {
        self.contains(addr) && self.bitmap.is_set((addr - self.base) >> PAGE_SHIFT)
    }

    /// 池中的总页数
    pub fn total_pages(&self) -> usize {
        self.bitmap.len()
    }

    /// 已分配的页数
    pub fn allocated_pages(&self) -> usize {
        self.bitmap.allocated()
    }

    /// 空闲的页数
    pub fn free_pages(&self) -> usize {
        self.bitmap.len() - self.bitmap.allocated()
    }

    /// 是否没有任何已分配的页
    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    /// 位图是否全零
    pub fn bitmap_is_clear(&self) -> bool {
        self.bitmap.words().iter().all(|&w| w == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fit_reuses_freed_space() {
        let mut pool = AddressPool::<1>::new(Vaddr::new(0x1000), Vaddr::new(0x11000)).unwrap();
        assert_eq!(pool.total_pages(), 16);
        assert_eq!(pool.allocate(4), Some(Vaddr::new(0x1000)));
        assert_eq!(pool.allocate(4), Some(Vaddr::new(0x5000)));
        pool.free(Vaddr::new(0x1000), 4).unwrap();
        assert_eq!(pool.allocate(2), Some(Vaddr::new(0x1000)));
        assert_eq!(pool.allocated_pages(), 6);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut pool = AddressPool::<1>::new(Vaddr::new(0x1000), Vaddr::new(0x5000)).unwrap();
        assert_eq!(pool.allocate(4), Some(Vaddr::new(0x1000)));
        assert_eq!(pool.allocate(1), None);
        assert_eq!(pool.free_pages(), 0);
    }

    #[test]
    fn test_construction_is_validated() {
        assert_eq!(
            AddressPool::<1>::new(Vaddr::new(0x1001), Vaddr::new(0x5000)).err(),
            Some(PoolError::Unaligned)
        );
        assert_eq!(
            AddressPool::<1>::new(Vaddr::new(0x5000), Vaddr::new(0x5000)).err(),
            Some(PoolError::EmptyRange)
        );
        // 65 页超过单字位图
        assert_eq!(
            AddressPool::<1>::new(Vaddr::new(0), Vaddr::new(65 * PAGE_SIZE)).err(),
            Some(PoolError::ExceedsCapacity)
        );
    }

    #[test]
    fn test_free_outside_pool_is_rejected() {
        let mut pool = AddressPool::<1>::new(Vaddr::new(0x1000), Vaddr::new(0x5000)).unwrap();
        assert_eq!(pool.free(Vaddr::new(0x9000), 1), Err(PoolError::OutOfRange));
        assert_eq!(pool.free(Vaddr::new(0x1800), 1), Err(PoolError::Unaligned));
        assert_eq!(pool.free(Vaddr::new(0x1000), 1), Err(PoolError::NotAllocated));
    }

    #[test]
    fn test_256mb_pool_capacity() {
        assert_eq!(AddressPool::<ADDRESS_POOL_256MB>::CAPACITY_PAGES, 65536);
    }
}
