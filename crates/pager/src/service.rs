//! 映射服务

use mm::{AddressSpace, MapFlags, Paddr, PagingResult, TaskId, Vaddr};

/// 在指定任务的地址空间中建立/解除映射
pub trait MapService {
    /// 映射 `npages` 个连续物理页；失败时不留下任何新映射
    fn map(&self, pa: Paddr, va: Vaddr, npages: usize, flags: MapFlags, tid: TaskId) -> PagingResult<()>;

    /// 解除 `npages` 个页的映射
    fn unmap(&self, va: Vaddr, npages: usize, tid: TaskId) -> PagingResult<()>;
}

impl MapService for AddressSpace {
    fn map(&self, pa: Paddr, va: Vaddr, npages: usize, flags: MapFlags, tid: TaskId) -> PagingResult<()> {
        AddressSpace::map(self, pa, va, npages, flags, tid)
    }

    fn unmap(&self, va: Vaddr, npages: usize, tid: TaskId) -> PagingResult<()> {
        AddressSpace::unmap(self, va, npages, tid)
    }
}

impl<T: MapService + ?Sized> MapService for &T {
    fn map(&self, pa: Paddr, va: Vaddr, npages: usize, flags: MapFlags, tid: TaskId) -> PagingResult<()> {
        (**self).map(pa, va, npages, flags, tid)
    }

    fn unmap(&self, va: Vaddr, npages: usize, tid: TaskId) -> PagingResult<()> {
        (**self).unmap(va, npages, tid)
    }
}
