//! 任务地址空间
//!
//! 每个任务拥有一张独立的一级页表，由自旋锁保护：对同一张表的映射调用串行执行，
//! 不同任务的表互不影响。

use alloc::boxed::Box;

use sync::SpinLock;

use crate::address::{Paddr, Vaddr};
use crate::arch_ops::arch_ops;
use crate::mapping;
use crate::page_table::{Mapping, PagingError, PagingResult, TranslationTable};
use uapi::{MapFlags, TaskId};

/// 任务地址空间句柄
pub struct AddressSpace {
    owner: TaskId,
    table: SpinLock<Box<TranslationTable>>,
}

impl AddressSpace {
    /// 为 `owner` 创建空地址空间
    pub fn new(owner: TaskId) -> PagingResult<Self> {
        Ok(Self {
            owner,
            table: SpinLock::new(TranslationTable::new_boxed()?),
        })
    }

    /// 所属任务
    pub fn owner(&self) -> TaskId {
        self.owner
    }

    fn check_owner(&self, tid: TaskId) -> PagingResult<()> {
        if tid != self.owner {
            return Err(PagingError::WrongSpace);
        }
        Ok(())
    }

    /// 映射 `npages` 个连续物理页，失败时不留下任何新映射
    pub fn map(
        &self,
        pa: Paddr,
        va: Vaddr,
        npages: usize,
        flags: MapFlags,
        tid: TaskId,
    ) -> PagingResult<()> {
        self.check_owner(tid)?;
        mapping::map_pages(&mut self.table.lock(), pa, va, npages, flags)
    }

    /// 解除 `npages` 个页的映射
    pub fn unmap(&self, va: Vaddr, npages: usize, tid: TaskId) -> PagingResult<()> {
        self.check_owner(tid)?;
        mapping::unmap_pages(&mut self.table.lock(), va, npages)
    }

    /// 遍历页表
    pub fn walk(&self, va: Vaddr) -> PagingResult<Mapping> {
        self.table.lock().walk(va)
    }

    /// 翻译虚拟地址
    pub fn translate(&self, va: Vaddr) -> Option<Paddr> {
        self.table.lock().translate(va)
    }

    /// 一级页表的物理地址（写入 TTB 的值）
    pub fn root_paddr(&self) -> Paddr {
        let va = self.table.lock().vaddr();
        // SAFETY: 页表位于内核堆中
        Paddr::new(unsafe { arch_ops().vaddr_to_paddr(va.as_usize()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_hooks;

    #[test]
    fn test_only_owner_may_map() {
        test_hooks::install();
        let space = AddressSpace::new(TaskId(7)).unwrap();
        assert_eq!(
            space.map(Paddr::new(0x1000), Vaddr::new(0x2000), 1, MapFlags::USR_RW, TaskId(8)),
            Err(PagingError::WrongSpace)
        );
        space
            .map(Paddr::new(0x1000), Vaddr::new(0x2000), 1, MapFlags::USR_RW, TaskId(7))
            .unwrap();
        assert_eq!(space.translate(Vaddr::new(0x2010)), Some(Paddr::new(0x1010)));
        space.unmap(Vaddr::new(0x2000), 1, TaskId(7)).unwrap();
        assert_eq!(space.translate(Vaddr::new(0x2000)), None);
    }

    #[test]
    fn test_root_is_table_aligned() {
        test_hooks::install();
        let space = AddressSpace::new(TaskId::KERNEL).unwrap();
        assert_eq!(space.root_paddr().as_usize() % crate::config::PGD_ALIGN, 0);
    }
}
