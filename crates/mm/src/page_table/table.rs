//! 一级页表与粗页表
//!
//! 一级表的物理地址直接写入 TTB，因此必须 16KB 对齐；粗页表 1KB 对齐。
//! 粗页表按需从内核堆分配，描述符中保存的是它的物理地址，访问时经
//! [`ArchMmOps::paddr_to_vaddr`](crate::ArchMmOps::paddr_to_vaddr) 转换。

use alloc::alloc::{alloc_zeroed, dealloc};
use alloc::boxed::Box;
use core::alloc::Layout;
use core::ptr::NonNull;

use log::debug;

use super::entry::{L1Entry, L1Kind, L2Entry};
use super::{Granularity, Mapping, PagingError, PagingResult};
use crate::address::{AlignOps, Paddr, Vaddr};
use crate::arch_ops::arch_ops;
use crate::config::{
    PAGE_MASK, PAGE_SHIFT, PAGE_SIZE, PGD_ALIGN, PGD_ENTRIES, PMD_ALIGN, PMD_ENTRIES, SECTION_MASK,
    SECTION_SHIFT, SECTION_SIZE,
};
use uapi::MapFlags;

/// 粗页表
#[repr(C, align(1024))]
struct CoarseTable {
    entries: [L2Entry; PMD_ENTRIES],
}

const _: () = assert!(core::mem::align_of::<CoarseTable>() == PMD_ALIGN);

impl CoarseTable {
    /// 分配一张全零的粗页表
    fn alloc() -> PagingResult<NonNull<CoarseTable>> {
        // SAFETY: 布局大小非零
        let ptr = unsafe { alloc_zeroed(Layout::new::<CoarseTable>()) };
        NonNull::new(ptr.cast::<CoarseTable>()).ok_or(PagingError::OutOfMemory)
    }

    /// # Safety
    /// `table` 必须来自 [`CoarseTable::alloc`] 且不再被任何表项引用
    unsafe fn free(table: NonNull<CoarseTable>) {
        unsafe { dealloc(table.as_ptr().cast(), Layout::new::<CoarseTable>()) };
    }

    fn paddr(table: NonNull<CoarseTable>) -> Paddr {
        // SAFETY: 粗页表位于内核堆中，始终处于内核映射之内
        Paddr::new(unsafe { arch_ops().vaddr_to_paddr(table.as_ptr() as usize) })
    }

    fn from_paddr(pa: Paddr) -> PagingResult<NonNull<CoarseTable>> {
        let va = arch_ops().paddr_to_vaddr(pa.as_usize()) as *mut CoarseTable;
        NonNull::new(va).ok_or(PagingError::InvalidAddress)
    }

    fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| !e.is_present())
    }
}

/// 一级页表
#[repr(C, align(16384))]
pub struct TranslationTable {
    entries: [L1Entry; PGD_ENTRIES],
}

const _: () = assert!(core::mem::align_of::<TranslationTable>() == PGD_ALIGN);

#[inline]
fn pgd_index(va: Vaddr) -> PagingResult<usize> {
    let idx = va.as_usize() >> SECTION_SHIFT;
    if idx >= PGD_ENTRIES {
        return Err(PagingError::InvalidAddress);
    }
    Ok(idx)
}

#[inline]
fn pmd_index(va: Vaddr) -> usize {
    (va.as_usize() & SECTION_MASK) >> PAGE_SHIFT
}

impl TranslationTable {
    /// 全零的页表
    pub const fn new() -> Self {
        Self {
            entries: [L1Entry::FAULT; PGD_ENTRIES],
        }
    }

    /// 在堆上分配一张全零的页表
    pub fn new_boxed() -> PagingResult<Box<Self>> {
        // SAFETY: 布局大小非零；全零是合法的 TranslationTable
        unsafe {
            let ptr = alloc_zeroed(Layout::new::<Self>()).cast::<Self>();
            if ptr.is_null() {
                return Err(PagingError::OutOfMemory);
            }
            Ok(Box::from_raw(ptr))
        }
    }

    /// 将所有表项清零
    ///
    /// 不回收表项引用的粗页表：只用于从未建立过小页映射的表
    /// （例如启动时内容未知的 init 页表）。
    pub fn clear(&mut self) {
        self.entries.fill(L1Entry::FAULT);
    }

    /// 页表自身的虚拟地址
    pub fn vaddr(&self) -> Vaddr {
        Vaddr::new(self as *const Self as usize)
    }

    /// 读取一级表项
    pub fn entry(&self, va: Vaddr) -> PagingResult<L1Entry> {
        Ok(self.entries[pgd_index(va)?])
    }

    /// 所有一级表项
    pub fn entries(&self) -> &[L1Entry] {
        &self.entries
    }

    /// 安装 `nsections` 个连续的段映射
    ///
    /// 目标区间内已有的段映射会被覆盖；若任一表项已指向粗页表则整体失败，
    /// 不修改任何表项。
    pub fn add_section_mapping(
        &mut self,
        pa: Paddr,
        va: Vaddr,
        nsections: usize,
        flags: MapFlags,
    ) -> PagingResult<()> {
        if !pa.is_section_aligned() || !va.is_section_aligned() {
            return Err(PagingError::Unaligned);
        }
        let first = pgd_index(va)?;
        let last = first + nsections;
        if last > PGD_ENTRIES {
            return Err(PagingError::InvalidAddress);
        }
        if self.entries[first..last]
            .iter()
            .any(|e| matches!(e.kind(), L1Kind::Coarse(_)))
        {
            return Err(PagingError::SectionConflict);
        }

        for (i, entry) in self.entries[first..last].iter_mut().enumerate() {
            *entry = L1Entry::section(pa + i * SECTION_SIZE, flags);
        }
        Ok(())
    }

    /// 删除 `va` 所在的段映射
    pub fn remove_section_mapping(&mut self, va: Vaddr) -> PagingResult<()> {
        let idx = pgd_index(va)?;
        match self.entries[idx].kind() {
            L1Kind::Section(..) => {
                self.entries[idx] = L1Entry::FAULT;
                Ok(())
            }
            L1Kind::Coarse(_) => Err(PagingError::SectionConflict),
            L1Kind::Fault => Err(PagingError::NotMapped),
        }
    }

    /// 映射一个 4KB 小页，必要时分配粗页表
    pub fn map_page(&mut self, pa: Paddr, va: Vaddr, flags: MapFlags) -> PagingResult<()> {
        if !pa.is_page_aligned() || !va.is_page_aligned() {
            return Err(PagingError::Unaligned);
        }
        let idx = pgd_index(va)?;

        let mut table = match self.entries[idx].kind() {
            L1Kind::Coarse(table) => CoarseTable::from_paddr(table)?,
            L1Kind::Section(..) => return Err(PagingError::SectionConflict),
            L1Kind::Fault => {
                let table = CoarseTable::alloc()?;
                self.entries[idx] = L1Entry::coarse(CoarseTable::paddr(table));
                table
            }
        };

        // SAFETY: 粗页表由本页表独占
        let coarse = unsafe { table.as_mut() };
        let slot = &mut coarse.entries[pmd_index(va)];
        if slot.is_present() {
            return Err(PagingError::AlreadyMapped);
        }
        *slot = L2Entry::small(pa, flags);
        Ok(())
    }

    /// 解除一个小页映射，返回原来映射的物理页
    ///
    /// 粗页表变空时一并回收。
    pub fn unmap_page(&mut self, va: Vaddr) -> PagingResult<Paddr> {
        let idx = pgd_index(va)?;
        let mut table = match self.entries[idx].kind() {
            L1Kind::Coarse(table) => CoarseTable::from_paddr(table)?,
            L1Kind::Section(..) => return Err(PagingError::SectionConflict),
            L1Kind::Fault => return Err(PagingError::NotMapped),
        };

        // SAFETY: 粗页表由本页表独占
        let coarse = unsafe { table.as_mut() };
        let slot = &mut coarse.entries[pmd_index(va)];
        if !slot.is_present() {
            return Err(PagingError::NotMapped);
        }
        let pa = slot.paddr();
        *slot = L2Entry::FAULT;

        if coarse.is_empty() {
            self.entries[idx] = L1Entry::FAULT;
            // SAFETY: 表项已清除，不再有引用
            unsafe { CoarseTable::free(table) };
        }
        Ok(pa)
    }

    /// 遍历页表
    pub fn walk(&self, va: Vaddr) -> PagingResult<Mapping> {
        let idx = pgd_index(va)?;
        match self.entries[idx].kind() {
            L1Kind::Section(pa, flags) => Ok(Mapping {
                paddr: pa + (va.as_usize() & SECTION_MASK),
                flags,
                granularity: Granularity::Section,
            }),
            L1Kind::Coarse(table) => {
                // SAFETY: 粗页表由本页表独占
                let coarse = unsafe { CoarseTable::from_paddr(table)?.as_ref() };
                let entry = coarse.entries[pmd_index(va)];
                if !entry.is_present() {
                    return Err(PagingError::NotMapped);
                }
                Ok(Mapping {
                    paddr: entry.paddr() + (va.as_usize() & PAGE_MASK),
                    flags: entry.flags(),
                    granularity: Granularity::Page,
                })
            }
            L1Kind::Fault => Err(PagingError::NotMapped),
        }
    }

    /// 翻译虚拟地址到物理地址
    pub fn translate(&self, va: Vaddr) -> Option<Paddr> {
        self.walk(va).ok().map(|m| m.paddr)
    }

    /// 将 `[start, end)` 覆盖到的段映射替换为等价的小页映射
    ///
    /// 每个段先分配好粗页表再替换表项，失败时已替换的段仍然映射同样的物理内存。
    /// 返回被替换的段数。调用者负责随后使 TLB 失效。
    pub fn remap_as_pages(&mut self, start: Vaddr, end: Vaddr) -> PagingResult<usize> {
        if end <= start {
            return Ok(0);
        }
        let first = pgd_index(start)?;
        let last = pgd_index(end - 1)?;
        let mut remapped = 0;

        for idx in first..=last {
            let L1Kind::Section(pa, flags) = self.entries[idx].kind() else {
                continue;
            };
            let mut table = CoarseTable::alloc()?;
            // SAFETY: 新分配的表还未挂入页表
            let coarse = unsafe { table.as_mut() };
            for (i, slot) in coarse.entries.iter_mut().enumerate() {
                *slot = L2Entry::small(pa + i * PAGE_SIZE, flags);
            }
            self.entries[idx] = L1Entry::coarse(CoarseTable::paddr(table));
            remapped += 1;
        }

        debug!("remap {:#x}..{:#x}: {} sections as pages", start, end, remapped);
        Ok(remapped)
    }

    /// `[start, end)` 内仍是段描述符的表项数
    pub fn section_entries_in(&self, start: Vaddr, end: Vaddr) -> usize {
        let first = (start.as_usize() >> SECTION_SHIFT).min(PGD_ENTRIES);
        let last = (end.as_usize().div_ceil(SECTION_SIZE)).min(PGD_ENTRIES);
        if last <= first {
            return 0;
        }
        self.entries[first..last]
            .iter()
            .filter(|e| matches!(e.kind(), L1Kind::Section(..)))
            .count()
    }
}

impl Default for TranslationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TranslationTable {
    fn drop(&mut self) {
        for entry in self.entries.iter_mut() {
            if let L1Kind::Coarse(pa) = entry.kind() {
                *entry = L1Entry::FAULT;
                if let Ok(table) = CoarseTable::from_paddr(pa) {
                    // SAFETY: 粗页表只被这一个表项引用
                    unsafe { CoarseTable::free(table) };
                }
            }
        }
    }
}
