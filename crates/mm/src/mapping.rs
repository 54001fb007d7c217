//! 映射引擎
//!
//! 在一张 [`TranslationTable`] 上以页为粒度建立/解除连续虚拟区间的映射，
//! 以及启动阶段使用的段映射维护操作。
//!
//! 多页映射是原子的：第 k 页失败时，先前装入的 k 页全部撤销后再返回错误。

use log::{debug, warn};

use crate::address::{page_align_up, AlignOps, Paddr, Vaddr};
use crate::arch_ops::arch_ops;
use crate::config::PAGE_SHIFT;
use crate::page_table::{PagingResult, TranslationTable};
use uapi::MapFlags;

/// 将 `npages` 个连续物理页映射到从 `va` 开始的虚拟区间
pub fn map_pages(
    table: &mut TranslationTable,
    pa: Paddr,
    va: Vaddr,
    npages: usize,
    flags: MapFlags,
) -> PagingResult<()> {
    for i in 0..npages {
        if let Err(e) = table.map_page(pa.add_pages(i), va.add_pages(i), flags) {
            warn!(
                "map {:#x} x{}: page {} failed ({}), rolling back",
                va, npages, i, e
            );
            rollback(table, va, i);
            return Err(e);
        }
    }
    debug!("map {:#x} -> {:#x} x{} ({:?})", va, pa, npages, flags);
    Ok(())
}

/// 撤销从 `va` 开始、刚刚装入的 `npages` 个页
fn rollback(table: &mut TranslationTable, va: Vaddr, npages: usize) {
    for i in 0..npages {
        let page = va.add_pages(i);
        if table.unmap_page(page).is_ok() {
            arch_ops().invalidate_tlb_entry(page.as_usize());
        }
    }
}

/// 解除从 `va` 开始的 `npages` 个页的映射并使对应 TLB 条目失效
///
/// 尽力而为：某一页未映射时继续处理其余页，最后返回遇到的第一个错误。
pub fn unmap_pages(table: &mut TranslationTable, va: Vaddr, npages: usize) -> PagingResult<()> {
    let mut result = Ok(());
    for i in 0..npages {
        let page = va.add_pages(i);
        match table.unmap_page(page) {
            Ok(_) => arch_ops().invalidate_tlb_entry(page.as_usize()),
            Err(e) => {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
    }
    debug!("unmap {:#x} x{}", va, npages);
    result
}

/// 恒等映射（虚拟地址等于物理地址）
pub fn map_identity(
    table: &mut TranslationTable,
    pa: Paddr,
    npages: usize,
    flags: MapFlags,
) -> PagingResult<()> {
    map_pages(table, pa, Vaddr::new(pa.as_usize()), npages, flags)
}

/// 启动期映射：按字节数向上取整为整页
pub fn add_boot_mapping(
    table: &mut TranslationTable,
    pa: Paddr,
    va: Vaddr,
    size: usize,
    flags: MapFlags,
) -> PagingResult<()> {
    let npages = page_align_up(size) >> PAGE_SHIFT;
    map_pages(table, pa.align_down_to_page(), va.align_down_to_page(), npages, flags)
}

/// 删除段映射并使整个 TLB 失效
pub fn remove_section_mapping(table: &mut TranslationTable, va: Vaddr) -> PagingResult<()> {
    table.remove_section_mapping(va)?;
    arch_ops().invalidate_tlb();
    debug!("removed section mapping at {:#x}", va);
    Ok(())
}

/// 将 `[start, end)` 上的段映射替换为小页并使整个 TLB 失效
pub fn remap_as_pages(table: &mut TranslationTable, start: Vaddr, end: Vaddr) -> PagingResult<usize> {
    let n = table.remap_as_pages(start.align_down_to_page(), end.align_up_to_page())?;
    arch_ops().invalidate_tlb();
    Ok(n)
}
