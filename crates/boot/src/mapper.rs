//! 启动映射
//!
//! 开启 MMU 之前，init 页表里只需要两项段映射：内核链接地址到其物理位置的映射，
//! 以及同一物理区间的恒等映射（开启地址转换的那几条指令仍在物理地址上执行）。

use crate::layout::KernelLayout;
use mm::config::{SECTION_SHIFT, SECTION_SIZE};
use mm::{AlignOps, MapFlags, Paddr, PagingResult, TranslationTable, Vaddr};

/// 为 `[pa, pa + nsections MB)` 同时建立虚拟映射和恒等映射
///
/// 两个基址都向下对齐到段边界。恒等映射不带 cache 属性。
pub fn map_identity_and_virtual(
    table: &mut TranslationTable,
    pa: Paddr,
    va: Vaddr,
    nsections: usize,
    flags: MapFlags,
) -> PagingResult<()> {
    let pa = pa.align_down_to_section();
    let va = va.align_down_to_section();
    table.add_section_mapping(pa, va, nsections, flags)?;
    table.add_section_mapping(pa, Vaddr::new(pa.as_usize()), nsections, MapFlags::empty())
}

/// 内核镜像覆盖的段数
pub fn kernel_sections(layout: &KernelLayout) -> usize {
    let start = layout.kernel_section_virt().as_usize();
    let end = layout.end_kernel.as_usize().div_ceil(SECTION_SIZE) << SECTION_SHIFT;
    ((end - start) >> SECTION_SHIFT).max(1)
}

/// 清零 init 页表并建立开启 MMU 所需的段映射
///
/// 在物理地址上执行，不能访问内核静态数据，因此不记录日志。
pub fn init_kernel_mappings(table: &mut TranslationTable, layout: &KernelLayout) -> PagingResult<()> {
    table.clear();
    map_identity_and_virtual(
        table,
        layout.kernel_section_phys(),
        layout.kernel_section_virt(),
        kernel_sections(layout),
        MapFlags::CACHEABLE | MapFlags::BUFFERABLE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm::{Granularity, L1Kind};

    fn layout() -> KernelLayout {
        KernelLayout {
            kernel_offset: 0xf000_0000,
            start_kernel: Vaddr::new(0xf010_0000),
            end_kernel: Vaddr::new(0xf016_0000),
            vectors_start: Vaddr::new(0xf010_1000),
            vectors_end: Vaddr::new(0xf010_1100),
            init_start: Vaddr::new(0xf015_0000),
            init_end: Vaddr::new(0xf016_0000),
        }
    }

    #[test]
    fn test_kernel_is_mapped_twice() {
        let mut table = TranslationTable::new_boxed().unwrap();
        init_kernel_mappings(&mut table, &layout()).unwrap();

        let virt = table.walk(Vaddr::new(0xf012_3456)).unwrap();
        assert_eq!(virt.paddr, Paddr::new(0x0012_3456));
        assert_eq!(virt.granularity, Granularity::Section);
        assert!(virt.flags.contains(MapFlags::CACHEABLE | MapFlags::BUFFERABLE));

        let ident = table.walk(Vaddr::new(0x0012_3456)).unwrap();
        assert_eq!(ident.paddr, Paddr::new(0x0012_3456));
        assert!(!ident.flags.contains(MapFlags::CACHEABLE));

        let mapped = table
            .entries()
            .iter()
            .filter(|e| !matches!(e.kind(), L1Kind::Fault))
            .count();
        assert_eq!(mapped, 2);
    }

    #[test]
    fn test_stale_entries_are_cleared() {
        let mut table = TranslationTable::new_boxed().unwrap();
        table
            .add_section_mapping(Paddr::new(0x0800_0000), Vaddr::new(0x4000_0000), 1, MapFlags::empty())
            .unwrap();
        init_kernel_mappings(&mut table, &layout()).unwrap();
        assert_eq!(table.translate(Vaddr::new(0x4000_0000)), None);
    }

    #[test]
    fn test_large_image_spans_sections() {
        let mut l = layout();
        l.end_kernel = Vaddr::new(0xf020_0001);
        assert_eq!(kernel_sections(&l), 3);
    }
}
