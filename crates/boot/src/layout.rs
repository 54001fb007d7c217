//! 内核镜像布局
//!
//! 由 os 根据链接脚本符号构造一次，随启动上下文传递。

use mm::{AlignOps, Paddr, Vaddr};

/// 内核镜像布局（全部为链接时的虚拟地址）
#[derive(Debug, Clone, Copy)]
pub struct KernelLayout {
    /// 虚拟地址减物理地址
    pub kernel_offset: usize,
    /// 镜像起始
    pub start_kernel: Vaddr,
    /// 镜像结束（不包含）
    pub end_kernel: Vaddr,
    /// 异常向量代码起始
    pub vectors_start: Vaddr,
    /// 异常向量代码结束
    pub vectors_end: Vaddr,
    /// 只在启动期使用、交接时释放的区域起始
    pub init_start: Vaddr,
    /// 启动期区域结束
    pub init_end: Vaddr,
}

impl KernelLayout {
    /// 内核镜像内的虚拟地址转物理地址
    #[inline]
    pub fn virt_to_phys(&self, va: Vaddr) -> Paddr {
        Paddr::new(va.as_usize().wrapping_sub(self.kernel_offset))
    }

    /// 物理地址转内核虚拟地址
    #[inline]
    pub fn phys_to_virt(&self, pa: Paddr) -> Vaddr {
        Vaddr::new(pa.as_usize().wrapping_add(self.kernel_offset))
    }

    /// 内核所在 1MB 段的物理基址
    pub fn kernel_section_phys(&self) -> Paddr {
        self.virt_to_phys(self.start_kernel).align_down_to_section()
    }

    /// 内核所在 1MB 段的虚拟基址
    pub fn kernel_section_virt(&self) -> Vaddr {
        self.start_kernel.align_down_to_section()
    }

    /// 异常向量代码的字节数
    pub fn vectors_size(&self) -> usize {
        self.vectors_end - self.vectors_start
    }
}

/// 构建信息，写入 KIP
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    /// 内核名
    pub name: &'static str,
    /// 版本
    pub version: u16,
    /// 子版本
    pub subversion: u16,
    /// 构建日期
    pub date: &'static str,
    /// 构建时间
    pub time: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_bases() {
        let layout = KernelLayout {
            kernel_offset: 0xf000_0000,
            start_kernel: Vaddr::new(0xf018_8000),
            end_kernel: Vaddr::new(0xf01c_0000),
            vectors_start: Vaddr::new(0xf018_9000),
            vectors_end: Vaddr::new(0xf018_9100),
            init_start: Vaddr::new(0xf01b_0000),
            init_end: Vaddr::new(0xf01c_0000),
        };
        assert_eq!(layout.kernel_section_phys(), Paddr::new(0x0010_0000));
        assert_eq!(layout.kernel_section_virt(), Vaddr::new(0xf010_0000));
        assert_eq!(layout.phys_to_virt(Paddr::new(0x0018_8000)), layout.start_kernel);
        assert_eq!(layout.vectors_size(), 0x100);
    }
}
