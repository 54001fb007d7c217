//! 页表项编码
//!
//! 一级表项：
//!
//! | 位      | 段描述符     | 粗页表描述符 |
//! |---------|--------------|--------------|
//! | [1:0]   | `0b10`       | `0b01`       |
//! | 2 / 3   | B / C        | -            |
//! | 4       | 1            | 1            |
//! | [8:5]   | 域           | 域           |
//! | [11:10] | AP           | -            |
//! | 高位    | 段基址 [31:20] | 粗页表基址 [31:10] |
//!
//! 二级小页表项：`[1:0] = 0b10`，B/C 同上，`[11:4]` 为四个子页的 AP（取相同值），
//! 页基址 [31:12]。

use crate::address::{Paddr, AlignOps};
use crate::config::{KERNEL_DOMAIN, PAGE_MASK, PMD_ALIGN, SECTION_MASK};
use uapi::MapFlags;

const TYPE_MASK: usize = 0b11;
const L1_COARSE: usize = 0b01;
const L1_SECTION: usize = 0b10;
const L2_SMALL: usize = 0b10;

const BUFFERABLE: usize = 1 << 2;
const CACHEABLE: usize = 1 << 3;
const L1_BIT4: usize = 1 << 4;
const DOMAIN_SHIFT: usize = 5;
const SECTION_AP_SHIFT: usize = 10;
const SMALL_AP_SHIFT: usize = 4;

const AP_SVC_RW: usize = 0b01;
const AP_USR_RO: usize = 0b10;
const AP_USR_RW: usize = 0b11;

/// 内核映射总是可写；用户映射按 `WRITE` 区分只读/读写
fn encode_ap(flags: MapFlags) -> usize {
    if flags.contains(MapFlags::USER) {
        if flags.contains(MapFlags::WRITE) {
            AP_USR_RW
        } else {
            AP_USR_RO
        }
    } else {
        AP_SVC_RW
    }
}

fn decode_ap(ap: usize) -> MapFlags {
    match ap & 0b11 {
        AP_USR_RW => MapFlags::USER | MapFlags::WRITE,
        AP_USR_RO => MapFlags::USER,
        AP_SVC_RW => MapFlags::WRITE,
        _ => MapFlags::empty(),
    }
}

fn encode_cb(flags: MapFlags) -> usize {
    let mut bits = 0;
    if flags.contains(MapFlags::CACHEABLE) {
        bits |= CACHEABLE;
    }
    if flags.contains(MapFlags::BUFFERABLE) {
        bits |= BUFFERABLE;
    }
    bits
}

fn decode_cb(raw: usize) -> MapFlags {
    let mut flags = MapFlags::empty();
    if raw & CACHEABLE != 0 {
        flags |= MapFlags::CACHEABLE;
    }
    if raw & BUFFERABLE != 0 {
        flags |= MapFlags::BUFFERABLE;
    }
    flags
}

/// 一级表项的解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L1Kind {
    /// 无映射（细页表描述符同样视为无效，本内核不使用）
    Fault,
    /// 指向粗页表的物理地址
    Coarse(Paddr),
    /// 段映射
    Section(Paddr, MapFlags),
}

/// 一级表项
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L1Entry(usize);

impl L1Entry {
    /// 无效表项
    pub const FAULT: Self = Self(0);

    /// 段描述符
    pub fn section(pa: Paddr, flags: MapFlags) -> Self {
        debug_assert!(pa.is_section_aligned());
        Self(
            (pa.as_usize() & !SECTION_MASK)
                | encode_ap(flags) << SECTION_AP_SHIFT
                | KERNEL_DOMAIN << DOMAIN_SHIFT
                | L1_BIT4
                | encode_cb(flags)
                | L1_SECTION,
        )
    }

    /// 粗页表描述符
    pub fn coarse(table: Paddr) -> Self {
        debug_assert!(table.as_usize() & (PMD_ALIGN - 1) == 0);
        Self(table.as_usize() | KERNEL_DOMAIN << DOMAIN_SHIFT | L1_BIT4 | L1_COARSE)
    }

    /// 从原始值构造
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// 原始值
    pub const fn raw(self) -> usize {
        self.0
    }

    /// 解码
    pub fn kind(self) -> L1Kind {
        match self.0 & TYPE_MASK {
            L1_COARSE => L1Kind::Coarse(Paddr::new(self.0 & !(PMD_ALIGN - 1))),
            L1_SECTION => L1Kind::Section(
                Paddr::new(self.0 & !SECTION_MASK),
                decode_cb(self.0) | decode_ap(self.0 >> SECTION_AP_SHIFT),
            ),
            _ => L1Kind::Fault,
        }
    }
}

/// 二级小页表项
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L2Entry(usize);

impl L2Entry {
    /// 无效表项
    pub const FAULT: Self = Self(0);

    /// 小页描述符
    pub fn small(pa: Paddr, flags: MapFlags) -> Self {
        debug_assert!(pa.is_page_aligned());
        let ap = encode_ap(flags);
        let ap_all = ap | ap << 2 | ap << 4 | ap << 6;
        Self(
            (pa.as_usize() & !PAGE_MASK)
                | ap_all << SMALL_AP_SHIFT
                | encode_cb(flags)
                | L2_SMALL,
        )
    }

    /// 从原始值构造
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// 原始值
    pub const fn raw(self) -> usize {
        self.0
    }

    /// 是否为有效的小页映射
    pub fn is_present(self) -> bool {
        self.0 & TYPE_MASK == L2_SMALL
    }

    /// 页基址
    pub fn paddr(self) -> Paddr {
        Paddr::new(self.0 & !PAGE_MASK)
    }

    /// 映射属性
    pub fn flags(self) -> MapFlags {
        decode_cb(self.0) | decode_ap(self.0 >> SMALL_AP_SHIFT)
    }
}
