//! 内核信息页（Kernel Info Page, KIP）布局
//!
//! KIP 在启动时构造一次，之后以只读方式映射到每个用户地址空间的
//! [`USER_KIP_PAGE`](crate::layout::USER_KIP_PAGE)。启动完成后唯一会被改写的字段是
//! `utcb`（位于页内偏移 [`UTCB_KIP_OFFSET`](crate::layout::UTCB_KIP_OFFSET)）。
//!
//! 整个结构体恰好一页，字段全部使用 32 位 ABI 宽度。

use core::mem::{offset_of, size_of};

use crate::layout::{ARM_SYSCALL_PAGE, SYSCALL_ENTRY_STRIDE, UTCB_KIP_OFFSET};

/// KIP 大小（一页）
pub const KIP_SIZE: usize = 0x1000;

/// 名称字段：`"L4\230K"`
pub const KIP_NAME: [u8; 4] = *b"L4\x98K";

/// API 版本（非标准值 0xBB 标识本内核）
pub const KIP_API_VERSION: u8 = 0xBB;
/// API 子版本
pub const KIP_API_SUBVERSION: u8 = 1;
/// 内核描述符魔数
pub const KDESC_MAGIC: u32 = 0xBBB;

/// 构建日期字段长度
pub const KDESC_DATE_SIZE: usize = 12;
/// 构建时间字段长度
pub const KDESC_TIME_SIZE: usize = 12;

/// 系统调用入口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Syscall {
    Ipc = 0,
    ThreadSwitch,
    ThreadControl,
    ExchangeRegisters,
    Schedule,
    Unmap,
    SpaceControl,
    ProcessorControl,
    MemoryControl,
    GetKip,
    KmemControl,
    TimeControl,
    MutexControl,
    CapControl,
    ContainerControl,
    Map,
}

/// 系统调用入口数量
pub const SYSCALL_COUNT: usize = 16;

/// 内核描述符
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KernelDesc {
    pub magic: u32,
    pub version: u16,
    pub subversion: u16,
    pub date: [u8; KDESC_DATE_SIZE],
    pub time: [u8; KDESC_TIME_SIZE],
}

/// 系统调用入口地址表（相对于系统调用页的偏移）
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SyscallTable {
    pub offsets: [u32; SYSCALL_COUNT],
}

impl SyscallTable {
    /// 按入口顺序生成偏移表，每个入口占一条指令
    pub const fn new() -> Self {
        let mut offsets = [0u32; SYSCALL_COUNT];
        let mut i = 0;
        while i < SYSCALL_COUNT {
            offsets[i] = i as u32 * SYSCALL_ENTRY_STRIDE;
            i += 1;
        }
        Self { offsets }
    }

    /// 入口在用户空间中的绝对地址
    pub fn entry_address(&self, call: Syscall) -> usize {
        ARM_SYSCALL_PAGE + self.offsets[call as usize] as usize
    }
}

impl Default for SyscallTable {
    fn default() -> Self {
        Self::new()
    }
}

const HEADER_SIZE: usize = 8 + size_of::<KernelDesc>() + size_of::<SyscallTable>();

/// 内核信息页
#[repr(C, align(4096))]
pub struct KernelInfoPage {
    pub name: [u8; 4],
    pub api_version: u8,
    pub api_subversion: u8,
    /// 0 表示小端、32 位
    pub api_flags: u16,
    pub kdesc: KernelDesc,
    pub syscalls: SyscallTable,
    _reserved: [u8; UTCB_KIP_OFFSET - HEADER_SIZE],
    /// UTCB 段起始地址，由启动交接阶段写入一次
    pub utcb: u32,
    _tail: [u8; KIP_SIZE - UTCB_KIP_OFFSET - size_of::<u32>()],
}

const _: () = assert!(size_of::<KernelInfoPage>() == KIP_SIZE);
const _: () = assert!(offset_of!(KernelInfoPage, utcb) == UTCB_KIP_OFFSET);
const _: () = assert!(offset_of!(KernelInfoPage, kdesc) == 8);

impl KernelInfoPage {
    /// 全零的 KIP
    pub const fn zeroed() -> Self {
        Self {
            name: [0; 4],
            api_version: 0,
            api_subversion: 0,
            api_flags: 0,
            kdesc: KernelDesc {
                magic: 0,
                version: 0,
                subversion: 0,
                date: [0; KDESC_DATE_SIZE],
                time: [0; KDESC_TIME_SIZE],
            },
            syscalls: SyscallTable { offsets: [0; SYSCALL_COUNT] },
            _reserved: [0; UTCB_KIP_OFFSET - HEADER_SIZE],
            utcb: 0,
            _tail: [0; KIP_SIZE - UTCB_KIP_OFFSET - size_of::<u32>()],
        }
    }

    /// 以 `strncpy` 语义写入构建日期（超长截断，剩余补零）
    pub fn set_date(&mut self, date: &str) {
        copy_truncated(&mut self.kdesc.date, date);
    }

    /// 以 `strncpy` 语义写入构建时间
    pub fn set_time(&mut self, time: &str) {
        copy_truncated(&mut self.kdesc.time, time);
    }

    /// 构建日期（去掉尾部的 NUL）
    pub fn date(&self) -> &str {
        as_str(&self.kdesc.date)
    }

    /// 构建时间（去掉尾部的 NUL）
    pub fn time(&self) -> &str {
        as_str(&self.kdesc.time)
    }
}

fn copy_truncated(dst: &mut [u8], src: &str) {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src.as_bytes()[..n]);
    dst[n..].fill(0);
}

fn as_str(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    // 截断可能切在多字节字符中间，此时退回到最长的合法前缀
    match core::str::from_utf8(&bytes[..end]) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syscall_offsets_are_strided() {
        let table = SyscallTable::new();
        assert_eq!(table.offsets[0], 0);
        assert_eq!(table.offsets[Syscall::Map as usize], 15 * SYSCALL_ENTRY_STRIDE);
        assert_eq!(table.entry_address(Syscall::ThreadSwitch), ARM_SYSCALL_PAGE + 4);
    }

    #[test]
    fn test_date_is_truncated_like_strncpy() {
        let mut kip = alloc_kip();
        kip.set_date("Oct 16 2026 and more");
        assert_eq!(kip.date(), "Oct 16 2026 ");
        kip.set_time("12:00:00");
        assert_eq!(kip.time(), "12:00:00");
        assert_eq!(kip.kdesc.time[8..], [0; 4]);
    }

    #[test]
    fn test_zeroed_has_no_utcb() {
        let kip = alloc_kip();
        assert_eq!(kip.utcb, 0);
        assert_eq!(kip.name, [0; 4]);
    }

    fn alloc_kip() -> &'static mut KernelInfoPage {
        extern crate std;
        std::boxed::Box::leak(std::boxed::Box::new(KernelInfoPage::zeroed()))
    }
}
