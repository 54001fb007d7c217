//! MMU 启用序列的记录型 Mock
//!
//! 每个硬件步骤按调用顺序记录下来，测试据此校验启动序列的顺序约束。

use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// 记录的硬件操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MmuOp {
    SetTtb = 1,
    SetDomain,
    EnableCaches,
    EnableWriteBuffer,
    InvalidateCache,
    DrainWriteBuffer,
    InvalidateTlb,
    EnableMmu,
    EnterVirtual,
    EnableHighVectors,
    SwitchStack,
    Halt,
}

impl MmuOp {
    fn from_u8(raw: u8) -> Option<Self> {
        use MmuOp::*;
        [
            SetTtb,
            SetDomain,
            EnableCaches,
            EnableWriteBuffer,
            InvalidateCache,
            DrainWriteBuffer,
            InvalidateTlb,
            EnableMmu,
            EnterVirtual,
            EnableHighVectors,
            SwitchStack,
            Halt,
        ]
        .into_iter()
        .find(|op| *op as u8 == raw)
    }
}

const LOG_CAPACITY: usize = 64;

/// 记录型 MMU
pub struct MockMmu {
    log: [AtomicU8; LOG_CAPACITY],
    len: AtomicUsize,
    /// 最近一次写入的页表基址
    pub ttb: AtomicUsize,
    /// 最近一次写入的域访问控制值
    pub domain: AtomicUsize,
    /// 进入虚拟地址时使用的偏移
    pub offset: AtomicUsize,
    /// 切换到的新栈顶
    pub stack_top: AtomicUsize,
}

impl MockMmu {
    pub const fn new() -> Self {
        Self {
            log: [const { AtomicU8::new(0) }; LOG_CAPACITY],
            len: AtomicUsize::new(0),
            ttb: AtomicUsize::new(0),
            domain: AtomicUsize::new(0),
            offset: AtomicUsize::new(0),
            stack_top: AtomicUsize::new(0),
        }
    }

    pub fn record(&self, op: MmuOp) {
        let idx = self.len.fetch_add(1, Ordering::SeqCst);
        assert!(idx < LOG_CAPACITY, "MockMmu: operation log is full");
        self.log[idx].store(op as u8, Ordering::SeqCst);
    }

    /// 按顺序返回记录的操作
    pub fn ops(&self) -> impl Iterator<Item = MmuOp> + '_ {
        let len = self.len.load(Ordering::SeqCst).min(LOG_CAPACITY);
        self.log[..len]
            .iter()
            .filter_map(|op| MmuOp::from_u8(op.load(Ordering::SeqCst)))
    }

    /// 某个操作第一次出现的位置
    pub fn position(&self, op: MmuOp) -> Option<usize> {
        self.ops().position(|o| o == op)
    }
}
