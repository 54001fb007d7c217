//! 启动过程依赖的外部协作者

use alloc::vec::Vec;
use core::ops::Range;

use mm::{Paddr, PagingResult, TranslationTable, Vaddr};
use uapi::TaskId;

/// 平台相关初始化
pub trait Platform {
    /// 注册架构钩子，映射外设并初始化（UART、定时器、中断控制器等）
    ///
    /// 在进入虚拟地址、删除恒等映射之后调用；此前日志无法输出，
    /// `mm` 的架构钩子也尚未注册。
    fn init(&mut self, table: &mut TranslationTable) -> PagingResult<()>;

    /// 映射系统调用页
    fn init_syscall_page(&mut self, table: &mut TranslationTable) -> PagingResult<()>;
}

/// 任务的只读描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRef {
    /// 任务标识
    pub tid: TaskId,
    /// 控制块（所在页同时作为内核栈）
    pub tcb: Vaddr,
    /// 用户可见的 UTCB 段地址
    pub utcb_address: Vaddr,
}

/// 容器：按顺序持有其任务
#[derive(Debug, Clone, Default)]
pub struct Container {
    /// 容器编号
    pub id: u32,
    /// 任务列表，第一个为该容器的 pager
    pub tasks: Vec<TaskRef>,
}

/// 内核资源
pub trait KernelResources {
    /// 评估系统资源并建立资源池、容器与初始任务
    fn init_system_resources(&mut self);

    /// 按顺序排列的容器
    fn containers(&self) -> &[Container];

    /// 回收启动期内存（对应页已从内核页表中移除）
    fn free_boot_memory(&mut self, region: Range<Paddr>);
}

/// 调度器
pub trait Scheduler {
    /// 初始化调度器状态
    fn init(&mut self);

    /// 开始调度，从第一个任务运行起
    fn start(&mut self, first: &TaskRef) -> !;
}
