//! 启动协作者：平台、系统资源与调度器

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;
use core::ptr::addr_of;

use ::mm::config::PAGE_SIZE;
use ::mm::{mapping, MapFlags, Paddr, PagingResult, TranslationTable, Vaddr};
use boot::{Container, KernelResources, Platform, Scheduler, TaskRef};
use log::{debug, info};
use uapi::layout::ARM_SYSCALL_PAGE;
use uapi::TaskId;

use crate::arch;
use crate::config::{BOOT_LOG_LEVEL, UART0_PHYS, UART0_VIRT, UTCB_AREA_START};

unsafe extern "C" {
    static _start_syscalls: u8;
}

/// Versatile PB926 平台
pub struct Pb926;

impl Pb926 {
    /// 平台对象本身不持有状态
    pub const fn new() -> Self {
        Self
    }
}

impl Platform for Pb926 {
    fn init(&mut self, table: &mut TranslationTable) -> PagingResult<()> {
        // SAFETY: 已进入虚拟地址，单核启动期
        unsafe { arch::init_arch_ops() };
        crate::mm::init_heap();

        mapping::add_boot_mapping(
            table,
            Paddr::new(UART0_PHYS),
            Vaddr::new(UART0_VIRT),
            PAGE_SIZE,
            MapFlags::IO_DEFAULT,
        )?;
        crate::console::set_base(UART0_VIRT);
        crate::log::init(BOOT_LOG_LEVEL);
        info!("platform: pb926, uart0 {:#x} -> {:#x}", UART0_PHYS, UART0_VIRT);
        Ok(())
    }

    fn init_syscall_page(&mut self, table: &mut TranslationTable) -> PagingResult<()> {
        let va = addr_of!(_start_syscalls) as usize;
        // SAFETY: 系统调用页位于内核镜像内
        let pa = Paddr::new(unsafe { arch::mm::vaddr_to_paddr(va) });
        mapping::add_boot_mapping(
            table,
            pa,
            Vaddr::new(ARM_SYSCALL_PAGE),
            PAGE_SIZE,
            MapFlags::USR_RO,
        )
    }
}

/// 第一个任务的控制块页，同时作为它的内核栈
#[repr(C, align(4096))]
struct TcbPage([u8; PAGE_SIZE]);

static mut FIRST_TCB: TcbPage = TcbPage([0; PAGE_SIZE]);

/// 启动期的系统资源
pub struct BootResources {
    containers: Vec<Container>,
    reclaimed: Vec<Range<Paddr>>,
}

impl BootResources {
    /// 空资源表；容器在 [`KernelResources::init_system_resources`] 中建立
    pub const fn new() -> Self {
        Self {
            containers: Vec::new(),
            reclaimed: Vec::new(),
        }
    }
}

impl KernelResources for BootResources {
    fn init_system_resources(&mut self) {
        let pager = TaskRef {
            tid: TaskId(1),
            tcb: Vaddr::new(addr_of!(FIRST_TCB) as usize),
            utcb_address: Vaddr::new(UTCB_AREA_START),
        };
        self.containers = vec![Container {
            id: 0,
            tasks: vec![pager],
        }];
        info!(
            "resources: {} container(s), pager tcb at {:#x}",
            self.containers.len(),
            pager.tcb
        );
    }

    fn containers(&self) -> &[Container] {
        &self.containers
    }

    fn free_boot_memory(&mut self, region: Range<Paddr>) {
        self.reclaimed.push(region.clone());
        let total: usize = self.reclaimed.iter().map(|r| r.end - r.start).sum();
        info!(
            "resources: reclaimed init memory at {:#x}, {} KiB free",
            region.start,
            total / 1024
        );
    }
}

/// 只运行第一个任务的调度器
pub struct Idle;

impl Idle {
    /// 调度器不持有状态
    pub const fn new() -> Self {
        Self
    }
}

impl Scheduler for Idle {
    fn init(&mut self) {
        debug!("scheduler: idle policy");
    }

    fn start(&mut self, first: &TaskRef) -> ! {
        info!(
            "scheduler: first task {} (tcb {:#x}, utcb {:#x})",
            first.tid.0, first.tcb, first.utcb_address
        );
        // 任务切换由调度器的完整实现负责，这里只停在第一个任务的内核栈上
        arch::halt()
    }
}
