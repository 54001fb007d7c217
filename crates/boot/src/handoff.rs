//! 交接
//!
//! 切换到第一个任务的栈之后，启动栈以及其下所有栈帧都不再有效：
//! 上下文先被复制到新栈上，然后释放启动期内存、公布 UTCB 地址、启动调度器。

use core::mem::ManuallyDrop;
use core::ptr;

use log::{info, warn};

use crate::activation::MmuActivation;
use crate::context::{BootContext, BootPhase};
use crate::error::BootError;
use crate::kip;
use crate::platform::{KernelResources, Platform, Scheduler};
use mm::config::{PAGE_SHIFT, PAGE_SIZE, STACK_ALIGNMENT};
use mm::{mapping, AlignOps, Vaddr};

/// 任务控制块所在页的栈顶：页内最高的对齐地址
pub fn stack_top_for(tcb: Vaddr) -> Vaddr {
    Vaddr::new((tcb.as_usize() + PAGE_SIZE - 1) & !(STACK_ALIGNMENT - 1))
}

impl<A, P, R, S> BootContext<A, P, R, S>
where
    A: MmuActivation,
    P: Platform,
    R: KernelResources,
    S: Scheduler,
{
    /// 切换到第一个容器中第一个任务的栈，随后启动调度器
    pub(crate) fn init_finalize(mut self) -> ! {
        let first = match self
            .resources
            .containers()
            .first()
            .and_then(|c| c.tasks.first())
        {
            Some(task) => *task,
            None => self.fatal(BootError::NoFirstTask),
        };
        let top = stack_top_for(first.tcb);
        info!(
            "{}: handing off to task {}, stack {:#x}",
            self.build.name, first.tid.0, top
        );

        self.first_task = Some(first);
        self.phase = BootPhase::StackRelocated;

        let ctx = ManuallyDrop::new(self);
        let arg = &*ctx as *const Self as usize;
        // SAFETY: 控制块所在页已映射；上下文在新栈上读取后旧栈不再使用
        unsafe { ctx.arch.switch_stack(top, relocated_entry::<A, P, R, S>, arg) }
    }

    fn finish_handoff(mut self) -> ! {
        let Some(first) = self.first_task else {
            self.fatal(BootError::NoFirstTask);
        };

        self.free_boot_memory();

        // SAFETY: KIP 只由本上下文修改
        let kip = unsafe { self.tables.kip.as_mut() };
        if let Err(e) = kip::publish_utcb(kip, &mut self.utcb_published, first.utcb_address) {
            self.fatal(e);
        }

        self.phase = BootPhase::Scheduling;
        self.current = None;
        self.scheduler.start(&first)
    }

    /// 解除启动期区域的映射并交给资源管理回收
    fn free_boot_memory(&mut self) {
        let start = self.layout.init_start.align_down_to_page();
        let end = self.layout.init_end.align_up_to_page();
        if end <= start {
            return;
        }

        // SAFETY: 页表只由本上下文修改
        let table = unsafe { self.tables.pgd.as_mut() };
        if let Err(e) = mapping::unmap_pages(table, start, (end - start) >> PAGE_SHIFT) {
            warn!("free boot memory {:#x}..{:#x}: {}", start, end, e);
        }
        self.resources
            .free_boot_memory(self.layout.virt_to_phys(start)..self.layout.virt_to_phys(end));
    }
}

/// 切换到新栈后的第一个函数
extern "C" fn relocated_entry<A, P, R, S>(arg: usize) -> !
where
    A: MmuActivation,
    P: Platform,
    R: KernelResources,
    S: Scheduler,
{
    // SAFETY: arg 指向 init_finalize 中以 ManuallyDrop 保留的上下文，仅读取一次
    let ctx = unsafe { ptr::read(arg as *const BootContext<A, P, R, S>) };
    ctx.finish_handoff()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_top_is_inside_tcb_page() {
        let top = stack_top_for(Vaddr::new(0xf080_2000));
        assert_eq!(top, Vaddr::new(0xf080_2ff8));
        assert_eq!(top.as_usize() % STACK_ALIGNMENT, 0);
        assert_eq!(top.align_down_to_page(), Vaddr::new(0xf080_2000));
    }

    #[test]
    fn test_stack_top_for_unaligned_tcb() {
        // 控制块不在页首时，栈顶落在下一页内的对齐位置
        let top = stack_top_for(Vaddr::new(0xf080_2100));
        assert_eq!(top, Vaddr::new(0xf080_30f8));
    }
}
