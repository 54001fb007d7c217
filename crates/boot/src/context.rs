//! 启动上下文
//!
//! [`BootContext`] 持有启动过程中用到的全部状态：架构操作、镜像布局、init 页表与 KIP、
//! 以及平台/资源/调度器三个协作者。它随执行环境的两次切换（进入虚拟地址、切换到
//! 第一个任务的栈）被整体复制到新环境中，旧环境里的副本不再使用。

use core::mem::ManuallyDrop;
use core::ptr::{self, NonNull};

use log::{debug, error, info};

use crate::activation::{enable_translation, MmuActivation};
use crate::error::{BootError, BootResult};
use crate::kip;
use crate::layout::{BuildInfo, KernelLayout};
use crate::mapper;
use crate::platform::{KernelResources, Platform, Scheduler, TaskRef};
use mm::config::PGD_ALIGN;
use mm::{mapping, AlignOps, MapFlags, Paddr, TranslationTable, Vaddr};
use uapi::kip::KernelInfoPage;
use uapi::layout::ARM_HIGH_VECTOR;
use uapi::TaskId;

/// 启动阶段
///
/// 只会单向推进；跨越 `Physical -> Virtual` 与 `Virtual -> StackRelocated`
/// 两次转换的调用都不返回。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPhase {
    /// MMU 关闭，按物理地址执行
    Physical,
    /// 已进入虚拟地址，仍在启动栈上
    Virtual,
    /// 已切换到第一个任务的栈，启动栈不可再用
    StackRelocated,
    /// 调度器已接管
    Scheduling,
}

/// 启动期直接操作的内核数据
pub struct BootTables {
    /// init 页表；进入虚拟地址之前必须是物理地址
    pub pgd: NonNull<TranslationTable>,
    /// KIP 的内核虚拟地址，只在进入虚拟地址之后访问
    pub kip: NonNull<KernelInfoPage>,
}

/// 交接之前的“当前任务”：只用来把 init 页表绑定到执行上下文
#[derive(Debug, Clone, Copy)]
pub struct CurrentTask {
    /// 任务标识
    pub tid: TaskId,
    /// 所用页表
    pub pgd: NonNull<TranslationTable>,
}

/// 启动上下文
pub struct BootContext<A, P, R, S> {
    pub(crate) arch: A,
    pub(crate) layout: KernelLayout,
    pub(crate) build: BuildInfo,
    pub(crate) tables: BootTables,
    pub(crate) platform: P,
    pub(crate) resources: R,
    pub(crate) scheduler: S,
    pub(crate) phase: BootPhase,
    pub(crate) current: Option<CurrentTask>,
    pub(crate) first_task: Option<TaskRef>,
    /// KIP 中的 UTCB 字段是否已写入
    pub(crate) utcb_published: bool,
}

impl<A, P, R, S> BootContext<A, P, R, S>
where
    A: MmuActivation,
    P: Platform,
    R: KernelResources,
    S: Scheduler,
{
    /// 创建启动上下文
    ///
    /// # Safety
    /// `tables` 中的指针必须分别指向只由本上下文使用的页表和 KIP，
    /// 且 `pgd` 在当前执行环境下可以访问
    pub unsafe fn new(
        arch: A,
        layout: KernelLayout,
        build: BuildInfo,
        tables: BootTables,
        platform: P,
        resources: R,
        scheduler: S,
    ) -> Self {
        Self {
            arch,
            layout,
            build,
            tables,
            platform,
            resources,
            scheduler,
            phase: BootPhase::Physical,
            current: None,
            first_task: None,
            utcb_published: false,
        }
    }

    /// 当前阶段
    pub fn phase(&self) -> BootPhase {
        self.phase
    }

    /// 镜像布局
    pub fn layout(&self) -> &KernelLayout {
        &self.layout
    }

    /// 交接前的当前任务
    pub fn current(&self) -> Option<&CurrentTask> {
        self.current.as_ref()
    }

    /// 记录错误并停机；只能在进入虚拟地址之后使用
    pub(crate) fn fatal(&self, err: BootError) -> ! {
        error!("{}: {}", self.build.name, err);
        self.arch.halt()
    }

    /// MMU 开启前出错：日志设施还不可访问，直接停机
    fn halt_physical(&self) -> ! {
        self.arch.halt()
    }

    /// 内核启动入口
    ///
    /// 从这里到 [`MmuActivation::enter_virtual`] 都在物理地址上执行，
    /// 链接到虚拟地址的静态数据（包括日志设施）尚不可访问。
    pub fn start_kernel(mut self) -> ! {
        let layout = self.layout;
        // SAFETY: 构造时保证 pgd 可访问且独占
        let table = unsafe { self.tables.pgd.as_mut() };
        if mapper::init_kernel_mappings(table, &layout).is_err() {
            self.halt_physical();
        }

        self.start_vm()
    }

    /// 启用 MMU 并跳转到虚拟地址继续启动
    pub fn start_vm(self) -> ! {
        let ttb = match check_ttb(Paddr::new(self.tables.pgd.as_ptr() as usize)) {
            Ok(ttb) => ttb,
            Err(_) => self.halt_physical(),
        };

        enable_translation(&self.arch, ttb);

        let offset = self.layout.kernel_offset;
        let ctx = ManuallyDrop::new(self);
        let arg = &*ctx as *const Self as usize;
        // SAFETY: 已开启地址转换，内核镜像的虚拟映射在 init_kernel_mappings 中建立
        unsafe { ctx.arch.enter_virtual(offset, virtual_entry::<A, P, R, S>, arg) }
    }

    /// 旧地址上的指针在新执行环境下需要平移 `displacement`
    fn rebase(&mut self, displacement: usize) {
        if displacement == 0 {
            return;
        }
        let pgd = self.tables.pgd.as_ptr().wrapping_byte_add(displacement);
        // SAFETY: 平移后是内核镜像内的虚拟地址，不可能为零
        self.tables.pgd = unsafe { NonNull::new_unchecked(pgd) };
    }

    fn continue_virtual(mut self) -> ! {
        self.phase = BootPhase::Virtual;
        if let Err(e) = self.bring_up_virtual() {
            self.fatal(e);
        }
        self.init_finalize()
    }

    fn bring_up_virtual(&mut self) -> BootResult<()> {
        // 恒等映射只在开启 MMU 的那几条指令期间需要
        let identity = Vaddr::new(self.layout.kernel_section_phys().as_usize());
        // SAFETY: 见 start_kernel
        unsafe { self.tables.pgd.as_mut() }.remove_section_mapping(identity)?;
        // 架构钩子在平台初始化时才注册，这里直接通过 MMU 接口失效 TLB
        self.arch.invalidate_tlb();

        self.setup_dummy_current();

        // SAFETY: 见 start_kernel
        self.platform.init(unsafe { self.tables.pgd.as_mut() })?;
        info!("{}: start kernel...", self.build.name);
        info!("{}: Virtual memory enabled.", self.build.name);

        self.vectors_init()?;

        // SAFETY: 见 start_kernel
        let table = unsafe { self.tables.pgd.as_mut() };
        let remapped = mapping::remap_as_pages(
            table,
            self.layout.start_kernel.align_down_to_page(),
            self.layout.end_kernel.align_up_to_page(),
        )?;
        debug!("remapped {} kernel sections as pages", remapped);

        self.kip_init()?;

        // SAFETY: 见 start_kernel
        self.platform
            .init_syscall_page(unsafe { self.tables.pgd.as_mut() })?;

        self.scheduler.init();
        self.resources.init_system_resources();
        Ok(())
    }

    /// 建立交接前的当前任务记录，绑定 init 页表
    fn setup_dummy_current(&mut self) {
        self.current = Some(CurrentTask {
            tid: TaskId::KERNEL,
            pgd: self.tables.pgd,
        });
        debug!("dummy current bound to init pgd at {:p}", self.tables.pgd);
    }

    /// 把异常向量映射到高地址向量页并启用
    fn vectors_init(&mut self) -> BootResult<()> {
        let pa = self.layout.virt_to_phys(self.layout.vectors_start);
        let size = self.layout.vectors_size();
        // SAFETY: 见 start_kernel
        let table = unsafe { self.tables.pgd.as_mut() };
        mapping::add_boot_mapping(table, pa, Vaddr::new(ARM_HIGH_VECTOR), size, MapFlags::empty())?;
        self.arch.enable_high_vectors();
        Ok(())
    }

    fn kip_init(&mut self) -> BootResult<()> {
        // SAFETY: 已进入虚拟地址，KIP 可访问且只由本上下文使用
        let kip = unsafe { self.tables.kip.as_mut() };
        kip::kip_init(kip, &self.build);

        // SAFETY: KIP 位于内核镜像内
        let kip_pa =
            Paddr::new(unsafe { mm::arch_ops().vaddr_to_paddr(self.tables.kip.as_ptr() as usize) });
        // SAFETY: 见 start_kernel
        kip::map_kip(unsafe { self.tables.pgd.as_mut() }, kip_pa)?;
        Ok(())
    }
}

/// 进入虚拟地址后的第一个函数
/// 一级页表 16KB 大小，TTB 必须 16KB 对齐
fn check_ttb(ttb: Paddr) -> BootResult<Paddr> {
    if ttb.as_usize() & (PGD_ALIGN - 1) != 0 {
        return Err(BootError::MisalignedTable(ttb));
    }
    Ok(ttb)
}

extern "C" fn virtual_entry<A, P, R, S>(arg: usize, displacement: usize) -> !
where
    A: MmuActivation,
    P: Platform,
    R: KernelResources,
    S: Scheduler,
{
    // SAFETY: arg 指向 start_vm 中以 ManuallyDrop 保留的上下文，
    // 平移后在新地址上读取，旧副本不再使用
    let mut ctx =
        unsafe { ptr::read(arg.wrapping_add(displacement) as *const BootContext<A, P, R, S>) };
    ctx.rebase(displacement);
    ctx.continue_virtual()
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::handoff::stack_top_for;
    use crate::platform::Container;
    use crate::test_hooks::{capture_logs, install, leak_mmu, logged_levels};
    use alloc::boxed::Box;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::ops::Range;
    use core::sync::atomic::Ordering;
    use mm::config::PAGE_SIZE;
    use mm::{Granularity, PagingResult};
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::thread::ThreadId;
    use std::time::{Duration, Instant};
    use test_support::mock::mmu::{MmuOp, MockMmu};
    use uapi::layout::{ARM_SYSCALL_PAGE, USER_KIP_PAGE};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        PlatformInit,
        SyscallPage,
        SchedulerInit,
        ResourcesInit,
        BootMemoryFreed(Range<Paddr>),
        Started(TaskRef),
    }

    struct TestPlatform(Sender<Event>);

    impl Platform for TestPlatform {
        fn init(&mut self, table: &mut TranslationTable) -> PagingResult<()> {
            self.0.send(Event::PlatformInit).unwrap();
            mapping::add_boot_mapping(
                table,
                Paddr::new(0x101f_1000),
                Vaddr::new(0xf900_0000),
                PAGE_SIZE,
                MapFlags::IO_DEFAULT,
            )
        }

        fn init_syscall_page(&mut self, table: &mut TranslationTable) -> PagingResult<()> {
            self.0.send(Event::SyscallPage).unwrap();
            mapping::add_boot_mapping(
                table,
                Paddr::new(0x0010_2000),
                Vaddr::new(ARM_SYSCALL_PAGE),
                PAGE_SIZE,
                MapFlags::USR_RO,
            )
        }
    }

    struct TestResources {
        containers: Vec<Container>,
        tx: Sender<Event>,
    }

    impl KernelResources for TestResources {
        fn init_system_resources(&mut self) {
            self.tx.send(Event::ResourcesInit).unwrap();
        }

        fn containers(&self) -> &[Container] {
            &self.containers
        }

        fn free_boot_memory(&mut self, region: Range<Paddr>) {
            self.tx.send(Event::BootMemoryFreed(region)).unwrap();
        }
    }

    struct TestScheduler(Sender<Event>);

    impl Scheduler for TestScheduler {
        fn init(&mut self) {
            self.0.send(Event::SchedulerInit).unwrap();
        }

        fn start(&mut self, first: &TaskRef) -> ! {
            self.0.send(Event::Started(*first)).unwrap();
            loop {
                std::thread::park();
            }
        }
    }

    const PAGER: TaskRef = TaskRef {
        tid: TaskId(1),
        tcb: Vaddr::new(0xf080_2000),
        utcb_address: Vaddr::new(0xf800_0000),
    };

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

    fn build() -> BuildInfo {
        BuildInfo {
            name: "codezero",
            version: 0,
            subversion: 3,
            date: "Oct 16 2026",
            time: "09:30:00",
        }
    }

    struct Boot {
        mmu: &'static MockMmu,
        table: usize,
        kip: usize,
        events: Receiver<Event>,
        thread: ThreadId,
    }

    impl Boot {
        fn table(&self) -> &TranslationTable {
            unsafe { &*(self.table as *const TranslationTable) }
        }

        fn kip(&self) -> &KernelInfoPage {
            unsafe { &*(self.kip as *const KernelInfoPage) }
        }

        /// 收集事件直到调度器启动
        fn wait_started(&self) -> Vec<Event> {
            let mut events = Vec::new();
            loop {
                let event = self
                    .events
                    .recv_timeout(Duration::from_secs(10))
                    .expect("scheduler never started");
                let done = matches!(event, Event::Started(_));
                events.push(event);
                if done {
                    return events;
                }
            }
        }

        fn wait_halted(&self) {
            let deadline = Instant::now() + Duration::from_secs(10);
            while self.mmu.position(MmuOp::Halt).is_none() {
                assert!(Instant::now() < deadline, "boot never halted");
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }

    /// 在独立线程上启动；`table_offset` 非零时页表地址故意错位，只执行 start_vm
    fn spawn_boot(containers: Vec<Container>, table_offset: usize) -> Boot {
        install();
        capture_logs();
        let mmu = leak_mmu();
        let table = Box::leak(TranslationTable::new_boxed().unwrap()) as *mut TranslationTable
            as usize;
        let kip = Box::leak(Box::new(KernelInfoPage::zeroed())) as *mut KernelInfoPage as usize;
        let (tx, events) = channel();

        let handle = std::thread::spawn(move || {
            let tables = BootTables {
                pgd: NonNull::new((table + table_offset) as *mut TranslationTable).unwrap(),
                kip: NonNull::new(kip as *mut KernelInfoPage).unwrap(),
            };
            let ctx = unsafe {
                BootContext::new(
                    mmu,
                    layout(),
                    build(),
                    tables,
                    TestPlatform(tx.clone()),
                    TestResources {
                        containers,
                        tx: tx.clone(),
                    },
                    TestScheduler(tx),
                )
            };
            if table_offset == 0 {
                ctx.start_kernel()
            } else {
                ctx.start_vm()
            }
        });

        Boot {
            mmu,
            table,
            kip,
            events,
            thread: handle.thread().id(),
        }
    }

    fn one_pager() -> Vec<Container> {
        vec![Container {
            id: 0,
            tasks: vec![PAGER],
        }]
    }

    #[test]
    fn test_hardware_steps_are_ordered() {
        let boot = spawn_boot(one_pager(), 0);
        boot.wait_started();

        let order = [
            MmuOp::SetTtb,
            MmuOp::SetDomain,
            MmuOp::EnableCaches,
            MmuOp::EnableWriteBuffer,
            MmuOp::InvalidateCache,
            MmuOp::DrainWriteBuffer,
            MmuOp::InvalidateTlb,
            MmuOp::EnableMmu,
            MmuOp::EnterVirtual,
            MmuOp::EnableHighVectors,
            MmuOp::SwitchStack,
        ];
        let positions: Vec<_> = order
            .iter()
            .map(|op| boot.mmu.position(*op).expect("missing step"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);
        assert_eq!(boot.mmu.position(MmuOp::Halt), None);

        assert_eq!(boot.mmu.ttb.load(Ordering::SeqCst), boot.table);
        assert_eq!(boot.mmu.domain.load(Ordering::SeqCst), 1);
        assert_eq!(boot.mmu.offset.load(Ordering::SeqCst), 0xf000_0000);
        assert_eq!(
            boot.mmu.stack_top.load(Ordering::SeqCst),
            stack_top_for(PAGER.tcb).as_usize()
        );
    }

    #[test]
    fn test_collaborators_run_in_order() {
        let boot = spawn_boot(one_pager(), 0);
        let events = boot.wait_started();
        assert_eq!(
            events,
            [
                Event::PlatformInit,
                Event::SyscallPage,
                Event::SchedulerInit,
                Event::ResourcesInit,
                Event::BootMemoryFreed(Paddr::new(0x0015_0000)..Paddr::new(0x0016_0000)),
                Event::Started(PAGER),
            ]
        );
    }

    #[test]
    fn test_no_sections_survive_boot() {
        let boot = spawn_boot(one_pager(), 0);
        boot.wait_started();
        let table = boot.table();

        assert_eq!(table.section_entries_in(Vaddr::new(0), Vaddr::new(0xffff_f000)), 0);
        // 恒等映射已删除
        assert_eq!(table.translate(Vaddr::new(0x0010_0000)), None);

        let text = table.walk(Vaddr::new(0xf010_4321)).unwrap();
        assert_eq!(text.paddr, Paddr::new(0x0010_4321));
        assert_eq!(text.granularity, Granularity::Page);

        // 启动期区域已解除映射
        assert_eq!(table.translate(Vaddr::new(0xf015_0000)), None);
        assert_eq!(table.translate(Vaddr::new(0xf015_f000)), None);
        assert!(table.translate(Vaddr::new(0xf014_f000)).is_some());
    }

    #[test]
    fn test_vectors_kip_and_devices_are_mapped() {
        let boot = spawn_boot(one_pager(), 0);
        boot.wait_started();
        let table = boot.table();

        assert_eq!(
            table.translate(Vaddr::new(ARM_HIGH_VECTOR)),
            Some(Paddr::new(0x0010_1000))
        );
        let kip = table.walk(Vaddr::new(USER_KIP_PAGE)).unwrap();
        assert_eq!(kip.paddr, Paddr::new(boot.kip));
        assert_eq!(kip.flags, MapFlags::USR_RO);
        assert!(table.translate(Vaddr::new(0xf900_0000)).is_some());
        assert!(table.translate(Vaddr::new(ARM_SYSCALL_PAGE)).is_some());
    }

    #[test]
    fn test_kip_publishes_first_task_utcb() {
        let boot = spawn_boot(one_pager(), 0);
        boot.wait_started();
        let kip = boot.kip();
        assert_eq!(&kip.name, b"L4\x98K");
        assert_eq!(kip.utcb, PAGER.utcb_address.as_usize() as u32);
    }

    #[test]
    fn test_first_task_of_first_container_is_chosen() {
        let second = TaskRef {
            tid: TaskId(2),
            tcb: Vaddr::new(0xf080_4000),
            utcb_address: Vaddr::new(0xf801_0000),
        };
        let containers = vec![
            Container {
                id: 0,
                tasks: vec![PAGER, second],
            },
            Container {
                id: 1,
                tasks: vec![second],
            },
        ];
        let boot = spawn_boot(containers, 0);
        let events = boot.wait_started();
        assert_eq!(events.last(), Some(&Event::Started(PAGER)));
    }

    #[test]
    fn test_missing_first_task_halts() {
        let boot = spawn_boot(vec![Container::default()], 0);
        boot.wait_halted();
        assert_eq!(boot.mmu.position(MmuOp::SwitchStack), None);
        assert_eq!(boot.kip().utcb, 0);
        assert!(logged_levels(boot.thread).contains(&log::Level::Error));
    }

    #[test]
    fn test_misaligned_table_halts_before_touching_mmu() {
        let boot = spawn_boot(one_pager(), 0x400);
        boot.wait_halted();
        assert_eq!(boot.mmu.position(MmuOp::SetTtb), None);
        assert_eq!(boot.mmu.position(MmuOp::EnableMmu), None);
        // 物理地址阶段不能碰日志设施
        assert!(logged_levels(boot.thread).is_empty());
    }

    #[test]
    fn test_ttb_alignment_check() {
        assert_eq!(check_ttb(Paddr::new(0x0000_4000)), Ok(Paddr::new(0x0000_4000)));
        assert_eq!(
            check_ttb(Paddr::new(0x0000_4400)),
            Err(BootError::MisalignedTable(Paddr::new(0x0000_4400)))
        );
    }
}
