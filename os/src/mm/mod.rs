//! 内核静态内存：init 页表、KIP 和内核堆
//!
//! 这些对象都在 bss 中，由 `entry.S` 清零。MMU 开启之前只取它们的地址，不访问内容。

use core::ptr::{addr_of_mut, NonNull};

use ::mm::{TranslationTable, Vaddr};
use boot::KernelLayout;
use log::info;
use sync::RawSpinLock;
use talc::{ErrOnOom, Span, Talc, Talck};
use uapi::KernelInfoPage;

use crate::config::KERNEL_HEAP_SIZE;

/// init 页表（类型本身保证 16KB 对齐）
static mut INIT_PGD: TranslationTable = TranslationTable::new();

/// 内核信息页
static mut KIP: KernelInfoPage = KernelInfoPage::zeroed();

/// 内核堆
static mut HEAP_ARENA: [u8; KERNEL_HEAP_SIZE] = [0; KERNEL_HEAP_SIZE];

#[global_allocator]
static ALLOCATOR: Talck<RawSpinLock, ErrOnOom> = Talc::new(ErrOnOom).lock();

/// init 页表的物理地址，开启 MMU 之前使用
pub fn init_pgd_phys(layout: &KernelLayout) -> NonNull<TranslationTable> {
    let va = Vaddr::new(addr_of_mut!(INIT_PGD) as usize);
    let pa = layout.virt_to_phys(va).as_usize() as *mut TranslationTable;
    // SAFETY: 内核镜像装载在非零物理地址上
    unsafe { NonNull::new_unchecked(pa) }
}

/// KIP 的虚拟地址
pub fn kip_virt() -> NonNull<KernelInfoPage> {
    // SAFETY: 静态变量的地址非空
    unsafe { NonNull::new_unchecked(addr_of_mut!(KIP)) }
}

/// 把堆区交给分配器
///
/// 必须在进入虚拟地址之后、第一次分配之前调用一次。
pub fn init_heap() {
    let arena = Span::from_array(addr_of_mut!(HEAP_ARENA));
    // SAFETY: 堆区只交给分配器这一次，此后不再直接访问
    match unsafe { ALLOCATOR.lock().claim(arena) } {
        Ok(span) => info!("heap: {} KiB claimed at {:?}", KERNEL_HEAP_SIZE / 1024, span),
        Err(()) => crate::arch::halt(),
    }
}
