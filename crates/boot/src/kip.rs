//! 内核信息页初始化

use log::info;

use crate::error::{BootError, BootResult};
use crate::layout::BuildInfo;
use mm::{mapping, MapFlags, Paddr, PagingResult, TranslationTable, Vaddr};
use uapi::kip::{
    KernelInfoPage, SyscallTable, KDESC_MAGIC, KIP_API_SUBVERSION, KIP_API_VERSION, KIP_NAME,
    KIP_SIZE,
};
use uapi::layout::USER_KIP_PAGE;

/// 填写 KIP 的全部只读字段；UTCB 地址保持为零
pub fn kip_init(kip: &mut KernelInfoPage, build: &BuildInfo) {
    *kip = KernelInfoPage::zeroed();
    kip.name = KIP_NAME;
    kip.api_version = KIP_API_VERSION;
    kip.api_subversion = KIP_API_SUBVERSION;
    // 小端、32 位
    kip.api_flags = 0;
    kip.kdesc.magic = KDESC_MAGIC;
    kip.kdesc.version = build.version;
    kip.kdesc.subversion = build.subversion;
    kip.set_date(build.date);
    kip.set_time(build.time);
    kip.syscalls = SyscallTable::new();

    info!("{}: Kernel built on {}, {}", build.name, kip.date(), kip.time());
}

/// 把 KIP 以用户只读方式映射到 [`USER_KIP_PAGE`]
pub fn map_kip(table: &mut TranslationTable, kip_pa: Paddr) -> PagingResult<()> {
    mapping::add_boot_mapping(table, kip_pa, Vaddr::new(USER_KIP_PAGE), KIP_SIZE, MapFlags::USR_RO)
}

/// 写入第一个任务的 UTCB 段地址，只允许一次
///
/// `published` 记录是否已经写过；地址本身可以是零。
pub fn publish_utcb(kip: &mut KernelInfoPage, published: &mut bool, utcb: Vaddr) -> BootResult<()> {
    if *published {
        return Err(BootError::UtcbAlreadyPublished);
    }
    kip.utcb = u32::try_from(utcb.as_usize()).map_err(|_| BootError::UtcbOutOfRange(utcb))?;
    *published = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use uapi::kip::Syscall;
    use uapi::layout::ARM_SYSCALL_PAGE;

    fn build() -> BuildInfo {
        BuildInfo {
            name: "codezero",
            version: 0,
            subversion: 3,
            date: "Oct 16 2026",
            time: "09:30:00",
        }
    }

    #[test]
    fn test_kip_fields() {
        let mut kip = Box::new(KernelInfoPage::zeroed());
        kip.utcb = 0xdead;
        kip_init(&mut kip, &build());

        assert_eq!(&kip.name, b"L4\x98K");
        assert_eq!(kip.api_version, 0xbb);
        assert_eq!(kip.api_subversion, 1);
        assert_eq!(kip.api_flags, 0);
        assert_eq!(kip.kdesc.magic, 0xbbb);
        assert_eq!(kip.kdesc.subversion, 3);
        assert_eq!(kip.date(), "Oct 16 2026");
        assert_eq!(kip.time(), "09:30:00");
        assert_eq!(kip.syscalls.entry_address(Syscall::Ipc), ARM_SYSCALL_PAGE);
        assert_eq!(kip.utcb, 0);
    }

    #[test]
    fn test_utcb_is_published_once() {
        let mut kip = Box::new(KernelInfoPage::zeroed());
        kip_init(&mut kip, &build());
        let mut published = false;
        publish_utcb(&mut kip, &mut published, Vaddr::new(0x3000_0000)).unwrap();
        assert!(published);
        assert_eq!(kip.utcb, 0x3000_0000);
        assert_eq!(
            publish_utcb(&mut kip, &mut published, Vaddr::new(0x3100_0000)),
            Err(BootError::UtcbAlreadyPublished)
        );
        assert_eq!(kip.utcb, 0x3000_0000);
    }

    #[test]
    fn test_zero_utcb_still_counts_as_published() {
        let mut kip = Box::new(KernelInfoPage::zeroed());
        let mut published = false;
        publish_utcb(&mut kip, &mut published, Vaddr::new(0)).unwrap();
        assert_eq!(
            publish_utcb(&mut kip, &mut published, Vaddr::new(0x3000_0000)),
            Err(BootError::UtcbAlreadyPublished)
        );
        assert_eq!(kip.utcb, 0);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_utcb_beyond_32_bits_is_rejected() {
        let mut kip = Box::new(KernelInfoPage::zeroed());
        let mut published = false;
        let utcb = Vaddr::new(0x1_0000_0000);
        assert_eq!(
            publish_utcb(&mut kip, &mut published, utcb),
            Err(BootError::UtcbOutOfRange(utcb))
        );
        assert!(!published);
        assert_eq!(kip.utcb, 0);
    }
}
