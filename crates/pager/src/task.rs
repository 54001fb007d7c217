//! 用户任务接口

use mm::{Paddr, PagingResult, Vaddr};
use uapi::VmFlags;

/// 用户任务不拥有请求的区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDenied;

/// Pager 眼中的用户任务
pub trait UserTask {
    /// 校验任务拥有 `[ptr, ptr + size)` 且具有 `flags` 要求的访问权限
    fn validate_range(&self, ptr: Vaddr, size: usize, flags: VmFlags) -> Result<(), PermissionDenied>;

    /// 查任务自己的页表，返回 `addr` 所在页的物理地址
    fn virt_to_page(&self, addr: Vaddr) -> PagingResult<Paddr>;
}
