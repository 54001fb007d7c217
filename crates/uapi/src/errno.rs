//! pager 与内核 ABI 使用的错误码
//!
//! 取值与传统 Unix errno 一致；接口以负值返回（`-ENOMEM` 等）。

pub const EPERM: i32 = 1;
pub const ENOENT: i32 = 2;
pub const EIO: i32 = 5;
pub const ENOMEM: i32 = 12;
pub const EFAULT: i32 = 14;
pub const EEXIST: i32 = 17;
pub const EINVAL: i32 = 22;
