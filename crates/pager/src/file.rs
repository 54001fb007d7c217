//! 文件页缓存接口

use core::ops::Range;

use mm::Paddr;

/// 读取文件页的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileError {
    /// 底层读取失败
    Io,
    /// 页偏移超出文件
    OutOfRange,
}

/// 以页缓存形式提供内容的文件对象
///
/// 页由页缓存持有，映射代码只读取它们的物理地址。
pub trait VmFile {
    /// 确保 `pages`（页偏移，左闭右开）全部驻留在页缓存中
    fn read_pages(&self, pages: Range<usize>) -> Result<(), FileError>;

    /// 页缓存中该页的物理地址
    fn find_page(&self, pgoff: usize) -> Option<Paddr>;
}
