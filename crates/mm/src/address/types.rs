//! 地址类型定义

use core::fmt;
use core::ops::{Add, Sub};

use crate::config::{PAGE_MASK, PAGE_SHIFT, SECTION_MASK};

/// 对齐相关运算
///
/// 页（4KB）和段（1MB）两种粒度都有对应的方法。
pub trait AlignOps: Sized + Copy {
    /// 原始数值
    fn as_usize(self) -> usize;
    /// 由原始数值构造
    fn from_usize(value: usize) -> Self;

    /// 是否页对齐
    #[inline]
    fn is_page_aligned(self) -> bool {
        self.as_usize() & PAGE_MASK == 0
    }

    /// 是否段对齐
    #[inline]
    fn is_section_aligned(self) -> bool {
        self.as_usize() & SECTION_MASK == 0
    }

    /// 向下对齐到页边界
    #[inline]
    fn align_down_to_page(self) -> Self {
        Self::from_usize(self.as_usize() & !PAGE_MASK)
    }

    /// 向上对齐到页边界
    #[inline]
    fn align_up_to_page(self) -> Self {
        Self::from_usize((self.as_usize() + PAGE_MASK) & !PAGE_MASK)
    }

    /// 向下对齐到段边界
    #[inline]
    fn align_down_to_section(self) -> Self {
        Self::from_usize(self.as_usize() & !SECTION_MASK)
    }

    /// 页内偏移
    #[inline]
    fn page_offset(self) -> usize {
        self.as_usize() & PAGE_MASK
    }
}

/// `impl_address!` 宏
///
/// 为地址新类型实现 [`AlignOps`]、格式化以及与 `usize` 的加减运算。
macro_rules! impl_address {
    ($ty:ident, $prefix:literal) => {
        impl $ty {
            /// 由原始数值构造
            #[inline]
            pub const fn new(value: usize) -> Self {
                Self(value)
            }

            /// 原始数值
            #[inline]
            pub const fn as_usize(self) -> usize {
                self.0
            }

            /// 偏移 `pages` 个页
            #[inline]
            pub const fn add_pages(self, pages: usize) -> Self {
                Self(self.0 + (pages << PAGE_SHIFT))
            }
        }

        impl AlignOps for $ty {
            #[inline]
            fn as_usize(self) -> usize {
                self.0
            }

            #[inline]
            fn from_usize(value: usize) -> Self {
                Self(value)
            }
        }

        impl Add<usize> for $ty {
            type Output = Self;

            fn add(self, rhs: usize) -> Self {
                Self(self.0 + rhs)
            }
        }

        impl Sub<usize> for $ty {
            type Output = Self;

            fn sub(self, rhs: usize) -> Self {
                Self(self.0 - rhs)
            }
        }

        impl Sub for $ty {
            type Output = usize;

            fn sub(self, rhs: Self) -> usize {
                self.0 - rhs.0
            }
        }

        impl From<usize> for $ty {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "({:#x})"), self.0)
            }
        }

        impl fmt::LowerHex for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }
    };
}

/// 物理地址
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Paddr(usize);

/// 虚拟地址
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Vaddr(usize);

impl_address!(Paddr, "Paddr");
impl_address!(Vaddr, "Vaddr");

impl Vaddr {
    /// 转换为原始指针
    #[inline]
    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    /// 转换为可变原始指针
    #[inline]
    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }
}
