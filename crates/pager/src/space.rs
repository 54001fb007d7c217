//! Pager 虚拟地址空间

use log::{debug, error, warn};

use sync::SpinLock;

use crate::error::{PagerError, PagerResult};
use crate::file::VmFile;
use crate::service::MapService;
use crate::task::UserTask;
use mm::address::{checked_page_align_up, page_align, pages_spanned, pfn};
use mm::address_pool::ADDRESS_POOL_256MB;
use mm::config::{PAGE_MASK, PAGE_SHIFT, PAGE_SIZE};
use mm::{AddressPool, AlignOps, MapFlags, MappedPtr, Paddr, PoolError, TaskId, Vaddr};
use uapi::VmFlags;

/// Pager 地址池的上界（不包含）
pub const PAGER_POOL_LIMIT: usize = 0xF000_0000;

/// Pager 地址空间管理
///
/// 地址池由自旋锁保护，只在分配和释放期间持有；映射本身由 `M` 负责串行化。
pub struct PagerSpace<M, const NWORDS: usize = ADDRESS_POOL_256MB> {
    pool: SpinLock<AddressPool<NWORDS>>,
    mapper: M,
    self_tid: TaskId,
}

impl<M: MapService, const NWORDS: usize> PagerSpace<M, NWORDS> {
    /// 在 `[base, limit)` 上创建
    pub fn new(mapper: M, self_tid: TaskId, base: Vaddr, limit: Vaddr) -> Result<Self, PoolError> {
        Ok(Self {
            pool: SpinLock::new(AddressPool::new(base, limit)?),
            mapper,
            self_tid,
        })
    }

    /// 地址池从 pager 镜像结束后再空一页开始，到 [`PAGER_POOL_LIMIT`] 为止
    ///
    /// 区间超出位图容量时截短到容量，并记录警告。
    pub fn init(mapper: M, self_tid: TaskId, image_end: Vaddr) -> Result<Self, PoolError> {
        let base = image_end
            .as_usize()
            .checked_add(PAGE_SIZE)
            .and_then(checked_page_align_up)
            .map(Vaddr::new)
            .ok_or(PoolError::EmptyRange)?;
        let mut limit = Vaddr::new(PAGER_POOL_LIMIT);
        let capacity = AddressPool::<NWORDS>::CAPACITY_PAGES;
        if limit > base && (limit - base) >> PAGE_SHIFT > capacity {
            let clamped = base.add_pages(capacity);
            warn!(
                "pager pool [{:#x}, {:#x}) exceeds {} pages, clamped to {:#x}",
                base, limit, capacity, clamped
            );
            limit = clamped;
        }
        Self::new(mapper, self_tid, base, limit)
    }

    /// pager 自身的任务标识
    pub fn self_tid(&self) -> TaskId {
        self.self_tid
    }

    /// 映射服务
    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// 地址池起止
    pub fn pool_range(&self) -> (Vaddr, Vaddr) {
        let pool = self.pool.lock();
        (pool.base(), pool.limit())
    }

    /// 地址池中已分配的页数
    pub fn allocated_pages(&self) -> usize {
        self.pool.lock().allocated_pages()
    }

    /// 某页是否已从地址池分配
    pub fn is_allocated(&self, va: Vaddr) -> bool {
        self.pool.lock().is_allocated(va)
    }

    /// 分配 `npages` 个连续虚拟页
    pub fn new_address(&self, npages: usize) -> PagerResult<Vaddr> {
        self.pool.lock().allocate(npages).ok_or(PagerError::NoMemory)
    }

    /// 归还 `new_address` 得到的区间
    pub fn delete_address(&self, va: Vaddr, npages: usize) -> PagerResult<()> {
        self.pool.lock().free(va, npages)?;
        Ok(())
    }

    /// 分配一段虚拟地址并映射 `npages` 个连续物理页
    pub fn map_helper(&self, pa: Paddr, npages: usize) -> PagerResult<Vaddr> {
        let va = self.new_address(npages)?;
        if let Err(e) = self.mapper.map(pa, va, npages, MapFlags::USR_RW, self.self_tid) {
            self.rollback(va, 0, npages);
            return Err(e.into());
        }
        Ok(va)
    }

    /// 解除映射并归还虚拟地址
    pub fn unmap_helper(&self, va: Vaddr, npages: usize) -> PagerResult<()> {
        let unmapped = self.mapper.unmap(va, npages, self.self_tid);
        let deleted = self.delete_address(va, npages);
        unmapped?;
        deleted
    }

    /// 撤销本次调用已映射的 `mapped` 页并归还预留的 `reserved` 页
    fn rollback(&self, va: Vaddr, mapped: usize, reserved: usize) {
        if mapped > 0 {
            if let Err(e) = self.mapper.unmap(va, mapped, self.self_tid) {
                error!("rollback: unmap {:#x} x{} failed: {}", va, mapped, e);
            }
        }
        if let Err(e) = self.delete_address(va, reserved) {
            error!("rollback: release {:#x} x{} failed: {}", va, reserved, e);
        }
        warn!("rolled back {:#x}: {} of {} pages mapped", va, mapped, reserved);
    }

    /// 读取后页缓存中没有该页：调试构建直接停止，发布构建返回可区分的错误
    fn page_missing(pgoff: usize) -> PagerError {
        error!("page {} not in cache after a successful read", pgoff);
        if cfg!(debug_assertions) {
            panic!("page {} not in cache after a successful read", pgoff);
        }
        PagerError::PageNotFound
    }

    /// 把文件的第 `pgoff` 页映射到 pager 地址空间
    pub fn map_page<F: VmFile + ?Sized>(&self, file: &F, pgoff: usize) -> PagerResult<Vaddr> {
        let end = pgoff.checked_add(1).ok_or(PagerError::OutOfRange)?;
        file.read_pages(pgoff..end)?;
        let pa = file.find_page(pgoff).ok_or_else(|| Self::page_missing(pgoff))?;
        let va = self.map_helper(pa, 1)?;
        debug!("map_page: file page {} -> {:#x}", pgoff, va);
        Ok(va)
    }

    /// 解除 `map_page` 建立的映射
    pub fn unmap_page(&self, addr: Vaddr) -> PagerResult<()> {
        self.unmap_helper(addr.align_down_to_page(), 1)
    }

    /// 把文件从 `pgoff` 起的 `npages` 页映射到一段连续虚拟地址
    ///
    /// 任何一页失败都会撤销已建立的映射并归还整段地址。
    pub fn map_pages<F: VmFile + ?Sized>(
        &self,
        file: &F,
        pgoff: usize,
        npages: usize,
    ) -> PagerResult<Vaddr> {
        let end = match pgoff.checked_add(npages) {
            Some(end) if npages > 0 => end,
            _ => return Err(PagerError::OutOfRange),
        };
        file.read_pages(pgoff..end)?;

        let start = self.new_address(npages)?;
        for i in 0..npages {
            let pa = match file.find_page(pgoff + i) {
                Some(pa) => pa,
                None => {
                    self.rollback(start, i, npages);
                    return Err(Self::page_missing(pgoff + i));
                }
            };
            if let Err(e) = self
                .mapper
                .map(pa, start.add_pages(i), 1, MapFlags::USR_RW, self.self_tid)
            {
                self.rollback(start, i, npages);
                return Err(e.into());
            }
        }

        debug!("map_pages: file pages {}..{} -> {:#x}", pgoff, end, start);
        Ok(start)
    }

    /// 解除 `map_pages` 建立的映射；地址可以带着页内偏移
    pub fn unmap_pages(&self, addr: Vaddr, npages: usize) -> PagerResult<()> {
        self.unmap_helper(addr.align_down_to_page(), npages)
    }

    /// 映射文件的字节区间 `[byte_offset, byte_offset + size)`
    ///
    /// 返回值保留 `byte_offset` 的页内偏移。区间末端超出地址空间时返回
    /// [`PagerError::OutOfRange`]，不分配任何地址。
    pub fn map_file_range<F: VmFile + ?Sized>(
        &self,
        file: &F,
        byte_offset: usize,
        size: usize,
    ) -> PagerResult<MappedPtr> {
        let npages = pages_spanned(byte_offset & PAGE_MASK, size).ok_or(PagerError::OutOfRange)?;
        let base = self.map_pages(file, pfn(byte_offset), npages)?;
        Ok(MappedPtr::new(base, byte_offset))
    }

    /// 校验 `task` 拥有 `[ptr, ptr + size)` 后，把这些页映射到 pager 地址空间
    ///
    /// 返回值保留 `ptr` 的页内偏移。逐页解析失败时撤销已映射的页并归还整段地址。
    pub fn validate_map_user_range<T: UserTask + ?Sized>(
        &self,
        task: &T,
        ptr: Vaddr,
        size: usize,
        flags: VmFlags,
    ) -> PagerResult<MappedPtr> {
        let npages = match pages_spanned(ptr.as_usize(), size) {
            Some(n) if n > 0 => n,
            _ => return Err(PagerError::OutOfRange),
        };
        task.validate_range(ptr, size, flags)?;

        let start = page_align(ptr.as_usize());

        let virt_start = self.new_address(npages)?;
        for i in 0..npages {
            let user_page = Vaddr::new(start).add_pages(i);
            let result = task.virt_to_page(user_page).and_then(|pa| {
                self.mapper
                    .map(pa, virt_start.add_pages(i), 1, MapFlags::USR_RW, self.self_tid)
            });
            if let Err(e) = result {
                self.rollback(virt_start, i, npages);
                return Err(e.into());
            }
        }

        debug!(
            "user range {:#x}+{:#x} mapped at {:#x}",
            ptr, size, virt_start
        );
        Ok(MappedPtr::new(virt_start, ptr.as_usize()))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::file::FileError;
    use crate::task::PermissionDenied;
    use crate::test_hooks;
    use core::cell::Cell;
    use core::ops::Range;
    use mm::{AddressSpace, PagingError, PagingResult};

    const PAGER: TaskId = TaskId(1);

    /// 页 i 的物理地址为 0x8000_0000 + i * 0x10000
    struct MemFile {
        npages: usize,
        io_error: bool,
        missing: Option<usize>,
        reads: Cell<usize>,
    }

    impl MemFile {
        fn new(npages: usize) -> Self {
            Self {
                npages,
                io_error: false,
                missing: None,
                reads: Cell::new(0),
            }
        }

        fn page(pgoff: usize) -> Paddr {
            Paddr::new(0x8000_0000 + pgoff * 0x10000)
        }
    }

    impl VmFile for MemFile {
        fn read_pages(&self, pages: Range<usize>) -> Result<(), FileError> {
            self.reads.set(self.reads.get() + 1);
            if self.io_error {
                return Err(FileError::Io);
            }
            if pages.end > self.npages {
                return Err(FileError::OutOfRange);
            }
            Ok(())
        }

        fn find_page(&self, pgoff: usize) -> Option<Paddr> {
            (pgoff < self.npages && self.missing != Some(pgoff)).then(|| Self::page(pgoff))
        }
    }

    struct Task {
        owned: Range<usize>,
        fail_at: Option<usize>,
    }

    impl UserTask for Task {
        fn validate_range(&self, ptr: Vaddr, size: usize, _flags: VmFlags) -> Result<(), PermissionDenied> {
            let (s, e) = (ptr.as_usize(), ptr.as_usize() + size);
            if s >= self.owned.start && e <= self.owned.end {
                Ok(())
            } else {
                Err(PermissionDenied)
            }
        }

        fn virt_to_page(&self, addr: Vaddr) -> PagingResult<Paddr> {
            if self.fail_at == Some(addr.as_usize()) {
                return Err(PagingError::NotMapped);
            }
            Ok(Paddr::new(0x9000_0000 + (addr.as_usize() - self.owned.start)))
        }
    }

    const BASE: usize = 0x4000_0000;

    fn pager() -> PagerSpace<AddressSpace, 1> {
        test_hooks::install();
        let space = AddressSpace::new(PAGER).unwrap();
        PagerSpace::new(space, PAGER, Vaddr::new(BASE), Vaddr::new(BASE + 64 * PAGE_SIZE)).unwrap()
    }

    fn assert_clean(p: &PagerSpace<AddressSpace, 1>) {
        assert_eq!(p.allocated_pages(), 0);
        for i in 0..64 {
            assert_eq!(p.mapper().translate(Vaddr::new(BASE).add_pages(i)), None);
        }
    }

    #[test]
    fn test_map_single_page() {
        let p = pager();
        let file = MemFile::new(4);
        let va = p.map_page(&file, 2).unwrap();
        assert_eq!(va, Vaddr::new(BASE));
        assert_eq!(p.mapper().translate(va), Some(MemFile::page(2)));
        assert_eq!(p.mapper().walk(va).unwrap().flags, MapFlags::USR_RW);

        p.unmap_page(va + 0x123).unwrap();
        assert_clean(&p);
    }

    #[test]
    fn test_read_errors_propagate_without_allocation() {
        let p = pager();
        let mut file = MemFile::new(4);
        assert_eq!(p.map_page(&file, 4), Err(PagerError::OutOfRange));
        assert_eq!(p.map_pages(&file, 2, 3), Err(PagerError::OutOfRange));
        file.io_error = true;
        assert_eq!(p.map_page(&file, 0), Err(PagerError::Io));
        assert_eq!(file.reads.get(), 3);
        assert_clean(&p);
    }

    #[test]
    fn test_map_pages_round_trip() {
        let p = pager();
        let file = MemFile::new(8);
        let va = p.map_pages(&file, 3, 4).unwrap();
        for i in 0..4 {
            assert_eq!(p.mapper().translate(va.add_pages(i)), Some(MemFile::page(3 + i)));
        }
        assert_eq!(p.allocated_pages(), 4);
        p.unmap_pages(va, 4).unwrap();
        assert_clean(&p);
    }

    #[test]
    fn test_zero_pages_is_rejected() {
        let p = pager();
        assert_eq!(p.map_pages(&MemFile::new(4), 0, 0), Err(PagerError::OutOfRange));
    }

    #[test]
    fn test_pool_exhaustion_is_no_memory() {
        let p = pager();
        let file = MemFile::new(128);
        p.map_pages(&file, 0, 60).unwrap();
        assert_eq!(p.map_pages(&file, 60, 5), Err(PagerError::NoMemory));
        assert_eq!(p.allocated_pages(), 60);
    }

    #[test]
    fn test_map_file_range_keeps_offset() {
        let p = pager();
        let file = MemFile::new(8);
        let ptr = p.map_file_range(&file, 0x1234, 0x2000).unwrap();
        assert_eq!(ptr.offset(), 0x234);
        assert_eq!(ptr.encode() & PAGE_MASK, 0x234);
        assert_eq!(p.allocated_pages(), 3);
        for i in 0..3 {
            assert_eq!(p.mapper().translate(ptr.base().add_pages(i)), Some(MemFile::page(1 + i)));
        }
        p.unmap_pages(Vaddr::new(ptr.encode()), 3).unwrap();
        assert_clean(&p);
    }

    #[test]
    fn test_oversized_ranges_are_out_of_range() {
        let p = pager();
        let file = MemFile::new(8);
        assert_eq!(
            p.map_file_range(&file, 0x1234, usize::MAX - 0x100),
            Err(PagerError::OutOfRange)
        );
        assert_eq!(p.map_pages(&file, usize::MAX, 2), Err(PagerError::OutOfRange));
        assert_eq!(p.map_page(&file, usize::MAX), Err(PagerError::OutOfRange));
        assert_eq!(file.reads.get(), 0);

        let task = Task {
            owned: 0x1000_0000..0x1001_0000,
            fail_at: None,
        };
        assert_eq!(
            p.validate_map_user_range(&task, Vaddr::new(0x1000_0000), usize::MAX, VmFlags::READ),
            Err(PagerError::OutOfRange)
        );
        assert_clean(&p);
    }

    #[test]
    fn test_init_rejects_image_end_at_top() {
        test_hooks::install();
        let space = AddressSpace::new(PAGER).unwrap();
        assert!(matches!(
            PagerSpace::<_, 1>::init(space, PAGER, Vaddr::new(usize::MAX - 0x10)),
            Err(PoolError::EmptyRange)
        ));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "not in cache"))]
    fn test_missing_page_is_internal_error() {
        let p = pager();
        let mut file = MemFile::new(8);
        file.missing = Some(5);
        assert_eq!(p.map_pages(&file, 3, 4), Err(PagerError::PageNotFound));
        assert_clean(&p);
    }

    #[test]
    fn test_user_range_mapping() {
        let p = pager();
        let task = Task {
            owned: 0x1000_0000..0x1001_0000,
            fail_at: None,
        };
        let ptr = p
            .validate_map_user_range(&task, Vaddr::new(0x1000_2ff0), 0x20, VmFlags::READ)
            .unwrap();
        assert_eq!(ptr.offset(), 0xff0);
        assert_eq!(p.allocated_pages(), 2);
        assert_eq!(p.mapper().translate(ptr.base()), Some(Paddr::new(0x9000_2000)));
        assert_eq!(
            p.mapper().translate(ptr.base().add_pages(1)),
            Some(Paddr::new(0x9000_3000))
        );
    }

    #[test]
    fn test_user_range_not_owned_is_rejected() {
        let p = pager();
        let task = Task {
            owned: 0x1000_0000..0x1000_2000,
            fail_at: None,
        };
        assert_eq!(
            p.validate_map_user_range(&task, Vaddr::new(0x1000_1000), 0x2000, VmFlags::WRITE),
            Err(PagerError::Permission)
        );
        assert_clean(&p);
    }

    #[test]
    fn test_user_range_rolls_back_mid_walk() {
        let p = pager();
        let task = Task {
            owned: 0x1000_0000..0x1001_0000,
            fail_at: Some(0x1000_3000),
        };
        assert_eq!(
            p.validate_map_user_range(&task, Vaddr::new(0x1000_0000), 0x5000, VmFlags::READ),
            Err(PagerError::Map(PagingError::NotMapped))
        );
        assert_clean(&p);
    }

    #[test]
    fn test_init_clamps_to_capacity() {
        test_hooks::install();
        let space = AddressSpace::new(PAGER).unwrap();
        let p = PagerSpace::<_, 1>::init(space, PAGER, Vaddr::new(0x0080_1234)).unwrap();
        let (base, limit) = p.pool_range();
        assert_eq!(base, Vaddr::new(0x0080_3000));
        assert_eq!(limit, base.add_pages(64));
    }

    #[test]
    fn test_helpers_pair_up() {
        let p = pager();
        let va = p.map_helper(Paddr::new(0x7000_0000), 2).unwrap();
        assert_eq!(p.mapper().translate(va.add_pages(1)), Some(Paddr::new(0x7000_1000)));
        p.unmap_helper(va, 2).unwrap();
        assert_clean(&p);

        let va = p.new_address(3).unwrap();
        assert!(p.is_allocated(va.add_pages(2)));
        p.delete_address(va, 3).unwrap();
        assert_eq!(
            p.delete_address(va, 3),
            Err(PagerError::Pool(PoolError::NotAllocated))
        );
    }

    #[test]
    fn test_wrong_owner_cannot_map() {
        test_hooks::install();
        let space = AddressSpace::new(TaskId(9)).unwrap();
        let p = PagerSpace::<_, 1>::new(space, PAGER, Vaddr::new(BASE), Vaddr::new(BASE + 0x10000))
            .unwrap();
        assert_eq!(
            p.map_helper(Paddr::new(0x7000_0000), 1),
            Err(PagerError::Map(PagingError::WrongSpace))
        );
        assert_eq!(p.allocated_pages(), 0);
    }
}
