//! 定长位图 ID 池
//!
//! 每个 bit 表示一个单元（0=空闲，1=已分配），容量在编译期由 `NWORDS` 决定，
//! 运行期只能使用其中的前 `nbits` 位。
//!
//! 分配采用首次适配：从最低位开始扫描，返回第一段足够长的连续空闲区域，
//! 扫描时整字跳过全满或全空的 u64。

use crate::address_pool::PoolError;

/// 每个字的位数
const WORD_BITS: usize = u64::BITS as usize;

/// 定长位图
pub struct IdPool<const NWORDS: usize> {
    bitmap: [u64; NWORDS],
    /// 实际可用的位数（不超过 `NWORDS * 64`）
    nbits: usize,
    /// 已分配位数（用于快速统计）
    allocated: usize,
}

impl<const NWORDS: usize> IdPool<NWORDS> {
    /// 位图的最大容量
    pub const CAPACITY: usize = NWORDS * WORD_BITS;

    /// 创建使用前 `nbits` 位的位图
    pub const fn new(nbits: usize) -> Result<Self, PoolError> {
        if nbits > Self::CAPACITY {
            return Err(PoolError::ExceedsCapacity);
        }
        Ok(Self {
            bitmap: [0; NWORDS],
            nbits,
            allocated: 0,
        })
    }

    /// 可用位数
    pub fn len(&self) -> usize {
        self.nbits
    }

    /// 已分配位数
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// 是否没有任何位被分配
    pub fn is_empty(&self) -> bool {
        self.allocated == 0
    }

    /// 检查某一位是否已分配
    #[inline]
    pub fn is_set(&self, idx: usize) -> bool {
        self.bitmap[idx / WORD_BITS] & (1u64 << (idx % WORD_BITS)) != 0
    }

    #[inline]
    fn set(&mut self, idx: usize) {
        self.bitmap[idx / WORD_BITS] |= 1u64 << (idx % WORD_BITS);
    }

    #[inline]
    fn clear(&mut self, idx: usize) {
        self.bitmap[idx / WORD_BITS] &= !(1u64 << (idx % WORD_BITS));
    }

    /// 分配 `num` 个连续位，返回起始下标
    pub fn alloc_contig(&mut self, num: usize) -> Option<usize> {
        if num == 0 || num > self.nbits - self.allocated {
            return None;
        }

        let start = self.find_free_run(num)?;
        for i in start..start + num {
            self.set(i);
        }
        self.allocated += num;
        Some(start)
    }

    fn find_free_run(&self, num: usize) -> Option<usize> {
        let mut consecutive = 0;
        let mut run_start = 0;
        let words = self.nbits.div_ceil(WORD_BITS);

        for (idx, &word) in self.bitmap[..words].iter().enumerate() {
            let base = idx * WORD_BITS;

            // 快速跳过全满的 u64
            if word == u64::MAX {
                consecutive = 0;
                continue;
            }

            // 整个 u64 都空闲，快速累加
            if word == 0 {
                if consecutive == 0 {
                    run_start = base;
                }
                consecutive += WORD_BITS.min(self.nbits - base);
                if consecutive >= num {
                    return Some(run_start);
                }
                continue;
            }

            // 逐位检查
            for bit in 0..WORD_BITS {
                let i = base + bit;
                if i >= self.nbits {
                    break;
                }
                if word & (1u64 << bit) == 0 {
                    if consecutive == 0 {
                        run_start = i;
                    }
                    consecutive += 1;
                    if consecutive == num {
                        return Some(run_start);
                    }
                } else {
                    consecutive = 0;
                }
            }
        }

        None
    }

    /// 释放从 `start` 开始的 `num` 个位
    ///
    /// 区间内任何一位未被分配时整体拒绝，不修改位图。
    pub fn free_contig(&mut self, start: usize, num: usize) -> Result<(), PoolError> {
        let end = start.checked_add(num).ok_or(PoolError::OutOfRange)?;
        if end > self.nbits {
            return Err(PoolError::OutOfRange);
        }
        if (start..end).any(|i| !self.is_set(i)) {
            return Err(PoolError::NotAllocated);
        }

        for i in start..end {
            self.clear(i);
        }
        self.allocated -= num;
        Ok(())
    }

    /// 位图原始数据
    pub fn words(&self) -> &[u64] {
        &self.bitmap
    }
}
