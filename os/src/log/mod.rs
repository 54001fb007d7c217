//! 内核日志
//!
//! `log` 门面的后端，直接写串口。只能在串口映射之后安装。

use core::fmt::Write;
use core::sync::atomic::{AtomicUsize, Ordering};

use ::log::{Level, LevelFilter, Log, Metadata, Record};

use crate::console::Stdout;

/// 已输出的日志条数，作为时间戳的替代
static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= ::log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "\x1b[31mERROR\x1b[0m",
            Level::Warn => "\x1b[33m WARN\x1b[0m",
            Level::Info => "\x1b[32m INFO\x1b[0m",
            Level::Debug => "\x1b[34mDEBUG\x1b[0m",
            Level::Trace => "\x1b[35mTRACE\x1b[0m",
        };
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        crate::console::print(format_args!(
            "[{:>6}] {} {}: {}\n",
            seq,
            tag,
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// 安装日志后端
///
/// 重复调用时保留第一次安装的后端，只更新级别。
pub fn init(level: LevelFilter) {
    if ::log::set_logger(&LOGGER).is_err() {
        let _ = Stdout.write_str("log: logger already installed\n");
    }
    ::log::set_max_level(level);
}
