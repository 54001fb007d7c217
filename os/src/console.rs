//! PL011 串口控制台
//!
//! 串口在平台初始化时映射到 [`UART0_VIRT`](crate::config::UART0_VIRT)，此前的输出被丢弃。

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicUsize, Ordering};

use sync::SpinLock;

/// 数据寄存器
const UARTDR: usize = 0x00;
/// 标志寄存器
const UARTFR: usize = 0x18;
/// 发送 FIFO 满
const UARTFR_TXFF: u32 = 1 << 5;

static UART_BASE: AtomicUsize = AtomicUsize::new(0);
static CONSOLE_LOCK: SpinLock<()> = SpinLock::new(());

/// 串口映射完成后设置其虚拟地址
pub fn set_base(base: usize) {
    UART_BASE.store(base, Ordering::Release);
}

/// 控制台输出
pub struct Stdout;

impl Stdout {
    fn putc(base: usize, c: u8) {
        // SAFETY: base 是已映射的 UART 寄存器窗口
        unsafe {
            let fr = (base + UARTFR) as *const u32;
            while fr.read_volatile() & UARTFR_TXFF != 0 {}
            ((base + UARTDR) as *mut u32).write_volatile(c as u32);
        }
    }
}

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let base = UART_BASE.load(Ordering::Acquire);
        if base == 0 {
            return Ok(());
        }
        for c in s.bytes() {
            if c == b'\n' {
                Self::putc(base, b'\r');
            }
            Self::putc(base, c);
        }
        Ok(())
    }
}

/// 带锁的格式化输出
pub fn print(args: fmt::Arguments<'_>) {
    let _guard = CONSOLE_LOCK.lock();
    let _ = Stdout.write_fmt(args);
}

/// 不经过日志系统直接写串口
#[macro_export]
macro_rules! earlyprintln {
    () => {
        $crate::console::print(format_args!("\n"))
    };
    ($($arg:tt)*) => {
        $crate::console::print(format_args!("{}\n", format_args!($($arg)*)))
    };
}
