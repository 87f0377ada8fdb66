//! Time units and the millisecond tick source used for bounded waits
//!
//! Units are re-exported from [`embedded_time`].

pub use embedded_time::duration::Milliseconds;
pub use embedded_time::rate::Hertz;

/// Wait forever. Passed as the timeout to [`Adc::poll_for_conversion`].
///
/// [`Adc::poll_for_conversion`]: `crate::adc::Adc::poll_for_conversion`
pub const MAX_DELAY: Milliseconds = Milliseconds(u32::MAX);

/// A free running millisecond counter, e.g. backed by SysTick.
///
/// The counter is allowed to wrap around.
pub trait TickSource {
    /// Current tick count in milliseconds.
    fn now(&self) -> Milliseconds;
}

impl<T: TickSource> TickSource for &T {
    fn now(&self) -> Milliseconds {
        (*self).now()
    }
}

/// A point in time read from a [`TickSource`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Instant {
    start: u32,
}

impl Instant {
    pub(crate) fn now<T: TickSource>(ticks: &T) -> Self {
        Self {
            start: ticks.now().0,
        }
    }

    /// Milliseconds elapsed since this instant was taken.
    pub(crate) fn elapsed<T: TickSource>(self, ticks: &T) -> u32 {
        ticks.now().0.wrapping_sub(self.start)
    }

    /// Has more than `timeout` passed since this instant?
    ///
    /// A timeout of zero is expired right away, [`MAX_DELAY`] never expires.
    pub(crate) fn expired<T: TickSource>(self, ticks: &T, timeout: Milliseconds) -> bool {
        match timeout.0 {
            u32::MAX => false,
            0 => true,
            t => self.elapsed(ticks) > t,
        }
    }
}

/// Number of CPU cycles in `micros` microseconds at `sysclk`, rounded up.
pub(crate) fn cycles_for_micros(sysclk: Hertz, micros: u32) -> u32 {
    let cycles = (u64::from(sysclk.0) * u64::from(micros) + 999_999) / 1_000_000;
    if cycles > u64::from(u32::MAX) {
        u32::MAX
    } else {
        cycles as u32
    }
}

/// Busy wait for at least `cycles` CPU cycles.
pub(crate) fn delay_cycles(cycles: u32) {
    cfg_if::cfg_if! {
        if #[cfg(all(target_arch = "arm", target_os = "none"))] {
            cortex_m::asm::delay(cycles);
        } else {
            for _ in 0..cycles {
                core::hint::spin_loop();
            }
        }
    }
}
