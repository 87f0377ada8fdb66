//! Dual ADC mode
//!
//! The two ADCs of a pair share the common control register. In a
//! synchronized mode the master triggers both, so the slave has to be
//! prepared (enabled) before the master starts, and the master has to stop
//! before the slave. [`DualAdc`] owns both instances and keeps that order.

use enumset::EnumSet;

use super::config::{DmaAccessMode, DmaMode, Multimode, MultimodeConfig, MAX_TWO_SAMPLING_DELAY};
use super::conversion::STOP_CONVERSION_TIMEOUT;
use super::{Adc, Callbacks, Error, Event, Group, Notification, Registers, State, Transfer};
use crate::dma::{self, WriteBuffer};
use crate::time::{Instant, TickSource};

/// Keep the first error of a best effort sequence.
fn keep_first(result: &mut Result<(), Error>, next: Result<(), Error>) {
    if result.is_ok() {
        *result = next;
    }
}

impl<R, T, D, CB> Adc<R, T, D, CB>
where
    R: Registers,
    T: TickSource,
{
    /// Wait until neither this regular group nor the one of the paired ADC converts.
    fn wait_regular_idle<F>(&mut self, paired_converting: F) -> Result<(), Error>
    where
        F: Fn() -> bool,
    {
        let start = Instant::now(&self.ticks);
        let converting =
            |adc: &Self| adc.regs.is_converting(Group::Regular) || paired_converting();
        while converting(self) {
            if start.expired(&self.ticks, STOP_CONVERSION_TIMEOUT) && converting(self) {
                return Err(self.fail_timeout());
            }
        }
        Ok(())
    }
}

/// A master and a slave ADC working as a pair.
pub struct DualAdc<M, S> {
    master: M,
    slave: S,
}

impl<RM, TM, DM, CBM, RS, TS, DS, CBS> DualAdc<Adc<RM, TM, DM, CBM>, Adc<RS, TS, DS, CBS>>
where
    RM: Registers,
    TM: TickSource,
    RS: Registers,
    TS: TickSource,
{
    /// Pair `master` with `slave`.
    ///
    /// Both ADCs are handed back if `slave` is not the partner of `master`,
    /// and the master is marked [`State::ErrorConfig`].
    #[allow(clippy::type_complexity)]
    pub fn new(
        mut master: Adc<RM, TM, DM, CBM>,
        slave: Adc<RS, TS, DS, CBS>,
    ) -> Result<Self, (Adc<RM, TM, DM, CBM>, Adc<RS, TS, DS, CBS>)> {
        if master.id().slave() != Some(slave.id()) {
            master.fail_config();
            return Err((master, slave));
        }
        Ok(Self { master, slave })
    }

    /// Program the dual mode.
    ///
    /// The mode and the sampling delay can only change while both ADCs are
    /// disabled, the DMA settings while no regular conversion is ongoing. A
    /// call which would break one of these rules is rejected as a whole.
    ///
    /// The DMA of the common data register runs circular when the master is
    /// configured with [`DmaMode::Circular`].
    pub fn configure(&mut self, config: MultimodeConfig) -> Result<(), Error> {
        let slave = &mut self.slave;
        self.master.locked(|master| {
            if !(1..=MAX_TWO_SAMPLING_DELAY).contains(&config.two_sampling_delay)
                || master.regs.is_converting(Group::Regular)
                || slave.regs.is_converting(Group::Regular)
            {
                return Err(master.fail_config());
            }

            let ccr = master.regs.ccr();
            let timing_changes = ccr.multimode != config.mode
                || ccr.two_sampling_delay != config.two_sampling_delay;
            if timing_changes && (master.regs.is_enabled() || slave.regs.is_enabled()) {
                return Err(master.fail_config());
            }

            let circular = master.config.dma == DmaMode::Circular;
            master.regs.modify_ccr(|w| {
                w.multimode = config.mode;
                w.two_sampling_delay = config.two_sampling_delay;
                if config.mode == Multimode::Independent {
                    w.dma_access = DmaAccessMode::Disabled;
                    w.dma_circular = false;
                } else {
                    w.dma_access = config.dma_access;
                    w.dma_circular = circular;
                }
            });

            #[cfg(feature = "defmt")]
            defmt::debug!("{}: dual mode {}", master.id(), config.mode);
            Ok(())
        })
    }

    /// Start the injected groups of both ADCs, slave first.
    pub fn start_injected(&mut self, notification: Notification) -> Result<(), Error> {
        self.slave.start(Group::Injected, notification)?;
        self.master.start(Group::Injected, notification)
    }

    /// Stop the injected groups of both ADCs, master first.
    pub fn stop_injected(&mut self, notification: Notification) -> Result<(), Error> {
        self.master.stop(Group::Injected, notification)?;
        self.slave.stop(Group::Injected, notification)
    }

    /// The combined regular results of both ADCs.
    pub fn read_value(&self) -> u32 {
        self.master.regs.common_data()
    }

    /// The regular results of master and slave.
    pub fn read_values(&self) -> (u16, u16) {
        let value = self.read_value();
        ((value & 0xFFFF) as u16, (value >> 16) as u16)
    }

    /// The master ADC.
    pub fn master(&self) -> &Adc<RM, TM, DM, CBM> {
        &self.master
    }

    /// The master ADC.
    pub fn master_mut(&mut self) -> &mut Adc<RM, TM, DM, CBM> {
        &mut self.master
    }

    /// The slave ADC.
    pub fn slave(&self) -> &Adc<RS, TS, DS, CBS> {
        &self.slave
    }

    /// The slave ADC.
    pub fn slave_mut(&mut self) -> &mut Adc<RS, TS, DS, CBS> {
        &mut self.slave
    }

    /// Split the pair again.
    pub fn free(self) -> (Adc<RM, TM, DM, CBM>, Adc<RS, TS, DS, CBS>) {
        (self.master, self.slave)
    }
}

impl<RM, TM, DM, CBM, RS, TS, DS, CBS> DualAdc<Adc<RM, TM, DM, CBM>, Adc<RS, TS, DS, CBS>>
where
    RM: Registers,
    TM: TickSource,
    DM: dma::Channel,
    RS: Registers,
    TS: TickSource,
{
    /// Convert the regular groups of both ADCs and move the combined results
    /// from the common data register into `buffer` with the master's DMA.
    ///
    /// # Errors
    ///
    /// The buffer is handed back with
    ///
    /// * [`Error::Busy`] if the master's regular group is converting,
    /// * [`Error::Config`] without DMA channel or in independent mode,
    /// * the error of enabling either ADC or of starting the DMA.
    pub fn start_dma<B>(&mut self, mut buffer: B) -> Result<Transfer<B>, (Error, B)>
    where
        B: WriteBuffer + 'static,
    {
        if self.master.regs.is_converting(Group::Regular) {
            return Err((Error::Busy, buffer));
        }

        // NOTE(unsafe) the buffer is owned by the returned `Transfer` until the
        // transfer is stopped, it is not moved or dropped while the DMA writes.
        let (destination, length) = unsafe {
            let (ptr, len) = buffer.write_buffer();
            (ptr as usize, len)
        };

        let slave = &mut self.slave;
        let master = &mut self.master;
        let result = master
            .locked(|master| {
                if master.dma.is_none() || master.regs.ccr().multimode == Multimode::Independent
                {
                    return Err(master.fail_config());
                }
                master.enable_core()?;
                slave.enable_core()?;
                master.begin(Group::Regular)
            })
            .and_then(|arm| {
                master.regs.listen(Event::Overrun.into());
                let source = master.regs.common_data_address();
                if let Err(e) = master.arm_dma(source, destination, length) {
                    master.abandon_regular_start();
                    if !slave.group_busy(Group::Injected) {
                        slave.switch_off().ok();
                    }
                    return Err(e);
                }
                Ok(arm)
            });

        match result {
            Ok(arm) => {
                if arm {
                    master.regs.start_conversion(Group::Regular);
                }
                Ok(Transfer::new(buffer))
            }
            Err(e) => Err((e, buffer)),
        }
    }

    /// Stop both ADCs and the DMA.
    ///
    /// Every step is attempted even if an earlier one failed, the first error
    /// is returned. DMA failures are flagged with [`State::ErrorDma`], all
    /// others with [`State::ErrorInternal`].
    pub fn stop(&mut self) -> Result<(), Error> {
        let slave = &mut self.slave;
        self.master.locked(|master| {
            let mut result = master.conversion_stop(EnumSet::all());
            keep_first(&mut result, slave.conversion_stop(EnumSet::all()));
            keep_first(
                &mut result,
                master.wait_regular_idle(|| slave.regs.is_converting(Group::Regular)),
            );

            keep_first(&mut result, master.abort_dma());
            master.regs.unlisten(Event::Overrun.into());

            let busy = State::RegularBusy | State::InjectedBusy;
            master.state.remove_all(busy);
            slave.state.remove_all(busy);

            let slave_disabled = slave.disable_core();
            if slave_disabled.is_ok() {
                slave.state.insert(State::Ready);
            }
            keep_first(&mut result, slave_disabled);
            keep_first(&mut result, master.disable_core());

            master.state.insert(State::Ready);
            result
        })
    }

    /// Stop both ADCs and the DMA, and return the buffer.
    ///
    /// See [`DualAdc::stop`].
    pub fn stop_dma<B>(&mut self, transfer: Transfer<B>) -> (B, Result<(), Error>) {
        let result = self.stop();
        (transfer.into_buffer(), result)
    }

    /// Stop the regular groups and the DMA, but keep injected conversions running.
    ///
    /// Each ADC is only disabled if its injected group is idle.
    pub fn stop_regular_dma(&mut self) -> Result<(), Error> {
        let slave = &mut self.slave;
        self.master.locked(|master| {
            let mut result = master.conversion_stop(Group::Regular.into());
            master.state.remove(State::RegularBusy);
            if result.is_err() {
                return result;
            }

            keep_first(
                &mut result,
                master.wait_regular_idle(|| slave.regs.is_converting(Group::Regular)),
            );

            let aborted = master.abort_dma();
            keep_first(&mut result, aborted);
            master.regs.unlisten(Event::Overrun.into());

            if aborted.is_ok() && !master.group_busy(Group::Injected) {
                keep_first(&mut result, master.disable_core());
                if !slave.group_busy(Group::Injected) {
                    keep_first(&mut result, slave.disable_core());
                }
                if result.is_ok() {
                    master.state.insert(State::Ready);
                }
            }
            result
        })
    }
}

impl<RM, TM, DM, CBM, RS, TS, DS, CBS> DualAdc<Adc<RM, TM, DM, CBM>, Adc<RS, TS, DS, CBS>>
where
    RM: Registers,
    TM: TickSource,
    CBM: Callbacks,
    RS: Registers,
    TS: TickSource,
    CBS: Callbacks,
{
    /// Handle the interrupts of both ADCs.
    pub fn irq_handler(&mut self) {
        self.master.irq_handler();
        self.slave.irq_handler();
    }
}

impl<RM, TM, DM, CBM, RS, TS, DS, CBS> DualAdc<Adc<RM, TM, DM, CBM>, Adc<RS, TS, DS, CBS>>
where
    RM: Registers,
    TM: TickSource,
    DM: dma::Channel,
    CBM: Callbacks,
{
    /// Handle the interrupt of the master's DMA channel.
    pub fn dma_irq_handler(&mut self) {
        self.master.dma_irq_handler();
    }
}
