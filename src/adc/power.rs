//! Enabling and disabling the analog core
//!
//! Every start and stop of a group goes through [`Adc::enable_core`] and
//! [`Adc::disable_core`]. Both wait for the hardware handshake with a budget
//! of CPU cycles instead of ticks, so they also work before a tick source runs.

use super::{Adc, Error, Event, Group, Registers};
use crate::time::{cycles_for_micros, TickSource};

/// Upper bound for the `ADRDY` and `ADDIS` handshakes.
const HANDSHAKE_TIMEOUT_US: u32 = 2_000;

impl<R, T, D, CB> Adc<R, T, D, CB>
where
    R: Registers,
    T: TickSource,
{
    /// Switch the analog core on and wait until it is ready.
    ///
    /// Enabling an enabled ADC does nothing.
    pub fn enable(&mut self) -> Result<(), Error> {
        self.locked(Self::enable_core)
    }

    /// Switch the analog core off.
    ///
    /// Fails with [`Error::Busy`] while either group is converting.
    pub fn disable(&mut self) -> Result<(), Error> {
        self.locked(Self::disable_core)
    }

    /// Is the analog core switched on?
    pub fn is_enabled(&self) -> bool {
        self.regs.is_enabled()
    }

    /// Switch off the internal voltage regulator.
    ///
    /// Only allowed while the ADC is disabled.
    pub fn disable_voltage_regulator(&mut self) -> Result<(), Error> {
        self.locked(|adc| {
            if adc.regs.is_enabled() {
                return Err(adc.fail_config());
            }
            adc.regs.disable_regulator();
            Ok(())
        })
    }

    /// Put the ADC into deep power down, losing its calibration.
    ///
    /// Only allowed while the ADC is disabled.
    pub fn enter_deep_power_down(&mut self) -> Result<(), Error> {
        self.locked(|adc| {
            if adc.regs.is_enabled() {
                return Err(adc.fail_config());
            }
            adc.regs.enter_deep_power_down();
            Ok(())
        })
    }

    pub(crate) fn enable_core(&mut self) -> Result<(), Error> {
        if self.regs.is_enabled() {
            return Ok(());
        }

        if self.regs.is_calibrating()
            || self.regs.is_disabling()
            || self.regs.is_converting(Group::Regular)
            || self.regs.is_converting(Group::Injected)
        {
            return Err(self.fail_internal(Error::Internal));
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("{}: enable", self.id());

        self.regs.enable();

        let mut budget = cycles_for_micros(self.config.clock(), HANDSHAKE_TIMEOUT_US);
        while !self.regs.event_occurred(Event::Ready) {
            // The enable request is dropped by hardware while the core wakes up.
            if !self.regs.is_enabled() {
                self.regs.enable();
            }
            if budget == 0 {
                #[cfg(feature = "defmt")]
                defmt::warn!("{}: no ready flag after enable", self.id());
                return Err(self.fail_timeout());
            }
            budget -= 1;
        }
        Ok(())
    }

    pub(crate) fn disable_core(&mut self) -> Result<(), Error> {
        if !self.regs.is_enabled() || self.regs.is_disabling() {
            return Ok(());
        }

        if self.group_busy(Group::Regular) || self.group_busy(Group::Injected) {
            #[cfg(feature = "defmt")]
            defmt::warn!("{}: disable refused, conversion ongoing", self.id());
            return Err(self.fail_internal(Error::Busy));
        }

        self.switch_off()
    }

    /// Disable without looking at the status busy bits.
    ///
    /// The caller makes sure no conversion is ongoing in hardware.
    pub(crate) fn switch_off(&mut self) -> Result<(), Error> {
        if !self.regs.is_enabled() || self.regs.is_disabling() {
            return Ok(());
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("{}: disable", self.id());

        self.regs.disable();
        self.regs.clear_events(Event::Ready.into());

        let mut budget = cycles_for_micros(self.config.clock(), HANDSHAKE_TIMEOUT_US);
        while self.regs.is_enabled() {
            if budget == 0 {
                #[cfg(feature = "defmt")]
                defmt::warn!("{}: still enabled after disable", self.id());
                return Err(self.fail_timeout());
            }
            budget -= 1;
        }
        Ok(())
    }
}
