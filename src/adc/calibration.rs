//! Self calibration

use super::config::InputMode;
use super::{Adc, Error, Group, Registers, State};
use crate::time::{cycles_for_micros, Hertz, TickSource};

/// Largest value accepted by [`Adc::set_calibration_factor`].
pub const MAX_CALIBRATION_FACTOR: u8 = 0x7F;

/// Worst case calibration time at the slowest ADC clock and widest prescaler.
const CALIBRATION_TIMEOUT_US: u32 = 1_320_000;

/// Number of polling iterations a calibration may take at `sysclk`.
pub fn calibration_timeout_loops(sysclk: Hertz) -> u32 {
    cycles_for_micros(sysclk, CALIBRATION_TIMEOUT_US)
}

impl<R, T, D, CB> Adc<R, T, D, CB>
where
    R: Registers,
    T: TickSource,
{
    /// Run the self calibration for `mode` inputs.
    ///
    /// The ADC is disabled first, which fails if a conversion is ongoing. A
    /// calibration which does not finish in time leaves the ADC in
    /// [`State::ErrorInternal`] and is not retried.
    pub fn calibrate(&mut self, mode: InputMode) -> Result<(), Error> {
        self.locked(|adc| {
            adc.disable_core()?;

            adc.update_state(
                State::RegularBusy | State::InjectedBusy | State::Ready,
                State::Calibrating,
            );
            adc.regs.start_calibration(mode);

            let mut budget = calibration_timeout_loops(adc.config.clock());
            while adc.regs.is_calibrating() {
                if budget == 0 {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("{}: calibration timed out", adc.id());
                    adc.state.remove(State::Calibrating);
                    return Err(adc.fail_timeout());
                }
                budget -= 1;
            }

            adc.update_state(State::Calibrating, State::Ready);

            #[cfg(feature = "defmt")]
            defmt::debug!(
                "{}: calibrated, factor {=u8}",
                adc.id(),
                adc.regs.calibration_factor(mode)
            );
            Ok(())
        })
    }

    /// The calibration factor in use for `mode` inputs.
    pub fn calibration_factor(&self, mode: InputMode) -> u8 {
        self.regs.calibration_factor(mode)
    }

    /// Overwrite the calibration factor for `mode` inputs.
    ///
    /// The ADC has to be enabled with both groups idle, and `factor` must not
    /// exceed [`MAX_CALIBRATION_FACTOR`].
    pub fn set_calibration_factor(&mut self, mode: InputMode, factor: u8) -> Result<(), Error> {
        self.locked(|adc| {
            if factor > MAX_CALIBRATION_FACTOR
                || !adc.regs.is_enabled()
                || adc.regs.is_converting(Group::Regular)
                || adc.regs.is_converting(Group::Injected)
            {
                return Err(adc.fail_config());
            }
            adc.regs.set_calibration_factor(mode, factor);
            Ok(())
        })
    }
}
