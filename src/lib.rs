/*!
 # Conversion group control for STM32 ADCs

   This crate drives the conversion-group state machine of the STM32 ADC family
   which exposes a *regular* and an *injected* group on one shared converter:

   *   enabling and disabling the analog core
   *   self calibration and calibration factor access
   *   the injected context queue (two contexts deep)
   *   start / stop / poll / interrupt handling for both groups
   *   dual ADC ("multimode") master / slave coordination
   *   bulk data transfer via DMA, including linked-list DMA

   Register access is not done directly. Instead an implementation of
   [`adc::Registers`] is handed to [`adc::Adc::new`], together with a
   millisecond [`time::TickSource`] and optionally a [`dma::Channel`].
   This keeps the state machine independent of the concrete device crate.

   ```ignore
   use stm32_adc_groups::adc::{config::Config, Adc, Group, Notification};

   let mut adc = Adc::new(regs, ticks, Config::default());
   adc.calibrate(InputMode::SingleEnded)?;
   adc.start(Group::Injected, Notification::Polling)?;
   adc.poll_for_conversion(Group::Injected, Milliseconds(10))?;
   let value = adc.read_injected(InjectedRank::One);
   ```
*/
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use nb;
pub use nb::block;

pub mod adc;
pub mod dma;
pub mod time;

/// Error type returned when a raw integer has no matching enum variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TryFromIntError;
