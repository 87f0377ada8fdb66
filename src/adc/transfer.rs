//! Moving regular results into memory with DMA
//!
//! [`Adc::start_dma`] takes ownership of a buffer for the duration of the
//! transfer and hands back a [`Transfer`], which has to be passed to
//! [`Adc::stop_dma`] to get the buffer back.

use core::convert::TryFrom;

use super::config::DmaMode;
use super::{Adc, Callbacks, Error, ErrorCode, Event, Group, Registers, State};
use crate::dma::{self, TransferMode, WriteBuffer};
use crate::time::TickSource;

use super::conversion::{resolve, Completion};

/// Where the regular results of a running transfer go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Binding {
    pub destination: usize,
    /// Number of results
    pub length: usize,
}

/// A running DMA transfer of regular results into `B`.
#[derive(Debug)]
pub struct Transfer<B> {
    buffer: B,
}

impl<B> Transfer<B> {
    pub(crate) fn new(buffer: B) -> Self {
        Self { buffer }
    }

    pub(crate) fn into_buffer(self) -> B {
        self.buffer
    }
}

/// Patch the head node of a linked-list channel, or program the channel directly.
fn start_transfer<D: dma::Channel>(
    dma: &mut D,
    source: usize,
    destination: usize,
    bytes: u32,
) -> Result<(), Error> {
    match dma.mode() {
        TransferMode::LinkedList => {
            let node = dma.head_node().ok_or(Error::Config)?;
            node.source = source;
            node.destination = destination;
            node.length = bytes;
            dma.start_linked()?;
        }
        TransferMode::Normal => dma.start(source, destination, bytes)?,
    }
    Ok(())
}

impl<R, T, D, CB> Adc<R, T, D, CB>
where
    R: Registers,
    T: TickSource,
    D: dma::Channel,
{
    /// Convert the regular group and store every result in `buffer` by DMA.
    ///
    /// With [`DmaMode::Circular`] the DMA wraps around at the end of the
    /// buffer, otherwise ([`DmaMode::OneShot`] or [`DmaMode::Disabled`]) it
    /// stops there.
    ///
    /// # Errors
    ///
    /// The buffer is handed back with
    ///
    /// * [`Error::Busy`] if the regular group is converting,
    /// * [`Error::Config`] without DMA channel, when the regular groups of a
    ///   pair are synchronized (use [`DualAdc::start_dma`](`super::DualAdc::start_dma`)),
    ///   or for a linked-list channel without head node,
    /// * [`Error::Dma`] if the channel refused the transfer.
    pub fn start_dma<B>(&mut self, mut buffer: B) -> Result<Transfer<B>, (Error, B)>
    where
        B: WriteBuffer + 'static,
    {
        if self.regs.is_converting(Group::Regular) {
            return Err((Error::Busy, buffer));
        }

        // NOTE(unsafe) the buffer is owned by the returned `Transfer` until the
        // transfer is stopped, it is not moved or dropped while the DMA writes.
        let (destination, length) = unsafe {
            let (ptr, len) = buffer.write_buffer();
            (ptr as usize, len)
        };

        let result = self
            .locked(|adc| {
                if adc.dma.is_none() || adc.regs.ccr().multimode.synchronizes_regular() {
                    return Err(adc.fail_config());
                }
                adc.begin(Group::Regular)
            })
            .and_then(|arm| {
                self.regs.listen(Event::Overrun.into());
                let mode = match self.config.dma {
                    DmaMode::Disabled => DmaMode::OneShot,
                    mode => mode,
                };
                self.regs.modify_cfgr(|w| w.dma = mode);

                let source = self.regs.regular_data_address();
                if let Err(e) = self.arm_dma(source, destination, length) {
                    self.regs.modify_cfgr(|w| w.dma = DmaMode::Disabled);
                    self.abandon_regular_start();
                    return Err(e);
                }
                Ok(arm)
            });

        match result {
            Ok(arm) => {
                if arm {
                    self.regs.start_conversion(Group::Regular);
                }
                Ok(Transfer::new(buffer))
            }
            Err(e) => Err((e, buffer)),
        }
    }

    /// Stop the regular group and the DMA, and return the buffer.
    ///
    /// The ADC is disabled unless the injected group is busy. The buffer is
    /// returned in any case, together with the first error.
    pub fn stop_dma<B>(&mut self, transfer: Transfer<B>) -> (B, Result<(), Error>) {
        let result = self.locked(|adc| {
            adc.conversion_stop(Group::Regular.into())?;
            adc.regs.modify_cfgr(|w| w.dma = DmaMode::Disabled);

            let mut result = adc.abort_dma();
            adc.regs.unlisten(Event::Overrun.into());
            adc.state.remove(State::RegularBusy);

            if !adc.group_busy(Group::Injected) {
                let disabled = adc.disable_core();
                if result.is_ok() {
                    result = disabled;
                }
                if result.is_ok() {
                    adc.update_state(State::RegularBusy | State::InjectedBusy, State::Ready);
                }
            }
            result
        });
        (transfer.into_buffer(), result)
    }

    /// Undo the start of the regular group when its DMA could not be armed.
    pub(crate) fn abandon_regular_start(&mut self) {
        self.regs.unlisten(Event::Overrun.into());
        self.state.remove(State::RegularBusy);
        if !self.group_busy(Group::Injected) && self.switch_off().is_ok() {
            self.state.insert(State::Ready);
        }
    }

    /// Start the DMA from `source` into `length` results at `destination`.
    pub(crate) fn arm_dma(
        &mut self,
        source: usize,
        destination: usize,
        length: usize,
    ) -> Result<(), Error> {
        let width = match self.dma.as_ref().map(|dma| dma.source_width()) {
            Some(width) => width,
            None => return Err(self.fail_config()),
        };
        let bytes = match u32::try_from(length)
            .ok()
            .and_then(|n| n.checked_mul(width.bytes()))
        {
            Some(bytes) => bytes,
            None => return Err(self.fail_config()),
        };

        let started = match self.dma.as_mut() {
            Some(dma) => {
                dma.clear_event(dma::Event::Any);
                dma.listen(dma::Event::Any);
                start_transfer(dma, source, destination, bytes)
            }
            None => Err(Error::Config),
        };
        match started {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("{}: DMA of {=u32} bytes started", self.id(), bytes);
                self.binding = Some(Binding {
                    destination,
                    length,
                });
                Ok(())
            }
            Err(Error::Config) => Err(self.fail_config()),
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("{}: DMA refused the transfer", self.id());
                self.state.insert(State::ErrorDma);
                self.errors.insert(ErrorCode::Dma);
                Err(e)
            }
        }
    }

    /// Abort the DMA, which succeeds for an idle channel.
    pub(crate) fn abort_dma(&mut self) -> Result<(), Error> {
        self.binding = None;
        let aborted = match self.dma.as_mut() {
            Some(dma) => {
                dma.unlisten(dma::Event::Any);
                dma.abort()
            }
            None => Ok(()),
        };
        aborted.map_err(|_| {
            self.state.insert(State::ErrorDma);
            self.errors.insert(ErrorCode::Dma);
            Error::Dma
        })
    }
}

impl<R, T, D, CB> Adc<R, T, D, CB>
where
    R: Registers,
    T: TickSource,
    D: dma::Channel,
    CB: Callbacks,
{
    /// Handle the interrupt of the bound DMA channel.
    ///
    /// Reports half and full completion of the buffer as well as transfer
    /// errors to the [`Callbacks`].
    pub fn dma_irq_handler(&mut self) {
        let id = self.id();
        let (half, complete, error) = match self.dma.as_mut() {
            Some(dma) => {
                let events = (
                    dma.event_occurred(dma::Event::HalfTransfer),
                    dma.event_occurred(dma::Event::TransferComplete),
                    dma.event_occurred(dma::Event::TransferError),
                );
                dma.clear_event(dma::Event::Any);
                events
            }
            None => return,
        };

        if half {
            self.callbacks.regular_half_complete(id);
        }

        if complete {
            if self.state.contains(State::ErrorInternal) || self.state.contains(State::ErrorDma) {
                self.callbacks.error(id, Error::Dma);
            } else {
                // Without end of sequence only a circular DMA keeps the group running.
                let more_expected = if self.regs.event_occurred(Event::EndOfSequence) {
                    self.more_expected(Group::Regular)
                } else {
                    self.dma_circular()
                };
                let completion = Completion {
                    end_of_sequence: true,
                    more_expected,
                    queue_armed: false,
                    still_converting: false,
                };
                let outcome = resolve(self.state, Group::Regular, completion);
                self.apply(outcome);
                if outcome.finished {
                    self.binding = None;
                }
                self.callbacks.regular_complete(id);
            }
        }

        if error {
            #[cfg(feature = "defmt")]
            defmt::warn!("{}: DMA transfer error", id);
            self.binding = None;
            self.state.insert(State::ErrorDma);
            self.errors.insert(ErrorCode::Dma);
            self.callbacks.error(id, Error::Dma);
        }
    }

    /// Destination address and number of results of the running transfer.
    pub fn dma_target(&self) -> Option<(usize, usize)> {
        self.binding
            .map(|binding| (binding.destination, binding.length))
    }
}
