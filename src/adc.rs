//! # Analog to Digital Converter
//!
//! ## Conversion groups
//!
//! Every ADC converts two groups of channels on one shared converter:
//!
//! * the **regular** group, a sequence of up to 16 channels with a single data register,
//!   optionally drained by DMA, and
//! * the **injected** group, a sequence of up to 4 channels with one data register per rank
//!   which preempts the regular group when triggered.
//!
//! [`Adc::start`], [`Adc::stop`] and [`Adc::poll_for_conversion`] take the [`Group`] to
//! act on, so the same code path drives both. Completion is either polled or signalled
//! through [`Adc::irq_handler`], which forwards to [`Callbacks`].
//!
//! ## Status
//!
//! [`Adc::state`] returns the current [`State`] flags, [`Adc::error_code`] the
//! [`ErrorCode`] flags collected since the last start. Every failed operation leaves a
//! trace in at least one of them.
//!
//! ## Dual mode
//!
//! Two instances listed in [`PAIRS`] can be combined into a [`DualAdc`], which starts
//! and stops both in the order the hardware requires.

use enumset::{EnumSet, EnumSetType};

use crate::dma::{self, NoDma};
use crate::time::TickSource;

pub mod config;
pub mod regs;

mod calibration;
mod conversion;
mod injected;
mod lock;
mod multimode;
mod power;
mod transfer;

pub use calibration::{calibration_timeout_loops, MAX_CALIBRATION_FACTOR};
pub use multimode::DualAdc;
pub use regs::{Ccr, Cfgr, InjectedContext, Registers};
pub use transfer::Transfer;

use config::{Config, DmaMode, Multimode};
use lock::Lock;

/// ADC instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum InstanceId {
    Adc1,
    Adc2,
    Adc3,
    Adc4,
}

/// Dual ADC pairs as `(master, slave)`.
pub const PAIRS: [(InstanceId, InstanceId); 2] = [
    (InstanceId::Adc1, InstanceId::Adc2),
    (InstanceId::Adc3, InstanceId::Adc4),
];

impl InstanceId {
    /// Is this instance the master of its pair?
    pub fn is_master(self) -> bool {
        PAIRS.iter().any(|&(master, _)| master == self)
    }

    /// The slave paired with this master.
    pub fn slave(self) -> Option<InstanceId> {
        PAIRS
            .iter()
            .find(|&&(master, _)| master == self)
            .map(|&(_, slave)| slave)
    }

    /// The master of this instance's pair, `self` for masters.
    pub fn master(self) -> InstanceId {
        PAIRS
            .iter()
            .find(|&&(_, slave)| slave == self)
            .map_or(self, |&(master, _)| master)
    }
}

/// Conversion group
#[derive(Debug, EnumSetType)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Group {
    /// Regular group
    Regular,
    /// Injected group
    Injected,
}

impl Group {
    /// The group sharing the converter with this one.
    pub fn other(self) -> Group {
        match self {
            Group::Regular => Group::Injected,
            Group::Injected => Group::Regular,
        }
    }

    pub(crate) fn busy(self) -> State {
        match self {
            Group::Regular => State::RegularBusy,
            Group::Injected => State::InjectedBusy,
        }
    }

    pub(crate) fn end_of_conversion(self) -> State {
        match self {
            Group::Regular => State::RegularEndOfConversion,
            Group::Injected => State::InjectedEndOfConversion,
        }
    }

    pub(crate) fn conversion_event(self) -> Event {
        match self {
            Group::Regular => Event::EndOfConversion,
            Group::Injected => Event::InjectedEndOfConversion,
        }
    }

    pub(crate) fn sequence_event(self) -> Event {
        match self {
            Group::Regular => Event::EndOfSequence,
            Group::Injected => Event::InjectedEndOfSequence,
        }
    }

    pub(crate) fn completion_events(self) -> EnumSet<Event> {
        self.conversion_event() | self.sequence_event()
    }

    /// All interrupts enabled on behalf of this group.
    pub(crate) fn interrupts(self) -> EnumSet<Event> {
        match self {
            Group::Regular => Event::EndOfConversion | Event::EndOfSequence | Event::Overrun,
            Group::Injected => {
                Event::InjectedEndOfConversion
                    | Event::InjectedEndOfSequence
                    | Event::InjectedQueueOverflow
            }
        }
    }

    /// Error codes owned by this group, kept when the other group starts.
    pub(crate) fn error_codes(self) -> EnumSet<ErrorCode> {
        match self {
            Group::Regular => ErrorCode::Overrun | ErrorCode::Dma,
            Group::Injected => EnumSet::only(ErrorCode::InjectedQueueOverflow),
        }
    }
}

/// How the completion of a started group is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// By [`Adc::poll_for_conversion`] or [`Adc::try_conversion`]
    Polling,
    /// By [`Adc::irq_handler`]
    Interrupt,
}

/// ADC interrupt events
#[derive(Debug, EnumSetType)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The ADC is ready to convert (`ADRDY`)
    Ready,
    /// A regular conversion finished (`EOC`)
    EndOfConversion,
    /// The regular sequence finished (`EOS`)
    EndOfSequence,
    /// A regular result was lost (`OVR`)
    Overrun,
    /// An injected conversion finished (`JEOC`)
    InjectedEndOfConversion,
    /// The injected sequence finished (`JEOS`)
    InjectedEndOfSequence,
    /// A third injected context was written while two were queued (`JQOVF`)
    InjectedQueueOverflow,
}

/// Status flags of an [`Adc`]
#[derive(Debug, EnumSetType)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No operation in progress
    Ready,
    /// Calibration in progress
    Calibrating,
    /// The last poll timed out
    Timeout,
    /// A hardware handshake failed or timed out
    ErrorInternal,
    /// A configuration was rejected
    ErrorConfig,
    /// The DMA reported an error or could not be stopped
    ErrorDma,
    /// The regular group is converting
    RegularBusy,
    /// A regular conversion finished
    RegularEndOfConversion,
    /// A regular result was lost
    RegularOverrun,
    /// The injected group is converting
    InjectedBusy,
    /// An injected conversion finished
    InjectedEndOfConversion,
    /// The injected context queue overflowed
    InjectedQueueOverflow,
    /// This instance is started through the master of its pair
    MultimodeSlave,
}

/// Error flags collected since the last start
#[derive(Debug, EnumSetType)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// Hardware handshake failure
    Internal,
    /// Rejected configuration
    Config,
    /// Regular overrun
    Overrun,
    /// Injected context queue overflow
    InjectedQueueOverflow,
    /// DMA transfer error
    Dma,
    /// A bounded wait ran out
    Timeout,
}

/// ADC error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The operation conflicts with a conversion in progress, or the instance is locked
    Busy,
    /// The configuration is invalid, or not allowed in the current state
    Config,
    /// A bounded wait ran out
    Timeout,
    /// A hardware precondition was violated
    Internal,
    /// The DMA failed
    Dma,
    /// The injected context queue overflowed
    QueueOverflow,
    /// A regular result was overwritten before it was read
    Overrun,
}

impl From<dma::Error> for Error {
    fn from(_: dma::Error) -> Self {
        Error::Dma
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Internal => Error::Internal,
            ErrorCode::Config => Error::Config,
            ErrorCode::Overrun => Error::Overrun,
            ErrorCode::InjectedQueueOverflow => Error::QueueOverflow,
            ErrorCode::Dma => Error::Dma,
            ErrorCode::Timeout => Error::Timeout,
        }
    }
}

/// Application hooks called from [`Adc::irq_handler`] and [`Adc::dma_irq_handler`].
///
/// All methods default to doing nothing.
pub trait Callbacks {
    /// The regular group (or a DMA transfer of it) completed.
    fn regular_complete(&mut self, _adc: InstanceId) {}

    /// Half of a DMA transfer of the regular group completed.
    fn regular_half_complete(&mut self, _adc: InstanceId) {}

    /// The injected group completed.
    fn injected_complete(&mut self, _adc: InstanceId) {}

    /// An injected context was lost because the queue was full.
    fn injected_queue_overflow(&mut self, _adc: InstanceId) {}

    /// An overrun or DMA error occurred.
    fn error(&mut self, _adc: InstanceId, _error: Error) {}
}

/// [`Callbacks`] which ignore every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCallbacks;

impl Callbacks for NoCallbacks {}

/// One ADC instance.
///
/// * `R` provides the registers of the instance,
/// * `T` the millisecond ticks for bounded waits,
/// * `D` the DMA channel used by [`Adc::start_dma`],
/// * `CB` the interrupt [`Callbacks`].
pub struct Adc<R, T, D = NoDma, CB = NoCallbacks> {
    regs: R,
    ticks: T,
    dma: Option<D>,
    callbacks: CB,
    config: Config,
    state: EnumSet<State>,
    errors: EnumSet<ErrorCode>,
    injected: injected::ContextBuilder,
    binding: Option<transfer::Binding>,
    lock: Lock,
}

impl<R, T> Adc<R, T>
where
    R: Registers,
    T: TickSource,
{
    /// Take ownership of the ADC registers and apply `config`.
    ///
    /// The ADC is expected to be disabled, as after reset.
    pub fn new(mut regs: R, ticks: T, config: Config) -> Self {
        regs.modify_cfgr(|w| {
            w.resolution = config.resolution;
            w.data_alignment = config.data_alignment;
            w.regular_trigger = config.external_trigger;
            w.continuous = config.conversion.is_continuous();
            w.regular_discontinuous = config.conversion.is_discontinuous();
            w.overrun = config.overrun;
            w.dma = config.dma;
            w.auto_wait = config.low_power_auto_wait;
        });

        Self {
            regs,
            ticks,
            dma: None,
            callbacks: NoCallbacks,
            config,
            state: EnumSet::only(State::Ready),
            errors: EnumSet::new(),
            injected: injected::ContextBuilder::default(),
            binding: None,
            lock: Lock::new(),
        }
    }
}

impl<R, T, D, CB> Adc<R, T, D, CB> {
    /// Bind a DMA channel for [`Adc::start_dma`].
    pub fn with_dma<D2>(self, dma: D2) -> Adc<R, T, D2, CB>
    where
        D2: dma::Channel,
    {
        Adc {
            regs: self.regs,
            ticks: self.ticks,
            dma: Some(dma),
            callbacks: self.callbacks,
            config: self.config,
            state: self.state,
            errors: self.errors,
            injected: self.injected,
            binding: None,
            lock: self.lock,
        }
    }

    /// Install interrupt callbacks.
    pub fn with_callbacks<CB2>(self, callbacks: CB2) -> Adc<R, T, D, CB2>
    where
        CB2: Callbacks,
    {
        Adc {
            regs: self.regs,
            ticks: self.ticks,
            dma: self.dma,
            callbacks,
            config: self.config,
            state: self.state,
            errors: self.errors,
            injected: self.injected,
            binding: self.binding,
            lock: self.lock,
        }
    }

    /// Current status flags.
    pub fn state(&self) -> EnumSet<State> {
        self.state
    }

    /// Error flags collected since the last start.
    pub fn error_code(&self) -> EnumSet<ErrorCode> {
        self.errors
    }

    /// The most severe recorded error, if any.
    pub fn last_error(&self) -> Option<Error> {
        self.errors.iter().next().map(Error::from)
    }

    /// The configuration applied in [`Adc::new`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The installed callbacks.
    pub fn callbacks(&self) -> &CB {
        &self.callbacks
    }

    /// The installed callbacks.
    pub fn callbacks_mut(&mut self) -> &mut CB {
        &mut self.callbacks
    }

    /// Release the registers and the DMA channel.
    pub fn free(self) -> (R, Option<D>) {
        (self.regs, self.dma)
    }

    /// Run `f` with the instance lock held, releasing it on every exit path.
    pub(crate) fn locked<U, F>(&mut self, f: F) -> Result<U, Error>
    where
        F: FnOnce(&mut Self) -> Result<U, Error>,
    {
        self.lock.try_acquire()?;
        let result = f(self);
        self.lock.release();
        result
    }

    pub(crate) fn update_state<C, S>(&mut self, clear: C, set: S)
    where
        C: Into<EnumSet<State>>,
        S: Into<EnumSet<State>>,
    {
        self.state.remove_all(clear.into());
        self.state.insert_all(set.into());
    }

    /// Record a rejected configuration.
    pub(crate) fn fail_config(&mut self) -> Error {
        self.state.insert(State::ErrorConfig);
        self.errors.insert(ErrorCode::Config);
        Error::Config
    }

    /// Record a failed hardware handshake, returning `error`.
    pub(crate) fn fail_internal(&mut self, error: Error) -> Error {
        self.state.insert(State::ErrorInternal);
        self.errors.insert(ErrorCode::Internal);
        error
    }

    /// Record a hardware handshake that did not finish in time.
    pub(crate) fn fail_timeout(&mut self) -> Error {
        self.errors.insert(ErrorCode::Timeout);
        self.fail_internal(Error::Timeout)
    }
}

impl<R, T, D, CB> Adc<R, T, D, CB>
where
    R: Registers,
{
    /// Which instance this is.
    pub fn id(&self) -> InstanceId {
        self.regs.instance()
    }

    /// Is the group converting in hardware or flagged busy?
    pub(crate) fn group_busy(&self, group: Group) -> bool {
        self.regs.is_converting(group) || self.state.contains(group.busy())
    }

    /// Does this instance trigger `group` itself, rather than its master?
    pub(crate) fn triggers(&self, group: Group) -> bool {
        if self.id().is_master() {
            return true;
        }
        let mode = self.regs.ccr().multimode;
        match group {
            Group::Regular => !mode.synchronizes_regular(),
            Group::Injected => !mode.synchronizes_injected(),
        }
    }

    /// Configuration deciding how `group` behaves: the master's for a slave
    /// synchronized on that group.
    pub(crate) fn group_cfgr(&self, group: Group) -> Cfgr {
        if self.triggers(group) {
            self.regs.cfgr()
        } else {
            self.regs.master_cfgr()
        }
    }

    /// Are regular results moved by DMA?
    pub(crate) fn dma_requests_enabled(&self) -> bool {
        let ccr = self.regs.ccr();
        if ccr.multimode == Multimode::Independent {
            self.regs.cfgr().dma != DmaMode::Disabled
        } else {
            ccr.dma_access != config::DmaAccessMode::Disabled
        }
    }

    /// Does the DMA keep running after the last transfer?
    pub(crate) fn dma_circular(&self) -> bool {
        let ccr = self.regs.ccr();
        if ccr.multimode == Multimode::Independent {
            self.regs.cfgr().dma == DmaMode::Circular
        } else {
            ccr.dma_circular
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_table() {
        assert!(InstanceId::Adc1.is_master());
        assert!(!InstanceId::Adc2.is_master());
        assert_eq!(InstanceId::Adc1.slave(), Some(InstanceId::Adc2));
        assert_eq!(InstanceId::Adc2.slave(), None);
        assert_eq!(InstanceId::Adc2.master(), InstanceId::Adc1);
        assert_eq!(InstanceId::Adc4.master(), InstanceId::Adc3);
        assert_eq!(InstanceId::Adc3.master(), InstanceId::Adc3);
    }

    #[test]
    fn group_bits_do_not_overlap() {
        assert_eq!(Group::Regular.other(), Group::Injected);
        assert_ne!(Group::Regular.busy(), Group::Injected.busy());
        assert!(Group::Regular
            .completion_events()
            .is_disjoint(Group::Injected.completion_events()));
        assert!(Group::Regular
            .interrupts()
            .is_superset(Group::Regular.completion_events()));
    }

    #[test]
    fn error_codes_map_to_errors() {
        assert_eq!(Error::from(ErrorCode::InjectedQueueOverflow), Error::QueueOverflow);
        assert_eq!(Error::from(ErrorCode::Dma), Error::Dma);
        assert_eq!(Error::from(dma::Error::Transfer), Error::Dma);
    }
}
