//! Typed register access consumed by the [`Adc`](`super::Adc`) state machine
//!
//! The state machine never touches memory mapped registers itself. A device
//! crate implements [`Registers`] for one ADC instance, translating the
//! typed views below into bit fields. Reads take `&self` and may have
//! hardware side effects where the reference manual says so (reading an
//! injected data register clears the injected end of conversion flag).

use enumset::EnumSet;

use super::config::{
    Channel, DataAlignment, DmaAccessMode, DmaMode, ExternalTrigger, InjectedRank,
    InjectedTrigger, InputMode, InternalPath, Multimode, OffsetNumber, OffsetSign, OverrunMode,
    Oversampling, Resolution, SampleTime, Sequence,
};
use super::{Event, Group, InstanceId};

/// Typed view of the configuration registers (`CFGR`, `CFGR2`) of one ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cfgr {
    /// `RES`
    pub resolution: Resolution,
    /// `ALIGN`
    pub data_alignment: DataAlignment,
    /// `EXTSEL` / `EXTEN`, `None` for software start
    pub regular_trigger: Option<ExternalTrigger>,
    /// `CONT`
    pub continuous: bool,
    /// `DISCEN`
    pub regular_discontinuous: bool,
    /// `OVRMOD`
    pub overrun: OverrunMode,
    /// `DMAEN` / `DMACFG`
    pub dma: DmaMode,
    /// `AUTDLY`
    pub auto_wait: bool,
    /// `JAUTO`
    pub auto_injection: bool,
    /// `JDISCEN`
    pub injected_discontinuous: bool,
    /// `JQM`
    pub injected_queue: bool,
    /// `JQDIS`
    pub injected_queue_disabled: bool,
    /// `JOVSE` with `OVSR` / `OVSS`
    pub injected_oversampling: Option<Oversampling>,
    /// `SMPPLUS`, turns 2.5 cycles sampling time into 3.5 cycles
    pub sampling_time_plus: bool,
}

impl Default for Cfgr {
    /// Reset value: the injected queue is disabled, everything else is off.
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            data_alignment: DataAlignment::default(),
            regular_trigger: None,
            continuous: false,
            regular_discontinuous: false,
            overrun: OverrunMode::Preserve,
            dma: DmaMode::Disabled,
            auto_wait: false,
            auto_injection: false,
            injected_discontinuous: false,
            injected_queue: false,
            injected_queue_disabled: true,
            injected_oversampling: None,
            sampling_time_plus: false,
        }
    }
}

/// Typed view of the common control register shared by an ADC pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ccr {
    /// `DUAL`
    pub multimode: Multimode,
    /// `MDMA`
    pub dma_access: DmaAccessMode,
    /// `DMACFG`
    pub dma_circular: bool,
    /// `DELAY`, in ADC clock cycles
    pub two_sampling_delay: u8,
    /// `TSEN` / `VREFEN` / `VBATEN`
    pub internal_paths: EnumSet<InternalPath>,
}

impl Default for Ccr {
    fn default() -> Self {
        Self {
            multimode: Multimode::Independent,
            dma_access: DmaAccessMode::Disabled,
            dma_circular: false,
            two_sampling_delay: 1,
            internal_paths: EnumSet::new(),
        }
    }
}

/// One injected context (`JSQR`): trigger, sequence length and the channel
/// of every rank. Written to hardware as a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InjectedContext {
    /// `JEXTSEL` / `JEXTEN`, `None` for software start
    pub trigger: Option<InjectedTrigger>,
    /// `JL + 1`, `1..=4`
    pub length: u8,
    /// `JSQ1..=JSQ4`
    pub channels: [Channel; 4],
}

impl InjectedContext {
    /// A software triggered context converting input 0 once.
    pub const fn empty() -> Self {
        Self {
            trigger: None,
            length: 1,
            channels: [Channel::In(0); 4],
        }
    }

    /// Channel converted at `rank`.
    pub fn channel(&self, rank: InjectedRank) -> Channel {
        self.channels[usize::from(rank)]
    }
}

impl Default for InjectedContext {
    fn default() -> Self {
        Self::empty()
    }
}

/// Register level primitives of one ADC instance.
///
/// The common register block (`CCR`, `CDR`) is shared by both instances of a
/// pair, so both implementations of a pair have to see the same common state.
pub trait Registers {
    /// Which ADC these registers belong to.
    fn instance(&self) -> InstanceId;

    /// `ADEN`
    fn is_enabled(&self) -> bool;
    /// Set `ADEN`.
    fn enable(&mut self);
    /// Set `ADDIS`.
    fn disable(&mut self);
    /// `ADDIS`
    fn is_disabling(&self) -> bool;

    /// Select the calibration input mode and set `ADCAL`.
    fn start_calibration(&mut self, mode: InputMode);
    /// `ADCAL`
    fn is_calibrating(&self) -> bool;
    /// `CALFACT_S` / `CALFACT_D`
    fn calibration_factor(&self, mode: InputMode) -> u8;
    /// Write `CALFACT_S` / `CALFACT_D`.
    fn set_calibration_factor(&mut self, mode: InputMode, factor: u8);

    /// Set `ADSTART` / `JADSTART`.
    fn start_conversion(&mut self, group: Group);
    /// Set `ADSTP` / `JADSTP`.
    fn stop_conversion(&mut self, group: Group);
    /// `ADSTART` / `JADSTART`
    fn is_converting(&self, group: Group) -> bool;

    /// Is the flag of `event` set in `ISR`?
    fn event_occurred(&self, event: Event) -> bool;
    /// Clear the flags of `events`.
    fn clear_events(&mut self, events: EnumSet<Event>);
    /// Enable the interrupts of `events`.
    fn listen(&mut self, events: EnumSet<Event>);
    /// Disable the interrupts of `events`.
    fn unlisten(&mut self, events: EnumSet<Event>);
    /// Is the interrupt of `event` enabled?
    fn is_listening(&self, event: Event) -> bool;

    /// Read the configuration registers.
    fn cfgr(&self) -> Cfgr;
    /// Read-modify-write the configuration registers.
    fn modify_cfgr<F: FnOnce(&mut Cfgr)>(&mut self, f: F);
    /// The configuration of the master of this instance's pair.
    ///
    /// Masters and instances without a pair return their own configuration.
    fn master_cfgr(&self) -> Cfgr {
        self.cfgr()
    }

    /// Read `JSQR`.
    ///
    /// With the context queue active this is the context currently in use.
    fn injected_context(&self) -> InjectedContext;
    /// Write `JSQR`, pushing a context into the queue.
    fn write_injected_context(&mut self, context: InjectedContext);

    /// Assign `channel` to `rank` of the regular sequence.
    fn set_regular_sequence(&mut self, rank: Sequence, channel: Channel);
    /// Number of ranks converted in the regular sequence, `1..=16`.
    fn set_regular_length(&mut self, length: u8);
    /// Sampling time of `channel`.
    fn set_sample_time(&mut self, channel: Channel, time: SampleTime);
    /// `DIFSEL` bit of `channel`.
    fn set_input_mode(&mut self, channel: Channel, mode: InputMode);
    /// Channel an enabled offset slot is applied to.
    fn offset_channel(&self, number: OffsetNumber) -> Option<Channel>;
    /// Program and enable an offset slot. `value` is already aligned to 12 bits.
    fn set_offset(
        &mut self,
        number: OffsetNumber,
        channel: Channel,
        value: u32,
        sign: OffsetSign,
        saturation: bool,
    );
    /// Disable an offset slot.
    fn disable_offset(&mut self, number: OffsetNumber);
    /// Switch on the VddCore measurement channel.
    fn enable_vddcore(&mut self);

    /// Clear `ADVREGEN`.
    fn disable_regulator(&mut self);
    /// Set `DEEPPWD`.
    fn enter_deep_power_down(&mut self);

    /// Regular data register.
    fn regular_data(&self) -> u32;
    /// Injected data register of `rank`.
    fn injected_data(&self, rank: InjectedRank) -> u32;
    /// Bus address of the regular data register, DMA source.
    fn regular_data_address(&self) -> usize;

    /// Read the common control register.
    fn ccr(&self) -> Ccr;
    /// Read-modify-write the common control register.
    fn modify_ccr<F: FnOnce(&mut Ccr)>(&mut self, f: F);
    /// Common regular data register holding both results of a pair.
    fn common_data(&self) -> u32;
    /// Bus address of the common data register, DMA source in dual mode.
    fn common_data_address(&self) -> usize;
    /// Is the other instance of the pair enabled?
    fn paired_enabled(&self) -> bool {
        false
    }
}
