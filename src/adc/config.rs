//! Provides a [`Config`] for ADC configuration and all configuration options.
//!
//! The `Config` is applied once when creating the [`Adc`]:
//!
//! ```ignore
//! use stm32_adc_groups::adc::{
//!     Adc,
//!     config::{self, Config},
//! };
//!
//! let config = Config::default()
//!     .align(config::DataAlignment::Left)
//!     .resolution(config::Resolution::Eight)
//!     .eoc_selection(config::EocSelection::Sequence);
//!
//! let adc = Adc::new(regs, ticks, config);
//! ```
//!
//! Per channel settings of the injected group are passed with an
//! [`InjectedChannelConfig`], the dual ADC setup with a [`MultimodeConfig`].
//!
//! [`Adc`]: `super::Adc`

use core::convert::TryFrom;

use enumset::EnumSetType;

use crate::time::Hertz;

/// The place in the regular sequence a given channel should be captured.
///
/// # Note
///
/// * In some STM documentations this might also be called "rank".
///
/// # Related functions
///
/// * [`Adc::configure_regular_channel`]
///
/// [`Adc::configure_regular_channel`]: `super::Adc::configure_regular_channel`
#[derive(Debug, PartialEq, PartialOrd, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum Sequence {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Eleven,
    Twelve,
    Thirteen,
    Fourteen,
    Fifteen,
    Sixteen,
}

impl From<Sequence> for u8 {
    fn from(s: Sequence) -> u8 {
        match s {
            Sequence::One => 0,
            Sequence::Two => 1,
            Sequence::Three => 2,
            Sequence::Four => 3,
            Sequence::Five => 4,
            Sequence::Six => 5,
            Sequence::Seven => 6,
            Sequence::Eight => 7,
            Sequence::Nine => 8,
            Sequence::Ten => 9,
            Sequence::Eleven => 10,
            Sequence::Twelve => 11,
            Sequence::Thirteen => 12,
            Sequence::Fourteen => 13,
            Sequence::Fifteen => 14,
            Sequence::Sixteen => 15,
        }
    }
}

impl TryFrom<u8> for Sequence {
    type Error = crate::TryFromIntError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Ok(match bits {
            0 => Sequence::One,
            1 => Sequence::Two,
            2 => Sequence::Three,
            3 => Sequence::Four,
            4 => Sequence::Five,
            5 => Sequence::Six,
            6 => Sequence::Seven,
            7 => Sequence::Eight,
            8 => Sequence::Nine,
            9 => Sequence::Ten,
            10 => Sequence::Eleven,
            11 => Sequence::Twelve,
            12 => Sequence::Thirteen,
            13 => Sequence::Fourteen,
            14 => Sequence::Fifteen,
            15 => Sequence::Sixteen,
            _ => return Err(crate::TryFromIntError),
        })
    }
}

/// The place of a channel in the injected sequence.
///
/// The injected group holds at most four channels, each with its own data register.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum InjectedRank {
    One,
    Two,
    Three,
    Four,
}

impl InjectedRank {
    /// One based position of the rank inside the sequence.
    pub fn position(self) -> u8 {
        u8::from(self) + 1
    }
}

impl From<InjectedRank> for u8 {
    fn from(r: InjectedRank) -> u8 {
        match r {
            InjectedRank::One => 0,
            InjectedRank::Two => 1,
            InjectedRank::Three => 2,
            InjectedRank::Four => 3,
        }
    }
}

impl From<InjectedRank> for usize {
    fn from(r: InjectedRank) -> usize {
        u8::from(r).into()
    }
}

impl TryFrom<u8> for InjectedRank {
    type Error = crate::TryFromIntError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Ok(match bits {
            0 => InjectedRank::One,
            1 => InjectedRank::Two,
            2 => InjectedRank::Three,
            3 => InjectedRank::Four,
            _ => return Err(crate::TryFromIntError),
        })
    }
}

/// The bit width / resolution to sample with the ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// 12-bit
    Twelve,
    /// 10-bit
    Ten,
    /// 8-bit
    Eight,
    /// 6-bit
    Six,
}

impl Resolution {
    /// Left shift applied to an offset value so it lines up with the
    /// 12-bit offset register at this resolution.
    pub fn offset_shift(self) -> u32 {
        match self {
            Resolution::Twelve => 0,
            Resolution::Ten => 2,
            Resolution::Eight => 4,
            Resolution::Six => 6,
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::Twelve
    }
}

/// Possible external triggers which can start a regular conversion instead of
/// doing it manually via [`Adc::start`].
///
/// [`Adc::start`]: `super::Adc::start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExternalTrigger {
    /// Timer 1 CC1 event
    Tim1Cc1(TriggerMode),
    /// Timer 1 CC2 event
    Tim1Cc2(TriggerMode),
    /// Timer 1 CC3 event
    Tim1Cc3(TriggerMode),
    /// Timer 2 CC2 event
    Tim2Cc2(TriggerMode),
    /// Timer 3 TRGO event
    Tim3Trgo(TriggerMode),
    /// EXTI line 11
    Exti11(TriggerMode),
    /// Timer 1 TRGO event
    Tim1Trgo(TriggerMode),
    /// Timer 1 TRGO2 event
    Tim1Trgo2(TriggerMode),
    /// Timer 2 TRGO event
    Tim2Trgo(TriggerMode),
    /// Timer 4 TRGO event
    Tim4Trgo(TriggerMode),
    /// Timer 6 TRGO event
    Tim6Trgo(TriggerMode),
    /// Timer 15 TRGO event
    Tim15Trgo(TriggerMode),
    /// Timer 3 CC4 event
    Tim3Cc4(TriggerMode),
    /// Low power timer 1 output
    Lptim1Out(TriggerMode),
}

impl ExternalTrigger {
    /// The edge(s) the trigger reacts to.
    pub fn mode(self) -> TriggerMode {
        match self {
            ExternalTrigger::Tim1Cc1(n)
            | ExternalTrigger::Tim1Cc2(n)
            | ExternalTrigger::Tim1Cc3(n)
            | ExternalTrigger::Tim2Cc2(n)
            | ExternalTrigger::Tim3Trgo(n)
            | ExternalTrigger::Exti11(n)
            | ExternalTrigger::Tim1Trgo(n)
            | ExternalTrigger::Tim1Trgo2(n)
            | ExternalTrigger::Tim2Trgo(n)
            | ExternalTrigger::Tim4Trgo(n)
            | ExternalTrigger::Tim6Trgo(n)
            | ExternalTrigger::Tim15Trgo(n)
            | ExternalTrigger::Tim3Cc4(n)
            | ExternalTrigger::Lptim1Out(n) => n,
        }
    }
}

/// Possible external triggers of the injected group.
///
/// `None` in an [`InjectedChannelConfig`] means the group is started by software.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InjectedTrigger {
    /// Timer 1 TRGO event
    Tim1Trgo(TriggerMode),
    /// Timer 1 CC4 event
    Tim1Cc4(TriggerMode),
    /// Timer 2 TRGO event
    Tim2Trgo(TriggerMode),
    /// Timer 2 CC1 event
    Tim2Cc1(TriggerMode),
    /// Timer 3 CC4 event
    Tim3Cc4(TriggerMode),
    /// Timer 4 TRGO event
    Tim4Trgo(TriggerMode),
    /// EXTI line 15
    Exti15(TriggerMode),
    /// Timer 8 CC4 event
    Tim8Cc4(TriggerMode),
    /// Timer 1 TRGO2 event
    Tim1Trgo2(TriggerMode),
    /// Timer 8 TRGO event
    Tim8Trgo(TriggerMode),
    /// Timer 3 TRGO event
    Tim3Trgo(TriggerMode),
    /// Timer 6 TRGO event
    Tim6Trgo(TriggerMode),
    /// Timer 15 TRGO event
    Tim15Trgo(TriggerMode),
    /// Low power timer 1 output
    Lptim1Out(TriggerMode),
}

impl InjectedTrigger {
    /// The edge(s) the trigger reacts to.
    pub fn mode(self) -> TriggerMode {
        match self {
            InjectedTrigger::Tim1Trgo(n)
            | InjectedTrigger::Tim1Cc4(n)
            | InjectedTrigger::Tim2Trgo(n)
            | InjectedTrigger::Tim2Cc1(n)
            | InjectedTrigger::Tim3Cc4(n)
            | InjectedTrigger::Tim4Trgo(n)
            | InjectedTrigger::Exti15(n)
            | InjectedTrigger::Tim8Cc4(n)
            | InjectedTrigger::Tim1Trgo2(n)
            | InjectedTrigger::Tim8Trgo(n)
            | InjectedTrigger::Tim3Trgo(n)
            | InjectedTrigger::Tim6Trgo(n)
            | InjectedTrigger::Tim15Trgo(n)
            | InjectedTrigger::Lptim1Out(n) => n,
        }
    }
}

/// Possible trigger modes of the [`ExternalTrigger`] and [`InjectedTrigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerMode {
    /// Listen for rising edges of external trigger
    RisingEdge,
    /// Listen for falling edges of external trigger
    FallingEdge,
    /// Listen for both rising and falling edges of external trigger
    BothEdges,
}

/// Configure the data register alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataAlignment {
    /// Right align output data
    Right,
    /// Left align output data
    Left,
}

impl Default for DataAlignment {
    fn default() -> Self {
        Self::Right
    }
}

/// This mode is used to scan a group of analog channels
///
/// After each end of conversion the next channel of the group is converted automatically.
/// With scan disabled, only rank one of each group is converted and the injected
/// sequencer commits every channel configuration on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scan {
    /// Convert rank one only
    Disabled,
    /// Convert the whole sequence
    Enabled,
}

impl Default for Scan {
    fn default() -> Self {
        Self::Disabled
    }
}

/// Overrun Mode
///
/// This configures the way data overrun is managed, if the data in the
/// data register was not already read from and is about to be overwritten.
///
/// # Note
///
/// Only in [`OverrunMode::Preserve`] (or with DMA enabled) an overrun is
/// treated as an error and reported through the error callback.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverrunMode {
    /// Preserve old data register content when an overrun is detected
    Preserve,
    /// Overwrite data register with the last conversion result
    /// when an overrun is detected.
    Overwrite,
}

impl Default for OverrunMode {
    fn default() -> Self {
        OverrunMode::Preserve
    }
}

/// ADC sampling time
///
/// Each channel can be sampled with a different sample time.
///
/// # Note
///
/// [`SampleTime::Cycles3C5`] is not a per channel setting in hardware. It is
/// programmed as [`SampleTime::Cycles2C5`] plus a common "sampling time plus"
/// switch, which then applies to every channel set to 2.5 cycles.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleTime {
    /// 2.5 ADC clock cycles
    Cycles2C5,
    /// 3.5 ADC clock cycles
    Cycles3C5,
    /// 6.5 ADC clock cycles
    Cycles6C5,
    /// 12.5 ADC clock cycles
    Cycles12C5,
    /// 24.5 ADC clock cycles
    Cycles24C5,
    /// 47.5 ADC clock cycles
    Cycles47C5,
    /// 92.5 ADC clock cycles
    Cycles92C5,
    /// 247.5 ADC clock cycles
    Cycles247C5,
    /// 640.5 ADC clock cycles
    Cycles640C5,
}

impl Default for SampleTime {
    /// [`SampleTime::Cycles2C5`] is also the reset value.
    fn default() -> Self {
        SampleTime::Cycles2C5
    }
}

/// DMA mode
///
/// # Note
///
/// The DMA transfer requests are blocked until the software clears the [`Event::Overrun`] event.
///
/// [`Event::Overrun`]: `super::Event::Overrun`
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaMode {
    /// DMA is disabled.
    Disabled,
    /// In this mode, the ADC generates a DMA transfer request each time a new conversion data
    /// is available and stops generating DMA requests once the DMA has reached the last DMA
    /// transfer (when DMA end of transmission interrupt occurs) even if a conversion
    /// has been started again.
    OneShot,
    /// In this mode, the ADC generates a DMA transfer request each time a new conversion data is
    /// available in the data register, even if the DMA has reached the last DMA transfer. This
    /// allows configuring the DMA in circular mode to handle a continuous analog input data
    /// stream.
    Circular,
}

impl Default for DmaMode {
    fn default() -> Self {
        Self::Disabled
    }
}

/// The conversion mode of the regular group.
///
/// # TLDR
///
/// * [`ConversionMode::Single`] once triggered goes through the whole sequence then stops.
/// * [`ConversionMode::Continuous`] once triggered goes through the whole sequence and repeats
///   that process until actively stopped.
/// * [`ConversionMode::Discontinuous`] once triggered goes through part of the sequence in the
///   specified step width `n + 1` and has to be actively triggered to continue.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum ConversionMode {
    /// The ADC performs all conversions of the sequence once.
    Single,
    /// The ADC repeats the regular sequence until it is stopped.
    ///
    /// # Note
    ///
    /// This mode applies to regular channels only.
    Continuous,
    /// Convert a sub group of `n + 1` conversions (`n` ≤ 7) per trigger.
    ///
    /// # Note
    ///
    /// Can not be combined with auto-injection of the injected group.
    Discontinuous(u8),
}

impl ConversionMode {
    /// Is the regular group restarted automatically after each sequence?
    pub fn is_continuous(self) -> bool {
        matches!(self, ConversionMode::Continuous)
    }

    /// Is the regular sequence split into sub groups?
    pub fn is_discontinuous(self) -> bool {
        matches!(self, ConversionMode::Discontinuous(_))
    }
}

impl Default for ConversionMode {
    fn default() -> Self {
        ConversionMode::Single
    }
}

/// Which completion event finishes a poll or raises the completion interrupt.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EocSelection {
    /// Every single conversion
    SingleConversion,
    /// The end of the whole sequence
    Sequence,
}

impl Default for EocSelection {
    fn default() -> Self {
        EocSelection::SingleConversion
    }
}

/// Input mode of a channel, also selects which calibration factor is used.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    /// Channel measured against ground
    SingleEnded,
    /// Channel measured against its neighbour channel
    Differential,
}

impl Default for InputMode {
    fn default() -> Self {
        InputMode::SingleEnded
    }
}

/// Highest external input channel number.
pub const MAX_INPUT_CHANNEL: u8 = 19;

/// An ADC input channel
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// External input `0..=19`
    In(u8),
    /// Internal temperature sensor
    TempSensor,
    /// Internal voltage reference
    VrefInt,
    /// Backup battery voltage
    Vbat,
    /// Digital core voltage
    VddCore,
}

impl Channel {
    /// Is this one of the internal measurement channels?
    pub fn is_internal(self) -> bool {
        !matches!(self, Channel::In(_))
    }

    /// The shared measurement path this channel needs switched on, if any.
    pub fn internal_path(self) -> Option<InternalPath> {
        match self {
            Channel::TempSensor => Some(InternalPath::TempSensor),
            Channel::VrefInt => Some(InternalPath::VrefInt),
            Channel::Vbat => Some(InternalPath::Vbat),
            Channel::In(_) | Channel::VddCore => None,
        }
    }

    /// The negative input of a differential pair on this channel.
    pub fn differential_pair(self) -> Option<Channel> {
        match self {
            Channel::In(n) if n < MAX_INPUT_CHANNEL => Some(Channel::In(n + 1)),
            _ => None,
        }
    }

    pub(crate) fn is_valid(self) -> bool {
        match self {
            Channel::In(n) => n <= MAX_INPUT_CHANNEL,
            _ => true,
        }
    }
}

/// Measurement paths shared by both ADCs of a pair.
#[derive(Debug, EnumSetType)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InternalPath {
    /// Temperature sensor
    TempSensor,
    /// Internal voltage reference
    VrefInt,
    /// Battery voltage divider
    Vbat,
}

impl InternalPath {
    /// Settling time in microseconds after switching the path on.
    pub fn settling_time_us(self) -> u32 {
        // Every path is treated with the temperature sensor stabilization time,
        // which is the longest of the three.
        15
    }
}

/// One of the four offset slots.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum OffsetNumber {
    One,
    Two,
    Three,
    Four,
}

impl OffsetNumber {
    /// All offset slots.
    pub const ALL: [OffsetNumber; 4] = [
        OffsetNumber::One,
        OffsetNumber::Two,
        OffsetNumber::Three,
        OffsetNumber::Four,
    ];
}

/// Direction an offset is applied in.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OffsetSign {
    /// Subtract the offset from the raw result
    Negative,
    /// Add the offset to the raw result
    Positive,
}

impl Default for OffsetSign {
    fn default() -> Self {
        OffsetSign::Negative
    }
}

/// Offset correction applied to one channel.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Offset {
    /// Which of the four offset slots to use
    pub number: OffsetNumber,
    /// Offset at the configured resolution
    pub value: u16,
    /// Add or subtract
    pub sign: OffsetSign,
    /// Saturate the corrected value instead of wrapping
    pub saturation: bool,
}

/// Oversampling ratio
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum OversamplingRatio {
    X2,
    X4,
    X8,
    X16,
    X32,
    X64,
    X128,
    X256,
}

/// Oversampling of the injected group.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Oversampling {
    /// Number of samples accumulated per result
    pub ratio: OversamplingRatio,
    /// Right shift applied to the accumulated value, `0..=8`
    pub right_shift: u8,
}

/// Highest right shift supported by the oversampler.
pub const MAX_OVERSAMPLING_SHIFT: u8 = 8;

/// Configuration of one rank of the injected group.
///
/// The sequence length and the trigger of a context are taken from the first
/// configuration of that context. The other group wide fields are applied by
/// every call while the groups are idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct InjectedChannelConfig {
    /// The channel to convert
    pub channel: Channel,
    /// Position in the injected sequence
    pub rank: InjectedRank,
    /// Sampling time of the channel
    pub sample_time: SampleTime,
    /// Single ended or differential input
    pub input_mode: InputMode,
    /// Optional offset correction
    pub offset: Option<Offset>,
    /// Number of ranks in the sequence, `1..=4`
    pub sequence_length: u8,
    /// Convert one rank per trigger
    pub discontinuous: bool,
    /// Start the injected sequence automatically after the regular one
    pub auto_injection: bool,
    /// Keep injected contexts queued, instead of reusing the last one
    pub queue_context: bool,
    /// External trigger, `None` for software start
    pub trigger: Option<InjectedTrigger>,
    /// Oversampling of the injected group
    pub oversampling: Option<Oversampling>,
}

impl InjectedChannelConfig {
    /// Configuration for a single software triggered conversion of `channel`.
    pub fn new(channel: Channel, rank: InjectedRank) -> Self {
        Self {
            channel,
            rank,
            sample_time: SampleTime::default(),
            input_mode: InputMode::default(),
            offset: None,
            sequence_length: 1,
            discontinuous: false,
            auto_injection: false,
            queue_context: false,
            trigger: None,
            oversampling: None,
        }
    }

    /// Set the sampling time
    pub fn sample_time(mut self, sample_time: SampleTime) -> Self {
        self.sample_time = sample_time;
        self
    }

    /// Set the input mode
    pub fn input_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = mode;
        self
    }

    /// Set the offset correction
    pub fn offset(mut self, offset: Option<Offset>) -> Self {
        self.offset = offset;
        self
    }

    /// Set the number of ranks in the sequence
    pub fn sequence_length(mut self, length: u8) -> Self {
        self.sequence_length = length;
        self
    }

    /// Enable discontinuous mode
    pub fn discontinuous(mut self, enable: bool) -> Self {
        self.discontinuous = enable;
        self
    }

    /// Enable auto injection
    pub fn auto_injection(mut self, enable: bool) -> Self {
        self.auto_injection = enable;
        self
    }

    /// Enable the context queue
    pub fn queue_context(mut self, enable: bool) -> Self {
        self.queue_context = enable;
        self
    }

    /// Set the external trigger
    pub fn trigger(mut self, trigger: Option<InjectedTrigger>) -> Self {
        self.trigger = trigger;
        self
    }

    /// Set the oversampling
    pub fn oversampling(mut self, oversampling: Option<Oversampling>) -> Self {
        self.oversampling = oversampling;
        self
    }
}

/// Dual ADC mode
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Multimode {
    /// Both ADCs work on their own
    Independent,
    /// Regular simultaneous and injected simultaneous
    RegularSimultaneousInjectedSimultaneous,
    /// Regular simultaneous and alternate trigger
    RegularSimultaneousAlternateTrigger,
    /// Interleaved and injected simultaneous
    InterleavedInjectedSimultaneous,
    /// Injected simultaneous only
    InjectedSimultaneous,
    /// Regular simultaneous only
    RegularSimultaneous,
    /// Interleaved only
    Interleaved,
    /// Alternate trigger only
    AlternateTrigger,
}

impl Multimode {
    /// Are the injected groups of master and slave started together?
    pub fn synchronizes_injected(self) -> bool {
        !matches!(
            self,
            Multimode::Independent | Multimode::RegularSimultaneous | Multimode::Interleaved
        )
    }

    /// Are the regular groups of master and slave started together?
    pub fn synchronizes_regular(self) -> bool {
        !matches!(
            self,
            Multimode::Independent | Multimode::InjectedSimultaneous | Multimode::AlternateTrigger
        )
    }
}

impl Default for Multimode {
    fn default() -> Self {
        Multimode::Independent
    }
}

/// How the combined regular results are packed for DMA in dual mode.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaAccessMode {
    /// Each ADC uses its own DMA request
    Disabled,
    /// One request per pair of 12 or 10 bit results
    TwelveTenBits,
    /// One request per pair of 8 or 6 bit results
    EightSixBits,
}

impl Default for DmaAccessMode {
    fn default() -> Self {
        DmaAccessMode::Disabled
    }
}

/// Delay between two sampling phases in interleaved mode, in ADC clock cycles.
pub const MAX_TWO_SAMPLING_DELAY: u8 = 12;

/// Configuration of a dual ADC pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MultimodeConfig {
    /// The dual mode
    pub mode: Multimode,
    /// DMA packing of the common data register
    pub dma_access: DmaAccessMode,
    /// Delay between the sampling phases, `1..=12` cycles
    pub two_sampling_delay: u8,
}

impl Default for MultimodeConfig {
    fn default() -> Self {
        Self {
            mode: Multimode::Independent,
            dma_access: DmaAccessMode::Disabled,
            two_sampling_delay: 1,
        }
    }
}

impl MultimodeConfig {
    /// Set the dual mode
    pub fn mode(mut self, mode: Multimode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the DMA access mode
    pub fn dma_access(mut self, dma_access: DmaAccessMode) -> Self {
        self.dma_access = dma_access;
        self
    }

    /// Set the delay between two sampling phases
    pub fn two_sampling_delay(mut self, cycles: u8) -> Self {
        self.two_sampling_delay = cycles;
        self
    }
}

/// Default system clock after reset (HSI, 64 MHz).
pub const DEFAULT_SYSCLK_HZ: u32 = 64_000_000;

/// Configuration for the ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct Config {
    /// The bit-width resolution of the peripheral.
    pub resolution: Resolution,
    /// The data alignment in the data register.
    pub data_alignment: DataAlignment,
    /// The scan mode on how a conversion sequence is being progressed.
    pub scan: Scan,
    /// The mode, how to handle overrun scenarios of the data register.
    pub overrun: OverrunMode,
    /// The external trigger, which can start a conversion automatically.
    pub external_trigger: Option<ExternalTrigger>,
    /// The conversion mode, which will determined how a conversion sequence is progressed.
    pub conversion: ConversionMode,
    /// Disables or enables the DMA for the peripheral, and configured how the DMA
    /// is reading from the ADC data register.
    pub dma: DmaMode,
    /// Which event completes a poll or raises the completion interrupt.
    pub eoc_selection: EocSelection,
    /// Wait with the next conversion until the previous result was read.
    pub low_power_auto_wait: bool,
    /// CPU clock in Hz, used to size busy waits.
    pub sysclk_hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            data_alignment: DataAlignment::default(),
            scan: Scan::default(),
            overrun: OverrunMode::default(),
            external_trigger: None,
            conversion: ConversionMode::default(),
            dma: DmaMode::default(),
            eoc_selection: EocSelection::default(),
            low_power_auto_wait: false,
            sysclk_hz: DEFAULT_SYSCLK_HZ,
        }
    }
}

impl Config {
    /// Change the resolution
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the align mode
    pub fn align(mut self, align: DataAlignment) -> Self {
        self.data_alignment = align;
        self
    }

    /// Set the scan mode
    pub fn scan(mut self, scan: Scan) -> Self {
        self.scan = scan;
        self
    }

    /// Set the overrun mode
    pub fn overrun_mode(mut self, mode: OverrunMode) -> Self {
        self.overrun = mode;
        self
    }

    /// Set the conversion mode
    pub fn conversion_mode(mut self, mode: ConversionMode) -> Self {
        self.conversion = mode;
        self
    }

    /// Enable external trigger and the trigger source
    pub fn external_trigger(mut self, trigger: Option<ExternalTrigger>) -> Self {
        self.external_trigger = trigger;
        self
    }

    /// Enable DMA and the operation mode, in which DMA will transfer data from the ADC peripheral.
    pub fn dma_mode(mut self, dma: DmaMode) -> Self {
        self.dma = dma;
        self
    }

    /// Select the completion event
    pub fn eoc_selection(mut self, selection: EocSelection) -> Self {
        self.eoc_selection = selection;
        self
    }

    /// Enable low power auto wait
    pub fn low_power_auto_wait(mut self, enable: bool) -> Self {
        self.low_power_auto_wait = enable;
        self
    }

    /// Set the system clock frequency
    pub fn sysclk(mut self, sysclk: Hertz) -> Self {
        self.sysclk_hz = sysclk.0;
        self
    }

    pub(crate) fn clock(&self) -> Hertz {
        Hertz(self.sysclk_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_rank_conversions() {
        for bits in 0..4u8 {
            let rank = InjectedRank::try_from(bits).unwrap();
            assert_eq!(u8::from(rank), bits);
            assert_eq!(rank.position(), bits + 1);
        }
        assert!(InjectedRank::try_from(4).is_err());
    }

    #[test]
    fn sequence_rejects_out_of_range() {
        assert_eq!(Sequence::try_from(15), Ok(Sequence::Sixteen));
        assert!(Sequence::try_from(16).is_err());
    }

    #[test]
    fn differential_pair_is_next_input() {
        assert_eq!(Channel::In(3).differential_pair(), Some(Channel::In(4)));
        assert_eq!(Channel::In(MAX_INPUT_CHANNEL).differential_pair(), None);
        assert_eq!(Channel::VrefInt.differential_pair(), None);
    }

    #[test]
    fn internal_channels() {
        assert!(!Channel::In(0).is_internal());
        assert!(Channel::TempSensor.is_internal());
        assert!(Channel::VddCore.is_internal());
        assert_eq!(Channel::VddCore.internal_path(), None);
    }

    #[test]
    fn multimode_group_synchronization() {
        assert!(!Multimode::Independent.synchronizes_injected());
        assert!(!Multimode::Independent.synchronizes_regular());
        assert!(Multimode::InjectedSimultaneous.synchronizes_injected());
        assert!(!Multimode::InjectedSimultaneous.synchronizes_regular());
        assert!(Multimode::RegularSimultaneous.synchronizes_regular());
        assert!(!Multimode::RegularSimultaneous.synchronizes_injected());
        assert!(Multimode::RegularSimultaneousInjectedSimultaneous.synchronizes_injected());
        assert!(Multimode::RegularSimultaneousInjectedSimultaneous.synchronizes_regular());
    }

    #[test]
    fn offset_shift_follows_resolution() {
        assert_eq!(Resolution::Twelve.offset_shift(), 0);
        assert_eq!(Resolution::Six.offset_shift(), 6);
    }
}
