//! Injected group configuration
//!
//! An injected context (trigger, sequence length and up to four channels)
//! enters the hardware queue as a whole, when its register is written. With
//! scan mode enabled a context is assembled over several calls of
//! [`Adc::configure_injected_channel`], one per rank, and only written once
//! the last rank was supplied.
//!
//! Settings shared with the rest of the ADC are only written while the
//! hardware allows it and are skipped otherwise:
//!
//! | Setting | Written while |
//! |---|---|
//! | queue mode, injected discontinuous mode | injected group idle |
//! | auto injection, oversampling, sampling time, offset | both groups idle |
//! | single ended / differential input | ADC disabled |

use super::config::{
    Channel, InjectedChannelConfig, InjectedRank, InputMode, OffsetNumber, SampleTime, Scan,
    Sequence, MAX_OVERSAMPLING_SHIFT,
};
use super::{Adc, Error, Group, InjectedContext, Registers, State};
use crate::time::{cycles_for_micros, delay_cycles, TickSource};

/// Injected context under construction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContextBuilder {
    remaining: u8,
    context: InjectedContext,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            remaining: 0,
            context: InjectedContext::empty(),
        }
    }
}

impl ContextBuilder {
    fn is_building(&self) -> bool {
        self.remaining != 0
    }

    /// Sequence length the next rank is checked against.
    fn length_for(&self, config: &InjectedChannelConfig) -> u8 {
        if self.is_building() {
            self.context.length
        } else {
            config.sequence_length
        }
    }

    /// Add one rank, returning the context once every rank was supplied.
    fn push(&mut self, config: &InjectedChannelConfig) -> Option<InjectedContext> {
        if !self.is_building() {
            self.remaining = config.sequence_length;
            self.context = InjectedContext {
                trigger: config.trigger,
                length: config.sequence_length,
                channels: [Channel::In(0); 4],
            };
        }

        self.context.channels[usize::from(config.rank)] = config.channel;
        self.remaining -= 1;

        if self.is_building() {
            None
        } else {
            Some(self.context)
        }
    }
}

/// Sample time to program for `time`, and whether "sampling time plus" is needed.
fn split_sample_time(time: SampleTime) -> (SampleTime, bool) {
    match time {
        SampleTime::Cycles3C5 => (SampleTime::Cycles2C5, true),
        other => (other, false),
    }
}

impl<R, T, D, CB> Adc<R, T, D, CB>
where
    R: Registers,
    T: TickSource,
{
    /// Is `config` one rank of a context built over several calls?
    ///
    /// A single rank sequence is written right away, even while another
    /// context is being built.
    fn builds_context(&self, config: &InjectedChannelConfig) -> bool {
        self.config.scan == Scan::Enabled && config.sequence_length != 1
    }

    fn validate_injected(&self, config: &InjectedChannelConfig) -> bool {
        let scan = self.builds_context(config);
        let length = self.injected.length_for(config);
        let rank_ok = if scan {
            config.rank.position() <= length
        } else {
            config.rank == InjectedRank::One
        };
        let offset_ok = config.offset.map_or(true, |offset| {
            let bits = 12 - self.config.resolution.offset_shift();
            u32::from(offset.value) < 1 << bits
        });
        let oversampling_ok = config.oversampling.map_or(true, |oversampling| {
            oversampling.right_shift <= MAX_OVERSAMPLING_SHIFT
                && config.offset.map_or(true, |offset| offset.value == 0)
        });

        config.channel.is_valid()
            && (1..=4).contains(&config.sequence_length)
            && rank_ok
            && !(config.auto_injection && config.discontinuous)
            && !(config.auto_injection && self.config.conversion.is_discontinuous())
            && offset_ok
            && oversampling_ok
            && (config.input_mode == InputMode::SingleEnded
                || (!config.channel.is_internal() && config.channel.differential_pair().is_some()))
    }

    /// Configure one rank of the injected group.
    ///
    /// With scan mode enabled and a sequence length `n > 1`, `n` calls (one for
    /// each rank) make up one context, which is only handed to hardware with
    /// the last of them. Settings which can not be changed in the current
    /// state of the ADC are skipped.
    ///
    /// Requesting auto injection together with an external injected trigger
    /// fails with [`Error::Config`], after the remaining settings were applied.
    pub fn configure_injected_channel(
        &mut self,
        config: &InjectedChannelConfig,
    ) -> Result<(), Error> {
        self.locked(|adc| {
            if !adc.validate_injected(config) {
                return Err(adc.fail_config());
            }

            if adc.builds_context(config) {
                if let Some(context) = adc.injected.push(config) {
                    adc.regs.write_injected_context(context);
                }
            } else {
                let mut context = InjectedContext::empty();
                context.trigger = config.trigger;
                context.channels[0] = config.channel;
                adc.regs.write_injected_context(context);
            }

            if !adc.regs.is_converting(Group::Injected) {
                adc.regs.modify_cfgr(|w| {
                    w.injected_queue = config.queue_context;
                    w.injected_discontinuous = !config.auto_injection && config.discontinuous;
                });
            }

            let mut result = Ok(());

            if !adc.regs.is_converting(Group::Regular) && !adc.regs.is_converting(Group::Injected)
            {
                if config.trigger.is_none() {
                    adc.regs
                        .modify_cfgr(|w| w.auto_injection = config.auto_injection);
                } else if config.auto_injection {
                    result = Err(adc.fail_config());
                } else {
                    adc.regs.modify_cfgr(|w| w.auto_injection = false);
                }

                let (time, plus) = split_sample_time(config.sample_time);
                adc.regs.modify_cfgr(|w| {
                    w.injected_oversampling = config.oversampling;
                    w.sampling_time_plus = plus;
                });
                adc.regs.set_sample_time(config.channel, time);

                match config.offset {
                    Some(offset) => {
                        let value =
                            u32::from(offset.value) << adc.config.resolution.offset_shift();
                        adc.regs.set_offset(
                            offset.number,
                            config.channel,
                            value,
                            offset.sign,
                            offset.saturation,
                        );
                    }
                    None => {
                        for &number in OffsetNumber::ALL.iter() {
                            if adc.regs.offset_channel(number) == Some(config.channel) {
                                adc.regs.disable_offset(number);
                            }
                        }
                    }
                }
            }

            if !adc.regs.is_enabled() {
                adc.regs.set_input_mode(config.channel, config.input_mode);
                if config.input_mode == InputMode::Differential {
                    if let Some(pair) = config.channel.differential_pair() {
                        let (time, _) = split_sample_time(config.sample_time);
                        adc.regs.set_sample_time(pair, time);
                    }
                }
            }

            adc.enable_internal_channel(config.channel);

            result
        })
    }

    /// Configure one rank of the regular sequence.
    ///
    /// Fails with [`Error::Config`] while the regular group is converting. The
    /// sampling time is only written while both groups are idle.
    pub fn configure_regular_channel(
        &mut self,
        rank: Sequence,
        channel: Channel,
        sample_time: SampleTime,
    ) -> Result<(), Error> {
        self.locked(|adc| {
            if !channel.is_valid() || adc.regs.is_converting(Group::Regular) {
                return Err(adc.fail_config());
            }
            adc.regs.set_regular_sequence(rank, channel);

            if !adc.regs.is_converting(Group::Injected) {
                let (time, plus) = split_sample_time(sample_time);
                adc.regs.modify_cfgr(|w| w.sampling_time_plus = plus);
                adc.regs.set_sample_time(channel, time);
            }

            adc.enable_internal_channel(channel);
            Ok(())
        })
    }

    /// Set the number of ranks converted by the regular sequence, `1..=16`.
    pub fn set_regular_sequence_length(&mut self, length: u8) -> Result<(), Error> {
        self.locked(|adc| {
            if !(1..=16).contains(&length) || adc.regs.is_converting(Group::Regular) {
                return Err(adc.fail_config());
            }
            adc.regs.set_regular_length(length);
            Ok(())
        })
    }

    /// Let injected contexts queue up, two deep.
    ///
    /// Only possible while no conversion is ongoing.
    pub fn enable_injected_queue(&mut self) -> Result<(), Error> {
        self.locked(|adc| {
            if adc.regs.is_converting(Group::Regular) || adc.regs.is_converting(Group::Injected) {
                return Err(adc.fail_config());
            }
            adc.regs.modify_cfgr(|w| w.injected_queue_disabled = false);
            adc.state.remove(State::InjectedQueueOverflow);
            Ok(())
        })
    }

    /// Disable the injected context queue, the active context is kept.
    ///
    /// Only possible while no conversion is ongoing.
    pub fn disable_injected_queue(&mut self) -> Result<(), Error> {
        self.locked(|adc| {
            if adc.regs.is_converting(Group::Regular) || adc.regs.is_converting(Group::Injected) {
                return Err(adc.fail_config());
            }
            adc.regs.modify_cfgr(|w| w.injected_queue_disabled = true);
            Ok(())
        })
    }

    /// Switch on the measurement path of an internal channel.
    fn enable_internal_channel(&mut self, channel: Channel) {
        if let Some(path) = channel.internal_path() {
            if !self.regs.ccr().internal_paths.contains(path) {
                self.regs.modify_ccr(|w| {
                    w.internal_paths.insert(path);
                });
                delay_cycles(cycles_for_micros(
                    self.config.clock(),
                    path.settling_time_us(),
                ));
            }
        } else if channel == Channel::VddCore {
            self.regs.enable_vddcore();
        }
    }
}
