//! Starting, stopping and completing conversions of either group

use enumset::EnumSet;

use super::config::{EocSelection, InjectedRank, OverrunMode};
use super::{
    Adc, Callbacks, Error, ErrorCode, Event, Group, Notification, Registers, State,
};
use crate::time::{Instant, Milliseconds, TickSource};

/// Upper bound for the hardware to confirm a conversion stop.
pub(crate) const STOP_CONVERSION_TIMEOUT: Milliseconds = Milliseconds(5);

/// Polling iterations to wait for the end of an auto injected sequence
/// before the regular group may be stopped in continuous auto wait mode.
const AUTO_INJECTION_STOP_LOOPS: u32 = 4 * 167_168;

/// What is known about a group when one of its completion events fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Completion {
    /// The sequence flag of the group is set
    pub end_of_sequence: bool,
    /// Further conversions follow by trigger, continuous mode or auto injection
    pub more_expected: bool,
    /// Injected contexts are kept queued, the group stays armed
    pub queue_armed: bool,
    /// The hardware still reports the group converting
    pub still_converting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub state: EnumSet<State>,
    /// The group is done and left busy
    pub finished: bool,
    /// The hardware disagrees with a finished sequence
    pub fault: bool,
}

/// Status after a completion event of `group`.
///
/// Shared by polling, the ADC interrupt and the DMA completion.
pub(crate) fn resolve(mut state: EnumSet<State>, group: Group, completion: Completion) -> Outcome {
    state.insert(group.end_of_conversion());

    let done =
        completion.end_of_sequence && !completion.more_expected && !completion.queue_armed;
    if !done {
        return Outcome {
            state,
            finished: false,
            fault: false,
        };
    }

    // A regular sequence which ends while the hardware still converts is a
    // fault, an injected group stays busy until the hardware is idle.
    if completion.still_converting {
        let fault = group == Group::Regular;
        if fault {
            state.insert(State::ErrorInternal);
        }
        return Outcome {
            state,
            finished: false,
            fault,
        };
    }

    state.remove(group.busy());
    if !state.contains(group.other().busy()) {
        state.insert(State::Ready);
    }
    Outcome {
        state,
        finished: true,
        fault: false,
    }
}

impl<R, T, D, CB> Adc<R, T, D, CB>
where
    R: Registers,
    T: TickSource,
{
    /// Start a conversion of `group`.
    ///
    /// The ADC is enabled if needed. Software triggered groups start right
    /// away, externally triggered ones wait for their trigger. With
    /// [`Notification::Interrupt`] the completion interrupts selected by
    /// [`EocSelection`] are enabled as well.
    ///
    /// A slave synchronized with its master on `group` is only prepared, and
    /// marked [`State::MultimodeSlave`]; the conversion is started through the
    /// master. Use [`DualAdc`](`super::DualAdc`) to get the order right.
    ///
    /// # Errors
    ///
    /// * [`Error::Busy`] if `group` is already converting
    /// * [`Error::Config`] for an injected group without external trigger
    ///   while the context queue is enabled, which would never start, or for
    ///   a master synchronizing injected conversions with a disabled slave
    pub fn start(&mut self, group: Group, notification: Notification) -> Result<(), Error> {
        if self.regs.is_converting(group) {
            return Err(Error::Busy);
        }

        let arm = self.locked(|adc| adc.begin(group))?;

        if notification == Notification::Interrupt {
            self.listen_completion(group);
        }
        if arm {
            self.regs.start_conversion(group);
        }
        Ok(())
    }

    /// Stop `group` and disable the ADC unless the other group is converting.
    ///
    /// Stopping the regular group also stops an auto injected group.
    pub fn stop(&mut self, group: Group, notification: Notification) -> Result<(), Error> {
        self.locked(|adc| {
            let mut groups = EnumSet::only(group);
            if group == Group::Regular && adc.group_cfgr(group).auto_injection {
                groups.insert(Group::Injected);
            }

            adc.conversion_stop(groups)?;

            if notification == Notification::Interrupt {
                for g in groups.iter() {
                    adc.regs.unlisten(g.interrupts());
                }
            }

            if adc.regs.is_converting(group.other()) {
                for g in groups.iter() {
                    adc.state.remove(g.busy());
                }
                return Ok(());
            }

            adc.switch_off()?;
            adc.update_state(State::RegularBusy | State::InjectedBusy, State::Ready);
            Ok(())
        })
    }

    /// Wait for the completion of `group`.
    ///
    /// Waits for the end of the sequence or of a single conversion, depending
    /// on [`EocSelection`]. A `timeout` of zero checks once,
    /// [`MAX_DELAY`](`crate::time::MAX_DELAY`) waits forever.
    ///
    /// # Errors
    ///
    /// * [`Error::Timeout`] when the event did not occur in time
    /// * [`Error::Config`] when polling single regular conversions while DMA
    ///   requests are enabled, the DMA reads the data first
    pub fn poll_for_conversion(&mut self, group: Group, timeout: Milliseconds) -> Result<(), Error> {
        let event = self.completion_event(group)?;

        let start = Instant::now(&self.ticks);
        while !self.regs.event_occurred(event) {
            // Check again, the expiry might be due to preemption.
            if start.expired(&self.ticks, timeout) && !self.regs.event_occurred(event) {
                #[cfg(feature = "defmt")]
                defmt::warn!("{}: {} conversion timed out", self.id(), group);
                self.state.insert(State::Timeout);
                self.errors.insert(ErrorCode::Timeout);
                return Err(Error::Timeout);
            }
        }

        self.complete_polled(group, event);
        Ok(())
    }

    /// Check once whether `group` completed.
    pub fn try_conversion(&mut self, group: Group) -> nb::Result<(), Error> {
        let event = self.completion_event(group)?;
        if !self.regs.event_occurred(event) {
            return Err(nb::Error::WouldBlock);
        }
        self.complete_polled(group, event);
        Ok(())
    }

    /// Latest result of the regular group.
    pub fn read_regular(&self) -> u32 {
        self.regs.regular_data()
    }

    /// Result of the injected group at `rank`.
    ///
    /// Reading clears the single conversion flag, the sequence flag is left
    /// alone.
    pub fn read_injected(&self, rank: InjectedRank) -> u32 {
        self.regs.injected_data(rank)
    }

    /// Enable the ADC and update the status for a start of `group`.
    ///
    /// Returns whether this instance has to trigger the conversion itself.
    pub(crate) fn begin(&mut self, group: Group) -> Result<bool, Error> {
        if group == Group::Injected {
            if self.regs.injected_context().trigger.is_none()
                && !self.regs.cfgr().injected_queue_disabled
            {
                return Err(self.fail_config());
            }
            if self.id().is_master()
                && self.regs.ccr().multimode.synchronizes_injected()
                && !self.regs.paired_enabled()
            {
                return Err(self.fail_config());
            }
        }

        self.enable_core()?;

        if self.state.contains(group.other().busy()) {
            self.errors.remove_all(group.error_codes());
        } else {
            self.errors.clear();
        }

        let mut clear = State::Ready | group.end_of_conversion();
        if group == Group::Regular {
            clear |= State::RegularOverrun;
        }
        self.update_state(clear, group.busy());

        let triggers = self.triggers(group);
        if triggers {
            self.state.remove(State::MultimodeSlave);
        }

        let mut stale = group.completion_events();
        if group == Group::Regular {
            stale |= Event::Overrun;
        }
        self.regs.clear_events(stale);

        let auto_injection = self.group_cfgr(group).auto_injection;
        if group == Group::Regular && auto_injection {
            self.update_state(State::InjectedEndOfConversion, State::InjectedBusy);
        }

        if !triggers {
            self.state.insert(State::MultimodeSlave);
            return Ok(false);
        }
        Ok(group == Group::Regular || !auto_injection)
    }

    fn listen_completion(&mut self, group: Group) {
        let cfgr = self.group_cfgr(group);
        let sequence = self.config.eoc_selection == EocSelection::Sequence;
        let pick = |g: Group| {
            if sequence {
                g.sequence_event()
            } else {
                g.conversion_event()
            }
        };

        let mut events = EnumSet::only(pick(group));
        match group {
            Group::Regular => {
                if self.regs.cfgr().overrun == OverrunMode::Preserve {
                    events |= Event::Overrun;
                }
                if cfgr.auto_injection {
                    events |= pick(Group::Injected);
                    if cfgr.injected_queue {
                        events |= Event::InjectedQueueOverflow;
                    }
                }
            }
            Group::Injected => {
                if cfgr.injected_queue {
                    events |= Event::InjectedQueueOverflow;
                }
            }
        }

        self.regs.unlisten(group.interrupts());
        self.regs.listen(events);
    }

    /// Event ending a poll of `group`.
    fn completion_event(&mut self, group: Group) -> Result<Event, Error> {
        if self.config.eoc_selection == EocSelection::Sequence {
            return Ok(group.sequence_event());
        }
        if group == Group::Regular && self.dma_requests_enabled() {
            return Err(self.fail_config());
        }
        Ok(group.conversion_event())
    }

    /// Are further conversions of `group` expected without software action?
    pub(crate) fn more_expected(&self, group: Group) -> bool {
        let own = self.regs.cfgr();
        let cfgr = self.group_cfgr(group);
        let regular_once = own.regular_trigger.is_none() && !cfgr.continuous;
        match group {
            Group::Regular => !regular_once,
            Group::Injected => {
                let injected_software = self.regs.injected_context().trigger.is_none();
                !(injected_software || (!cfgr.auto_injection && regular_once))
            }
        }
    }

    fn completion(&self, group: Group, still_converting: bool) -> Completion {
        Completion {
            end_of_sequence: self.regs.event_occurred(group.sequence_event()),
            more_expected: self.more_expected(group),
            queue_armed: group == Group::Injected && self.group_cfgr(group).injected_queue,
            still_converting,
        }
    }

    pub(crate) fn apply(&mut self, outcome: Outcome) {
        self.state = outcome.state;
        if outcome.fault {
            self.errors.insert(ErrorCode::Internal);
        }
    }

    fn complete_polled(&mut self, group: Group, event: Event) {
        let outcome = resolve(self.state, group, self.completion(group, false));
        self.apply(outcome);

        let auto_wait = self.group_cfgr(group).auto_wait;
        let polled_sequence = event == group.sequence_event();
        let clear = match group {
            Group::Injected if polled_sequence && auto_wait => EnumSet::new(),
            Group::Injected if polled_sequence => group.completion_events(),
            Group::Injected => EnumSet::only(group.conversion_event()),
            Group::Regular if polled_sequence => EnumSet::only(group.sequence_event()),
            Group::Regular if auto_wait => EnumSet::new(),
            Group::Regular => group.completion_events(),
        };
        self.regs.clear_events(clear);
    }

    /// Stop the ongoing conversions of `groups` and wait until the hardware
    /// confirms.
    pub(crate) fn conversion_stop(&mut self, groups: EnumSet<Group>) -> Result<(), Error> {
        if !groups.iter().any(|g| self.regs.is_converting(g)) {
            return Ok(());
        }

        let mut groups = groups;
        let cfgr = self.regs.cfgr();
        if cfgr.auto_injection && cfgr.continuous && cfgr.auto_wait {
            // The injected sequence has to finish before the regular group can be stopped.
            groups = EnumSet::only(Group::Regular);
            let mut budget = AUTO_INJECTION_STOP_LOOPS;
            while !self.regs.event_occurred(Event::InjectedEndOfSequence) {
                if budget == 0 {
                    return Err(self.fail_timeout());
                }
                budget -= 1;
            }
            self.regs
                .clear_events(Event::InjectedEndOfSequence.into());
        }

        for group in groups.iter() {
            if self.regs.is_converting(group) && !self.regs.is_disabling() {
                self.regs.stop_conversion(group);
            }
        }

        let start = Instant::now(&self.ticks);
        while groups.iter().any(|g| self.regs.is_converting(g)) {
            if start.expired(&self.ticks, STOP_CONVERSION_TIMEOUT)
                && groups.iter().any(|g| self.regs.is_converting(g))
            {
                #[cfg(feature = "defmt")]
                defmt::warn!("{}: conversion did not stop", self.id());
                return Err(self.fail_timeout());
            }
        }
        Ok(())
    }
}

impl<R, T, D, CB> Adc<R, T, D, CB>
where
    R: Registers,
    T: TickSource,
    CB: Callbacks,
{
    /// Handle the ADC interrupt.
    ///
    /// Call this from the interrupt handler of the ADC. Every event is
    /// reported to the [`Callbacks`] at most once and then cleared.
    pub fn irq_handler(&mut self) {
        let id = self.id();

        for group in EnumSet::<Group>::all().iter() {
            let fired = group
                .completion_events()
                .iter()
                .any(|e| self.regs.event_occurred(e) && self.regs.is_listening(e));
            if !fired {
                continue;
            }

            let still_converting = self.regs.is_converting(group);
            let outcome = resolve(self.state, group, self.completion(group, still_converting));
            self.apply(outcome);
            if outcome.finished {
                self.regs.unlisten(group.completion_events());
            }

            match group {
                Group::Regular => self.callbacks.regular_complete(id),
                Group::Injected => self.callbacks.injected_complete(id),
            }
            self.regs.clear_events(group.completion_events());
        }

        if self.regs.event_occurred(Event::InjectedQueueOverflow)
            && self.regs.is_listening(Event::InjectedQueueOverflow)
        {
            #[cfg(feature = "defmt")]
            defmt::warn!("{}: injected queue overflow", id);
            self.errors.insert(ErrorCode::InjectedQueueOverflow);
            self.state.insert(State::InjectedQueueOverflow);
            self.regs
                .clear_events(Event::InjectedQueueOverflow.into());
            self.callbacks.injected_queue_overflow(id);
        }

        if self.regs.event_occurred(Event::Overrun) && self.regs.is_listening(Event::Overrun) {
            // Overwritten data only matters if somebody is reading all of it.
            if self.regs.cfgr().overrun == OverrunMode::Preserve || self.dma_requests_enabled() {
                self.state.insert(State::RegularOverrun);
                self.errors.insert(ErrorCode::Overrun);
                self.callbacks.error(id, Error::Overrun);
            }
            self.regs.clear_events(Event::Overrun.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy(group: Group) -> EnumSet<State> {
        EnumSet::only(group.busy())
    }

    const LAST: Completion = Completion {
        end_of_sequence: true,
        more_expected: false,
        queue_armed: false,
        still_converting: false,
    };

    #[test]
    fn finished_sequence_sets_ready() {
        let outcome = resolve(busy(Group::Injected), Group::Injected, LAST);
        assert!(outcome.finished);
        assert_eq!(
            outcome.state,
            State::Ready | State::InjectedEndOfConversion
        );
    }

    #[test]
    fn other_group_busy_keeps_ready_clear() {
        let state = State::RegularBusy | State::InjectedBusy;
        let outcome = resolve(state, Group::Injected, LAST);
        assert!(outcome.finished);
        assert!(outcome.state.contains(State::RegularBusy));
        assert!(!outcome.state.contains(State::InjectedBusy));
        assert!(!outcome.state.contains(State::Ready));
    }

    #[test]
    fn single_conversion_keeps_group_busy() {
        let completion = Completion {
            end_of_sequence: false,
            ..LAST
        };
        let outcome = resolve(busy(Group::Regular), Group::Regular, completion);
        assert!(!outcome.finished);
        assert!(outcome.state.contains(State::RegularBusy));
        assert!(outcome.state.contains(State::RegularEndOfConversion));
    }

    #[test]
    fn triggered_or_queued_groups_stay_busy() {
        for &completion in &[
            Completion {
                more_expected: true,
                ..LAST
            },
            Completion {
                queue_armed: true,
                ..LAST
            },
        ] {
            let outcome = resolve(busy(Group::Injected), Group::Injected, completion);
            assert!(!outcome.finished);
            assert!(outcome.state.contains(State::InjectedBusy));
            assert!(!outcome.state.contains(State::Ready));
        }
    }

    #[test]
    fn hardware_still_converting_is_a_fault() {
        let completion = Completion {
            still_converting: true,
            ..LAST
        };
        let outcome = resolve(busy(Group::Regular), Group::Regular, completion);
        assert!(outcome.fault);
        assert!(!outcome.finished);
        assert!(outcome.state.contains(State::ErrorInternal));
        assert!(outcome.state.contains(State::RegularBusy));
    }

    #[test]
    fn injected_still_converting_stays_busy() {
        let completion = Completion {
            still_converting: true,
            ..LAST
        };
        let outcome = resolve(busy(Group::Injected), Group::Injected, completion);
        assert!(!outcome.fault);
        assert!(!outcome.finished);
        assert!(!outcome.state.contains(State::ErrorInternal));
        assert!(outcome.state.contains(State::InjectedBusy));
        assert!(!outcome.state.contains(State::Ready));
    }
}
