//! A simulated ADC pair (ADC1 master, ADC2 slave) sharing one common register block.
#![allow(dead_code)]

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use enumset::EnumSet;

use stm32_adc_groups::adc::config::{
    Channel, Config, InjectedRank, InputMode, OffsetNumber, OffsetSign, SampleTime, Sequence,
};
use stm32_adc_groups::adc::{
    Adc, Callbacks, Ccr, Cfgr, Error, Event, Group, InjectedContext, InstanceId, Registers,
};
use stm32_adc_groups::dma::{self, DataWidth, LinkNode, TransferMode};
use stm32_adc_groups::time::{Hertz, Milliseconds, TickSource};

pub const ADC1: usize = 0;
pub const ADC2: usize = 1;

pub const COMMON_DATA_ADDRESS: usize = 0x4202_830C;

pub fn regular_data_address(idx: usize) -> usize {
    0x4202_8040 + idx * 0x100
}

#[derive(Debug)]
pub struct Instance {
    pub id: InstanceId,
    pub enabled: bool,
    pub calibrating: bool,
    pub stuck_enable: bool,
    pub stuck_calibration: bool,
    pub stuck_disable: bool,
    pub regulator: bool,
    pub deep_power_down: bool,
    pub vddcore: bool,
    pub calibration_factor: [u8; 2],
    pub converting: EnumSet<Group>,
    pub flags: EnumSet<Event>,
    pub interrupts: EnumSet<Event>,
    pub cfgr: Cfgr,
    /// Active injected context first, then the queued one
    pub contexts: Vec<InjectedContext>,
    pub context_writes: u32,
    pub injected_rank: usize,
    pub injected_data: [u32; 4],
    pub regular_data: u32,
    pub regular_rank: u8,
    pub regular_length: u8,
    pub regular_sequence: [Option<Channel>; 16],
    pub sample_times: Vec<(Channel, SampleTime)>,
    pub input_modes: Vec<(Channel, InputMode)>,
    pub offsets: [Option<(Channel, u32)>; 4],
    pub starts: u32,
}

impl Instance {
    fn new(id: InstanceId) -> Self {
        Self {
            id,
            enabled: false,
            calibrating: false,
            stuck_enable: false,
            stuck_calibration: false,
            stuck_disable: false,
            regulator: true,
            deep_power_down: false,
            vddcore: false,
            calibration_factor: [0; 2],
            converting: EnumSet::new(),
            flags: EnumSet::new(),
            interrupts: EnumSet::new(),
            cfgr: Cfgr::default(),
            contexts: Vec::new(),
            context_writes: 0,
            injected_rank: 0,
            injected_data: [0; 4],
            regular_data: 0,
            regular_rank: 0,
            regular_length: 1,
            regular_sequence: [None; 16],
            sample_times: Vec::new(),
            input_modes: Vec::new(),
            offsets: [None; 4],
            starts: 0,
        }
    }

    pub fn active_context(&self) -> InjectedContext {
        self.contexts.first().copied().unwrap_or_default()
    }

    pub fn sample_time(&self, channel: Channel) -> Option<SampleTime> {
        self.sample_times
            .iter()
            .rev()
            .find(|(c, _)| *c == channel)
            .map(|&(_, t)| t)
    }

    pub fn input_mode(&self, channel: Channel) -> Option<InputMode> {
        self.input_modes
            .iter()
            .rev()
            .find(|(c, _)| *c == channel)
            .map(|&(_, m)| m)
    }
}

#[derive(Debug)]
pub struct Chip {
    pub adcs: [Instance; 2],
    pub ccr: Ccr,
    pub common_data: u32,
}

pub type Shared = Rc<RefCell<Chip>>;

pub fn chip() -> Shared {
    Rc::new(RefCell::new(Chip {
        adcs: [Instance::new(InstanceId::Adc1), Instance::new(InstanceId::Adc2)],
        ccr: Ccr::default(),
        common_data: 0,
    }))
}

fn calibration_index(mode: InputMode) -> usize {
    match mode {
        InputMode::SingleEnded => 0,
        InputMode::Differential => 1,
    }
}

fn offset_index(number: OffsetNumber) -> usize {
    match number {
        OffsetNumber::One => 0,
        OffsetNumber::Two => 1,
        OffsetNumber::Three => 2,
        OffsetNumber::Four => 3,
    }
}

/// Does a start or stop of `group` on the master also act on the slave?
fn synchronized(chip: &Chip, group: Group) -> bool {
    match group {
        Group::Regular => chip.ccr.multimode.synchronizes_regular(),
        Group::Injected => chip.ccr.multimode.synchronizes_injected(),
    }
}

pub struct SimRegs {
    chip: Shared,
    idx: usize,
}

impl SimRegs {
    pub fn new(chip: &Shared, idx: usize) -> Self {
        Self {
            chip: chip.clone(),
            idx,
        }
    }

    fn inst(&self) -> Ref<'_, Instance> {
        Ref::map(self.chip.borrow(), |c| &c.adcs[self.idx])
    }

    fn inst_mut(&self) -> RefMut<'_, Instance> {
        RefMut::map(self.chip.borrow_mut(), |c| &mut c.adcs[self.idx])
    }
}

impl Registers for SimRegs {
    fn instance(&self) -> InstanceId {
        self.inst().id
    }

    fn is_enabled(&self) -> bool {
        self.inst().enabled
    }

    fn enable(&mut self) {
        let mut adc = self.inst_mut();
        adc.enabled = true;
        if !adc.stuck_enable {
            adc.flags.insert(Event::Ready);
        }
    }

    fn disable(&mut self) {
        let mut adc = self.inst_mut();
        if adc.stuck_disable {
            return;
        }
        adc.enabled = false;
        adc.flags.remove(Event::Ready);
    }

    fn is_disabling(&self) -> bool {
        false
    }

    fn start_calibration(&mut self, mode: InputMode) {
        let mut adc = self.inst_mut();
        adc.calibrating = adc.stuck_calibration;
        adc.calibration_factor[calibration_index(mode)] = 0x42;
    }

    fn is_calibrating(&self) -> bool {
        self.inst().calibrating
    }

    fn calibration_factor(&self, mode: InputMode) -> u8 {
        self.inst().calibration_factor[calibration_index(mode)]
    }

    fn set_calibration_factor(&mut self, mode: InputMode, factor: u8) {
        self.inst_mut().calibration_factor[calibration_index(mode)] = factor;
    }

    fn start_conversion(&mut self, group: Group) {
        let mut chip = self.chip.borrow_mut();
        let both = self.idx == ADC1 && synchronized(&chip, group);
        for idx in 0..2 {
            if idx == self.idx || both {
                let adc = &mut chip.adcs[idx];
                adc.converting.insert(group);
                adc.starts += 1;
                match group {
                    Group::Regular => adc.regular_rank = 0,
                    Group::Injected => adc.injected_rank = 0,
                }
            }
        }
    }

    fn stop_conversion(&mut self, group: Group) {
        let mut chip = self.chip.borrow_mut();
        let both = self.idx == ADC1 && synchronized(&chip, group);
        for idx in 0..2 {
            if idx == self.idx || both {
                chip.adcs[idx].converting.remove(group);
            }
        }
    }

    fn is_converting(&self, group: Group) -> bool {
        self.inst().converting.contains(group)
    }

    fn event_occurred(&self, event: Event) -> bool {
        self.inst().flags.contains(event)
    }

    fn clear_events(&mut self, events: EnumSet<Event>) {
        self.inst_mut().flags.remove_all(events);
    }

    fn listen(&mut self, events: EnumSet<Event>) {
        self.inst_mut().interrupts.insert_all(events);
    }

    fn unlisten(&mut self, events: EnumSet<Event>) {
        self.inst_mut().interrupts.remove_all(events);
    }

    fn is_listening(&self, event: Event) -> bool {
        self.inst().interrupts.contains(event)
    }

    fn cfgr(&self) -> Cfgr {
        self.inst().cfgr
    }

    fn modify_cfgr<F: FnOnce(&mut Cfgr)>(&mut self, f: F) {
        f(&mut self.inst_mut().cfgr);
    }

    fn master_cfgr(&self) -> Cfgr {
        self.chip.borrow().adcs[ADC1].cfgr
    }

    fn injected_context(&self) -> InjectedContext {
        self.inst().active_context()
    }

    fn write_injected_context(&mut self, context: InjectedContext) {
        let mut adc = self.inst_mut();
        adc.context_writes += 1;
        if adc.cfgr.injected_queue_disabled {
            adc.contexts = vec![context];
        } else if adc.contexts.len() >= 2 {
            adc.flags.insert(Event::InjectedQueueOverflow);
        } else {
            adc.contexts.push(context);
        }
    }

    fn set_regular_sequence(&mut self, rank: Sequence, channel: Channel) {
        self.inst_mut().regular_sequence[usize::from(u8::from(rank))] = Some(channel);
    }

    fn set_regular_length(&mut self, length: u8) {
        self.inst_mut().regular_length = length;
    }

    fn set_sample_time(&mut self, channel: Channel, time: SampleTime) {
        self.inst_mut().sample_times.push((channel, time));
    }

    fn set_input_mode(&mut self, channel: Channel, mode: InputMode) {
        self.inst_mut().input_modes.push((channel, mode));
    }

    fn offset_channel(&self, number: OffsetNumber) -> Option<Channel> {
        self.inst().offsets[offset_index(number)].map(|(channel, _)| channel)
    }

    fn set_offset(
        &mut self,
        number: OffsetNumber,
        channel: Channel,
        value: u32,
        _sign: OffsetSign,
        _saturation: bool,
    ) {
        self.inst_mut().offsets[offset_index(number)] = Some((channel, value));
    }

    fn disable_offset(&mut self, number: OffsetNumber) {
        self.inst_mut().offsets[offset_index(number)] = None;
    }

    fn enable_vddcore(&mut self) {
        self.inst_mut().vddcore = true;
    }

    fn disable_regulator(&mut self) {
        self.inst_mut().regulator = false;
    }

    fn enter_deep_power_down(&mut self) {
        self.inst_mut().deep_power_down = true;
    }

    fn regular_data(&self) -> u32 {
        let mut adc = self.inst_mut();
        adc.flags.remove(Event::EndOfConversion);
        adc.regular_data
    }

    fn injected_data(&self, rank: InjectedRank) -> u32 {
        let mut adc = self.inst_mut();
        adc.flags.remove(Event::InjectedEndOfConversion);
        adc.injected_data[usize::from(rank)]
    }

    fn regular_data_address(&self) -> usize {
        regular_data_address(self.idx)
    }

    fn ccr(&self) -> Ccr {
        self.chip.borrow().ccr
    }

    fn modify_ccr<F: FnOnce(&mut Ccr)>(&mut self, f: F) {
        f(&mut self.chip.borrow_mut().ccr);
    }

    fn common_data(&self) -> u32 {
        self.chip.borrow().common_data
    }

    fn common_data_address(&self) -> usize {
        COMMON_DATA_ADDRESS
    }

    fn paired_enabled(&self) -> bool {
        self.chip.borrow().adcs[1 - self.idx].enabled
    }
}

/// Finish the next rank of the active injected context of `idx`.
pub fn complete_injected_rank(chip: &Shared, idx: usize) {
    let mut chip = chip.borrow_mut();
    let adc = &mut chip.adcs[idx];
    let context = adc.active_context();
    let rank = adc.injected_rank;

    adc.injected_data[rank] = 100 + rank as u32;
    adc.flags.insert(Event::InjectedEndOfConversion);
    adc.injected_rank += 1;

    if adc.injected_rank == usize::from(context.length) {
        adc.injected_rank = 0;
        adc.flags.insert(Event::InjectedEndOfSequence);
        if context.trigger.is_none() && !adc.cfgr.injected_queue {
            adc.converting.remove(Group::Injected);
        }
        if !adc.cfgr.injected_queue_disabled && adc.contexts.len() > 1 {
            adc.contexts.remove(0);
        }
    }
}

/// Finish the next rank of the regular sequence of `idx` with `value`.
pub fn complete_regular_rank(chip: &Shared, idx: usize, value: u32) {
    let mut chip = chip.borrow_mut();
    let adc = &mut chip.adcs[idx];

    if adc.flags.contains(Event::EndOfConversion) {
        adc.flags.insert(Event::Overrun);
    }
    adc.regular_data = value;
    adc.flags.insert(Event::EndOfConversion);
    adc.regular_rank += 1;

    if adc.regular_rank == adc.regular_length {
        adc.regular_rank = 0;
        adc.flags.insert(Event::EndOfSequence);
        if adc.cfgr.regular_trigger.is_none() && !adc.cfgr.continuous {
            adc.converting.remove(Group::Regular);
        }
    }
}

/// Milliseconds advancing by one on every read.
#[derive(Default)]
pub struct SimTicks(Cell<u32>);

impl TickSource for SimTicks {
    fn now(&self) -> Milliseconds {
        let now = self.0.get();
        self.0.set(now.wrapping_add(1));
        Milliseconds(now)
    }
}

#[derive(Debug, Default)]
pub struct DmaState {
    pub half: bool,
    pub complete: bool,
    pub error: bool,
    pub listening: bool,
    pub enabled: bool,
    pub started: Option<(usize, usize, u32)>,
    pub linked: Option<LinkNode>,
    pub aborts: u32,
    pub refuse_start: bool,
    pub refuse_abort: bool,
}

pub struct SimDma {
    pub shared: Rc<RefCell<DmaState>>,
    pub width: DataWidth,
    pub mode: TransferMode,
    pub head: Option<LinkNode>,
}

impl SimDma {
    pub fn new(width: DataWidth) -> (Self, Rc<RefCell<DmaState>>) {
        let shared = Rc::new(RefCell::new(DmaState::default()));
        (
            Self {
                shared: shared.clone(),
                width,
                mode: TransferMode::Normal,
                head: None,
            },
            shared,
        )
    }

    pub fn linked(width: DataWidth, head: Option<LinkNode>) -> (Self, Rc<RefCell<DmaState>>) {
        let (mut dma, shared) = Self::new(width);
        dma.mode = TransferMode::LinkedList;
        dma.head = head;
        (dma, shared)
    }
}

impl dma::Channel for SimDma {
    fn event_occurred(&self, event: dma::Event) -> bool {
        let s = self.shared.borrow();
        match event {
            dma::Event::HalfTransfer => s.half,
            dma::Event::TransferComplete => s.complete,
            dma::Event::TransferError => s.error,
            dma::Event::Any => s.half || s.complete || s.error,
        }
    }

    fn clear_event(&mut self, event: dma::Event) {
        let mut s = self.shared.borrow_mut();
        match event {
            dma::Event::HalfTransfer => s.half = false,
            dma::Event::TransferComplete => s.complete = false,
            dma::Event::TransferError => s.error = false,
            dma::Event::Any => {
                s.half = false;
                s.complete = false;
                s.error = false;
            }
        }
    }

    fn listen(&mut self, _: dma::Event) {
        self.shared.borrow_mut().listening = true;
    }

    fn unlisten(&mut self, _: dma::Event) {
        self.shared.borrow_mut().listening = false;
    }

    fn source_width(&self) -> DataWidth {
        self.width
    }

    fn mode(&self) -> TransferMode {
        self.mode
    }

    fn head_node(&mut self) -> Option<&mut LinkNode> {
        self.head.as_mut()
    }

    fn start(&mut self, source: usize, destination: usize, length: u32) -> Result<(), dma::Error> {
        let mut s = self.shared.borrow_mut();
        if s.refuse_start {
            return Err(dma::Error::Busy);
        }
        s.started = Some((source, destination, length));
        s.enabled = true;
        Ok(())
    }

    fn start_linked(&mut self) -> Result<(), dma::Error> {
        let mut s = self.shared.borrow_mut();
        if s.refuse_start {
            return Err(dma::Error::Busy);
        }
        s.linked = self.head;
        s.enabled = true;
        Ok(())
    }

    fn abort(&mut self) -> Result<(), dma::Error> {
        let mut s = self.shared.borrow_mut();
        s.aborts += 1;
        if s.refuse_abort {
            return Err(dma::Error::Timeout);
        }
        s.enabled = false;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.shared.borrow().enabled
    }
}

/// Callbacks counting every invocation.
#[derive(Debug, Default)]
pub struct Recorder {
    pub regular_complete: u32,
    pub regular_half_complete: u32,
    pub injected_complete: u32,
    pub injected_queue_overflow: u32,
    pub errors: Vec<(InstanceId, Error)>,
}

impl Callbacks for Recorder {
    fn regular_complete(&mut self, _adc: InstanceId) {
        self.regular_complete += 1;
    }

    fn regular_half_complete(&mut self, _adc: InstanceId) {
        self.regular_half_complete += 1;
    }

    fn injected_complete(&mut self, _adc: InstanceId) {
        self.injected_complete += 1;
    }

    fn injected_queue_overflow(&mut self, _adc: InstanceId) {
        self.injected_queue_overflow += 1;
    }

    fn error(&mut self, adc: InstanceId, error: Error) {
        self.errors.push((adc, error));
    }
}

pub type SimAdc<D = dma::NoDma, CB = stm32_adc_groups::adc::NoCallbacks> =
    Adc<SimRegs, SimTicks, D, CB>;

pub fn adc_with(chip: &Shared, idx: usize, config: Config) -> SimAdc {
    Adc::new(SimRegs::new(chip, idx), SimTicks::default(), config)
}

pub fn adc(chip: &Shared, idx: usize) -> SimAdc {
    adc_with(chip, idx, Config::default())
}

/// A slow clock keeps the cycle bounded waits short.
pub fn slow_config() -> Config {
    Config::default().sysclk(Hertz(1_000))
}
