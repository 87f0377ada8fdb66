//! Direct memory access (DMA) channel interface
//!
//! The ADC only needs a small part of a DMA controller: starting a
//! peripheral-to-memory transfer (either directly or through a linked-list
//! head node), aborting it, and its completion events. Device crates implement
//! [`Channel`] for their DMA channels; [`NoDma`] is used when an [`Adc`] is not
//! bound to any channel.
//!
//! [`Adc`]: `crate::adc::Adc`

pub use embedded_dma::WriteBuffer;

/// DMA interrupt events
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// First half of a transfer is done
    HalfTransfer,
    /// Transfer is complete
    TransferComplete,
    /// A transfer error occurred
    TransferError,
    /// Any of the above events occurred
    Any,
}

/// Width of a single DMA data item
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataWidth {
    /// 8 bits
    Byte,
    /// 16 bits
    HalfWord,
    /// 32 bits
    Word,
}

impl DataWidth {
    /// Size of one data item in bytes.
    pub fn bytes(self) -> u32 {
        match self {
            DataWidth::Byte => 1,
            DataWidth::HalfWord => 2,
            DataWidth::Word => 4,
        }
    }
}

impl Default for DataWidth {
    fn default() -> Self {
        DataWidth::Word
    }
}

/// How the channel was set up by the application.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    /// Transfer programmed directly through the channel registers
    Normal,
    /// Transfer described by a list of nodes, starting at the head node
    LinkedList,
}

/// Head node of a linked-list transfer.
///
/// Only the fields the ADC patches in before starting are modelled here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkNode {
    /// Source address, the ADC data register
    pub source: usize,
    /// Destination address in memory
    pub destination: usize,
    /// Transfer length in bytes
    pub length: u32,
}

/// DMA channel error
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The channel did not stop in time
    Timeout,
    /// The channel reported a transfer error
    Transfer,
    /// The channel is already running a transfer
    Busy,
}

/// A DMA channel which can move ADC results into memory
pub trait Channel {
    /// Is the interrupt flag for the given event set?
    fn event_occurred(&self, event: Event) -> bool;

    /// Clear the interrupt flag for the given event.
    ///
    /// Passing `Event::Any` clears all interrupt flags.
    fn clear_event(&mut self, event: Event);

    /// Enable the interrupt for the given event
    fn listen(&mut self, event: Event);

    /// Disable the interrupt for the given event
    fn unlisten(&mut self, event: Event);

    /// Width of the items read from the source.
    fn source_width(&self) -> DataWidth;

    /// Whether this channel runs a linked-list transfer.
    fn mode(&self) -> TransferMode;

    /// Head node of the linked list, if the channel has one.
    fn head_node(&mut self) -> Option<&mut LinkNode>;

    /// Start a transfer of `length` bytes.
    fn start(&mut self, source: usize, destination: usize, length: u32) -> Result<(), Error>;

    /// Start the linked-list transfer described by the head node.
    fn start_linked(&mut self) -> Result<(), Error>;

    /// Stop the current transfer.
    ///
    /// Aborting an idle channel succeeds.
    fn abort(&mut self) -> Result<(), Error>;

    /// Is there a transfer in progress on this channel?
    fn is_enabled(&self) -> bool;
}

/// Placeholder for an [`Adc`](`crate::adc::Adc`) without DMA channel.
///
/// This type can not be constructed.
#[derive(Debug)]
pub enum NoDma {}

impl Channel for NoDma {
    fn event_occurred(&self, _: Event) -> bool {
        match *self {}
    }

    fn clear_event(&mut self, _: Event) {
        match *self {}
    }

    fn listen(&mut self, _: Event) {
        match *self {}
    }

    fn unlisten(&mut self, _: Event) {
        match *self {}
    }

    fn source_width(&self) -> DataWidth {
        match *self {}
    }

    fn mode(&self) -> TransferMode {
        match *self {}
    }

    fn head_node(&mut self) -> Option<&mut LinkNode> {
        match *self {}
    }

    fn start(&mut self, _: usize, _: usize, _: u32) -> Result<(), Error> {
        match *self {}
    }

    fn start_linked(&mut self) -> Result<(), Error> {
        match *self {}
    }

    fn abort(&mut self) -> Result<(), Error> {
        match *self {}
    }

    fn is_enabled(&self) -> bool {
        match *self {}
    }
}
