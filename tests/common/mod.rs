//! Simulated SX127x register file and board pins.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{ErrorType as SpiErrorType, Operation, SpiDevice};
use embedded_hal_async::digital::Wait;
use sx127x::{Config, InterruptPin, Sx127x};

pub type Radio = Sx127x<FakeChip, FakePin, FakeDelay>;

const FIFO: u8 = 0x00;
const OP_MODE: u8 = 0x01;
const FIFO_ADDR_PTR: u8 = 0x0D;
const IRQ_FLAGS: u8 = 0x12;
const TX_DONE: u8 = 0x08;

pub struct ChipState {
    regs: [u8; 0x80],
    fifo: [u8; 256],
    writes: Vec<(u8, u8)>,
    tx_completes: bool,
}

impl ChipState {
    fn new() -> Self {
        let mut regs = [0u8; 0x80];
        regs[0x01] = 0x09;
        regs[0x06] = 0x6C;
        regs[0x07] = 0x80;
        regs[0x09] = 0x4F;
        regs[0x0C] = 0x20;
        regs[0x1D] = 0x72;
        regs[0x1E] = 0x70;
        regs[0x1F] = 0x64;
        regs[0x20] = 0x00;
        regs[0x21] = 0x08;
        regs[0x22] = 0x01;
        regs[0x31] = 0xC3;
        regs[0x37] = 0x0A;
        regs[0x39] = 0x12;
        regs[0x42] = 0x12;

        Self {
            regs,
            fifo: [0; 256],
            writes: Vec::new(),
            tx_completes: true,
        }
    }

    fn read(&mut self, address: u8) -> u8 {
        if address == FIFO {
            let pointer = self.regs[FIFO_ADDR_PTR as usize];
            self.regs[FIFO_ADDR_PTR as usize] = pointer.wrapping_add(1);
            self.fifo[pointer as usize]
        } else {
            self.regs[address as usize]
        }
    }

    fn write(&mut self, address: u8, value: u8) {
        self.writes.push((address, value));
        match address {
            FIFO => {
                let pointer = self.regs[FIFO_ADDR_PTR as usize];
                self.regs[FIFO_ADDR_PTR as usize] = pointer.wrapping_add(1);
                self.fifo[pointer as usize] = value;
            }
            IRQ_FLAGS => self.regs[IRQ_FLAGS as usize] &= !value,
            OP_MODE => {
                self.regs[OP_MODE as usize] = value;
                if value & 0x07 == 0x03 && self.tx_completes {
                    self.regs[IRQ_FLAGS as usize] |= TX_DONE;
                    self.regs[OP_MODE as usize] = (value & !0x07) | 0x01;
                }
            }
            0x42 => {}
            _ => self.regs[address as usize] = value,
        }
    }
}

/// SPI device backed by a simulated register file.
///
/// Models burst auto-increment, the FIFO behind its pointer, write-one-to-clear
/// IRQ flags and a transmitter that finishes as soon as it is started.
#[derive(Clone)]
pub struct FakeChip {
    state: Rc<RefCell<ChipState>>,
}

impl FakeChip {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ChipState::new())),
        }
    }

    pub fn reg(&self, address: u8) -> u8 {
        self.state.borrow().regs[address as usize]
    }

    pub fn set_reg(&self, address: u8, value: u8) {
        self.state.borrow_mut().regs[address as usize] = value;
    }

    pub fn fifo(&self, start: usize, len: usize) -> Vec<u8> {
        self.state.borrow().fifo[start..start + len].to_vec()
    }

    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.state.borrow().writes.clone()
    }

    pub fn wrote_to(&self, address: u8) -> bool {
        self.state.borrow().writes.iter().any(|(a, _)| *a == address)
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    pub fn set_tx_completes(&self, completes: bool) {
        self.state.borrow_mut().tx_completes = completes;
    }

    /// Places a received packet at the receive base and raises `flags`.
    pub fn deliver_packet(&self, payload: &[u8], flags: u8, rssi: u8) {
        let mut state = self.state.borrow_mut();
        let base = state.regs[0x0F];
        for (offset, byte) in payload.iter().enumerate() {
            state.fifo[base.wrapping_add(offset as u8) as usize] = *byte;
        }
        state.regs[0x10] = base;
        state.regs[0x13] = payload.len() as u8;
        state.regs[0x1A] = rssi;
        state.regs[IRQ_FLAGS as usize] |= flags;
    }
}

impl SpiErrorType for FakeChip {
    type Error = Infallible;
}

impl SpiDevice for FakeChip {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let mut state = self.state.borrow_mut();
        let mut access: Option<(u8, bool)> = None;

        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        match access {
                            None => access = Some((byte & 0x7F, byte & 0x80 != 0)),
                            Some((address, true)) => {
                                state.write(address, byte);
                                if address != FIFO {
                                    access = Some((address + 1, true));
                                }
                            }
                            Some((_, false)) => {}
                        }
                    }
                }
                Operation::Read(buffer) => {
                    let (mut address, _) = access.expect("read before address byte");
                    for slot in buffer.iter_mut() {
                        *slot = state.read(address);
                        if address != FIFO {
                            address += 1;
                        }
                    }
                    access = Some((address, false));
                }
                Operation::DelayNs(_) => {}
                _ => panic!("unsupported SPI operation"),
            }
        }
        Ok(())
    }
}

/// Output pin recording every level it is driven to.
#[derive(Clone, Default)]
pub struct FakePin {
    levels: Rc<RefCell<Vec<bool>>>,
}

impl FakePin {
    pub fn levels(&self) -> Vec<bool> {
        self.levels.borrow().clone()
    }
}

impl PinErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Delay that only counts.
#[derive(Clone, Default)]
pub struct FakeDelay {
    elapsed_ns: Rc<Cell<u64>>,
}

impl FakeDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns.get() / 1_000_000
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.set(self.elapsed_ns.get() + ns as u64);
    }
}

/// Interrupt line whose rising edge is always already there.
#[derive(Clone, Default)]
pub struct FakeIrqPin {
    listening: Rc<Cell<bool>>,
}

impl FakeIrqPin {
    pub fn listening(&self) -> bool {
        self.listening.get()
    }
}

impl InterruptPin for FakeIrqPin {
    type Error = Infallible;

    fn listen_rising_edge(&mut self) -> Result<(), Infallible> {
        self.listening.set(true);
        Ok(())
    }

    fn unlisten(&mut self) -> Result<(), Infallible> {
        self.listening.set(false);
        Ok(())
    }
}

impl PinErrorType for FakeIrqPin {
    type Error = Infallible;
}

impl Wait for FakeIrqPin {
    async fn wait_for_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    async fn wait_for_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

pub struct Board {
    pub chip: FakeChip,
    pub reset: FakePin,
    pub delay: FakeDelay,
}

/// A radio on a fresh simulated chip, not yet initialized.
pub fn radio(config: Config) -> (Radio, Board) {
    let board = Board {
        chip: FakeChip::new(),
        reset: FakePin::default(),
        delay: FakeDelay::default(),
    };
    let radio = Sx127x::new(
        board.chip.clone(),
        board.reset.clone(),
        board.delay.clone(),
        config,
    );
    (radio, board)
}

/// A radio that went through `init`, with the write log cleared.
pub fn initialized(config: Config) -> (Radio, Board) {
    let (mut radio, board) = radio(config);
    radio.init().expect("init");
    board.chip.clear_writes();
    (radio, board)
}
