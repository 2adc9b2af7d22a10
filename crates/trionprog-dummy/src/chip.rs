//! SPI NOR chip model
//!
//! Works at the wire level: the adapter hands it every MOSI byte clocked
//! while chip select is low and sends back whatever the chip drives on
//! MISO. Mutating commands take effect on deselect, as on real parts.

use trionprog_core::flash::opcodes;

/// Configuration for the simulated chip
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Manufacturer ID returned by REMS
    pub manufacturer_id: u8,
    /// Device ID returned by REMS
    pub device_id: u8,
    /// Factory unique ID
    pub unique_id: [u8; opcodes::UNIQUE_ID_LEN],
    /// Capacity in bytes; addresses wrap at this size
    pub size: usize,
    /// Status reads reporting busy after each erase or program
    pub busy_polls: u32,
    /// Start in deep power-down, as the FPGA leaves it after booting
    pub powered_down: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xC8, // GigaDevice
            device_id: 0x13,       // GD25Q80E
            unique_id: *b"trionprog-sim-01",
            size: 1024 * 1024,
            busy_polls: 2,
            powered_down: false,
        }
    }
}

/// Something the chip did, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    /// Sector or block erase
    Erase {
        /// Erase opcode
        opcode: u8,
        /// Start of the erased range (aligned down)
        addr: u32,
        /// Bytes erased
        len: u32,
    },
    /// Whole-chip erase
    ChipErase,
    /// Page program
    Program {
        /// Address as sent
        addr: u32,
        /// Data bytes clocked in
        len: usize,
    },
    /// Data read
    Read {
        /// Address as sent
        addr: u32,
        /// Data bytes clocked out
        len: usize,
    },
    /// Software reset
    Reset,
    /// Release from deep power-down
    WakeUp,
    /// Command ignored: no write enable, still busy or asleep
    Rejected {
        /// Opcode of the ignored command
        opcode: u8,
    },
}

/// Command currently being clocked in
#[derive(Debug, Default)]
struct Transaction {
    opcode: Option<u8>,
    addr: u32,
    /// Bytes clocked after the opcode
    clocked: usize,
}

impl Transaction {
    /// Address bytes still outstanding
    fn in_address(&self) -> bool {
        self.clocked < 3
    }

    /// Index of the current data byte
    fn data_index(&self) -> usize {
        self.clocked - 3
    }
}

/// Simulated configuration flash
pub struct SimFlash {
    config: SimConfig,
    data: Vec<u8>,
    write_enabled: bool,
    busy_remaining: u32,
    stuck_busy: bool,
    powered_down: bool,
    reset_enabled: bool,
    page_latch: [u8; opcodes::PAGE_SIZE],
    current: Option<Transaction>,
    ops: Vec<FlashOp>,
}

impl SimFlash {
    /// Create an erased chip
    pub fn new(config: SimConfig) -> Self {
        let data = vec![0xFF; config.size];
        let powered_down = config.powered_down;
        Self {
            config,
            data,
            write_enabled: false,
            busy_remaining: 0,
            stuck_busy: false,
            powered_down,
            reset_enabled: false,
            page_latch: [0xFF; opcodes::PAGE_SIZE],
            current: None,
            ops: Vec::new(),
        }
    }

    /// Create a chip pre-filled with `initial_data` from address 0
    pub fn with_data(config: SimConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable flash contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Configuration the chip was created with
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Everything the chip has done so far
    pub fn ops(&self) -> &[FlashOp] {
        &self.ops
    }

    /// Forget the recorded operations
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Keep the busy bit set forever
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Whether the chip is in deep power-down
    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Whether the write enable latch is set
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    fn is_busy(&self) -> bool {
        self.stuck_busy || self.busy_remaining > 0
    }

    fn index(&self, addr: u32) -> usize {
        addr as usize % self.data.len()
    }

    /// Chip select asserted
    pub fn select(&mut self) {
        self.current = Some(Transaction::default());
        self.page_latch = [0xFF; opcodes::PAGE_SIZE];
    }

    /// Clock one byte; returns the MISO byte
    pub fn exchange(&mut self, mosi: u8) -> u8 {
        let Some(mut tx) = self.current.take() else {
            return 0xFF;
        };
        let miso = match tx.opcode {
            None => {
                tx.opcode = Some(mosi);
                0xFF
            }
            Some(_) if self.powered_down => 0xFF,
            Some(opcode) => self.clock_data(opcode, &mut tx, mosi),
        };
        self.current = Some(tx);
        miso
    }

    fn clock_data(&mut self, opcode: u8, tx: &mut Transaction, mosi: u8) -> u8 {
        let miso = match opcode {
            opcodes::RDSR => self.status_read(),
            opcodes::RDSR2 => 0x00,
            _ if tx.in_address() => {
                tx.addr = (tx.addr << 8) | mosi as u32;
                0xFF
            }
            opcodes::READ => self.data[self.index(tx.addr.wrapping_add(tx.data_index() as u32))],
            opcodes::REMS => {
                if (tx.addr + tx.data_index() as u32) % 2 == 0 {
                    self.config.manufacturer_id
                } else {
                    self.config.device_id
                }
            }
            opcodes::RDUID => self
                .config
                .unique_id
                .get(tx.data_index())
                .copied()
                .unwrap_or(0xFF),
            opcodes::PP => {
                let offset = (tx.addr as usize + tx.data_index()) % opcodes::PAGE_SIZE;
                self.page_latch[offset] &= mosi;
                0xFF
            }
            _ => 0xFF,
        };
        tx.clocked += 1;
        miso
    }

    /// Status byte for one RDSR clock; counts down the busy time
    fn status_read(&mut self) -> u8 {
        let mut status = 0;
        if self.write_enabled {
            status |= opcodes::SR1_WEL;
        }
        if self.is_busy() {
            status |= opcodes::SR1_WIP;
            self.busy_remaining = self.busy_remaining.saturating_sub(1);
        }
        status
    }

    /// Chip select released; executes the command
    pub fn deselect(&mut self) {
        let Some(tx) = self.current.take() else {
            return;
        };
        let Some(opcode) = tx.opcode else {
            return;
        };

        if self.powered_down {
            if opcode == opcodes::RES {
                self.powered_down = false;
                self.ops.push(FlashOp::WakeUp);
            }
            return;
        }

        let rsten_pending = core::mem::take(&mut self.reset_enabled);
        match opcode {
            opcodes::WREN if !self.is_busy() => self.write_enabled = true,
            opcodes::RES => self.ops.push(FlashOp::WakeUp),
            opcodes::RSTEN => self.reset_enabled = true,
            opcodes::RST if rsten_pending => {
                self.write_enabled = false;
                self.busy_remaining = 0;
                self.ops.push(FlashOp::Reset);
            }
            opcodes::READ if !tx.in_address() => self.ops.push(FlashOp::Read {
                addr: tx.addr,
                len: tx.data_index(),
            }),
            opcodes::PP if !tx.in_address() => self.mutate(opcode, |chip| {
                let page = chip.index(tx.addr) & !(opcodes::PAGE_SIZE - 1);
                for (offset, byte) in chip.page_latch.iter().enumerate() {
                    chip.data[page + offset] &= byte;
                }
                FlashOp::Program {
                    addr: tx.addr,
                    len: tx.data_index(),
                }
            }),
            opcodes::SE_20 | opcodes::BE_52 | opcodes::BE_D8 if !tx.in_address() => {
                let len = match opcode {
                    opcodes::SE_20 => opcodes::SECTOR_SIZE,
                    opcodes::BE_52 => opcodes::BLOCK32_SIZE,
                    _ => opcodes::BLOCK64_SIZE,
                };
                self.mutate(opcode, |chip| {
                    let start = chip.index(tx.addr) & !(len as usize - 1);
                    let end = (start + len as usize).min(chip.data.len());
                    chip.data[start..end].fill(0xFF);
                    FlashOp::Erase {
                        opcode,
                        addr: start as u32,
                        len,
                    }
                })
            }
            opcodes::CE_60 => self.mutate(opcode, |chip| {
                chip.data.fill(0xFF);
                FlashOp::ChipErase
            }),
            _ => {}
        }
    }

    /// Run a write-enable gated command, then go busy
    fn mutate(&mut self, opcode: u8, apply: impl FnOnce(&mut Self) -> FlashOp) {
        if !self.write_enabled || self.is_busy() {
            log::debug!("sim: rejected 0x{:02X} (WEL={})", opcode, self.write_enabled);
            self.ops.push(FlashOp::Rejected { opcode });
            return;
        }
        let op = apply(self);
        log::trace!("sim: {:?}", op);
        self.ops.push(op);
        self.write_enabled = false;
        self.busy_remaining = self.config.busy_polls;
    }
}
