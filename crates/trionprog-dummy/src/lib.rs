//! trionprog-dummy - Simulated MPSSE adapter with a configuration flash
//!
//! [`SimAdapter`] implements [`ByteChannel`](trionprog_core::ByteChannel) by
//! decoding the MPSSE command stream and driving a [`SimFlash`] chip model
//! with the SPI traffic. It needs no hardware and is what the CLI uses for
//! `--programmer dummy`.

mod adapter;
mod chip;

pub use adapter::SimAdapter;
pub use chip::{FlashOp, SimConfig, SimFlash};

impl SimAdapter {
    /// Adapter with an erased, awake GD25Q80E
    pub fn new_default() -> Self {
        SimAdapter::new(SimFlash::new(SimConfig::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trionprog_core::erase::erase_area;
    use trionprog_core::flash::{ConfigFlash, PollPolicy};
    use trionprog_core::mpsse::SpiClock;
    use trionprog_core::program::{program_hex, NoProgress, Pass, ProgramMode};
    use trionprog_core::Error;

    fn hex(data: &[u8]) -> String {
        data.chunks(16)
            .map(|line| {
                line.iter()
                    .map(|b| format!("{:02X}", b))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    fn session(sim: SimAdapter) -> ConfigFlash<SimAdapter> {
        let mut flash = ConfigFlash::new(sim);
        flash.init(SpiClock::DEFAULT).unwrap();
        flash.wake_up().unwrap();
        flash.reset().unwrap();
        flash.transport_mut().channel_mut().flash_mut().clear_ops();
        flash
    }

    fn ops(flash: &ConfigFlash<SimAdapter>) -> Vec<FlashOp> {
        flash.transport().channel().flash().ops().to_vec()
    }

    #[test]
    fn test_session_setup() {
        let sim = SimAdapter::new(SimFlash::new(SimConfig {
            powered_down: true,
            ..Default::default()
        }));
        let mut flash = ConfigFlash::new(sim);
        flash.init(SpiClock::from_mhz(10.0)).unwrap();
        flash.wake_up().unwrap();
        flash.reset().unwrap();

        let chan = flash.transport().channel();
        assert_eq!(chan.divisor(), Some(5));
        assert!(!chan.flash().is_powered_down());
        assert_eq!(chan.flash().ops(), &[FlashOp::WakeUp, FlashOp::Reset]);

        assert_eq!(flash.read_device_id().unwrap(), 0x13C8);
        assert_eq!(&flash.read_unique_id().unwrap(), b"trionprog-sim-01");
    }

    #[test]
    fn test_small_image_end_to_end() {
        let data = pattern(300);
        let mut flash = session(SimAdapter::new_default());

        let report = program_hex(
            &mut flash,
            hex(&data).as_str(),
            0,
            ProgramMode::all(),
            &mut NoProgress,
        )
        .unwrap();

        assert!(report.is_ok(), "{:?}", report);
        assert_eq!(report.image_size, 300);
        assert_eq!(
            ops(&flash),
            vec![
                FlashOp::Erase {
                    opcode: 0x20,
                    addr: 0,
                    len: 4096
                },
                FlashOp::Program { addr: 0, len: 256 },
                FlashOp::Program { addr: 256, len: 44 },
                FlashOp::Read { addr: 0, len: 256 },
                FlashOp::Read { addr: 256, len: 44 },
            ]
        );
        assert_eq!(&flash.transport().channel().flash().data()[..300], &data[..]);
    }

    #[test]
    fn test_corrupt_image_sends_nothing() {
        let mut flash = ConfigFlash::new(SimAdapter::new_default());
        let result = program_hex(
            &mut flash,
            "00 11 22\ng3",
            0,
            ProgramMode::all(),
            &mut NoProgress,
        );
        assert_eq!(result, Err(Error::CorruptImage { offset: 9 }));
        assert_eq!(flash.transport().channel().write_calls(), 0);
    }

    #[test]
    fn test_stuck_busy_times_out() {
        let policy = PollPolicy {
            max_attempts: 7,
            interval_us: 500,
        };
        let mut flash = session(SimAdapter::new_default());
        flash.set_poll_policy(policy);
        flash
            .transport_mut()
            .channel_mut()
            .flash_mut()
            .set_stuck_busy(true);

        let before = flash.transport().channel().delayed_us();
        assert_eq!(flash.poll_until_ready(7), Err(Error::Timeout));
        let chan = flash.transport().channel();
        assert_eq!(chan.delayed_us() - before, 7 * 500);
        assert!(!chan.is_selected());

        let report = program_hex(
            &mut flash,
            "01 02 03",
            0,
            ProgramMode::ERASE | ProgramMode::PROGRAM,
            &mut NoProgress,
        )
        .unwrap();
        assert_eq!(report.passes.len(), 1);
        assert_eq!(report.passes[0].pass, Pass::Erase);
        assert_eq!(report.passes[0].error, Some(Error::Timeout));
        assert_eq!(report.result(), Err(Error::Timeout));

        let report = program_hex(&mut flash, "01 02 03", 0, ProgramMode::PROGRAM, &mut NoProgress)
            .unwrap();
        assert_eq!(report.pass(Pass::Program).unwrap().error, Some(Error::Timeout));
    }

    #[test]
    fn test_block_erase_outlasts_page_budget() {
        // Busy for three times the page program budget after each erase
        let mut flash = session(SimAdapter::new(SimFlash::with_data(
            SimConfig {
                busy_polls: 60,
                ..Default::default()
            },
            &[0u8; 0x10000],
        )));

        assert_eq!(erase_area(&mut flash, 0, 0x10000), Ok(1));
        assert_eq!(
            ops(&flash),
            vec![FlashOp::Erase {
                opcode: 0xD8,
                addr: 0,
                len: 0x10000
            }]
        );
        assert!(flash.transport().channel().flash().data()[..0x10000]
            .iter()
            .all(|&b| b == 0xFF));
    }

    #[test]
    fn test_failed_erase_aborts_plan() {
        let mut flash = session(SimAdapter::new_default());
        flash
            .transport_mut()
            .channel_mut()
            .flash_mut()
            .set_stuck_busy(true);

        // Two 64 KB blocks planned, only the first one issued
        assert_eq!(erase_area(&mut flash, 0, 0x20000), Err(Error::Timeout));
        assert_eq!(ops(&flash), vec![FlashOp::Rejected { opcode: 0xD8 }]);
    }

    #[test]
    fn test_program_failure_still_verifies() {
        // Busy for longer than the default poll budget after each program
        let mut flash = session(SimAdapter::new(SimFlash::new(SimConfig {
            busy_polls: 100,
            ..Default::default()
        })));

        let report = program_hex(
            &mut flash,
            "5A",
            0,
            ProgramMode::PROGRAM | ProgramMode::VERIFY,
            &mut NoProgress,
        )
        .unwrap();
        assert_eq!(report.passes.len(), 2);
        assert_eq!(report.pass(Pass::Program).unwrap().error, Some(Error::Timeout));
        // The page landed; only the wait for it gave up
        assert!(report.pass(Pass::Verify).unwrap().is_ok());
    }

    #[test]
    fn test_unaligned_start_splits_pages() {
        let data = pattern(600);
        let mut flash = session(SimAdapter::new_default());
        let report = program_hex(
            &mut flash,
            hex(&data).as_str(),
            0x1F80,
            ProgramMode::all(),
            &mut NoProgress,
        )
        .unwrap();
        assert!(report.is_ok(), "{:?}", report);

        let programs: Vec<_> = ops(&flash)
            .into_iter()
            .filter(|op| matches!(op, FlashOp::Program { .. }))
            .collect();
        assert_eq!(
            programs,
            vec![
                FlashOp::Program {
                    addr: 0x1F80,
                    len: 128
                },
                FlashOp::Program {
                    addr: 0x2000,
                    len: 256
                },
                FlashOp::Program {
                    addr: 0x2100,
                    len: 216
                },
            ]
        );
        let contents = flash.transport().channel().flash().data();
        assert_eq!(&contents[0x1F80..0x1F80 + 600], &data[..]);
        assert!(contents[0x1000..0x1F80].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_page_write_stays_in_page() {
        let mut flash = session(SimAdapter::new_default());
        for (addr, len) in [(0x3F0u32, 40usize), (0x400, 256), (0x5FF, 1), (0x6A0, 200)] {
            let before = flash.transport().channel().flash().data().to_vec();
            let data = vec![0x00; len];
            flash.write_page(addr, &data).unwrap();

            let page = (addr & !0xFF) as usize;
            let after = flash.transport().channel().flash().data();
            for (i, (old, new)) in before.iter().zip(after).enumerate() {
                if old != new {
                    assert!(
                        (page..page + 256).contains(&i),
                        "write of {} at 0x{:X} touched 0x{:X}",
                        len,
                        addr,
                        i
                    );
                }
            }
        }
    }

    #[test]
    fn test_erase_is_idempotent() {
        let mut image = vec![0xFF; 0x3000];
        image[0x1000..0x2000].fill(0x00);
        let mut flash = session(SimAdapter::new(SimFlash::with_data(
            SimConfig::default(),
            &image,
        )));

        erase_area(&mut flash, 0x1000, 0x1000).unwrap();
        let once = flash.transport().channel().flash().data().to_vec();
        erase_area(&mut flash, 0x1000, 0x1000).unwrap();
        let twice = flash.transport().channel().flash().data();

        assert_eq!(once, twice);
        assert!(once[..0x3000].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_verify_catches_mismatch() {
        let data = pattern(512);
        let mut flash = session(SimAdapter::new_default());
        let report = program_hex(
            &mut flash,
            hex(&data).as_str(),
            0,
            ProgramMode::ERASE | ProgramMode::PROGRAM,
            &mut NoProgress,
        )
        .unwrap();
        assert!(report.is_ok());

        flash.transport_mut().channel_mut().flash_mut().data_mut()[300] ^= 0xFF;
        let report = program_hex(
            &mut flash,
            hex(&data).as_str(),
            0,
            ProgramMode::VERIFY,
            &mut NoProgress,
        )
        .unwrap();
        let verify = report.pass(Pass::Verify).unwrap();
        assert_eq!(verify.error, Some(Error::VerifyMismatch { addr: 256 }));
        assert_eq!(verify.processed, 256);
    }

    #[test]
    fn test_chip_erase_and_reconfigure() {
        let mut flash = session(SimAdapter::new(SimFlash::with_data(
            SimConfig::default(),
            &[0u8; 1024],
        )));
        flash.erase_all().unwrap();
        assert!(flash
            .transport()
            .channel()
            .flash()
            .data()
            .iter()
            .all(|&b| b == 0xFF));

        flash.reconfigure_fpga(50_000).unwrap();
        assert!(flash.transport().channel().fpga_in_reset());
        flash.idle().unwrap();
        let chan = flash.transport().channel();
        assert!(!chan.fpga_in_reset());
        assert_eq!(chan.reset_pulses(), 1);
    }
}
