//! Frame loop driving the VM.
use std::time::Duration;

use chip8_cpu::{constants::*, prelude::*, Clock, Hz};
use log::{debug, info};

use crate::{config::KeyEvent, error::AppError};

/// Headless host for a single ROM.
///
/// Plays scripted key events at the start of each frame, runs one
/// fetch-batch per frame and reports buzzer changes to the log.
pub struct Chip8App {
    vm: Chip8Vm,
    devices: HeadlessDevices,
    script: Vec<KeyEvent>,
    frame: u64,
}

impl Chip8App {
    pub fn new(conf: Chip8Conf, script: Vec<KeyEvent>) -> Self {
        Self {
            vm: Chip8Vm::new(conf),
            devices: HeadlessDevices::default(),
            script,
            frame: 0,
        }
    }

    pub fn load_rom(&mut self, filepath: &str) -> Result<(), AppError> {
        let bytecode = std::fs::read(filepath)?;
        self.load_bytecode(&bytecode)?;
        info!("loaded {filepath} ({} bytes)", bytecode.len());
        Ok(())
    }

    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Result<(), AppError> {
        self.vm.load_bytecode(bytecode)?;
        self.devices = HeadlessDevices::default();
        self.frame = 0;
        Ok(())
    }

    pub fn vm(&self) -> &Chip8Vm {
        &self.vm
    }

    pub fn devices(&self) -> &HeadlessDevices {
        &self.devices
    }

    /// Run the given number of frames.
    ///
    /// When `realtime` is set each frame is paced to the 60 Hz timer
    /// rate, otherwise frames run back to back.
    pub fn run(&mut self, frames: u64, realtime: bool) -> Result<(), AppError> {
        let interval: Duration = Hz(FRAME_FREQUENCY).into();
        let mut clock = Clock::new(interval);
        info!(
            "running {frames} frames at {} instructions per frame",
            self.vm.config().speed
        );

        for _ in 0..frames {
            self.run_frame()?;

            if realtime {
                clock.wait();
            }
        }

        info!("stopped after {} frames", self.frame);
        Ok(())
    }

    /// Apply this frame's key events, then run one fetch-batch.
    pub fn run_frame(&mut self) -> Result<(), AppError> {
        self.apply_key_events();

        let tone_before = self.devices.tone;
        self.vm.cycle(&mut self.devices)?;

        match (tone_before, self.devices.tone) {
            (None, Some(freq)) => info!("frame {}: tone on at {freq} Hz", self.frame),
            (Some(_), None) => info!("frame {}: tone off", self.frame),
            _ => {}
        }

        self.frame += 1;
        Ok(())
    }

    fn apply_key_events(&mut self) {
        let frame = self.frame;
        let count = self
            .script
            .iter()
            .take_while(|event| event.frame <= frame)
            .count();

        for event in self.script.drain(..count) {
            debug!("frame {frame}: key {} pressed={}", event.key, event.pressed);
            self.devices.keys.set(event.key, event.pressed);
            if event.pressed {
                self.vm.key_down(event.key);
            }
        }
    }

    /// Printable summary of the machine after a run.
    pub fn report(&self) -> Result<String, AppError> {
        let mut buf = self.devices.display.dump()?;
        buf.push_str(&self.vm.dump_registers()?);
        Ok(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn setup(bytecode: &[u8], script: Vec<KeyEvent>) -> Chip8App {
        let conf = Chip8Conf {
            speed: 4,
            seed: Some(1),
            ..Default::default()
        };
        let mut app = Chip8App::new(conf, script);
        app.load_bytecode(bytecode).unwrap();
        app
    }

    #[test]
    fn test_scripted_key_resolves_wait() {
        #[rustfmt::skip]
        let mut app = setup(
            &[
                0xF3, 0x0A, // 200: LD V3, K
                0x12, 0x02, // 202: JP 0x202
            ],
            vec![KeyEvent {
                frame: 2,
                key: KeyCode::Key9,
                pressed: true,
            }],
        );

        app.run(2, false).unwrap();
        assert!(app.vm().is_waiting());
        assert_eq!(app.vm().config().speed, 4);

        app.run(1, false).unwrap();
        assert!(!app.vm().is_waiting());
        assert_eq!(app.vm().cpu().register(3), 9);
        assert!(app.devices().keys.is_pressed(KeyCode::Key9));
    }

    #[test]
    fn test_tone_follows_sound_timer() {
        #[rustfmt::skip]
        let mut app = setup(
            &[
                0x60, 0x02, // 200: LD V0, 0x02
                0xF0, 0x18, // 202: LD ST, V0
                0x12, 0x04, // 204: JP 0x204
            ],
            vec![],
        );

        app.run_frame().unwrap();
        assert_eq!(app.devices().tone, Some(DEFAULT_TONE_FREQUENCY));

        app.run_frame().unwrap();
        assert_eq!(app.devices().tone, None);
    }

    #[test]
    fn test_fatal_error_stops_run() {
        let mut app = setup(&[0xFF, 0xFF], vec![]);

        let err = app.run(10, false).unwrap_err();
        assert!(matches!(err.kind, crate::error::ErrorKind::Chip8(_)));
        assert_eq!(app.frame, 0);
    }

    #[test]
    fn test_report() {
        #[rustfmt::skip]
        let mut app = setup(
            &[
                0x6A, 0x05, // 200: LD VA, 0x05
                0x12, 0x02, // 202: JP 0x202
            ],
            vec![],
        );

        app.run_frame().unwrap();
        let report = app.report().unwrap();
        assert_eq!(report.lines().count(), DISPLAY_HEIGHT + 2);
        assert!(report.contains("VA=05"));
    }
}
