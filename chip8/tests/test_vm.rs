use chip8_cpu::{constants::*, prelude::*};
use rand::rngs::mock::StepRng;

fn vm_with(program: &[u8], speed: usize) -> Chip8Vm {
    let conf = Chip8Conf {
        speed,
        ..Default::default()
    };
    let mut vm = Chip8Vm::with_rng(conf, StepRng::new(0, 1));
    vm.load_bytecode(program).unwrap();
    vm
}

#[test]
fn test_load_boundaries() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());

    let err = vm.load_bytecode(&[0; 3584]).unwrap_err();
    assert_eq!(err, Chip8Error::InvalidProgram { size: 3584 });

    vm.load_bytecode(&[0x7E]).unwrap();
    assert_eq!(vm.cpu().memory()[0x200], 0x7E);
    assert_eq!(vm.cpu().pc(), 0x200);
}

#[test]
fn test_font_loaded_at_power_on() {
    let vm = vm_with(&[0x00, 0xE0], 1);
    assert_eq!(&vm.cpu().memory()[0..5], &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
    assert_eq!(&vm.cpu().memory()[75..80], &[0xF0, 0x80, 0xF0, 0x80, 0x80]);
}

#[test]
#[rustfmt::skip]
fn test_font_survives_store() {
    let mut devices = HeadlessDevices::new();
    let mut vm = vm_with(&[
        0x60, 0x99, // LD V0, 0x99
        0xA0, 0x00, // LD I, 0x000
        0xF0, 0x55, // LD [I], V0
    ], 3);

    vm.cycle(&mut devices).unwrap();
    assert_eq!(vm.cpu().memory()[0], 0xF0);
}

#[test]
#[rustfmt::skip]
fn test_call_returns_after_call_site() {
    let mut devices = HeadlessDevices::new();
    let mut vm = vm_with(&[
        0x22, 0x04, // 200: CALL 0x204
        0x12, 0x02, // 202: JP 0x202
        0x00, 0xEE, // 204: RET
    ], 1);

    vm.run_steps(2, &mut devices).unwrap();
    assert_eq!(vm.cpu().pc(), 0x202);
    assert_eq!(vm.cpu().stack_depth(), 0);
}

#[test]
fn test_timers_count_down_per_batch() {
    let mut devices = HeadlessDevices::new();
    // LD V0, 5; LD DT, V0; LD ST, V0; then spin
    let mut vm = vm_with(&[0x60, 0x05, 0xF0, 0x15, 0xF0, 0x18, 0x12, 0x06], 4);

    // The first batch sets the timers, then ticks them once.
    vm.cycle(&mut devices).unwrap();
    assert_eq!(vm.cpu().delay_timer(), 4);
    assert_eq!(vm.cpu().sound_timer(), 4);
    assert_eq!(devices.tone, Some(DEFAULT_TONE_FREQUENCY));

    for n in 1..=10u8 {
        vm.cycle(&mut devices).unwrap();
        assert_eq!(vm.cpu().delay_timer(), 4u8.saturating_sub(n));
        assert_eq!(vm.cpu().sound_timer(), 4u8.saturating_sub(n));
        assert_eq!(devices.tone.is_some(), vm.cpu().sound_timer() > 0);
    }
}

#[test]
#[rustfmt::skip]
fn test_wait_for_key_across_batches() {
    let mut devices = HeadlessDevices::new();
    let mut vm = vm_with(&[
        0xF4, 0x0A, // LD V4, K
        0x75, 0x01, // ADD V5, 1
        0x12, 0x02, // JP 0x202
    ], 10);

    vm.cycle(&mut devices).unwrap();
    assert!(vm.is_waiting());
    assert_eq!(vm.cpu().pc(), 0x202);

    // No instruction executes while waiting.
    vm.cycle(&mut devices).unwrap();
    assert_eq!(vm.cpu().pc(), 0x202);
    assert_eq!(vm.cpu().register(5), 0);

    assert!(vm.key_down(KeyCode::Key3));
    assert_eq!(vm.cpu().register(4), 3);

    vm.cycle(&mut devices).unwrap();
    assert!(!vm.is_waiting());
    assert_eq!(vm.cpu().register(5), 5);
}

#[test]
#[rustfmt::skip]
fn test_draw_glyph_twice() {
    let mut devices = HeadlessDevices::new();
    let mut vm = vm_with(&[
        0x60, 0x00, // LD V0, 0
        0xF0, 0x29, // LD F, V0
        0xD0, 0x05, // DRW V0, V0, 5
        0xD0, 0x05, // DRW V0, V0, 5
    ], 1);

    vm.run_steps(3, &mut devices).unwrap();
    assert_eq!(vm.cpu().register(0xF), 0);
    assert!(!devices.display.is_blank());
    assert!(devices.display.pixel(0, 0));
    assert!(devices.display.pixel(3, 4));
    assert!(!devices.display.pixel(1, 1));

    vm.step(&mut devices).unwrap();
    assert_eq!(vm.cpu().register(0xF), 1);
    assert!(devices.display.is_blank());
}

#[test]
fn test_unknown_opcode_stops_batch() {
    let mut devices = HeadlessDevices::new();
    let mut vm = vm_with(&[0x60, 0x01, 0x00, 0x00, 0x61, 0x01], 3);

    let err = vm.cycle(&mut devices).unwrap_err();
    assert_eq!(
        err,
        Chip8Error::UnknownOpcode {
            opcode: 0x0000,
            address: 0x202
        }
    );
    assert_eq!(vm.cpu().register(0), 1);
    assert_eq!(vm.cpu().register(1), 0);
}

/// Devices that only count calls, to check the VM talks to the trait.
#[derive(Default)]
struct Recorder {
    toggles: usize,
    clears: usize,
    tone_ons: usize,
    tone_offs: usize,
}

impl Devices for Recorder {
    fn toggle_pixel(&mut self, _x: usize, _y: usize) -> bool {
        self.toggles += 1;
        false
    }

    fn clear_display(&mut self) {
        self.clears += 1;
    }

    fn is_pressed(&self, _key: KeyCode) -> bool {
        false
    }

    fn tone_on(&mut self, _frequency: f64) {
        self.tone_ons += 1;
    }

    fn tone_off(&mut self) {
        self.tone_offs += 1;
    }
}

#[test]
fn test_custom_devices() {
    let mut devices = Recorder::default();
    // CLS; LD I, 0 (glyph "0"); DRW V0, V0, 1
    let mut vm = vm_with(&[0x00, 0xE0, 0xA0, 0x00, 0xD0, 0x01], 3);

    vm.cycle(&mut devices).unwrap();

    assert_eq!(devices.clears, 1);
    // F0 has four set bits.
    assert_eq!(devices.toggles, 4);
    assert_eq!(devices.tone_ons, 0);
    assert_eq!(devices.tone_offs, 1);
}

#[test]
fn test_disassembler_listing() {
    let listing = Disassembler::new(&[0x00, 0xE0, 0xF1, 0x0A])
        .listing()
        .unwrap();
    assert_eq!(listing, "0200: 00E0  CLS\n0202: F10A  LD V1, K\n");
}
