//! IO device interface
use crate::{constants::*, display::Framebuffer};

/// Hooks to provide IO devices to the virtual machine.
///
/// The VM only exchanges logical signals with its peripherals. How the
/// display is presented, where key events come from, and how the tone
/// is synthesized is up to the implementor.
pub trait Devices {
    /// Flip the pixel at the given logical coordinate.
    ///
    /// Coordinates outside the canvas wrap around. Returns `true` when the
    /// pixel was erased, meaning it went from set to unset.
    fn toggle_pixel(&mut self, x: usize, y: usize) -> bool;

    /// Unset every pixel on the canvas.
    fn clear_display(&mut self);

    /// Checks immediately whether the given key is currently pressed.
    fn is_pressed(&self, key: KeyCode) -> bool;

    /// Start playing the buzzer at the given pitch.
    fn tone_on(&mut self, frequency: f64);

    /// Silence the buzzer.
    fn tone_off(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(try_from = "u8"))]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        match key_id {
            0 => Ok(Self::Key0),
            1 => Ok(Self::Key1),
            2 => Ok(Self::Key2),
            3 => Ok(Self::Key3),
            4 => Ok(Self::Key4),
            5 => Ok(Self::Key5),
            6 => Ok(Self::Key6),
            7 => Ok(Self::Key7),
            8 => Ok(Self::Key8),
            9 => Ok(Self::Key9),
            10 => Ok(Self::KeyA),
            11 => Ok(Self::KeyB),
            12 => Ok(Self::KeyC),
            13 => Ok(Self::KeyD),
            14 => Ok(Self::KeyE),
            15 => Ok(Self::KeyF),
            _ => Err(InvalidKeyCode(key_id)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidKeyCode(pub u8);

impl std::error::Error for InvalidKeyCode {}

impl std::fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "keycode must be in range 0 <= keycode < {KEY_COUNT}, got {}",
            self.0
        )
    }
}

/// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyState(u16);

impl KeyState {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.0 |= 1 << key.as_u8();
        } else {
            self.0 &= !(1 << key.as_u8());
        }
    }

    #[inline]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.0 & (1 << key.as_u8()) > 0
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any(&self) -> bool {
        self.0 > 0
    }

    /// Set all keys to up.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    #[inline(always)]
    pub fn bits(&self) -> u16 {
        self.0
    }
}

/// Devices without any host presentation.
///
/// Pixels go to an in-memory [`Framebuffer`], keys are set by the owner,
/// and the buzzer state is only recorded.
#[derive(Debug, Default)]
pub struct HeadlessDevices {
    pub display: Framebuffer,
    pub keys: KeyState,
    /// Pitch of the buzzer while it is on.
    pub tone: Option<f64>,
}

impl HeadlessDevices {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Devices for HeadlessDevices {
    fn toggle_pixel(&mut self, x: usize, y: usize) -> bool {
        self.display.toggle_pixel(x, y)
    }

    fn clear_display(&mut self) {
        self.display.clear();
    }

    fn is_pressed(&self, key: KeyCode) -> bool {
        self.keys.is_pressed(key)
    }

    fn tone_on(&mut self, frequency: f64) {
        self.tone = Some(frequency);
    }

    fn tone_off(&mut self) {
        self.tone = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut keys = KeyState::new();

        keys.set(KeyCode::Key0, true);
        assert_eq!(keys.bits(), 0b00000000_00000001);
        assert!(keys.is_pressed(KeyCode::Key0));
        assert!(!keys.is_pressed(KeyCode::Key1));
        assert!(!keys.is_pressed(KeyCode::Key7));

        keys.set(KeyCode::Key7, true);
        assert_eq!(keys.bits(), 0b00000000_10000001);
        assert!(keys.is_pressed(KeyCode::Key7));

        keys.set(KeyCode::Key0, false);
        assert_eq!(keys.bits(), 0b00000000_10000000);
        assert!(!keys.is_pressed(KeyCode::Key0));

        keys.set(KeyCode::KeyF, true);
        assert_eq!(keys.bits(), 0b10000000_10000000);
        assert!(keys.is_pressed(KeyCode::KeyF));
        assert!(keys.any());

        keys.clear();
        assert!(!keys.any());
    }

    #[test]
    fn test_keycode_conversion() {
        for key_id in 0..KEY_COUNT {
            let keycode = KeyCode::try_from(key_id).unwrap();
            assert_eq!(u8::from(keycode), key_id);
        }
        assert_eq!(KeyCode::try_from(16), Err(InvalidKeyCode(16)));
        assert_eq!(KeyCode::KeyA.to_string(), "ka");
    }

    #[test]
    fn test_headless_tone() {
        let mut devices = HeadlessDevices::new();
        devices.tone_on(440.0);
        assert_eq!(devices.tone, Some(440.0));
        devices.tone_off();
        assert_eq!(devices.tone, None);
    }
}
