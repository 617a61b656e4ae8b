//! # PS2 Controller Protocol Constants and Types
//!
//! Core protocol definitions for the PS2 controller's half-duplex SPI link.
//!
//! Every exchange is a fixed command frame clocked out while the response is
//! clocked in on the same transfer. The second response byte is the mode byte
//! and tells whether (and how) a controller is attached.

/// First byte of every command frame
pub const CMD_HEADER: u8 = 0x01;

/// Main status poll / motor command
pub const CMD_POLL: u8 = 0x42;

/// Enter or exit configuration mode (selected by byte 3)
pub const CMD_CONFIG: u8 = 0x43;

/// Set analog/digital mode
pub const CMD_SET_MODE: u8 = 0x44;

/// Query controller type
pub const CMD_READ_TYPE: u8 = 0x45;

/// Map rumble motor bytes
pub const CMD_ENABLE_RUMBLE: u8 = 0x4D;

/// Select response bytes (pressure data)
pub const CMD_SET_RESPONSE_BYTES: u8 = 0x4F;

/// Enter configuration mode
pub const ENTER_CONFIG: [u8; 5] = [CMD_HEADER, CMD_CONFIG, 0x00, 0x01, 0x00];

/// Read controller type (type byte lands at [`TYPE_OFFSET`] of the response)
pub const READ_TYPE: [u8; 9] = [CMD_HEADER, CMD_READ_TYPE, 0x00, 0x5A, 0x5A, 0x5A, 0x5A, 0x5A, 0x5A];

/// Switch to analog mode and lock it
pub const SET_MODE: [u8; 9] = [CMD_HEADER, CMD_SET_MODE, 0x00, 0x01, 0x03, 0x00, 0x00, 0x00, 0x00];

/// Map the two rumble motors to poll bytes 3 and 4
pub const ENABLE_RUMBLE: [u8; 5] = [CMD_HEADER, CMD_ENABLE_RUMBLE, 0x00, 0x00, 0x01];

/// Request full (pressure-sensitive) data mode
pub const EXTENDED_DATA: [u8; 9] = [CMD_HEADER, CMD_SET_RESPONSE_BYTES, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x00, 0x00];

/// Exit configuration mode
pub const EXIT_CONFIG: [u8; 9] = [CMD_HEADER, CMD_CONFIG, 0x00, 0x00, 0x5A, 0x5A, 0x5A, 0x5A, 0x5A];

/// Length of the main poll frame
pub const POLL_FRAME_LEN: usize = 9;

/// Extra bytes clocked in after the poll frame in pressure mode
pub const EXTENDED_FRAME_LEN: usize = 12;

/// Full response buffer (poll frame + extended tail)
pub const RESPONSE_LEN: usize = POLL_FRAME_LEN + EXTENDED_FRAME_LEN;

/// Offset of the mode byte in every response
pub const MODE_OFFSET: usize = 1;

/// Offset of the controller type byte in the read-type response
pub const TYPE_OFFSET: usize = 3;

/// Offset of the little-endian button word in a poll response
pub const BUTTONS_OFFSET: usize = 3;

/// Offsets of the two motor bytes in a poll command
pub const MOTOR1_OFFSET: usize = 3;
pub const MOTOR2_OFFSET: usize = 4;

/// Mode byte: digital
pub const MODE_DIGITAL: u8 = 0x41;
/// Mode byte: analog, no pressure data
pub const MODE_ANALOG: u8 = 0x73;
/// Mode byte: analog with pressure data
pub const MODE_ANALOG_PRESSURE: u8 = 0x79;
/// Mode byte echoed while in configuration mode
pub const MODE_CONFIG: u8 = 0xF3;

/// SPI clock used by the controller (500 kHz)
pub const DEFAULT_SPI_CLOCK_HZ: u32 = 500_000;

/// Raw response buffer
pub type Response = [u8; RESPONSE_LEN];

/// Build a poll command carrying the two rumble motor strengths
///
/// The returned buffer is full length; only the first [`POLL_FRAME_LEN`] bytes
/// are command bytes, the tail is zero padding clocked out while reading
/// extended data.
pub fn poll_frame(motor1: u8, motor2: u8) -> Response {
    let mut frame = [0u8; RESPONSE_LEN];
    frame[0] = CMD_HEADER;
    frame[1] = CMD_POLL;
    frame[MOTOR1_OFFSET] = motor1;
    frame[MOTOR2_OFFSET] = motor2;
    frame
}

/// Controller mode as reported by the mode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Digital,
    Analog,
    AnalogPressure,
    /// Anything else: nothing attached, noise, or a protocol mismatch
    Unknown(u8),
}

impl Mode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            MODE_DIGITAL => Mode::Digital,
            MODE_ANALOG => Mode::Analog,
            MODE_ANALOG_PRESSURE => Mode::AnalogPressure,
            other => Mode::Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Mode::Digital => MODE_DIGITAL,
            Mode::Analog => MODE_ANALOG,
            Mode::AnalogPressure => MODE_ANALOG_PRESSURE,
            Mode::Unknown(byte) => byte,
        }
    }

    /// True for the three modes of an attached controller
    pub fn is_attached(self) -> bool {
        !matches!(self, Mode::Unknown(_))
    }

    /// True when the controller follows the poll frame with the extended tail
    pub fn has_extended_data(self) -> bool {
        self == Mode::AnalogPressure
    }
}

/// A digital button flag
///
/// Raw controller encoding is active-low: a cleared bit means pressed. Flags
/// are plain masks and may be combined with `|` to query several at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Button(u16);

impl Button {
    pub const NONE: Button = Button(0x0000);
    pub const SELECT: Button = Button(0x0001);
    pub const L3: Button = Button(0x0002);
    pub const R3: Button = Button(0x0004);
    pub const START: Button = Button(0x0008);
    pub const PAD_UP: Button = Button(0x0010);
    pub const PAD_RIGHT: Button = Button(0x0020);
    pub const PAD_DOWN: Button = Button(0x0040);
    pub const PAD_LEFT: Button = Button(0x0080);
    pub const L2: Button = Button(0x0100);
    pub const R2: Button = Button(0x0200);
    pub const L1: Button = Button(0x0400);
    pub const R1: Button = Button(0x0800);
    pub const TRIANGLE: Button = Button(0x1000);
    pub const CIRCLE: Button = Button(0x2000);
    pub const CROSS: Button = Button(0x4000);
    pub const SQUARE: Button = Button(0x8000);

    // Guitar-style colour names for the face buttons
    pub const GREEN: Button = Button::TRIANGLE;
    pub const RED: Button = Button::CIRCLE;
    pub const BLUE: Button = Button::CROSS;
    pub const PINK: Button = Button::SQUARE;

    /// Every single-bit flag with its name, in bit order
    pub const ALL: [(&'static str, Button); 16] = [
        ("SELECT", Button::SELECT),
        ("L3", Button::L3),
        ("R3", Button::R3),
        ("START", Button::START),
        ("PAD_UP", Button::PAD_UP),
        ("PAD_RIGHT", Button::PAD_RIGHT),
        ("PAD_DOWN", Button::PAD_DOWN),
        ("PAD_LEFT", Button::PAD_LEFT),
        ("L2", Button::L2),
        ("R2", Button::R2),
        ("L1", Button::L1),
        ("R1", Button::R1),
        ("TRIANGLE", Button::TRIANGLE),
        ("CIRCLE", Button::CIRCLE),
        ("CROSS", Button::CROSS),
        ("SQUARE", Button::SQUARE),
    ];

    pub const fn from_bits(bits: u16) -> Self {
        Button(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }
}

impl std::ops::BitOr for Button {
    type Output = Button;

    fn bitor(self, rhs: Button) -> Button {
        Button(self.0 | rhs.0)
    }
}

/// Analog value identifiers, each the response offset of its byte
///
/// Stick axes are present in analog modes; the button pressures only in
/// pressure mode (offsets 9 and up live in the extended tail).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Axis {
    RightX = 5,
    RightY = 6,
    LeftX = 7,
    LeftY = 8,
    PadRight = 9,
    PadLeft = 10,
    PadUp = 11,
    PadDown = 12,
    Triangle = 13,
    Circle = 14,
    Cross = 15,
    Square = 16,
    L1 = 17,
    R1 = 18,
    L2 = 19,
    R2 = 20,
}

impl Axis {
    pub const GREEN: Axis = Axis::Triangle;
    pub const RED: Axis = Axis::Circle;
    pub const BLUE: Axis = Axis::Cross;
    pub const PINK: Axis = Axis::Square;

    /// The four stick axes
    pub const STICKS: [Axis; 4] = [Axis::RightX, Axis::RightY, Axis::LeftX, Axis::LeftY];

    /// Offset of this value in the response buffer
    pub fn offset(self) -> usize {
        self as usize
    }
}
