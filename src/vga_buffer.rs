use core::fmt::{self, Write};
use core::ptr;

use spin::Mutex;

use crate::memory_layout::{physical2virtual, VGA_BUFFER_PHYS};

const BUFFER_HEIGHT: usize = 25;
const BUFFER_WIDTH: usize = 80;

#[allow(dead_code)]
#[derive(Clone, Copy)]
#[repr(u8)]
pub enum Color {
    Black = 0x0,
    Blue = 0x1,
    Green = 0x2,
    Cyan = 0x3,
    Red = 0x4,
    Magenta = 0x5,
    Brown = 0x6,
    LightGray = 0x7,
    DarkGray = 0x8,
    LightBlue = 0x9,
    LightGreen = 0xA,
    LightCyan = 0xB,
    LightRed = 0xC,
    Pink = 0xD,
    Yellow = 0xE,
    White = 0xF,
}

#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct ColorCode(u8);

impl ColorCode {
    const fn new(foreground: Color, background: Color) -> Self {
        Self((background as u8) << 4 | (foreground as u8))
    }
}

const DEFAULT_COLOR: ColorCode = ColorCode::new(Color::LightGray, Color::Black);

#[derive(Clone, Copy)]
#[repr(C)]
struct ScreenChar {
    ascii_character: u8,
    color_code: ColorCode,
}

pub static VGA_WRITER: Mutex<Writer> = Mutex::new(Writer::new());

pub struct Writer {
    column_position: usize,
    color_code: ColorCode,
    buffer_ptr: *mut ScreenChar,
}

// The raw buffer pointer always refers to the one VGA text buffer; the
// Mutex serializes every access to it.
unsafe impl Send for Writer {}

impl Writer {
    const fn new() -> Self {
        Self {
            column_position: 0,
            color_code: DEFAULT_COLOR,
            // The console writes through the high-half alias; the physical
            // address is only touched by the pre-paging boot error path.
            buffer_ptr: physical2virtual(VGA_BUFFER_PHYS) as usize as *mut ScreenChar,
        }
    }

    pub fn set_color(&mut self, foreground: Color, background: Color) {
        self.color_code = ColorCode::new(foreground, background);
    }

    pub fn reset_color(&mut self) {
        self.color_code = DEFAULT_COLOR;
    }

    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            byte => {
                if self.column_position >= BUFFER_WIDTH {
                    self.new_line();
                }
                let row = BUFFER_HEIGHT - 1;
                let col = self.column_position;
                self.put_char(
                    row,
                    col,
                    ScreenChar {
                        ascii_character: byte,
                        color_code: self.color_code,
                    },
                );
                self.column_position += 1;
            }
        }
    }

    fn put_char(&mut self, row: usize, col: usize, ch: ScreenChar) {
        unsafe {
            ptr::write_volatile(self.buffer_ptr.add(row * BUFFER_WIDTH + col), ch);
        }
    }

    fn new_line(&mut self) {
        for row in 1..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                let ch = unsafe { ptr::read_volatile(self.buffer_ptr.add(row * BUFFER_WIDTH + col)) };
                self.put_char(row - 1, col, ch);
            }
        }
        self.clear_row(BUFFER_HEIGHT - 1);
        self.column_position = 0;
    }

    fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: self.color_code,
        };
        for col in 0..BUFFER_WIDTH {
            self.put_char(row, col, blank);
        }
    }

    pub fn clear_screen(&mut self) {
        for row in 0..BUFFER_HEIGHT {
            self.clear_row(row);
        }
        self.column_position = 0;
    }
}

impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            match byte {
                // Printable ASCII or newline.
                0x20..=0x7E | b'\n' => self.write_byte(byte),
                _ => self.write_byte(0xFE),
            }
        }
        Ok(())
    }
}

pub fn init() {
    with_writer(|writer| writer.clear_screen());
    crate::kinfo!("VGA text console initialized");
}

pub fn with_writer<F, R>(f: F) -> R
where
    F: FnOnce(&mut Writer) -> R,
{
    x86_64::instructions::interrupts::without_interrupts(|| f(&mut VGA_WRITER.lock()))
}

pub(crate) fn _print(args: fmt::Arguments<'_>) {
    // Print to both VGA and serial.
    crate::serial::_print(args);
    with_writer(|writer| {
        writer.write_fmt(args).ok();
    });
}
