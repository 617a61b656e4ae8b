//! # LSB-First Adapter
//!
//! The controller shifts every byte least significant bit first. SPI
//! controllers that only shift MSB first (the Raspberry Pi's among them) can
//! still talk to it if each byte is bit-reversed on the way out and again on
//! the way back in.

use embedded_hal::spi::{ErrorType, SpiBus};

/// Wraps an MSB-first bus so it behaves as an LSB-first one
#[derive(Debug)]
pub struct LsbFirst<B> {
    inner: B,
    scratch: Vec<u8>,
}

impl<B> LsbFirst<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            scratch: Vec::new(),
        }
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

fn reverse_all(bytes: &mut [u8]) {
    for byte in bytes {
        *byte = byte.reverse_bits();
    }
}

impl<B: ErrorType> ErrorType for LsbFirst<B> {
    type Error = B::Error;
}

impl<B: SpiBus<u8>> SpiBus<u8> for LsbFirst<B> {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.inner.read(words)?;
        reverse_all(words);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.scratch.clear();
        self.scratch.extend(words.iter().map(|b| b.reverse_bits()));
        self.inner.write(&self.scratch)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.scratch.clear();
        self.scratch.extend(write.iter().map(|b| b.reverse_bits()));
        self.inner.transfer(read, &self.scratch)?;
        reverse_all(read);
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        reverse_all(words);
        self.inner.transfer_in_place(words)?;
        reverse_all(words);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()
    }
}
