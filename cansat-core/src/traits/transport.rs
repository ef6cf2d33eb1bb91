//! Register-level bus transport
//!
//! Sensors are addressed as `(device address, register)` pairs. Drivers own a
//! [`RegisterTransport`] and never see the underlying bus type. Any
//! [`embedded_hal::i2c::I2c`] bus becomes a transport through
//! [`I2cTransport`].

use embedded_hal::i2c::I2c;
use heapless::Vec;

/// Largest register write supported by [`I2cTransport`] (register byte excluded)
pub const MAX_WRITE_LEN: usize = 16;

/// Number of addresses [`RegisterTransport::scan`] can report
pub const MAX_SCAN_RESULTS: usize = 16;

/// Byte-level register access with device discovery
pub trait RegisterTransport {
    /// Bus failure type (no ack, arbitration loss, ...)
    type Error: core::fmt::Debug;

    /// Read `buf.len()` bytes starting at `reg`
    fn read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `bytes` starting at `reg`
    fn write(&mut self, addr: u8, reg: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Whether a device acknowledges `addr`
    fn probe(&mut self, addr: u8) -> bool;

    /// Addresses in the 7-bit non-reserved range that acknowledge
    fn scan(&mut self) -> Vec<u8, MAX_SCAN_RESULTS> {
        let mut found = Vec::new();
        for addr in 0x08..=0x77 {
            if self.probe(addr) && found.push(addr).is_err() {
                break;
            }
        }
        found
    }
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for &mut T {
    type Error = T::Error;

    fn read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(addr, reg, buf)
    }

    fn write(&mut self, addr: u8, reg: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write(addr, reg, bytes)
    }

    fn probe(&mut self, addr: u8) -> bool {
        (**self).probe(addr)
    }

    fn scan(&mut self) -> Vec<u8, MAX_SCAN_RESULTS> {
        (**self).scan()
    }
}

/// Failure of an [`I2cTransport`] access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cTransportError<E> {
    /// Error reported by the bus
    Bus(E),
    /// Write longer than [`MAX_WRITE_LEN`]
    WriteTooLong,
}

/// [`RegisterTransport`] over an `embedded-hal` I2C bus
#[derive(Debug)]
pub struct I2cTransport<I> {
    bus: I,
}

impl<I: I2c> I2cTransport<I> {
    /// Wrap an I2C bus
    pub fn new(bus: I) -> Self {
        Self { bus }
    }

    /// Give the bus back
    pub fn release(self) -> I {
        self.bus
    }
}

impl<I: I2c> RegisterTransport for I2cTransport<I> {
    type Error = I2cTransportError<I::Error>;

    fn read(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.write_read(addr, &[reg], buf).map_err(I2cTransportError::Bus)
    }

    fn write(&mut self, addr: u8, reg: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut frame: Vec<u8, { MAX_WRITE_LEN + 1 }> = Vec::new();
        frame.push(reg).map_err(|_| I2cTransportError::WriteTooLong)?;
        frame
            .extend_from_slice(bytes)
            .map_err(|_| I2cTransportError::WriteTooLong)?;
        self.bus.write(addr, &frame).map_err(I2cTransportError::Bus)
    }

    fn probe(&mut self, addr: u8) -> bool {
        let mut byte = [0u8; 1];
        self.bus.read(addr, &mut byte).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    /// Records writes and answers reads with a fixed pattern.
    #[derive(Default)]
    struct FakeI2c {
        present: Vec<u8, 4>,
        writes: std::vec::Vec<(u8, std::vec::Vec<u8>)>,
    }

    impl ErrorType for FakeI2c {
        type Error = ErrorKind;
    }

    impl I2c for FakeI2c {
        fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
            if !self.present.contains(&address) {
                return Err(ErrorKind::NoAcknowledge(embedded_hal::i2c::NoAcknowledgeSource::Address));
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                    Operation::Read(buf) => {
                        for (i, b) in buf.iter_mut().enumerate() {
                            *b = i as u8 + 1;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn write_prefixes_register() {
        let mut fake = FakeI2c::default();
        fake.present.push(0x76).unwrap();
        let mut transport = I2cTransport::new(fake);

        transport.write(0x76, 0xF4, &[0x57]).unwrap();
        let fake = transport.release();
        assert_eq!(fake.writes, vec![(0x76, vec![0xF4, 0x57])]);
    }

    #[test]
    fn read_fills_buffer() {
        let mut fake = FakeI2c::default();
        fake.present.push(0x68).unwrap();
        let mut transport = I2cTransport::new(fake);

        let mut buf = [0u8; 3];
        transport.read(0x68, 0x3B, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn oversized_write_rejected() {
        let mut fake = FakeI2c::default();
        fake.present.push(0x68).unwrap();
        let mut transport = I2cTransport::new(fake);

        let err = transport.write(0x68, 0x00, &[0u8; MAX_WRITE_LEN + 1]).unwrap_err();
        assert_eq!(err, I2cTransportError::WriteTooLong);
    }

    #[test]
    fn scan_lists_acknowledging_devices() {
        let mut fake = FakeI2c::default();
        fake.present.push(0x68).unwrap();
        fake.present.push(0x76).unwrap();
        let mut transport = I2cTransport::new(fake);

        assert_eq!(transport.scan().as_slice(), &[0x68, 0x76]);
    }
}
