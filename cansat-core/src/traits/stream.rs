//! Non-blocking byte streams
//!
//! The positioning receiver drains its UART through [`Stream`], an `nb`-style
//! pull interface: `Ok(byte)` when data is ready, `WouldBlock` once the
//! receive buffer is empty, `Other(e)` for line errors.
//!
//! [`ByteStream`] is a fixed-capacity queue implementing [`Stream`]. A UART
//! interrupt (or a test) feeds it and the flight loop drains it.

use heapless::Deque;

/// Pull-based stream of items
///
/// ## Contract
///
/// - `poll_next` never blocks
/// - Repeated `WouldBlock` returns are normal
/// - The stream stays usable after `Other` errors
pub trait Stream {
    /// Type of items produced by the stream
    type Item;

    /// Type of errors that can occur
    type Error;

    /// Attempt to pull the next item
    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error>;

    /// Bounds on immediately available items, like `Iterator::size_hint`
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

impl<S: Stream + ?Sized> Stream for &mut S {
    type Item = S::Item;
    type Error = S::Error;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        (**self).poll_next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (**self).size_hint()
    }
}

/// Fixed-capacity byte queue
///
/// ```rust
/// use cansat_core::traits::{ByteStream, Stream};
///
/// let mut rx: ByteStream<16> = ByteStream::new();
/// assert_eq!(rx.feed(b"$G"), 2);
/// assert_eq!(rx.poll_next(), Ok(b'$'));
/// assert_eq!(rx.poll_next(), Ok(b'G'));
/// assert_eq!(rx.poll_next(), Err(nb::Error::WouldBlock));
/// ```
#[derive(Debug, Default)]
pub struct ByteStream<const N: usize> {
    queue: Deque<u8, N>,
    overruns: usize,
}

impl<const N: usize> ByteStream<N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            overruns: 0,
        }
    }

    /// Append bytes, returning how many fit
    ///
    /// Bytes that do not fit are counted as overruns and dropped.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let mut accepted = 0;
        for &byte in bytes {
            if self.queue.push_back(byte).is_err() {
                self.overruns += bytes.len() - accepted;
                break;
            }
            accepted += 1;
        }
        accepted
    }

    /// Bytes dropped because the queue was full
    pub fn overruns(&self) -> usize {
        self.overruns
    }

    /// Bytes waiting to be read
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<const N: usize> Stream for ByteStream<N> {
    type Item = u8;
    type Error = core::convert::Infallible;

    fn poll_next(&mut self) -> nb::Result<u8, Self::Error> {
        self.queue.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.queue.len(), Some(self.queue.len()))
    }
}
