//! Chunked transfer-encoding decoder.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size { size: u64, digits: bool },
    /// Skipping a chunk extension up to the end of the size line.
    Extension { size: u64 },
    Data { remaining: u64 },
    /// The CRLF that follows each chunk's data.
    DataEnd,
    /// Trailer lines after the last chunk; `empty` while the line is blank.
    Trailer { empty: bool },
    Done,
}

/// Strips chunk framing from a byte stream fed in arbitrary pieces.
///
/// # Examples
///
/// ```
/// use departures_core::http::ChunkedDecoder;
///
/// let mut decoder = ChunkedDecoder::new();
/// let mut body = Vec::new();
/// decoder.feed(b"5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\n\r\n", &mut body);
/// assert_eq!(body, b"hello world");
/// assert!(decoder.is_done());
/// ```
#[derive(Debug, Clone)]
pub struct ChunkedDecoder {
    state: State,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Size {
                size: 0,
                digits: false,
            },
        }
    }

    /// True once the terminating zero-size chunk and trailers are consumed.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Decode `input`, appending its payload bytes to `out`.
    pub fn feed(&mut self, mut input: &[u8], out: &mut Vec<u8>) {
        while !input.is_empty() {
            if let State::Data { remaining } = self.state {
                let take = usize::try_from(remaining)
                    .unwrap_or(usize::MAX)
                    .min(input.len());
                let (data, rest) = input.split_at(take);
                input = rest;
                let remaining = remaining - take as u64;
                self.state = if remaining == 0 {
                    State::DataEnd
                } else {
                    State::Data { remaining }
                };
                out.extend_from_slice(data);
                continue;
            }

            let byte = input[0];
            input = &input[1..];
            self.state = match (self.state, byte) {
                (State::Size { size, .. }, b) if b.is_ascii_hexdigit() => {
                    let digit = u64::from(char::from(b).to_digit(16).unwrap_or(0));
                    State::Size {
                        size: size.saturating_mul(16).saturating_add(digit),
                        digits: true,
                    }
                }
                (State::Size { size, .. }, b';') => State::Extension { size },
                (State::Size { size, digits }, b'\n') => {
                    if !digits {
                        // Blank line between chunks
                        State::Size { size, digits }
                    } else {
                        Self::chunk_start(size)
                    }
                }
                (State::Extension { size }, b'\n') => Self::chunk_start(size),
                (state @ (State::Size { .. } | State::Extension { .. }), _) => state,
                (State::DataEnd, b'\n') => State::Size {
                    size: 0,
                    digits: false,
                },
                (State::DataEnd, _) => State::DataEnd,
                (State::Trailer { empty: true }, b'\n') => State::Done,
                (State::Trailer { .. }, b'\n') => State::Trailer { empty: true },
                (State::Trailer { empty }, b'\r') => State::Trailer { empty },
                (State::Trailer { .. }, _) => State::Trailer { empty: false },
                (state @ (State::Done | State::Data { .. }), _) => state,
            };
        }
    }

    fn chunk_start(size: u64) -> State {
        if size == 0 {
            State::Trailer { empty: true }
        } else {
            State::Data { remaining: size }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_in_pieces(input: &[u8], piece: usize) -> (Vec<u8>, bool) {
        let mut decoder = ChunkedDecoder::new();
        let mut out = Vec::new();
        for part in input.chunks(piece) {
            decoder.feed(part, &mut out);
        }
        (out, decoder.is_done())
    }

    #[test]
    fn decodes_regardless_of_piece_size() {
        let input = b"4\r\nWiki\r\n5\r\npedia\r\nE\r\n in\r\n\r\nchunks.\r\n0\r\n\r\n";
        for piece in [1, 2, 3, 7, input.len()] {
            let (out, done) = decode_in_pieces(input, piece);
            assert_eq!(out, b"Wikipedia in\r\n\r\nchunks.", "piece size {piece}");
            assert!(done);
        }
    }

    #[test]
    fn trailers_are_skipped() {
        let (out, done) = decode_in_pieces(b"3\r\nabc\r\n0\r\nX-Trailer: 1\r\n\r\n", 4);
        assert_eq!(out, b"abc");
        assert!(done);
    }

    #[test]
    fn cut_off_stream_is_not_done() {
        let (out, done) = decode_in_pieces(b"5\r\nhel", 2);
        assert_eq!(out, b"hel");
        assert!(!done);

        let (out, done) = decode_in_pieces(b"3\r\nabc\r\n", 2);
        assert_eq!(out, b"abc");
        assert!(!done);
    }

    #[test]
    fn bytes_after_done_are_ignored() {
        let (out, done) = decode_in_pieces(b"0\r\n\r\ngarbage", 100);
        assert!(out.is_empty());
        assert!(done);
    }
}
