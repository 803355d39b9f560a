//! WebSocket framing.
//!
//! This module reads and writes single WebSocket frames as defined in
//! RFC 6455 section 5: header bits, extended payload lengths, masking and
//! payload extraction.

use std::io::{Read, Write};

use rand::{Rng, SeedableRng};

use crate::errors::CodecError;

const FIN_MASK: u8 = 0x80;
const OPCODE_MASK: u8 = 0x0F;
const MASKBIT_MASK: u8 = 0x80;
const LENGTH_MASK: u8 = 0x7F;

/// Frame type identifier, the low nibble of the first header byte.
///
/// Values 0x3-0x7 and 0xB-0xF are reserved by RFC 6455 and rejected on read.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl Opcode {
    /// Whether this opcode marks a control frame (close, ping or pong).
    /// Control frames must fit in a single frame with a payload of at most
    /// 125 bytes.
    #[must_use]
    pub fn is_control(self) -> bool {
        matches!(self, Opcode::Close | Opcode::Ping | Opcode::Pong)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            x => Err(CodecError::UnknownOpcode(x)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        value as u8
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::Continuation => write!(f, "continuation"),
            Opcode::Text => write!(f, "text"),
            Opcode::Binary => write!(f, "binary"),
            Opcode::Close => write!(f, "close"),
            Opcode::Ping => write!(f, "ping"),
            Opcode::Pong => write!(f, "pong"),
        }
    }
}

/// A single WebSocket frame, the unit the codec reads and writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) fin: bool,
    pub(crate) opcode: Opcode,
    pub(crate) masked: bool,
    pub(crate) payload: Vec<u8>,
}

/// XOR the payload byte-wise with the 4-byte key. Applying the same key
/// twice restores the original bytes.
fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Reads and writes single frames over a blocking byte stream.
///
/// The codec owns the RNG that produces masking keys, seeded from the
/// operating system.
#[derive(Debug)]
pub(crate) struct FrameCodec {
    rng: rand::rngs::StdRng,
}

impl FrameCodec {
    pub(crate) fn new() -> Self {
        Self {
            rng: rand::rngs::StdRng::from_os_rng(),
        }
    }

    /// Read one frame, blocking until the full frame is delivered or the
    /// transport fails.
    ///
    /// Incoming frames are accepted masked or unmasked. The RSV bits are
    /// ignored since this implementation negotiates no extensions.
    pub(crate) fn read_frame<R>(&mut self, reader: &mut R) -> Result<Frame, CodecError>
    where
        R: Read + ?Sized,
    {
        let mut header = [0u8; 2];
        reader.read_exact(&mut header)?;

        let fin = header[0] & FIN_MASK != 0;
        let opcode = Opcode::try_from(header[0] & OPCODE_MASK)?;
        let masked = header[1] & MASKBIT_MASK != 0;

        let payload_len = match header[1] & LENGTH_MASK {
            len @ 0..=125 => len as usize,
            126 => {
                let mut ext = [0u8; 2];
                reader.read_exact(&mut ext)?;
                u16::from_be_bytes(ext) as usize
            }
            127 => {
                let mut ext = [0u8; 8];
                reader.read_exact(&mut ext)?;
                let len = u64::from_be_bytes(ext);
                if len & 0x8000_0000_0000_0000 != 0 {
                    return Err(CodecError::Length(len));
                }
                usize::try_from(len).map_err(|_| CodecError::Length(len))?
            }
            128.. => unreachable!(),
        };

        if opcode.is_control() {
            if !fin {
                return Err(CodecError::Protocol("control frame must not be fragmented"));
            }
            if payload_len > 125 {
                return Err(CodecError::Protocol(
                    "control frame payload exceeds 125 bytes",
                ));
            }
        }

        let masking_key = if masked {
            let mut key = [0u8; 4];
            reader.read_exact(&mut key)?;
            Some(key)
        } else {
            None
        };

        let mut payload = vec![0u8; payload_len];
        reader.read_exact(&mut payload)?;
        if let Some(key) = masking_key {
            apply_mask(&mut payload, key);
        }

        Ok(Frame {
            fin,
            opcode,
            masked,
            payload,
        })
    }

    /// Serialize one frame and write it to the transport as a single
    /// operation.
    ///
    /// When the frame is masked, a fresh 4-byte key is drawn from the
    /// OS-seeded RNG and the payload is XOR-masked with it.
    pub(crate) fn write_frame<W>(&mut self, writer: &mut W, frame: &Frame) -> Result<(), CodecError>
    where
        W: Write + ?Sized,
    {
        let len = frame.payload.len();
        let mut buf = Vec::with_capacity(len + 14);

        let mut byte1 = u8::from(frame.opcode);
        if frame.fin {
            byte1 |= FIN_MASK;
        }
        buf.push(byte1);

        let maskbit = if frame.masked { MASKBIT_MASK } else { 0 };
        match len {
            ..=125 => {
                #[allow(clippy::cast_possible_truncation, reason = "len fits in 7 bits")]
                buf.push(maskbit | len as u8);
            }
            126..=0xFFFF => {
                buf.push(maskbit | 126);
                #[allow(clippy::cast_possible_truncation, reason = "len fits in 16 bits")]
                buf.extend_from_slice(&(len as u16).to_be_bytes());
            }
            _ => {
                buf.push(maskbit | 127);
                buf.extend_from_slice(&(len as u64).to_be_bytes());
            }
        }

        if frame.masked {
            let key: [u8; 4] = self.rng.random();
            buf.extend_from_slice(&key);
            let mut payload = frame.payload.clone();
            apply_mask(&mut payload, key);
            buf.extend_from_slice(&payload);
        } else {
            buf.extend_from_slice(&frame.payload);
        }

        writer.write_all(&buf)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    mod opcode {
        use super::*;

        #[test]
        fn wire_values_round_trip() {
            for opcode in [
                Opcode::Continuation,
                Opcode::Text,
                Opcode::Binary,
                Opcode::Close,
                Opcode::Ping,
                Opcode::Pong,
            ] {
                assert_eq!(Opcode::try_from(u8::from(opcode)).unwrap(), opcode);
            }
            assert_eq!(u8::from(Opcode::Continuation), 0x0);
            assert_eq!(u8::from(Opcode::Text), 0x1);
            assert_eq!(u8::from(Opcode::Binary), 0x2);
            assert_eq!(u8::from(Opcode::Close), 0x8);
            assert_eq!(u8::from(Opcode::Ping), 0x9);
            assert_eq!(u8::from(Opcode::Pong), 0xA);
        }

        #[test]
        fn reserved_values_rejected() {
            for value in [0x3, 0x4, 0x5, 0x6, 0x7, 0xB, 0xC, 0xD, 0xE, 0xF] {
                assert!(matches!(
                    Opcode::try_from(value),
                    Err(CodecError::UnknownOpcode(v)) if v == value
                ));
            }
        }

        #[test]
        fn control_classification() {
            assert!(Opcode::Close.is_control());
            assert!(Opcode::Ping.is_control());
            assert!(Opcode::Pong.is_control());
            assert!(!Opcode::Continuation.is_control());
            assert!(!Opcode::Text.is_control());
            assert!(!Opcode::Binary.is_control());
        }
    }

    mod frame_io {
        use super::*;

        fn round_trip(frame: &Frame) -> Frame {
            let mut codec = FrameCodec::new();
            let mut buf = Vec::new();
            codec.write_frame(&mut buf, frame).unwrap();
            codec.read_frame(&mut Cursor::new(buf)).unwrap()
        }

        #[test]
        fn round_trip_all_opcodes_and_mask_flags() {
            for opcode in [Opcode::Text, Opcode::Binary, Opcode::Ping, Opcode::Pong] {
                for masked in [false, true] {
                    for len in [0usize, 1, 125, 126, 127, 4096, 65535, 65536, 65546] {
                        if opcode.is_control() && len > 125 {
                            continue;
                        }
                        let frame = Frame {
                            fin: true,
                            opcode,
                            masked,
                            payload: vec![0xA5; len],
                        };
                        let decoded = round_trip(&frame);
                        assert_eq!(decoded, frame, "opcode {opcode} masked {masked} len {len}");
                    }
                }
            }
        }

        #[test]
        fn round_trip_non_final_data_frame() {
            let frame = Frame {
                fin: false,
                opcode: Opcode::Text,
                masked: true,
                payload: b"fragment".to_vec(),
            };
            assert_eq!(round_trip(&frame), frame);
        }

        #[test]
        fn length_indicator_selection() {
            let mut codec = FrameCodec::new();
            for (len, indicator) in [
                (0usize, 0u8),
                (1, 1),
                (125, 125),
                (126, 126),
                (65535, 126),
                (65536, 127),
                (70000, 127),
            ] {
                let mut buf = Vec::new();
                let frame = Frame {
                    fin: true,
                    opcode: Opcode::Binary,
                    masked: false,
                    payload: vec![0; len],
                };
                codec.write_frame(&mut buf, &frame).unwrap();
                assert_eq!(buf[1] & LENGTH_MASK, indicator, "len {len}");
                match indicator {
                    126 => {
                        assert_eq!(u16::from_be_bytes([buf[2], buf[3]]) as usize, len);
                    }
                    127 => {
                        let mut ext = [0u8; 8];
                        ext.copy_from_slice(&buf[2..10]);
                        assert_eq!(u64::from_be_bytes(ext) as usize, len);
                    }
                    _ => {}
                }
            }
        }

        #[test]
        fn masked_frame_sets_mask_bit_and_scrambles_payload() {
            let mut codec = FrameCodec::new();
            let mut buf = Vec::new();
            let frame = Frame {
                fin: true,
                opcode: Opcode::Text,
                masked: true,
                payload: b"Hello".to_vec(),
            };
            codec.write_frame(&mut buf, &frame).unwrap();

            assert_eq!(buf[0], 0x81);
            assert_eq!(buf[1], 0x85);
            let key = [buf[2], buf[3], buf[4], buf[5]];
            let mut payload = buf[6..11].to_vec();
            apply_mask(&mut payload, key);
            assert_eq!(payload, b"Hello");
        }

        #[test]
        fn unknown_wire_opcode_rejected() {
            let mut codec = FrameCodec::new();
            let result = codec.read_frame(&mut Cursor::new(vec![0x83, 0x00]));
            assert!(matches!(result, Err(CodecError::UnknownOpcode(0x3))));
        }

        #[test]
        fn fragmented_control_frame_rejected() {
            let mut codec = FrameCodec::new();
            // FIN clear on a ping frame
            let result = codec.read_frame(&mut Cursor::new(vec![0x09, 0x00]));
            assert!(matches!(result, Err(CodecError::Protocol(_))));
        }

        #[test]
        fn oversized_control_frame_rejected() {
            let mut codec = FrameCodec::new();
            let mut bytes = vec![0x89, 126, 0x00, 126];
            bytes.extend_from_slice(&[0u8; 126]);
            let result = codec.read_frame(&mut Cursor::new(bytes));
            assert!(matches!(result, Err(CodecError::Protocol(_))));
        }

        #[test]
        fn sixty_four_bit_length_with_high_bit_rejected() {
            let mut codec = FrameCodec::new();
            let mut bytes = vec![0x82, 127];
            bytes.extend_from_slice(&0x8000_0000_0000_0001u64.to_be_bytes());
            let result = codec.read_frame(&mut Cursor::new(bytes));
            assert!(matches!(result, Err(CodecError::Length(_))));
        }

        #[test]
        fn truncated_frame_surfaces_io_error() {
            let mut codec = FrameCodec::new();
            // Declares 5 payload bytes but carries only 2.
            let result = codec.read_frame(&mut Cursor::new(vec![0x81, 0x05, b'H', b'e']));
            assert!(matches!(result, Err(CodecError::Io(_))));
        }
    }
}
