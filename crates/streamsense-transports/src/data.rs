//! TCP data channel between an outlet and one inlet
//!
//! Connection setup:
//! ```text
//! inlet  -> outlet : "SSDC" | version u16 | uid_len u16 | uid bytes
//! outlet -> inlet  : status u8 [| channel_count u32 | format tag u8]   (fields only when accepted)
//! ```
//! After an accepted handshake the outlet writes [`DataFrame`]s. All integers
//! are little-endian.

use crate::common::{TransportError, TransportResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use streamsense_types::{ChannelFormat, StreamDescriptor};
use tracing::debug;

pub const DATA_MAGIC: [u8; 4] = *b"SSDC";
pub const DATA_PROTOCOL_VERSION: u16 = 1;

/// Longest uid accepted in a handshake
pub const MAX_UID_LEN: usize = 1024;

/// Largest channel count a reply may announce
pub const MAX_CHANNEL_COUNT: u32 = 1 << 16;

const FRAME_SAMPLE: u8 = 1;
const FRAME_END_OF_STREAM: u8 = 2;

/// Outcome of a data-channel handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandshakeStatus {
    Accepted = 0,
    /// The outlet at this address does not serve the requested uid
    UnknownStream = 1,
    VersionMismatch = 2,
}

impl HandshakeStatus {
    pub fn from_u8(value: u8) -> TransportResult<Self> {
        match value {
            0 => Ok(Self::Accepted),
            1 => Ok(Self::UnknownStream),
            2 => Ok(Self::VersionMismatch),
            other => Err(TransportError::InvalidMessage(format!(
                "unknown handshake status {}",
                other
            ))),
        }
    }
}

/// Handshake opening a data channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub version: u16,
    pub uid: String,
}

impl Handshake {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            version: DATA_PROTOCOL_VERSION,
            uid: uid.into(),
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> TransportResult<()> {
        let uid = self.uid.as_bytes();
        if uid.len() > MAX_UID_LEN {
            return Err(TransportError::MessageTooLarge {
                size: uid.len(),
                max_size: MAX_UID_LEN,
            });
        }
        w.write_all(&DATA_MAGIC)?;
        w.write_u16::<LittleEndian>(self.version)?;
        w.write_u16::<LittleEndian>(uid.len() as u16)?;
        w.write_all(uid)?;
        w.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> TransportResult<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic).map_err(map_read_error)?;
        if magic != DATA_MAGIC {
            return Err(TransportError::InvalidMessage(
                "not a data channel handshake".to_string(),
            ));
        }
        let version = r.read_u16::<LittleEndian>().map_err(map_read_error)?;
        let len = r.read_u16::<LittleEndian>().map_err(map_read_error)? as usize;
        if len > MAX_UID_LEN {
            return Err(TransportError::MessageTooLarge {
                size: len,
                max_size: MAX_UID_LEN,
            });
        }
        let mut uid = vec![0u8; len];
        r.read_exact(&mut uid).map_err(map_read_error)?;
        let uid = String::from_utf8(uid)
            .map_err(|_| TransportError::InvalidMessage("uid is not UTF-8".to_string()))?;
        Ok(Self { version, uid })
    }
}

/// Outlet's answer to a [`Handshake`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeReply {
    pub status: HandshakeStatus,
    /// Zero unless accepted
    pub channel_count: usize,
    pub channel_format: ChannelFormat,
}

impl HandshakeReply {
    pub fn accepted(channel_count: usize, channel_format: ChannelFormat) -> Self {
        Self {
            status: HandshakeStatus::Accepted,
            channel_count,
            channel_format,
        }
    }

    pub fn rejected(status: HandshakeStatus) -> Self {
        Self {
            status,
            channel_count: 0,
            channel_format: ChannelFormat::Float32,
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> TransportResult<()> {
        w.write_u8(self.status as u8)?;
        if self.status == HandshakeStatus::Accepted {
            w.write_u32::<LittleEndian>(self.channel_count as u32)?;
            w.write_u8(self.channel_format.tag())?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> TransportResult<Self> {
        let status = HandshakeStatus::from_u8(r.read_u8().map_err(map_read_error)?)?;
        if status != HandshakeStatus::Accepted {
            return Ok(Self::rejected(status));
        }
        let channel_count = r.read_u32::<LittleEndian>().map_err(map_read_error)?;
        if channel_count == 0 || channel_count > MAX_CHANNEL_COUNT {
            return Err(TransportError::InvalidMessage(format!(
                "implausible channel count {}",
                channel_count
            )));
        }
        let channel_format = ChannelFormat::from_tag(r.read_u8().map_err(map_read_error)?)?;
        Ok(Self::accepted(channel_count as usize, channel_format))
    }
}

/// One unit on an established data channel
#[derive(Debug, Clone, PartialEq)]
pub enum DataFrame {
    Sample { timestamp: f64, values: Vec<f64> },
    /// The outlet is closing; nothing follows
    EndOfStream,
}

/// Encodes and decodes frames for a fixed channel layout
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    channel_count: usize,
    channel_format: ChannelFormat,
}

impl FrameCodec {
    pub fn new(channel_count: usize, channel_format: ChannelFormat) -> Self {
        Self {
            channel_count,
            channel_format,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn channel_format(&self) -> ChannelFormat {
        self.channel_format
    }

    /// Encoded size of one sample frame
    pub fn sample_frame_len(&self) -> usize {
        1 + 8 + self.channel_count * self.channel_format.byte_width()
    }

    pub fn write_frame<W: Write>(&self, w: &mut W, frame: &DataFrame) -> TransportResult<()> {
        match frame {
            DataFrame::Sample { timestamp, values } => {
                if values.len() != self.channel_count {
                    return Err(TransportError::InvalidMessage(format!(
                        "sample has {} values, channel layout has {}",
                        values.len(),
                        self.channel_count
                    )));
                }
                w.write_u8(FRAME_SAMPLE)?;
                w.write_f64::<LittleEndian>(*timestamp)?;
                for &value in values {
                    self.write_value(w, value)?;
                }
            }
            DataFrame::EndOfStream => w.write_u8(FRAME_END_OF_STREAM)?,
        }
        Ok(())
    }

    pub fn read_frame<R: Read>(&self, r: &mut R) -> TransportResult<DataFrame> {
        match r.read_u8().map_err(map_read_error)? {
            FRAME_SAMPLE => {
                let timestamp = r.read_f64::<LittleEndian>().map_err(map_read_error)?;
                let mut values = Vec::with_capacity(self.channel_count);
                for _ in 0..self.channel_count {
                    values.push(self.read_value(r).map_err(map_read_error)?);
                }
                Ok(DataFrame::Sample { timestamp, values })
            }
            FRAME_END_OF_STREAM => Ok(DataFrame::EndOfStream),
            tag => Err(TransportError::InvalidMessage(format!(
                "unknown frame tag {}",
                tag
            ))),
        }
    }

    // Integer formats saturate at the type bounds (`as` casts from f64).
    fn write_value<W: Write>(&self, w: &mut W, value: f64) -> std::io::Result<()> {
        match self.channel_format {
            ChannelFormat::Float32 => w.write_f32::<LittleEndian>(value as f32),
            ChannelFormat::Double64 => w.write_f64::<LittleEndian>(value),
            ChannelFormat::Int32 => w.write_i32::<LittleEndian>(value as i32),
            ChannelFormat::Int16 => w.write_i16::<LittleEndian>(value as i16),
            ChannelFormat::Int8 => w.write_i8(value as i8),
        }
    }

    fn read_value<R: Read>(&self, r: &mut R) -> std::io::Result<f64> {
        Ok(match self.channel_format {
            ChannelFormat::Float32 => f64::from(r.read_f32::<LittleEndian>()?),
            ChannelFormat::Double64 => r.read_f64::<LittleEndian>()?,
            ChannelFormat::Int32 => f64::from(r.read_i32::<LittleEndian>()?),
            ChannelFormat::Int16 => f64::from(r.read_i16::<LittleEndian>()?),
            ChannelFormat::Int8 => f64::from(r.read_i8()?),
        })
    }
}

fn map_read_error(e: std::io::Error) -> TransportError {
    match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            TransportError::ConnectionClosed
        }
        _ => TransportError::Io(e),
    }
}

/// Connect to `address` and request the stream `uid`.
///
/// On success the returned socket is blocking with no read timeout and is
/// positioned at the first frame.
pub fn connect_data_channel(
    address: &str,
    uid: &str,
    timeout: Duration,
) -> TransportResult<(TcpStream, FrameCodec)> {
    let addrs = address
        .to_socket_addrs()
        .map_err(|e| TransportError::ConnectFailed(format!("cannot resolve {}: {}", address, e)))?;

    let mut last_error = None;
    let mut stream = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(s) => {
                stream = Some(s);
                break;
            }
            Err(e) => last_error = Some(e),
        }
    }
    let mut stream = stream.ok_or_else(|| {
        TransportError::ConnectFailed(format!(
            "{}: {}",
            address,
            last_error.map(|e| e.to_string()).unwrap_or_else(|| "no address".to_string())
        ))
    })?;

    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    Handshake::new(uid).write_to(&mut stream)?;
    let reply = HandshakeReply::read_from(&mut stream).map_err(|e| match e {
        TransportError::Io(io) if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
            TransportError::ConnectFailed(format!("{}: handshake timed out", address))
        }
        other => other,
    })?;

    match reply.status {
        HandshakeStatus::Accepted => {}
        HandshakeStatus::UnknownStream => {
            return Err(TransportError::UnknownStream(format!(
                "{} does not serve stream {}",
                address, uid
            )))
        }
        HandshakeStatus::VersionMismatch => {
            return Err(TransportError::VersionMismatch {
                local: DATA_PROTOCOL_VERSION,
                remote: 0,
            })
        }
    }

    stream.set_read_timeout(None)?;
    stream.set_write_timeout(None)?;
    debug!(
        "[DATA] Connected to {} for stream {} ({} x {})",
        address, uid, reply.channel_count, reply.channel_format
    );
    Ok((stream, FrameCodec::new(reply.channel_count, reply.channel_format)))
}

/// Outlet side of the handshake. Returns a codec when the peer asked for
/// `descriptor`; otherwise the rejection has already been sent.
pub fn accept_data_channel(
    stream: &mut TcpStream,
    descriptor: &StreamDescriptor,
    timeout: Duration,
) -> TransportResult<Option<FrameCodec>> {
    stream.set_read_timeout(Some(timeout))?;
    let handshake = Handshake::read_from(stream)?;
    stream.set_read_timeout(None)?;

    let reply = if handshake.version != DATA_PROTOCOL_VERSION {
        HandshakeReply::rejected(HandshakeStatus::VersionMismatch)
    } else if handshake.uid != descriptor.uid() {
        HandshakeReply::rejected(HandshakeStatus::UnknownStream)
    } else {
        HandshakeReply::accepted(descriptor.channel_count(), descriptor.channel_format())
    };
    reply.write_to(stream)?;

    if reply.status == HandshakeStatus::Accepted {
        stream.set_nodelay(true)?;
        Ok(Some(FrameCodec::new(
            descriptor.channel_count(),
            descriptor.channel_format(),
        )))
    } else {
        debug!(
            "[DATA] Rejected handshake for '{}' (version {}): {:?}",
            handshake.uid, handshake.version, reply.status
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_handshake_layout() {
        let mut buf = Vec::new();
        Handshake::new("abc").write_to(&mut buf).unwrap();
        assert_eq!(&buf[..4], b"SSDC");
        assert_eq!(&buf[4..6], &[1, 0]);
        assert_eq!(&buf[6..8], &[3, 0]);
        assert_eq!(&buf[8..], b"abc");

        let parsed = Handshake::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(parsed, Handshake::new("abc"));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let err = Handshake::read_from(&mut Cursor::new(b"HTTP/1.1".to_vec())).unwrap_err();
        assert!(matches!(err, TransportError::InvalidMessage(_)));
    }

    #[test]
    fn test_rejected_reply_carries_no_layout() {
        let mut buf = Vec::new();
        HandshakeReply::rejected(HandshakeStatus::UnknownStream)
            .write_to(&mut buf)
            .unwrap();
        assert_eq!(buf, vec![1]);
        let reply = HandshakeReply::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(reply.status, HandshakeStatus::UnknownStream);
    }

    #[test]
    fn test_float32_frame_size_and_precision() {
        let codec = FrameCodec::new(4, ChannelFormat::Float32);
        let frame = DataFrame::Sample {
            timestamp: 12.5,
            values: vec![1.0, 2.5, -3.25, 99.0],
        };
        let mut buf = Vec::new();
        codec.write_frame(&mut buf, &frame).unwrap();
        assert_eq!(buf.len(), codec.sample_frame_len());
        assert_eq!(buf.len(), 1 + 8 + 16);
        assert_eq!(codec.read_frame(&mut Cursor::new(buf)).unwrap(), frame);
    }

    #[test]
    fn test_int8_saturates() {
        let codec = FrameCodec::new(2, ChannelFormat::Int8);
        let mut buf = Vec::new();
        codec
            .write_frame(
                &mut buf,
                &DataFrame::Sample {
                    timestamp: 0.0,
                    values: vec![500.0, -500.0],
                },
            )
            .unwrap();
        match codec.read_frame(&mut Cursor::new(buf)).unwrap() {
            DataFrame::Sample { values, .. } => assert_eq!(values, vec![127.0, -128.0]),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_wrong_value_count_is_not_written() {
        let codec = FrameCodec::new(3, ChannelFormat::Double64);
        let mut buf = Vec::new();
        let err = codec
            .write_frame(
                &mut buf,
                &DataFrame::Sample {
                    timestamp: 0.0,
                    values: vec![1.0],
                },
            )
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidMessage(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_truncated_frame_reports_closed() {
        let codec = FrameCodec::new(2, ChannelFormat::Double64);
        let err = codec
            .read_frame(&mut Cursor::new(vec![FRAME_SAMPLE, 0, 0]))
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }
}
