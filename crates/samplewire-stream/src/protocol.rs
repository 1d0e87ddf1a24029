use std::io::{ErrorKind, Read, Write};

use bytes::BytesMut;
use samplewire_codec::{Capabilities, FormatCodec, ResidualBuffer, SampleMatrix};

use crate::config::{ProtocolConfig, StreamConfig};
use crate::error::Result;
use crate::warning::{Direction, ProtocolWarning, WarningQueue};

/// Receives and sends sample matrices over a byte stream using one wire format.
///
/// The format is fixed for the lifetime of the protocol. Bytes that do not yet
/// form a complete token are kept between calls to [`receive`](Self::receive).
///
/// Nothing here fails: I/O and decode problems end the current call early and
/// are recorded as [`ProtocolWarning`]s for the host to collect.
///
/// A `Protocol` is meant for one owner at a time; callers serialize access.
#[derive(Debug)]
pub struct Protocol {
    codec: FormatCodec,
    capabilities: Capabilities,
    residue: ResidualBuffer,
    warnings: WarningQueue,
    config: StreamConfig,
}

impl Protocol {
    /// Create a protocol with default stream configuration.
    pub fn new(codec: impl Into<FormatCodec>) -> Self {
        Self::with_config(codec, StreamConfig::default())
    }

    /// Create a protocol with explicit stream configuration.
    pub fn with_config(codec: impl Into<FormatCodec>, config: StreamConfig) -> Self {
        let codec: FormatCodec = codec.into();
        Self {
            capabilities: codec.capabilities(),
            codec,
            residue: ResidualBuffer::new(),
            warnings: WarningQueue::new(config.max_pending_warnings),
            config,
        }
    }

    /// Build the codec described by `config` and bind a protocol to it.
    pub fn from_config(config: &ProtocolConfig) -> Result<Self> {
        let codec = FormatCodec::from_config(&config.format)?;
        Ok(Self::with_config(codec, config.stream.clone()))
    }

    /// Narrow the directions this binding accepts, e.g. a receive-only
    /// link to a sensor. Directions the codec lacks stay unsupported.
    pub fn restrict(mut self, allowed: Capabilities) -> Self {
        self.capabilities = self.capabilities.intersect(allowed);
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn can_send(&self) -> bool {
        self.capabilities.send
    }

    pub fn can_receive(&self) -> bool {
        self.capabilities.receive
    }

    /// Drain every byte `source` has available and decode the residue.
    ///
    /// Reads until the source reports end of input or `WouldBlock`, so a
    /// socket or serial port should be in non-blocking mode. Any trailing
    /// partial token stays buffered for the next call.
    pub fn receive<R: Read + ?Sized>(&mut self, source: &mut R) -> SampleMatrix {
        if !self.check(Direction::Receive) {
            return SampleMatrix::new();
        }
        let read = self.drain(source);
        tracing::trace!(read, pending = self.residue.len(), "drained source");
        self.decode()
    }

    /// Append bytes delivered out of band (e.g. a notification payload) and decode.
    pub fn receive_bytes(&mut self, bytes: &[u8]) -> SampleMatrix {
        if !self.check(Direction::Receive) {
            return SampleMatrix::new();
        }
        self.residue.append(bytes);
        self.decode()
    }

    /// Encode `matrix` and write it to `sink`, then flush.
    ///
    /// Returns the number of bytes written, which is short when the sink
    /// failed or closed partway.
    pub fn send<W: Write + ?Sized>(&mut self, sink: &mut W, matrix: &SampleMatrix) -> usize {
        if !self.check(Direction::Send) {
            return 0;
        }

        let mut buf = BytesMut::new();
        if let Err(err) = self.codec.encode(matrix, &mut buf) {
            self.warnings.record(err.into());
            return 0;
        }
        if buf.is_empty() {
            return 0;
        }

        let mut offset = 0usize;
        while offset < buf.len() {
            match sink.write(&buf[offset..]) {
                Ok(0) => {
                    self.warnings.record(ProtocolWarning::SinkClosed {
                        written: offset,
                        total: buf.len(),
                    });
                    return offset;
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => {
                    self.warnings.record(ProtocolWarning::Write {
                        written: offset,
                        source: err,
                    });
                    return offset;
                }
            }
        }

        self.flush(sink);
        tracing::trace!(written = offset, format = self.codec.name(), "sent samples");
        offset
    }

    /// Discard any buffered partial input.
    pub fn clear(&mut self) {
        self.residue.clear();
    }

    /// The bound wire format.
    pub fn codec(&self) -> &FormatCodec {
        &self.codec
    }

    /// Bytes received but not yet decoded.
    pub fn residue(&self) -> &ResidualBuffer {
        &self.residue
    }

    /// Current stream configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Warnings recorded since they were last taken, oldest first.
    pub fn warnings(&self) -> impl Iterator<Item = &ProtocolWarning> {
        self.warnings.iter()
    }

    /// Remove and return all pending warnings.
    pub fn take_warnings(&mut self) -> Vec<ProtocolWarning> {
        self.warnings.take()
    }

    /// Warnings discarded because the queue was full.
    pub fn dropped_warnings(&self) -> u64 {
        self.warnings.dropped()
    }

    fn check(&mut self, direction: Direction) -> bool {
        let supported = match direction {
            Direction::Send => self.capabilities.send,
            Direction::Receive => self.capabilities.receive,
        };
        if !supported {
            self.warnings.record(ProtocolWarning::Unsupported {
                format: self.codec.name(),
                direction,
            });
        }
        supported
    }

    fn drain<R: Read + ?Sized>(&mut self, source: &mut R) -> usize {
        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];
        let mut total = 0usize;
        loop {
            match source.read(&mut chunk) {
                Ok(0) => return total,
                Ok(n) => {
                    self.residue.append(&chunk[..n]);
                    total += n;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return total,
                Err(err) => {
                    self.warnings.record(ProtocolWarning::Read(err));
                    return total;
                }
            }
        }
    }

    fn decode(&mut self) -> SampleMatrix {
        self.residue.decode_with(&self.codec, &mut self.warnings)
    }

    fn flush<W: Write + ?Sized>(&mut self, sink: &mut W) {
        loop {
            match sink.flush() {
                Ok(()) => return,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => {
                    self.warnings.record(ProtocolWarning::Flush(err));
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use samplewire_codec::{
        Capabilities, DecodeWarning, FormatConfig, LineCodec, RecordCodec, TableCodec,
    };

    use super::*;

    #[test]
    fn receive_decodes_everything_available() {
        let mut protocol = Protocol::new(TableCodec::default());
        let matrix = protocol.receive(&mut Cursor::new(b"1,2\n3,4\n".to_vec()));

        assert_eq!(matrix.channel(0), Some(&[1.0, 3.0][..]));
        assert_eq!(matrix.channel(1), Some(&[2.0, 4.0][..]));
        assert!(protocol.residue().is_empty());
        assert_eq!(protocol.warnings().count(), 0);
    }

    #[test]
    fn receive_small_chunks() {
        let config = StreamConfig {
            read_chunk_size: 3,
            ..StreamConfig::default()
        };
        let mut protocol = Protocol::with_config(LineCodec::default(), config);
        let matrix = protocol.receive(&mut Cursor::new(b"10.5\n-2\n7".to_vec()));

        assert_eq!(matrix.channel(0), Some(&[10.5, -2.0][..]));
        assert_eq!(protocol.residue().as_bytes(), b"7");
    }

    #[test]
    fn partial_row_survives_between_receives() {
        let mut protocol = Protocol::new(TableCodec::default());

        let first = protocol.receive(&mut Cursor::new(b"1,2".to_vec()));
        assert!(first.is_empty());
        assert_eq!(protocol.residue().as_bytes(), b"1,2");

        let second = protocol.receive(&mut Cursor::new(b"\n3,4\n".to_vec()));
        assert_eq!(second.channel(0), Some(&[1.0, 3.0][..]));
        assert_eq!(second.channel(1), Some(&[2.0, 4.0][..]));
    }

    #[test]
    fn repeated_receive_does_not_reemit() {
        let mut protocol = Protocol::new(LineCodec::default());
        let first = protocol.receive_bytes(b"1\n2\n");
        assert_eq!(first.sample_count(), 2);

        assert!(protocol.receive(&mut Cursor::new(Vec::new())).is_empty());
        assert!(protocol.receive_bytes(b"").is_empty());
    }

    #[test]
    fn clear_discards_residue() {
        let mut protocol = Protocol::new(TableCodec::default());
        protocol.receive_bytes(b"99,98");
        protocol.clear();

        let matrix = protocol.receive_bytes(b"1,2\n");
        assert_eq!(matrix.channel(0), Some(&[1.0][..]));
        assert_eq!(matrix.channel(1), Some(&[2.0][..]));
    }

    #[test]
    fn would_block_ends_drain_without_waiting() {
        let mut source = WouldBlockThenData {
            blocked: false,
            bytes: b"5\n6\n".to_vec(),
            pos: 0,
        };
        let mut protocol = Protocol::new(LineCodec::default());

        let first = protocol.receive(&mut source);
        assert!(first.is_empty());
        assert_eq!(protocol.warnings().count(), 0);

        let second = protocol.receive(&mut source);
        assert_eq!(second.channel(0), Some(&[5.0, 6.0][..]));
    }

    #[test]
    fn interrupted_read_retries() {
        let mut source = InterruptedThenData {
            interrupted: false,
            bytes: b"8\n".to_vec(),
            pos: 0,
        };
        let mut protocol = Protocol::new(LineCodec::default());
        let matrix = protocol.receive(&mut source);
        assert_eq!(matrix.channel(0), Some(&[8.0][..]));
    }

    #[test]
    fn read_error_keeps_received_bytes_and_warns() {
        let mut source = DataThenError {
            bytes: b"1,2\n3,".to_vec(),
            done: false,
        };
        let mut protocol = Protocol::new(TableCodec::default());

        let matrix = protocol.receive(&mut source);
        assert_eq!(matrix.channel(0), Some(&[1.0][..]));
        assert_eq!(protocol.residue().as_bytes(), b"3,");

        let warnings = protocol.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], ProtocolWarning::Read(e) if e.kind() == ErrorKind::Other));
    }

    #[test]
    fn decode_warnings_are_recorded() {
        let codec = RecordCodec::new(["x"]).unwrap();
        let mut protocol = Protocol::new(codec);
        let matrix = protocol.receive_bytes(b"not json\n{\"x\":{}}\n{\"x\":[4]}\n");

        assert_eq!(matrix.channel(0), Some(&[4.0][..]));
        let warnings = protocol.take_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            &warnings[0],
            ProtocolWarning::Decode(DecodeWarning::InvalidRecord { .. })
        ));
        assert!(matches!(
            &warnings[1],
            ProtocolWarning::Decode(DecodeWarning::UnreadableField { name }) if name == "x"
        ));
    }

    #[test]
    fn send_writes_and_flushes() {
        let mut sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut protocol = Protocol::new(TableCodec::default());

        let matrix = SampleMatrix::from(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let written = protocol.send(&mut sink, &matrix);

        assert_eq!(sink.data, b"1.0,3.0\n2.0,4.0\n");
        assert_eq!(written, sink.data.len());
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn send_line_codec_one_value_per_call() {
        let mut protocol = Protocol::new(LineCodec::default());
        let mut sink = Vec::new();
        let matrix = SampleMatrix::from(vec![vec![0.5, 1.5]]);

        protocol.send(&mut sink, &matrix);
        protocol.send(&mut sink, &matrix);
        assert_eq!(sink, b"0.5\n0.5\n");
    }

    #[test]
    fn send_nothing_for_empty_matrix() {
        let mut protocol = Protocol::new(TableCodec::default());
        let mut sink = ZeroWriter;
        assert_eq!(protocol.send(&mut sink, &SampleMatrix::new()), 0);
        assert_eq!(protocol.warnings().count(), 0);
    }

    #[test]
    fn send_retries_interrupted_and_would_block() {
        let mut sink = FlakyWriter {
            failures: vec![ErrorKind::Interrupted, ErrorKind::WouldBlock],
            data: Vec::new(),
        };
        let mut protocol = Protocol::new(LineCodec::default());
        protocol.send(&mut sink, &SampleMatrix::from(vec![vec![2.0]]));

        assert_eq!(sink.data, b"2.0\n");
        assert_eq!(protocol.warnings().count(), 0);
    }

    #[test]
    fn closed_sink_is_a_warning() {
        let mut protocol = Protocol::new(LineCodec::default());
        let written = protocol.send(&mut ZeroWriter, &SampleMatrix::from(vec![vec![1.0]]));

        assert_eq!(written, 0);
        let warnings = protocol.take_warnings();
        assert!(matches!(
            warnings.as_slice(),
            [ProtocolWarning::SinkClosed { written: 0, total: 4 }]
        ));
    }

    #[test]
    fn write_error_is_a_warning() {
        let mut sink = FlakyWriter {
            failures: vec![ErrorKind::BrokenPipe],
            data: Vec::new(),
        };
        let mut protocol = Protocol::new(TableCodec::default());
        let written = protocol.send(&mut sink, &SampleMatrix::from(vec![vec![1.0]]));

        assert_eq!(written, 0);
        assert!(matches!(
            protocol.take_warnings().as_slice(),
            [ProtocolWarning::Write { written: 0, source }] if source.kind() == ErrorKind::BrokenPipe
        ));
    }

    #[test]
    fn from_config_binds_codec() {
        let config = ProtocolConfig::from(FormatConfig::StructuredLines {
            names: vec!["a".to_string(), "b".to_string()],
        });
        let mut protocol = Protocol::from_config(&config).unwrap();
        assert!(protocol.can_send());
        assert!(protocol.can_receive());
        assert_eq!(protocol.codec().name(), "structured_lines");

        let mut sink = Vec::new();
        protocol.send(&mut sink, &SampleMatrix::from(vec![vec![1.0], vec![2.0, 3.0]]));
        assert_eq!(sink, br#"{"a":[1.0],"b":[2.0,3.0]}"#);
    }

    #[test]
    fn receive_only_binding_refuses_to_send() {
        let mut protocol =
            Protocol::new(TableCodec::default()).restrict(Capabilities::RECEIVE_ONLY);
        assert!(protocol.can_receive());
        assert!(!protocol.can_send());

        let mut sink = Vec::new();
        let written = protocol.send(&mut sink, &SampleMatrix::from(vec![vec![1.0]]));
        assert_eq!(written, 0);
        assert!(sink.is_empty());
        assert!(matches!(
            protocol.take_warnings().as_slice(),
            [ProtocolWarning::Unsupported {
                format: "delimited_table",
                direction: Direction::Send,
            }]
        ));

        let matrix = protocol.receive_bytes(b"1,2\n");
        assert_eq!(matrix.channel(0), Some(&[1.0][..]));
        assert_eq!(protocol.warnings().count(), 0);
    }

    #[test]
    fn send_only_binding_leaves_input_unread() {
        let mut protocol = Protocol::new(LineCodec::default()).restrict(Capabilities::SEND_ONLY);
        let mut source = Cursor::new(b"1\n2\n".to_vec());

        assert!(protocol.receive(&mut source).is_empty());
        assert_eq!(source.position(), 0);
        assert!(protocol.receive_bytes(b"3\n").is_empty());
        assert!(protocol.residue().is_empty());

        let warnings = protocol.take_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| matches!(
            w,
            ProtocolWarning::Unsupported {
                direction: Direction::Receive,
                ..
            }
        )));

        let mut sink = Vec::new();
        protocol.send(&mut sink, &SampleMatrix::from(vec![vec![4.0]]));
        assert_eq!(sink, b"4.0\n");
    }

    #[test]
    fn from_config_rejects_invalid_format() {
        let config = ProtocolConfig::from(FormatConfig::StructuredLines { names: Vec::new() });
        assert!(matches!(
            Protocol::from_config(&config),
            Err(crate::ProtocolError::Codec(_))
        ));
    }

    struct WouldBlockThenData {
        blocked: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.blocked {
                self.blocked = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct DataThenError {
        bytes: Vec<u8>,
        done: bool,
    }

    impl Read for DataThenError {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.done {
                return Err(std::io::Error::other("link dropped"));
            }
            self.done = true;
            let n = self.bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[..n]);
            Ok(n)
        }
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FlakyWriter {
        failures: Vec<ErrorKind>,
        data: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.failures.is_empty() {
                return Err(std::io::Error::from(self.failures.remove(0)));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
