//! Loopback example: a simulated device streams CSV rows in ragged fragments
//! over TCP while the host polls with a non-blocking `receive`, then the host
//! sends the collected samples back as one JSON snapshot.
//!
//! Run with:
//!   cargo run --example serial-loopback --features logging

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use samplewire::codec::{RecordCodec, TableCodec};
use samplewire::logging::{init_logging, LogFormat, LogLevel};
use samplewire::{Protocol, SampleMatrix};

const ROWS: usize = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LogFormat::Text, LogLevel::Debug);

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let device = thread::spawn(
        move || -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            let mut link = TcpStream::connect(addr)?;

            let t: Vec<f64> = (0..ROWS).map(|row| row as f64 * 0.1).collect();
            let y: Vec<f64> = t.iter().map(|t| (t * 3.0).sin()).collect();
            let mut wire = Vec::new();
            let samples = SampleMatrix::from(vec![t, y]);
            Protocol::new(TableCodec::default()).send(&mut wire, &samples);
            // Malformed field: arrives as NaN on the host.
            wire.extend_from_slice(b"0.8,oops\n");

            for fragment in wire.chunks(7) {
                link.write_all(fragment)?;
                thread::sleep(Duration::from_millis(5));
            }

            let mut snapshot = String::new();
            link.read_to_string(&mut snapshot)?;
            Ok(snapshot)
        },
    );

    let (mut link, _) = listener.accept()?;
    link.set_nonblocking(true)?;

    let mut host = Protocol::new(TableCodec::default());
    let mut collected = vec![Vec::new(), Vec::new()];
    while collected[0].len() < ROWS + 1 {
        let matrix = host.receive(&mut link);
        for (index, channel) in matrix.channels().iter().enumerate().take(2) {
            collected[index].extend_from_slice(channel);
        }
        if !matrix.is_empty() {
            eprintln!(
                "[host] +{} rows, {} bytes pending",
                matrix.row_count(),
                host.residue().len()
            );
        }
        for warning in host.take_warnings() {
            eprintln!("[host] warning: {warning}");
        }
        thread::sleep(Duration::from_millis(2));
    }

    link.set_nonblocking(false)?;
    let mut snapshot = Protocol::new(RecordCodec::new(["t", "y"])?);
    let written = snapshot.send(&mut link, &SampleMatrix::from(collected));
    link.shutdown(std::net::Shutdown::Write)?;
    eprintln!("[host] sent {written} byte snapshot");

    let echoed = device
        .join()
        .expect("device thread should not panic")
        .map_err(|err| err.to_string())?;
    eprintln!("[device] received {echoed}");
    Ok(())
}
