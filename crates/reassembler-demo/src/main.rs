//! # Reassembler Demo
//!
//! Splits a message into one packet per byte, shuffles the packets, feeds
//! them through a reassembler from a producer task and prints what comes out
//! the other side.
//!
//! ```text
//! reassembler-demo [MESSAGE]
//! ```
//!
//! Logging is configured through the `REASSEMBLER_*` environment variables
//! (see `reassembler-telemetry`).

use anyhow::Context;
use rand::seq::SliceRandom;
use reassembler::{Issue, Reassembler};
use reassembler_telemetry::{init_telemetry, TelemetryConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One byte of the message plus its position.
#[derive(Clone, Copy, Debug)]
struct Packet {
    sequence: u32,
    data: u8,
}

fn render(packets: &[Packet]) -> String {
    String::from_utf8_lossy(&packets.iter().map(|p| p.data).collect::<Vec<_>>()).into_owned()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("initializing telemetry")?;

    let message = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Hello, Assembler!".to_string());
    let length = u32::try_from(message.len()).context("message too long")?;

    let mut packets: Vec<Packet> = (0..length)
        .zip(message.bytes())
        .map(|(sequence, data)| Packet { sequence, data })
        .collect();
    packets.shuffle(&mut rand::thread_rng());
    info!(shuffled = %render(&packets), "Submitting packets");

    let mut reassembler = Reassembler::builder("demo")
        .sequence_fn(|p: &Packet| p.sequence)
        .on_drop(|p: Packet, issue: Issue<u32>| {
            warn!(sequence = p.sequence, issue = %issue, "Packet dropped");
        })
        .build()?;
    let shutdown = CancellationToken::new();
    reassembler.start(0, shutdown.clone())?;

    let submitter = reassembler.submitter()?;
    let producer = tokio::spawn(async move {
        for packet in packets {
            submitter.submit(packet).await?;
        }
        Ok::<_, reassembler::ReassemblerError>(())
    });

    let mut received = Vec::with_capacity(message.len());
    while received.len() < message.len() {
        match reassembler.recv().await {
            Some(packet) => received.push(packet),
            None => break,
        }
    }

    producer.await.context("producer task")??;
    shutdown.cancel();
    reassembler.closed().await;

    let stats = reassembler.stats();
    info!(
        delivered = stats.delivered,
        stale = stats.stale,
        faults = stats.faults,
        "Reassembly finished"
    );
    println!("{}", render(&received));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_joins_bytes() {
        let packets = [
            Packet { sequence: 1, data: b'h' },
            Packet { sequence: 0, data: b'i' },
        ];
        assert_eq!(render(&packets), "hi");
    }
}
