use pkttransfer_driver::{Delivery, LinkIds, PacketTransfer, Port, TransferConfig, TransferStats};
use pkttransfer_frame::checked_buffer_size;
use pkttransfer_link::{MemoryBus, MemoryByteLink};
use tracing::info;

use crate::cmd::{parse_hex, LinkArg, LoopbackArgs};
use crate::exit::{transfer_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_loopback, FrameOutput, LoopbackOutput, OutputFormat, StatsOutput};

const DEFAULT_PAYLOAD: &[u8] = b"hello";

struct Report {
    tasks: usize,
    sender: TransferStats,
    receiver: TransferStats,
}

pub fn run(args: LoopbackArgs, format: OutputFormat) -> CliResult<i32> {
    let payloads = collect_payloads(&args)?;
    let buffer_len = checked_buffer_size(args.max_payload)
        .ok_or_else(|| CliError::new(USAGE, "--max-payload is too large"))?;

    let mut tx_a = vec![0u8; buffer_len];
    let mut rx_a = vec![0u8; buffer_len];
    let mut tx_b = vec![0u8; buffer_len];
    let mut rx_b = vec![0u8; buffer_len];
    let config_a = TransferConfig::new(args.max_payload, &mut tx_a, &mut rx_a)
        .map_err(|err| transfer_error("invalid sender configuration", err))?;
    let config_b = TransferConfig::new(args.max_payload, &mut tx_b, &mut rx_b)
        .map_err(|err| transfer_error("invalid receiver configuration", err))?;

    let mut received: Vec<Vec<u8>> = Vec::new();
    let deliver = |payload: &[u8]| received.push(payload.to_vec());

    let report = match args.link {
        LinkArg::Serial => {
            let (link_a, link_b) = MemoryByteLink::pair();
            let mut sender = PacketTransfer::serial(link_a, ignore, config_a);
            let mut receiver = PacketTransfer::serial(link_b, deliver, config_b);
            pump(&mut sender, &mut receiver, &payloads, args.max_steps)?
        }
        LinkArg::Bus => {
            let bus = MemoryBus::new();
            let mut sender = PacketTransfer::bus(
                bus.node(),
                LinkIds::new(args.tx_id, args.rx_id),
                ignore,
                config_a,
            );
            let mut receiver = PacketTransfer::bus(
                bus.node(),
                LinkIds::new(args.rx_id, args.tx_id),
                deliver,
                config_b,
            );
            pump(&mut sender, &mut receiver, &payloads, args.max_steps)?
        }
    };

    info!(
        link = link_name(args.link),
        frames = received.len(),
        tasks = report.tasks,
        "loopback finished"
    );

    let out = LoopbackOutput {
        link: link_name(args.link),
        tasks: report.tasks,
        delivered: received
            .iter()
            .enumerate()
            .map(|(index, payload)| FrameOutput::new(index, payload))
            .collect(),
        sender: StatsOutput::from(&report.sender),
        receiver: StatsOutput::from(&report.receiver),
    };
    print_loopback(&out, &received, format);

    if received == payloads {
        Ok(SUCCESS)
    } else {
        Err(CliError::new(
            FAILURE,
            "delivered payloads differ from the ones sent",
        ))
    }
}

fn ignore(_: &[u8]) {}

/// Send each payload from `sender` and poll both ends until `receiver`
/// delivers it.
fn pump<PA, DA, PB, DB>(
    sender: &mut PacketTransfer<'_, PA, DA>,
    receiver: &mut PacketTransfer<'_, PB, DB>,
    payloads: &[Vec<u8>],
    max_steps: usize,
) -> CliResult<Report>
where
    PA: Port,
    DA: Delivery,
    PB: Port,
    DB: Delivery,
{
    let mut tasks = 0usize;
    for (index, payload) in payloads.iter().enumerate() {
        sender
            .send(payload)
            .map_err(|err| transfer_error(&format!("send of payload {index} failed"), err))?;

        let mut delivered = false;
        for _ in 0..max_steps {
            tasks += 1;
            sender
                .task()
                .map_err(|err| transfer_error("sender task failed", err))?;
            let outcome = receiver
                .task()
                .map_err(|err| transfer_error("receiver task failed", err))?;
            if outcome.frames_delivered > 0 {
                delivered = true;
                break;
            }
        }

        if !delivered {
            return Err(CliError::new(
                FAILURE,
                format!("payload {index} not delivered within {max_steps} task calls"),
            ));
        }
    }

    Ok(Report {
        tasks,
        sender: *sender.stats(),
        receiver: *receiver.stats(),
    })
}

fn collect_payloads(args: &LoopbackArgs) -> CliResult<Vec<Vec<u8>>> {
    let mut once: Vec<Vec<u8>> = args.payloads.iter().map(|p| p.as_bytes().to_vec()).collect();
    for hex in &args.hex {
        once.push(parse_hex(hex)?);
    }
    if once.is_empty() {
        once.push(DEFAULT_PAYLOAD.to_vec());
    }

    let mut payloads = Vec::with_capacity(once.len() * args.repeat);
    for _ in 0..args.repeat {
        payloads.extend(once.iter().cloned());
    }
    Ok(payloads)
}

fn link_name(link: LinkArg) -> &'static str {
    match link {
        LinkArg::Serial => "serial",
        LinkArg::Bus => "bus",
    }
}
