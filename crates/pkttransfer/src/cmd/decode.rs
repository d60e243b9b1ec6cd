use std::fs;
use std::io::Read;

use pkttransfer_frame::{checked_buffer_size, decode_stream};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_decoded, DecodeOutput, FrameOutput, OutputFormat, StatsOutput};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    if checked_buffer_size(args.max_payload).is_none() {
        return Err(CliError::new(USAGE, "--max-payload is too large"));
    }
    let wire = read_wire(&args)?;
    let (frames, stats) = decode_stream(&wire, args.max_payload);

    if frames.is_empty() && !wire.is_empty() {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "no valid frames in {} input bytes ({} dropped)",
                wire.len(),
                stats.dropped_total()
            ),
        ));
    }

    let payloads: Vec<&[u8]> = frames.iter().map(|frame| &frame[..]).collect();
    let out = DecodeOutput {
        frames: payloads
            .iter()
            .enumerate()
            .map(|(index, payload)| FrameOutput::new(index, payload))
            .collect(),
        stats: StatsOutput::from(&stats),
    };
    print_decoded(&out, &payloads, format);
    Ok(SUCCESS)
}

fn read_wire(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }

    let mut wire = Vec::new();
    std::io::stdin()
        .read_to_end(&mut wire)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(wire)
}
