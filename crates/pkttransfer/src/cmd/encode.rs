use pkttransfer_frame::{FrameConfig, FrameError, FrameWriter};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, to_hex, EncodeOutput, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let wire =
        encode(&payload, args.max_payload).map_err(|err| frame_error("encode failed", err))?;

    let out = EncodeOutput {
        payload_size: payload.len(),
        wire_size: wire.len(),
        wire: to_hex(&wire),
    };
    print_encoded(&out, &wire, format);
    Ok(SUCCESS)
}

fn encode(payload: &[u8], max_payload: usize) -> Result<Vec<u8>, FrameError> {
    let config = FrameConfig {
        max_payload_size: max_payload,
    };
    let mut writer = FrameWriter::with_config(Vec::new(), config);
    writer.send(payload)?;
    Ok(writer.into_inner())
}
