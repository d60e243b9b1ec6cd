use pkttransfer_frame::{crc16, crc16_bytes};

use crate::cmd::CrcArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_crc, to_hex, CrcOutput, OutputFormat};

pub fn run(args: CrcArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    print_crc(&crc_output(&payload), format);
    Ok(SUCCESS)
}

fn crc_output(payload: &[u8]) -> CrcOutput {
    CrcOutput {
        input_size: payload.len(),
        crc: format!("0x{}", hex::encode_upper(crc16(payload).to_be_bytes())),
        wire: to_hex(&crc16_bytes(payload)),
    }
}
