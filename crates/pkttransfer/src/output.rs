use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pkttransfer_driver::TransferStats;
use pkttransfer_frame::ReaderStats;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Receive and drop counters, shared by the decode and loopback reports.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_sent: Option<u64>,
    pub frames_started: u64,
    pub frames_received: u64,
    pub dropped_overflow: u64,
    pub dropped_bad_escape: u64,
    pub dropped_crc: u64,
    pub dropped_runt: u64,
}

impl From<&ReaderStats> for StatsOutput {
    fn from(stats: &ReaderStats) -> Self {
        Self {
            frames_sent: None,
            frames_started: stats.frames_started,
            frames_received: stats.frames_received,
            dropped_overflow: stats.dropped_overflow,
            dropped_bad_escape: stats.dropped_bad_escape,
            dropped_crc: stats.dropped_crc,
            dropped_runt: stats.dropped_runt,
        }
    }
}

impl From<&TransferStats> for StatsOutput {
    fn from(stats: &TransferStats) -> Self {
        Self {
            frames_sent: Some(stats.frames_sent),
            frames_started: stats.frames_started,
            frames_received: stats.frames_received,
            dropped_overflow: stats.dropped_overflow,
            dropped_bad_escape: stats.dropped_bad_escape,
            dropped_crc: stats.dropped_crc,
            dropped_runt: stats.dropped_runt,
        }
    }
}

impl StatsOutput {
    fn rows(&self) -> Vec<(&'static str, u64)> {
        let mut rows = Vec::with_capacity(7);
        if let Some(sent) = self.frames_sent {
            rows.push(("frames_sent", sent));
        }
        rows.extend([
            ("frames_started", self.frames_started),
            ("frames_received", self.frames_received),
            ("dropped_overflow", self.dropped_overflow),
            ("dropped_bad_escape", self.dropped_bad_escape),
            ("dropped_crc", self.dropped_crc),
            ("dropped_runt", self.dropped_runt),
        ]);
        rows
    }

    fn pretty(&self) -> String {
        self.rows()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One payload, as printed by `decode` and `loopback`.
#[derive(Debug, Serialize)]
pub struct FrameOutput {
    pub index: usize,
    pub payload_size: usize,
    pub payload: String,
    pub hex: String,
}

impl FrameOutput {
    pub fn new(index: usize, payload: &[u8]) -> Self {
        Self {
            index,
            payload_size: payload.len(),
            payload: payload_preview(payload),
            hex: to_hex(payload),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CrcOutput {
    pub input_size: usize,
    pub crc: String,
    pub wire: String,
}

#[derive(Debug, Serialize)]
pub struct EncodeOutput {
    pub payload_size: usize,
    pub wire_size: usize,
    pub wire: String,
}

#[derive(Debug, Serialize)]
pub struct DecodeOutput {
    pub frames: Vec<FrameOutput>,
    pub stats: StatsOutput,
}

#[derive(Debug, Serialize)]
pub struct LoopbackOutput {
    pub link: &'static str,
    pub tasks: usize,
    pub delivered: Vec<FrameOutput>,
    pub sender: StatsOutput,
    pub receiver: StatsOutput,
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_crc(out: &CrcOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["INPUT SIZE", "CRC", "WIRE (LE)"]);
            table.add_row(vec![out.input_size.to_string(), out.crc.clone(), out.wire.clone()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("size={} crc={} wire={}", out.input_size, out.crc, out.wire);
        }
        OutputFormat::Raw => println!("{}", out.crc),
    }
}

pub fn print_encoded(out: &EncodeOutput, wire: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["PAYLOAD SIZE", "WIRE SIZE", "WIRE"]);
            table.add_row(vec![
                out.payload_size.to_string(),
                out.wire_size.to_string(),
                out.wire.clone(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", out.wire),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_decoded(out: &DecodeOutput, payloads: &[&[u8]], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            println!("{}", frames_table(&out.frames));
            println!("{}", stats_table(&[("decoder", &out.stats)]));
        }
        OutputFormat::Pretty => {
            print_frames_pretty(&out.frames);
            println!("stats: {}", out.stats.pretty());
        }
        OutputFormat::Raw => {
            for payload in payloads {
                print_raw(payload);
            }
        }
    }
}

pub fn print_loopback(out: &LoopbackOutput, payloads: &[Vec<u8>], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            println!("{}", frames_table(&out.delivered));
            println!(
                "{}",
                stats_table(&[("sender", &out.sender), ("receiver", &out.receiver)])
            );
            println!("link={} tasks={}", out.link, out.tasks);
        }
        OutputFormat::Pretty => {
            print_frames_pretty(&out.delivered);
            println!("sender: {}", out.sender.pretty());
            println!("receiver: {}", out.receiver.pretty());
            println!("link={} tasks={}", out.link, out.tasks);
        }
        OutputFormat::Raw => {
            for payload in payloads {
                print_raw(payload);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn frames_table(frames: &[FrameOutput]) -> Table {
    let mut table = new_table(vec!["#", "SIZE", "PAYLOAD", "HEX"]);
    for frame in frames {
        table.add_row(vec![
            frame.index.to_string(),
            frame.payload_size.to_string(),
            frame.payload.clone(),
            frame.hex.clone(),
        ]);
    }
    table
}

fn stats_table(columns: &[(&str, &StatsOutput)]) -> Table {
    let mut header = vec!["COUNTER"];
    header.extend(columns.iter().map(|(name, _)| *name));
    let mut table = new_table(header);

    let Some((_, first)) = columns.first() else {
        return table;
    };
    for (row, (name, _)) in first.rows().iter().enumerate() {
        let mut cells = vec![name.to_string()];
        for (_, stats) in columns {
            let value = stats.rows().get(row).map(|(_, v)| *v).unwrap_or_default();
            cells.push(value.to_string());
        }
        table.add_row(cells);
    }
    table
}

fn print_frames_pretty(frames: &[FrameOutput]) {
    for frame in frames {
        println!(
            "frame={} size={} payload={}",
            frame.index, frame.payload_size, frame.payload
        );
    }
}

/// Upper-case hex, one space between bytes.
pub fn to_hex(data: &[u8]) -> String {
    let digits = hex::encode_upper(data);
    let mut out = String::with_capacity(digits.len() + data.len());
    for (i, pair) in digits.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.extend(pair.iter().map(|&d| char::from(d)));
    }
    out
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("<binary {} bytes>", payload.len()),
    }
}
