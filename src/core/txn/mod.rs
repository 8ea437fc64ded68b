// src/core/txn/mod.rs

//! Flattening of raw per-block JSON into transaction-graph lines: one line
//! per (transaction, output) pair plus a footer mapping every seen address
//! to its input-group representative.

use crate::core::errors::PipelineError;
use crate::core::sink;
use crate::core::storage::StorageDescriptor;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Reads a sink-format artifact (one `base64(gzip(json(row)))` line per
/// block fetch) and yields each row's `content` parsed as block JSON.
pub struct RawBlockReader {
    lines: std::io::Lines<BufReader<File>>,
}

impl RawBlockReader {
    /// Opens a `file://` input. The S3 scheme is accepted by the grammar but
    /// not wired up for raw block input.
    pub fn open(input: &str) -> Result<Self, PipelineError> {
        match StorageDescriptor::parse(input)? {
            StorageDescriptor::File { path } => {
                let file = File::open(Path::new(&path))?;
                Ok(Self {
                    lines: BufReader::new(file).lines(),
                })
            }
            StorageDescriptor::S3 { .. } => Err(PipelineError::Internal(
                "s3 input is not supported for raw block input".to_string(),
            )),
        }
    }

    pub fn next_blocks(&mut self) -> Result<Option<Value>, PipelineError> {
        let line = match self.lines.next() {
            Some(line) => line?,
            None => return Ok(None),
        };
        let row = sink::decode_line(&line)?;
        let content = row
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| PipelineError::Internal("row without a content field".to_string()))?;
        Ok(Some(serde_json::from_str(content)?))
    }
}

/// Groups of addresses assumed to be owned by one entity: every input
/// address of a transaction joins the group of the first member already
/// seen, or founds a new group named after the first address.
#[derive(Debug, Default)]
pub struct AddressGroup {
    groups: IndexMap<String, IndexSet<String>>,
    reverse: IndexMap<String, String>,
}

impl AddressGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a transaction's input addresses into the grouping.
    pub fn add(&mut self, addrs: &[String]) {
        if addrs.is_empty() {
            return;
        }
        let group_addr = addrs
            .iter()
            .find_map(|addr| self.reverse.get(addr).cloned())
            .unwrap_or_else(|| addrs[0].clone());

        let group = self.groups.entry(group_addr.clone()).or_default();
        group.extend(addrs.iter().cloned());
        for addr in addrs {
            self.reverse.insert(addr.clone(), group_addr.clone());
        }
    }

    /// The group representative for an address; an unknown address becomes
    /// its own singleton group.
    pub fn group_addr(&mut self, addr: &str) -> String {
        if let Some(group) = self.reverse.get(addr) {
            return group.clone();
        }
        self.reverse.insert(addr.to_string(), addr.to_string());
        self.groups
            .entry(addr.to_string())
            .or_default()
            .insert(addr.to_string());
        addr.to_string()
    }

    /// The members of a group, when `group_addr` names one.
    pub fn members(&self, group_addr: &str) -> Option<&IndexSet<String>> {
        self.groups.get(group_addr)
    }

    /// Writes the footer body: one `<addr> <group_addr>` line per address in
    /// first-seen order.
    pub fn write<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for (addr, group_addr) in &self.reverse {
            writeln!(out, "{addr} {group_addr}")?;
        }
        Ok(())
    }
}

/// Plain-text transaction-line writer with the trailing footer section.
pub struct TxnWriter {
    out: BufWriter<File>,
}

impl TxnWriter {
    pub fn create(path: &Path) -> Result<Self, PipelineError> {
        Ok(Self {
            out: BufWriter::new(File::create(path)?),
        })
    }

    pub fn append(
        &mut self,
        block: i64,
        idx: u64,
        group_addr: &str,
        out_addr: &str,
        amount: f64,
        fee: f64,
    ) -> Result<(), PipelineError> {
        writeln!(
            self.out,
            "{block} {idx} {group_addr} {out_addr} {} {}",
            fmt_amount(amount),
            fmt_amount(fee)
        )?;
        Ok(())
    }

    pub fn footer(&mut self, groups: &AddressGroup) -> Result<(), PipelineError> {
        self.out.write_all(b"FOOTER\n")?;
        groups.write(&mut self.out)?;
        Ok(())
    }

    pub fn close(mut self) -> Result<(), PipelineError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Satoshi amounts are integral in practice; keep them integral in the
/// output and fall back to the float form otherwise.
fn fmt_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 9e15 {
        format!("{}", amount as i64)
    } else {
        format!("{amount}")
    }
}

/// Flattens one transaction's inputs: the collected source addresses and
/// their total value. A zero-value input with no address marks a coinbase
/// transaction; a valued input with no address (OP_RETURN) is unspendable
/// and skipped.
pub fn process_inputs(inputs: &[Value]) -> Result<(Vec<String>, f64), PipelineError> {
    let mut addrs = Vec::new();
    let mut total_value = 0.0;
    for input in inputs {
        let prev_out = input.get("prev_out").ok_or_else(|| {
            PipelineError::FatalBlock("transaction input without prev_out".to_string())
        })?;
        let value = prev_out.get("value").and_then(Value::as_f64).ok_or_else(|| {
            PipelineError::FatalBlock("transaction input without prev_out.value".to_string())
        })?;
        let addr = prev_out.get("addr").and_then(Value::as_str);

        match addr {
            None if value == 0.0 => {
                if inputs.len() > 1 {
                    return Err(PipelineError::FatalBlock("Unexpected COINBASE".to_string()));
                }
                return Ok((vec!["COINBASE".to_string()], 0.0));
            }
            None => continue,
            Some(addr) => {
                addrs.push(addr.to_string());
                total_value += value;
            }
        }
    }
    Ok((addrs, total_value))
}

/// Flattens one transaction's outputs into `(address, value)` pairs,
/// dropping valueless and addressless entries.
pub fn process_outputs(outputs: &[Value]) -> Vec<(String, f64)> {
    outputs
        .iter()
        .filter_map(|output| {
            let value = output.get("value").and_then(Value::as_f64)?;
            let addr = output.get("addr").and_then(Value::as_str)?;
            (value > 0.0).then(|| (addr.to_string(), value))
        })
        .collect()
}

/// Drives the whole flattening: every block-set row in the input produces
/// transaction lines, and the footer closes the artifact. Returns the number
/// of transaction lines written.
pub fn flatten(
    reader: &mut RawBlockReader,
    writer: &mut TxnWriter,
    groups: &mut AddressGroup,
) -> Result<u64, PipelineError> {
    let mut lines_written = 0u64;
    while let Some(block_set) = reader.next_blocks()? {
        let blocks = block_set
            .get("blocks")
            .and_then(Value::as_array)
            .ok_or_else(|| PipelineError::FatalBlock("input without a blocks array".to_string()))?;

        // The transaction ordinal counts across all blocks of one input row.
        let mut ordinal = 0u64;
        for block in blocks {
            let block_index = block
                .get("block_index")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let txns = block
                .get("tx")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            for txn in txns {
                let inputs = txn
                    .get("inputs")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let (addrs, _value) = process_inputs(inputs)?;
                // No spendable input addresses at all (e.g. OP_RETURN only).
                if addrs.is_empty() {
                    continue;
                }
                groups.add(&addrs);
                let group_addr = groups.group_addr(&addrs[0]);

                let outputs = txn
                    .get("out")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                if let Some(fee) = txn.get("fee").and_then(Value::as_f64) {
                    for (out_addr, value) in process_outputs(outputs) {
                        writer.append(block_index, ordinal, &group_addr, &out_addr, value, fee)?;
                        lines_written += 1;
                    }
                }
                ordinal += 1;
            }
        }
    }
    Ok(lines_written)
}
