//! Terminal collaborators: reads messages from stdin, prints sealed blocks.

use std::io::{self, BufRead, Write};

use serde::Serialize;

use crate::blockchain::{Adjustment, Block, BlockSink, Difficulty, MessageSource};

pub const PROMPT: &str = "Enter a single message to send to the Blockchain:";

/// Prompts on `out` and reads one line from `input` per block.
pub struct LineSource<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> LineSource<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }
}

impl LineSource<io::StdinLock<'static>, io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> MessageSource for LineSource<R, W> {
    fn read_message(&mut self) -> io::Result<String> {
        writeln!(self.out, "\n{PROMPT}")?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no more input"));
        }
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        Ok(trimmed.strip_suffix('\r').unwrap_or(trimmed).to_string())
    }
}

/// Human-readable block report.
pub struct TextSink<W> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_block(
        &mut self,
        block: &Block,
        adjustment: Adjustment,
        difficulty: &Difficulty,
    ) -> io::Result<()> {
        let out = &mut self.out;
        if block.is_genesis() {
            writeln!(out, "Genesis Block:")?;
        } else {
            writeln!(out, "\nBlock:")?;
            writeln!(out, "Created by {}", block.created_by())?;
        }
        writeln!(out, "Id: {}", block.id)?;
        writeln!(out, "Timestamp: {}", block.timestamp)?;
        writeln!(out, "Magic number: {}", block.nonce)?;
        writeln!(out, "Hash of the previous block:\n{}", block.previous_hash)?;
        writeln!(out, "Hash of the block:\n{}", block.hash)?;
        writeln!(out, "Block data:\n{}", block.message)?;
        if let Some(signed) = &block.signed {
            writeln!(out, "Message ID: {}", signed.message_id)?;
            writeln!(out, "Public Key: {}", signed.public_key)?;
            writeln!(out, "Signature: {}", signed.signature)?;
        }
        writeln!(
            out,
            "Block was generating for {:.0} seconds",
            block.generation_time.as_secs_f64()
        )?;
        match adjustment {
            Adjustment::Increased => writeln!(out, "N was increased to {}", difficulty.zeros()),
            Adjustment::Unchanged => writeln!(out, "N stays the same"),
            Adjustment::Decreased => writeln!(out, "N was decreased by 1"),
        }
    }
}

impl<W: Write> BlockSink for TextSink<W> {
    fn block_sealed(&mut self, block: &Block, adjustment: Adjustment, difficulty: &Difficulty) {
        if let Err(err) = self.write_block(block, adjustment, difficulty) {
            log::error!("failed to print block #{}: {err}", block.id);
        }
    }

    fn message_failed(&mut self, err: &io::Error) {
        if let Err(write_err) = writeln!(self.out, "Error when scanning message input: {err}") {
            log::error!("failed to report message error ({err}): {write_err}");
        }
    }
}

#[derive(Serialize)]
struct SealedRecord<'a> {
    block: &'a Block,
    adjustment: Adjustment,
    next_difficulty: usize,
}

#[derive(Serialize)]
struct FailureRecord {
    message_error: String,
}

/// One JSON object per line.
pub struct JsonSink<W> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn emit<T: Serialize>(&mut self, record: &T) {
        let res = serde_json::to_writer(&mut self.out, record)
            .map_err(io::Error::from)
            .and_then(|_| writeln!(self.out));
        if let Err(err) = res {
            log::error!("failed to write json record: {err}");
        }
    }
}

impl<W: Write> BlockSink for JsonSink<W> {
    fn block_sealed(&mut self, block: &Block, adjustment: Adjustment, difficulty: &Difficulty) {
        self.emit(&SealedRecord {
            block,
            adjustment,
            next_difficulty: difficulty.zeros(),
        });
    }

    fn message_failed(&mut self, err: &io::Error) {
        self.emit(&FailureRecord {
            message_error: err.to_string(),
        });
    }
}
