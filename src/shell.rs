//! Line commands of the interactive shell.
//!
//! ```text
//! > put k1 v1 k2 v2     one batch, consecutive sequences
//! > del k1 k2           one batch of deletions
//! > get k1 k2           latest values (empty line when absent)
//! > get_3 k1            values as of sequence 3
//! > seq                 last sequence
//! > exit
//! ```

use std::io::{self, Write};

use crate::batch::WriteBatch;
use crate::config::{ReadOptions, WriteOptions};
use crate::engine::Engine;
use crate::format::SequenceNumber;

#[derive(Debug, PartialEq)]
pub enum ShellCommand {
    Put(Vec<(String, String)>),
    Del(Vec<String>),
    Get {
        sequence: Option<SequenceNumber>,
        keys: Vec<String>,
    },
    Seq,
    Exit,
    Empty,
}

pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&name, args)) = words.split_first() else {
        return Ok(ShellCommand::Empty);
    };

    match name {
        "put" => {
            if args.is_empty() || args.len() % 2 != 0 {
                return Err("Invalid put command: wrong number of arguments".to_string());
            }
            Ok(ShellCommand::Put(
                args.chunks(2)
                    .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                    .collect(),
            ))
        }
        "del" => {
            if args.is_empty() {
                return Err("Invalid del command: no key specified".to_string());
            }
            Ok(ShellCommand::Del(args.iter().map(|k| k.to_string()).collect()))
        }
        "get" => Ok(ShellCommand::Get {
            sequence: None,
            keys: args.iter().map(|k| k.to_string()).collect(),
        }),
        "seq" => Ok(ShellCommand::Seq),
        "exit" => Ok(ShellCommand::Exit),
        other => match other.strip_prefix("get_") {
            Some(version) => {
                let sequence = version.parse::<SequenceNumber>().map_err(|_| {
                    "Invalid get command: invalid version argument: not an integer".to_string()
                })?;
                Ok(ShellCommand::Get {
                    sequence: Some(sequence),
                    keys: args.iter().map(|k| k.to_string()).collect(),
                })
            }
            None => Err(format!("Invalid command: {}", other)),
        },
    }
}

/// Run one command. Returns false when the shell should stop.
pub fn execute(engine: &Engine, options: &WriteOptions, command: ShellCommand, out: &mut impl Write) -> io::Result<bool> {
    let status = match command {
        ShellCommand::Put(pairs) => {
            let mut batch = WriteBatch::new();
            for (key, value) in &pairs {
                batch.put(key.as_bytes(), value.as_bytes());
            }
            engine.write(options, batch)
        }
        ShellCommand::Del(keys) => {
            let mut batch = WriteBatch::new();
            for key in &keys {
                batch.delete(key.as_bytes());
            }
            engine.write(options, batch)
        }
        ShellCommand::Get { sequence, keys } => {
            let read = ReadOptions { snapshot: sequence };
            for key in &keys {
                match engine.get_with_options(&read, key.as_bytes()) {
                    Ok(value) => writeln!(out, "{}", String::from_utf8_lossy(&value))?,
                    Err(e) if e.is_not_found() => writeln!(out)?,
                    Err(e) => writeln!(out, "Error: {}", e)?,
                }
            }
            Ok(())
        }
        ShellCommand::Seq => {
            writeln!(out, "{}", engine.last_sequence())?;
            Ok(())
        }
        ShellCommand::Exit => return Ok(false),
        ShellCommand::Empty => Ok(()),
    };

    if let Err(e) = status {
        writeln!(out, "Error: {}", e)?;
    }
    Ok(true)
}
