//! StrataKV CLI
//!
//! Interactive shell over an embedded database. See `stratakv::shell` for
//! the command set.

use std::io::{self, BufRead, Write};

use clap::Parser;
use stratakv::shell::{execute, parse_command};
use stratakv::{Config, Engine, WriteOptions};
use tracing_subscriber::{fmt, EnvFilter};

/// StrataKV CLI
#[derive(Parser, Debug)]
#[command(name = "stratakv-cli")]
#[command(about = "Interactive shell for a StrataKV database")]
#[command(version)]
struct Args {
    /// Database directory (created if missing)
    #[arg(short, long, default_value = "./stratakv_data")]
    data_dir: String,

    /// Memtable size in KB before rotation
    #[arg(short = 'w', long, default_value = "4096")]
    write_buffer_kb: usize,

    /// Keep a single memtable and never rotate
    #[arg(long)]
    only_mem: bool,

    /// Flush the WAL to disk on every write
    #[arg(long)]
    sync: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .create_if_missing(true)
        .write_buffer_size(args.write_buffer_kb * 1024)
        .only_mem(args.only_mem)
        .build();

    let engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let options = WriteOptions { sync: args.sync };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }

        let keep_going = match parse_command(&line) {
            Ok(command) => execute(&engine, &options, command, &mut stdout),
            Err(msg) => writeln!(stdout, "Error: {}", msg).map(|_| true),
        };
        match keep_going {
            Ok(true) => {}
            Ok(false) | Err(_) => break,
        }
    }

    println!("bye~");
    if let Err(e) = engine.close() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
