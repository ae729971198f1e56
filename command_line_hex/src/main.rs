//! # Hexapod command line
//!
//! Interactive prompt which parses each line into a telecommand and sends it to `hex_exec`, for
//! example `move 45 0 -50 0` or `enable true`. Type `help` for the list of commands.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use color_eyre::{Result, eyre::WrapErr};
use rustyline::{error::ReadlineError, DefaultEditor};
use structopt::StructOpt;

use comms_if::{
    net::{zmq, MonitoredSocket, SocketOptions},
    tc::{Tc, TcResponse}
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PROMPT: &str = "Hex $ ";
const HISTORY_DIR: &str = "data";
const HISTORY_PATH: &str = "data/history.txt";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line for the hexapod executable
#[derive(Debug, StructOpt)]
#[structopt(name = "command_line_hex")]
struct Opts {
    /// Endpoint the telecommand socket binds to
    #[structopt(long, default_value = "tcp://*:5020")]
    endpoint: String,

    /// Time to wait for the executable to respond to a command.
    ///
    /// Units: milliseconds
    #[structopt(long, default_value = "1000")]
    timeout_ms: i32
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    let ctx = zmq::Context::new();
    let socket = MonitoredSocket::new(
        &ctx,
        zmq::REQ,
        SocketOptions {
            bind: true,
            block_on_first_connect: false,
            req_correlate: true,
            req_relaxed: true,
            linger: 1,
            recv_timeout: opts.timeout_ms,
            send_timeout: opts.timeout_ms,
            ..Default::default()
        },
        &opts.endpoint
    ).wrap_err("Could not create the telecommand socket")?;

    println!("Telecommands will be sent on {}", opts.endpoint);

    let mut rl = DefaultEditor::new().wrap_err("Could not start the line editor")?;
    if rl.load_history(HISTORY_PATH).is_err() {
        println!("No history detected");
    }

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).wrap_err("Could not read the command line")
        };

        let line = line.trim();
        if line.is_empty() {
            continue
        }
        rl.add_history_entry(line).ok();

        if line == "exit" || line == "quit" {
            break
        }

        let tc = match Tc::from_iter_safe(std::iter::once("hex").chain(line.split_whitespace())) {
            Ok(tc) => tc,
            Err(e) => {
                println!("{}", e.message);
                continue
            }
        };

        match send(&socket, &tc) {
            Ok(r) => println!("{:?}", r),
            Err(e) => println!("Error: {:#}", e)
        }
    }

    std::fs::create_dir_all(HISTORY_DIR).wrap_err("Could not create the history directory")?;
    rl.save_history(HISTORY_PATH).wrap_err("Could not save the command history")?;

    println!("Exiting...");

    Ok(())
}

/// Send a telecommand and wait for the executable's response.
fn send(socket: &MonitoredSocket, tc: &Tc) -> Result<TcResponse> {
    if !socket.connected() {
        return Err(color_eyre::eyre::eyre!("hex_exec is not connected"))
    }

    let tc_str = tc.to_json().wrap_err("Could not serialise the TC")?;
    socket.send(&tc_str, 0).wrap_err("Could not send the TC")?;

    let response = match socket.recv_string(0) {
        Ok(Ok(s)) => s,
        Ok(Err(_)) => return Err(color_eyre::eyre::eyre!("Response was not valid UTF-8")),
        Err(e) => return Err(e).wrap_err("No response from hex_exec")
    };

    serde_json::from_str(&response).wrap_err("Could not parse the response")
}
