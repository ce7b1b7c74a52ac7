//! Pipe stdin through a logmux session.
//!
//! Reads raw chunks from standard input, feeds them into a single
//! session and emits the reassembled lines on standard error, tagged
//! with this process's id.
//!
//! # Usage
//!
//! ```bash
//! printf 'one\ntwo\npartial' | cargo run --example pipe
//! ```

use std::io::Read;
use std::sync::Arc;

use logmux::{SessionManager, WriterId, WriterSink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=trace to watch the scan decisions)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let manager = SessionManager::new(Arc::new(WriterSink::stderr()));
    let session = manager.open("pipe");
    let writer = WriterId(std::process::id());

    let mut stdin = std::io::stdin().lock();
    let mut chunk = [0u8; 512];
    loop {
        let n = stdin.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        manager.write(session, &chunk[..n], writer)?;
    }

    // Closing flushes a trailing unterminated fragment, if any.
    manager.close(session)?;
    Ok(())
}
