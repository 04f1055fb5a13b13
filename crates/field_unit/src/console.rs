//! Operator console: reads commands from stdin on a background thread.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use field_core::command::Command;

pub struct Console {
    commands: Receiver<Command>,
}

impl Console {
    /// Spawns the reader thread. Unknown input is ignored.
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("console".to_string())
            .spawn(move || {
                let stdin = io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match Command::parse(&line) {
                        Some(command) => {
                            if tx.send(command).is_err() {
                                break;
                            }
                        }
                        None => log::debug!("ignoring console input {line:?}"),
                    }
                }
                log::debug!("console input closed");
            })?;
        Ok(Self { commands: rx })
    }

    /// Commands typed since the last call, in order.
    pub fn drain(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            commands.push(command);
        }
        commands
    }
}
