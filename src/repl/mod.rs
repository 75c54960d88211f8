use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;

use crate::network::{NetworkError, RaftClient};

/// A line typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect { host: String, port: u16 },
    GetLeader,
    Suspend { seconds: i64 },
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command `{0}`. Available: connect, getleader, suspend, quit")]
    Unknown(String),

    #[error("Use format: {0}")]
    Usage(&'static str),

    #[error("`{0}` is not a valid number")]
    InvalidNumber(String),
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&keyword, args)) = words.split_first() else {
            return Ok(None);
        };

        let command = match keyword {
            "connect" => match args {
                [host, port] => Command::Connect {
                    host: host.to_string(),
                    port: port
                        .parse()
                        .map_err(|_| CommandError::InvalidNumber(port.to_string()))?,
                },
                _ => return Err(CommandError::Usage("connect <address> <port>")),
            },
            "getleader" => match args {
                [] => Command::GetLeader,
                _ => return Err(CommandError::Usage("getleader")),
            },
            "suspend" => match args {
                [period] => {
                    let seconds: i64 = period
                        .parse()
                        .map_err(|_| CommandError::InvalidNumber(period.to_string()))?;
                    if seconds < 0 {
                        return Err(CommandError::InvalidNumber(period.to_string()));
                    }
                    Command::Suspend { seconds }
                }
                _ => return Err(CommandError::Usage("suspend <period>")),
            },
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }
}

pub struct Repl {
    rl: DefaultEditor,
    client: Option<RaftClient>,
}

impl Repl {
    pub fn new() -> Result<Self, ReadlineError> {
        Ok(Self {
            rl: DefaultEditor::new()?,
            client: None,
        })
    }

    /// Points the session at `address` (host:port). The connection is made on first use.
    pub fn connect_to(&mut self, address: &str) {
        self.client = Some(RaftClient::new(address));
    }

    pub async fn run(&mut self) {
        println!("The client starts");
        println!("Commands: connect <address> <port>, getleader, suspend <period>, quit");

        loop {
            let readline = self.rl.readline("> ");
            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let _ = self.rl.add_history_entry(line.as_str());

                    match Command::parse(&line) {
                        Ok(Some(Command::Quit)) => {
                            println!("The client ends");
                            break;
                        }
                        Ok(Some(command)) => self.execute(command).await,
                        Ok(None) => {}
                        Err(e) => eprintln!("{e}"),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::Connect { host, port } => {
                self.connect_to(&format!("{host}:{port}"));
            }
            Command::GetLeader => {
                let Some(client) = self.client.as_mut() else {
                    eprintln!("Not connected. Use: connect <address> <port>");
                    return;
                };
                match client.get_leader().await {
                    Ok(Some(leader)) => println!("{} {}", leader.id, leader.address),
                    Ok(None) => println!("No leader known yet"),
                    Err(e) => report(client.address(), &e),
                }
            }
            Command::Suspend { seconds } => {
                let Some(client) = self.client.as_mut() else {
                    eprintln!("Not connected. Use: connect <address> <port>");
                    return;
                };
                match client.suspend(seconds).await {
                    Ok(_) => println!("Node at {} resumed after {seconds}s", client.address()),
                    Err(e) => report(client.address(), &e),
                }
            }
            Command::Quit => {}
        }
    }
}

fn report(address: &str, err: &NetworkError) {
    if err.is_unavailable() {
        eprintln!("Node at {address} is unavailable: {err}");
    } else {
        eprintln!("Error from node at {address}: {err}");
    }
}
