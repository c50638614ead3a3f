// Interactive operator shell.
//
// Each input line is one submission. Lines starting with ':' edit the form
// state (port, address) or inspect the session log instead of dispatching.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use mdblink::{DispatchRequest, Dispatcher, LogEntry};

const HELP: &str = "\
Type a named command (CashlessReset(1)) or hex bytes (10 00) to send it.
  :log          show every attempt this session
  :address N    set the cashless device address
  :port PATH    set the serial port
  :help         show this help
  :quit         leave the shell";

/// The operator's form state between submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub port: String,
    pub address: f64,
}

impl Session {
    pub fn new(port: String, address: f64) -> Self {
        Self { port, address }
    }

    fn request(&self, text: &str) -> DispatchRequest {
        DispatchRequest::new(text, self.address, self.port.as_str())
    }
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Empty,
    Dispatch(String),
    ShowLog,
    SetAddress(f64),
    SetPort(String),
    Help,
    Quit,
}

fn parse_line(line: &str) -> std::result::Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Input::Dispatch(line.to_string()));
    };

    let (word, arg) = match rest.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim()),
        None => (rest, ""),
    };

    match (word, arg) {
        ("log", "") => Ok(Input::ShowLog),
        ("help", "") => Ok(Input::Help),
        ("quit" | "q" | "exit", "") => Ok(Input::Quit),
        ("address", "") => Err("usage: :address N".into()),
        ("address", value) => value
            .parse::<f64>()
            .map(Input::SetAddress)
            .map_err(|_| format!("not a number: {value}")),
        ("port", "") => Err("usage: :port PATH".into()),
        ("port", path) => Ok(Input::SetPort(path.to_string())),
        _ => Err(format!("unknown shell command :{word} (try :help)")),
    }
}

/// Render one log entry. Continuation lines of a multi-line response are
/// indented under the first.
fn format_entry(entry: &LogEntry) -> String {
    let mut lines = entry.response_text.lines();
    let first = lines.next().unwrap_or("");
    let mut out = format!(
        "{}  {:<6}  {}  ->  {}",
        entry.timestamp.format("%H:%M:%S%.3f"),
        entry.transport_kind.to_string(),
        entry.command_text,
        first
    );
    for line in lines {
        out.push_str("\n        ");
        out.push_str(line);
    }
    out
}

/// Run the shell on stdin and stdout until EOF or `:quit`.
pub async fn run(bridge: &Dispatcher, session: Session) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_with(bridge, session, stdin, &mut stdout, true).await
}

async fn run_with<R, W>(
    bridge: &Dispatcher,
    mut session: Session,
    input: R,
    out: &mut W,
    prompt: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        if prompt {
            write!(out, "mdb> ")?;
            out.flush()?;
        }

        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };

        match parse_line(&line) {
            Ok(Input::Empty) => {}
            Ok(Input::Dispatch(text)) => {
                let outcome = bridge.dispatch(session.request(&text)).await;
                writeln!(out, "{}", outcome.display)?;
            }
            Ok(Input::ShowLog) => {
                let entries = bridge.log_entries();
                if entries.is_empty() {
                    writeln!(out, "(log is empty)")?;
                }
                for entry in &entries {
                    writeln!(out, "{}", format_entry(entry))?;
                }
            }
            Ok(Input::SetAddress(address)) => {
                session.address = address;
                writeln!(out, "address = {address}")?;
            }
            Ok(Input::SetPort(port)) => {
                writeln!(out, "port = {port}")?;
                session.port = port;
            }
            Ok(Input::Help) => writeln!(out, "{HELP}")?,
            Ok(Input::Quit) => break,
            Err(message) => writeln!(out, "{message}")?,
        }
    }

    tracing::debug!(entries = bridge.log_entries().len(), "Shell closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdblink::MdbClientBuilder;
    use mdblink_test_harness::{MockDaemonLink, MockSerialLink};

    #[test]
    fn parse_dispatch_and_shell_commands() {
        assert_eq!(parse_line("   "), Ok(Input::Empty));
        assert_eq!(
            parse_line(" 10 00 "),
            Ok(Input::Dispatch("10 00".to_string()))
        );
        assert_eq!(parse_line(":log"), Ok(Input::ShowLog));
        assert_eq!(parse_line(":address 7"), Ok(Input::SetAddress(7.0)));
        assert_eq!(parse_line(":address -1"), Ok(Input::SetAddress(-1.0)));
        assert_eq!(
            parse_line(":port  /dev/ttyS1 "),
            Ok(Input::SetPort("/dev/ttyS1".to_string()))
        );
        assert_eq!(parse_line(":quit"), Ok(Input::Quit));
        assert!(parse_line(":address").is_err());
        assert!(parse_line(":address one").is_err());
        assert!(parse_line(":bogus").is_err());
    }

    #[tokio::test]
    async fn session_state_flows_into_requests() {
        let daemon = MockDaemonLink::new();
        let serial = MockSerialLink::new();
        daemon.expect("CashlessReset(9)", "{\"status\":\"ok\"}");
        serial.expect(&[0x10], &[0x00]);
        let bridge = MdbClientBuilder::new()
            .build_with_links(daemon.clone(), serial.clone())
            .unwrap();

        let script = b":address 9\ncashlessreset\n:port /dev/ttyS3\n10\n:log\n:quit\nFF\n";
        let mut out = Vec::new();
        run_with(
            &bridge,
            Session::new("/dev/ttyUSB0".into(), 1.0),
            &script[..],
            &mut out,
            false,
        )
        .await
        .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("address = 9"), "{out}");
        assert!(out.contains("{\"status\":\"ok\"}"), "{out}");
        assert!(out.contains("CashlessReset(9)  ->"), "{out}");

        assert_eq!(serial.sent()[0].port, "/dev/ttyS3");
        // Nothing after :quit is dispatched.
        assert_eq!(bridge.log_entries().len(), 2);
    }
}
