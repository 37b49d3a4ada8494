use std::io::Write;
use std::process::ExitCode;

use finwell_core::{ChatMessage, MessageContent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::cli::{Cli, OutputFormat};
use crate::error::CliError;
use crate::output::to_json;

use super::Context;

const BANNER: &str = "finwell chat. Ask about stocks, crypto, health or insurance; type 'exit' to quit.";

/// Reads one query per line from stdin. With `--format json` every reply is printed as a
/// chat message object, one per line.
pub async fn run(cli: &Cli, context: &Context) -> Result<ExitCode, CliError> {
    let dispatcher = context.dispatcher();
    let interactive = cli.format != OutputFormat::Json;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut answered = 0_usize;

    if interactive {
        println!("{BANNER}");
    }

    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let message = ChatMessage::new(vec![MessageContent::text(line)]);
        let Some(reply) = dispatcher.handle_message(&message).await else {
            continue;
        };
        answered += 1;

        if interactive {
            println!("{}\n", reply.first_text().unwrap_or_default());
        } else {
            println!("{}", to_json(&reply, cli.pretty)?);
        }
    }

    info!(answered, "chat session closed");
    Ok(ExitCode::SUCCESS)
}
