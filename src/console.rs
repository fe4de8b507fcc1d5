use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::Instrument;

use crate::{
    commands::{self, Command},
    Data,
};

/// Prints notifications as they arrive until the channel closes.
fn spawn_notification_printer(data: &Data) -> tokio::task::JoinHandle<()> {
    let mut notifications = data.notifier.subscribe();

    tokio::spawn(
        async move {
            loop {
                match notifications.recv().await {
                    Ok(notification) => println!("{notification}"),
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "dropped notifications");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        .in_current_span(),
    )
}

/// Reads commands from stdin until `quit`, end of input, or Ctrl-C.
pub async fn run(data: Data) -> anyhow::Result<()> {
    let printer = spawn_notification_printer(&data);

    println!("quotesync {}. type `help` for a list of commands.", env!("CARGO_PKG_VERSION"));
    match commands::quote::show(&data, None).await {
        Ok(quote) => println!("{quote}"),
        Err(e) => tracing::error!(err = ?e, "an error occurred when showing a quote"),
    }

    read_commands(&data, BufReader::new(tokio::io::stdin())).await;

    printer.abort();

    Ok(())
}

/// Runs one command per input line. Lines that are not valid UTF-8 are decoded lossily.
async fn read_commands<R>(data: &Data, mut input: R)
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();

        let read = tokio::select! {
            read = input.read_until(b'\n', &mut buf) => read,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received ctrl-c, shutting down...");
                break;
            }
        };

        match read {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(err = ?e, "could not read from stdin, shutting down...");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(usage) => {
                println!("{usage}");
                continue;
            }
        };

        if command == Command::Quit {
            break;
        }

        match commands::execute(data, command).await {
            Ok(Some(reply)) => println!("{reply}"),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(err = ?e, "an error occurred when running command");
                println!("error: {e}");
            }
        }
    }
}
