use crate::console::{Action, Console};
use log::{debug, info, warn};
use shared::ServerFrame;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub async fn connect(server_addr: &str) -> Result<TcpStream, ClientError> {
    let stream = TcpStream::connect(server_addr).await?;
    info!("Connected to {}", server_addr);
    Ok(stream)
}

/// Runs a console session over `stream` until the operator exits, the
/// server closes the connection, or `input` reaches end of file.
pub async fn drive<S, I, O>(stream: S, input: I, output: &mut O) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut server_lines = BufReader::new(reader).lines();
    let mut input_lines = input.lines();
    let mut console = Console::new();

    loop {
        let actions = tokio::select! {
            biased;

            line = server_lines.next_line() => match line? {
                Some(line) => match line.parse::<ServerFrame>() {
                    Ok(frame) => console.on_server_frame(frame),
                    Err(e) => {
                        warn!("Unreadable frame from server: {}", e);
                        continue;
                    }
                },
                None => {
                    write_line(output, "Connection closed").await?;
                    return Ok(());
                }
            },
            line = input_lines.next_line() => match line? {
                Some(line) => console.on_input(&line),
                None => {
                    debug!("Input closed");
                    return Ok(());
                }
            },
        };

        for action in actions {
            match action {
                Action::Print(text) => write_line(output, &text).await?,
                Action::Send(frame) => {
                    debug!("Sending {}", frame);
                    writer.write_all(format!("{frame}\n").as_bytes()).await?;
                    writer.flush().await?;
                }
                Action::Exit => return Ok(()),
            }
        }

        if let Some(prompt) = console.prompt().text() {
            output.write_all(prompt.as_bytes()).await?;
            output.flush().await?;
        }
    }
}

async fn write_line<O>(output: &mut O, text: &str) -> io::Result<()>
where
    O: AsyncWrite + Unpin,
{
    output.write_all(format!("{text}\n").as_bytes()).await?;
    output.flush().await
}
