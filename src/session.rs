//! Interactive session (`zs shell`).
//!
//! One [`SearchClient`] lives for the whole session, the way the view lives
//! for a page. Plain lines are queries. Lines starting with `:` are commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `:datasets` | Reload and list datasets |
//! | `:use <id>` / `:default` | Select a dataset / go back to the default |
//! | `:upload` | Open or close the upload panel |
//! | `:name <name>` | Set the dataset name |
//! | `:mode file\|text` | Switch upload input mode |
//! | `:file <path>` / `:text <data>` | Fill the upload input |
//! | `:submit` | Send the upload |
//! | `:reset` | Clear upload state and close the panel |
//! | `:cancel` | Abandon the running search |
//! | `:help` / `:quit` | |
//!
//! Input is still read while a search runs, so `:cancel` works mid-flight
//! and dataset or upload commands can be used in the meantime. Only a
//! second search is refused until the first one settles.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::client::{SearchClient, SearchSubmit};
use crate::models::DatasetId;
use crate::render;
use crate::state::UploadMode;

const HELP: &str = "\
Type a query to search. Commands:
  :datasets            list datasets
  :use <id>            search within a dataset
  :default             search the default dataset
  :upload              open/close the upload panel
  :name <name>         set the dataset name
  :mode file|text      choose the upload input
  :file <path>         choose a file to upload
  :text <data>         paste text to upload
  :submit              upload
  :reset               clear the upload form and close the panel
  :cancel              abandon the running search
  :quit                leave
";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search(String),
    Datasets,
    Use(DatasetId),
    Default,
    Upload,
    Name(String),
    Mode(UploadMode),
    File(PathBuf),
    Text(String),
    Submit,
    Reset,
    Cancel,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Search(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match (name, arg) {
        ("datasets", _) => Command::Datasets,
        ("use", "") => Command::Invalid("usage: :use <dataset id>".into()),
        ("use", id) => match id.parse() {
            Ok(id) => Command::Use(id),
            Err(_) => Command::Invalid(format!("not a dataset id: {}", id)),
        },
        ("default", _) => Command::Default,
        ("upload", _) => Command::Upload,
        ("name", name) => Command::Name(name.to_string()),
        ("mode", "file") => Command::Mode(UploadMode::File),
        ("mode", "text") => Command::Mode(UploadMode::Text),
        ("mode", _) => Command::Invalid("usage: :mode file|text".into()),
        ("file", "") => Command::Invalid("usage: :file <path>".into()),
        ("file", path) => Command::File(PathBuf::from(path)),
        ("text", text) => Command::Text(text.to_string()),
        ("submit", _) => Command::Submit,
        ("reset", _) => Command::Reset,
        ("cancel", _) => Command::Cancel,
        ("help", _) => Command::Help,
        ("quit", _) | ("q", _) | ("exit", _) => Command::Quit,
        (other, _) => Command::Invalid(format!("unknown command :{} (try :help)", other)),
    }
}

/// Run the session until `:quit` or end of input.
pub async fn run<R, W>(client: &SearchClient, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    if client.mount().await {
        writeln!(
            out,
            "Connected. {} dataset(s) available. Type :help for commands.",
            client.snapshot().catalog.datasets.len()
        )?;
    } else {
        writeln!(
            out,
            "Could not load datasets from the service. Type :help for commands."
        )?;
    }

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Search(query) => {
                let search = client.submit_search(&query);
                tokio::pin!(search);

                loop {
                    tokio::select! {
                        submitted = &mut search => {
                            if submitted == SearchSubmit::Settled {
                                write_search_state(client, out)?;
                            }
                            break;
                        }
                        next = lines.next_line() => match next? {
                            // End of input: let the search finish, then stop.
                            None => {
                                if (&mut search).await == SearchSubmit::Settled {
                                    write_search_state(client, out)?;
                                }
                                return Ok(());
                            }
                            Some(line) => match parse_command(&line) {
                                Command::Cancel => {
                                    client.cancel_search();
                                    writeln!(out, "Search cancelled.")?;
                                    break;
                                }
                                Command::Quit => {
                                    client.cancel_search();
                                    return Ok(());
                                }
                                Command::Search(_) => writeln!(
                                    out,
                                    "Search in progress; type :cancel to abandon it."
                                )?,
                                command => handle(client, command, out).await?,
                            },
                        },
                    }
                }
            }
            command => handle(client, command, out).await?,
        }
    }

    Ok(())
}

fn write_search_state<W: Write>(client: &SearchClient, out: &mut W) -> Result<()> {
    write!(out, "{}", render::render_search_state(&client.search_state()))?;
    Ok(())
}

async fn handle<W: Write>(client: &SearchClient, command: Command, out: &mut W) -> Result<()> {
    match command {
        Command::Datasets => {
            if !client.refresh_datasets().await {
                writeln!(out, "(could not reach the service; showing the last list)")?;
            }
            write!(out, "{}", render::render_datasets(&client.snapshot().catalog))?;
        }
        Command::Use(id) => match client.select_dataset(Some(id)) {
            Ok(()) => writeln!(out, "Searching dataset {}.", id)?,
            Err(e) => writeln!(out, "{}", e)?,
        },
        Command::Default => {
            client.select_dataset(None)?;
            writeln!(out, "Searching the default dataset.")?;
        }
        Command::Upload => {
            client.toggle_upload_panel();
            write!(out, "{}", render::render_upload_form(&client.snapshot().upload))?;
        }
        Command::Name(name) => {
            client.set_upload_panel(true);
            client.set_dataset_name(name);
            write!(out, "{}", render::render_upload_form(&client.snapshot().upload))?;
        }
        Command::Mode(mode) => {
            client.set_upload_panel(true);
            client.set_upload_mode(mode);
            write!(out, "{}", render::render_upload_form(&client.snapshot().upload))?;
        }
        Command::File(path) => {
            client.set_upload_panel(true);
            client.select_file(path);
            write!(out, "{}", render::render_upload_form(&client.snapshot().upload))?;
        }
        Command::Text(text) => {
            client.set_upload_panel(true);
            client.set_upload_text(text);
            write!(out, "{}", render::render_upload_form(&client.snapshot().upload))?;
        }
        Command::Submit => match client.submit_upload().await {
            None => writeln!(out, "Upload in progress.")?,
            Some(Ok(result)) => write!(out, "{}", render::render_upload_result(&result))?,
            Some(Err(e)) => write!(out, "{}", render::render_upload_error(&e))?,
        },
        Command::Reset => {
            client.reset_upload();
            writeln!(out, "Upload form cleared.")?;
        }
        Command::Cancel => writeln!(out, "No search in progress.")?,
        Command::Help => write!(out, "{}", HELP)?,
        Command::Invalid(message) => writeln!(out, "{}", message)?,
        Command::Search(_) | Command::Quit | Command::Empty => {}
    }
    Ok(())
}
