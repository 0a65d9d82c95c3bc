use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use splitlog::{
    export,
    import::CancelMode,
    outline::OutlineDoc,
    settings::{SettingsStore, SortState, ViewState},
    splits::RunningState,
    storage::Storage,
    SplitsController,
};

fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SPLITLOG_DATA_DIR") {
        return PathBuf::from(dir);
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".splitlog"),
        Err(_) => PathBuf::from(".splitlog"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    splitlog::init_logging();

    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;
    log::info!("splitlog starting up (data dir {})", dir.display());

    let storage = Storage::new(dir.join("splitlog.sqlite3"))?;
    let settings = SettingsStore::new(dir.join("settings.json"))?;
    let controller = SplitsController::new(storage.clone());

    controller.resume_from_storage().await?;
    controller.start_ticker().await;

    let mut doc = match storage.load_outline_doc().await? {
        Some(text) => OutlineDoc::from_text(text),
        None => OutlineDoc::new(),
    };

    println!("splitlog ready, type 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line.as_str(), ""),
        };

        match command {
            "" => {}
            "help" => print_help(),
            "play" => controller.play().await?,
            "stop" => controller.stop().await?,
            "split" => {
                if rest.is_empty() {
                    controller.split().await?;
                } else {
                    controller
                        .add_time(splitlog::SavedTime::with_label(Utc::now(), rest))
                        .await?;
                }
            }
            "list" => print_splits(&controller, &settings).await?,
            "copy" => print!("{}", controller.copy_text().await?),
            "status" => print_status(&controller).await,
            "del" => match rest.parse::<usize>() {
                Ok(index) => match controller.delete_split(index).await {
                    Ok(removed) => {
                        println!("deleted {}", removed.label.as_deref().unwrap_or("(unlabeled)"))
                    }
                    Err(err) => println!("{err:#}"),
                },
                Err(_) => println!("usage: del <index>"),
            },
            "clear" => {
                controller.clear_splits().await?;
                println!("all splits deleted");
            }
            "insert" => match parse_insert_args(rest) {
                Some((seconds, label)) => match controller.insert_split(seconds, label, None).await
                {
                    Ok(index) => println!("inserted at {index}"),
                    Err(err) => println!("{err:#}"),
                },
                None => println!("usage: insert <HH:mm:ss> [label]"),
            },
            "undo" => {
                let proceed = if controller.has_unsaved_import().await {
                    confirm(&mut lines, "This will cancel the import. Are you sure?").await?
                } else {
                    true
                };
                if !controller.undo(proceed).await? {
                    println!("nothing to undo");
                }
            }
            "redo" => {
                if !controller.redo().await? {
                    println!("nothing to redo");
                }
            }
            "import" => {
                controller.start_import().await;
                println!("paste chapter lines (HH:mm:ss - label), end with '.'");
                while let Some(chapter_line) = lines.next_line().await? {
                    if chapter_line.trim() == "." {
                        break;
                    }
                    controller.append_import_line(&chapter_line).await;
                }
                match controller.finish_import().await {
                    Ok(count) => println!("imported {count} splits"),
                    Err(err) => {
                        println!("import failed: {err:#}");
                        controller.cancel_import(CancelMode::Never, true).await;
                    }
                }
            }
            "sort" => {
                let next = match settings.sort_state() {
                    SortState::Chron => SortState::RevChron,
                    SortState::RevChron => SortState::Chron,
                };
                settings.update_sort_state(next)?;
                println!("sort: {next:?}");
            }
            "view" => {
                let next = match settings.view_state() {
                    ViewState::Edit => ViewState::Code,
                    ViewState::Code => ViewState::Edit,
                };
                settings.update_view_state(next)?;
                println!("view: {next:?}");
            }
            "doc" => handle_doc(rest, &mut doc, &storage, &mut lines).await?,
            "quit" | "exit" => break,
            other => println!("unknown command '{other}', type 'help'"),
        }
    }

    controller.stop_ticker().await;
    Ok(())
}

fn print_help() {
    println!(
        "commands:\n\
         \x20 play | stop | split [label]   control the clock\n\
         \x20 list | copy | status          show splits\n\
         \x20 insert <HH:mm:ss> [label]     insert at an elapsed offset\n\
         \x20 del <index> | clear           remove splits\n\
         \x20 undo | redo                   history\n\
         \x20 import                        paste chapter lines\n\
         \x20 sort | view                   toggle display settings\n\
         \x20 doc [edit|clear]              outline document\n\
         \x20 quit"
    );
}

async fn print_splits(controller: &SplitsController, settings: &SettingsStore) -> Result<()> {
    let view = controller.view().await;
    if view.times.is_empty() {
        println!("no splits");
        return Ok(());
    }

    let order = export::display_order(view.times.len(), settings.sort_state());
    let timestamp_lines = controller.timestamp_lines(&order).await?;
    match settings.view_state() {
        ViewState::Code => {
            for line in timestamp_lines {
                println!("{line}");
            }
        }
        ViewState::Edit => {
            for (index, line) in order.iter().zip(timestamp_lines) {
                println!("{index:>3}  {line}");
            }
        }
    }
    Ok(())
}

async fn print_status(controller: &SplitsController) {
    let view = controller.view().await;
    let state = match view.running_state {
        RunningState::Running => "running",
        RunningState::Stopped => "stopped",
    };
    println!(
        "{state}, {} splits, elapsed {}",
        view.times.len(),
        controller.elapsed_display().await
    );
}

async fn handle_doc(
    rest: &str,
    doc: &mut OutlineDoc,
    storage: &Storage,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    match rest {
        "" => {
            if doc.is_empty() {
                println!("no document");
            } else {
                println!("{}", doc.text());
            }
        }
        "edit" => {
            println!("enter outline lines ('-' topic, '+' subtopic), end with '.'");
            let mut text = String::new();
            while let Some(doc_line) = lines.next_line().await? {
                if doc_line.trim() == "." {
                    break;
                }
                text.push_str(&doc_line);
                text.push('\n');
            }
            doc.set_text(text);
            if let Err(err) = storage.save_outline_doc(doc.text(), Utc::now()).await {
                warn!("failed to persist outline doc: {err:#}");
            }
            println!("document saved ({} lines)", doc.lines().len());
        }
        "clear" => {
            doc.clear();
            if let Err(err) = storage.save_outline_doc("", Utc::now()).await {
                warn!("failed to persist outline doc: {err:#}");
            }
            println!("document cleared");
        }
        _ => println!("usage: doc [edit|clear]"),
    }
    Ok(())
}

/// Split `"<HH:mm:ss> [label]"` into elapsed seconds and an optional label.
fn parse_insert_args(rest: &str) -> Option<(i64, Option<String>)> {
    if rest.is_empty() {
        return None;
    }
    let (timecode, label) = match rest.split_once(' ') {
        Some((timecode, label)) => (timecode, Some(label.trim().to_string())),
        None => (rest, None),
    };
    let seconds = splitlog::import::timecode_to_seconds(timecode).ok()?;
    Some((seconds, label.filter(|l| !l.is_empty())))
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Result<bool> {
    println!("{prompt} [y/N]");
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
