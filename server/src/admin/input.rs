use crate::admin::{AdminError, AdminResult, AdminTask};
use crate::app::AppState;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, DefaultEditor, Editor, Helper};
use std::marker::PhantomData;
use strum::{EnumMessage, IntoEnumIterator};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum CancelType {
    #[error("User has cancelled task")]
    Stop,
    #[error("User has exited program")]
    Exit,
}

impl TryFrom<&str> for CancelType {
    type Error = ();
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "done" => Ok(CancelType::Stop),
            "exit" => Ok(CancelType::Exit),
            _ => Err(()),
        }
    }
}

/// Completes the names of the variants of `E`.
pub struct EnumCompleter<E> {
    _phantom_data: PhantomData<E>,
}

impl<E: IntoEnumIterator + Into<&'static str>> Completer for EnumCompleter<E> {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Find the start of the current word
        let start = line[..pos].rfind(' ').map_or(0, |i| i + 1);
        let prefix = &line[start..pos];

        let matches: Vec<Pair> = E::iter()
            .map(E::into)
            .filter(|name: &&str| name.starts_with(prefix))
            .map(|name| Pair {
                display: name.to_owned(),
                replacement: name.to_owned(),
            })
            .collect();

        Ok((start, matches))
    }
}

impl<E> Hinter for EnumCompleter<E> {
    type Hint = String;
}
impl<E> Highlighter for EnumCompleter<E> {}
impl<E> Validator for EnumCompleter<E> {}
impl<E: IntoEnumIterator + Into<&'static str>> Helper for EnumCompleter<E> {}

pub fn create_editor<E>() -> rustyline::Result<Editor<EnumCompleter<E>, DefaultHistory>>
where
    E: IntoEnumIterator + Into<&'static str>,
{
    let editor_config = Config::builder().completion_type(CompletionType::List).build();
    let mut editor = Editor::with_config(editor_config)?;
    editor.set_helper(Some(EnumCompleter {
        _phantom_data: PhantomData,
    }));
    Ok(editor)
}

/// Editor for free text, like usernames and passwords.
pub fn create_text_editor() -> rustyline::Result<DefaultEditor> {
    DefaultEditor::new()
}

/// Prompts the user for input with message `prompt` and reads resulting input.
pub fn read<H: Helper>(prompt: &str, editor: &mut Editor<H, DefaultHistory>) -> Result<String, CancelType> {
    loop {
        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                editor.add_history_entry(trimmed).ok();
                if trimmed == "help" {
                    println!();
                    print_info();
                    continue;
                }
                if trimmed == "clear" {
                    editor.clear_screen().ok();
                    continue;
                }

                return match CancelType::try_from(trimmed) {
                    Ok(state) => Err(state),
                    Err(()) => Ok(trimmed.to_owned()),
                };
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("^C");
                return Err(CancelType::Exit);
            }
            Err(err) => {
                eprintln!("Error: {err}");
            }
        }
    }
}

/// Repeatedly performs some `function` that prompts for user input until the
/// user enters `done`. Entering `exit` terminates the program immediately.
pub fn user_input_loop<F>(state: &AppState, editor: &mut DefaultEditor, mut function: F)
where
    F: FnMut(&AppState, &mut DefaultEditor) -> AdminResult<()>,
{
    loop {
        match function(state, editor) {
            Ok(()) => (),
            Err(AdminError::Cancel(CancelType::Stop)) => break,
            Err(AdminError::Cancel(CancelType::Exit)) => std::process::exit(0),
            Err(err) => {
                error!("{err}\n");
            }
        }
    }
}

/// Prints some helpful information about the CLI to the console.
fn print_info() {
    let task_spacing = AdminTask::iter()
        .map(AdminTask::into)
        .map(|name: &str| name.len())
        .max()
        .unwrap_or(0)
        + 4;

    println!("Commands:");
    println!("  {:12} Show this help message", "help");
    println!("  {:12} Clear the screen", "clear");
    println!("  {:12} Finish the current task", "done");
    println!("  {:12} Exit the CLI", "exit");
    println!();
    println!("Tasks:");
    for task in AdminTask::iter() {
        let name: &str = task.into();
        println!("  {:task_spacing$} {}", name, task.get_message().unwrap_or_default());
    }
    println!();
}
