mod input;
mod user;

use crate::admin::input::CancelType;
use crate::api::error::ApiError;
use crate::app::AppState;
use std::str::FromStr;
use strum::{EnumIter, EnumMessage, EnumString, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Cancel(#[from] CancelType),
    #[error("Could not connect to the database. Details:\n{0}")]
    Connection(#[from] diesel::r2d2::PoolError),
    #[error("Command line editor failed. Details:\n{0}")]
    Editor(#[from] rustyline::error::ReadlineError),
    #[error("Could not hash password. Details:\n{0}")]
    Password(#[from] argon2::password_hash::Error),
    #[error("Database query failed. Details:\n{0}")]
    Query(#[from] diesel::result::Error),
    #[error("No user with username {0:?} exists")]
    UnknownUser(String),
}

pub type AdminResult<T> = Result<T, AdminError>;

#[derive(Clone, Copy, EnumIter, EnumMessage, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AdminTask {
    #[strum(message = "Creates an administrator account")]
    CreateAdmin,
    #[strum(message = "Sets a new password for a user")]
    ResetPassword,
    #[strum(message = "Reactivates a deactivated user")]
    ActivateUser,
}

/// Returns `true` if the server was started with `--admin`.
pub fn enabled() -> bool {
    std::env::args().any(|arg| arg == "--admin")
}

/// Starts the interactive admin shell. Returns when the user exits.
pub fn command_line_mode(state: &AppState) {
    println!("Running CRM Talleres admin command line interface.");
    println!("Enter \"help\" for a list of commands and \"exit\" when finished.\n");

    let mut editor = match input::create_editor::<AdminTask>() {
        Ok(editor) => editor,
        Err(err) => {
            error!("Could not start command line editor. Details:\n{err}");
            return;
        }
    };

    loop {
        let line = match input::read("Please select a task: ", &mut editor) {
            Ok(line) => line,
            Err(CancelType::Stop) => continue,
            Err(CancelType::Exit) => return,
        };
        let task = match AdminTask::from_str(&line) {
            Ok(task) => task,
            Err(_) => {
                let possible_tasks: Vec<&'static str> = AdminTask::iter().map(AdminTask::into).collect();
                eprintln!("ERROR: Task should be one of {possible_tasks:?}\n");
                continue;
            }
        };
        run_task(state, task);
        println!("Task finished.\n");
    }
}

fn run_task(state: &AppState, task: AdminTask) {
    let result = match task {
        AdminTask::CreateAdmin => user::create_admin(state),
        AdminTask::ResetPassword => user::reset_password(state),
        AdminTask::ActivateUser => user::activate_user(state),
    };
    if let Err(err) = result {
        error!("{err}");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn task_names() {
        let names: Vec<&'static str> = AdminTask::iter().map(AdminTask::into).collect();
        assert_eq!(names, ["create_admin", "reset_password", "activate_user"]);
        assert!(matches!(AdminTask::from_str("reset_password"), Ok(AdminTask::ResetPassword)));
        assert!(AdminTask::from_str("reset").is_err());
        assert!(AdminTask::iter().all(|task| task.get_message().is_some()));
    }
}
