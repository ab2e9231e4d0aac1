use crate::admin::input;
use crate::admin::{AdminError, AdminResult};
use crate::api::user::{self, UserCreateBody};
use crate::app::AppState;
use crate::auth::password;
use crate::schema::usuario;
use crate::time::DateTime;
use diesel::prelude::*;
use rustyline::DefaultEditor;

/// Prompts for the details of new administrator accounts until the user enters `done`.
pub fn create_admin(state: &AppState) -> AdminResult<()> {
    let mut editor = input::create_text_editor()?;
    println!("Please enter the details of the new administrator. Enter \"done\" when finished.");
    input::user_input_loop(state, &mut editor, |state: &AppState, editor: &mut DefaultEditor| {
        let username = input::read("Username: ", editor)?;
        let email = input::read("Email: ", editor)?;
        let nombre_completo = input::read("Full name: ", editor)?;
        let password = input::read("Password: ", editor)?;

        let body = UserCreateBody::administrator(username, email, nombre_completo, password);
        let admin = user::create_user(state, body)?;
        println!("Created administrator {}.\n", admin.username);
        Ok(())
    });
    Ok(())
}

/// Prompts for usernames and new passwords until the user enters `done`.
pub fn reset_password(state: &AppState) -> AdminResult<()> {
    let mut editor = input::create_text_editor()?;
    println!("Please enter the username of the user you would like to reset a password for. Enter \"done\" when finished.");
    input::user_input_loop(state, &mut editor, |state: &AppState, editor: &mut DefaultEditor| {
        let username = input::read("Username: ", editor)?;
        let mut conn = state.get_connection()?;
        verify_exists(&mut conn, &username)?;

        let new_password = input::read("New password: ", editor)?;
        user::validate_password(&new_password)?;
        let password_hash = password::hash_password(&state.config, &new_password)?;
        diesel::update(usuario::table.filter(usuario::username.eq(&username)))
            .set((usuario::password_hash.eq(password_hash), usuario::updated_at.eq(DateTime::now())))
            .execute(&mut conn)?;

        println!("Password reset successful.\n");
        Ok(())
    });
    Ok(())
}

/// Reactivates users, for example an administrator locked out of the application.
pub fn activate_user(state: &AppState) -> AdminResult<()> {
    let mut editor = input::create_text_editor()?;
    println!("Please enter the username of the user you would like to reactivate. Enter \"done\" when finished.");
    input::user_input_loop(state, &mut editor, |state: &AppState, editor: &mut DefaultEditor| {
        let username = input::read("Username: ", editor)?;
        let mut conn = state.get_connection()?;
        verify_exists(&mut conn, &username)?;

        diesel::update(usuario::table.filter(usuario::username.eq(&username)))
            .set((usuario::activo.eq(true), usuario::updated_at.eq(DateTime::now())))
            .execute(&mut conn)?;

        println!("User {username} is active.\n");
        Ok(())
    });
    Ok(())
}

fn verify_exists(conn: &mut PgConnection, username: &str) -> AdminResult<()> {
    let user_exists: bool =
        diesel::select(diesel::dsl::exists(usuario::table.filter(usuario::username.eq(username)))).get_result(conn)?;
    if user_exists {
        Ok(())
    } else {
        Err(AdminError::UnknownUser(username.to_owned()))
    }
}
