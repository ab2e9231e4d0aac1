#![warn(clippy::pedantic)]
// Gives warnings for every diesel::prelude::* import
#![allow(clippy::wildcard_imports)]
// Too subjective
#![allow(clippy::similar_names, clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::match_bool)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::single_match_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::option_option)]

mod admin;
mod api;
mod app;
mod auth;
mod config;
mod db;
mod error;
mod filesystem;
mod model;
mod resource;
mod schema;
#[cfg(test)]
mod test;
mod time;
mod workshop;

#[tokio::main]
async fn main() {
    app::enable_tracing();
    let state = match app::initialize() {
        Ok(state) => state,
        Err(err) => {
            tracing::error!("An error occurred during initialization. Details:\n{err}");
            std::process::exit(1);
        }
    };

    if admin::enabled() {
        admin::command_line_mode(&state);
    } else {
        app::run(state).await;
    }
}
