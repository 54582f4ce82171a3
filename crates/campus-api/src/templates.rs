//! Embedded chat page and script.

use minijinja::{context, Environment};
use serde::Serialize;

use campus_core::types::Turn;

pub const INDEX_HTML: &str = include_str!("../assets/index.html");
pub const SCRIPT_JS: &str = include_str!("../assets/script.js");

const INDEX: &str = "index.html";

/// Template environment with the chat page registered.
///
/// `.html` templates are auto-escaped, so transcript text is rendered inert.
pub fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template(INDEX, INDEX_HTML)?;
    Ok(env)
}

#[derive(Debug, Serialize)]
pub struct PageContext<'a> {
    pub name: &'a str,
    pub university: &'a str,
    pub turns: &'a [Turn],
}

pub fn render_index(env: &Environment<'static>, page: &PageContext<'_>) -> Result<String, minijinja::Error> {
    env.get_template(INDEX)?.render(context! {
        name => page.name,
        university => page.university,
        turns => page.turns,
    })
}
