//! Server-rendered chat page

use crate::core::render::render_html;
use crate::core::session::{GREETING, QUICK_QUESTIONS};
use axum::http::StatusCode;
use axum::response::Html;
use log::error;
use minijinja::{Environment, context};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

pub async fn index() -> Result<Html<String>, (StatusCode, &'static str)> {
    render_index().map(Html).map_err(|e| {
        error!("{e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page")
    })
}

pub fn render_index() -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.add_template("index.html", INDEX_TEMPLATE)?;

    env.get_template("index.html")?.render(context! {
        greeting_html => render_html(GREETING),
        quick_questions => QUICK_QUESTIONS.to_vec(),
    })
}
