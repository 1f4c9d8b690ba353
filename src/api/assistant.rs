//! Stateless assistant endpoints

use crate::core::render::render_html;
use crate::core::session::QUICK_QUESTIONS;
use crate::core::traits::AssistantService;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use serde::{Deserialize, Serialize};

pub fn router() -> Router {
    Router::new()
        .route("/topics", get(topics))
        .route("/quick-questions", get(quick_questions))
        .route("/classify", post(classify))
}

#[derive(Serialize, Debug)]
pub struct TopicList {
    pub topics: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct QuickQuestions {
    pub questions: Vec<&'static str>,
}

#[derive(Deserialize, Debug)]
pub struct ClassifyRequest {
    pub text: String,
}

#[derive(Serialize, Debug)]
pub struct ClassifyResponse {
    /// `None` when no topic matched and the fallback answer was used.
    pub topic: Option<String>,
    pub answer: String,
    pub html: String,
}

async fn topics(Inject(assistant): Inject<dyn AssistantService>) -> Json<TopicList> {
    Json(TopicList {
        topics: assistant.topics(),
    })
}

async fn quick_questions() -> Json<QuickQuestions> {
    Json(QuickQuestions {
        questions: QUICK_QUESTIONS.to_vec(),
    })
}

async fn classify(
    Inject(assistant): Inject<dyn AssistantService>,
    Json(request): Json<ClassifyRequest>,
) -> Json<ClassifyResponse> {
    let classification = assistant.classify(&request.text);
    Json(ClassifyResponse {
        html: render_html(&classification.answer),
        topic: classification.topic,
        answer: classification.answer,
    })
}
