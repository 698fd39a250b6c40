//! Data model for forms, questions, answers, and responses.

mod answer;
mod form;
mod response;

pub use answer::{AnswerMap, AnswerValue};
pub use form::{Choice, Form, Question, QuestionType, RatingScale};
pub use response::{Response, ResponseItem};
