use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    SingleChoice,
    Rating,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::SingleChoice => "single_choice",
            QuestionType::Rating => "rating",
        }
    }
}

/// One selectable option of a [`QuestionType::SingleChoice`] question.
///
/// `label` is what the respondent sees; `value` is the canonical string
/// rules compare against ("Very satisfied" vs "5").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
    pub value: String,
    pub order: i64,
}

/// Numeric scale parameters of a [`QuestionType::Rating`] question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: i64,
    pub max: i64,
    /// Optional ordinal labels, index-aligned with min..=max.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self {
            min: 1,
            max: 5,
            labels: Vec::new(),
        }
    }
}

impl RatingScale {
    pub fn contains(&self, value: i64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub required: bool,
    /// Display order, unique within a form.
    pub order: i64,
    /// Choice set; only meaningful for SingleChoice questions.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Scale parameters; only meaningful for Rating questions.
    #[serde(default)]
    pub rating: Option<RatingScale>,
}

impl Question {
    pub fn choice(&self, choice_id: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    /// Questions in ascending display order.
    #[serde(default)]
    pub questions: Vec<Question>,
}

fn default_true() -> bool {
    true
}

impl Form {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Questions sorted by display order. The stored vector is expected to
    /// already be ordered; this is the normalizing accessor.
    pub fn ordered_questions(&self) -> Vec<&Question> {
        let mut qs: Vec<&Question> = self.questions.iter().collect();
        qs.sort_by_key(|q| q.order);
        qs
    }
}
