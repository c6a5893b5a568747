// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;
use validator::Validate;

/// Question type tag, stored as text in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Multiple choice: options is an ordered list of choice strings.
    Mcq,
    /// Free text: no options payload.
    Text,
    /// Two-label slider: options is a `{left, right}` label pair.
    Scale,
}

impl QuestionType {
    /// The tag as stored in the `type` column (and accepted by its CHECK
    /// constraint).
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Text => "text",
            QuestionType::Scale => "scale",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "mcq" => Some(QuestionType::Mcq),
            "text" => Some(QuestionType::Text),
            "scale" => Some(QuestionType::Scale),
            _ => None,
        }
    }
}

// The column is plain TEXT, so encode/decode by hand instead of deriving a
// user-defined Postgres enum type that the schema never declares.
impl sqlx::Type<sqlx::Postgres> for QuestionType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for QuestionType {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for QuestionType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Self::parse(raw).ok_or_else(|| format!("unknown question type {raw:?}").into())
    }
}

/// Type-dependent options payload, stored as JSONB.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionOptions {
    Choices(Vec<String>),
    ScaleLabels { left: String, right: String },
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,

    pub room_id: Uuid,

    /// Mapped from the database column 'type' since `type` is a reserved
    /// keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    pub prompt: String,

    pub options: Option<Json<QuestionOptions>>,

    /// Display/open order. Not enforced unique.
    pub order_index: i32,

    /// One-shot flag: true once the question has been opened and closed.
    pub used: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new question during host setup.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    #[validate(length(min = 1, max = 1000, message = "Prompt must be 1 to 1000 characters"))]
    pub prompt: String,

    pub options: Option<QuestionOptions>,

    #[serde(default)]
    pub order_index: i32,
}

impl CreateQuestionRequest {
    /// Cross-field check: the options payload must match the question type.
    pub fn check_options(&self) -> Result<(), &'static str> {
        match (self.question_type, &self.options) {
            (QuestionType::Mcq, Some(QuestionOptions::Choices(choices))) => {
                if choices.is_empty() {
                    Err("mcq questions need at least one option")
                } else {
                    Ok(())
                }
            }
            (QuestionType::Mcq, _) => Err("mcq questions need an options list"),
            (QuestionType::Scale, Some(QuestionOptions::ScaleLabels { .. })) => Ok(()),
            (QuestionType::Scale, _) => Err("scale questions need {left, right} labels"),
            (QuestionType::Text, None) => Ok(()),
            (QuestionType::Text, Some(_)) => Err("text questions take no options"),
        }
    }
}
