mod answer;
mod catalog;
mod ids;
mod session;

pub use ids::{ParseIdError, QuestionPosition, SectionId, UserId};

pub use answer::{AnswerError, AnswerValue};
pub use catalog::{CatalogError, Question, QuestionCatalog, Section};
pub use session::{AnswerStoreError, SurveySession};
