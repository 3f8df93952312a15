mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SurveyError;
pub use service::SurveySessionService;
pub use view::SectionStatusItem;
pub use workflow::{FlushResult, SubmitResult, SurveyLoopService, SurveyStep};
