#![forbid(unsafe_code)]

pub mod error;
pub mod identity;
pub mod sessions;

pub use survey_core::Clock;
pub use sessions as session;

pub use error::SurveyError;
pub use identity::{IdentityProvider, StaticIdentity};

pub use sessions::{
    FlushResult, SectionStatusItem, SubmitResult, SurveyLoopService, SurveySessionService,
    SurveyStep,
};
