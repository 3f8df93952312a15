use survey_core::model::UserId;

/// Source of the "who is taking the survey" signal.
///
/// Authentication itself happens elsewhere; the services only ask whether
/// somebody is signed in before creating a session.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;

    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

/// Identity fixed at construction, e.g. from a command-line flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticIdentity {
    user: Option<UserId>,
}

impl StaticIdentity {
    #[must_use]
    pub fn authenticated(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_is_not_authenticated() {
        assert!(!StaticIdentity::anonymous().is_authenticated());
        let signed_in = StaticIdentity::authenticated(UserId::new(5));
        assert!(signed_in.is_authenticated());
        assert_eq!(signed_in.current_user(), Some(UserId::new(5)));
    }
}
