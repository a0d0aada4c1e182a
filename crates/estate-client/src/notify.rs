use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};

use crate::outcome::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Toast/alert presenter supplied by the host.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, title: &str, message: &str);
}

/// Copy shown for one action, on either branch.
#[derive(Debug, Clone, Copy)]
pub struct NoticeText {
    pub success_title: &'static str,
    pub success_message: &'static str,
    pub error_title: &'static str,
}

impl NoticeText {
    pub const SIGN_IN: NoticeText = NoticeText {
        success_title: "Welcome back",
        success_message: "You are now signed in.",
        error_title: "Sign in failed",
    };
    pub const SIGN_UP: NoticeText = NoticeText {
        success_title: "Account created",
        success_message: "Your account is ready.",
        error_title: "Sign up failed",
    };
    pub const DELETE_LISTING: NoticeText = NoticeText {
        success_title: "Listing deleted",
        success_message: "The property was removed from your listings.",
        error_title: "Delete failed",
    };
    pub const VERIFICATION: NoticeText = NoticeText {
        success_title: "Documents submitted",
        success_message: "Your property verification is under review.",
        error_title: "Upload failed",
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn from_outcome<T>(outcome: &Outcome<T>, text: NoticeText) -> Self {
        match outcome {
            Ok(_) => Self {
                kind: NoticeKind::Success,
                title: text.success_title.to_string(),
                message: text.success_message.to_string(),
            },
            Err(failure) => Self {
                kind: NoticeKind::Error,
                title: text.error_title.to_string(),
                message: failure.message.clone(),
            },
        }
    }

    pub fn deliver<N>(&self, notifier: &N)
    where
        N: Notifier + ?Sized,
    {
        notifier.notify(self.kind, &self.title, &self.message);
    }
}

/// Routes notices into the log instead of a UI.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, title: &str, message: &str) {
        match kind {
            NoticeKind::Success => info!(title, message, "notice"),
            NoticeKind::Error => warn!(title, message, "notice"),
        }
    }
}

/// Keeps every notice so tests can assert on them.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, title: &str, message: &str) {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(Notice {
                kind,
                title: title.to_string(),
                message: message.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{ActionFailure, FailureKind};

    #[test]
    fn failure_notice_carries_the_failure_message() {
        let outcome: Outcome<()> = Err(ActionFailure::new(
            FailureKind::Server,
            "Your Password or Username is wrong",
        ));
        let notice = Notice::from_outcome(&outcome, NoticeText::SIGN_IN);
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.title, "Sign in failed");
        assert_eq!(notice.message, "Your Password or Username is wrong");
    }

    #[test]
    fn success_notice_uses_action_copy() {
        let outcome: Outcome<()> = Ok(());
        let notifier = RecordingNotifier::default();
        Notice::from_outcome(&outcome, NoticeText::DELETE_LISTING).deliver(&notifier);

        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Success);
        assert_eq!(notices[0].title, "Listing deleted");
    }
}
