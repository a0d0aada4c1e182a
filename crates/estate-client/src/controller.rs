//! What a screen does around each client call: hold the trigger's slot, run the
//! call, show a notice, and move on after a successful sign-in.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::action::ActionSlot;
use crate::api::{ApiClient, IdentityProvider, SignUpRequest};
use crate::navigation::{Navigator, Screen};
use crate::notify::{Notice, NoticeText, Notifier};
use crate::outcome::Outcome;
use crate::session::SessionStore;
use crate::upload::{
    DocumentSlot, FileDescriptor, PendingUploadSet, UploadProgress, VerificationRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    SignIn,
    IdentityExchange,
    SignUp,
    DeleteListing,
    SubmitVerification,
}

/// The user's answer to "delete this listing?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// What happened to one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<T> {
    /// The call ran to a terminal outcome.
    Completed(Outcome<T>),
    /// The same action was already in flight; nothing was sent.
    Busy,
    /// The user declined the confirmation; nothing was sent.
    Declined,
}

impl<T> Dispatch<T> {
    pub fn outcome(self) -> Option<Outcome<T>> {
        match self {
            Dispatch::Completed(outcome) => Some(outcome),
            Dispatch::Busy | Dispatch::Declined => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Dispatch::Busy)
    }
}

#[derive(Debug, Default)]
struct Slots {
    sign_in: ActionSlot,
    identity: ActionSlot,
    sign_up: ActionSlot,
    delete: ActionSlot,
    verify: ActionSlot,
}

pub struct ScreenController<S, N, V> {
    client: Arc<ApiClient<S>>,
    notifier: Arc<N>,
    navigator: Arc<V>,
    slots: Slots,
    documents: Mutex<PendingUploadSet>,
    progress: UploadProgress,
}

impl<S, N, V> ScreenController<S, N, V>
where
    S: SessionStore + 'static,
    N: Notifier + 'static,
    V: Navigator + 'static,
{
    pub fn new(client: Arc<ApiClient<S>>, notifier: Arc<N>, navigator: Arc<V>) -> Self {
        Self {
            client,
            notifier,
            navigator,
            slots: Slots::default(),
            documents: Mutex::new(PendingUploadSet::new()),
            progress: UploadProgress::new(),
        }
    }

    /// Replace the upload progress sink, e.g. with one that drives a progress bar.
    pub fn with_progress(mut self, progress: UploadProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn client(&self) -> &Arc<ApiClient<S>> {
        &self.client
    }

    pub fn slot(&self, action: ActionKind) -> &ActionSlot {
        match action {
            ActionKind::SignIn => &self.slots.sign_in,
            ActionKind::IdentityExchange => &self.slots.identity,
            ActionKind::SignUp => &self.slots.sign_up,
            ActionKind::DeleteListing => &self.slots.delete,
            ActionKind::SubmitVerification => &self.slots.verify,
        }
    }

    pub fn progress(&self) -> &UploadProgress {
        &self.progress
    }

    pub fn pick_document(&self, slot: DocumentSlot, file: FileDescriptor) {
        self.documents().pick(slot, file);
    }

    pub fn clear_document(&self, slot: DocumentSlot) {
        self.documents().clear(slot);
    }

    /// The verification sheet was closed without submitting.
    pub fn dismiss_verification(&self) {
        self.documents().clear_all();
    }

    pub fn pending_documents(&self) -> PendingUploadSet {
        self.documents().clone()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Dispatch<Value> {
        let Some(_guard) = self.slots.sign_in.try_begin() else {
            return Dispatch::Busy;
        };
        let outcome = self.client.submit_credentials(email, password).await;
        self.finish_auth(outcome, NoticeText::SIGN_IN)
    }

    pub async fn sign_in_with(
        &self,
        provider: IdentityProvider,
        access_token: &str,
    ) -> Dispatch<Value> {
        let Some(_guard) = self.slots.identity.try_begin() else {
            return Dispatch::Busy;
        };
        let outcome = self
            .client
            .exchange_identity_token(provider, access_token)
            .await;
        self.finish_auth(outcome, NoticeText::SIGN_IN)
    }

    pub async fn sign_up(&self, request: &SignUpRequest) -> Dispatch<Value> {
        let Some(_guard) = self.slots.sign_up.try_begin() else {
            return Dispatch::Busy;
        };
        let outcome = self.client.register_account(request).await;
        self.finish_auth(outcome, NoticeText::SIGN_UP)
    }

    pub async fn delete_listing(
        &self,
        listing_id: &str,
        confirmation: Confirmation,
    ) -> Dispatch<()> {
        if confirmation == Confirmation::Declined {
            return Dispatch::Declined;
        }
        let Some(_guard) = self.slots.delete.try_begin() else {
            return Dispatch::Busy;
        };
        let outcome = self.client.delete_resource(listing_id).await;
        Notice::from_outcome(&outcome, NoticeText::DELETE_LISTING)
            .deliver(self.notifier.as_ref());
        Dispatch::Completed(outcome)
    }

    /// Upload the picked documents; the selection is cleared once the server accepts them.
    pub async fn submit_verification(&self, request: &VerificationRequest) -> Dispatch<()> {
        let Some(_guard) = self.slots.verify.try_begin() else {
            return Dispatch::Busy;
        };
        let documents = self.pending_documents();
        let outcome = self
            .client
            .submit_verification(request, &documents, &self.progress)
            .await;
        if outcome.is_ok() {
            self.documents().clear_all();
        }
        Notice::from_outcome(&outcome, NoticeText::VERIFICATION)
            .deliver(self.notifier.as_ref());
        Dispatch::Completed(outcome)
    }

    fn finish_auth(&self, outcome: Outcome<Value>, text: NoticeText) -> Dispatch<Value> {
        Notice::from_outcome(&outcome, text).deliver(self.notifier.as_ref());
        if outcome.is_ok() {
            self.navigator.go_to(Screen::Home, None);
        }
        Dispatch::Completed(outcome)
    }

    fn documents(&self) -> std::sync::MutexGuard<'_, PendingUploadSet> {
        self.documents.lock().expect("document mutex poisoned")
    }
}
