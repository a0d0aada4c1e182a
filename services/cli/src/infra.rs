use estate_client::notify::{NoticeKind, Notifier};
use estate_client::upload::UploadProgress;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

/// Prints notices the way a toast would show them.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NoticeKind, title: &str, message: &str) {
        match kind {
            NoticeKind::Success => println!("{title}: {message}"),
            NoticeKind::Error => eprintln!("{title}: {message}"),
        }
    }
}

/// Upload progress rendered as a single rewritten stderr line.
pub(crate) fn console_progress() -> UploadProgress {
    UploadProgress::with_listener(|percent| {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\rUploading documents... {percent:>3}%");
        if percent == 100 {
            let _ = writeln!(stderr);
        }
    })
}

#[derive(Debug, Clone)]
pub(crate) struct StubAccount {
    pub(crate) password: String,
    pub(crate) user: Value,
}

/// Backing data for the stub backend.
#[derive(Debug, Default)]
pub(crate) struct StubData {
    pub(crate) accounts: HashMap<String, StubAccount>,
    pub(crate) listings: BTreeSet<String>,
    pub(crate) verifications: Vec<Value>,
    next_user_id: u64,
}

impl StubData {
    /// One demo account and three listings.
    pub(crate) fn seeded() -> Self {
        let mut data = Self::default();
        data.register("Demo Owner", DEMO_EMAIL, "+15550100", DEMO_PASSWORD);
        data.listings
            .extend(["1", "2", "3"].into_iter().map(str::to_string));
        data
    }

    pub(crate) fn register(
        &mut self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
    ) -> Value {
        self.next_user_id += 1;
        let user = json!({
            "id": self.next_user_id,
            "name": name,
            "email": email,
            "phone": phone,
        });
        self.accounts.insert(
            email.to_ascii_lowercase(),
            StubAccount {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    pub(crate) fn account(&self, email: &str) -> Option<&StubAccount> {
        self.accounts.get(&email.to_ascii_lowercase())
    }
}

pub(crate) const DEMO_EMAIL: &str = "demo@estate.test";
pub(crate) const DEMO_PASSWORD: &str = "demo-password";

#[derive(Clone)]
pub(crate) struct StubState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) data: Arc<Mutex<StubData>>,
}

impl StubState {
    pub(crate) fn seeded() -> Self {
        Self {
            readiness: Arc::new(AtomicBool::new(false)),
            data: Arc::new(Mutex::new(StubData::seeded())),
        }
    }

    pub(crate) fn data(&self) -> std::sync::MutexGuard<'_, StubData> {
        self.data.lock().expect("stub mutex poisoned")
    }
}
