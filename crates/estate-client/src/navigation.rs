use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::info;

/// Screens an auth flow can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
}

impl Screen {
    pub fn name(self) -> &'static str {
        match self {
            Screen::Home => "Home",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host navigation. Only called after an auth flow succeeds.
pub trait Navigator: Send + Sync {
    fn go_to(&self, screen: Screen, params: Option<Value>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn go_to(&self, screen: Screen, params: Option<Value>) {
        info!(%screen, has_params = params.is_some(), "navigate");
    }
}

#[derive(Debug, Default, Clone)]
pub struct RecordingNavigator {
    visits: Arc<Mutex<Vec<(Screen, Option<Value>)>>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<(Screen, Option<Value>)> {
        self.visits.lock().expect("navigator mutex poisoned").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn go_to(&self, screen: Screen, params: Option<Value>) {
        self.visits
            .lock()
            .expect("navigator mutex poisoned")
            .push((screen, params));
    }
}
