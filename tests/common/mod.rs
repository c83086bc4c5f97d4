//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use recipe_store::{StoreEvent, VariableType};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Type used for every test variable
pub fn float() -> VariableType {
    VariableType::new("basic:Float")
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a scoped subscriber and return its result and the log text
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let bytes = buf.0.lock().unwrap().clone();
    (result, String::from_utf8_lossy(&bytes).into_owned())
}

/// WARN lines of captured log text
pub fn warnings(logs: &str) -> Vec<&str> {
    logs.lines().filter(|l| l.contains(" WARN ")).collect()
}

/// Short description of an event, for asserting delivery order
pub fn describe(event: &StoreEvent) -> String {
    match event {
        StoreEvent::VariableAdded(e) => match &e.renamed_from {
            Some(old) => format!("added {} (from {})", e.name, old),
            None => format!("added {}", e.name),
        },
        StoreEvent::VariableRemoved(e) => match &e.renamed_to {
            Some(new) => format!("removed {} (to {})", e.name, new),
            None => format!("removed {} ({} dropped)", e.name, e.dropped.len()),
        },
        StoreEvent::DocumentActivated(e) => {
            format!("activated {} (new: {})", e.document, e.is_new)
        }
    }
}
