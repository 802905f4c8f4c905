// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor errors and the error bridge.
//!
//! The bridge translates low-level errors and payload faults into
//! structured events, runs the registered handler chain in order, and
//! drops anything below the ambient severity threshold.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use warden_core::{LogLevel, OptionsError};

use crate::payload::Payload;

/// Errors surfaced by the dispatcher and supervisor.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error("identity switch requires root (effective uid {euid})")]
    IdentityRequiresRoot { euid: u32 },

    #[error("fork failed: {0}")]
    Fork(#[source] nix::errno::Errno),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("payload error: {0}")]
    Payload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handler mask matching every error code.
pub const MASK_ALL: u32 = u32::MAX;

/// A structured error event delivered to handlers and the payload hook.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    /// Error-kind bits, intersected with each handler's mask.
    pub code: u32,
    pub severity: LogLevel,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub context: Option<String>,
}

impl ErrorEvent {
    pub fn new(code: u32, severity: LogLevel, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            file: None,
            line: None,
            context: None,
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

/// What a handler wants done with the rest of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Terminate the handler chain for this event.
    Stop,
}

/// Opaque handle returned by [`ErrorBridge::add_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(usize);

enum Entry {
    Func(Box<dyn FnMut(&ErrorEvent) -> Flow>),
    /// The payload's `on_error` hook, attached during the start sequence.
    PayloadHook,
}

/// Ordered chain of error handlers with per-handler code masks.
pub struct ErrorBridge {
    next_id: usize,
    entries: Vec<(HandlerId, u32, Entry)>,
    threshold: LogLevel,
}

impl ErrorBridge {
    pub fn new(threshold: LogLevel) -> Self {
        Self { next_id: 0, entries: Vec::new(), threshold }
    }

    /// Register a handler for events whose code intersects `mask`.
    pub fn add_handler(
        &mut self,
        handler: impl FnMut(&ErrorEvent) -> Flow + 'static,
        mask: u32,
    ) -> HandlerId {
        self.push(mask, Entry::Func(Box::new(handler)))
    }

    /// Route events through the payload's `on_error` hook, in chain order.
    pub fn attach_payload_hook(&mut self) -> HandlerId {
        self.push(MASK_ALL, Entry::PayloadHook)
    }

    fn push(&mut self, mask: u32, entry: Entry) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, mask, entry));
        id
    }

    pub fn remove_handler(&mut self, id: HandlerId) {
        self.entries.retain(|(entry_id, _, _)| *entry_id != id);
    }

    /// Deliver one event: log it, then run matching handlers in
    /// registration order until one returns [`Flow::Stop`].
    pub fn dispatch(&mut self, event: &ErrorEvent, payload: &mut dyn Payload) {
        if event.severity < self.threshold {
            return;
        }
        log_event(event);
        for (_, mask, entry) in &mut self.entries {
            if *mask & event.code == 0 {
                continue;
            }
            let flow = match entry {
                Entry::Func(f) => f(event),
                Entry::PayloadHook => payload.on_error(event),
            };
            if flow == Flow::Stop {
                break;
            }
        }
    }

    /// Route an uncaught payload error through the chain.
    pub fn exception(&mut self, message: &str, payload: &mut dyn Payload) {
        let event = ErrorEvent::new(MASK_ALL, LogLevel::Error, message);
        self.dispatch(&event, payload);
    }
}

fn log_event(event: &ErrorEvent) {
    let location = match (&event.file, event.line) {
        (Some(file), Some(line)) => format!(" at {file}:{line}"),
        (Some(file), None) => format!(" at {file}"),
        _ => String::new(),
    };
    match event.severity {
        LogLevel::Error => error!(code = event.code, "{}{}", event.message, location),
        LogLevel::Warning => warn!(code = event.code, "{}{}", event.message, location),
        LogLevel::Info => info!(code = event.code, "{}{}", event.message, location),
        LogLevel::Debug | LogLevel::Trace => {
            debug!(code = event.code, "{}{}", event.message, location)
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
