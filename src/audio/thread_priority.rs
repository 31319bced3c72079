// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Scheduling for the cpal output callback.
//!
//! The callback runs on a thread the audio backend creates, so its priority
//! can only be raised from inside the callback. A [`CallbackPriority`] is read
//! from the environment when the stream is built and applied on the first
//! callback.
//!
//! - `KEYSAMPLER_THREAD_PRIORITY`: 0-99, default 70.
//! - `KEYSAMPLER_DISABLE_RT_AUDIO`: set to `1`, `true`, `yes` or `on` to keep
//!   the callback off SCHED_FIFO.

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{debug, info, warn};

const PRIORITY_VAR: &str = "KEYSAMPLER_THREAD_PRIORITY";
const DISABLE_RT_VAR: &str = "KEYSAMPLER_DISABLE_RT_AUDIO";
const DEFAULT_PRIORITY: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheduling {
    /// Priority only, under the default policy.
    Normal,
    /// Priority plus the real-time FIFO policy where available.
    Fifo,
}

/// Priority settings for one output stream's callback thread.
#[derive(Debug)]
pub struct CallbackPriority {
    priority: Option<ThreadPriorityValue>,
    scheduling: Scheduling,
    applied: bool,
}

impl CallbackPriority {
    /// Reads the settings from the environment. Call this while building the
    /// stream, never from the callback.
    pub fn from_env() -> CallbackPriority {
        CallbackPriority::from_settings(
            std::env::var(PRIORITY_VAR).ok().as_deref(),
            std::env::var(DISABLE_RT_VAR).ok().as_deref(),
        )
    }

    fn from_settings(priority: Option<&str>, disable_rt: Option<&str>) -> CallbackPriority {
        let requested = match priority {
            Some(value) => match value.trim().parse::<u8>() {
                Ok(level) if level < 100 => level,
                _ => {
                    warn!(
                        value,
                        default = DEFAULT_PRIORITY,
                        "Invalid {}, using the default",
                        PRIORITY_VAR
                    );
                    DEFAULT_PRIORITY
                }
            },
            None => DEFAULT_PRIORITY,
        };

        let scheduling = if disable_rt.is_some_and(is_enabled) {
            Scheduling::Normal
        } else {
            Scheduling::Fifo
        };

        CallbackPriority {
            priority: ThreadPriorityValue::try_from(requested).ok(),
            scheduling,
            applied: false,
        }
    }

    /// Applies the settings to the calling thread. Only the first call does
    /// anything; later calls return immediately.
    pub fn apply_once(&mut self) {
        if self.applied {
            return;
        }
        self.applied = true;

        let Some(priority) = self.priority else {
            return;
        };
        let priority = ThreadPriority::Crossplatform(priority);
        if let Err(e) = set_current_thread_priority(priority) {
            debug!(error = ?e, "Unable to raise audio callback priority");
        }
        if self.scheduling == Scheduling::Fifo {
            set_fifo(priority);
        }
    }
}

fn is_enabled(value: &str) -> bool {
    ["1", "true", "yes", "on"]
        .iter()
        .any(|flag| value.trim().eq_ignore_ascii_case(flag))
}

#[cfg(unix)]
fn set_fifo(priority: ThreadPriority) {
    use thread_priority::unix::{
        set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
        ThreadSchedulePolicy,
    };

    match set_thread_priority_and_policy(
        thread_native_id(),
        priority,
        ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
    ) {
        Ok(()) => info!("Audio callback running with SCHED_FIFO"),
        Err(e) => warn!(error = %e, "Unable to use SCHED_FIFO for the audio callback"),
    }
}

#[cfg(not(unix))]
fn set_fifo(_priority: ThreadPriority) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(value: u8) -> Option<ThreadPriorityValue> {
        ThreadPriorityValue::try_from(value).ok()
    }

    #[test]
    fn test_defaults() {
        let settings = CallbackPriority::from_settings(None, None);
        assert_eq!(settings.priority, level(DEFAULT_PRIORITY));
        assert_eq!(settings.scheduling, Scheduling::Fifo);
        assert!(!settings.applied);
    }

    #[test]
    fn test_priority_override() {
        assert_eq!(
            CallbackPriority::from_settings(Some("40"), None).priority,
            level(40)
        );
        for invalid in ["100", "-1", "high", ""] {
            assert_eq!(
                CallbackPriority::from_settings(Some(invalid), None).priority,
                level(DEFAULT_PRIORITY),
                "{}",
                invalid
            );
        }
    }

    #[test]
    fn test_rt_opt_out() {
        for (value, scheduling) in [
            ("1", Scheduling::Normal),
            ("TRUE", Scheduling::Normal),
            (" on ", Scheduling::Normal),
            ("0", Scheduling::Fifo),
            ("nah", Scheduling::Fifo),
        ] {
            assert_eq!(
                CallbackPriority::from_settings(None, Some(value)).scheduling,
                scheduling,
                "{}",
                value
            );
        }
    }

    #[test]
    fn test_applies_once() {
        // Keep the test thread off the real-time policy.
        let mut settings = CallbackPriority::from_settings(None, Some("1"));
        settings.apply_once();
        assert!(settings.applied);
        settings.apply_once();
        assert!(settings.applied);
    }
}
