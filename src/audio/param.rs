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

//! Automatable parameter values scheduled against the audio clock.
//!
//! Changes are scheduled at absolute times (seconds on the audio clock) and
//! evaluated by the renderer per frame, so a value can glide between settings
//! instead of jumping.

/// A scheduled change.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    /// Jump to `value` at `time`.
    SetValue { time: f64, value: f32 },
    /// Ramp linearly from the previous event's value, arriving at `value` at `time`.
    LinearRamp { time: f64, value: f32 },
    /// Approach `target` exponentially from `time` with the given time constant.
    SetTarget {
        time: f64,
        target: f32,
        time_constant: f64,
    },
}

impl Event {
    fn time(&self) -> f64 {
        match *self {
            Event::SetValue { time, .. } => time,
            Event::LinearRamp { time, .. } => time,
            Event::SetTarget { time, .. } => time,
        }
    }
}

fn approach(from: f32, target: f32, time_constant: f64, elapsed: f64) -> f32 {
    if time_constant <= 0.0 {
        return target;
    }
    target + (from - target) * (-elapsed / time_constant).exp() as f32
}

/// A parameter with an automation timeline.
#[derive(Debug, Clone)]
pub struct AudioParam {
    default_value: f32,
    events: Vec<Event>,
}

impl AudioParam {
    /// Creates a parameter holding `value` until something is scheduled.
    pub fn new(value: f32) -> AudioParam {
        AudioParam {
            default_value: value,
            events: Vec::new(),
        }
    }

    /// Events with equal times keep their scheduling order.
    fn insert(&mut self, event: Event) {
        let index = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(index, event);
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(Event::SetValue { time, value });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(Event::LinearRamp { time, value });
    }

    pub fn set_target_at_time(&mut self, target: f32, start_time: f64, time_constant: f64) {
        self.insert(Event::SetTarget {
            time: start_time,
            target,
            time_constant,
        });
    }

    /// Freezes the value the parameter has at `time` and drops every other
    /// event. Values before `time` are no longer tracked.
    pub fn cancel_and_hold_at_time(&mut self, time: f64) {
        let held = self.value_at(time);
        self.events.clear();
        self.events.push(Event::SetValue { time, value: held });
    }

    /// Returns the number of scheduled events.
    pub fn scheduled(&self) -> usize {
        self.events.len()
    }

    /// Evaluates the parameter at the given time.
    pub fn value_at(&self, time: f64) -> f32 {
        let mut value = self.default_value;
        let mut value_time = 0.0;
        let mut target: Option<(f32, f64)> = None;

        for event in &self.events {
            match *event {
                Event::SetValue { time: at, value: v } => {
                    if at > time {
                        break;
                    }
                    value = v;
                    value_time = at;
                    target = None;
                }
                Event::LinearRamp { time: end, value: v } => {
                    // A ramp supersedes any running approach and starts from the
                    // value at the previous event.
                    target = None;
                    if end > time {
                        let span = end - value_time;
                        let progress = ((time - value_time) / span) as f32;
                        return value + (v - value) * progress;
                    }
                    value = v;
                    value_time = end;
                }
                Event::SetTarget {
                    time: at,
                    target: t,
                    time_constant,
                } => {
                    if at > time {
                        break;
                    }
                    if let Some((previous, tc)) = target {
                        value = approach(value, previous, tc, at - value_time);
                    }
                    value_time = at;
                    target = Some((t, time_constant));
                }
            }
        }

        match target {
            Some((t, tc)) => approach(value, t, tc, time - value_time),
            None => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_default_value() {
        let param = AudioParam::new(0.7);
        assert_eq!(param.value_at(0.0), 0.7);
        assert_eq!(param.value_at(100.0), 0.7);
    }

    #[test]
    fn test_set_value() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at_time(0.25, 2.0);
        assert_eq!(param.value_at(1.9), 1.0);
        assert_eq!(param.value_at(2.0), 0.25);
        assert_eq!(param.value_at(5.0), 0.25);
    }

    #[test]
    fn test_linear_release_ramp() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at_time(1.0, 3.0);
        param.linear_ramp_to_value_at_time(0.0001, 4.0);

        assert_eq!(param.value_at(2.0), 1.0);
        assert_eq!(param.value_at(3.0), 1.0);
        assert!(close(param.value_at(3.5), 0.50005));
        assert!(close(param.value_at(4.0), 0.0001));
        assert!(close(param.value_at(10.0), 0.0001));

        // Strictly decreasing through the ramp.
        let mut last = f32::MAX;
        for step in 0..=100 {
            let v = param.value_at(3.0 + step as f64 / 100.0);
            assert!(v < last);
            last = v;
        }
    }

    #[test]
    fn test_set_target_approaches() {
        let mut param = AudioParam::new(1.0);
        param.set_target_at_time(0.5, 1.0, 0.015);

        assert_eq!(param.value_at(0.5), 1.0);
        assert_eq!(param.value_at(1.0), 1.0);
        // One time constant covers ~63% of the distance.
        assert!(close(param.value_at(1.015), 0.5 + 0.5 * (-1.0f32).exp()));
        assert!(close(param.value_at(1.5), 0.5));
    }

    #[test]
    fn test_retarget_is_smooth() {
        let mut param = AudioParam::new(1.0);
        param.cancel_and_hold_at_time(0.2);
        param.set_target_at_time(0.5, 0.2, 0.015);
        param.cancel_and_hold_at_time(0.2);
        param.set_target_at_time(0.8, 0.2, 0.015);

        assert_eq!(param.scheduled(), 2);
        assert_eq!(param.value_at(0.2), 1.0);

        // One glide from 1.0 to 0.8 that never dips toward the superseded 0.5.
        let mut last = 1.0;
        for step in 1..=200 {
            let v = param.value_at(0.2 + step as f64 * 0.001);
            assert!(v <= last);
            assert!(v >= 0.8);
            last = v;
        }
        assert!(close(param.value_at(1.0), 0.8));
    }

    #[test]
    fn test_cancel_and_hold_mid_ramp() {
        let mut param = AudioParam::new(0.0);
        param.set_value_at_time(0.0, 0.0);
        param.linear_ramp_to_value_at_time(1.0, 1.0);
        param.cancel_and_hold_at_time(0.5);

        assert!(close(param.value_at(0.5), 0.5));
        assert!(close(param.value_at(2.0), 0.5));
    }
}
