//! Drowsiness decision engine
//!
//! Two debounced detectors share one alarm:
//!
//! - the eye detector counts consecutive closed-eye frames and latches a
//!   drowsiness alarm once the count reaches `consec_frames`; the latch clears
//!   as soon as the eyes reopen, so the alarm edge fires once per episode
//! - the mouth detector counts yawn onsets inside a rolling window and
//!   escalates to a frequent-yawning alarm after `yawn_alert_count` of them
//!
//! Both run on every sample. Status precedence is
//! `Drowsy > Yawning > EyesClosing > Normal` and at most one alarm edge is
//! reported per frame (`Drowsiness > FrequentYawning > Yawn`).
//!
//! Frames without a face leave the state untouched until
//! `missing_face_frames` of them have passed in a row, after which the state
//! decays to `Normal`.

use crate::config::DecisionConfig;
use crate::ratios::RatioSample;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Driver status reported per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DriverStatus {
    #[default]
    Normal,
    /// Eyes closed for fewer frames than the drowsiness threshold
    EyesClosing,
    Drowsy,
    Yawning,
}

impl DriverStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Normal => "Normal",
            DriverStatus::EyesClosing => "EyesClosing",
            DriverStatus::Drowsy => "Drowsy",
            DriverStatus::Yawning => "Yawning",
        }
    }

    /// Statuses worth a snapshot and an on-screen warning
    pub fn is_alert(&self) -> bool {
        matches!(self, DriverStatus::Drowsy | DriverStatus::Yawning)
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which condition raised an alarm edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmKind {
    Drowsiness,
    FrequentYawning,
    Yawn,
}

impl AlarmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmKind::Drowsiness => "DrowsinessAlarm",
            AlarmKind::FrequentYawning => "FrequentYawningAlarm",
            AlarmKind::Yawn => "YawnAlarm",
        }
    }

    /// Higher wins when two alarms compete for the same frame or the same speaker
    pub fn priority(&self) -> u8 {
        match self {
            AlarmKind::Drowsiness => 2,
            AlarmKind::FrequentYawning => 1,
            AlarmKind::Yawn => 0,
        }
    }
}

impl fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholded view of one face: what the engine actually reacts to
///
/// Ratio samples are thresholded through [`Observation::from_sample`]; the
/// image classifier produces observations directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Observation {
    pub eyes_closed: bool,
    pub mouth_open: bool,
}

impl Observation {
    pub fn from_sample(sample: &RatioSample, config: &DecisionConfig) -> Self {
        Self {
            eyes_closed: sample.ear < config.ear_threshold,
            mouth_open: sample.mar > config.mar_threshold,
        }
    }
}

/// State carried between frames
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecisionState {
    /// Consecutive closed-eye frames
    pub closed_frames: u32,
    /// Drowsiness alarm latched for the current closed-eye episode
    pub alarm_active: bool,
    /// Yawns inside the current window
    pub yawn_count: u32,
    /// Session time of the most recent yawn onset
    pub last_yawn_at: Option<Duration>,
    /// Mouth was open on the previous face frame
    pub mouth_open: bool,
    /// Consecutive frames without a face
    pub missed_frames: u32,
    pub status: DriverStatus,
}

/// Outcome of one engine step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub status: DriverStatus,
    /// Alarm edge raised on this frame
    pub alarm: Option<AlarmKind>,
    pub closed_frames: u32,
    pub yawn_count: u32,
    /// A yawn started on this frame
    pub yawn_started: bool,
    /// The face has been missing long enough for the state to decay on this frame
    pub face_lost: bool,
}

impl DecisionState {
    /// Advance by one frame. `at` is the session time of the frame.
    pub fn step(
        mut self,
        config: &DecisionConfig,
        observation: Option<Observation>,
        at: Duration,
    ) -> (Self, Decision) {
        self.expire_yawns(config, at);

        let mut alarm = None;
        let mut yawn_started = false;
        let mut face_lost = false;

        match observation {
            None => {
                self.missed_frames = self.missed_frames.saturating_add(1);
                if self.missed_frames == config.missing_face_frames {
                    self.closed_frames = 0;
                    self.alarm_active = false;
                    self.mouth_open = false;
                    self.yawn_count = 0;
                    self.last_yawn_at = None;
                    self.status = DriverStatus::Normal;
                    face_lost = true;
                }
            }
            Some(obs) => {
                self.missed_frames = 0;

                let mut drowsy_edge = false;
                if obs.eyes_closed {
                    self.closed_frames = self.closed_frames.saturating_add(1);
                    if self.closed_frames >= config.consec_frames && !self.alarm_active {
                        self.alarm_active = true;
                        drowsy_edge = true;
                    }
                } else {
                    self.closed_frames = 0;
                    self.alarm_active = false;
                }

                let mut frequent_edge = false;
                if obs.mouth_open && !self.mouth_open {
                    yawn_started = true;
                    self.yawn_count = self.yawn_count.saturating_add(1);
                    self.last_yawn_at = Some(at);
                    if self.yawn_count >= config.yawn_alert_count {
                        frequent_edge = true;
                        self.yawn_count = 0;
                    }
                }
                self.mouth_open = obs.mouth_open;

                alarm = if drowsy_edge {
                    Some(AlarmKind::Drowsiness)
                } else if frequent_edge {
                    Some(AlarmKind::FrequentYawning)
                } else if yawn_started && config.alarm_on_yawn {
                    Some(AlarmKind::Yawn)
                } else {
                    None
                };

                self.status = if self.closed_frames >= config.consec_frames {
                    DriverStatus::Drowsy
                } else if obs.mouth_open {
                    DriverStatus::Yawning
                } else if self.closed_frames > 0 {
                    DriverStatus::EyesClosing
                } else {
                    DriverStatus::Normal
                };
            }
        }

        let decision = Decision {
            status: self.status,
            alarm,
            closed_frames: self.closed_frames,
            yawn_count: self.yawn_count,
            yawn_started,
            face_lost,
        };
        (self, decision)
    }

    /// Threshold a ratio sample and advance by one frame
    pub fn step_sample(
        self,
        config: &DecisionConfig,
        sample: Option<&RatioSample>,
        at: Duration,
    ) -> (Self, Decision) {
        let observation = sample.map(|s| Observation::from_sample(s, config));
        self.step(config, observation, at)
    }

    fn expire_yawns(&mut self, config: &DecisionConfig, at: Duration) {
        if let Some(last) = self.last_yawn_at {
            if at.saturating_sub(last) > config.yawn_window() {
                self.yawn_count = 0;
                self.last_yawn_at = None;
            }
        }
    }
}

/// Owns a config and the running state for one detection session
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: DecisionConfig,
    state: DecisionState,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self {
            config,
            state: DecisionState::default(),
        }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    pub fn state(&self) -> &DecisionState {
        &self.state
    }

    pub fn observe(&mut self, observation: Option<Observation>, at: Duration) -> Decision {
        let (state, decision) = self.state.step(&self.config, observation, at);
        self.state = state;
        decision
    }

    pub fn update(&mut self, sample: Option<&RatioSample>, at: Duration) -> Decision {
        let (state, decision) = self.state.step_sample(&self.config, sample, at);
        self.state = state;
        decision
    }

    pub fn reset(&mut self) {
        self.state = DecisionState::default();
    }
}

/// Status of a single still image: eyes first, then mouth
pub fn classify_single(config: &DecisionConfig, sample: &RatioSample) -> DriverStatus {
    if sample.ear < config.ear_threshold {
        DriverStatus::Drowsy
    } else if sample.mar > config.mar_threshold {
        DriverStatus::Yawning
    } else {
        DriverStatus::Normal
    }
}

/// Confidence in [0.5, 1.0] for [`classify_single`], from the relative margin to the deciding threshold
pub fn single_frame_confidence(config: &DecisionConfig, sample: &RatioSample) -> f32 {
    let eye_margin = (config.ear_threshold - sample.ear) / config.ear_threshold;
    let mouth_margin = (sample.mar - config.mar_threshold) / config.mar_threshold;

    let margin = match classify_single(config, sample) {
        DriverStatus::Drowsy => eye_margin,
        DriverStatus::Yawning => mouth_margin,
        // Normal is only as certain as the closer of the two thresholds
        _ => (-eye_margin).min(-mouth_margin),
    };

    0.5 + 0.5 * margin.clamp(0.0, 1.0)
}
