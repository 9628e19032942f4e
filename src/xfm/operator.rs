use std::fmt;
use rand::Rng;

use crate::Ranged;

use crate::xfm::{
    OPERATOR_COUNT,
    Level,
    Feedback,
    Ratio,
    Frequency,
    Detune,
    Gain,
    Curvature,
    Breakpoint,
    CurveStyle,
    Switch,
};

use crate::xfm::envelope::{
    OperatorEnvelope,
    Stage,
};

/// One parameter of an operator, as addressed by the payload layout.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OperatorParameter {
    Feedback,
    Input(usize),  // modulation from another operator, 0...3
    Output,
    PitchEnv,
    Fixed,
    Ratio,
    Freq,
    Detune,
    Level,
    VelSens,
    Time,
    Scale,
    LeftGain,
    RightGain,
    LeftCurve,
    RightCurve,
    UpCurve,
    DownCurve,
    EnvTime(Stage),
    EnvLevel(Stage),
}

/// Operator.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Operator {
    pub feedback: Feedback,  // -63.0 ~ +64.0 in tenths
    pub inputs: [Level; OPERATOR_COUNT],  // own slot is not sent
    pub output: Level,
    pub pitch_env: Switch,
    pub fixed: Switch,
    pub ratio: Ratio,  // 0.50 ~ 32.00 in hundredths
    pub freq: Frequency,  // used only when fixed
    pub detune: Detune,
    pub level: Level,
    pub vel_sens: Level,
    pub time: Level,
    pub scale: Breakpoint,
    pub left_gain: Gain,
    pub right_gain: Gain,
    pub left_curve: CurveStyle,
    pub right_curve: CurveStyle,
    pub up_curve: Curvature,
    pub down_curve: Curvature,
    pub eg: OperatorEnvelope,
}

impl Operator {
    /// Creates a new operator with the init patch settings.
    /// The output is off; the init patch turns it on for operator 1.
    pub fn new() -> Self {
        Self {
            feedback: Feedback::default(),
            inputs: [Level::new(0); OPERATOR_COUNT],
            output: Level::new(0),
            pitch_env: Switch::default(),
            fixed: Switch::default(),
            ratio: Ratio::default(),
            freq: Frequency::default(),
            detune: Detune::default(),
            level: Level::new(127),
            vel_sens: Level::new(0),
            time: Level::new(0),
            scale: Breakpoint::default(),
            left_gain: Gain::default(),
            right_gain: Gain::default(),
            left_curve: CurveStyle::Linear,
            right_curve: CurveStyle::Linear,
            up_curve: Curvature::default(),
            down_curve: Curvature::default(),
            eg: OperatorEnvelope::new(),
        }
    }

    /// Makes a new random operator.
    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self {
            feedback: Feedback::random(),
            inputs: [Level::random(), Level::random(), Level::random(), Level::random()],
            output: Level::random(),
            pitch_env: Switch::from(rng.random::<bool>()),
            fixed: Switch::from(rng.random::<bool>()),
            ratio: Ratio::random(),
            freq: Frequency::random(),
            detune: Detune::random(),
            level: Level::random(),
            vel_sens: Level::random(),
            time: Level::random(),
            scale: Breakpoint::random(),
            left_gain: Gain::random(),
            right_gain: Gain::random(),
            left_curve: CurveStyle::from(rng.random::<bool>()),
            right_curve: CurveStyle::from(rng.random::<bool>()),
            up_curve: Curvature::random(),
            down_curve: Curvature::random(),
            eg: OperatorEnvelope::random(),
        }
    }

    /// Gets the raw value of a parameter. Curve styles are 0 or 1.
    pub fn get(&self, parameter: OperatorParameter) -> i32 {
        match parameter {
            OperatorParameter::Feedback => self.feedback.value(),
            OperatorParameter::Input(source) => self.inputs[source].value(),
            OperatorParameter::Output => self.output.value(),
            OperatorParameter::PitchEnv => self.pitch_env.value(),
            OperatorParameter::Fixed => self.fixed.value(),
            OperatorParameter::Ratio => self.ratio.value(),
            OperatorParameter::Freq => self.freq.value(),
            OperatorParameter::Detune => self.detune.value(),
            OperatorParameter::Level => self.level.value(),
            OperatorParameter::VelSens => self.vel_sens.value(),
            OperatorParameter::Time => self.time.value(),
            OperatorParameter::Scale => self.scale.value(),
            OperatorParameter::LeftGain => self.left_gain.value(),
            OperatorParameter::RightGain => self.right_gain.value(),
            OperatorParameter::LeftCurve => bool::from(self.left_curve) as i32,
            OperatorParameter::RightCurve => bool::from(self.right_curve) as i32,
            OperatorParameter::UpCurve => self.up_curve.value(),
            OperatorParameter::DownCurve => self.down_curve.value(),
            OperatorParameter::EnvTime(stage) => self.eg.time(stage).value(),
            OperatorParameter::EnvLevel(stage) => self.eg.level(stage).value(),
        }
    }

    /// Sets a parameter from a raw value. Values outside the range of
    /// the parameter are clamped; any nonzero value sets a curve bit.
    pub fn set(&mut self, parameter: OperatorParameter, value: i32) {
        match parameter {
            OperatorParameter::Feedback => self.feedback = Feedback::clamped(value),
            OperatorParameter::Input(source) => self.inputs[source] = Level::clamped(value),
            OperatorParameter::Output => self.output = Level::clamped(value),
            OperatorParameter::PitchEnv => self.pitch_env = Switch::clamped(value),
            OperatorParameter::Fixed => self.fixed = Switch::clamped(value),
            OperatorParameter::Ratio => self.ratio = Ratio::clamped(value),
            OperatorParameter::Freq => self.freq = Frequency::clamped(value),
            OperatorParameter::Detune => self.detune = Detune::clamped(value),
            OperatorParameter::Level => self.level = Level::clamped(value),
            OperatorParameter::VelSens => self.vel_sens = Level::clamped(value),
            OperatorParameter::Time => self.time = Level::clamped(value),
            OperatorParameter::Scale => self.scale = Breakpoint::clamped(value),
            OperatorParameter::LeftGain => self.left_gain = Gain::clamped(value),
            OperatorParameter::RightGain => self.right_gain = Gain::clamped(value),
            OperatorParameter::LeftCurve => self.left_curve = CurveStyle::from(value != 0),
            OperatorParameter::RightCurve => self.right_curve = CurveStyle::from(value != 0),
            OperatorParameter::UpCurve => self.up_curve = Curvature::clamped(value),
            OperatorParameter::DownCurve => self.down_curve = Curvature::clamped(value),
            OperatorParameter::EnvTime(stage) => self.eg.times[stage.index()] = Level::clamped(value),
            OperatorParameter::EnvLevel(stage) => self.eg.levels[stage.index()] = Level::clamped(value),
        }
    }
}

impl Default for Operator {
    fn default() -> Self {
        Operator::new()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EG: {}
Feedback = {:.1}, Inputs = {:?}, Output = {}
Level = {}, Vel sens = {}, Time = {}
Mode = {}, Ratio = {:.2}, Freq = {}, Detune = {}, Pitch env = {}
Scale = {}, Gain L/R = {}/{}, Curve L/R = {}/{}, Curve up/down = {}/{}
",
            self.eg,
            self.feedback.as_f32(),
            self.inputs.map(|level| level.value()),
            self.output,
            self.level,
            self.vel_sens,
            self.time,
            if self.fixed.is_on() { "FIXED" } else { "RATIO" },
            self.ratio.as_f32(),
            self.freq,
            self.detune,
            if self.pitch_env.is_on() { "ON" } else { "OFF" },
            self.scale.name(),
            self.left_gain,
            self.right_gain,
            self.left_curve,
            self.right_curve,
            self.up_curve,
            self.down_curve)
    }
}
