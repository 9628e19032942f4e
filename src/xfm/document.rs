// JSON form of a patch, as saved and loaded by patch editors:
//
//     { "Name": "INIT", "Mixer": { "Level": 0 },
//       "Pitch": { "ALevel": 0, "ATime": 0, ... },
//       "OP1": { "Feedback": 0, "OP2In": 0, ... }, ... "OP4": { ... } }
//
// Values are the raw parameter values, the same as `Patch::get` returns.
// An operator has no input from itself, so "OP1In" is left out of "OP1"
// and so on.

use serde::{Deserialize, Serialize};

use crate::xfm::OPERATOR_COUNT;
use crate::xfm::envelope::Stage;
use crate::xfm::operator::{Operator, OperatorParameter as P};
use crate::xfm::patch::{Parameter, Patch};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnvelopeDocument {
    a_level: i32,
    a_time: i32,
    d_level: i32,
    d_time: i32,
    s_level: i32,
    s_time: i32,
    r_level: i32,
    r_time: i32,
}

impl EnvelopeDocument {
    fn new(time: impl Fn(Stage) -> i32, level: impl Fn(Stage) -> i32) -> Self {
        Self {
            a_level: level(Stage::Attack),
            a_time: time(Stage::Attack),
            d_level: level(Stage::Decay),
            d_time: time(Stage::Decay),
            s_level: level(Stage::Sustain),
            s_time: time(Stage::Sustain),
            r_level: level(Stage::Release),
            r_time: time(Stage::Release),
        }
    }

    fn time(&self, stage: Stage) -> i32 {
        match stage {
            Stage::Attack => self.a_time,
            Stage::Decay => self.d_time,
            Stage::Sustain => self.s_time,
            Stage::Release => self.r_time,
        }
    }

    fn level(&self, stage: Stage) -> i32 {
        match stage {
            Stage::Attack => self.a_level,
            Stage::Decay => self.d_level,
            Stage::Sustain => self.s_level,
            Stage::Release => self.r_level,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OperatorDocument {
    feedback: i32,
    #[serde(rename = "OP1In", default, skip_serializing_if = "Option::is_none")]
    op1_in: Option<i32>,
    #[serde(rename = "OP2In", default, skip_serializing_if = "Option::is_none")]
    op2_in: Option<i32>,
    #[serde(rename = "OP3In", default, skip_serializing_if = "Option::is_none")]
    op3_in: Option<i32>,
    #[serde(rename = "OP4In", default, skip_serializing_if = "Option::is_none")]
    op4_in: Option<i32>,
    output: i32,
    pitch_env: i32,
    fixed: i32,
    ratio: i32,
    freq: i32,
    detune: i32,
    level: i32,
    vel_sens: i32,
    time: i32,
    up_curve: i32,
    dn_curve: i32,
    scale: i32,
    #[serde(flatten)]
    envelope: EnvelopeDocument,
    l_gain: i32,
    r_gain: i32,
    l_curve: i32,
    r_curve: i32,
}

impl OperatorDocument {
    fn new(index: usize, op: &Operator) -> Self {
        let input = |source: usize| (source != index).then(|| op.get(P::Input(source)));
        Self {
            feedback: op.get(P::Feedback),
            op1_in: input(0),
            op2_in: input(1),
            op3_in: input(2),
            op4_in: input(3),
            output: op.get(P::Output),
            pitch_env: op.get(P::PitchEnv),
            fixed: op.get(P::Fixed),
            ratio: op.get(P::Ratio),
            freq: op.get(P::Freq),
            detune: op.get(P::Detune),
            level: op.get(P::Level),
            vel_sens: op.get(P::VelSens),
            time: op.get(P::Time),
            up_curve: op.get(P::UpCurve),
            dn_curve: op.get(P::DownCurve),
            scale: op.get(P::Scale),
            envelope: EnvelopeDocument::new(|s| op.get(P::EnvTime(s)), |s| op.get(P::EnvLevel(s))),
            l_gain: op.get(P::LeftGain),
            r_gain: op.get(P::RightGain),
            l_curve: op.get(P::LeftCurve),
            r_curve: op.get(P::RightCurve),
        }
    }

    /// Makes the operator at `index`. Missing inputs are zero,
    /// and the input from the operator itself is ignored.
    fn to_operator(&self, index: usize) -> Operator {
        let mut op = Operator::new();

        let inputs = [self.op1_in, self.op2_in, self.op3_in, self.op4_in];
        for (source, value) in inputs.into_iter().enumerate() {
            if source != index {
                op.set(P::Input(source), value.unwrap_or(0));
            }
        }

        let values = [
            (P::Feedback, self.feedback),
            (P::Output, self.output),
            (P::PitchEnv, self.pitch_env),
            (P::Fixed, self.fixed),
            (P::Ratio, self.ratio),
            (P::Freq, self.freq),
            (P::Detune, self.detune),
            (P::Level, self.level),
            (P::VelSens, self.vel_sens),
            (P::Time, self.time),
            (P::UpCurve, self.up_curve),
            (P::DownCurve, self.dn_curve),
            (P::Scale, self.scale),
            (P::LeftGain, self.l_gain),
            (P::RightGain, self.r_gain),
            (P::LeftCurve, self.l_curve),
            (P::RightCurve, self.r_curve),
        ];
        for (parameter, value) in values {
            op.set(parameter, value);
        }

        for stage in Stage::ALL {
            op.set(P::EnvTime(stage), self.envelope.time(stage));
            op.set(P::EnvLevel(stage), self.envelope.level(stage));
        }

        op
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MixerDocument {
    level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PatchDocument {
    name: String,
    mixer: MixerDocument,
    pitch: EnvelopeDocument,
    #[serde(rename = "OP1")]
    op1: OperatorDocument,
    #[serde(rename = "OP2")]
    op2: OperatorDocument,
    #[serde(rename = "OP3")]
    op3: OperatorDocument,
    #[serde(rename = "OP4")]
    op4: OperatorDocument,
}

impl From<&Patch> for PatchDocument {
    fn from(patch: &Patch) -> Self {
        let op = |index: usize| OperatorDocument::new(index, &patch.operators[index]);
        Self {
            name: patch.name.clone(),
            mixer: MixerDocument { level: patch.get(Parameter::MixerLevel) },
            pitch: EnvelopeDocument::new(
                |s| patch.get(Parameter::PitchTime(s)),
                |s| patch.get(Parameter::PitchLevel(s))),
            op1: op(0),
            op2: op(1),
            op3: op(2),
            op4: op(3),
        }
    }
}

impl From<PatchDocument> for Patch {
    fn from(document: PatchDocument) -> Self {
        let operators: [&OperatorDocument; OPERATOR_COUNT] =
            [&document.op1, &document.op2, &document.op3, &document.op4];

        let mut patch = Patch {
            name: document.name.clone(),
            operators: std::array::from_fn(|index| operators[index].to_operator(index)),
            ..Patch::new()
        };
        patch.set(Parameter::MixerLevel, document.mixer.level);
        for stage in Stage::ALL {
            patch.set(Parameter::PitchTime(stage), document.pitch.time(stage));
            patch.set(Parameter::PitchLevel(stage), document.pitch.level(stage));
        }
        patch
    }
}

/// Writes the patch in its JSON form.
impl Serialize for Patch {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PatchDocument::from(self).serialize(serializer)
    }
}

/// Reads a patch from its JSON form. Values out of range are clamped.
impl<'de> Deserialize<'de> for Patch {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        PatchDocument::deserialize(deserializer).map(Patch::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ranged;
    use crate::xfm::{Level, MixerLevel};
    use crate::xfm::envelope::PitchEnvelope;
    use serde_json::json;

    fn random_patch() -> Patch {
        let mut patch = Patch::new();
        patch.name = "R.AND".to_string();
        for (index, op) in patch.operators.iter_mut().enumerate() {
            *op = Operator::random();
            op.inputs[index] = Level::new(0);
        }
        patch.pitch = PitchEnvelope::random();
        patch.mixer.level = MixerLevel::random();
        patch
    }

    #[test]
    fn test_json_round_trip() {
        for _ in 0..20 {
            let patch = random_patch();
            let text = serde_json::to_string(&patch).unwrap();
            let decoded: Patch = serde_json::from_str(&text).unwrap();
            assert_eq!(decoded, patch);
        }
    }

    #[test]
    fn test_json_keys() {
        let value = serde_json::to_value(Patch::new()).unwrap();
        assert_eq!(value["Name"], json!("INIT"));
        assert_eq!(value["Mixer"]["Level"], json!(0));
        assert_eq!(value["Pitch"]["ALevel"], json!(0));
        assert_eq!(value.as_object().unwrap().len(), 7);

        let op1 = value["OP1"].as_object().unwrap();
        assert_eq!(op1.len(), 28);
        assert!(!op1.contains_key("OP1In"));
        assert_eq!(op1["OP2In"], json!(0));
        assert_eq!(op1["Output"], json!(127));
        assert_eq!(op1["Ratio"], json!(100));
        assert_eq!(op1["SLevel"], json!(127));
        assert_eq!(op1["RTime"], json!(63));
        assert_eq!(op1["DnCurve"], json!(0));
        assert_eq!(op1["LCurve"], json!(0));

        assert!(!value["OP3"].as_object().unwrap().contains_key("OP3In"));
        assert!(value["OP3"].as_object().unwrap().contains_key("OP1In"));
    }

    #[test]
    fn test_json_values() {
        let mut value = serde_json::to_value(Patch::new()).unwrap();
        value["Name"] = json!("PAD");
        value["Mixer"]["Level"] = json!(-10);
        value["Pitch"]["DLevel"] = json!(-48);
        value["OP2"]["Feedback"] = json!(-125);
        value["OP2"]["OP1In"] = json!(90);
        value["OP2"]["RCurve"] = json!(1);
        value["OP3"]["OP3In"] = json!(99);
        value["OP4"]["Level"] = json!(300);
        value["OP1"].as_object_mut().unwrap().remove("OP4In");

        let patch: Patch = serde_json::from_value(value).unwrap();
        assert_eq!(patch.name, "PAD");
        assert_eq!(patch.mixer.level.value(), -10);
        assert_eq!(patch.get(Parameter::PitchLevel(Stage::Decay)), -48);
        assert_eq!(patch.operators[1].feedback.value(), -125);
        assert_eq!(patch.operators[1].inputs[0].value(), 90);
        assert_eq!(patch.operators[1].get(P::RightCurve), 1);
        assert_eq!(patch.operators[2].inputs[2].value(), 0);  // own input
        assert_eq!(patch.operators[3].level.value(), 255);
        assert_eq!(patch.operators[0].inputs[3].value(), 0);
    }

    #[test]
    fn test_json_missing_key() {
        let mut value = serde_json::to_value(Patch::new()).unwrap();
        value["OP3"].as_object_mut().unwrap().remove("Fixed");
        assert!(serde_json::from_value::<Patch>(value).is_err());

        let mut value = serde_json::to_value(Patch::new()).unwrap();
        value.as_object_mut().unwrap().remove("Mixer");
        assert!(serde_json::from_value::<Patch>(value).is_err());
    }
}
