use serde::Deserialize;

use crate::pose::KeypointIndex;

/// 角度を定義する関節トリプレット（first, vertex, last）
pub type JointTriplet = (KeypointIndex, KeypointIndex, KeypointIndex);

/// レップ判定の角度閾値
#[derive(Debug, Clone, Copy)]
pub struct AngleThresholds {
    /// この角度を下回ったら down 状態へ
    pub deep: f32,
    /// down からこの角度を上回ったらレップ成立
    pub shallow: f32,
}

/// 対応種目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Squat,
    PushUp,
    BicepCurl,
}

impl ExerciseKind {
    /// 左右の関節トリプレット。両側が有効なら角度を平均する
    pub fn sides(&self) -> [JointTriplet; 2] {
        use KeypointIndex::*;
        match self {
            // 膝屈曲: hip–knee–ankle
            Self::Squat => [
                (LeftHip, LeftKnee, LeftAnkle),
                (RightHip, RightKnee, RightAnkle),
            ],
            // 肘屈曲: shoulder–elbow–wrist
            Self::PushUp | Self::BicepCurl => [
                (LeftShoulder, LeftElbow, LeftWrist),
                (RightShoulder, RightElbow, RightWrist),
            ],
        }
    }

    pub fn thresholds(&self) -> AngleThresholds {
        match self {
            Self::Squat => AngleThresholds {
                deep: 90.0,
                shallow: 160.0,
            },
            Self::PushUp => AngleThresholds {
                deep: 90.0,
                shallow: 160.0,
            },
            Self::BicepCurl => AngleThresholds {
                deep: 60.0,
                shallow: 150.0,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::PushUp => "push_up",
            Self::BicepCurl => "bicep_curl",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::KeypointIndex;

    #[test]
    fn test_squat_uses_knee_vertex() {
        let [left, right] = ExerciseKind::Squat.sides();
        assert_eq!(left.1, KeypointIndex::LeftKnee);
        assert_eq!(right.1, KeypointIndex::RightKnee);
    }

    #[test]
    fn test_thresholds_are_ordered() {
        for kind in [
            ExerciseKind::Squat,
            ExerciseKind::PushUp,
            ExerciseKind::BicepCurl,
        ] {
            let t = kind.thresholds();
            assert!(
                t.deep < t.shallow,
                "{}: deep {} must be below shallow {}",
                kind.name(),
                t.deep,
                t.shallow
            );
        }
    }

    #[test]
    fn test_deserialize_from_config_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            exercise: ExerciseKind,
        }

        let w: Wrapper = toml::from_str("exercise = \"squat\"").unwrap();
        assert_eq!(w.exercise, ExerciseKind::Squat);
        let w: Wrapper = toml::from_str("exercise = \"bicep_curl\"").unwrap();
        assert_eq!(w.exercise, ExerciseKind::BicepCurl);

        assert!(toml::from_str::<Wrapper>("exercise = \"yoga\"").is_err());
    }
}
