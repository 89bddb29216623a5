use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::rep::ExerciseKind;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub stabilizer: StabilizerConfig,
    #[serde(default)]
    pub rep: RepConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StabilizerConfig {
    /// 平滑化係数 (0.1〜1.0)。大きいほど追従、小さいほど安定
    /// 範囲外の値は使用側でクランプされる
    #[serde(default = "default_alpha")]
    pub alpha: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepConfig {
    /// 種目 (e.g. "squat", "push_up", "bicep_curl")
    #[serde(default = "default_exercise")]
    pub exercise: ExerciseKind,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// 処理ループの目標周波数 (Hz)。カメラFPSとは独立
    #[serde(default = "default_process_hz")]
    pub process_hz: f32,
}

fn default_alpha() -> f32 {
    0.5
}
fn default_exercise() -> ExerciseKind {
    ExerciseKind::Squat
}
fn default_process_hz() -> f32 {
    20.0
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
        }
    }
}

impl Default for RepConfig {
    fn default() -> Self {
        Self {
            exercise: default_exercise(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            process_hz: default_process_hz(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 読み込みに失敗したらデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }
}
