use std::collections::VecDeque;

/// 縮退判定に使うベクトル長の下限（ピクセル）
const MIN_MAGNITUDE: f32 = 1e-4;

/// 3点 A-B-C がなす頂点Bの角度（度, 0〜180）
///
/// B→A と B→C の内積から arccos で求める。浮動小数の桁落ちで
/// cos が [-1, 1] をはみ出すことがあるためクランプしてから acos する。
/// 点が一致するなど縮退した入力は 0.0 を返す（NaN を平滑化窓に
/// 流し込まないための定義済みフォールバック）。
pub fn joint_angle(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    let v1 = (a.0 - b.0, a.1 - b.1);
    let v2 = (c.0 - b.0, c.1 - b.1);

    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if mag1 < MIN_MAGNITUDE || mag2 < MIN_MAGNITUDE {
        return 0.0;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// 角度の移動平均窓
///
/// レップ境界付近の角度ノイズは位置ノイズより強く抑える必要があるため、
/// キーポイント平滑化とは別にここで直近N値の単純移動平均を取る。
pub struct AngleWindow {
    values: VecDeque<f32>,
    capacity: usize,
}

impl AngleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// 値を追加して現在の平均を返す。窓が溢れたら最古値を捨てる
    pub fn push(&mut self, value: f32) -> f32 {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.mean()
    }

    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
