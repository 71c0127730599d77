//! 基于直方图形状的自动阈值.

use crate::consts::HISTOGRAM_BINS;
use ndarray::ArrayView2;

/// 定宽直方图, 覆盖样本的 `[min, max]` 区间.
///
/// 区间外的值被归入首/末分箱, 因此同一直方图可以用来对其他切片做二值化.
#[derive(Clone, Debug)]
pub struct Histogram {
    counts: Vec<u64>,
    min: f32,
    max: f32,
}

impl Histogram {
    /// 以 [`HISTOGRAM_BINS`] 个分箱统计 `data`. 非有限值被忽略.
    pub fn from_slice(data: ArrayView2<f32>) -> Self {
        let (min, max) = data
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (min, max) = if min <= max { (min, max) } else { (0.0, 0.0) };
        let mut hist = Self {
            counts: vec![0; HISTOGRAM_BINS],
            min,
            max,
        };
        for &v in data.iter().filter(|v| v.is_finite()) {
            let bin = hist.bin_of(v);
            hist.counts[bin] += 1;
        }
        hist
    }

    /// 强度 `v` 所属分箱.
    ///
    /// `max == min` 时, 大于 `min` 的值归入末分箱, 其余归入首分箱.
    pub fn bin_of(&self, v: f32) -> usize {
        let last = self.counts.len() - 1;
        if self.max <= self.min {
            return if v > self.min { last } else { 0 };
        }
        let scaled = (v - self.min) as f64 / (self.max - self.min) as f64 * self.counts.len() as f64;
        if scaled <= 0.0 {
            0
        } else {
            (scaled as usize).min(last)
        }
    }

    /// 各分箱计数.
    #[inline]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// 使用 Huang 方法得到分箱级别阈值, 大于该级别的分箱视为前景 (暗背景).
    #[inline]
    pub fn huang(&self) -> usize {
        huang_level(&self.counts)
    }
}

/// Huang 模糊熵阈值.
///
/// 以每个候选级别将直方图分为两类, 计算每个分箱相对所属类均值的模糊隶属度的
/// Shannon 熵, 取熵最小的级别. 直方图只有一个非空分箱时返回 0.
///
/// 参考: L.-K. Huang, M.-J. J. Wang, "Image thresholding by minimizing the
/// measures of fuzziness", Pattern Recognition 28(1), 1995.
pub fn huang_level(data: &[u64]) -> usize {
    let Some(first) = data.iter().position(|&c| c != 0) else {
        return 0;
    };
    let last = data.iter().rposition(|&c| c != 0).unwrap_or(first);
    if first == last {
        return 0;
    }

    // 累积计数 `s` 与一阶矩 `w`.
    let mut s = vec![0.0f64; last + 1];
    let mut w = vec![0.0f64; last + 1];
    s[first] = data[first] as f64;
    w[first] = first as f64 * data[first] as f64;
    for i in (first + 1)..=last {
        s[i] = s[i - 1] + data[i] as f64;
        w[i] = w[i - 1] + i as f64 * data[i] as f64;
    }

    // 与类均值距离为 d 的分箱对应的熵项.
    let c = (last - first) as f64;
    let mut smu = vec![0.0f64; last + 1 - first];
    for (d, e) in smu.iter_mut().enumerate().skip(1) {
        let mu = 1.0 / (1.0 + d as f64 / c);
        *e = -mu * mu.ln() - (1.0 - mu) * (1.0 - mu).ln();
    }

    let mut best = first;
    let mut best_entropy = f64::MAX;
    for t in first..=last {
        let mut entropy = 0.0;
        let mu = (w[t] / s[t]).round() as usize;
        for i in first..=t {
            entropy += smu[i.abs_diff(mu)] * data[i] as f64;
        }
        if t < last {
            let mu = ((w[last] - w[t]) / (s[last] - s[t])).round() as usize;
            for i in (t + 1)..=last {
                entropy += smu[i.abs_diff(mu)] * data[i] as f64;
            }
        }
        if best_entropy > entropy {
            best_entropy = entropy;
            best = t;
        }
    }
    best
}
