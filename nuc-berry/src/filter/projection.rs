use crate::Channel;
use ordered_float::OrderedFloat;

/// 估计通道的背景强度: 沿 Z 轴做最小值投影, 再取投影图像的中位数.
///
/// 结果对同一通道是确定的.
pub fn estimate_background(channel: &Channel) -> f64 {
    let proj = channel.min_projection();
    let values: Vec<f64> = proj.iter().map(|&v| v as f64).collect();
    median_of(values)
}

/// 中位数. 偶数个元素时取中间两个元素的平均值, 空输入返回 `NaN`.
///
/// NaN 按 [`OrderedFloat`] 的全序排在最大端.
pub fn median_of(mut values: Vec<f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by_key(mid, |&v| OrderedFloat(v));
    let upper = *upper;
    if n % 2 == 1 {
        return upper;
    }
    let lower = lower
        .iter()
        .copied()
        .max_by_key(|&v| OrderedFloat(v))
        .unwrap_or(upper);
    (lower + upper) / 2.0
}
