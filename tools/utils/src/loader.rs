//! 对 `nuc-berry::dataset` 的更一层封装. 提供输入输出目录的缺省位置.

use nuc_berry::dataset::home_dataset_dir_with;
use std::env;
use std::path::PathBuf;

/// 输入目录环境变量.
pub const INPUT_DIR_ENV: &str = "NUC_BERRY_INPUT_DIR";

/// 输出目录环境变量.
pub const OUTPUT_DIR_ENV: &str = "NUC_BERRY_OUTPUT_DIR";

/// 非空环境变量 `key` 的值, 否则为 `$HOME/dataset/{rest...}`.
fn env_or_home(key: &str, rest: &[&str]) -> Option<PathBuf> {
    match env::var(key) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with(rest),
    }
}

/// 获取输入图像目录.
///
/// 1. 若环境变量 `$NUC_BERRY_INPUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/nuclei`. 无法确定用户主目录时返回 `None`.
pub fn input_dir_from_env_or_home() -> Option<PathBuf> {
    env_or_home(INPUT_DIR_ENV, &["nuclei"])
}

/// 获取结果输出目录.
///
/// 1. 若环境变量 `$NUC_BERRY_OUTPUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/nuclei_results`.
pub fn output_dir_from_env_or_home() -> Option<PathBuf> {
    env_or_home(OUTPUT_DIR_ENV, &["nuclei_results"])
}
