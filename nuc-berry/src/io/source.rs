//! 多通道三维图像栈的读取.

use crate::consts::CHANNEL_NONE;
use crate::error::{PipelineError, PipelineResult};
use crate::{Calibration, Channel, VolumeAttr};
use ndarray::{ArrayD, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

/// 一幅已打开的多通道三维图像.
///
/// 所有通道形状相同. 通道名称缺失时以数字索引字符串代替.
#[derive(Debug, Clone)]
pub struct ImageStack {
    calibration: Calibration,
    names: Vec<String>,
    channels: Vec<Channel>,
}

impl ImageStack {
    /// 组装图像栈.
    ///
    /// `channels` 为空或形状不一致时返回 `Err`. `names` 为 `None`,
    /// 或者个数与通道数不一致时使用 `"0"`, `"1"`, ... 作为通道名称.
    pub fn new(
        calibration: Calibration,
        names: Option<Vec<String>>,
        channels: Vec<Channel>,
    ) -> PipelineResult<Self> {
        let first = channels.first().ok_or(PipelineError::EmptyVolume("image stack"))?;
        for c in channels.iter().skip(1) {
            first.ensure_same_shape(c, "image channels")?;
        }
        let names = match names {
            Some(n) if n.len() == channels.len() => n,
            _ => (0..channels.len()).map(|i| i.to_string()).collect(),
        };
        Ok(Self {
            calibration,
            names,
            channels,
        })
    }

    /// 通道个数.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// 由元信息得到的标定.
    #[inline]
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// 通道名称.
    #[inline]
    pub fn channel_names(&self) -> &[String] {
        &self.names
    }

    /// 供参数选择使用的通道列表: 所有通道名称, 末尾追加 `"None"`.
    pub fn channel_choices(&self) -> Vec<String> {
        let mut v = self.names.clone();
        v.push(CHANNEL_NONE.to_string());
        v
    }

    /// 第 `index` 个通道. 越界时返回 `Err`.
    pub fn channel(&self, index: usize) -> PipelineResult<&Channel> {
        self.channels.get(index).ok_or_else(|| {
            PipelineError::Config(format!(
                "channel {index} requested, image has {} channels",
                self.channels.len()
            ))
        })
    }

    /// 图像形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> crate::Idx3d {
        self.channels[0].shape()
    }
}

/// 图像来源: 给定文件路径, 返回图像栈.
pub trait ImageSource {
    /// 打开 `path` 处的图像. 元信息或数据无法读取时返回 [`PipelineError::ImageIo`].
    fn open(&self, path: &Path) -> PipelineResult<ImageStack>;
}

/// NIfTI 图像来源, 支持 `.nii` 与 `.nii.gz`.
///
/// 1. 三维数据 `[w, h, z]` 视为单通道;
/// 2. 四维数据 `[w, h, z, c]` 的第四维视为通道;
/// 3. 五维数据 `[w, h, z, 1, c]` 的第五维视为通道.
///
/// 标定取自 `pixdim`, 长度单位按 `xyzt_units` 换算为微米 (未指定时视为微米).
/// 通道名称取自 `descrip` 中以 `;` 分隔的字段, 个数不符时按数字索引命名.
#[derive(Copy, Clone, Debug, Default)]
pub struct NiftiSource;

/// `xyzt_units` 空间单位对应的微米倍数.
fn micron_scale(xyzt_units: u8) -> f64 {
    match xyzt_units & 0x07 {
        1 => 1e6,
        2 => 1e3,
        _ => 1.0,
    }
}

/// 由 NIfTI header 构建标定. 缺失的 Z 方向间距按 1 处理, 缺失的 XY 尺寸按单位体素处理.
pub(crate) fn calibration_from_header(header: &NiftiHeader) -> Calibration {
    let scale = micron_scale(header.xyzt_units);
    let [_, pw, _, pd, ..] = header.pixdim;
    Calibration::from_metadata(pw as f64 * scale, pd as f64 * scale).unwrap_or_else(|e| {
        log::warn!("{e}, falling back to unit voxel");
        Calibration::unit_voxel()
    })
}

/// `descrip` 中以 `;` 分隔的通道名称.
fn names_from_header(header: &NiftiHeader) -> Option<Vec<String>> {
    let text = String::from_utf8_lossy(&header.descrip[..]);
    let text = text.trim_matches(char::from(0)).trim();
    if text.is_empty() {
        return None;
    }
    Some(text.split(';').map(|s| s.trim().to_string()).collect())
}

/// 将按 NIfTI 惯例 `[w, h, z, (1,) (c)]` 存储的数据拆分为 `(z, h, w)` 通道.
pub(crate) fn split_channels(data: ArrayD<f32>) -> Result<Vec<Channel>, String> {
    let data = match data.ndim() {
        3 => data.insert_axis(Axis(3)),
        4 => data,
        5 if data.shape()[3] == 1 => data.index_axis_move(Axis(3), 0),
        n => return Err(format!("unsupported dimensionality {n}")),
    };
    data.axis_iter(Axis(3))
        .map(|c| {
            let c = c
                .into_dimensionality::<Ix3>()
                .map_err(|e| e.to_string())?
                .permuted_axes([2, 1, 0])
                .as_standard_layout()
                .into_owned();
            Channel::new(c).map_err(|e| e.to_string())
        })
        .collect()
}

impl ImageSource for NiftiSource {
    fn open(&self, path: &Path) -> PipelineResult<ImageStack> {
        let obj = ReaderOptions::new()
            .read_file(path)
            .map_err(|e| PipelineError::image_io(path, e))?;
        let header = obj.header().clone();
        let data = obj
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(|e| PipelineError::image_io(path, e))?;
        let channels = split_channels(data).map_err(|e| PipelineError::image_io(path, e))?;
        log::debug!(
            "opened {}: {} channel(s) of {:?}",
            path.display(),
            channels.len(),
            channels.first().map(|c| c.shape())
        );
        ImageStack::new(
            calibration_from_header(&header),
            names_from_header(&header),
            channels,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    #[test]
    fn test_image_stack_names() {
        let c = || Channel::uniform((2, 3, 4), 1.0).unwrap();
        let cal = Calibration::unit_voxel();
        let s = ImageStack::new(cal.clone(), None, vec![c(), c()]).unwrap();
        assert_eq!(s.channel_names(), &["0".to_string(), "1".to_string()]);
        assert_eq!(s.channel_choices().last().unwrap(), "None");
        assert!(s.channel(1).is_ok());
        assert!(s.channel(2).is_err());

        let s = ImageStack::new(cal.clone(), Some(vec!["DAPI".into()]), vec![c(), c()]).unwrap();
        assert_eq!(s.channel_names()[1], "1");

        let odd = Channel::uniform((2, 3, 5), 1.0).unwrap();
        assert!(ImageStack::new(cal.clone(), None, vec![c(), odd]).is_err());
        assert!(ImageStack::new(cal, None, vec![]).is_err());
    }

    #[test]
    fn test_split_channels() {
        // [w, h, z, c] = [4, 3, 2, 2], 值编码了各自的坐标.
        let data = Array::from_shape_fn(IxDyn(&[4, 3, 2, 2]), |ix| {
            (ix[0] + 10 * ix[1] + 100 * ix[2] + 1000 * ix[3]) as f32
        });
        let chs = split_channels(data).unwrap();
        assert_eq!(chs.len(), 2);
        assert_eq!(chs[0].shape(), (2, 3, 4));
        assert_eq!(chs[1][(1, 2, 3)], 1000.0 + 100.0 + 20.0 + 3.0);

        let single = Array::<f32, _>::zeros(IxDyn(&[4, 3, 2]));
        assert_eq!(split_channels(single).unwrap().len(), 1);

        let five = Array::<f32, _>::zeros(IxDyn(&[4, 3, 2, 1, 3]));
        assert_eq!(split_channels(five).unwrap().len(), 3);

        let bad = Array::<f32, _>::zeros(IxDyn(&[4, 3]));
        assert!(split_channels(bad).is_err());
    }

    #[test]
    fn test_calibration_from_header() {
        let mut h = NiftiHeader::default();
        h.pixdim = [1.0, 0.1, 0.1, 0.5, 0.0, 0.0, 0.0, 0.0];
        let cal = calibration_from_header(&h);
        assert!((cal.pixel_width() - 0.1).abs() < 1e-6);
        assert!((cal.pixel_depth() - 0.5).abs() < 1e-6);

        // 毫米, 且缺失 Z 方向间距.
        h.xyzt_units = 2;
        h.pixdim[3] = 0.0;
        let cal = calibration_from_header(&h);
        assert!((cal.pixel_width() - 100.0).abs() < 1e-3);
        assert_eq!(cal.pixel_depth(), 1.0);
    }
}
