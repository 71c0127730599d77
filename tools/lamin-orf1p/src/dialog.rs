//! 命令行参数确认对话.

use nuc_berry::config::ParameterDialog;
use nuc_berry::prelude::*;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// 输入 `q` 取消.
const CANCEL: &str = "q";

/// 逐项询问参数. 空行保留当前值, `q` 或输入结束视为取消.
pub struct PromptDialog<R, W> {
    input: R,
    output: W,
}

/// 基于标准输入输出的对话.
pub type StdinDialog = PromptDialog<io::StdinLock<'static>, io::Stdout>;

impl Default for StdinDialog {
    fn default() -> Self {
        PromptDialog::new(io::stdin().lock(), io::stdout())
    }
}

fn choice_to_string(c: &ChannelChoice) -> String {
    match c {
        ChannelChoice::Index(i) => i.to_string(),
        ChannelChoice::Name(n) => n.clone(),
        ChannelChoice::None => nuc_berry::consts::CHANNEL_NONE.to_string(),
    }
}

impl<R: BufRead, W: Write> PromptDialog<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// 读取一行回答. 取消或无法读取时返回 `None`, 空行返回 `Some("")`.
    fn ask(&mut self, question: &str, current: &str) -> Option<String> {
        write!(self.output, "{question} [{current}]: ").ok()?;
        self.output.flush().ok()?;
        let mut line = String::new();
        if self.input.read_line(&mut line).ok()? == 0 {
            return None;
        }
        let line = line.trim();
        (line != CANCEL).then(|| line.to_string())
    }

    fn ask_choice(&mut self, question: &str, current: ChannelChoice) -> Option<ChannelChoice> {
        let a = self.ask(question, &choice_to_string(&current))?;
        Some(if a.is_empty() { current } else { ChannelChoice::parse(&a) })
    }

    /// 询问一个数值, 无法解析时重新询问.
    fn ask_number<T: FromStr + ToString + Copy>(&mut self, question: &str, current: T) -> Option<T> {
        loop {
            let a = self.ask(question, &current.to_string())?;
            if a.is_empty() {
                return Some(current);
            }
            match a.parse() {
                Ok(v) => return Some(v),
                Err(_) => writeln!(self.output, "`{a}` is not a number").ok()?,
            }
        }
    }
}

impl<R: BufRead, W: Write> ParameterDialog for PromptDialog<R, W> {
    fn review(
        &mut self,
        channels: &[String],
        calibration: &Calibration,
        mut config: PipelineConfig,
    ) -> Option<PipelineConfig> {
        writeln!(self.output, "Channels found in the first image:").ok()?;
        for (i, n) in channels.iter().enumerate() {
            writeln!(self.output, "    {i}: {n}").ok()?;
        }
        let cal = config.calibration.clone().unwrap_or_else(|| calibration.clone());
        writeln!(
            self.output,
            "Voxel: {} x {} x {} {} (`{CANCEL}` cancels)",
            cal.pixel_width(),
            cal.pixel_width(),
            cal.pixel_depth(),
            cal.unit()
        )
        .ok()?;

        let ch = config.channels.clone();
        config.channels.nucleus = self.ask_choice("Nucleus channel", ch.nucleus)?;
        config.channels.lamin = self.ask_choice("Lamin channel", ch.lamin)?;
        config.channels.orf1p = self.ask_choice("ORF1P channel", ch.orf1p)?;

        loop {
            let min = self.ask_number("Min nucleus volume", config.size_filter.min_volume)?;
            let max = self.ask_number("Max nucleus volume", config.size_filter.max_volume)?;
            match SizeFilter::new(min, max) {
                Some(f) => {
                    config.size_filter = f;
                    break;
                }
                None => writeln!(self.output, "invalid volume range [{min}, {max}]").ok()?,
            }
        }

        loop {
            let w = self.ask_number("Pixel width", cal.pixel_width())?;
            let d = self.ask_number("Pixel depth", cal.pixel_depth())?;
            if w == cal.pixel_width() && d == cal.pixel_depth() {
                break;
            }
            match Calibration::new(w, d) {
                Ok(c) => {
                    config.calibration = Some(c);
                    break;
                }
                Err(e) => writeln!(self.output, "{e}").ok()?,
            }
        }
        Some(config)
    }
}
