//! 批处理结果.

use nuc_berry::prelude::BatchReport;
use std::io::{self, Write};

/// 将 `report` 的摘要写进 `w` 中.
fn describe_into<W: Write>(report: &BatchReport, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Processed images: {}", report.processed.len())?;
    for name in report.processed.iter() {
        writeln!(w, "{S4}{name}")?;
    }
    write!(w, "Failed images: {}", report.failed.len())?;
    for (name, e) in report.failed.iter() {
        write!(w, "\n{S4}{name}: {e}")?;
    }
    Ok(())
}

/// 在标准输出打印批处理摘要.
pub fn summarize(report: &BatchReport) -> io::Result<()> {
    utils::sep();
    let mut buf = Vec::with_capacity(512);
    describe_into(report, &mut buf)?;
    println!("{}", String::from_utf8_lossy(&buf));
    utils::sep();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::describe_into;
    use nuc_berry::prelude::*;

    #[test]
    fn test_describe() {
        let report = BatchReport {
            processed: vec!["a".into()],
            failed: vec![("b".into(), PipelineError::UserCancelled)],
        };
        let mut buf = Vec::new();
        describe_into(&report, &mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert_eq!(
            s,
            "Processed images: 1\n    a\nFailed images: 1\n    b: cancelled by user"
        );
    }
}
