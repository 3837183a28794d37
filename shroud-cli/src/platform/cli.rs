//! CLI 格式化输出
//!
//! 提供命令行友好的错误显示和源码上下文打印。

use shroud_api::{ErrorDetails, ErrorReport, ShroudError};

/// 打印错误；`json` 时在 stdout 输出结构化报告
pub fn print_error(e: &ShroudError, json: bool) {
    let report = e.to_report();
    if json {
        println!("{}", report.to_json());
        return;
    }

    eprintln!("❌ {}", report);
    print_details(&report);

    // 编译/执行错误带行号时显示源码上下文
    if let (Some(location), Some(line)) = (&report.location, report.line) {
        if let Ok(source) = std::fs::read_to_string(location) {
            print_source_context(&source, line);
        }
    }
}

fn print_details(report: &ErrorReport) {
    match &report.details {
        Some(ErrorDetails::Probes { tried }) => {
            for path in tried {
                eprintln!("   tried {}", path);
            }
        }
        Some(ErrorDetails::Chain { chain }) => {
            eprintln!("   {}", chain.join("\n   -> "));
        }
        Some(ErrorDetails::Cascade { succeeded, failed }) => {
            for path in succeeded {
                eprintln!("   ✅ {}", path);
            }
            for unit in failed {
                eprintln!("   ❌ {}: {}", unit.location, unit.message);
            }
        }
        None => {}
    }
}

/// 打印源代码上下文（显示错误行前后几行）
pub fn print_source_context(source: &str, error_line: usize) {
    for line in source_context(source, error_line) {
        eprintln!("{}", line);
    }
}

/// 源码上下文的各行，错误行用 `>` 标出
pub fn source_context(source: &str, error_line: usize) -> Vec<String> {
    const CONTEXT_LINES: usize = 2; // 错误行前后显示的上下文行数

    let lines: Vec<&str> = source.lines().collect();
    let total_lines = lines.len();
    if error_line == 0 || error_line > total_lines {
        return Vec::new();
    }

    let start_line = error_line.saturating_sub(CONTEXT_LINES).max(1);
    let end_line = (error_line + CONTEXT_LINES).min(total_lines);
    let width = end_line.to_string().len();

    let separator = format!("{}|--", "-".repeat(width + 2));
    let mut out = vec![separator.clone()];
    for line_idx in start_line..=end_line {
        let marker = if line_idx == error_line { '>' } else { ' ' };
        out.push(format!(
            "{} {:>width$} | {}",
            marker,
            line_idx,
            lines[line_idx - 1],
            width = width
        ));
    }
    out.push(separator);
    out
}
