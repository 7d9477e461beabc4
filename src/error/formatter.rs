use super::{CodeError, ErrorKind};
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::fmt::Write;

const WRITE_FMT_MSG: &str =
    "Encountered an error while attempting to write format string to buffer.";
const ARIADNE_MSG: &str = "Ariadne produces valid utf-8 strings";
const ARIADNE_WRITE_MSG: &str = "Write into buffer should not fail.";

pub trait ErrorFormatter {
    fn format_error(&self, error: &CodeError) -> String {
        let mut buffer = String::new();
        self.format_error_in_place(&mut buffer, error);
        buffer
    }
    fn format_error_in_place(&self, buffer: &mut String, error: &CodeError);
}

pub struct DebugFormatter;

impl ErrorFormatter for DebugFormatter {
    fn format_error_in_place(&self, buffer: &mut String, error: &CodeError) {
        write!(buffer, "{error:?}").expect(WRITE_FMT_MSG);
    }
}

/// `<Kind> - '<message>'` followed by the file position and, for runtime
/// errors, the active call frames.
pub struct BasicFormatter;

impl ErrorFormatter for BasicFormatter {
    fn format_error_in_place(&self, buffer: &mut String, error: &CodeError) {
        write!(buffer, "{error}").expect(WRITE_FMT_MSG);
        if let (Some(file), Some((line, column))) = (&error.file, error.position()) {
            write!(
                buffer,
                "\nFile: {}, Line: {line}, Column: {column}",
                file.name()
            )
            .expect(WRITE_FMT_MSG);
        }
        if error.kind != ErrorKind::Runtime {
            return;
        }
        for frame in &error.trace {
            match frame.position() {
                Some((line, column)) => write!(
                    buffer,
                    "\n  at {} (Line: {line}, Column: {column})",
                    frame.name
                ),
                None => write!(buffer, "\n  at {}", frame.name),
            }
            .expect(WRITE_FMT_MSG);
        }
    }
}

pub struct ReportFormatter;

impl ErrorFormatter for ReportFormatter {
    fn format_error_in_place(&self, buffer: &mut String, error: &CodeError) {
        let Some(file) = &error.file else {
            return BasicFormatter.format_error_in_place(buffer, error);
        };
        let path = file.name();
        let span = error.span.range();
        let mut output = std::io::Cursor::new(Vec::new());
        let mut report = Report::build(ReportKind::Error, (path, span.clone()))
            .with_message(error.kind)
            .with_label(
                Label::new((path, span))
                    .with_message(&error.message)
                    .with_color(Color::BrightRed),
            );
        for frame in error.trace.iter() {
            if let Some((frame_file, frame_span)) = &frame.origin {
                if frame_file.name() == path {
                    report = report.with_label(
                        Label::new((path, frame_span.range()))
                            .with_message(format!("while running {}", frame.name))
                            .with_color(Color::BrightYellow),
                    );
                }
            }
        }
        report
            .finish()
            .write((path, Source::from(file.text())), &mut output)
            .expect(ARIADNE_WRITE_MSG);
        buffer.push_str(&String::from_utf8(output.into_inner()).expect(ARIADNE_MSG));
    }
}
