use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::device::RenderDevice;

/// Read-only port onto the control surface holding the bounce count.
///
/// Polled once per tick; implementations return the raw text, which may not
/// be numeric.
pub trait ControlSource {
    fn read(&self) -> String;
}

impl ControlSource for String {
    fn read(&self) -> String {
        self.clone()
    }
}

impl ControlSource for &'static str {
    fn read(&self) -> String {
        (*self).to_string()
    }
}

/// Lenient numeric parse of control text.
///
/// Leading whitespace is skipped and the longest prefix that forms a decimal
/// literal (optional sign, digits, fraction, exponent) or `Infinity` is
/// used; anything after it is ignored. Text without such a prefix yields NaN.
pub fn parse_control_value(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let len = bytes.len();
    let is_digit = |index: usize| index < len && bytes[index].is_ascii_digit();

    let mut end = 0;
    let negative = bytes.first() == Some(&b'-');
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if trimmed[end..].starts_with("Infinity") {
        return if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_start = end;
    while is_digit(end) {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < len && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while is_digit(frac_end) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }

    if end < len && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < len && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while is_digit(exp_end) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    trimmed[..end].parse().unwrap_or(f64::NAN)
}

/// Pushes the control value into the program's bounce uniform every tick.
///
/// Malformed input is not an error: it parses to NaN and NaN is written.
/// Nothing is validated or clamped.
pub struct UniformFeed {
    source: Box<dyn ControlSource>,
    uniform: String,
    last_malformed: Option<bool>,
}

impl UniformFeed {
    pub fn new(source: Box<dyn ControlSource>, uniform: impl Into<String>) -> Self {
        Self {
            source,
            uniform: uniform.into(),
            last_malformed: None,
        }
    }

    /// Reads the control, writes the parsed value and returns what was written.
    pub fn push<D: RenderDevice + ?Sized>(&mut self, device: &mut D) -> f32 {
        let text = self.source.read();
        let value = parse_control_value(&text) as f32;
        let malformed = value.is_nan();
        if self.last_malformed != Some(malformed) {
            if malformed {
                debug!(input = %text, uniform = %self.uniform, "control input is not numeric; feeding NaN");
            } else {
                debug!(value, uniform = %self.uniform, "control input is numeric");
            }
            self.last_malformed = Some(malformed);
        }
        device.set_uniform_f32(&self.uniform, value);
        value
    }
}

/// Edits a host toolkit can apply to a [`ControlField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEdit {
    Insert(char),
    Backspace,
    Clear,
    StepUp,
    StepDown,
}

const MAX_FIELD_LEN: usize = 32;

/// Editable free-text field. Clones share the same text, so the host keeps
/// one handle for editing and the feed polls another.
#[derive(Debug, Clone, Default)]
pub struct ControlField {
    text: Rc<RefCell<String>>,
}

impl ControlField {
    pub fn new(initial: &str) -> Self {
        Self {
            text: Rc::new(RefCell::new(initial.to_string())),
        }
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }

    /// Applies `edit`, returning whether the text changed.
    ///
    /// Stepping behaves like a number input: it only acts on text that parses
    /// to a finite value.
    pub fn apply(&self, edit: ControlEdit) -> bool {
        let mut text = self.text.borrow_mut();
        match edit {
            ControlEdit::Insert(ch) => {
                if ch.is_control() || text.chars().count() >= MAX_FIELD_LEN {
                    return false;
                }
                text.push(ch);
                true
            }
            ControlEdit::Backspace => text.pop().is_some(),
            ControlEdit::Clear => {
                let changed = !text.is_empty();
                text.clear();
                changed
            }
            ControlEdit::StepUp | ControlEdit::StepDown => {
                let current = parse_control_value(&text);
                if !current.is_finite() {
                    return false;
                }
                let step = if edit == ControlEdit::StepUp { 1.0 } else { -1.0 };
                *text = format!("{}", current + step);
                true
            }
        }
    }
}

impl ControlSource for ControlField {
    fn read(&self) -> String {
        self.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DeviceCall, RecordingDevice};

    #[test]
    fn integer_text_parses_exactly() {
        assert_eq!(parse_control_value("5"), 5.0);
        assert_eq!(parse_control_value("  12"), 12.0);
        assert_eq!(parse_control_value("-3"), -3.0);
    }

    #[test]
    fn empty_or_non_numeric_text_is_nan() {
        for input in ["", "   ", "abc", ".", "-", "e5", "+.e1"] {
            assert!(parse_control_value(input).is_nan(), "input {input:?}");
        }
    }

    #[test]
    fn longest_numeric_prefix_wins() {
        assert_eq!(parse_control_value("5abc"), 5.0);
        assert_eq!(parse_control_value(".5"), 0.5);
        assert_eq!(parse_control_value("2."), 2.0);
        assert_eq!(parse_control_value("1e2"), 100.0);
        assert_eq!(parse_control_value("1e"), 1.0);
        assert_eq!(parse_control_value("3.25e-1x"), 0.325);
        assert_eq!(parse_control_value("0x10"), 0.0);
    }

    #[test]
    fn infinity_literal_is_recognised() {
        assert_eq!(parse_control_value("Infinity"), f64::INFINITY);
        assert_eq!(parse_control_value("-Infinity and beyond"), f64::NEG_INFINITY);
        assert!(parse_control_value("inf").is_nan());
    }

    #[test]
    fn feed_pushes_parsed_value_to_named_uniform() {
        let mut device = RecordingDevice::new();
        let mut feed = UniformFeed::new(Box::new("5"), "num_bounces");
        let pushed = feed.push(&mut device);
        assert_eq!(pushed, 5.0);
        assert_eq!(
            device.calls(),
            vec![DeviceCall::Uniform("num_bounces".into(), 5.0)]
        );
    }

    #[test]
    fn feed_pushes_nan_for_malformed_input() {
        let mut device = RecordingDevice::new();
        for input in ["", "many"] {
            let mut feed = UniformFeed::new(Box::new(input), "num_bounces");
            assert!(feed.push(&mut device).is_nan());
        }
        let written: Vec<f32> = device.uniform_writes("num_bounces");
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|value| value.is_nan()));
    }

    #[test]
    fn feed_reads_field_fresh_every_push() {
        let mut device = RecordingDevice::new();
        let field = ControlField::new("1");
        let mut feed = UniformFeed::new(Box::new(field.clone()), "num_bounces");
        assert_eq!(feed.push(&mut device), 1.0);
        field.set_text("7");
        assert_eq!(feed.push(&mut device), 7.0);
    }

    #[test]
    fn field_edits_like_a_text_input() {
        let field = ControlField::new("4");
        assert!(field.apply(ControlEdit::Insert('2')));
        assert_eq!(field.text(), "42");
        assert!(!field.apply(ControlEdit::Insert('\u{8}')));
        assert!(field.apply(ControlEdit::Backspace));
        assert_eq!(field.text(), "4");
        assert!(field.apply(ControlEdit::Clear));
        assert!(!field.apply(ControlEdit::Backspace));
        assert!(!field.apply(ControlEdit::Clear));
        assert_eq!(field.text(), "");
    }

    #[test]
    fn stepping_only_applies_to_finite_values() {
        let field = ControlField::new("2.5");
        assert!(field.apply(ControlEdit::StepUp));
        assert_eq!(field.text(), "3.5");
        field.set_text("0");
        assert!(field.apply(ControlEdit::StepDown));
        assert_eq!(field.text(), "-1");
        field.set_text("lots");
        assert!(!field.apply(ControlEdit::StepUp));
        assert_eq!(field.text(), "lots");
    }

    #[test]
    fn field_length_is_bounded() {
        let field = ControlField::new("");
        for _ in 0..MAX_FIELD_LEN {
            assert!(field.apply(ControlEdit::Insert('9')));
        }
        assert!(!field.apply(ControlEdit::Insert('9')));
    }
}
