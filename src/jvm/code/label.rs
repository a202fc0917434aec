use std::fmt;

/// Placeholder for an instruction position that may not exist yet
///
/// Labels are handed out by [`LabelGenerator::fresh_label`] and later bound to the position of
/// the next appended instruction. They can be used as branch, switch, and exception handler
/// targets before they are placed.
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub struct Label(pub(crate) usize);

/// Generates new labels
pub trait LabelGenerator {
    /// Generate a fresh label
    fn fresh_label(&mut self) -> Label;
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}
