//! Append-only builder for exposition text.

use std::fmt::{self, Display, Write};

/// Writes metric families and samples line by line into any [`fmt::Write`].
///
/// Nothing is ever rewritten or reordered; callers size the underlying
/// buffer up front (see [`crate::metrics::encoder::estimated_len`]) so a
/// render normally performs a single allocation.
pub struct ExpositionWriter<W> {
    out: W,
}

impl<W: Write> ExpositionWriter<W> {
    /// Wrap a text sink.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Emit the `# HELP` and `# TYPE <name> gauge` header of a gauge family.
    pub fn gauge_family(&mut self, name: &str, help: &str) -> fmt::Result {
        writeln!(self.out, "# HELP {} {}", name, help)?;
        writeln!(self.out, "# TYPE {} gauge", name)
    }

    /// Emit `name{label="value",...} value`.
    pub fn sample(
        &mut self,
        name: &str,
        labels: &[(&str, &dyn Display)],
        value: impl Display,
    ) -> fmt::Result {
        self.out.write_str(name)?;
        if !labels.is_empty() {
            self.out.write_char('{')?;
            for (i, (label, label_value)) in labels.iter().enumerate() {
                if i > 0 {
                    self.out.write_char(',')?;
                }
                write!(self.out, "{}=\"", label)?;
                write!(Escaped(&mut self.out), "{}", label_value)?;
                self.out.write_char('"')?;
            }
            self.out.write_char('}')?;
        }
        writeln!(self.out, " {}", value)
    }

    /// Return the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Sink adapter escaping backslash, double quote and newline in label values.
struct Escaped<'a, W>(&'a mut W);

impl<W: Write> Write for Escaped<'_, W> {
    fn write_str(&mut self, value: &str) -> fmt::Result {
        for c in value.chars() {
            match c {
                '\\' => self.0.write_str("\\\\")?,
                '"' => self.0.write_str("\\\"")?,
                '\n' => self.0.write_str("\\n")?,
                c => self.0.write_char(c)?,
            }
        }
        Ok(())
    }
}
