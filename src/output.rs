//! Tree-structured report writer.
//!
//! [`Output`] keeps a stack of open blocks. Attributes go to the innermost
//! block; closing a block attaches it to its parent. Closing the outermost
//! block hands the finished tree back to the caller, which serialises it
//! with [`OutputBlock::write`] as a simple tag format:
//!
//! ```text
//! <report><node id='0' halted='true' /></report>
//! ```

use std::{fmt, io};

use tracing::warn;

/// One element of the report tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBlock {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Self>,
}

impl OutputBlock {
    /// Create an empty block.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Block name.
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Value of the first attribute called `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Nested blocks in insertion order.
    #[must_use]
    pub fn children(&self) -> &[Self] { &self.children }

    /// Append an attribute.
    pub fn set(&mut self, name: impl Into<String>, value: impl fmt::Display) {
        self.attributes.push((name.into(), value.to_string()));
    }

    /// Append a nested block.
    pub fn push(&mut self, child: Self) { self.children.push(child); }

    /// Serialise the block and its children.
    ///
    /// # Errors
    ///
    /// Propagates errors from `out`.
    pub fn write<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{self}")
    }
}

fn escape(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    for c in text.chars() {
        match c {
            '&' => f.write_str("&amp;")?,
            '\'' => f.write_str("&apos;")?,
            '<' => f.write_str("&lt;")?,
            _ => fmt::Write::write_char(f, c)?,
        }
    }
    Ok(())
}

impl fmt::Display for OutputBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {key}='")?;
            escape(f, value)?;
            f.write_str("'")?;
        }
        if self.children.is_empty() {
            return f.write_str(" />");
        }
        f.write_str(">")?;
        for child in &self.children {
            child.fmt(f)?;
        }
        write!(f, "</{}>", self.name)
    }
}

/// Stack of open [`OutputBlock`]s.
#[derive(Debug, Default)]
pub struct Output {
    open: Vec<OutputBlock>,
}

impl Output {
    /// Create a writer with nothing open.
    #[must_use]
    pub const fn new() -> Self { Self { open: Vec::new() } }

    /// Open a block nested in the current one.
    pub fn child(&mut self, name: impl Into<String>) { self.open.push(OutputBlock::new(name)); }

    /// Add an attribute to the innermost open block.
    pub fn set(&mut self, name: impl Into<String>, value: impl fmt::Display) {
        if let Some(block) = self.open.last_mut() {
            block.set(name, value);
        } else {
            let attribute: String = name.into();
            warn!(%attribute, "attribute set with no open output block");
        }
    }

    /// Close the innermost block.
    ///
    /// Returns the finished tree when the outermost block closes; nested
    /// blocks are attached to their parent and `None` is returned.
    pub fn back(&mut self) -> Option<OutputBlock> {
        let block = self.open.pop()?;
        match self.open.last_mut() {
            Some(parent) => {
                parent.push(block);
                None
            }
            None => Some(block),
        }
    }

    /// Number of currently open blocks.
    #[must_use]
    pub fn depth(&self) -> usize { self.open.len() }
}
