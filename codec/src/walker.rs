//! Traversal state over a [MessageTemplate].
//!
//! A [Walker] tracks which template field the next typed read must target. It never touches the
//! byte stream: the [crate::Deserializer] consumes bits and then tells the walker to advance.
//!
//! Repetition rules:
//! - A basic field with count `n` yields `n` elements of its type.
//! - A struct field with count `n` replays its children `n` times.
//! - A dynamic field stays pending until its count is resolved with
//!   [Walker::set_dynamic_count].
//! - A struct field with zero repetitions is skipped as soon as the walker reaches it, and so
//!   is a struct whose children are all skipped this way, however many repetitions it has.
//! - A basic field with zero elements stays under the walker, marked empty, until
//!   [Walker::skip_empty] moves past it (a zero-length array read).

use crate::{
    template::{Count, FieldDesc, FieldId, FieldKind, MessageTemplate},
    DataType, Error,
};

/// Repetition state of the field under a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Remaining {
    /// The count of a dynamic field has not been read yet.
    Pending,
    /// Elements (or struct instances) left, including the current one.
    Left(u32),
    /// A basic field with no elements, waiting to be skipped.
    Empty,
}

/// Position within one sibling list of the template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Frame {
    /// The struct whose children are being walked, or `None` for the top level.
    parent: Option<FieldId>,
    /// Index of the current field within the sibling list.
    index: usize,
    /// Repetition state of the current field.
    remaining: Remaining,
}

/// Cursor over the fields of a [MessageTemplate].
#[derive(Clone, Debug)]
pub struct Walker<'a> {
    template: &'a MessageTemplate,
    stack: Vec<Frame>,
}

impl<'a> Walker<'a> {
    /// Creates a walker positioned before the first element of `template`.
    pub fn new(template: &'a MessageTemplate) -> Self {
        let mut walker = Self {
            template,
            stack: Vec::new(),
        };
        walker.reset();
        walker
    }

    /// Returns the template being walked.
    pub fn template(&self) -> &'a MessageTemplate {
        self.template
    }

    /// Rewinds to the first element of the template.
    pub fn reset(&mut self) {
        self.stack.clear();
        let frame = self.frame(None);
        self.stack.push(frame);
        self.settle();
    }

    /// Returns the field under the walker, or `None` once the traversal is complete.
    pub fn next_field(&self) -> Option<&'a FieldDesc> {
        let template = self.template;
        self.current().map(|id| template.desc(id))
    }

    /// Returns the type of the next element to read.
    ///
    /// Returns `None` if the traversal is complete, waits on a dynamic count, or is positioned
    /// on an empty field.
    pub fn next_type(&self) -> Option<DataType> {
        let top = self.stack.last()?;
        match top.remaining {
            Remaining::Left(n) if n > 0 => self.next_field()?.data_type(),
            _ => None,
        }
    }

    /// Returns true if every field of the template has been consumed.
    pub fn is_complete(&self) -> bool {
        self.stack.len() == 1 && self.current().is_none()
    }

    /// Returns true if the field under the walker waits on a dynamic count.
    pub fn is_pending(&self) -> bool {
        matches!(
            self.stack.last().map(|top| top.remaining),
            Some(Remaining::Pending)
        ) && !self.is_complete()
    }

    /// Returns the number of elements left in the basic field under the walker.
    pub fn elements_left(&self) -> Result<u32, Error> {
        let desc = self.next_field().ok_or(Error::SchemaExhausted)?;
        match self.top_remaining() {
            Remaining::Pending => Err(Error::DynamicCountRequired(desc.name().to_string())),
            Remaining::Left(n) => Ok(n),
            Remaining::Empty => Ok(0),
        }
    }

    /// Returns the width, in bits, of the count prefix of the pending dynamic field.
    pub fn count_bits(&self) -> Result<u32, Error> {
        let desc = self.next_field().ok_or(Error::SchemaExhausted)?;
        match (desc.count(), self.top_remaining()) {
            (Count::Dynamic { bits }, Remaining::Pending) => Ok(bits),
            _ => Err(Error::NotDynamic(desc.name().to_string())),
        }
    }

    /// Checks that the next element can be read as `ty`.
    pub fn expect(&self, ty: DataType) -> Result<(), Error> {
        let desc = self.next_field().ok_or(Error::SchemaExhausted)?;
        match self.top_remaining() {
            Remaining::Pending => Err(Error::DynamicCountRequired(desc.name().to_string())),
            Remaining::Empty => Err(Error::EmptyField(desc.name().to_string())),
            Remaining::Left(_) => match desc.data_type() {
                Some(expected) if expected == ty => Ok(()),
                Some(expected) => Err(Error::SchemaMismatch(expected, ty)),
                // Structs are never left under the walker with elements
                None => Err(Error::SchemaExhausted),
            },
        }
    }

    /// Moves past the current element, or past the field if it is empty.
    pub fn advance(&mut self) -> Result<(), Error> {
        let desc = self.next_field().ok_or(Error::SchemaExhausted)?;
        match self.top_remaining() {
            Remaining::Pending => {
                return Err(Error::DynamicCountRequired(desc.name().to_string()));
            }
            Remaining::Left(n) if n > 1 => {
                self.set_top_remaining(Remaining::Left(n - 1));
            }
            Remaining::Left(_) | Remaining::Empty => self.next_sibling(),
        }
        self.settle();
        Ok(())
    }

    /// Moves past an empty basic field of type `ty`.
    pub fn skip_empty(&mut self, ty: DataType) -> Result<(), Error> {
        let desc = self.next_field().ok_or(Error::SchemaExhausted)?;
        if let Some(expected) = desc.data_type() {
            if expected != ty {
                return Err(Error::SchemaMismatch(expected, ty));
            }
        }
        match self.top_remaining() {
            Remaining::Empty => self.advance(),
            Remaining::Pending => Err(Error::DynamicCountRequired(desc.name().to_string())),
            Remaining::Left(_) => Err(Error::NotEmpty(desc.name().to_string())),
        }
    }

    /// Resolves the count of the pending dynamic field under the walker.
    pub fn set_dynamic_count(&mut self, count: u32) -> Result<(), Error> {
        let desc = self.next_field().ok_or(Error::SchemaExhausted)?;
        if self.top_remaining() != Remaining::Pending {
            return Err(Error::NotDynamic(desc.name().to_string()));
        }
        let remaining = if count == 0 {
            Remaining::Empty
        } else {
            Remaining::Left(count)
        };
        self.set_top_remaining(remaining);
        self.settle();
        Ok(())
    }

    /// Returns the field under the top frame.
    fn current(&self) -> Option<FieldId> {
        let top = self.stack.last()?;
        self.template.children(top.parent).get(top.index).copied()
    }

    fn top_remaining(&self) -> Remaining {
        self.stack
            .last()
            .map(|top| top.remaining)
            .unwrap_or(Remaining::Left(0))
    }

    fn set_top_remaining(&mut self, remaining: Remaining) {
        if let Some(top) = self.stack.last_mut() {
            top.remaining = remaining;
        }
    }

    /// Creates a frame positioned on the first child of `parent`.
    fn frame(&self, parent: Option<FieldId>) -> Frame {
        let first = self.template.children(parent).first().copied();
        Frame {
            parent,
            index: 0,
            remaining: self.initial(first),
        }
    }

    /// Returns the repetition state of a field the walker has just reached.
    fn initial(&self, id: Option<FieldId>) -> Remaining {
        let Some(id) = id else {
            return Remaining::Left(0);
        };
        match self.template.desc(id).count() {
            Count::Fixed(0) => Remaining::Empty,
            Count::Fixed(n) => Remaining::Left(n),
            Count::Dynamic { .. } => Remaining::Pending,
        }
    }

    /// Moves the top frame to the next sibling.
    fn next_sibling(&mut self) {
        let Some(top) = self.stack.last().copied() else {
            return;
        };
        let index = top.index + 1;
        let next = self.template.children(top.parent).get(index).copied();
        let remaining = self.initial(next);
        if let Some(top) = self.stack.last_mut() {
            top.index = index;
            top.remaining = remaining;
        }
    }

    /// Returns true if walking an instance of struct `id` can never stop on a field.
    ///
    /// Every repetition of a hollow struct is skipped at once, whatever its count.
    fn is_hollow(&self, id: FieldId) -> bool {
        self.template.desc(id).children().iter().all(|&child| {
            let desc = self.template.desc(child);
            match (desc.kind(), desc.count()) {
                (FieldKind::Struct, Count::Fixed(0)) => true,
                (FieldKind::Struct, Count::Fixed(_)) => self.is_hollow(child),
                _ => false,
            }
        })
    }

    /// Descends into structs and skips zero-repetition structs until the walker rests on a
    /// basic field, a pending dynamic field, or the end of the template.
    fn settle(&mut self) {
        loop {
            let Some(top) = self.stack.last().copied() else {
                return;
            };
            let Some(id) = self.current() else {
                // End of a sibling list: finish the struct instance that owns it
                if self.stack.len() == 1 {
                    return;
                }
                self.stack.pop();
                match self.top_remaining() {
                    Remaining::Left(n) if n > 1 => self.set_top_remaining(Remaining::Left(n - 1)),
                    _ => self.next_sibling(),
                }
                continue;
            };

            let desc = self.template.desc(id);
            match (desc.kind(), top.remaining) {
                (_, Remaining::Pending) => return,
                (FieldKind::Basic(_), Remaining::Empty) => return,
                (FieldKind::Basic(_), Remaining::Left(n)) if n > 0 => return,
                (FieldKind::Struct, Remaining::Left(n)) if n > 0 && !self.is_hollow(id) => {
                    let frame = self.frame(Some(id));
                    self.stack.push(frame);
                }
                _ => self.next_sibling(),
            }
        }
    }
}
