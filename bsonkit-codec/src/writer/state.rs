//! The write-state stack machine.
//!
//! A [`StateStack`] is a push-down automaton over [`WriteState`] frames. The
//! bottom frame is always [`WriteState::Root`]; every other frame remembers
//! the [`Slot`] it fills in its parent, so closing a frame is a pop followed
//! by an attach. Frames are owned by the stack and discarded once popped;
//! nothing outside the stack holds a reference to a frame.

use bson::{Bson, Document};
use tracing::trace;

use crate::error::{CodecResult, NestingError};

/// Where a finished frame is attached in its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// The result of the whole pass.
    Root,
    /// A named field of the parent document.
    Field(String),
    /// The next element of the parent array.
    Element,
    /// The single value expected by the parent value frame.
    Value,
}

/// One level of the structure being built.
#[derive(Debug)]
pub enum WriteState {
    /// The bottom of the stack.
    Root {
        /// Seed merged into the first top-level document.
        seed: Option<Document>,
        /// The finished top-level value.
        finished: Option<Bson>,
    },
    /// An open document.
    Document {
        /// Fields written so far.
        document: Document,
        /// Name waiting for the next value.
        pending_name: Option<String>,
        /// Where this document goes when closed.
        slot: Slot,
    },
    /// An open array.
    Array {
        /// Elements written so far.
        elements: Vec<Bson>,
        /// Where this array goes when closed.
        slot: Slot,
    },
    /// Expecting exactly one value, scalar or container.
    Value {
        /// Where the value goes once written.
        slot: Slot,
    },
}

impl WriteState {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Root { .. } => "root",
            Self::Document { .. } => "document",
            Self::Array { .. } => "array",
            Self::Value { .. } => "value",
        }
    }
}

/// Stack of write states with the root at the bottom.
#[derive(Debug)]
pub struct StateStack {
    frames: Vec<WriteState>,
}

impl Default for StateStack {
    fn default() -> Self {
        Self::new(None)
    }
}

impl StateStack {
    /// Create a stack holding only the root, optionally seeded.
    pub fn new(seed: Option<Document>) -> Self {
        Self {
            frames: vec![WriteState::Root {
                seed,
                finished: None,
            }],
        }
    }

    /// Create a stack already expecting a single value at the root.
    pub fn for_value() -> Self {
        Self {
            frames: vec![
                WriteState::Root {
                    seed: None,
                    finished: None,
                },
                WriteState::Value { slot: Slot::Root },
            ],
        }
    }

    /// Number of frames above the root.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Name of the current state.
    pub fn state_name(&self) -> &'static str {
        self.current().name()
    }

    /// The current (top) frame.
    pub fn current(&self) -> &WriteState {
        // The root is never popped, so the stack is never empty.
        &self.frames[self.frames.len() - 1]
    }

    fn current_mut(&mut self) -> &mut WriteState {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    /// Whether the root holds a finished value and no level is open.
    pub fn is_complete(&self) -> bool {
        self.depth() == 0 && self.finished().is_some()
    }

    /// The finished top-level value, if any.
    pub fn finished(&self) -> Option<&Bson> {
        match &self.frames[0] {
            WriteState::Root { finished, .. } => finished.as_ref(),
            _ => None,
        }
    }

    /// Take the finished value, leaving the root empty.
    pub fn take_finished(&mut self) -> Option<Bson> {
        if self.depth() != 0 {
            return None;
        }
        match &mut self.frames[0] {
            WriteState::Root { finished, .. } => finished.take(),
            _ => None,
        }
    }

    /// Record the name of the next field. Only legal inside a document.
    pub fn name(&mut self, field: &str) -> CodecResult<()> {
        match self.current_mut() {
            WriteState::Document { pending_name, .. } => match pending_name {
                Some(pending) => Err(NestingError::NameAlreadyPending {
                    pending: pending.clone(),
                    name: field.to_string(),
                }
                .into()),
                None => {
                    *pending_name = Some(field.to_string());
                    Ok(())
                }
            },
            other => Err(NestingError::InvalidState {
                operation: "write a field name",
                state: other.name(),
            }
            .into()),
        }
    }

    /// Open a document, named when the caller is inside a document.
    pub fn enter_document(&mut self, name: Option<&str>) -> CodecResult<()> {
        if let Some(name) = name {
            self.name(name)?;
        }
        let (slot, seed) = self.claim_slot("start a document")?;
        self.frames.push(WriteState::Document {
            document: seed.unwrap_or_default(),
            pending_name: None,
            slot,
        });
        Ok(())
    }

    /// Close the current document and attach it to its parent.
    pub fn exit_document(&mut self) -> CodecResult<()> {
        match self.current() {
            WriteState::Document {
                pending_name: Some(pending),
                ..
            } => return Err(NestingError::DanglingName(pending.clone()).into()),
            WriteState::Document { .. } => {}
            other => {
                return Err(NestingError::InvalidState {
                    operation: "end a document",
                    state: other.name(),
                }
                .into());
            }
        }
        match self.previous()? {
            WriteState::Document { document, slot, .. } => {
                self.attach(slot, Bson::Document(document))
            }
            _ => Err(NestingError::AlreadyAtRoot.into()),
        }
    }

    /// Open an array, named when the caller is inside a document.
    pub fn enter_array(&mut self, name: Option<&str>) -> CodecResult<()> {
        if let Some(name) = name {
            self.name(name)?;
        }
        let (slot, _) = self.claim_slot("start an array")?;
        self.frames.push(WriteState::Array {
            elements: Vec::new(),
            slot,
        });
        Ok(())
    }

    /// Close the current array and attach it to its parent.
    pub fn exit_array(&mut self) -> CodecResult<()> {
        if !matches!(self.current(), WriteState::Array { .. }) {
            return Err(NestingError::InvalidState {
                operation: "end an array",
                state: self.state_name(),
            }
            .into());
        }
        match self.previous()? {
            WriteState::Array { elements, slot } => self.attach(slot, Bson::Array(elements)),
            _ => Err(NestingError::AlreadyAtRoot.into()),
        }
    }

    /// Open a value frame at the root to receive exactly one value.
    pub fn enter_value(&mut self) -> CodecResult<()> {
        match self.current() {
            WriteState::Root { finished: None, .. } => {
                self.frames.push(WriteState::Value { slot: Slot::Root });
                Ok(())
            }
            WriteState::Root { .. } => Err(NestingError::RootAlreadyComplete.into()),
            other => Err(NestingError::InvalidState {
                operation: "start a value",
                state: other.name(),
            }
            .into()),
        }
    }

    /// Write a value in the current position without growing the stack.
    pub fn write_scalar(&mut self, name: Option<&str>, value: Bson) -> CodecResult<()> {
        if let Some(name) = name {
            self.name(name)?;
        }
        if matches!(self.current(), WriteState::Value { .. }) {
            return self.complete_value(value);
        }
        match self.current_mut() {
            WriteState::Document {
                document,
                pending_name,
                ..
            } => match pending_name.take() {
                Some(field) => {
                    insert_field(document, field, value);
                    Ok(())
                }
                None => Err(NestingError::MissingName.into()),
            },
            WriteState::Array { elements, .. } => {
                elements.push(value);
                Ok(())
            }
            WriteState::Root { .. } => Err(NestingError::ScalarAtRoot.into()),
            WriteState::Value { .. } => Err(NestingError::InvalidState {
                operation: "write a value",
                state: "value",
            }
            .into()),
        }
    }

    /// Pop one level. Fails at the root.
    pub fn previous(&mut self) -> CodecResult<WriteState> {
        if self.frames.len() == 1 {
            return Err(NestingError::AlreadyAtRoot.into());
        }
        self.frames
            .pop()
            .ok_or_else(|| NestingError::AlreadyAtRoot.into())
    }

    /// Work out where a new container goes, consuming the pending name or the
    /// root seed.
    fn claim_slot(&mut self, operation: &'static str) -> CodecResult<(Slot, Option<Document>)> {
        let claimed: CodecResult<(Slot, Option<Document>)> = match self.current_mut() {
            WriteState::Root { finished: Some(_), .. } => {
                Err(NestingError::RootAlreadyComplete.into())
            }
            WriteState::Root { seed, .. } => Ok((Slot::Root, seed.take())),
            WriteState::Document { pending_name, .. } => match pending_name.take() {
                Some(field) => Ok((Slot::Field(field), None)),
                None => Err(NestingError::MissingName.into()),
            },
            WriteState::Array { .. } => Ok((Slot::Element, None)),
            WriteState::Value { .. } => Ok((Slot::Value, None)),
        };
        if claimed.is_err() {
            trace!(operation, state = self.state_name(), "rejected container start");
        }
        claimed
    }

    /// Attach a finished value to the current frame.
    fn attach(&mut self, slot: Slot, value: Bson) -> CodecResult<()> {
        if slot == Slot::Value {
            return self.complete_value(value);
        }
        match (self.current_mut(), slot) {
            (WriteState::Root { finished, .. }, Slot::Root) => {
                if finished.is_some() {
                    return Err(NestingError::RootAlreadyComplete.into());
                }
                *finished = Some(value);
                Ok(())
            }
            (WriteState::Document { document, .. }, Slot::Field(field)) => {
                insert_field(document, field, value);
                Ok(())
            }
            (WriteState::Array { elements, .. }, Slot::Element) => {
                elements.push(value);
                Ok(())
            }
            (state, slot) => Err(crate::error::CodecError::internal(format!(
                "cannot attach to {:?} in the {} state",
                slot,
                state.name()
            ))),
        }
    }

    /// Pop the current value frame and hand its value to the parent.
    fn complete_value(&mut self, value: Bson) -> CodecResult<()> {
        match self.previous()? {
            WriteState::Value { slot } => self.attach(slot, value),
            other => Err(crate::error::CodecError::internal(format!(
                "expected a value frame, found the {} state",
                other.name()
            ))),
        }
    }
}

fn insert_field(document: &mut Document, field: String, value: Bson) {
    if document.contains_key(&field) {
        trace!(field = %field, "overwriting existing field");
    }
    document.insert(field, value);
}
