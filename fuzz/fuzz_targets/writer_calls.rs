//! Fuzz target for the document writer.
//!
//! Drives a writer with arbitrary call sequences. Misplaced calls must fail
//! with an error, never panic, and a writer that reports a finished
//! document must be back at the root.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_writer_calls
//! ```

#![no_main]

use arbitrary::Arbitrary;
use bsonkit_codec::{DocumentReader, DocumentWriter};
use libfuzzer_sys::fuzz_target;

/// One writer call.
#[derive(Debug, Arbitrary)]
enum WriterCall {
    StartDocument(Option<String>),
    EndDocument,
    StartArray(Option<String>),
    EndArray,
    Name(String),
    Int32(Option<String>, i32),
    Int64(Option<String>, i64),
    Double(Option<String>, f64),
    String(Option<String>, String),
    Boolean(Option<String>, bool),
    Null(Option<String>),
    Reset,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    value_mode: bool,
    calls: Vec<WriterCall>,
}

fn apply(writer: &mut DocumentWriter, call: WriterCall) {
    // Errors are expected; only panics are bugs.
    let _ = match call {
        WriterCall::StartDocument(Some(name)) => writer.write_start_document_named(&name),
        WriterCall::StartDocument(None) => writer.write_start_document(),
        WriterCall::EndDocument => writer.write_end_document(),
        WriterCall::StartArray(Some(name)) => writer.write_start_array_named(&name),
        WriterCall::StartArray(None) => writer.write_start_array(),
        WriterCall::EndArray => writer.write_end_array(),
        WriterCall::Name(name) => writer.write_name(&name),
        WriterCall::Int32(Some(name), v) => writer.write_int32_named(&name, v),
        WriterCall::Int32(None, v) => writer.write_int32(v),
        WriterCall::Int64(Some(name), v) => writer.write_int64_named(&name, v),
        WriterCall::Int64(None, v) => writer.write_int64(v),
        WriterCall::Double(Some(name), v) => writer.write_double_named(&name, v),
        WriterCall::Double(None, v) => writer.write_double(v),
        WriterCall::String(Some(name), v) => writer.write_string_named(&name, &v),
        WriterCall::String(None, v) => writer.write_string(&v),
        WriterCall::Boolean(Some(name), v) => writer.write_boolean_named(&name, v),
        WriterCall::Boolean(None, v) => writer.write_boolean(v),
        WriterCall::Null(Some(name)) => writer.write_null_named(&name),
        WriterCall::Null(None) => writer.write_null(),
        WriterCall::Reset => {
            writer.reset();
            Ok(())
        }
    };
}

fuzz_target!(|input: FuzzInput| {
    let mut writer = if input.value_mode {
        DocumentWriter::for_value()
    } else {
        DocumentWriter::new()
    };

    for call in input.calls.into_iter().take(256) {
        apply(&mut writer, call);
    }

    let complete = writer.is_complete();
    let depth = writer.depth();
    if let Ok(value) = writer.finish_value() {
        assert!(complete);
        assert_eq!(depth, 0);
        // Whatever was written must be readable back in full.
        let mut reader = DocumentReader::from_bson(value);
        assert!(reader.read_bson().is_ok());
        assert!(reader.is_finished());
    }
});
