use schema::{MemberIndex, ShapeId};

/// The single fallibility type for every serde-kernel operation (spec
/// §4.2 "Fallibility"): no partial state escapes a failed write or read —
/// write buffers are discarded by the caller before this propagates, and a
/// failed read never yields a partially populated struct.
#[derive(Debug, thiserror::Error)]
#[error("serialization error for shape '{schema_id}'{}: {message}", member_suffix(.member_index))]
pub struct SerializationException {
    pub message: String,
    pub schema_id: ShapeId,
    pub member_index: Option<MemberIndex>,
}

fn member_suffix(index: &Option<MemberIndex>) -> String {
    match index {
        Some(MemberIndex(i)) => format!(" member #{i}"),
        None => String::new(),
    }
}

impl SerializationException {
    pub fn new(schema_id: ShapeId, message: impl Into<String>) -> Self {
        SerializationException {
            message: message.into(),
            schema_id,
            member_index: None,
        }
    }

    pub fn at_member(mut self, index: MemberIndex) -> Self {
        self.member_index = Some(index);
        self
    }
}

pub type Result<T> = std::result::Result<T, SerializationException>;
