use document::Value;
use indexmap::IndexMap;
use schema::{OperationSchema, ProtocolKind};

use crate::context::Context;
use crate::error::CallError;
use crate::pipeline::Pipeline;

/// Where a [`Paginator`] writes the stored continuation token on the next
/// request, where it reads the new one off a response, and (optionally)
/// which input member caps page size against a remaining item budget (spec
/// §4.4 "Pagination").
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// Top-level input member the next-page token is written to.
    pub input_token_member: String,
    /// Dotted path into the output the next-page token is read from.
    pub output_token_path: Vec<String>,
    /// Top-level input member holding the requested page size, if the
    /// operation supports one.
    pub page_size_member: Option<String>,
    /// Total item budget across every page this paginator yields.
    pub max_items: Option<u64>,
    /// Dotted path into the output holding the page's item list, consulted
    /// to deduct from the remaining `max_items` budget as pages are
    /// yielded. Required for `max_items` to actually bound anything.
    pub output_items_path: Option<Vec<String>>,
}

impl PaginationConfig {
    pub fn new(input_token_member: impl Into<String>, output_token_path: &str) -> Self {
        PaginationConfig {
            input_token_member: input_token_member.into(),
            output_token_path: output_token_path.split('.').map(str::to_string).collect(),
            page_size_member: None,
            max_items: None,
            output_items_path: None,
        }
    }

    pub fn with_page_size_member(mut self, member: impl Into<String>) -> Self {
        self.page_size_member = Some(member.into());
        self
    }

    pub fn with_max_items(mut self, max_items: u64) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_output_items_path(mut self, path: &str) -> Self {
        self.output_items_path = Some(path.split('.').map(str::to_string).collect());
        self
    }
}

/// A lazy sequence of output pages driven by next-token exchange (spec
/// §4.4, GLOSSARY "Paginator"). Call [`Paginator::next_page`] until it
/// returns `None`; each call makes one [`Pipeline::call`].
///
/// Halts when the output carries no token (last page), or when two
/// consecutive non-null tokens are identical — a guard against a server bug
/// that would otherwise spin the paginator forever (spec §8 scenario 5).
pub struct Paginator<'a> {
    pipeline: &'a Pipeline,
    operation: &'a OperationSchema,
    protocol: ProtocolKind,
    config: PaginationConfig,
    context: Context,
    base_input: Value,
    next_token: Option<String>,
    previous_token: Option<String>,
    items_remaining: Option<u64>,
    done: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(
        pipeline: &'a Pipeline,
        operation: &'a OperationSchema,
        protocol: ProtocolKind,
        config: PaginationConfig,
        input: Value,
        context: Context,
    ) -> Self {
        let items_remaining = config.max_items;
        Paginator {
            pipeline,
            operation,
            protocol,
            config,
            context,
            base_input: input,
            next_token: None,
            previous_token: None,
            items_remaining,
            done: false,
        }
    }

    /// Fetches the next page, or `None` once the sequence has terminated.
    pub async fn next_page(&mut self) -> Result<Option<Value>, CallError> {
        if self.done {
            return Ok(None);
        }

        let mut input = self.base_input.clone();
        if let Some(token) = &self.next_token {
            set_member(&mut input, &self.config.input_token_member, Value::String(token.clone()));
        }
        if let (Some(member), Some(remaining)) = (&self.config.page_size_member, self.items_remaining) {
            clamp_page_size(&mut input, member, remaining);
        }

        let output = self.pipeline.call(self.operation, self.protocol, input, self.context.clone()).await?;

        if let (Some(path), Some(remaining)) = (&self.config.output_items_path, self.items_remaining) {
            let yielded = dotted_array_len(&output, path).unwrap_or(0) as u64;
            let remaining = remaining.saturating_sub(yielded);
            self.items_remaining = Some(remaining);
            if remaining == 0 {
                self.done = true;
                return Ok(Some(output));
            }
        }

        let token = dotted_string(&output, &self.config.output_token_path);
        if let (Some(current), Some(previous)) = (&token, &self.previous_token) {
            if current == previous {
                self.done = true;
                return Ok(Some(output));
            }
        }
        if token.is_none() {
            self.done = true;
        }
        self.previous_token = token.clone();
        self.next_token = token;

        Ok(Some(output))
    }
}

fn set_member(input: &mut Value, member: &str, value: Value) {
    if let Value::Object(map) = input {
        map.insert(member.to_string(), value);
    } else {
        let mut map = IndexMap::new();
        map.insert(member.to_string(), value);
        *input = Value::Object(map);
    }
}

fn clamp_page_size(input: &mut Value, member: &str, remaining: u64) {
    let Value::Object(map) = input else { return };
    let Some(current) = map.get(member).and_then(Value::as_f64) else { return };
    if current > remaining as f64 {
        map.insert(member.to_string(), Value::PosInt(remaining));
    }
}

fn dotted_string(value: &Value, path: &[String]) -> Option<String> {
    let mut current = value;
    for segment in path {
        current = current.as_object()?.get(segment)?;
    }
    current.as_str().map(str::to_string)
}

fn dotted_array_len(value: &Value, path: &[String]) -> Option<usize> {
    let mut current = value;
    for segment in path {
        current = current.as_object()?.get(segment)?;
    }
    current.as_array().map(<[Value]>::len)
}
