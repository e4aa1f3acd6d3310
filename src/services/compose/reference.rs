//! `!ref` and `!xref` handlers.
//!
//! Both copy a node of the document being composed. When the target is
//! itself a `!ref` directive the chain is followed, so a value is copied once
//! it is concrete rather than once per hop. Targets that are directives of
//! any other kind make the handler retry until that directive is resolved.

use super::handler::{
    CompositionContext, CompositionHandler, CompositionStatus, directive_option, string_payload,
};
use crate::services::wrapper::direct::{DirectWrapper, resolve_in};
use crate::services::wrapper::ContentWrapper;
use crate::{ChainLink, Error, Pointer, Result};
use serde_json::{Map, Value};

pub const REFERENCE_MARKER: &str = "!ref";
pub const EXTENDED_REFERENCE_MARKER: &str = "!xref";

/// Result of following a reference chain.
enum Target<'a> {
    /// Some pointer along the chain does not exist (yet).
    Missing,
    /// The chain ends at a directive that still has to be composed.
    Pending,
    Found(&'a Value),
}

/// Parse a directive payload into a plain, non-root pointer.
fn payload_pointer(directive: &Map<String, Value>, marker: &str) -> Result<Pointer> {
    let raw = string_payload(directive, marker)?;
    let pointer = Pointer::parse_plain(raw)?;
    if pointer.is_root() {
        return Err(Error::Syntax {
            input: raw.to_string(),
            reason: "referencing the whole document is not allowed".to_string(),
        });
    }
    Ok(pointer)
}

fn follow_chain<'a>(start: Pointer, ctx: &CompositionContext<'a>) -> Result<Target<'a>> {
    let mut visiting = vec![ctx.pointer.clone()];
    let mut chain: Vec<ChainLink> = Vec::new();
    let mut node = ctx.pointer.clone();
    let mut target = start;

    loop {
        chain.push(ChainLink {
            node: node.to_string(),
            target: target.to_string(),
        });

        // Copying an ancestor into its own descendant never terminates
        if visiting.contains(&target) || ctx.pointer.is_child_of(&target) {
            return Err(Error::Cycle {
                kind: "Reference",
                target: target.to_string(),
                chain,
            });
        }

        let Ok(value) = ctx.document.get(&target) else {
            return Ok(Target::Missing);
        };

        match value {
            Value::Object(map) if map.contains_key(REFERENCE_MARKER) => {
                let next = payload_pointer(map, REFERENCE_MARKER)?;
                visiting.push(target.clone());
                node = target;
                target = next;
            }
            other if ctx.is_directive(other) => return Ok(Target::Pending),
            other => return Ok(Target::Found(other)),
        }
    }
}

/// `{"!ref": "/path/to/node"}`: deep copy of another node.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceHandler;

impl CompositionHandler for ReferenceHandler {
    fn name(&self) -> &'static str {
        "Reference"
    }

    fn marker(&self) -> &'static str {
        REFERENCE_MARKER
    }

    fn compose(
        &mut self,
        directive: &Map<String, Value>,
        ctx: &CompositionContext<'_>,
    ) -> Result<(CompositionStatus, Value)> {
        let target = payload_pointer(directive, REFERENCE_MARKER)?;
        match follow_chain(target, ctx)? {
            Target::Found(value) => Ok((CompositionStatus::Success, value.clone())),
            Target::Missing | Target::Pending => Ok((CompositionStatus::Retry, Value::Null)),
        }
    }
}

/// `{"!xref": "/path", "$extend": {...}, "$delete": [...]}`: deep copy of
/// a map with an overlay applied.
///
/// Sub-pointers in `$extend`/`$delete` are rooted at the copied value.
/// Optional `$ifPresent`/`$ifMissing` lists, rooted at the target, gate the
/// overlay; the handler retries until they hold.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtendedReferenceHandler;

impl ExtendedReferenceHandler {
    fn sub_pointers(directive: &Map<String, Value>, option: &str) -> Result<Vec<Pointer>> {
        let Some(raw) = directive_option(directive, option) else {
            return Ok(Vec::new());
        };
        let Value::Array(items) = raw else {
            return Err(Error::InvalidInput(format!(
                "\"${option}\" expects a list of pointers, got {raw}"
            )));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Pointer::parse_plain(s),
                other => Err(Error::InvalidInput(format!(
                    "\"${option}\" expects pointer strings, got {other}"
                ))),
            })
            .collect()
    }

    fn extensions(directive: &Map<String, Value>) -> Result<Vec<(Pointer, Value)>> {
        let Some(raw) = directive_option(directive, "extend") else {
            return Ok(Vec::new());
        };
        let Value::Object(map) = raw else {
            return Err(Error::InvalidInput(format!(
                "\"$extend\" expects a map of pointer to value, got {raw}"
            )));
        };
        map.iter()
            .map(|(sub, value)| Ok((Pointer::parse_plain(sub)?, value.clone())))
            .collect()
    }
}

impl CompositionHandler for ExtendedReferenceHandler {
    fn name(&self) -> &'static str {
        "ExtendedReference"
    }

    fn marker(&self) -> &'static str {
        EXTENDED_REFERENCE_MARKER
    }

    fn compose(
        &mut self,
        directive: &Map<String, Value>,
        ctx: &CompositionContext<'_>,
    ) -> Result<(CompositionStatus, Value)> {
        let target = payload_pointer(directive, EXTENDED_REFERENCE_MARKER)?;
        let if_present = Self::sub_pointers(directive, "ifPresent")?;
        let if_missing = Self::sub_pointers(directive, "ifMissing")?;
        let extend = Self::extensions(directive)?;
        let delete = Self::sub_pointers(directive, "delete")?;

        let value = match follow_chain(target.clone(), ctx)? {
            Target::Found(value) => value,
            Target::Missing | Target::Pending => return Ok((CompositionStatus::Retry, Value::Null)),
        };

        let gates_hold = if_present.iter().all(|sub| resolve_in(value, sub).is_ok())
            && if_missing.iter().all(|sub| resolve_in(value, sub).is_err());
        if !gates_hold {
            log::trace!("Overlay gates for {target} not satisfied yet");
            return Ok((CompositionStatus::Retry, Value::Null));
        }

        if extend.is_empty() && delete.is_empty() {
            return Ok((CompositionStatus::Success, value.clone()));
        }
        if !value.is_object() {
            return Err(Error::InvalidOperation {
                pointer: target.to_string(),
                reason: "only maps can be extended or trimmed".to_string(),
            });
        }

        let mut copy = DirectWrapper::new(value.clone());
        for (sub, item) in extend {
            copy.update(&sub, item)?;
        }
        for sub in &delete {
            if !copy.delete(sub) {
                log::debug!("Nothing to delete at {sub} in copy of {target}");
            }
        }

        Ok((CompositionStatus::Success, copy.into_inner()))
    }
}
