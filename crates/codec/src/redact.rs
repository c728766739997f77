use document::Value;
use schema::{Registry, SchemaRef, ShapeKind};

const REDACTED: &str = "*REDACTED*";

/// Replaces the payload of any value whose shape or member carries the
/// `sensitive` trait with the fixed token `*REDACTED*` (spec §4.2
/// Sensitivity, §8 "Sensitive redaction"). Walks `value` alongside the
/// shape graph rooted at `schema`, recursing into structures, list
/// elements, and map values exactly as the registry models them —
/// grounded on `doc::redact`'s node-alongside-schema walk, simplified from
/// its pluggable `Strategy` (block/hash) down to the fixed-token policy
/// this spec calls for.
pub fn redact(registry: &Registry, schema: SchemaRef, value: &mut Value) {
    let well_known = registry.well_known();

    if registry.has_trait(schema, well_known.sensitive) {
        *value = Value::String(REDACTED.to_string());
        return;
    }

    match registry.kind(schema) {
        ShapeKind::Structure | ShapeKind::Union => {
            let Value::Object(fields) = value else {
                return;
            };
            for member in registry.members(schema) {
                let target = registry.member_target(member);
                if registry.has_trait(target, well_known.sensitive) {
                    if let Some(v) = fields.get_mut(&member.name) {
                        *v = Value::String(REDACTED.to_string());
                    }
                } else if let Some(v) = fields.get_mut(&member.name) {
                    redact(registry, target, v);
                }
            }
        }
        ShapeKind::List => {
            let Value::Array(items) = value else {
                return;
            };
            if let Some(member) = registry.members(schema).first() {
                let target = registry.member_target(member);
                for item in items.iter_mut() {
                    redact(registry, target, item);
                }
            }
        }
        ShapeKind::Map => {
            let Value::Object(fields) = value else {
                return;
            };
            if let Some(value_member) = registry.member_by_name(schema, "value") {
                let target = registry.member_target(value_member);
                for v in fields.values_mut() {
                    redact(registry, target, v);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use schema::{Member, MemberIndex, MemberTarget, Registry, ShapeId, TraitMap};

    fn build() -> (Registry, SchemaRef, SchemaRef) {
        let mut reg = Registry::new();
        let sensitive = reg.trait_interner().intern::<()>("sensitive");

        let secret_str = reg
            .register(
                ShapeId::new("ex", "Secret"),
                ShapeKind::Scalar(schema::Scalar::String),
                vec![],
                {
                    let mut t = TraitMap::new();
                    t.insert(sensitive, ());
                    t
                },
            )
            .unwrap();
        let plain_str = reg
            .register(
                ShapeId::new("ex", "Plain"),
                ShapeKind::Scalar(schema::Scalar::String),
                vec![],
                TraitMap::new(),
            )
            .unwrap();
        let widget = reg
            .register(
                ShapeId::new("ex", "Widget"),
                ShapeKind::Structure,
                vec![
                    Member {
                        name: "password".into(),
                        index: MemberIndex(0),
                        target: MemberTarget::Resolved(secret_str),
                    },
                    Member {
                        name: "name".into(),
                        index: MemberIndex(1),
                        target: MemberTarget::Resolved(plain_str),
                    },
                ],
                TraitMap::new(),
            )
            .unwrap();
        reg.freeze().unwrap();
        (reg, widget, secret_str)
    }

    #[test]
    fn sensitive_member_is_redacted_and_plain_member_is_not() {
        let (reg, widget, _secret) = build();
        let mut value = Value::Object(indexmap::indexmap! {
            "password".to_string() => Value::from("hunter2"),
            "name".to_string() => Value::from("Bob"),
        });

        redact(&reg, widget, &mut value);

        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("password").unwrap().as_str(), Some("*REDACTED*"));
        assert_eq!(obj.get("name").unwrap().as_str(), Some("Bob"));
    }
}
