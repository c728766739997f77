use crate::node::{AsNode, Fields, Node};

/// Structural equality across any two [`AsNode`] representations (spec §4.3,
/// §8 "Document equivalence"): numeric values compare by canonical
/// magnitude regardless of which integer/float variant produced them, and
/// object equality is order-insensitive — only `(lhs.len() == rhs.len())`
/// plus a by-key lookup, rather than a positional zip.
///
/// Grounded on `doc::compare::compare`, generalized from a total ordering
/// (needed there for sorted storage) down to the equality-only relation the
/// spec actually asks for.
pub fn equal<L: AsNode, R: AsNode>(lhs: &L, rhs: &R) -> bool {
    match (lhs.as_node(), rhs.as_node()) {
        (Node::Null, Node::Null) => true,
        (Node::Bool(l), Node::Bool(r)) => l == r,
        (Node::Bytes(l), Node::Bytes(r)) => l == r,
        (Node::String(l), Node::String(r)) => l == r,
        (Node::Timestamp(l), Node::Timestamp(r)) => l == r,
        (Node::Array(l), Node::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r.iter()).all(|(l, r)| equal(l, r))
        }
        (Node::Object(l), Node::Object(r)) => {
            l.len() == r.len()
                && l.iter().all(|field| {
                    r.get(field.property())
                        .map(|rf| equal(field.value(), rf.value()))
                        .unwrap_or(false)
                })
        }
        (lhs_num, rhs_num) if is_numeric(&lhs_num) && is_numeric(&rhs_num) => {
            numeric_value(&lhs_num) == numeric_value(&rhs_num)
        }
        _ => false,
    }
}

fn is_numeric<N: AsNode>(n: &Node<'_, N>) -> bool {
    matches!(n, Node::PosInt(_) | Node::NegInt(_) | Node::Float(_))
}

fn numeric_value<N: AsNode>(n: &Node<'_, N>) -> f64 {
    match n {
        Node::PosInt(v) => *v as f64,
        Node::NegInt(v) => *v as f64,
        Node::Float(v) => *v,
        _ => unreachable!("guarded by is_numeric"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Value;

    #[test]
    fn numeric_kinds_compare_by_magnitude() {
        assert!(equal(&Value::from(1u64), &Value::from(1.0f64)));
        assert!(equal(&Value::from(-1i64), &Value::from(-1.0f64)));
        assert!(!equal(&Value::from(1u64), &Value::from(2u64)));
    }

    #[test]
    fn objects_compare_order_insensitively() {
        let a = Value::Object(indexmap::indexmap! {
            "a".to_string() => Value::from(1u64),
            "b".to_string() => Value::from(2u64),
        });
        let b = Value::Object(indexmap::indexmap! {
            "b".to_string() => Value::from(2u64),
            "a".to_string() => Value::from(1u64),
        });
        assert!(equal(&a, &b));
    }

    #[test]
    fn mismatched_kinds_are_unequal() {
        assert!(!equal(&Value::from("1"), &Value::from(1u64)));
        assert!(!equal(&Value::Null, &Value::from(false)));
    }
}
