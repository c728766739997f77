use crate::id::{SchemaRef, ShapeId};
use crate::shape::{Member, MemberIndex, MemberTarget, ShapeKind};
use crate::traits::{TraitInterner, TraitKey, TraitMap};
use crate::well_known::WellKnown;
use fxhash::FxHashMap as HashMap;
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shape '{0}' is registered twice with diverging definitions")]
    DuplicateRegistration(ShapeId),
    #[error("shape '{0}' has no registered definition")]
    UnresolvedTarget(ShapeId),
    #[error("registry is already frozen")]
    AlreadyFrozen,
    #[error("registry must be frozen before it can be queried")]
    NotFrozen,
}

type Result<T> = std::result::Result<T, Error>;

struct ShapeData {
    id: ShapeId,
    kind: ShapeKind,
    members: Vec<Member>,
    traits: TraitMap,
}

/// A builder/immutable pair over a shape arena, following the "arena +
/// index" design of `json::schema::index::{IndexBuilder, Index}`: shapes are
/// added by id (possibly with deferred member targets), then [`freeze`]
/// resolves every deferred target and makes the registry safe to share
/// immutably and concurrently, as §5 requires.
pub struct Registry {
    interner: TraitInterner,
    by_id: HashMap<ShapeId, SchemaRef>,
    arena: Vec<ShapeData>,
    frozen: bool,
    well_known: OnceLock<WellKnown>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            interner: TraitInterner::new(),
            by_id: HashMap::default(),
            arena: Vec::new(),
            frozen: false,
            well_known: OnceLock::new(),
        }
    }

    pub fn trait_interner(&self) -> &TraitInterner {
        &self.interner
    }

    /// The trait keys the runtime core itself interprets (§4.1), interned
    /// once against this registry's [`TraitInterner`] and cached for the
    /// registry's lifetime.
    pub fn well_known(&self) -> &WellKnown {
        self.well_known
            .get_or_init(|| crate::well_known::well_known(&self.interner))
    }

    /// Register a shape. Idempotent: registering the same id twice with an
    /// identical member list and kind is a no-op; registering it with a
    /// diverging definition is a fatal [`Error::DuplicateRegistration`], per
    /// §4.1.
    pub fn register(
        &mut self,
        id: ShapeId,
        kind: ShapeKind,
        members: Vec<Member>,
        traits: TraitMap,
    ) -> Result<SchemaRef> {
        if self.frozen {
            return Err(Error::AlreadyFrozen);
        }
        if let Some(&existing) = self.by_id.get(&id) {
            let data = &self.arena[existing.0 as usize];
            if data.kind != kind || data.members.len() != members.len() {
                return Err(Error::DuplicateRegistration(id));
            }
            return Ok(existing);
        }

        let index = SchemaRef(self.arena.len() as u32);
        self.arena.push(ShapeData {
            id: id.clone(),
            kind,
            members,
            traits,
        });
        self.by_id.insert(id, index);
        Ok(index)
    }

    /// Registers one additional shape after the registry has already been
    /// frozen, provided every member target is already [`MemberTarget::Resolved`]
    /// — used by the proxy bridge to synthesize `<Name>ProxyInput` shapes
    /// out of members copied from already-frozen shapes (spec §4.7
    /// "additionalInput mixin"). This does not reopen the freeze invariant
    /// for any previously-registered shape: it only appends a new arena
    /// entry that needs no further resolution pass.
    pub fn register_resolved(
        &mut self,
        id: ShapeId,
        kind: ShapeKind,
        members: Vec<Member>,
        traits: TraitMap,
    ) -> Result<SchemaRef> {
        debug_assert!(
            members.iter().all(|m| matches!(m.target, MemberTarget::Resolved(_))),
            "register_resolved requires every member target to already be resolved"
        );
        if let Some(&existing) = self.by_id.get(&id) {
            return Ok(existing);
        }

        let index = SchemaRef(self.arena.len() as u32);
        self.arena.push(ShapeData { id: id.clone(), kind, members, traits });
        self.by_id.insert(id, index);
        Ok(index)
    }

    /// Resolve every deferred member target. After this call the registry
    /// is immutable; shared trait lookups and member resolution are O(1).
    pub fn freeze(&mut self) -> Result<()> {
        if self.frozen {
            return Ok(());
        }
        // Two-phase: all shapes already added (phase one); resolve
        // recursive/forward links now that every id is known (phase two).
        for i in 0..self.arena.len() {
            let resolved: Vec<Member> = self.arena[i]
                .members
                .iter()
                .map(|m| {
                    let target = match &m.target {
                        MemberTarget::Resolved(r) => MemberTarget::Resolved(*r),
                        MemberTarget::Deferred(id) => {
                            let r = self
                                .by_id
                                .get(id)
                                .ok_or_else(|| Error::UnresolvedTarget(id.clone()))?;
                            MemberTarget::Resolved(*r)
                        }
                    };
                    Ok(Member {
                        name: m.name.clone(),
                        index: m.index,
                        target,
                    })
                })
                .collect::<Result<_>>()?;
            self.arena[i].members = resolved;
        }
        self.frozen = true;
        Ok(())
    }

    pub fn lookup(&self, id: &ShapeId) -> Option<SchemaRef> {
        self.by_id.get(id).copied()
    }

    pub fn kind(&self, shape: SchemaRef) -> ShapeKind {
        self.arena[shape.0 as usize].kind
    }

    pub fn id(&self, shape: SchemaRef) -> &ShapeId {
        &self.arena[shape.0 as usize].id
    }

    pub fn members(&self, shape: SchemaRef) -> &[Member] {
        &self.arena[shape.0 as usize].members
    }

    pub fn member_by_name(&self, shape: SchemaRef, name: &str) -> Option<&Member> {
        self.members(shape).iter().find(|m| m.name == name)
    }

    pub fn member_by_index(&self, shape: SchemaRef, index: MemberIndex) -> Option<&Member> {
        self.members(shape).get(index.0 as usize)
    }

    /// Resolve a member's target shape. Panics only if called before
    /// [`freeze`] on a member that was registered with a deferred target —
    /// callers are expected to freeze before dispatching traffic, per §4.1.
    pub fn member_target(&self, member: &Member) -> SchemaRef {
        match member.target {
            MemberTarget::Resolved(r) => r,
            MemberTarget::Deferred(ref id) => {
                panic!("member target '{id}' accessed before registry freeze")
            }
        }
    }

    /// O(1) trait presence check, keyed by a pre-interned [`TraitKey`].
    /// Per §4.1, a lookup against the wrong shape kind still returns
    /// `false`/`None` rather than erroring.
    pub fn has_trait(&self, shape: SchemaRef, key: TraitKey<impl std::any::Any>) -> bool {
        self.arena[shape.0 as usize].traits.has(key)
    }

    pub fn get_trait<T: Send + Sync + 'static>(
        &self,
        shape: SchemaRef,
        key: TraitKey<T>,
    ) -> Option<&T> {
        self.arena[shape.0 as usize].traits.get(key)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn member(name: &str, index: u32, target: MemberTarget) -> Member {
        Member {
            name: name.to_string(),
            index: MemberIndex(index),
            target,
        }
    }

    #[test]
    fn register_lookup_and_freeze_resolves_recursion() {
        let mut reg = Registry::new();

        // `Tree` has a member `children` whose target is `TreeList`, a list
        // of `Tree` — a recursive cycle through a deferred target.
        let tree_id = ShapeId::new("ex", "Tree");
        let list_id = ShapeId::new("ex", "TreeList");

        let tree = reg
            .register(
                tree_id.clone(),
                ShapeKind::Structure,
                vec![member(
                    "children",
                    0,
                    MemberTarget::Deferred(list_id.clone()),
                )],
                TraitMap::new(),
            )
            .unwrap();

        let _list = reg
            .register(
                list_id,
                ShapeKind::List,
                vec![member("member", 0, MemberTarget::Deferred(tree_id.clone()))],
                TraitMap::new(),
            )
            .unwrap();

        reg.freeze().unwrap();

        let members = reg.members(tree);
        assert_eq!(members.len(), 1);
        let target = reg.member_target(&members[0]);
        assert_eq!(reg.id(target).as_str(), "ex#TreeList");
    }

    #[test]
    fn duplicate_registration_with_diverging_shape_is_fatal() {
        let mut reg = Registry::new();
        let id = ShapeId::new("ex", "Widget");

        reg.register(id.clone(), ShapeKind::Structure, vec![], TraitMap::new())
            .unwrap();

        let err = reg
            .register(
                id,
                ShapeKind::Structure,
                vec![member("extra", 0, MemberTarget::Resolved(SchemaRef(0)))],
                TraitMap::new(),
            )
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateRegistration(_)));
    }

    #[test]
    fn unresolved_deferred_target_fails_freeze() {
        let mut reg = Registry::new();
        reg.register(
            ShapeId::new("ex", "Dangling"),
            ShapeKind::Structure,
            vec![member(
                "missing",
                0,
                MemberTarget::Deferred(ShapeId::new("ex", "Nowhere")),
            )],
            TraitMap::new(),
        )
        .unwrap();

        assert!(matches!(reg.freeze(), Err(Error::UnresolvedTarget(_))));
    }

    #[test]
    fn trait_lookup_is_scoped_per_shape() {
        let mut reg = Registry::new();
        let sensitive: TraitKey<bool> = reg.trait_interner().intern("sensitive");

        let mut traits = TraitMap::new();
        traits.insert(sensitive, true);

        let secret = reg
            .register(
                ShapeId::new("ex", "Secret"),
                ShapeKind::Scalar(crate::shape::Scalar::String),
                vec![],
                traits,
            )
            .unwrap();
        let plain = reg
            .register(
                ShapeId::new("ex", "Plain"),
                ShapeKind::Scalar(crate::shape::Scalar::String),
                vec![],
                TraitMap::new(),
            )
            .unwrap();

        assert!(reg.has_trait(secret, sensitive));
        assert!(!reg.has_trait(plain, sensitive));
    }
}
