//! Property tests for store and query-index operations.
//!
//! Random sequences of spawn / despawn / attach / detach / write are applied
//! both to a [`World`] and to a trivial model; after every step the store
//! must agree with the model and queries must come back in index order.

use std::collections::BTreeMap;

use botfield_ecs::prelude::*;
use proptest::prelude::*;

botfield_ecs::data_component! {
    struct Pos("pos") { x: f32, y: f32 }
}

botfield_ecs::data_component! {
    struct Hp("hp") { value: i16 }
}

botfield_ecs::tag_component! {
    struct Flag("flag");
}

#[derive(Debug, Clone)]
enum EcsOp {
    Spawn,
    Despawn(usize),
    AttachPos(usize, f32, f32),
    DetachPos(usize),
    WriteHp(usize, i16),
    AttachHp(usize, i16),
    ToggleFlag(usize),
}

/// Finite values only, so model comparisons are plain equality.
fn finite_f32() -> impl Strategy<Value = f32> {
    (-1_000_000i32..1_000_000i32).prop_map(|v| v as f32 * 0.01)
}

fn ecs_op_strategy() -> impl Strategy<Value = EcsOp> {
    prop_oneof![
        3 => Just(EcsOp::Spawn),
        1 => (0..64usize).prop_map(EcsOp::Despawn),
        2 => (0..64usize, finite_f32(), finite_f32()).prop_map(|(i, x, y)| EcsOp::AttachPos(i, x, y)),
        1 => (0..64usize).prop_map(EcsOp::DetachPos),
        1 => (0..64usize, any::<i16>()).prop_map(|(i, v)| EcsOp::WriteHp(i, v)),
        1 => (0..64usize, any::<i16>()).prop_map(|(i, v)| EcsOp::AttachHp(i, v)),
        1 => (0..64usize).prop_map(EcsOp::ToggleFlag),
    ]
}

#[derive(Debug, Default, Clone)]
struct Model {
    pos: Option<(f32, f32)>,
    hp: Option<i16>,
    flag: bool,
}

fn pick(alive: &[EntityId], i: usize) -> Option<EntityId> {
    (!alive.is_empty()).then(|| alive[i % alive.len()])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn random_ops_match_model(ops in prop::collection::vec(ecs_op_strategy(), 1..60)) {
        let mut world = World::new();
        world.register_component::<Pos>();
        world.register_component::<Hp>();
        world.register_component::<Flag>();

        let mut alive: Vec<EntityId> = Vec::new();
        let mut dead: Vec<EntityId> = Vec::new();
        let mut model: BTreeMap<EntityId, Model> = BTreeMap::new();

        for op in ops {
            match op {
                EcsOp::Spawn => {
                    let e = world.spawn();
                    alive.push(e);
                    model.insert(e, Model::default());
                }
                EcsOp::Despawn(i) => {
                    if let Some(e) = pick(&alive, i) {
                        world.despawn(e).unwrap();
                        alive.retain(|&x| x != e);
                        model.remove(&e);
                        dead.push(e);
                    }
                }
                EcsOp::AttachPos(i, x, y) => {
                    if let Some(e) = pick(&alive, i) {
                        world.attach(e, Pos { x, y }).unwrap();
                        model.get_mut(&e).unwrap().pos = Some((x, y));
                    }
                }
                EcsOp::DetachPos(i) => {
                    if let Some(e) = pick(&alive, i) {
                        let old = world.detach::<Pos>(e).unwrap();
                        let expected = model.get_mut(&e).unwrap().pos.take();
                        prop_assert_eq!(old.map(|p| (p.x, p.y)), expected);
                    }
                }
                EcsOp::WriteHp(i, v) => {
                    if let Some(e) = pick(&alive, i) {
                        let result = world.write(e, Hp { value: v });
                        let slot = &mut model.get_mut(&e).unwrap().hp;
                        if slot.is_some() {
                            prop_assert!(result.is_ok());
                            *slot = Some(v);
                        } else {
                            let is_not_attached = matches!(result, Err(EcsError::NotAttached { .. }));
                            prop_assert!(is_not_attached);
                        }
                    }
                }
                EcsOp::AttachHp(i, v) => {
                    if let Some(e) = pick(&alive, i) {
                        world.attach(e, Hp { value: v }).unwrap();
                        model.get_mut(&e).unwrap().hp = Some(v);
                    }
                }
                EcsOp::ToggleFlag(i) => {
                    if let Some(e) = pick(&alive, i) {
                        let m = model.get_mut(&e).unwrap();
                        if m.flag {
                            world.detach::<Flag>(e).unwrap();
                        } else {
                            world.attach(e, Flag).unwrap();
                        }
                        m.flag = !m.flag;
                    }
                }
            }

            prop_assert_eq!(world.entity_count(), alive.len());
            for (&e, m) in &model {
                prop_assert_eq!(world.get::<Pos>(e).map(|p| (p.x, p.y)), m.pos);
                prop_assert_eq!(world.get::<Hp>(e).map(|h| h.value), m.hp);
                prop_assert_eq!(world.has::<Flag>(e), m.flag);
            }
            for &e in &dead {
                prop_assert!(!world.is_alive(e));
                prop_assert!(world.get::<Pos>(e).is_none());
            }

            let mut expected: Vec<EntityId> = model
                .iter()
                .filter(|(_, m)| m.pos.is_some() && m.flag)
                .map(|(&e, _)| e)
                .collect();
            expected.sort_by_key(|e| e.index());
            prop_assert_eq!(world.query::<(Pos, Flag)>(), expected);
        }
    }

    /// Generational IDs catch stale references immediately.
    #[test]
    fn stale_ids_never_resolve(count in 1usize..40) {
        let mut world = World::new();
        world.register_component::<Hp>();
        let first: Vec<EntityId> = (0..count).map(|_| world.spawn()).collect();
        for &e in &first {
            world.attach(e, Hp { value: 1 }).unwrap();
            world.despawn(e).unwrap();
        }
        let second: Vec<EntityId> = (0..count).map(|_| world.spawn()).collect();
        for (&old, &new) in first.iter().zip(&second) {
            prop_assert!(!world.is_alive(old));
            prop_assert!(world.is_alive(new));
            prop_assert_ne!(old, new);
            prop_assert!(world.get::<Hp>(new).is_none());
        }
    }

    /// `next_int_range` stays within `[min, max)` for any non-empty range.
    #[test]
    fn rng_int_range_in_bounds(seed in any::<u32>(), a in any::<i32>(), b in any::<i32>()) {
        let (min, max) = if a < b { (a, b) } else if a > b { (b, a) } else { return Ok(()); };
        let mut rng = DeterministicRng::new(seed);
        for _ in 0..16 {
            let v = rng.next_int_range(min, max);
            prop_assert!(v >= min && v < max);
        }
    }
}
