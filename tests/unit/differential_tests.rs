//! Differential tests: the indexed wrapper must agree with the direct one
//! after identical edit sequences.
#[cfg(test)]
mod tests {
    use crate::fixtures::p;
    use jsoncompose::{ContentWrapper, DirectWrapper, IndexedWrapper, Pointer};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::{Value, json};

    enum Edit {
        Update(&'static str, Value),
        Delete(&'static str),
    }

    fn probes(content: &Value) -> Vec<Pointer> {
        let mut pointers = vec![Pointer::root()];
        collect(content, &Pointer::root(), &mut pointers);
        // Plus a few that never exist
        for raw in ["/zz", "/a/zz", "/list/99", "/list/-", "/list/01"] {
            pointers.push(p(raw));
        }
        pointers
    }

    fn collect(value: &Value, at: &Pointer, out: &mut Vec<Pointer>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let pointer = at.child(key.as_str());
                    out.push(pointer.clone());
                    collect(child, &pointer, out);
                }
            }
            Value::Array(items) => {
                for (idx, child) in items.iter().enumerate() {
                    let pointer = at.child(idx.to_string());
                    out.push(pointer.clone());
                    collect(child, &pointer, out);
                }
            }
            _ => {}
        }
    }

    fn assert_agree(direct: &DirectWrapper, indexed: &IndexedWrapper, step: &str) {
        assert_eq!(direct.content(), indexed.content(), "content after {step}");

        // Probe the union of both documents' nodes
        let mut pointers = probes(direct.content());
        pointers.extend(probes(indexed.content()));
        for pointer in &pointers {
            assert_eq!(
                direct.has(pointer),
                indexed.has(pointer),
                "has({pointer}) after {step}"
            );
            assert_eq!(
                direct.get(pointer).ok(),
                indexed.get(pointer).ok(),
                "get({pointer}) after {step}"
            );
        }

        let direct_leaves: Vec<_> = direct.iterate().collect();
        let indexed_leaves: Vec<_> = indexed.iterate().collect();
        assert_eq!(direct_leaves, indexed_leaves, "leaves after {step}");
    }

    fn apply(direct: &mut DirectWrapper, indexed: &mut IndexedWrapper, edit: &Edit) -> String {
        match edit {
            Edit::Update(raw, value) => {
                let a = direct.update(&p(raw), value.clone()).is_ok();
                let b = indexed.update(&p(raw), value.clone()).is_ok();
                assert_eq!(a, b, "update({raw}) outcome");
                format!("update {raw}")
            }
            Edit::Delete(raw) => {
                let a = direct.delete(&p(raw));
                let b = indexed.delete(&p(raw));
                assert_eq!(a, b, "delete({raw}) outcome");
                format!("delete {raw}")
            }
        }
    }

    #[test]
    fn scripted_sequence_agrees() {
        let start = json!({
            "a": {"b": 1, "c": [1, 2, 3]},
            "list": [{"x": 1}, {"x": 2}, {"x": 3}],
        });
        let mut direct = DirectWrapper::new(start.clone());
        let mut indexed = IndexedWrapper::new(start);

        let script = [
            Edit::Update("/a/b", json!({"nested": [true, false]})),
            Edit::Update("/a/b/nested/-", json!(null)),
            Edit::Delete("/list/0"),
            Edit::Update("/list/0/x", json!("two")),
            Edit::Update("/list/-", json!([[1], [2]])),
            Edit::Delete("/list/2/0"),
            Edit::Update("/a/c", json!("flat")),
            Edit::Update("/a/c/x", json!(1)),
            Edit::Update("/list/7", json!(1)),
            Edit::Delete("/a/zz"),
            Edit::Update("/new", json!({})),
            Edit::Update("/new/k", json!({"deeper": {"deepest": 0}})),
            Edit::Delete("/new/k/deeper"),
            Edit::Delete(""),
            Edit::Update("/fresh", json!([0])),
        ];

        assert_agree(&direct, &indexed, "start");
        for edit in &script {
            let step = apply(&mut direct, &mut indexed, edit);
            assert_agree(&direct, &indexed, &step);
        }
    }

    const KEYS: [&str; 3] = ["a", "b", "c"];

    fn random_pointer(rng: &mut StdRng, content: &Value) -> String {
        let mut all = Vec::new();
        collect(content, &Pointer::root(), &mut all);
        if all.is_empty() || rng.gen_bool(0.2) {
            return format!("/{}", KEYS[rng.gen_range(0..KEYS.len())]);
        }
        let base = all[rng.gen_range(0..all.len())].to_string();
        match rng.gen_range(0..4) {
            0 => format!("{base}/-"),
            1 => format!("{base}/{}", KEYS[rng.gen_range(0..KEYS.len())]),
            2 => format!("{base}/{}", rng.gen_range(0..3)),
            _ => base,
        }
    }

    fn random_value(rng: &mut StdRng) -> Value {
        match rng.gen_range(0..4) {
            0 => json!(rng.gen_range(0..100)),
            1 => json!({"a": [1, {"b": 2}], "c": "x"}),
            2 => json!([[0], {"a": null}]),
            _ => json!({}),
        }
    }

    #[test]
    fn random_sequences_agree() {
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let start = json!({"a": {"b": [1, 2]}, "c": [{"a": 1}]});
            let mut direct = DirectWrapper::new(start.clone());
            let mut indexed = IndexedWrapper::new(start);

            for step in 0..40 {
                let raw = random_pointer(&mut rng, direct.content());
                let pointer = p(&raw);
                let label = if rng.gen_bool(0.7) {
                    let value = random_value(&mut rng);
                    let a = direct.update(&pointer, value.clone()).is_ok();
                    let b = indexed.update(&pointer, value).is_ok();
                    assert_eq!(a, b, "seed {seed} step {step}: update({raw})");
                    format!("seed {seed} step {step}: update {raw}")
                } else {
                    let a = direct.delete(&pointer);
                    let b = indexed.delete(&pointer);
                    assert_eq!(a, b, "seed {seed} step {step}: delete({raw})");
                    format!("seed {seed} step {step}: delete {raw}")
                };
                assert_agree(&direct, &indexed, &label);
            }
        }
    }
}
