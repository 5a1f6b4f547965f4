#![no_main]

use libfuzzer_sys::fuzz_target;
use richdoc::{Node, Schema, SchemaSpec, Slice, Transform};

fn seed_doc(schema: &Schema) -> Option<Node> {
    let para = |text: &str| -> Option<Node> {
        let text = schema.text(text, vec![]).ok()?;
        schema.node("paragraph", None, text, vec![]).ok()
    };
    let quote = schema
        .node("blockquote", None, vec![para("quoted")?, para("twice")?], vec![])
        .ok()?;
    let item = schema.node("list_item", None, para("item")?, vec![]).ok()?;
    let list = schema.node("bullet_list", None, vec![item.clone(), item], vec![]).ok()?;
    schema
        .node("doc", None, vec![para("hello")?, quote, list, para("end")?], vec![])
        .ok()
}

fuzz_target!(|data: &[u8]| {
    let Ok(schema) = Schema::new(SchemaSpec::basic()) else {
        return;
    };
    let Some(doc) = seed_doc(&schema) else {
        return;
    };
    let mut tr = Transform::new(doc);
    for chunk in data.chunks(4) {
        if chunk.len() < 4 {
            break;
        }
        let size = tr.doc().content_size();
        let pos = |byte: u8| usize::from(byte) % (size + 1);
        let (a, b) = (pos(chunk[0]), pos(chunk[1]));
        let (from, to) = (a.min(b), a.max(b));
        let (c, d) = (pos(chunk[2]), pos(chunk[3]));
        let slice = if c == d {
            Slice::empty()
        } else {
            match tr.doc().slice(c.min(d), c.max(d), false) {
                Ok(slice) => slice,
                Err(_) => continue,
            }
        };
        let before = tr.doc().clone();
        if tr.replace(from, to, slice).is_err() {
            assert_eq!(tr.doc(), &before);
            continue;
        }
        assert!(tr.doc().check().is_ok(), "invalid document {}", tr.doc());
    }
    for (step, doc) in tr.steps().iter().zip(tr.docs()) {
        let inverse = step.invert(doc).expect("invertible step");
        let after = step.apply(doc).expect("step reapplies");
        assert_eq!(&inverse.apply(&after).expect("inverse applies"), doc);
    }
});
