use richdoc::{
    Attrs, Fragment, Mark, MarkFilter, Node, ReplaceAroundStep, ReplaceStep, Schema, SchemaSpec,
    Slice, Step, StepError, Transform, TransformError, Wrapper,
};
use richdoc_testkit::{
    Tagged, a, a2, assert_transform, attrs, blockquote, br, code, doc, em, h1, h2, hr, img, img2,
    json, li, ol, p, pre, schema, strong, ul,
};

fn mark(name: &str) -> Mark {
    schema().mark(name, None).unwrap()
}

fn link(href: &str) -> Mark {
    schema().mark("link", Some(&attrs(json!({ "href": href })))).unwrap()
}

mod add_mark {
    use super::*;

    fn add(d: Tagged, mark: Mark, expect: Tagged) {
        let mut tr = Transform::new(d.node.clone());
        tr.add_mark(d.tag("a"), d.tag("b"), mark).unwrap();
        assert_transform(&tr, &d, &expect);
    }

    #[test]
    fn adds_a_mark() {
        add(
            doc!(p!("hello <a>there<b>!")),
            mark("strong"),
            doc!(p!("hello ", strong!("there"), "!")),
        );
    }

    #[test]
    fn adds_a_mark_only_once() {
        add(
            doc!(p!("hello ", strong!("<a>there"), "!<b>")),
            mark("strong"),
            doc!(p!("hello ", strong!("there!"))),
        );
    }

    #[test]
    fn joins_overlapping_marks() {
        add(
            doc!(p!("one <a>two ", em!("three<b> four"))),
            mark("strong"),
            doc!(p!("one ", strong!("two ", em!("three")), em!(" four"))),
        );
    }

    #[test]
    fn overwrites_marks_with_different_attributes() {
        add(
            doc!(p!("this is a ", a!("<a>link<b>"))),
            link("http://bar"),
            doc!(p!("this is a ", a2!("link"))),
        );
    }

    #[test]
    fn adds_a_mark_in_a_nested_node() {
        add(
            doc!(
                p!("before"),
                blockquote!(p!("the variable is called <a>i<b>")),
                p!("after")
            ),
            mark("code"),
            doc!(
                p!("before"),
                blockquote!(p!("the variable is called ", code!("i"))),
                p!("after")
            ),
        );
    }

    #[test]
    fn adds_a_mark_across_blocks() {
        add(
            doc!(
                p!("hi <a>this"),
                blockquote!(p!("is")),
                p!("a docu<b>ment"),
                p!("!")
            ),
            mark("em"),
            doc!(
                p!("hi ", em!("this")),
                blockquote!(p!(em!("is"))),
                p!(em!("a docu"), "ment"),
                p!("!")
            ),
        );
    }

    #[test]
    fn skips_parents_that_disallow_the_mark() {
        let d = doc!(p!("<a>one"), pre!("two<b>"));
        let mut tr = Transform::new(d.node.clone());
        tr.add_mark(d.tag("a"), d.tag("b"), mark("em")).unwrap();
        assert_transform(&tr, &d, &doc!(p!(em!("one")), pre!("two")));
    }
}

mod remove_mark {
    use super::*;

    fn rem(d: Tagged, filter: MarkFilter, expect: Tagged) {
        let mut tr = Transform::new(d.node.clone());
        tr.remove_mark(d.tag("a"), d.tag("b"), filter).unwrap();
        assert_transform(&tr, &d, &expect);
    }

    #[test]
    fn cuts_a_gap() {
        rem(
            doc!(p!(em!("hello <a>world<b>!"))),
            mark("em").into(),
            doc!(p!(em!("hello "), "world", em!("!"))),
        );
    }

    #[test]
    fn does_nothing_without_the_mark() {
        rem(
            doc!(p!(em!("hello"), " <a>world<b>!")),
            mark("em").into(),
            doc!(p!(em!("hello"), " <a>world<b>!")),
        );
    }

    #[test]
    fn removes_marks_from_nested_nodes() {
        rem(
            doc!(p!(em!("one ", strong!("<a>two<b>"), " three"))),
            mark("strong").into(),
            doc!(p!(em!("one two three"))),
        );
    }

    #[test]
    fn removes_a_link() {
        rem(
            doc!(p!("<a>hello ", a!("link<b>"))),
            link("http://foo").into(),
            doc!(p!("hello link")),
        );
    }

    #[test]
    fn keeps_a_non_matching_link() {
        let d = doc!(p!("<a>hello ", a!("link<b>")));
        let mut tr = Transform::new(d.node.clone());
        tr.remove_mark(d.tag("a"), d.tag("b"), link("http://bar"))
            .unwrap();
        assert!(!tr.doc_changed());
        assert_transform(&tr, &d, &doc!(p!("hello ", a!("link"))));
    }

    #[test]
    fn removes_by_type_regardless_of_attributes() {
        rem(
            doc!(p!("<a>x", a!("foo"), a2!("bar<b>"))),
            schema().mark_type("link").unwrap().into(),
            doc!(p!("xfoobar")),
        );
    }

    #[test]
    fn removes_across_blocks() {
        rem(
            doc!(
                blockquote!(p!(em!("much <a>em")), p!(em!("here too"))),
                p!("between", em!("...")),
                p!(em!("end<b>"))
            ),
            mark("em").into(),
            doc!(
                blockquote!(p!(em!("much "), "em"), p!("here too")),
                p!("between..."),
                p!("end")
            ),
        );
    }

    #[test]
    fn removes_everything() {
        rem(
            doc!(p!(
                "<a>hello, ",
                em!("this is ", strong!("much"), " ", a!("markup<b>"))
            )),
            MarkFilter::All,
            doc!(p!("<a>hello, this is much markup")),
        );
    }
}

mod insert {
    use super::*;

    fn ins(d: Tagged, content: impl Into<Fragment>, expect: Tagged) {
        let mut tr = Transform::new(d.node.clone());
        tr.insert(d.tag("a"), content).unwrap();
        assert_transform(&tr, &d, &expect);
    }

    fn paragraph() -> richdoc::Node {
        schema()
            .node("paragraph", None, Fragment::empty(), vec![])
            .unwrap()
    }

    #[test]
    fn inserts_a_break() {
        ins(
            doc!(p!("hello<a>there")),
            br(),
            doc!(p!("hello", br(), "<a>there")),
        );
    }

    #[test]
    fn inserts_an_empty_paragraph_at_the_top() {
        ins(
            doc!(p!("one"), "<a>", p!("two<2>")),
            paragraph(),
            doc!(p!("one"), p!(), "<a>", p!("two<2>")),
        );
    }

    #[test]
    fn inserts_two_block_nodes() {
        let hi = schema()
            .node("paragraph", None, schema().text("hi", vec![]).unwrap(), vec![])
            .unwrap();
        ins(
            doc!(p!("one"), "<a>", p!("two<2>")),
            vec![hi, hr()],
            doc!(p!("one"), p!("hi"), hr(), "<a>", p!("two<2>")),
        );
    }

    #[test]
    fn inserts_at_the_end_of_a_blockquote() {
        ins(
            doc!(blockquote!(p!("he<before>y"), "<a>"), p!("after<after>")),
            paragraph(),
            doc!(blockquote!(p!("he<before>y"), p!()), p!("after<after>")),
        );
    }

    #[test]
    fn inserts_at_the_start_of_a_blockquote() {
        ins(
            doc!(blockquote!("<a>", p!("he<1>y")), p!("after<2>")),
            paragraph(),
            doc!(blockquote!(p!(), "<a>", p!("he<1>y")), p!("after<2>")),
        );
    }
}

mod delete {
    use super::*;

    fn del(d: Tagged, expect: Tagged) {
        let mut tr = Transform::new(d.node.clone());
        tr.delete(d.tag("a"), d.tag("b")).unwrap();
        assert_transform(&tr, &d, &expect);
    }

    #[test]
    fn deletes_a_word() {
        del(
            doc!(p!("<1>one"), "<a>", p!("tw<2>o"), "<b>", p!("<3>three")),
            doc!(p!("<1>one"), "<a><2>", p!("<3>three")),
        );
    }

    #[test]
    fn preserves_content_constraints() {
        del(
            doc!(blockquote!("<a>", p!("hi"), "<b>"), p!("x")),
            doc!(blockquote!(p!()), p!("x")),
        );
    }

    #[test]
    fn preserves_positions_after_the_range() {
        del(
            doc!(blockquote!(p!("a"), "<a>", p!("b"), "<b>"), p!("c<1>")),
            doc!(blockquote!(p!("a")), p!("c<1>")),
        );
    }

    #[test]
    fn does_not_join_incompatible_nodes() {
        del(
            doc!(pre!("fo<a>o"), p!("b<b>ar", img())),
            doc!(pre!("fo"), p!("ar", img())),
        );
    }

    #[test]
    fn deleting_across_paragraphs_joins_them() {
        del(
            doc!(p!("ab<a>c"), p!("d<b>ef")),
            doc!(p!("ab<a><b>ef")),
        );
    }

    #[test]
    fn empty_range_is_a_no_op() {
        let d = doc!(p!("a<a><b>b"));
        let mut tr = Transform::new(d.node.clone());
        tr.delete(d.tag("a"), d.tag("b")).unwrap();
        assert!(tr.steps().is_empty());
    }
}

mod join {
    use super::*;

    fn join(d: Tagged, expect: Tagged) {
        let mut tr = Transform::new(d.node.clone());
        tr.join(d.tag("a"), 1).unwrap();
        assert_transform(&tr, &d, &expect);
    }

    #[test]
    fn joins_blocks() {
        join(
            doc!(
                blockquote!(p!("<before>a")),
                "<a>",
                blockquote!(p!("b")),
                p!("after<after>")
            ),
            doc!(
                blockquote!(p!("<before>a"), "<a>", p!("b")),
                p!("after<after>")
            ),
        );
    }

    #[test]
    fn joins_compatible_blocks() {
        join(doc!(h1!("foo"), "<a>", p!("bar")), doc!(h1!("foobar")));
    }

    #[test]
    fn joins_nested_blocks() {
        join(
            doc!(blockquote!(
                blockquote!(p!("a"), p!("b<before>")),
                "<a>",
                blockquote!(p!("c"), p!("d<after>"))
            )),
            doc!(blockquote!(blockquote!(
                p!("a"),
                p!("b<before>"),
                "<a>",
                p!("c"),
                p!("d<after>")
            ))),
        );
    }

    #[test]
    fn joins_lists() {
        join(
            doc!(ol!(li!(p!("one")), li!(p!("two"))), "<a>", ol!(li!(p!("three")))),
            doc!(ol!(li!(p!("one")), li!(p!("two")), "<a>", li!(p!("three")))),
        );
    }

    #[test]
    fn joins_list_items() {
        join(
            doc!(ol!(li!(p!("one")), li!(p!("two")), "<a>", li!(p!("three")))),
            doc!(ol!(li!(p!("one")), li!(p!("two"), "<a>", p!("three")))),
        );
    }

    #[test]
    fn joins_textblocks() {
        join(doc!(p!("foo"), "<a>", p!("bar")), doc!(p!("foo<a>bar")));
    }

    #[test]
    fn refuses_to_join_incompatible_blocks() {
        let d = doc!(blockquote!(p!("a")), "<a>", p!("b"));
        let mut tr = Transform::new(d.node.clone());
        assert!(tr.join(d.tag("a"), 1).is_err());
        assert!(tr.steps().is_empty());
        assert_eq!(tr.doc(), &d.node);
    }
}

mod split {
    use super::*;

    fn split(d: Tagged, expect: Tagged, depth: usize) {
        let mut tr = Transform::new(d.node.clone());
        tr.split(d.tag("a"), depth, None).unwrap();
        assert_transform(&tr, &d, &expect);
    }

    fn fails(d: Tagged) {
        let mut tr = Transform::new(d.node.clone());
        assert!(tr.split(d.tag("a"), 1, None).is_err());
        assert!(!tr.doc_changed());
    }

    #[test]
    fn splits_a_textblock() {
        split(doc!(p!("foo<a>bar")), doc!(p!("foo"), p!("<a>bar")), 1);
    }

    #[test]
    fn maps_positions() {
        split(
            doc!(p!("<1>a"), p!("<2>foo<a>bar<3>"), p!("<4>b")),
            doc!(p!("<1>a"), p!("<2>foo"), p!("<a>bar<3>"), p!("<4>b")),
            1,
        );
    }

    #[test]
    fn splits_two_deep() {
        split(
            doc!(blockquote!(blockquote!(p!("foo<a>bar"))), p!("after<1>")),
            doc!(
                blockquote!(blockquote!(p!("foo")), blockquote!(p!("<a>bar"))),
                p!("after<1>")
            ),
            2,
        );
    }

    #[test]
    fn splits_three_deep() {
        split(
            doc!(blockquote!(blockquote!(p!("foo<a>bar"))), p!("after<1>")),
            doc!(
                blockquote!(blockquote!(p!("foo"))),
                blockquote!(blockquote!(p!("<a>bar"))),
                p!("after<1>")
            ),
            3,
        );
    }

    #[test]
    fn splits_at_end() {
        split(
            doc!(blockquote!(p!("hi<a>"))),
            doc!(blockquote!(p!("hi"), p!("<a>"))),
            1,
        );
    }

    #[test]
    fn splits_at_start() {
        split(
            doc!(blockquote!(p!("<a>hi"))),
            doc!(blockquote!(p!(), p!("<a>hi"))),
            1,
        );
    }

    #[test]
    fn splits_inside_a_list_item() {
        split(
            doc!(ol!(
                li!(p!("one<1>")),
                li!(p!("two<a>three")),
                li!(p!("four<2>"))
            )),
            doc!(ol!(
                li!(p!("one<1>")),
                li!(p!("two"), p!("<a>three")),
                li!(p!("four<2>"))
            )),
            1,
        );
    }

    #[test]
    fn splits_a_list_item() {
        split(
            doc!(ol!(
                li!(p!("one<1>")),
                li!(p!("two<a>three")),
                li!(p!("four<2>"))
            )),
            doc!(ol!(
                li!(p!("one<1>")),
                li!(p!("two")),
                li!(p!("<a>three")),
                li!(p!("four<2>"))
            )),
            2,
        );
    }

    #[test]
    fn respects_the_type_param() {
        let d = doc!(h1!("hell<a>o!"));
        let paragraph = schema().node_type("paragraph").unwrap();
        let types = [Some(Wrapper::from(paragraph))];
        let mut tr = Transform::new(d.node.clone());
        tr.split(d.tag("a"), 1, Some(&types)).unwrap();
        assert_transform(&tr, &d, &doc!(h1!("hell"), p!("<a>o!")));
    }

    #[test]
    fn preserves_content_constraints_before() {
        fails(doc!(blockquote!("<a>", p!("x"))));
    }

    #[test]
    fn preserves_content_constraints_after() {
        fails(doc!(blockquote!(p!("x"), "<a>")));
    }
}

mod lift {
    use super::*;
    use richdoc::{block_range, lift_target};

    fn lift(d: Tagged, expect: Tagged) {
        let from = d.tag("a");
        let to = d.try_tag("b").unwrap_or(from);
        let range = block_range(&d.node, from, to).unwrap().unwrap();
        let target = lift_target(&range).unwrap();
        let mut tr = Transform::new(d.node.clone());
        tr.lift(&range, target).unwrap();
        assert_transform(&tr, &d, &expect);
    }

    #[test]
    fn lifts_a_block_out_of_the_middle_of_its_parent() {
        lift(
            doc!(blockquote!(p!("<before>one"), p!("<a>two"), p!("<after>three"))),
            doc!(
                blockquote!(p!("<before>one")),
                p!("<a>two"),
                blockquote!(p!("<after>three"))
            ),
        );
    }

    #[test]
    fn lifts_a_block_from_the_start_of_its_parent() {
        lift(
            doc!(blockquote!(p!("<a>two"), p!("<after>three"))),
            doc!(p!("<a>two"), blockquote!(p!("<after>three"))),
        );
    }

    #[test]
    fn lifts_a_block_from_the_end_of_its_parent() {
        lift(
            doc!(blockquote!(p!("<before>one"), p!("<a>two"))),
            doc!(blockquote!(p!("<before>one")), p!("<a>two")),
        );
    }

    #[test]
    fn lifts_a_single_child() {
        lift(
            doc!(blockquote!(p!("<a>t<in>wo"))),
            doc!(p!("<a>t<in>wo")),
        );
    }

    #[test]
    fn lifts_multiple_blocks() {
        lift(
            doc!(blockquote!(
                blockquote!(p!("on<a>e"), p!("tw<b>o")),
                p!("three")
            )),
            doc!(blockquote!(p!("on<a>e"), p!("tw<b>o"), p!("three"))),
        );
    }

    #[test]
    fn finds_a_valid_range_from_a_lopsided_selection() {
        lift(
            doc!(
                p!("start"),
                blockquote!(blockquote!(p!("a"), p!("<a>b")), p!("<b>c"))
            ),
            doc!(p!("start"), blockquote!(p!("a"), p!("<a>b")), p!("<b>c")),
        );
    }

    #[test]
    fn lifts_from_a_nested_node() {
        lift(
            doc!(blockquote!(blockquote!(
                p!("<1>one"),
                p!("<a>two"),
                p!("<3>three"),
                p!("<b>four"),
                p!("<5>five")
            ))),
            doc!(blockquote!(
                blockquote!(p!("<1>one")),
                p!("<a>two"),
                p!("<3>three"),
                p!("<b>four"),
                blockquote!(p!("<5>five"))
            )),
        );
    }

    #[test]
    fn lifts_from_a_list() {
        lift(
            doc!(ul!(li!(p!("one")), li!(p!("two<a>")), li!(p!("three")))),
            doc!(ul!(li!(p!("one"))), p!("two<a>"), ul!(li!(p!("three")))),
        );
    }

    #[test]
    fn lifts_from_the_end_of_a_list() {
        lift(
            doc!(ul!(li!(p!("a")), li!(p!("b<a>")), "<1>")),
            doc!(ul!(li!(p!("a"))), p!("b<a>"), "<1>"),
        );
    }
}

mod wrap {
    use super::*;
    use richdoc::{block_range, find_wrapping};

    fn wrap(d: Tagged, expect: Tagged, type_name: &str) {
        let from = d.tag("a");
        let to = d.try_tag("b").unwrap_or(from);
        let range = block_range(&d.node, from, to).unwrap().unwrap();
        let node_type = schema().node_type(type_name).unwrap();
        let wrappers = find_wrapping(&range, &node_type, None).unwrap();
        let mut tr = Transform::new(d.node.clone());
        tr.wrap(&range, &wrappers).unwrap();
        assert_transform(&tr, &d, &expect);
    }

    #[test]
    fn wraps_in_a_blockquote() {
        wrap(
            doc!(p!("one"), p!("<a>two"), p!("three")),
            doc!(p!("one"), blockquote!(p!("<a>two")), p!("three")),
            "blockquote",
        );
    }

    #[test]
    fn wraps_two_paragraphs() {
        wrap(
            doc!(p!("one<1>"), p!("<a>two"), p!("<b>three"), p!("four<4>")),
            doc!(
                p!("one<1>"),
                blockquote!(p!("<a>two"), p!("three")),
                p!("four<4>")
            ),
            "blockquote",
        );
    }

    #[test]
    fn wraps_in_a_list() {
        wrap(
            doc!(p!("<a>one"), p!("<b>two")),
            doc!(ol!(li!(p!("<a>one"), p!("<b>two")))),
            "ordered_list",
        );
    }

    #[test]
    fn wraps_in_a_nested_list() {
        wrap(
            doc!(ol!(
                li!(p!("<1>one")),
                li!(p!("..."), p!("<a>two"), p!("<b>three")),
                li!(p!("<4>four"))
            )),
            doc!(ol!(
                li!(p!("<1>one")),
                li!(p!("..."), ol!(li!(p!("<a>two"), p!("<b>three")))),
                li!(p!("<4>four"))
            )),
            "ordered_list",
        );
    }

    #[test]
    fn includes_half_covered_parent_nodes() {
        wrap(
            doc!(blockquote!(p!("<1>one"), p!("two<a>")), p!("three<b>")),
            doc!(blockquote!(
                blockquote!(p!("<1>one"), p!("two<a>")),
                p!("three<b>")
            )),
            "blockquote",
        );
    }

    #[test]
    fn rejects_a_wrapper_that_cannot_hold_the_next() {
        let d = doc!(p!("<a>one"));
        let range = block_range(&d.node, d.tag("a"), d.tag("a")).unwrap().unwrap();
        let list = schema().node_type("ordered_list").unwrap();
        let mut tr = Transform::new(d.node.clone());
        assert!(tr.wrap(&range, &[Wrapper::from(list)]).is_err());
        assert!(!tr.doc_changed());
    }
}

mod set_block_type {
    use super::*;

    fn set(d: Tagged, expect: Tagged, type_name: &str, attrs: Option<Attrs>) {
        let from = d.tag("a");
        let to = d.try_tag("b").unwrap_or(from);
        let node_type = schema().node_type(type_name).unwrap();
        let mut tr = Transform::new(d.node.clone());
        tr.set_block_type(from, to, &node_type, attrs.as_ref())
            .unwrap();
        assert_transform(&tr, &d, &expect);
    }

    #[test]
    fn changes_a_single_textblock() {
        set(
            doc!(p!("am<a> i")),
            doc!(h2!("am i")),
            "heading",
            Some(attrs(json!({"level": 2}))),
        );
    }

    #[test]
    fn changes_multiple_blocks() {
        set(
            doc!(h1!("<a>hello"), p!("there"), p!("<b>you"), p!("end")),
            doc!(pre!("hello"), pre!("there"), pre!("you"), p!("end")),
            "code_block",
            None,
        );
    }

    #[test]
    fn changes_a_wrapped_block() {
        set(
            doc!(blockquote!(p!("one<a>"), p!("two<b>"))),
            doc!(blockquote!(h1!("one<a>"), h1!("two<b>"))),
            "heading",
            Some(attrs(json!({"level": 1}))),
        );
    }

    #[test]
    fn clears_markup_when_necessary() {
        set(
            doc!(p!("hello<a> ", em!("world"))),
            doc!(pre!("hello world")),
            "code_block",
            None,
        );
    }

    #[test]
    fn only_clears_markup_when_needed() {
        set(
            doc!(p!("hello<a> ", em!("world"))),
            doc!(h1!("hello<a> ", em!("world"))),
            "heading",
            Some(attrs(json!({"level": 1}))),
        );
    }

    #[test]
    fn rejects_a_non_textblock_type() {
        let d = doc!(p!("a<a>b"));
        let quote = schema().node_type("blockquote").unwrap();
        let mut tr = Transform::new(d.node.clone());
        assert!(
            tr.set_block_type(d.tag("a"), d.tag("a"), &quote, None)
                .is_err()
        );
    }
}

mod set_node_type {
    use super::*;

    fn set(d: Tagged, expect: Tagged, type_name: &str, attrs: Attrs) {
        let node_type = schema().node_type(type_name).unwrap();
        let mut tr = Transform::new(d.node.clone());
        tr.set_node_type(d.tag("a"), Some(&node_type), Some(&attrs))
            .unwrap();
        assert_transform(&tr, &d, &expect);
    }

    #[test]
    fn changes_a_textblock() {
        set(
            doc!("<a>", p!("foo")),
            doc!(h1!("foo")),
            "heading",
            attrs(json!({"level": 1})),
        );
    }

    #[test]
    fn changes_an_inline_node() {
        set(
            doc!(p!("foo<a>", img(), "bar")),
            doc!(p!("foo", img2(), "bar")),
            "image",
            attrs(json!({"src": richdoc_testkit::DATA_IMAGE, "alt": "y"})),
        );
    }

    #[test]
    fn fails_without_a_node() {
        let d = doc!(p!("foo<a>"));
        let mut tr = Transform::new(d.node.clone());
        assert!(tr.set_node_type(d.tag("a"), None, None).is_err());
    }
}

mod replace {
    use super::*;

    fn repl(d: Tagged, source: Option<Tagged>, expect: Tagged) {
        let slice = source.map_or_else(Slice::empty, |s| s.slice_ab());
        let from = d.tag("a");
        let to = d.try_tag("b").unwrap_or(from);
        let mut tr = Transform::new(d.node.clone());
        tr.replace(from, to, slice).unwrap();
        assert_transform(&tr, &d, &expect);
    }

    #[test]
    fn deletes_text() {
        repl(doc!(p!("hell<a>o y<b>ou")), None, doc!(p!("hell<a><b>ou")));
    }

    #[test]
    fn joins_blocks() {
        repl(
            doc!(p!("hell<a>o"), p!("y<b>ou")),
            None,
            doc!(p!("hell<a><b>ou")),
        );
    }

    #[test]
    fn deletes_right_leaning_lopsided_regions() {
        repl(
            doc!(blockquote!(p!("ab<a>c")), "<b>", p!("def")),
            None,
            doc!(blockquote!(p!("ab<a>")), "<b>", p!("def")),
        );
    }

    #[test]
    fn deletes_left_leaning_lopsided_regions() {
        repl(
            doc!(p!("abc"), "<a>", blockquote!(p!("d<b>ef"))),
            None,
            doc!(p!("abc"), "<a>", blockquote!(p!("<b>ef"))),
        );
    }

    #[test]
    fn overwrites_text() {
        repl(
            doc!(p!("hell<a>o y<b>ou")),
            Some(doc!(p!("<a>i k<b>"))),
            doc!(p!("hell<a>i k<b>ou")),
        );
    }

    #[test]
    fn inserts_text() {
        repl(
            doc!(p!("hell<a><b>o")),
            Some(doc!(p!("<a>i k<b>"))),
            doc!(p!("helli k<a><b>o")),
        );
    }

    #[test]
    fn adds_a_textblock() {
        repl(
            doc!(p!("hello<a>you")),
            Some(doc!("<a>", p!("there"), "<b>")),
            doc!(p!("hello"), p!("there"), p!("<a>you")),
        );
    }

    #[test]
    fn inserts_while_joining_textblocks() {
        repl(
            doc!(h1!("he<a>llo"), p!("arg<b>!")),
            Some(doc!(p!("1<a>2<b>3"))),
            doc!(h1!("he2!")),
        );
    }

    #[test]
    fn matches_open_list_items() {
        repl(
            doc!(ol!(li!(p!("one<a>")), li!(p!("three")))),
            Some(doc!(ol!(li!(p!("<a>half")), li!(p!("two")), "<b>"))),
            doc!(ol!(
                li!(p!("onehalf")),
                li!(p!("two")),
                li!(p!()),
                li!(p!("three"))
            )),
        );
    }

    #[test]
    fn merges_blocks_across_deleted_content() {
        repl(
            doc!(p!("a<a>"), p!("b"), p!("<b>c")),
            None,
            doc!(p!("a<a><b>c")),
        );
    }

    #[test]
    fn merges_text_down_from_nested_nodes() {
        repl(
            doc!(h1!("wo<a>ah"), blockquote!(p!("ah<b>ha"))),
            None,
            doc!(h1!("wo<a><b>ha")),
        );
    }

    #[test]
    fn merges_text_up_into_nested_nodes() {
        repl(
            doc!(
                blockquote!(p!("foo<a>bar")),
                p!("middle"),
                h1!("quux<b>baz")
            ),
            None,
            doc!(blockquote!(p!("foo<a><b>baz"))),
        );
    }

    #[test]
    fn joins_multiple_levels_when_possible() {
        repl(
            doc!(blockquote!(ul!(
                li!(p!("a")),
                li!(p!("b<a>")),
                li!(p!("c")),
                li!(p!("<b>d")),
                li!(p!("e"))
            ))),
            None,
            doc!(blockquote!(ul!(
                li!(p!("a")),
                li!(p!("b<a><b>d")),
                li!(p!("e"))
            ))),
        );
    }

    #[test]
    fn replaces_a_piece_of_text() {
        repl(
            doc!(p!("he<before>llo<a> w<after>orld")),
            Some(doc!(p!("<a> big<b>"))),
            doc!(p!("he<before>llo big w<after>orld")),
        );
    }

    #[test]
    fn respects_open_empty_nodes_at_the_edges() {
        repl(
            doc!(p!("one<a>two")),
            Some(doc!(p!("a<a>"), p!("hello"), p!("<b>b"))),
            doc!(p!("one"), p!("hello"), p!("<a>two")),
        );
    }

    #[test]
    fn completely_overwrites_a_paragraph() {
        repl(
            doc!(p!("one<a>"), p!("t<inside>wo"), p!("<b>three<end>")),
            Some(doc!(p!("a<a>"), p!("TWO"), p!("<b>b"))),
            doc!(p!("one<a>"), p!("TWO"), p!("<inside>three<end>")),
        );
    }

    #[test]
    fn joins_marks() {
        repl(
            doc!(p!("foo ", em!("bar<a>baz"), "<b> quux")),
            Some(doc!(p!("foo ", em!("xy<a>zzy"), " foo<b>"))),
            doc!(p!("foo ", em!("barzzy"), " foo quux")),
        );
    }

    #[test]
    fn replaces_text_with_a_break() {
        repl(
            doc!(p!("foo<a>b<inside>b<b>bar")),
            Some(doc!(p!("<a>", br(), "<b>"))),
            doc!(p!("foo", br(), "<inside>bar")),
        );
    }

    #[test]
    fn joins_different_blocks() {
        repl(
            doc!(h1!("hell<a>o"), p!("by<b>e")),
            None,
            doc!(h1!("helle")),
        );
    }

    #[test]
    fn restores_a_list_parent() {
        repl(
            doc!(h1!("hell<a>o"), "<b>"),
            Some(doc!(ol!(li!(p!("on<a>e")), li!(p!("tw<b>o"))))),
            doc!(h1!("helle"), ol!(li!(p!("tw")))),
        );
    }

    #[test]
    fn restores_a_list_parent_and_joins_text_after_it() {
        repl(
            doc!(h1!("hell<a>o"), p!("yo<b>u")),
            Some(doc!(ol!(li!(p!("on<a>e")), li!(p!("tw<b>o"))))),
            doc!(h1!("helle"), ol!(li!(p!("twu")))),
        );
    }

    #[test]
    fn inserts_into_an_empty_block() {
        repl(
            doc!(p!("a"), p!("<a>"), p!("b")),
            Some(doc!(p!("x<a>y<b>z"))),
            doc!(p!("a"), p!("y<a>"), p!("b")),
        );
    }

    #[test]
    fn keeps_the_nesting_of_blocks_after_the_selection() {
        repl(
            doc!(p!("one<a>"), p!("two"), p!("three")),
            Some(doc!(p!("outside<a>"), blockquote!(p!("inside<b>")))),
            doc!(p!("one"), blockquote!(p!("inside")), p!("two"), p!("three")),
        );
    }

    #[test]
    fn closes_a_parent_node() {
        repl(
            doc!(blockquote!(p!("b<a>c"), p!("d<b>e"), p!("f"))),
            Some(doc!(blockquote!(p!("x<a>y")), p!("after"), "<b>")),
            doc!(
                blockquote!(p!("b<a>y")),
                p!("after"),
                blockquote!(p!("<b>e"), p!("f"))
            ),
        );
    }

    #[test]
    fn accepts_lopsided_regions() {
        repl(
            doc!(blockquote!(p!("b<a>c"), p!("d<b>e"), p!("f"))),
            Some(doc!(blockquote!(p!("x<a>y")), p!("z<b>"))),
            doc!(
                blockquote!(p!("b<a>y")),
                p!("z<b>e"),
                blockquote!(p!("f"))
            ),
        );
    }

    #[test]
    fn closes_nested_parent_nodes() {
        repl(
            doc!(blockquote!(blockquote!(
                p!("one"),
                p!("tw<a>o"),
                p!("t<b>hree<3>"),
                p!("four<4>")
            ))),
            Some(doc!(
                ol!(li!(p!("hello<a>world")), li!(p!("bye"))),
                p!("ne<b>xt")
            )),
            doc!(blockquote!(
                blockquote!(p!("one"), p!("tw<a>world")),
                ol!(li!(p!("bye"))),
                p!("ne<b>hree<3>"),
                blockquote!(p!("four<4>"))
            )),
        );
    }

    #[test]
    fn closes_open_nodes_to_the_right() {
        repl(
            doc!(p!("x"), "<a>"),
            Some(doc!("<a>", ul!(li!(p!("a")), li!("<b>", p!("b"))))),
            doc!(p!("x"), ul!(li!(p!("a")), li!(p!())), "<a>"),
        );
    }

    #[test]
    fn deletes_the_whole_document() {
        repl(
            doc!("<a>", h1!("hi"), p!("you"), "<b>"),
            None,
            doc!(p!()),
        );
    }

    #[test]
    fn preserves_an_empty_parent_to_the_left() {
        repl(
            doc!(blockquote!("<a>", p!("hi")), p!("b<b>x")),
            Some(doc!(p!("<a>hi<b>"))),
            doc!(blockquote!(p!("hix"))),
        );
    }

    #[test]
    fn preserves_an_empty_parent_to_the_right() {
        repl(
            doc!(p!("x<a>hi"), blockquote!(p!("yy"), "<b>"), p!("c")),
            Some(doc!(p!("<a>hi<b>"))),
            doc!(p!("xhi"), blockquote!(p!()), p!("c")),
        );
    }

    #[test]
    fn drops_an_empty_node_at_the_start_of_the_slice() {
        repl(
            doc!(p!("<a>x")),
            Some(doc!(blockquote!(p!("hi"), "<a>"), p!("b<b>"))),
            doc!(p!(), p!("bx")),
        );
    }

    #[test]
    fn drops_an_empty_node_at_the_end_of_the_slice() {
        repl(
            doc!(p!("<a>x")),
            Some(doc!(p!("b<a>"), blockquote!("<b>", p!("hi")))),
            doc!(p!(), blockquote!(p!()), p!("x")),
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let d = doc!(p!("a<b>bc<a>d"));
        let mut tr = Transform::new(d.node.clone());
        assert!(tr.replace(d.tag("a"), d.tag("b"), Slice::empty()).is_err());
        assert!(!tr.doc_changed());
    }
}

mod rejected_steps {
    use super::*;

    #[test]
    fn steps_with_positions_out_of_order_are_refused() {
        let d = doc!(p!("hello"));
        let mut tr = Transform::new(d.node.clone());

        let backwards = Step::Replace(ReplaceStep::new(4, 2, Slice::empty(), false));
        let err = tr.step(backwards).unwrap_err();
        assert!(matches!(err, TransformError::Step(StepError::InvalidRange)));

        let gap_outside = Step::ReplaceAround(ReplaceAroundStep::new(
            3,
            5,
            1,
            5,
            Slice::empty(),
            0,
            false,
        ));
        let err = tr.step(gap_outside).unwrap_err();
        assert!(matches!(err, TransformError::Step(StepError::InvalidRange)));

        assert!(tr.steps().is_empty());
        assert_eq!(tr.doc(), &d.node);
    }

    fn strict_schema() -> Schema {
        let spec: SchemaSpec = serde_json::from_value(json!({
            "nodes": [
                {"name": "doc", "content": "para+"},
                {"name": "para", "content": "text* stop"},
                {"name": "plain", "content": "text*", "marks": ""},
                {"name": "stop", "inline": true},
                {"name": "text"}
            ],
            "marks": [{"name": "em"}]
        }))
        .unwrap();
        Schema::new(spec).unwrap()
    }

    #[test]
    fn failing_inner_step_rolls_back_earlier_ones() {
        let schema = strict_schema();
        let doc = Node::from_json(
            &schema,
            &json!({"type": "doc", "content": [{"type": "para", "content": [
                {"type": "text", "text": "a", "marks": [{"type": "em"}]},
                {"type": "stop"}
            ]}]}),
        )
        .unwrap();
        assert!(doc.check().is_ok());
        let plain = schema.node_type("plain").unwrap();

        let mut tr = Transform::new(doc.clone());
        // Dropping the em mark applies; deleting the stop node leaves the
        // paragraph invalid and fails.
        let err = tr.clear_incompatible(0, &plain, None).unwrap_err();
        assert!(matches!(err, TransformError::Step(_)));

        assert!(tr.steps().is_empty());
        assert!(tr.docs().is_empty());
        assert_eq!(tr.mapping().len(), 0);
        assert_eq!(tr.doc(), &doc);
        assert!(!tr.doc_changed());
    }
}

mod inverses {
    use super::*;

    #[test]
    fn moved_inline_content_inverts_at_a_textblock_end() {
        let d = doc!(p!("one<a>"), p!("two"), p!("three"));
        let source = doc!(p!("outside<a>"), blockquote!(p!("inside<b>")));
        let mut tr = Transform::new(d.node.clone());
        tr.replace(d.tag("a"), d.tag("a"), source.slice_ab()).unwrap();

        assert_eq!(tr.steps().len(), 1);
        let step = &tr.steps()[0];
        assert!(matches!(step, Step::ReplaceAround(_)));
        let inverse = step.invert(&tr.docs()[0]).unwrap();
        assert_eq!(inverse.apply(tr.doc()).unwrap(), d.node);
    }
}
