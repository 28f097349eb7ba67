//! End-to-end expansion tests against the public API: whole page fragments in,
//! expanded text (or one fatal error) out.

use girafscript::script::{
    Context, Delimiters, Engine, ErrorKind, Limits, Registry, ScriptError, Value,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn message(subject: &str, poster: &str, body: &str) -> Value {
    let poster: Value = [("name", poster)].into_iter().collect();
    [
        ("subject", Value::from(subject)),
        ("poster", poster),
        ("body", Value::from(body)),
    ]
    .into_iter()
    .collect()
}

fn inbox() -> Context {
    Context::new()
        .with(
            "messages",
            vec![
                message("Field trip", "Ms. Holm", "Bring <lunch> & boots"),
                message("Parents' evening", "Mr. Berg", "Thursday 18:00"),
            ],
        )
        .with("user", [("name", "Ida"), ("role", "parent")].into_iter().collect::<Value>())
}

fn expand(src: &str, ctx: &mut Context) -> String {
    Engine::new()
        .process(src, ctx)
        .unwrap_or_else(|e| panic!("expansion of {src:?} failed: {e}"))
}

fn fail(src: &str, ctx: &mut Context) -> ScriptError {
    match Engine::new().process(src, ctx) {
        Ok(out) => panic!("expansion of {src:?} unexpectedly produced {out:?}"),
        Err(e) => e,
    }
}

// ── Page fragments ────────────────────────────────────────────────────────────

#[test]
fn message_list_fragment() {
    let src = "\
<h1>Hi {{var user.name}}</h1>
<ul>{{loop messages as=m index=i}}
<li id=\"m{{var i}}\">{{var m.subject}} ({{var m.poster.name}}): {{var m.body}}</li>{{/loop}}
</ul>";
    let want = "\
<h1>Hi Ida</h1>
<ul>
<li id=\"m0\">Field trip (Ms. Holm): Bring &lt;lunch&gt; &amp; boots</li>
<li id=\"m1\">Parents&#x27; evening (Mr. Berg): Thursday 18:00</li>
</ul>";
    assert_eq!(expand(src, &mut inbox()), want);
}

#[test]
fn conditional_by_role() {
    let src = "{{if user.role=teacher}}<a>New message</a>{{else}}read-only{{/if}}";
    assert_eq!(expand(src, &mut inbox()), "read-only");
}

#[test]
fn empty_inbox_message() {
    let mut ctx = Context::new().with("messages", Value::List(Vec::new()));
    let src = "{{unless messages}}No messages.{{else}}{{loop messages}}x{{/loop}}{{/unless}}";
    assert_eq!(expand(src, &mut ctx), "No messages.");
}

#[test]
fn comments_and_set() {
    let src = "{{comment}}draft {{var nothing}}{{/comment}}{{set sep=\" / \" /}}a{{var sep escape=none}}b";
    assert_eq!(expand(src, &mut Context::new()), "a / b");
}

// ── Laws ──────────────────────────────────────────────────────────────────────

#[test]
fn identity_law() {
    let mut ctx = inbox();
    let src = "No markers here: { } }} <b>bold</b> \\ \"quoted\"";
    assert_eq!(expand(src, &mut ctx), src);
}

#[test]
fn single_marker_replaces_only_its_span() {
    let mut ctx = Context::new().with("n", 42i64);
    assert_eq!(expand("left {{var n /}} right", &mut ctx), "left 42 right");
}

#[test]
fn outer_body_keeps_inner_pair_intact() {
    let mut ctx = Context::new()
        .with("a", vec!["1", "2"])
        .with("b", vec!["x"]);
    let src = "{{loop a as=i}}[{{loop b as=j}}{{var i}}{{var j}}{{/loop}}]{{/loop}}";
    assert_eq!(expand(src, &mut ctx), "[1x][2x]");
}

#[test]
fn case_insensitive_names() {
    let mut ctx = Context::new().with("rows", vec!["a"]);
    assert_eq!(expand("{{LOOP rows}}{{Var item}}{{/loop}}", &mut ctx), "a");
    assert_eq!(expand("{{loop rows AS=r}}{{var r}}{{/loop}}", &mut ctx), "a");
}

#[test]
fn commented_out_else_branch() {
    let mut ctx = Context::new().with("a", true);
    let src = "{{if a}}x{{comment}}{{else}}{{/comment}}y{{/if}}";
    assert_eq!(expand(src, &mut ctx), "xy");
}

#[test]
fn loop_bindings_do_not_leak() {
    let mut ctx = inbox();
    expand("{{loop messages as=m}}{{set seen=yes /}}{{/loop}}", &mut ctx);
    assert!(ctx.get_var("m").is_none());
    assert!(ctx.get_var("seen").is_none());
    assert_eq!(ctx.depth(), 0);
}

// ── Failures ──────────────────────────────────────────────────────────────────

#[test]
fn unclosed_start_tag_is_unmatched() {
    let err = fail("{{loop messages}}<li>", &mut inbox());
    assert_eq!(err.kind(), ErrorKind::UnmatchedEndMarker);
}

#[test]
fn unknown_command_fails_whole_call() {
    let mut ctx = Context::new().with("x", "1");
    let before = ctx.clone();
    let err = fail("text {{blink x}} then {{var x}}", &mut ctx);
    assert_eq!(
        err,
        ScriptError::UnknownCommand {
            name: "blink".into(),
            offset: 5
        }
    );
    assert_eq!(ctx.len(), before.len());
}

#[test]
fn unknown_command_in_untaken_branch() {
    let mut ctx = Context::new().with("off", false);
    let err = fail("{{if off}}{{blink}}{{/if}}", &mut ctx);
    assert_eq!(err.kind(), ErrorKind::UnknownCommand);
}

#[test]
fn unterminated_marker() {
    let err = fail("ok {{var x", &mut Context::new());
    assert_eq!(err, ScriptError::UnterminatedMarker { offset: 3 });
}

#[test]
fn malformed_parameter() {
    let err = fail(r#"{{var x default="oops}}"#, &mut Context::new());
    assert_eq!(err.kind(), ErrorKind::MalformedParameter);
}

#[test]
fn self_reproducing_output_is_bounded() {
    let mut ctx = Context::new().with("x", "{{var x escape=none}}");
    let err = fail("{{var x escape=none}}", &mut ctx);
    assert_eq!(err.kind(), ErrorKind::ExpansionLimitExceeded);
}

#[test]
fn nested_self_reference_is_bounded() {
    let mut ctx = Context::new()
        .with("rows", vec![1i64])
        .with("tpl", "{{loop rows}}{{var tpl escape=none}}{{/loop}}");
    let err = fail("{{var tpl escape=none}}", &mut ctx);
    assert_eq!(err.kind(), ErrorKind::ExpansionLimitExceeded);
}

// ── Engine settings ───────────────────────────────────────────────────────────

#[test]
fn alternative_delimiters() {
    let engine = Engine::new().with_delimiters(Delimiters::new("<!--", "-->").unwrap());
    let mut ctx = Context::new().with("on", true);
    let out = engine
        .process("{{raw}}<!--if on-->shown<!--/if-->", &mut ctx)
        .unwrap();
    assert_eq!(out, "{{raw}}shown");
}

#[test]
fn escaped_delimiter_inside_quotes() {
    let mut ctx = Context::new();
    let out = expand(r#"{{var missing default="a \}} b"}}"#, &mut ctx);
    assert_eq!(out, "a }} b");
}

#[test]
fn disabled_command_is_unknown() {
    let mut registry = Registry::new();
    registry.disable("set");
    let engine = Engine::new().with_registry(registry);
    let err = engine.process("{{set a=1 /}}", &mut Context::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownCommand);
}

#[test]
fn tight_budget() {
    let engine = Engine::new().with_limits(Limits {
        max_expansions: 5,
        max_depth: 4,
    });
    let mut ctx = Context::new().with("rows", vec!["a", "b", "c"]);
    // loop (1) + three iterations (3) + nothing else
    assert_eq!(engine.process("{{loop rows}}.{{/loop}}", &mut ctx).unwrap(), "...");
    // loop (1) + three iterations (3) + three var calls (3)
    let err = engine
        .process("{{loop rows}}{{var item}}{{/loop}}", &mut ctx)
        .unwrap_err();
    assert_eq!(err, ScriptError::ExpansionLimitExceeded { limit: 5 });
}
