//! Statement round-trip tests — `Display` output parses back to the same statements.

use wavescript::dsl::{ImportEntry, ImportStmt, LoopAction, LoopStmt, Param, SetStmt, Script, Stmt, TempoStmt, Value};

fn reparse(stmt: &Stmt) -> Stmt {
    let text = stmt.to_string();
    let parsed = Script::parse(&text);
    assert!(parsed.diagnostics.is_empty(), "{text}: {:?}", parsed.diagnostics);
    assert_eq!(parsed.statements.len(), 1, "{text}");
    parsed.statements.into_iter().next().unwrap()
}

fn param(name: &str, value: Value) -> Param {
    Param {
        name: name.into(),
        value,
        line: 1,
    }
}

fn action(name: &str, value: Value) -> LoopAction {
    LoopAction {
        name: name.into(),
        value,
        line: 1,
    }
}

#[test]
fn set_keeps_parameter_order() {
    let stmt = Stmt::Set(SetStmt {
        alias: "k".into(),
        params: vec![
            param("pitch", Value::Number("1.5".into())),
            param("volume", Value::Number("0.25".into())),
            param("sample", Value::Str("hat".into())),
            param("pattern", Value::Str("x..x".into())),
        ],
        line: 1,
    });
    assert_eq!(reparse(&stmt), stmt);
}

#[test]
fn loop_keeps_action_order() {
    let stmt = Stmt::Loop(LoopStmt {
        actions: vec![
            action("play", Value::Ident("k".into())),
            action("wait", Value::Str("1/2".into())),
            action("play", Value::Ident("s".into())),
            action("wait", Value::Number("3/4".into())),
            action("wait", Value::Number("1".into())),
            action("play", Value::Str("".into())),
        ],
        line: 1,
    });
    assert_eq!(reparse(&stmt), stmt);
}

#[test]
fn import_with_awkward_names() {
    let stmt = Stmt::Import(ImportStmt {
        entries: vec![
            ImportEntry {
                module: "hat-open".into(),
                alias: "ho".into(),
                line: 1,
            },
            ImportEntry {
                module: "kick".into(),
                alias: "play".into(),
                line: 1,
            },
        ],
        line: 1,
    });
    assert_eq!(reparse(&stmt), stmt);
}

#[test]
fn whole_script_reserializes_in_order() {
    let src = "imp { kick as k }\nset k { volume 0.8; }\ncpm 128;\nplay k;\nloop { play k; wait 1/2; }";
    let first = Script::parse(src).statements;
    let text: Vec<String> = first.iter().map(ToString::to_string).collect();
    let second = Script::parse(&text.join("\n")).statements;

    assert_eq!(second, first);
    assert!(matches!(second[2], Stmt::Tempo(TempoStmt { beats_per_minute: 128, .. })));
}
