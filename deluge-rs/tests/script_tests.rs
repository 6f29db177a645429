/// End-to-end tests: Deluge source goes through the translator and the host
/// executor, and the returned value is compared by its display form.
///
/// Each case is a `(script, expected)` pair checked with a strict runtime,
/// so a line the translator drops fails the test instead of being skipped.
/// The `scripts/` fixtures carry their expectation on the first line as
/// `// expect: <value>`.

use std::path::Path;

use deluge::runtime::{Map, Value};
use deluge::{run_script, translate, Config, RuntimeError, Runtime};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn strict() -> Runtime {
    Runtime::new(Config {
        strict: true,
        ..Config::default()
    })
}

/// Run `script` and compare the display form of its value with `expected`.
fn check(script: &str, expected: &str) {
    match strict().execute(script) {
        Ok(v) => assert_eq!(v.to_string(), expected, "\nScript:\n{script}"),
        Err(e) => panic!("\nScript:\n{script}\nfailed: {e}"),
    }
}

fn run_err(script: &str) -> RuntimeError {
    match strict().execute(script) {
        Ok(v) => panic!("\nScript:\n{script}\nexpected an error, got {v}"),
        Err(e) => e,
    }
}

// ── Language ──────────────────────────────────────────────────────────────────

#[test]
fn single_line_statements() {
    check("a = 1; b = 2; return a + b;", "3");
}

#[test]
fn null_comparison_translates_to_identity() {
    let t = translate("if(a == NULL){ return 1; } else { return 2; }");
    assert!(t.is_complete(), "{:?}", t.diagnostics);
    assert_eq!(t.code, "if a is None:\n    return 1\nelse:\n    return 2");

    let mut ctx = Map::new();
    ctx.put("a", Value::Null);
    let rt = Runtime::default().with_context(ctx);
    assert_eq!(rt.execute("if(a == NULL){ return 1; } else { return 2; }").unwrap(), Value::Int(1));
}

#[test]
fn else_if_chain() {
    check(
        "n = 7;\nif (n > 10)\n{\n    r = \"big\";\n}\nelse if (n > 5)\n{\n    r = \"mid\";\n}\nelse\n{\n    r = \"small\";\n}\nreturn r;",
        "mid",
    );
}

#[test]
fn logical_operators_both_spellings() {
    check("a = true; b = false; return a && !b;", "true");
    check("a = true; b = false; return a and not b;", "true");
    check("x = 3; return x > 5 || x < 4;", "true");
}

#[test]
fn block_comments_are_dropped() {
    check("/* setup\n   more */\nx = 2; // trailing\nreturn x * 21;", "42");
}

// ── Collections ───────────────────────────────────────────────────────────────

#[test]
fn map_keeps_insertion_order_and_replaces_in_place() {
    check(
        "m = Map();\nm.put(\"b\", 1);\nm.put(\"a\", 2);\nm.put(\"b\", 3);\nreturn m.keys();",
        r#"["b","a"]"#,
    );
    check(
        "m = Map();\nm.put(\"b\", 1);\nm.put(\"a\", 2);\nm.put(\"b\", 3);\nreturn m;",
        r#"{"b":3,"a":2}"#,
    );
}

#[test]
fn maps_are_shared_handles() {
    check(
        "m = Map();\nalias = m;\nalias.put(\"k\", \"v\");\nreturn m.get(\"k\");",
        "v",
    );
}

#[test]
fn list_get_out_of_range_is_null() {
    check("l = List();\nl.add(1);\nreturn l.get(10);", "null");
    check("l = List();\nreturn l.get(-1);", "null");
}

#[test]
fn list_methods_accept_their_own_receiver() {
    check("l = List();\nl.add(1);\nl.addAll(l);\nreturn l;", "[1,1]");
    check("l = List();\nl.add(List());\nreturn l.removeElement(l);", "false");
    check("l = List();\nl.add(List());\nl.removeElement(l);\nreturn l.size();", "1");
    check("l = List();\nl.add(List());\nreturn l.contains(l);", "false");
    check("l = {1, 2};\nreturn l.intersect(l);", "[1,2]");
}

#[test]
fn self_containing_containers_display_a_marker() {
    check("m = Map();\nm.put(\"self\", m);\nreturn m;", r#"{"self":"<cycle>"}"#);
    check("l = List();\nl.add(l);\nreturn l;", r#"["<cycle>"]"#);
    check("m = Map();\nm.put(\"self\", m);\nreturn m == m.get(\"self\");", "true");
}

#[test]
fn sort_both_directions() {
    check("l = {3, 1, 2};\nl.sort(true);\nreturn l;", "[1,2,3]");
    check("l = {3, 1, 2};\nreturn l.sort(false);", "[3,2,1]");
}

#[test]
fn distinct_and_intersect() {
    check("l = {1, 2, 2, 3, 1};\nreturn l.distinct();", "[1,2,3]");
    check("a = {1, 2, 3, 4};\nb = {4, 3, 9};\nreturn a.intersect(b);", "[3,4]");
}

#[test]
fn sublist_clamps() {
    check("l = {1, 2, 3};\nreturn l.sublist(1, 99);", "[2,3]");
    check("l = {1, 2, 3};\nreturn l.sublist(5);", "[]");
}

// ── Strings ───────────────────────────────────────────────────────────────────

#[test]
fn strings_are_immutable() {
    check("s = \"abc\";\nt = s.toUpperCase();\nreturn s + t;", "abcABC");
}

#[test]
fn get_alpha_takes_leading_letters() {
    check("return \"abc123def\".getAlpha();", "abc");
}

#[test]
fn to_long_parses_hex() {
    check("return \"0x1F\".toLong() == 31;", "true");
    check("return \" 42 \".toLong() + 1;", "43");
    check("return \"-0x10\".toLong();", "-16");
    for signed_hex in ["0x-5", "0x+1F"] {
        assert!(matches!(
            run_err(&format!("return \"{signed_hex}\".toLong();")),
            RuntimeError::Parse(_)
        ));
    }
    assert!(matches!(
        run_err("return \"abc\".toLong();"),
        RuntimeError::Parse(_)
    ));
}

#[test]
fn to_map_parses_json() {
    check(
        "m = '{\"a\": 1, \"b\": [1, 2]}'.toMap();\nreturn m.get(\"b\").size();",
        "2",
    );
    assert!(matches!(
        run_err("return \"not json\".toMap();"),
        RuntimeError::Parse(_)
    ));
}

// ── Built-ins ─────────────────────────────────────────────────────────────────

#[test]
fn math_and_encoding_builtins() {
    check("return power(2, 10);", "1024");
    check("return ceil(1.2) + floor(1.8);", "3");
    check("return base64Decode(base64Encode(\"hi there\"));", "hi there");
    check("return encodeUrl(\"a b&c\");", "a%20b%26c");
}

#[test]
fn info_output_is_captured() {
    let out = strict()
        .run("info \"starting\";\nx = 5;\ninfo x * 2;\nreturn x;")
        .unwrap();
    assert_eq!(out.value, Value::Int(5));
    assert_eq!(out.output, vec!["starting".to_owned(), "10".to_owned()]);
}

#[test]
fn messaging_builtins_are_stubs() {
    check(
        "r = sendemail(\"ops@example.test\", \"hi\");\nreturn r.get(\"status\");",
        "email_sent",
    );
}

#[test]
fn unknown_function_is_an_error() {
    assert!(matches!(
        run_err("return launchRocket(1);"),
        RuntimeError::UnknownFunction { .. }
    ));
}

// ── invokeurl ─────────────────────────────────────────────────────────────────

#[test]
fn invokeurl_translation() {
    let src = "resp = invokeurl\n[\n    url: \"http://x\"\n    type: GET\n];";
    let t = translate(src);
    assert!(t.is_complete(), "{:?}", t.diagnostics);
    assert!(t.code.starts_with("resp = _invokeurl({"), "{}", t.code);
    assert!(t.code.contains("\"url\": \"http://x\","), "{}", t.code);
    assert!(t.code.contains("\"type\": \"GET\","), "{}", t.code);
    assert!(t.code.trim_end().ends_with("})"), "{}", t.code);
}

#[test]
fn invokeurl_with_stubbed_transport() {
    let mut rt = strict();
    rt.builtins_mut().register("_invokeurl", |args| Ok(args[0].clone()));
    let src = "id = \"42\";\nr = invokeurl\n[\n    url: \"https://api.example.test/v1/\" + id\n    type: POST\n];\nreturn r.get(\"url\") + \" \" + r.get(\"type\");";
    assert_eq!(
        rt.execute(src).unwrap(),
        Value::from("https://api.example.test/v1/42 POST")
    );
}

#[test]
fn unreachable_host_yields_empty_text() {
    check("return getUrl(\"http://127.0.0.1:1/\");", "");
}

#[test]
fn invokeurl_without_url_yields_empty_text() {
    let src = "resp = invokeurl\n[\n\ttype: GET\n];\nreturn resp;";
    assert_eq!(run_script(src, &Map::new()).unwrap(), Value::from(""));
    check(src, "");
}

#[test]
fn malformed_invokeurl_params_never_raise() {
    check("return _invokeurl(\"x\");", "");
    check("l = {1, 2};\nreturn _invokeurl(l);", "");
    check(
        "resp = invokeurl\n[\n    url: \"http://127.0.0.1:1/\"\n    type: TRACE\n];\nreturn resp;",
        "Unsupported HTTP method",
    );
    check(
        "resp = invokeurl\n[\n    url: \"not a url\"\n    type: POST\n];\nreturn resp;",
        "",
    );
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// Run every `tests/scripts/*.dg` file and compare with its `// expect:` line.
#[test]
fn run_all_script_fixtures() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/scripts");

    let mut entries: Vec<_> = std::fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("cannot open {}: {e}", dir.display()))
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|x| x == "dg").unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.path());

    assert!(!entries.is_empty(), "no .dg files found in {}", dir.display());

    let mut failures = Vec::new();
    for entry in &entries {
        let path = entry.path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let src = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
        let expected = src
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("// expect:"))
            .map(str::trim)
            .unwrap_or_else(|| panic!("{name}: first line must be `// expect: <value>`"));
        match strict().execute(&src) {
            Ok(v) if v.to_string() == expected => {}
            Ok(v) => failures.push(format!("{name}: got `{v}`, want `{expected}`")),
            Err(e) => failures.push(format!("{name}: {e}")),
        }
    }

    if !failures.is_empty() {
        panic!(
            "{}/{} scripts failed:\n  {}",
            failures.len(),
            entries.len(),
            failures.join("\n  ")
        );
    }
}
