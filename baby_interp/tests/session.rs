use std::time::Duration;

use baby_interp::{
    config::Config,
    output::{texts, Output},
    Session,
};

fn session() -> Session {
    Session::new(Config {
        async_delay: Duration::ZERO,
        ..Default::default()
    })
}

fn run_once(source: &str) -> Output {
    session().interpret(source, false)
}

fn stdout(source: &str) -> Vec<String> {
    let output = run_once(source);
    assert!(
        output.stderr.is_empty(),
        "unexpected errors: {:?}",
        texts(&output.stderr)
    );
    texts(&output.stdout).into_iter().map(str::to_owned).collect()
}

fn stderr(source: &str) -> Vec<String> {
    let output = run_once(source);
    assert!(output.stdout.is_empty(), "unexpected output: {:?}", texts(&output.stdout));
    texts(&output.stderr).into_iter().map(str::to_owned).collect()
}

fn assert_error(source: &str, expected: &str) {
    let errors = stderr(source);
    assert!(
        errors.iter().any(|e| e.contains(expected)),
        "{expected:?} not found in {errors:?}"
    );
}

#[test]
fn print() {
    assert_eq!(stdout("print 1;"), vec!["1"]);
    assert_eq!(stdout("print \"\";"), vec![""]);
    assert_eq!(stdout("print false;"), vec!["false"]);
}

#[test]
fn expressions() {
    assert_eq!(stdout("print 1+2;"), vec!["3"]);
    assert_eq!(stdout("print ((1 / 5 + 4) / 5 + 0.2);"), vec!["1.04"]);
    assert_eq!(stdout("print 22/7;"), vec!["3.142857142857143"]);
    assert_eq!(stdout("print \"foo\" + \"bar\";"), vec!["foobar"]);
    assert_eq!(stdout("print -(2 * 3) + 1;"), vec!["-5"]);
}

#[test]
fn equality_is_strict() {
    assert_eq!(stdout("print 1 == 1;"), vec!["true"]);
    assert_eq!(stdout("print 1 == \"1\";"), vec!["false"]);
    assert_eq!(stdout("print true != 1;"), vec!["true"]);
    assert_eq!(stdout("fn f() { } let g = f; print f == g;"), vec!["true"]);
}

#[test]
fn truthiness() {
    assert_eq!(stdout("print !0;"), vec!["false"]);
    assert_eq!(stdout("print !\"\";"), vec!["false"]);
    assert_eq!(stdout("if (0) print \"zero is truthy\";"), vec!["zero is truthy"]);
}

#[test]
fn division_by_zero() {
    assert_error("print 1/0;", "divide by zero");
    let output = run_once("print 1/0;");
    assert!(output.stderr[0].text.starts_with("interpret: Runtime error"));
}

#[test]
fn operand_errors() {
    assert_error("print 1 + \"a\";", "two numbers or two strings");
    assert_error("print \"a\" - 1;", "expected numeric operands");
    assert_error("print -\"a\";", "expected numeric operands");
    assert_error("print 1 < true;", "expected numeric operands");
}

#[test]
fn undefined_names() {
    assert_error("let one = nil; print one;", "undefined variable 'nil'");
    assert_error("let one = undefined; print one;", "undefined variable 'undefined'");
}

#[test]
fn null_is_not_a_value() {
    let errors = stderr("let one = null; print one;");
    assert!(errors[0].starts_with("scan: Scan error"), "{errors:?}");
    assert!(errors[0].contains("null"));
}

#[test]
fn let_stmt() {
    assert_eq!(stdout("let one = 0; print one;"), vec!["0"]);
    assert_eq!(stdout("let one = 1; one = 2; print one;"), vec!["2"]);
    assert_eq!(stdout("let one = 1+2; print one;"), vec!["3"]);
    assert_error("let one = 2; let one = 1;", "variable has already been defined");
    assert_error("let one = 0; let one = 1;", "variable has already been defined");
}

#[test]
fn unassigned_variables() {
    assert_error("let a; print a;", "used before assignment");
    assert_eq!(stdout("let a; a = 5; print a;"), vec!["5"]);
}

#[test]
fn block_scoping() {
    assert_eq!(
        stdout("let a; { let a = 10; print a; } a = 5; print a;"),
        vec!["10", "5"]
    );
    assert_error("{ let a = a; }", "cannot read local variable in its own initialiser");
}

#[test]
fn lenient_redefinition() {
    let mut session = Session::new(Config {
        strict: false,
        ..Default::default()
    });
    let output = session.interpret("let a = 1; let a = 2; print a;", false);
    assert!(output.stderr.is_empty());
    assert_eq!(texts(&output.stdout), vec!["2"]);
    assert_eq!(output.info.len(), 1);
    assert!(output.info[0].text.contains("already defined"));
}

#[test]
fn lenient_redeclaring_without_a_value_is_quiet() {
    let mut session = Session::new(Config {
        strict: false,
        ..Default::default()
    });
    let output = session.interpret("let a; let a = 1; class A { } class A { } print a;", false);
    assert!(output.stderr.is_empty(), "{:?}", texts(&output.stderr));
    assert_eq!(texts(&output.stdout), vec!["1"]);
    assert!(output.info.is_empty(), "{:?}", texts(&output.info));
}

#[test]
fn missing_operands() {
    let errors = stderr("<= 2;==1;");
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors[0].starts_with("parse: "));
    assert!(errors[0].contains("expected an operand before '<='"));
    assert!(errors[1].contains("expected an operand before '=='"));
}

#[test]
fn if_else() {
    assert_eq!(stdout("if (true) print \"GOAL\";"), vec!["GOAL"]);
    assert_eq!(stdout("if (false) print \"NOPE\"; else print \"GOAL\";"), vec!["GOAL"]);
    assert_eq!(
        stdout("if (true) if (false) print \"NOPE\"; else print \"GOAL\";"),
        vec!["GOAL"]
    );
    assert_eq!(
        stdout(
            "if (false) { print \"NOPE\"; } else if (false) { print \"NOPE\"; } else { print \"GOAL\"; }"
        ),
        vec!["GOAL"]
    );
}

#[test]
fn while_loop() {
    let out = stdout("let a = 5; while (a > 0) { a = a - 1; print a; }");
    assert_eq!(out, vec!["4", "3", "2", "1", "0"]);
    assert_eq!(stdout("let a = 5; while (a > 0) a = a - 1; print a;"), vec!["0"]);
    assert_error("while (true) { }", "infinite loop detected");
}

#[test]
fn loop_limit_is_configurable() {
    let mut session = Session::new(Config {
        loop_limit: 3,
        ..Default::default()
    });
    let output = session.interpret("let a = 0; while (a < 5) a = a + 1;", false);
    assert!(texts(&output.stderr)[0].contains("infinite loop detected"));
}

#[test]
fn runaway_recursion_is_an_error() {
    let mut session = session();
    session.interpret("let kept = \"still here\";", false);
    let output = session.interpret(
        "fn down(n) { if (n == 0) return 0; return down(n - 1); } print down(100000);",
        false,
    );
    assert!(output.stdout.is_empty());
    assert_eq!(output.stderr.len(), 1);
    assert!(output.stderr[0].text.starts_with("interpret: "));
    assert!(output.stderr[0].text.contains("maximum call depth exceeded"));

    let output = session.interpret("print kept; print down(100);", false);
    assert_eq!(texts(&output.stdout), vec!["still here", "0"]);
}

#[test]
fn deeply_nested_input_is_a_parse_error() {
    let source = format!("print {}1{};", "(".repeat(100_000), ")".repeat(100_000));
    let errors = stderr(&source);
    assert!(errors[0].starts_with("parse: "), "{errors:?}");
    assert!(errors[0].contains("cannot nest more than"));
}

#[test]
fn range_loops_beyond_exact_integers_are_rejected() {
    assert_error(
        "let n = 0; for (i in 9007199254740992..9007199254740994) { n = n + 1; } print n;",
        "range loop must be finite numbers",
    );
}

#[test]
fn for_loop() {
    let out = stdout("for (let a = 0; a < 10; a = a + 1) { print \"GOAL\"; }");
    assert_eq!(out.len(), 10);
    assert_eq!(
        stdout("let a = \"outer\"; for (let a = 0; a < 2; a = a + 1) print a; print a;"),
        vec!["0", "1", "outer"]
    );
    assert_error("for (let a = 0; a < 2; a = a + 1) { } print a;", "undefined variable 'a'");
}

#[test]
fn range_loops() {
    assert_eq!(stdout("for (i in 0..5) print i;"), vec!["0", "1", "2", "3", "4"]);
    assert_eq!(
        stdout("for (i in 0..=5) { print i; }"),
        vec!["0", "1", "2", "3", "4", "5"]
    );
    assert!(stdout("for (i in 3..0) print i;").is_empty());
    assert_error("for (i in 0..\"a\") print i;", "finite numbers");
}

#[test]
fn logical_operators() {
    assert_eq!(stdout("print true and \"GOAL\";"), vec!["GOAL"]);
    assert_eq!(stdout("print true && \"GOAL\";"), vec!["GOAL"]);
    assert_eq!(stdout("print false and \"NOPE\";"), vec!["false"]);
    assert_eq!(stdout("print true and true and true and \"GOAL\";"), vec!["GOAL"]);
    assert_eq!(stdout("print false or \"GOAL\";"), vec!["GOAL"]);
    assert_eq!(stdout("print false || \"GOAL\";"), vec!["GOAL"]);
    assert_eq!(stdout("print \"GOAL\" or false;"), vec!["GOAL"]);
    // The right hand side is never evaluated
    assert_eq!(stdout("print true or 1/0;"), vec!["true"]);
}

#[test]
fn ternary() {
    assert_eq!(stdout("let t = 1 ? true : false; print t;"), vec!["true"]);
    assert_eq!(
        stdout("let out = false ? \"unexpected-1\" : true ? \"expected\" : \"unexpected-2\"; print out;"),
        vec!["expected"]
    );

    let output = run_once(
        "let out = false ? \"u1\" : false ? \"u2\" : false ? \"u3\" : \"expected\"; print out;",
    );
    assert_eq!(texts(&output.stdout), vec!["expected"]);
    assert_eq!(output.info.len(), 1);
    assert!(output.info[0].text.contains("chaining ternary operators"));
}

#[test]
fn functions() {
    assert_eq!(
        stdout("fn add(a, b) { return a + b; } print add(1, 2); print add;"),
        vec!["3", "<fn add(a, b)>"]
    );
    assert_eq!(
        stdout("fn fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
        vec!["55"]
    );
    assert_error("fn f(a) { } f();", "expected 1 arguments but got 0");
    assert_error("let a = 1; a();", "can only call functions");
    assert_error("return 1;", "cannot return from top-level code");
}

#[test]
fn closures() {
    let source = "
        fn makeCounter() {
            let i = 0;
            fn count() {
                i = i + 1;
                print i;
            }
            return count;
        }
        let counter = makeCounter();
        counter();
        counter();
    ";
    assert_eq!(stdout(source), vec!["1", "2"]);
}

#[test]
fn closures_capture_their_declaration_scope() {
    let source = "
        let a = \"global\";
        {
            fn show() { print a; }
            show();
            let a = \"block\";
            show();
        }
    ";
    assert_eq!(stdout(source), vec!["global", "global"]);
}

#[test]
fn classes() {
    assert_eq!(
        stdout("class Point { fn norm() { return 1; } } print Point;"),
        vec!["<class Point>"]
    );
}

#[test]
fn state_persists_across_inputs() {
    let mut session = session();
    session.interpret("let a = 1; print 1/0; let b = 2;", false);
    let output = session.interpret("print a;", false);
    assert_eq!(texts(&output.stdout), vec!["1"]);
    let output = session.interpret("print b;", false);
    assert!(texts(&output.stderr)[0].contains("undefined variable 'b'"));

    session.interpret("fn get() { return a; }", false);
    let output = session.interpret("a = 7; print get();", false);
    assert_eq!(texts(&output.stdout), vec!["7"]);
}

#[test]
fn lone_variable_is_echoed() {
    let mut session = session();
    session.interpret("let a = \"hello\";", false);
    let output = session.interpret("a;", false);
    assert_eq!(texts(&output.stdout), vec!["hello"]);
}

#[test]
fn fresh_sessions_are_deterministic() {
    let source = "
        let total = 0;
        for (i in 0..4) { total = total + i; print total; }
        fn half(n) { return n / 2; }
        print half(total);
        print total ? \"yes\" : \"no\";
        print missing;
    ";
    let channels = |output: Output| {
        (
            texts(&output.stdout).join("\n"),
            texts(&output.stderr).join("\n"),
            texts(&output.info).join("\n"),
            texts(&output.debug).join("\n"),
            texts(&output.env_trace).join("\n"),
        )
    };
    let first = channels(Session::default().interpret(source, true));
    for _ in 0..3 {
        assert_eq!(channels(Session::default().interpret(source, true)), first);
    }
}

#[test]
fn debug_channels() {
    let output = Session::default().interpret("let a = 1;", true);
    assert!(!output.debug.is_empty());
    assert!(output.debug[0].text.starts_with("scan: "));
    assert!(texts(&output.env_trace).contains(&"scope at depth 0: { a = 1 }"));

    let output = Session::default().interpret("let a = 1;", false);
    assert!(output.debug.is_empty());
    assert!(output.env_trace.is_empty());
}

#[test]
fn visit_redirects() {
    let output = run_once("visit(\"/blog\");");
    assert!(output.stderr.is_empty());
    assert_eq!(output.redirect.map(|line| line.text), Some("/blog".to_owned()));
}

#[test]
fn help_is_printed() {
    let output = run_once("help();");
    assert_eq!(output.stdout.len(), 1);
    assert!(output.stdout[0].text.contains("welcome to baby"));
}

#[test]
fn async_results_arrive_later() {
    let mut session = session();
    let output = session.interpret("async(\"job\"); csv();", false);
    assert!(output.is_empty());
    assert!(session.has_pending());

    let output = session.interpret("print awaited;", false);
    assert_eq!(texts(&output.stdout), vec!["result after: 0: job"]);
    let output = session.interpret("print csv_data;", false);
    assert!(output.stdout[0].text.starts_with("ID,Name,Age,Email,Salary\n1,John Doe"));
    assert!(!session.has_pending());
}

#[test]
fn async_results_are_not_ready_early() {
    let mut session = Session::default();
    session.interpret("async(\"job\");", false);
    let output = session.interpret("print awaited;", false);
    assert!(texts(&output.stderr)[0].contains("undefined variable 'awaited'"));
    assert!(session.has_pending());
}

#[test]
fn timeout_calls_back() {
    let mut session = session();
    let output = session.interpret("fn done() { print \"done\"; } timeout(done, 0);", false);
    assert!(output.stdout.is_empty());
    let output = session.poll();
    assert_eq!(texts(&output.stdout), vec!["done"]);

    session.interpret("fn bad() { print 1/0; } timeout(bad, 0);", false);
    let output = session.poll();
    assert!(texts(&output.stderr)[0].starts_with("interpret: Runtime error"));
}
