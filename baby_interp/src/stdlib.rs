use std::time::Duration;

use crate::{
    environment::Env,
    error::{runtime_error, ErrorMsg, Exception},
    interpret::Interpreter,
    types::{Callable, NativeFunc, Value},
};

const HELP: &str = "\
welcome to baby, a tiny language that runs right here.

values     numbers (1, 2.5), strings (\"hi\"), booleans (true, false)
variables  let name = \"baby\"; name = \"still baby\";
printing   print 1 + 2;  or just type a variable name on its own
logic      if (a > 1 and b < 2) { ... } else { ... }   x == 1 ? \"one\" : \"many\"
loops      while (n < 3) n = n + 1;
           for (let i = 0; i < 3; i = i + 1) print i;
           for (i in 0..3) print i;   for (i in 0..=3) print i;
functions  fn add(a, b) { return a + b; }  print add(1, 2);
closures   fn counter() { let n = 0; fn inc() { n = n + 1; return n; } return inc; }

built in   clock()              milliseconds since 1970
           visit(\"/blog\")       go somewhere else
           async(\"label\")       sets `awaited` a few seconds later
           csv()                sets `csv_data` a few seconds later
           timeout(callback, ms) calls `callback` after `ms` milliseconds
           help()               shows this again";

const CSV_DATA: &str = "\
ID,Name,Age,Email,Salary
1,John Doe,30,johndoe@example.com,50000
2,Jane Smith,28,janesmith@example,com,60000
3,Bob,--,,70000
4,Anna \"Annie\" O'Brien,34,annaobrien@example.com,80000
five,Mary Johnson,32,maryjohnson@example.com,90000
6,Invalid Name,40,mike@example.com,100k
7,Chris Lee,25,chrislee@example,com,110000
,,,
8,Kate Brown,thirtytwo,katebrown@example.com,120000
9,Li Wei,29,liwei@example.com,Not a number
";

/// Registers the foreign functions in the global environment.
pub fn init(env: &mut Env) {
    // clock()
    native(env, "clock", &[], |interpreter, _| {
        Ok(Value::Number(interpreter.now().as_millis() as f64))
    });

    // help()
    native(env, "help", &[], |interpreter, _| {
        interpreter.logger().log(HELP);
        Ok(Value::Str(HELP.to_string()))
    });

    // visit(url)
    native(env, "visit", &["url"], |interpreter, args| {
        let url = expect_string(&args[0])?;
        interpreter.logger().visit(url);
        Ok(Value::Void)
    });

    // async(label)
    native(env, "async", &["label"], |interpreter, args| {
        let label = args[0].to_string();
        let delay = interpreter.config().async_delay;
        interpreter.defer(delay, move |interpreter| {
            let secs = Value::Number(delay.as_secs_f64());
            let result = format!("result after: {secs}: {label}");
            interpreter.define_global("awaited", Value::Str(result));
            Ok(())
        });
        Ok(Value::Void)
    });

    // csv()
    native(env, "csv", &[], |interpreter, _| {
        let delay = interpreter.config().async_delay;
        interpreter.defer(delay, |interpreter| {
            interpreter.define_global("csv_data", Value::Str(CSV_DATA.to_string()));
            Ok(())
        });
        Ok(Value::Void)
    });

    // timeout(callback, ms)
    native(env, "timeout", &["callback", "ms"], |interpreter, mut args| {
        let ms = match &args[1] {
            Value::Number(n) if n.is_finite() && *n >= 0.0 => *n,
            _ => {
                return Err(runtime_error(
                    ErrorMsg::ExpectedNumber,
                    format_args!("timeout(_, {})", args[1]),
                ))
            }
        };
        let callback = args.swap_remove(0);
        match &callback {
            Value::Func(f) if f.arity() == 0 => (),
            Value::NativeFunc(f) if f.arity() == 0 => (),
            Value::Func(_) | Value::NativeFunc(_) => {
                return Err(runtime_error(ErrorMsg::ArityMismatch(0, 1), &callback))
            }
            _ => return Err(runtime_error(ErrorMsg::InvalidCallExpr, &callback)),
        }
        interpreter.defer(Duration::from_secs_f64(ms / 1000.0), move |interpreter| {
            let result = match &callback {
                Value::Func(f) => f.call(interpreter, vec![]),
                Value::NativeFunc(f) => f.call(interpreter, vec![]),
                _ => Ok(Value::Void),
            };
            result.map(|_| ())
        });
        Ok(Value::Void)
    });
}

fn native(
    env: &mut Env,
    name: &str,
    args: &[&str],
    body: fn(&mut Interpreter, Vec<Value>) -> Result<Value, Exception>,
) {
    env.set(
        name,
        Value::NativeFunc(NativeFunc {
            name: name.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            body,
        }),
    );
}

fn expect_string(value: &Value) -> Result<&str, Exception> {
    match value {
        Value::Str(s) => Ok(s),
        _ => Err(runtime_error(ErrorMsg::ExpectedString, value)),
    }
}
